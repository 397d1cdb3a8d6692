//! MySQL controller wiring the reconciler into the kube-runtime scheduler

use crate::config::ControllerConfig;
use crate::metrics::ControllerMetrics;
use crate::server::Readiness;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service};
use kube::{api::ListParams, Api, Client, Resource, ResourceExt};
use kube_runtime::{
    controller::{self, Action},
    watcher, Controller,
};
use mysql_api::MySQL;
use mysql_core::{CoreError, KubeClusterClient, ObjectKey, ReconcileOutcome, Reconciler};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// State shared by every reconciliation
pub struct Context {
    pub reconciler: Reconciler,
    pub metrics: ControllerMetrics,
    pub error_requeue: Duration,
}

pub struct MySQLController {
    client: Client,
    config: ControllerConfig,
    metrics: ControllerMetrics,
}

impl MySQLController {
    pub fn new(client: Client, config: ControllerConfig, metrics: ControllerMetrics) -> Self {
        Self {
            client,
            config,
            metrics,
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = kube::core::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        match &self.config.watch_namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    /// Fail fast when the MySQL CRD is not served by the cluster
    pub async fn check_crd_installed(&self) -> anyhow::Result<()> {
        let mysqls: Api<MySQL> = self.api();
        mysqls.list(&ListParams::default().limit(1)).await.map_err(|e| {
            anyhow::anyhow!(
                "MySQL CRD is not queryable, is it installed? (run crdgen | kubectl apply -f -): {}",
                e
            )
        })?;
        Ok(())
    }

    /// Watch MySQL objects and their dependents until a shutdown signal arrives
    pub async fn run(self, readiness: Readiness) -> anyhow::Result<()> {
        match &self.config.watch_namespace {
            Some(namespace) => info!(namespace = %namespace, "Starting MySQL reconciliation"),
            None => info!("Starting MySQL reconciliation in all namespaces"),
        }

        let context = Arc::new(Context {
            reconciler: Reconciler::new(Arc::new(KubeClusterClient::new(self.client.clone()))),
            metrics: self.metrics.clone(),
            error_requeue: self.config.error_requeue,
        });

        let watch = watcher::Config::default();
        let controller = Controller::new(self.api::<MySQL>(), watch.clone())
            .owns(self.api::<Deployment>(), watch.clone())
            .owns(self.api::<Service>(), watch.clone())
            .owns(self.api::<PersistentVolumeClaim>(), watch.clone())
            .owns(self.api::<Secret>(), watch)
            .with_config(controller::Config::default().concurrency(self.config.max_concurrent_reconciles))
            .shutdown_on_signal();

        readiness.mark_ready();

        controller
            .run(reconcile, error_policy, context)
            .for_each(|result| async move {
                match result {
                    Ok((object, _)) => debug!(object = %object, "Reconciled MySQL"),
                    Err(e) => warn!("Error in reconciliation stream: {}", e),
                }
            })
            .await;

        info!("MySQL controller stopped");
        Ok(())
    }
}

#[instrument(skip(mysql, ctx), fields(namespace = ?mysql.namespace(), name = %mysql.name_any()))]
pub async fn reconcile(mysql: Arc<MySQL>, ctx: Arc<Context>) -> Result<Action, CoreError> {
    let namespace = mysql
        .namespace()
        .ok_or(CoreError::MissingField("metadata.namespace"))?;
    let key = ObjectKey::new(namespace, mysql.name_any());

    let started = Instant::now();
    let outcome = ctx.reconciler.reconcile(&key).await;
    ctx.metrics.observe_reconcile(started.elapsed());

    if let ReconcileOutcome::Reconciled { created, .. } = outcome? {
        ctx.metrics.observe_created(&created);
    }
    Ok(Action::await_change())
}

pub fn error_policy(mysql: Arc<MySQL>, error: &CoreError, ctx: Arc<Context>) -> Action {
    warn!(
        namespace = ?mysql.namespace(),
        name = %mysql.name_any(),
        error = %error,
        retryable = error.is_retryable(),
        "Reconciliation failed, requeueing in {:?}",
        ctx.error_requeue
    );
    ctx.metrics.observe_error(error);
    Action::requeue(ctx.error_requeue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_api::MySQLSpec;
    use mysql_core::{DependentKind, InMemoryCluster};

    fn context(cluster: &InMemoryCluster) -> Arc<Context> {
        Arc::new(Context {
            reconciler: Reconciler::new(Arc::new(cluster.clone())),
            metrics: ControllerMetrics::new().unwrap(),
            error_requeue: Duration::from_secs(30),
        })
    }

    fn mysql(namespace: Option<&str>) -> MySQL {
        let mut mysql = MySQL::new(
            "sample.db",
            MySQLSpec {
                version: "8.0".to_string(),
                storage_size: "10Gi".to_string(),
                root_password: String::new(),
            },
        );
        mysql.metadata.namespace = namespace.map(str::to_string);
        mysql
    }

    #[tokio::test]
    async fn test_reconcile_success_awaits_change() {
        let cluster = InMemoryCluster::new();
        let stored = cluster.put_mysql(mysql(Some("ns1"))).await.unwrap();
        let ctx = context(&cluster);

        let action = reconcile(Arc::new(stored), ctx.clone()).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert_eq!(cluster.dependent_count().await, 4);
        assert_eq!(ctx.metrics.reconcile_total.get(), 1);
        assert_eq!(
            ctx.metrics
                .dependents_created_total
                .with_label_values(&[DependentKind::Deployment.as_str()])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_reconcile_of_deleted_object_succeeds() {
        let cluster = InMemoryCluster::new();
        let ctx = context(&cluster);

        let action = reconcile(Arc::new(mysql(Some("ns1"))), ctx).await.unwrap();
        assert_eq!(action, Action::await_change());
        assert_eq!(cluster.dependent_count().await, 0);
    }

    #[tokio::test]
    async fn test_reconcile_without_namespace_fails() {
        let cluster = InMemoryCluster::new();
        let err = reconcile(Arc::new(mysql(None)), context(&cluster))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingField("metadata.namespace")));
        assert!(cluster.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_error_policy_requeues_and_counts() {
        let cluster = InMemoryCluster::new();
        let ctx = context(&cluster);
        let error = CoreError::Injected("boom".to_string());

        let action = error_policy(Arc::new(mysql(Some("ns1"))), &error, ctx.clone());
        assert_eq!(action, Action::requeue(Duration::from_secs(30)));
        assert_eq!(
            ctx.metrics
                .reconcile_errors_total
                .with_label_values(&["injected"])
                .get(),
            1
        );
    }
}
