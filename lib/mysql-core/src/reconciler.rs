//! Reconciliation of a single MySQL
//!
//! One pass fetches the MySQL, builds and ensures its Secret, claim,
//! Deployment and Service in that order, then reports `Running`. The first
//! error aborts the pass; objects created earlier in the pass stay in place
//! and retrying is left to the caller.

use crate::builders::{self, ResourceBuilder};
use crate::client::ClusterClient;
use crate::dependent::{DependentKind, ObjectKey};
use crate::naming::canonicalize;
use crate::status::report_running;
use crate::sync::{ensure, SyncOutcome};
use crate::Result;
use kube::ResourceExt;
use mysql_api::{MySQLSpec, MySQLStatus};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Result of a successful reconciliation pass
#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileOutcome {
    /// The MySQL no longer exists; its dependents are left to garbage collection
    Deleted,
    /// Every dependent exists and the status was written
    Reconciled {
        created: Vec<DependentKind>,
        status: MySQLStatus,
    },
}

/// Stateless reconciler; all cluster access goes through the injected client
#[derive(Clone)]
pub struct Reconciler {
    client: Arc<dyn ClusterClient>,
}

impl Reconciler {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    /// Run one reconciliation pass for `key`
    #[instrument(skip(self), fields(namespace = %key.namespace, name = %key.name))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let mysql = match self.client.fetch(key).await {
            Ok(Some(mysql)) => mysql,
            Ok(None) => {
                info!("MySQL resource not found. Ignoring since object must be deleted");
                return Ok(ReconcileOutcome::Deleted);
            }
            Err(e) => {
                error!(error = %e, "Failed to get MySQL");
                return Err(e);
            }
        };

        let canonical = canonicalize(&mysql.name_any());
        let namespace = mysql.namespace().unwrap_or_else(|| key.namespace.clone());

        let builder = ResourceBuilder::new(&mysql.spec, &canonical, &namespace);
        let mut created = Vec::new();
        for kind in DependentKind::ALL {
            let dependent = builder.build(kind)?;
            let outcome = ensure(self.client.as_ref(), &mysql, dependent).await?;
            if writes_default_password(kind, outcome, &mysql.spec) {
                warn!(
                    secret = %crate::naming::secret_name(&canonical),
                    "rootPassword is empty, falling back to the default root password"
                );
            }
            if outcome == SyncOutcome::Created {
                created.push(kind);
            }
        }

        let status = report_running(self.client.as_ref(), &mysql).await?;
        info!(created = created.len(), "Reconciliation complete");

        Ok(ReconcileOutcome::Reconciled { created, status })
    }
}

/// Whether this step just stored the fallback password in a new Secret
fn writes_default_password(kind: DependentKind, outcome: SyncOutcome, spec: &MySQLSpec) -> bool {
    kind == DependentKind::Secret
        && outcome == SyncOutcome::Created
        && builders::uses_default_password(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Call, InMemoryCluster};
    use mysql_api::MySQL;

    #[tokio::test]
    async fn test_missing_mysql_is_treated_as_deleted() {
        let cluster = InMemoryCluster::new();
        let reconciler = Reconciler::new(Arc::new(cluster.clone()));
        let key = ObjectKey::new("ns1", "gone");

        let outcome = reconciler.reconcile(&key).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Deleted);
        assert_eq!(cluster.calls().await, vec![Call::Fetch(key)]);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_propagated() {
        let cluster = InMemoryCluster::new();
        cluster.fail_fetch("connection refused").await;
        let reconciler = Reconciler::new(Arc::new(cluster.clone()));

        assert!(reconciler.reconcile(&ObjectKey::new("ns1", "db")).await.is_err());
        assert_eq!(cluster.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dependents_are_created_in_order() {
        let cluster = InMemoryCluster::new();
        let mut mysql = MySQL::new(
            "db",
            MySQLSpec {
                version: "8.0".to_string(),
                storage_size: "1Gi".to_string(),
                root_password: "pw".to_string(),
            },
        );
        mysql.metadata.namespace = Some("ns1".to_string());
        cluster.put_mysql(mysql).await.unwrap();

        let reconciler = Reconciler::new(Arc::new(cluster.clone()));
        let outcome = reconciler.reconcile(&ObjectKey::new("ns1", "db")).await.unwrap();

        match outcome {
            ReconcileOutcome::Reconciled { created, .. } => {
                assert_eq!(created, DependentKind::ALL.to_vec())
            }
            other => panic!("unexpected outcome {:?}", other),
        }

        let created_kinds: Vec<DependentKind> = cluster
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(kind, _) => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(created_kinds, DependentKind::ALL.to_vec());
    }

    #[test]
    fn test_default_password_warning_only_when_secret_is_created() {
        let empty = MySQLSpec::default();
        let set = MySQLSpec {
            root_password: "pw".to_string(),
            ..MySQLSpec::default()
        };

        assert!(writes_default_password(DependentKind::Secret, SyncOutcome::Created, &empty));
        assert!(!writes_default_password(DependentKind::Secret, SyncOutcome::Unchanged, &empty));
        assert!(!writes_default_password(DependentKind::Secret, SyncOutcome::Created, &set));
        assert!(!writes_default_password(DependentKind::Deployment, SyncOutcome::Created, &empty));
    }
}
