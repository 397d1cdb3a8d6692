//! Cluster client capability used by the reconciler
//!
//! The reconciler never holds a Kubernetes client directly: it is handed a
//! [`ClusterClient`], so tests can substitute the in-memory implementation
//! from [`crate::memory`].

use crate::dependent::{Dependent, DependentKind, ObjectKey};
use crate::ownership;
use crate::{CoreError, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, PostParams};
use kube::{Client, Resource};
use mysql_api::{MySQL, MySQLStatus};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Field manager recorded on objects written by the operator
pub const FIELD_MANAGER: &str = "mysql-operator";

/// Operations the reconciler performs against the control plane
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Get a MySQL by key; `None` when it does not exist
    async fn fetch(&self, key: &ObjectKey) -> Result<Option<MySQL>>;

    /// Point lookup of a dependent by namespace and name
    async fn exists(&self, kind: DependentKind, key: &ObjectKey) -> Result<bool>;

    /// Create a dependent
    async fn create(&self, dependent: &Dependent) -> Result<()>;

    /// Replace the status sub-resource of `mysql`.
    ///
    /// The write carries the resourceVersion `mysql` was fetched at, so a
    /// concurrent modification surfaces as a conflict error.
    async fn update_status(&self, mysql: &MySQL, status: &MySQLStatus) -> Result<()>;

    /// Attach the controller owner reference of `owner` to `dependent`
    fn register_ownership(&self, owner: &MySQL, dependent: &mut Dependent) -> Result<()> {
        ownership::set_controller_reference(owner, dependent)
    }
}

/// [`ClusterClient`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn lookup<K>(&self, key: &ObjectKey) -> Result<bool>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let found = self.api::<K>(&key.namespace).get_metadata_opt(&key.name).await?;
        Ok(found.is_some())
    }

    async fn create_object<K>(&self, namespace: &str, obj: &K) -> Result<()>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.api::<K>(namespace).create(&params, obj).await?;
        Ok(())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn fetch(&self, key: &ObjectKey) -> Result<Option<MySQL>> {
        Ok(self.api::<MySQL>(&key.namespace).get_opt(&key.name).await?)
    }

    async fn exists(&self, kind: DependentKind, key: &ObjectKey) -> Result<bool> {
        debug!(kind = %kind, key = %key, "Looking up dependent");
        match kind {
            DependentKind::Secret => self.lookup::<Secret>(key).await,
            DependentKind::PersistentVolumeClaim => self.lookup::<PersistentVolumeClaim>(key).await,
            DependentKind::Deployment => self.lookup::<Deployment>(key).await,
            DependentKind::Service => self.lookup::<Service>(key).await,
        }
    }

    async fn create(&self, dependent: &Dependent) -> Result<()> {
        let namespace = dependent
            .metadata()
            .namespace
            .as_deref()
            .ok_or(CoreError::MissingField("metadata.namespace"))?;
        match dependent {
            Dependent::Secret(o) => self.create_object(namespace, o).await,
            Dependent::PersistentVolumeClaim(o) => self.create_object(namespace, o).await,
            Dependent::Deployment(o) => self.create_object(namespace, o).await,
            Dependent::Service(o) => self.create_object(namespace, o).await,
        }
    }

    async fn update_status(&self, mysql: &MySQL, status: &MySQLStatus) -> Result<()> {
        let name = mysql
            .metadata
            .name
            .as_deref()
            .ok_or(CoreError::MissingField("metadata.name"))?;
        let namespace = mysql
            .metadata
            .namespace
            .as_deref()
            .ok_or(CoreError::MissingField("metadata.namespace"))?;

        let mut updated = mysql.clone();
        updated.status = Some(status.clone());
        let data = serde_json::to_vec(&updated)?;

        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        self.api::<MySQL>(namespace)
            .replace_status(name, &params, data)
            .await?;
        Ok(())
    }
}
