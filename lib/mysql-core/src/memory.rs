//! In-memory [`ClusterClient`] for tests and dry runs
//!
//! Objects live in ordered maps keyed by kind, namespace and name. Every call
//! is recorded, failures can be injected per operation, status writes are
//! checked against the stored resourceVersion, and deleting a MySQL cascades
//! to the dependents it controls the way the garbage collector would.

use crate::client::ClusterClient;
use crate::dependent::{Dependent, DependentKind, ObjectKey};
use crate::{CoreError, Result};
use async_trait::async_trait;
use kube::core::ErrorResponse;
use mysql_api::{MySQL, MySQLStatus};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A call received by the in-memory cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Fetch(ObjectKey),
    Exists(DependentKind, ObjectKey),
    Create(DependentKind, ObjectKey),
    UpdateStatus(ObjectKey),
}

#[derive(Default)]
struct State {
    mysqls: BTreeMap<ObjectKey, MySQL>,
    dependents: BTreeMap<(DependentKind, ObjectKey), Dependent>,
    calls: Vec<Call>,
    fetch_failure: Option<String>,
    lookup_failures: HashMap<DependentKind, String>,
    create_failures: HashMap<DependentKind, String>,
    status_failure: Option<String>,
    next_version: u64,
    next_uid: u64,
}

impl State {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

/// Shared, cloneable in-memory cluster
#[derive(Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<RwLock<State>>,
}

fn api_error(code: u16, reason: &str, message: String) -> CoreError {
    CoreError::Kubernetes(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    }))
}

fn key_of(mysql: &MySQL) -> Result<ObjectKey> {
    let namespace = mysql
        .metadata
        .namespace
        .clone()
        .ok_or(CoreError::MissingField("metadata.namespace"))?;
    let name = mysql
        .metadata
        .name
        .clone()
        .ok_or(CoreError::MissingField("metadata.name"))?;
    Ok(ObjectKey::new(namespace, name))
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a MySQL, assigning a uid if it has none and a fresh resourceVersion.
    /// Returns the stored object.
    pub async fn put_mysql(&self, mut mysql: MySQL) -> Result<MySQL> {
        let key = key_of(&mysql)?;
        let mut state = self.state.write().await;
        if mysql.metadata.uid.is_none() {
            state.next_uid += 1;
            mysql.metadata.uid = Some(format!("uid-{}", state.next_uid));
        }
        mysql.metadata.resource_version = Some(state.bump_version());
        state.mysqls.insert(key, mysql.clone());
        Ok(mysql)
    }

    /// Current stored copy of a MySQL, status included
    pub async fn mysql(&self, key: &ObjectKey) -> Option<MySQL> {
        self.state.read().await.mysqls.get(key).cloned()
    }

    /// Delete a MySQL and every dependent it controls
    pub async fn delete_mysql(&self, key: &ObjectKey) -> Option<MySQL> {
        let mut state = self.state.write().await;
        let removed = state.mysqls.remove(key)?;
        let uid = removed.metadata.uid.clone();
        state.dependents.retain(|_, dependent| {
            !dependent
                .metadata()
                .owner_references
                .iter()
                .flatten()
                .any(|r| r.controller == Some(true) && Some(&r.uid) == uid.as_ref())
        });
        debug!(key = %key, "Deleted MySQL and cascaded to its dependents");
        Some(removed)
    }

    /// Store a dependent directly, bypassing the recorded call log
    pub async fn put_dependent(&self, dependent: Dependent) -> Result<()> {
        let key = dependent
            .key()
            .ok_or(CoreError::MissingField("metadata.name"))?;
        let mut state = self.state.write().await;
        state.dependents.insert((dependent.kind(), key), dependent);
        Ok(())
    }

    /// Delete a dependent, as an external actor would
    pub async fn delete_dependent(&self, kind: DependentKind, key: &ObjectKey) -> Option<Dependent> {
        self.state
            .write()
            .await
            .dependents
            .remove(&(kind, key.clone()))
    }

    pub async fn dependent(&self, kind: DependentKind, key: &ObjectKey) -> Option<Dependent> {
        self.state
            .read()
            .await
            .dependents
            .get(&(kind, key.clone()))
            .cloned()
    }

    pub async fn dependent_count(&self) -> usize {
        self.state.read().await.dependents.len()
    }

    /// Every call received so far, in order
    pub async fn calls(&self) -> Vec<Call> {
        self.state.read().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }

    /// Number of create calls received so far
    pub async fn create_count(&self) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Create(..)))
            .count()
    }

    pub async fn fail_fetch(&self, message: impl Into<String>) {
        self.state.write().await.fetch_failure = Some(message.into());
    }

    pub async fn fail_lookup(&self, kind: DependentKind, message: impl Into<String>) {
        self.state
            .write()
            .await
            .lookup_failures
            .insert(kind, message.into());
    }

    pub async fn fail_create(&self, kind: DependentKind, message: impl Into<String>) {
        self.state
            .write()
            .await
            .create_failures
            .insert(kind, message.into());
    }

    pub async fn fail_status(&self, message: impl Into<String>) {
        self.state.write().await.status_failure = Some(message.into());
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.fetch_failure = None;
        state.lookup_failures.clear();
        state.create_failures.clear();
        state.status_failure = None;
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    async fn fetch(&self, key: &ObjectKey) -> Result<Option<MySQL>> {
        let mut state = self.state.write().await;
        state.calls.push(Call::Fetch(key.clone()));
        if let Some(message) = &state.fetch_failure {
            return Err(CoreError::Injected(message.clone()));
        }
        Ok(state.mysqls.get(key).cloned())
    }

    async fn exists(&self, kind: DependentKind, key: &ObjectKey) -> Result<bool> {
        let mut state = self.state.write().await;
        state.calls.push(Call::Exists(kind, key.clone()));
        if let Some(message) = state.lookup_failures.get(&kind) {
            return Err(CoreError::Injected(message.clone()));
        }
        Ok(state.dependents.contains_key(&(kind, key.clone())))
    }

    async fn create(&self, dependent: &Dependent) -> Result<()> {
        let kind = dependent.kind();
        let key = dependent
            .key()
            .ok_or(CoreError::MissingField("metadata.name"))?;

        let mut state = self.state.write().await;
        state.calls.push(Call::Create(kind, key.clone()));
        if let Some(message) = state.create_failures.get(&kind) {
            return Err(CoreError::Injected(message.clone()));
        }
        if state.dependents.contains_key(&(kind, key.clone())) {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{} {} already exists", kind, key),
            ));
        }

        let mut stored = dependent.clone();
        stored.metadata_mut().resource_version = Some(state.bump_version());
        state.dependents.insert((kind, key), stored);
        Ok(())
    }

    async fn update_status(&self, mysql: &MySQL, status: &MySQLStatus) -> Result<()> {
        let key = key_of(mysql)?;
        let mut state = self.state.write().await;
        state.calls.push(Call::UpdateStatus(key.clone()));
        if let Some(message) = &state.status_failure {
            return Err(CoreError::Injected(message.clone()));
        }

        let current_version = match state.mysqls.get(&key) {
            Some(stored) => stored.metadata.resource_version.clone(),
            None => return Err(api_error(404, "NotFound", format!("MySQL {} not found", key))),
        };
        if current_version != mysql.metadata.resource_version {
            return Err(api_error(
                409,
                "Conflict",
                format!("MySQL {} has been modified", key),
            ));
        }

        let version = state.bump_version();
        if let Some(stored) = state.mysqls.get_mut(&key) {
            stored.status = Some(status.clone());
            stored.metadata.resource_version = Some(version);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use mysql_api::MySQLSpec;

    fn mysql(name: &str) -> MySQL {
        let mut mysql = MySQL::new(
            name,
            MySQLSpec {
                version: "8.0".to_string(),
                storage_size: "1Gi".to_string(),
                root_password: String::new(),
            },
        );
        mysql.metadata.namespace = Some("ns1".to_string());
        mysql
    }

    fn secret(name: &str) -> Dependent {
        Dependent::Secret(Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns1".to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_put_mysql_assigns_identity() {
        let cluster = InMemoryCluster::new();
        let stored = cluster.put_mysql(mysql("db")).await.unwrap();
        assert_eq!(stored.metadata.uid.as_deref(), Some("uid-1"));
        assert!(stored.metadata.resource_version.is_some());

        let fetched = cluster.fetch(&ObjectKey::new("ns1", "db")).await.unwrap();
        assert_eq!(fetched, Some(stored));
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let cluster = InMemoryCluster::new();
        cluster.create(&secret("db-secret")).await.unwrap();
        let err = cluster.create(&secret("db-secret")).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(cluster.create_count().await, 2);
        assert_eq!(cluster.dependent_count().await, 1);
    }

    #[tokio::test]
    async fn test_stale_status_update_conflicts() {
        let cluster = InMemoryCluster::new();
        let stale = cluster.put_mysql(mysql("db")).await.unwrap();
        cluster.put_mysql(stale.clone()).await.unwrap();

        let err = cluster
            .update_status(&stale, &MySQLStatus::default())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let cluster = InMemoryCluster::new();
        let key = ObjectKey::new("ns1", "db-secret");
        cluster.fail_lookup(DependentKind::Secret, "timeout").await;
        assert!(matches!(
            cluster.exists(DependentKind::Secret, &key).await,
            Err(CoreError::Injected(_))
        ));

        cluster.clear_failures().await;
        assert!(!cluster.exists(DependentKind::Secret, &key).await.unwrap());
        assert_eq!(
            cluster.calls().await,
            vec![
                Call::Exists(DependentKind::Secret, key.clone()),
                Call::Exists(DependentKind::Secret, key),
            ]
        );
    }
}
