//! Core reconciliation logic for the MySQL operator
//!
//! This library provides:
//! - Name canonicalization and quantity parsing
//! - Builders for the Secret, PersistentVolumeClaim, Deployment and Service owned by a MySQL
//! - The cluster client capability, backed by Kubernetes or by an in-memory store
//! - Create-if-absent synchronization, status reporting and the reconciler itself

pub mod builders;
pub mod client;
pub mod dependent;
pub mod error;
pub mod memory;
pub mod naming;
pub mod ownership;
pub mod quantity;
pub mod reconciler;
pub mod status;
pub mod sync;

pub use client::{ClusterClient, KubeClusterClient};
pub use dependent::{Dependent, DependentKind, ObjectKey};
pub use error::{CoreError, Result};
pub use memory::InMemoryCluster;
pub use naming::canonicalize;
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use sync::SyncOutcome;
