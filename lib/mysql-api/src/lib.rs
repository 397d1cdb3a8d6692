//! MySQL operator API types and CRDs for Kubernetes integration
//!
//! This library defines the custom resources managed by the operator:
//! - MySQL: A single-instance MySQL database and its storage, credentials and network exposure

pub mod v1alpha1;

pub use v1alpha1::{MySQL, MySQLPhase, MySQLSpec, MySQLStatus, API_GROUP, API_VERSION};
