/// API version v1alpha1 for MySQL operator CRDs

pub mod mysql;

pub use mysql::{MySQL, MySQLPhase, MySQLSpec, MySQLStatus};

/// API group for MySQL operator resources
pub const API_GROUP: &str = "database.mycompany.com";
/// API version for MySQL operator resources
pub const API_VERSION: &str = "v1alpha1";
