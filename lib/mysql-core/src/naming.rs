//! Cluster-safe names for the objects derived from a MySQL

/// Derives the identifier shared by every dependent object of a MySQL.
///
/// Dependent names may not contain `.`, so each one is replaced with `-`.
/// No further DNS label validation is performed.
pub fn canonicalize(name: &str) -> String {
    name.replace('.', "-")
}

/// Name of the Secret holding the root credential
pub fn secret_name(canonical: &str) -> String {
    format!("{}-secret", canonical)
}

/// Name of the PersistentVolumeClaim backing the data directory
pub fn claim_name(canonical: &str) -> String {
    format!("{}-pvc", canonical)
}

/// Name of the Deployment running the database
pub fn deployment_name(canonical: &str) -> String {
    canonical.to_string()
}

/// Name of the Service exposing the database
pub fn service_name(canonical: &str) -> String {
    format!("{}-service", canonical)
}
