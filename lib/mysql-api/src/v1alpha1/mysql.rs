use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// MySQL describes a single MySQL database instance that the operator
/// materializes as a Secret, a PersistentVolumeClaim, a Deployment and a Service
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "database.mycompany.com",
    version = "v1alpha1",
    kind = "MySQL",
    plural = "mysqls",
    namespaced,
    derive = "Default",
    derive = "PartialEq",
    status = "MySQLStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Ready","type":"boolean","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#,
)]
#[serde(rename_all = "camelCase")]
pub struct MySQLSpec {
    /// Version of MySQL to deploy (e.g., "8.0", "5.7")
    pub version: String,

    /// Size of the MySQL data volume (e.g., "10Gi")
    pub storage_size: String,

    /// Password for the MySQL root user.
    ///
    /// When empty the operator falls back to a well-known default password.
    /// Production deployments should always set it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root_password: String,
}

/// Lifecycle phase reported in `.status.phase`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum MySQLPhase {
    Pending,
    Running,
    Failed,
}

impl MySQLPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MySQLPhase::Pending => "Pending",
            MySQLPhase::Running => "Running",
            MySQLPhase::Failed => "Failed",
        }
    }
}

impl fmt::Display for MySQLPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed state of a MySQL instance, written only by the operator
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MySQLStatus {
    /// Current phase of the instance; unset until the first successful reconciliation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<MySQLPhase>,

    /// Additional information about the current phase
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Whether the instance is considered ready to accept connections
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ready: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v1alpha1::{API_GROUP, API_VERSION};
    use kube::{CustomResourceExt, Resource};

    #[test]
    fn test_spec_uses_camel_case() {
        let spec = MySQLSpec {
            version: "8.0".to_string(),
            storage_size: "10Gi".to_string(),
            root_password: "s3cret".to_string(),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["version"], "8.0");
        assert_eq!(json["storageSize"], "10Gi");
        assert_eq!(json["rootPassword"], "s3cret");
    }

    #[test]
    fn test_empty_root_password_is_omitted() {
        let spec = MySQLSpec {
            version: "5.7".to_string(),
            storage_size: "1Gi".to_string(),
            root_password: String::new(),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert!(json.get("rootPassword").is_none());

        let parsed: MySQLSpec =
            serde_json::from_str(r#"{"version":"5.7","storageSize":"1Gi"}"#).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn test_empty_status_serializes_to_empty_object() {
        let json = serde_json::to_value(MySQLStatus::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_running_status_round_trip() {
        let status = MySQLStatus {
            phase: Some(MySQLPhase::Running),
            message: "MySQL instance is running".to_string(),
            ready: true,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "Running");
        assert_eq!(json["ready"], true);
        assert_eq!(serde_json::from_value::<MySQLStatus>(json).unwrap(), status);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(MySQLPhase::Pending.to_string(), "Pending");
        assert_eq!(MySQLPhase::Running.to_string(), "Running");
        assert_eq!(MySQLPhase::Failed.to_string(), "Failed");
    }

    #[test]
    fn test_resource_identity() {
        assert_eq!(MySQL::group(&()), API_GROUP);
        assert_eq!(MySQL::version(&()), API_VERSION);
        assert_eq!(MySQL::kind(&()), "MySQL");
        assert_eq!(MySQL::plural(&()), "mysqls");
        assert_eq!(
            MySQL::api_version(&()),
            format!("{}/{}", API_GROUP, API_VERSION)
        );
    }

    #[test]
    fn test_crd_definition() {
        let crd = MySQL::crd();
        assert_eq!(crd.metadata.name.as_deref(), Some("mysqls.database.mycompany.com"));
        assert_eq!(crd.spec.scope, "Namespaced");

        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1alpha1");
        assert!(version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some());

        let columns: Vec<&str> = version
            .additional_printer_columns
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(columns, vec!["Phase", "Ready", "Age"]);

        let yaml = serde_yaml::to_string(&crd).unwrap();
        assert!(yaml.contains("storageSize"));
    }
}
