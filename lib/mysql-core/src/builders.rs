//! Kubernetes Resource Builders
//!
//! This module generates the Secret, PersistentVolumeClaim, Deployment and
//! Service owned by a MySQL. Every builder is a pure function of the spec,
//! the canonical name and the namespace: no cluster state is consulted, so
//! building is safe on every reconciliation pass.

use crate::dependent::{Dependent, DependentKind};
use crate::naming;
use crate::quantity::parse_quantity;
use crate::Result;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec,
    Secret, SecretKeySelector, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use mysql_api::MySQLSpec;
use std::collections::BTreeMap;

/// Image repository; the tag is the spec's version string, unvalidated
pub const MYSQL_IMAGE_REPOSITORY: &str = "mysql";
/// Port the database listens on, in the container and on the Service
pub const MYSQL_PORT: i32 = 3306;
/// Name of the container and of its port
pub const MYSQL_PORT_NAME: &str = "mysql";
/// Key of the root password inside the Secret
pub const ROOT_PASSWORD_KEY: &str = "root-password";
/// Environment variable the image reads the root password from
pub const ROOT_PASSWORD_ENV: &str = "MYSQL_ROOT_PASSWORD";
/// Password used when the spec leaves `rootPassword` empty.
///
/// This is a well-known credential. It is kept for compatibility with
/// existing resources that rely on it; set `rootPassword` in production.
pub const DEFAULT_ROOT_PASSWORD: &str = "changeme";
/// Pod volume backed by the claim
pub const DATA_VOLUME_NAME: &str = "mysql-data";
/// MySQL data directory
pub const DATA_MOUNT_PATH: &str = "/var/lib/mysql";
/// Label key shared by the Deployment selector, the pod template and the Service selector
pub const APP_LABEL: &str = "app";

/// Whether the spec falls back to [`DEFAULT_ROOT_PASSWORD`]
pub fn uses_default_password(spec: &MySQLSpec) -> bool {
    spec.root_password.is_empty()
}

/// Builder for the dependent objects of one MySQL
pub struct ResourceBuilder<'a> {
    spec: &'a MySQLSpec,
    name: &'a str,
    namespace: &'a str,
}

impl<'a> ResourceBuilder<'a> {
    /// `name` must already be canonical (see [`naming::canonicalize`])
    pub fn new(spec: &'a MySQLSpec, name: &'a str, namespace: &'a str) -> Self {
        Self {
            spec,
            name,
            namespace,
        }
    }

    /// Labels selecting the database pods
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(APP_LABEL.to_string(), self.name.to_string())])
    }

    fn metadata(&self, name: String) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.namespace.to_string()),
            ..Default::default()
        }
    }

    /// Build the dependent of the given kind
    pub fn build(&self, kind: DependentKind) -> Result<Dependent> {
        Ok(match kind {
            DependentKind::Secret => Dependent::Secret(self.build_secret()),
            DependentKind::PersistentVolumeClaim => {
                Dependent::PersistentVolumeClaim(self.build_claim()?)
            }
            DependentKind::Deployment => Dependent::Deployment(self.build_deployment()),
            DependentKind::Service => Dependent::Service(self.build_service()),
        })
    }

    /// Build all four dependents in creation order
    pub fn build_dependents(&self) -> Result<Vec<Dependent>> {
        DependentKind::ALL
            .iter()
            .map(|kind| self.build(*kind))
            .collect()
    }

    /// Build the Secret holding the root password
    pub fn build_secret(&self) -> Secret {
        let password = if uses_default_password(self.spec) {
            DEFAULT_ROOT_PASSWORD.to_string()
        } else {
            self.spec.root_password.clone()
        };

        Secret {
            metadata: self.metadata(naming::secret_name(self.name)),
            string_data: Some(BTreeMap::from([(ROOT_PASSWORD_KEY.to_string(), password)])),
            ..Default::default()
        }
    }

    /// Build the PersistentVolumeClaim for the data directory
    pub fn build_claim(&self) -> Result<PersistentVolumeClaim> {
        let storage = parse_quantity(&self.spec.storage_size)?;

        Ok(PersistentVolumeClaim {
            metadata: self.metadata(naming::claim_name(self.name)),
            spec: Some(PersistentVolumeClaimSpec {
                access_modes: Some(vec!["ReadWriteOnce".to_string()]),
                resources: Some(VolumeResourceRequirements {
                    requests: Some(BTreeMap::from([("storage".to_string(), storage)])),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    /// Build the single-replica Deployment running MySQL
    pub fn build_deployment(&self) -> Deployment {
        let labels = self.selector_labels();

        Deployment {
            metadata: self.metadata(naming::deployment_name(self.name)),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![self.build_container()],
                        volumes: Some(vec![Volume {
                            name: DATA_VOLUME_NAME.to_string(),
                            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                                claim_name: naming::claim_name(self.name),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn build_container(&self) -> Container {
        Container {
            name: MYSQL_PORT_NAME.to_string(),
            image: Some(format!("{}:{}", MYSQL_IMAGE_REPOSITORY, self.spec.version)),
            ports: Some(vec![ContainerPort {
                container_port: MYSQL_PORT,
                name: Some(MYSQL_PORT_NAME.to_string()),
                ..Default::default()
            }]),
            // The password is referenced, never inlined into the pod spec
            env: Some(vec![EnvVar {
                name: ROOT_PASSWORD_ENV.to_string(),
                value_from: Some(EnvVarSource {
                    secret_key_ref: Some(SecretKeySelector {
                        name: naming::secret_name(self.name),
                        key: ROOT_PASSWORD_KEY.to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            volume_mounts: Some(vec![VolumeMount {
                name: DATA_VOLUME_NAME.to_string(),
                mount_path: DATA_MOUNT_PATH.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    /// Build the ClusterIP Service in front of the database pods
    pub fn build_service(&self) -> Service {
        Service {
            metadata: self.metadata(naming::service_name(self.name)),
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".to_string()),
                selector: Some(self.selector_labels()),
                ports: Some(vec![ServicePort {
                    name: Some(MYSQL_PORT_NAME.to_string()),
                    port: MYSQL_PORT,
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    fn spec(password: &str) -> MySQLSpec {
        MySQLSpec {
            version: "8.0".to_string(),
            storage_size: "10Gi".to_string(),
            root_password: password.to_string(),
        }
    }

    #[test]
    fn test_secret_uses_spec_password() {
        let spec = spec("hunter2");
        let secret = ResourceBuilder::new(&spec, "sample-db", "ns1").build_secret();
        assert_eq!(secret.metadata.name.as_deref(), Some("sample-db-secret"));
        assert_eq!(secret.metadata.namespace.as_deref(), Some("ns1"));
        assert_eq!(
            secret.string_data.unwrap().get(ROOT_PASSWORD_KEY).map(String::as_str),
            Some("hunter2")
        );
        assert!(!uses_default_password(&spec));
    }

    #[test]
    fn test_secret_falls_back_to_default_password() {
        let spec = spec("");
        let secret = ResourceBuilder::new(&spec, "sample-db", "ns1").build_secret();
        assert_eq!(
            secret.string_data.unwrap().get(ROOT_PASSWORD_KEY).map(String::as_str),
            Some(DEFAULT_ROOT_PASSWORD)
        );
        assert!(uses_default_password(&spec));
    }

    #[test]
    fn test_claim_requests_storage() {
        let spec = spec("");
        let pvc = ResourceBuilder::new(&spec, "sample-db", "ns1").build_claim().unwrap();
        assert_eq!(pvc.metadata.name.as_deref(), Some("sample-db-pvc"));

        let pvc_spec = pvc.spec.unwrap();
        assert_eq!(pvc_spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        let requests = pvc_spec.resources.unwrap().requests.unwrap();
        assert_eq!(requests.get("storage").map(|q| q.0.as_str()), Some("10Gi"));
    }

    #[test]
    fn test_claim_rejects_malformed_storage_size() {
        let mut spec = spec("");
        spec.storage_size = "lots".to_string();
        let builder = ResourceBuilder::new(&spec, "sample-db", "ns1");
        assert!(matches!(
            builder.build_claim(),
            Err(CoreError::MalformedQuantity { .. })
        ));
        assert!(builder.build_dependents().is_err());
    }

    #[test]
    fn test_deployment_shape() {
        let spec = spec("");
        let deployment = ResourceBuilder::new(&spec, "sample-db", "ns1").build_deployment();
        assert_eq!(deployment.metadata.name.as_deref(), Some("sample-db"));

        let dep_spec = deployment.spec.unwrap();
        assert_eq!(dep_spec.replicas, Some(1));

        let pod = dep_spec.template.spec.unwrap();
        let container = &pod.containers[0];
        assert_eq!(container.name, "mysql");
        assert_eq!(container.image.as_deref(), Some("mysql:8.0"));

        let port = &container.ports.as_ref().unwrap()[0];
        assert_eq!(port.container_port, 3306);
        assert_eq!(port.name.as_deref(), Some("mysql"));

        let mount = &container.volume_mounts.as_ref().unwrap()[0];
        assert_eq!(mount.name, DATA_VOLUME_NAME);
        assert_eq!(mount.mount_path, "/var/lib/mysql");

        let volume = &pod.volumes.unwrap()[0];
        assert_eq!(volume.name, DATA_VOLUME_NAME);
        assert_eq!(
            volume.persistent_volume_claim.as_ref().unwrap().claim_name,
            "sample-db-pvc"
        );
    }

    #[test]
    fn test_deployment_references_secret_for_password() {
        let spec = spec("hunter2");
        let deployment = ResourceBuilder::new(&spec, "sample-db", "ns1").build_deployment();
        let container = &deployment.spec.unwrap().template.spec.unwrap().containers[0];
        let env = &container.env.as_ref().unwrap()[0];

        assert_eq!(env.name, ROOT_PASSWORD_ENV);
        assert!(env.value.is_none());
        let key_ref = env.value_from.as_ref().unwrap().secret_key_ref.as_ref().unwrap();
        assert_eq!(key_ref.name, "sample-db-secret");
        assert_eq!(key_ref.key, ROOT_PASSWORD_KEY);
    }

    #[test]
    fn test_service_shape() {
        let spec = spec("");
        let service = ResourceBuilder::new(&spec, "sample-db", "ns1").build_service();
        assert_eq!(service.metadata.name.as_deref(), Some("sample-db-service"));

        let svc_spec = service.spec.unwrap();
        assert_eq!(svc_spec.type_.as_deref(), Some("ClusterIP"));
        let port = &svc_spec.ports.unwrap()[0];
        assert_eq!(port.port, 3306);
        assert_eq!(port.name.as_deref(), Some("mysql"));
        assert_eq!(port.protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn test_selectors_match_pod_labels() {
        let spec = spec("");
        let builder = ResourceBuilder::new(&spec, "sample-db", "ns1");
        let expected = BTreeMap::from([("app".to_string(), "sample-db".to_string())]);

        let dep_spec = builder.build_deployment().spec.unwrap();
        assert_eq!(dep_spec.selector.match_labels.as_ref(), Some(&expected));
        assert_eq!(
            dep_spec.template.metadata.unwrap().labels.as_ref(),
            Some(&expected)
        );
        assert_eq!(
            builder.build_service().spec.unwrap().selector.as_ref(),
            Some(&expected)
        );
    }

    #[test]
    fn test_builders_are_deterministic() {
        let spec = spec("pw");
        let first = ResourceBuilder::new(&spec, "sample-db", "ns1").build_dependents().unwrap();
        let second = ResourceBuilder::new(&spec, "sample-db", "ns1").build_dependents().unwrap();
        assert_eq!(first, second);
        let kinds: Vec<DependentKind> = first.iter().map(Dependent::kind).collect();
        assert_eq!(kinds, DependentKind::ALL.to_vec());
    }
}
