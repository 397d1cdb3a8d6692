//! Dependent objects owned by a MySQL

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::fmt;

/// Identity of a namespaced object, as delivered by the dispatch layer
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// The four kinds of object created for every MySQL, in creation order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependentKind {
    Secret,
    PersistentVolumeClaim,
    Deployment,
    Service,
}

impl DependentKind {
    pub const ALL: [DependentKind; 4] = [
        DependentKind::Secret,
        DependentKind::PersistentVolumeClaim,
        DependentKind::Deployment,
        DependentKind::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependentKind::Secret => "Secret",
            DependentKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            DependentKind::Deployment => "Deployment",
            DependentKind::Service => "Service",
        }
    }
}

impl fmt::Display for DependentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully specified dependent object, ready to be created
#[derive(Clone, Debug, PartialEq)]
pub enum Dependent {
    Secret(Secret),
    PersistentVolumeClaim(PersistentVolumeClaim),
    Deployment(Deployment),
    Service(Service),
}

impl Dependent {
    pub fn kind(&self) -> DependentKind {
        match self {
            Dependent::Secret(_) => DependentKind::Secret,
            Dependent::PersistentVolumeClaim(_) => DependentKind::PersistentVolumeClaim,
            Dependent::Deployment(_) => DependentKind::Deployment,
            Dependent::Service(_) => DependentKind::Service,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Dependent::Secret(o) => &o.metadata,
            Dependent::PersistentVolumeClaim(o) => &o.metadata,
            Dependent::Deployment(o) => &o.metadata,
            Dependent::Service(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Dependent::Secret(o) => &mut o.metadata,
            Dependent::PersistentVolumeClaim(o) => &mut o.metadata,
            Dependent::Deployment(o) => &mut o.metadata,
            Dependent::Service(o) => &mut o.metadata,
        }
    }

    /// Namespace and name of the object; both are always set by the builders
    pub fn key(&self) -> Option<ObjectKey> {
        let meta = self.metadata();
        Some(ObjectKey::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}
