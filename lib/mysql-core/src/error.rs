use crate::dependent::DependentKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Kubernetes error: {0}")]
    Kubernetes(#[from] kube::Error),

    #[error("Malformed quantity: {value:?}")]
    MalformedQuantity { value: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("{kind} {name} is already controlled by {owner}")]
    AlreadyOwned {
        kind: DependentKind,
        name: String,
        owner: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Injected failure: {0}")]
    Injected(String),
}

impl CoreError {
    /// Whether a later reconciliation pass can be expected to succeed
    /// without the desired state changing.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Kubernetes(_) | CoreError::Injected(_))
    }

    /// Whether the error is an optimistic-concurrency conflict on write
    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::Kubernetes(kube::Error::Api(resp)) if resp.code == 409)
    }

    /// Stable low-cardinality label for metrics
    pub fn metric_label(&self) -> &'static str {
        match self {
            CoreError::Kubernetes(_) => "kubernetes",
            CoreError::MalformedQuantity { .. } => "malformed_quantity",
            CoreError::MissingField(_) => "missing_field",
            CoreError::AlreadyOwned { .. } => "already_owned",
            CoreError::Serialization(_) => "serialization",
            CoreError::Injected(_) => "injected",
        }
    }
}
