//! Create-if-absent synchronization of dependents
//!
//! Once a dependent exists it is left alone: there is no field-level diff,
//! patch or update, so later edits to the MySQL spec do not reach it.

use crate::client::ClusterClient;
use crate::dependent::Dependent;
use crate::{CoreError, Result};
use mysql_api::MySQL;
use tracing::{debug, error, info};

/// What [`ensure`] did with a dependent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Unchanged,
}

/// Attach ownership to `dependent`, then create it unless it already exists.
///
/// Lookup and create failures are returned unmodified.
pub async fn ensure(
    client: &dyn ClusterClient,
    owner: &MySQL,
    mut dependent: Dependent,
) -> Result<SyncOutcome> {
    client.register_ownership(owner, &mut dependent)?;

    let kind = dependent.kind();
    let key = dependent
        .key()
        .ok_or(CoreError::MissingField("metadata.name"))?;

    if client.exists(kind, &key).await? {
        debug!(kind = %kind, namespace = %key.namespace, name = %key.name, "Dependent already exists");
        return Ok(SyncOutcome::Unchanged);
    }

    info!(kind = %kind, namespace = %key.namespace, name = %key.name, "Creating a new {}", kind);
    if let Err(e) = client.create(&dependent).await {
        error!(kind = %kind, namespace = %key.namespace, name = %key.name, error = %e, "Failed to create new {}", kind);
        return Err(e);
    }
    Ok(SyncOutcome::Created)
}
