//! Controller owner references linking dependents to their MySQL
//!
//! A dependent records its owner as `(apiVersion, kind, name, uid)`. The
//! control plane's garbage collector deletes every dependent once the owning
//! MySQL is gone; the operator never deletes dependents itself.

use crate::dependent::Dependent;
use crate::{CoreError, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use mysql_api::MySQL;

/// Controller owner reference pointing at `owner`.
///
/// The reference blocks owner deletion, so a foreground delete of the MySQL
/// waits for its dependents to be removed first.
pub fn controller_owner_ref(owner: &MySQL) -> Result<OwnerReference> {
    if owner.metadata.name.is_none() {
        return Err(CoreError::MissingField("metadata.name"));
    }
    let reference = owner
        .controller_owner_ref(&())
        .ok_or(CoreError::MissingField("metadata.uid"))?;
    Ok(OwnerReference {
        block_owner_deletion: Some(true),
        ..reference
    })
}

/// Make `owner` the controller of `dependent`.
///
/// Re-registering the same owner replaces its reference in place. A dependent
/// already controlled by another object is rejected.
pub fn set_controller_reference(owner: &MySQL, dependent: &mut Dependent) -> Result<()> {
    let reference = controller_owner_ref(owner)?;
    let kind = dependent.kind();
    let meta = dependent.metadata_mut();
    let refs = meta.owner_references.get_or_insert_with(Vec::new);

    if let Some(existing) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != reference.uid)
    {
        return Err(CoreError::AlreadyOwned {
            kind,
            name: meta.name.clone().unwrap_or_default(),
            owner: format!("{}/{}", existing.kind, existing.name),
        });
    }

    refs.retain(|r| r.uid != reference.uid);
    refs.push(reference);
    Ok(())
}
