//! Credential revocation.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use pkg_kube::objects::binding_kind;
use pkg_types::role::RoleType;

use crate::{Backend, aggregate};

/// What issuance created, carried inside the host's lease and replayed here
/// when the lease is revoked or expires. Empty name fields mean "not created
/// by that request, leave it alone".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevocationData {
    /// Owning role name, kept so a host can audit leases per role.
    pub role: String,
    pub service_account_namespace: String,
    pub cluster_role_binding: bool,
    pub created_service_account: String,
    pub created_role_binding: String,
    pub created_role: String,
    pub created_role_type: RoleType,
}

impl Backend {
    /// Delete the objects a credential created, in reverse creation order:
    /// binding, then service account, then role. Every delete is attempted
    /// regardless of earlier failures and the errors are aggregated, so one
    /// stuck object type never blocks cleanup of the others. Deletes are
    /// idempotent; revoking twice is harmless.
    pub async fn revoke(&self, data: &RevocationData) -> Result<()> {
        let client = self.client().await?;
        let namespace = &data.service_account_namespace;
        let mut errors = Vec::new();

        if !data.created_role_binding.is_empty() {
            if let Err(e) = client
                .delete_role_binding(
                    namespace,
                    &data.created_role_binding,
                    data.cluster_role_binding,
                )
                .await
            {
                errors.push(e.context(format!(
                    "failed to delete {} '{}/{}'",
                    binding_kind(data.cluster_role_binding),
                    namespace,
                    data.created_role_binding
                )));
            }
        }
        if !data.created_service_account.is_empty() {
            if let Err(e) = client
                .delete_service_account(namespace, &data.created_service_account)
                .await
            {
                errors.push(e.context(format!(
                    "failed to delete ServiceAccount '{}/{}'",
                    namespace, data.created_service_account
                )));
            }
        }
        if !data.created_role.is_empty() {
            if let Err(e) = client
                .delete_role(namespace, &data.created_role, data.created_role_type)
                .await
            {
                errors.push(e.context(format!(
                    "failed to delete {} '{}/{}'",
                    data.created_role_type, namespace, data.created_role
                )));
            }
        }

        aggregate("revocation incomplete", errors)?;
        info!(
            "Revoked credentials for role {} in namespace {}",
            data.role, namespace
        );
        Ok(())
    }
}
