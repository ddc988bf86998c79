//! Credential issuance engine.
//!
//! The engine vends short-lived Kubernetes service-account credentials on
//! behalf of an embedding host. Depending on the role it either issues a
//! token for an existing service account, or creates a chain of dependent
//! objects (Role/ClusterRole → binding → service account) and tokens the
//! result. The chain is a pseudo-transaction over a non-transactional API:
//! every remote create is preceded by a write-ahead-log entry, and a rollback
//! sweep deletes whatever a crashed or failed issuance left behind.

use thiserror::Error;

pub mod backend;
pub mod config;
pub mod creds;
pub mod name;
pub mod revoke;
pub mod roles;
pub mod wal;

pub use backend::Backend;
pub use creds::{IssuedCredential, LeaseSettings};
pub use revoke::RevocationData;
pub use roles::RoleParams;
pub use wal::{WalEntry, WalSet};

/// Typed failures the host distinguishes; everything else travels as opaque
/// `anyhow` context chains.
#[derive(Debug, Error)]
pub enum EngineError {
    /// User-correctable request or role shape problem. Raised before any
    /// remote side effect.
    #[error("{0}")]
    Validation(String),

    /// Issued credentials are bound to their token lifetime and cannot be
    /// renewed.
    #[error("kubernetes credentials are not renewable")]
    RenewalUnsupported,
}

/// Collapse a batch of independent failures into one error, or `Ok` when the
/// batch is empty. Used where every cleanup step must be attempted even after
/// earlier ones fail.
pub(crate) fn aggregate(what: &str, errors: Vec<anyhow::Error>) -> anyhow::Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(|e| format!("{:#}", e))
        .collect::<Vec<_>>()
        .join("; ");
    anyhow::bail!("{} ({} errors): {}", what, errors.len(), joined)
}
