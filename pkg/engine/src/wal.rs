//! Write-ahead log for in-flight object creations.
//!
//! Creating the issuance chain is multi-step against an API with no
//! transactions. Intent is logged durably before each remote create; the
//! whole set is retired only once the entire issuance has succeeded. Entries
//! that survive (crash, or a create/later-step failure) are replayed through
//! [`Backend::rollback_wal`] by the host's recovery sweep, which deletes the
//! orphaned objects.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use pkg_constants::storage::WAL_PREFIX;
use pkg_constants::wal::MAX_WAL_AGE_SECS;
use pkg_state::Storage;
use pkg_types::role::RoleType;

use crate::{Backend, aggregate};

/// Durable record of one remote create, written before the create happens.
///
/// Each entry carries an expiration acting as a recovery circuit-breaker:
/// past it, a rollback that still cannot delete its target drops the entry
/// instead of retrying forever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WalEntry {
    Role {
        namespace: String,
        name: String,
        role_type: RoleType,
        expiration: DateTime<Utc>,
    },
    RoleBinding {
        namespace: String,
        name: String,
        is_cluster: bool,
        expiration: DateTime<Utc>,
    },
    ServiceAccount {
        namespace: String,
        name: String,
        expiration: DateTime<Utc>,
    },
}

impl WalEntry {
    /// Decode a stored entry. An unknown kind tag fails here; the sweep
    /// reports such records and moves on rather than rolling them back.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("failed to decode WAL entry")
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn expiration(&self) -> DateTime<Utc> {
        match self {
            WalEntry::Role { expiration, .. }
            | WalEntry::RoleBinding { expiration, .. }
            | WalEntry::ServiceAccount { expiration, .. } => *expiration,
        }
    }
}

/// Default expiration for a new entry: now plus the max WAL age.
pub fn wal_expiration() -> DateTime<Utc> {
    Utc::now() + Duration::seconds(MAX_WAL_AGE_SECS)
}

/// The guarded-multi-step utility: log intent → perform the step → once the
/// *overall* operation succeeds, retire every logged entry. Entries are
/// deliberately not retired per step, so a later-step failure still leaves
/// the earlier entries for the recovery sweep.
#[derive(Default)]
pub struct WalSet {
    ids: Vec<String>,
}

impl WalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Durably log intent for the next remote create.
    pub async fn log(&mut self, storage: &dyn Storage, entry: &WalEntry) -> Result<()> {
        let id = Uuid::new_v4().to_string();
        storage
            .put(&format!("{}{}", WAL_PREFIX, id), &entry.encode()?)
            .await
            .context("error writing WAL entry")?;
        debug!("WAL entry {} logged: {:?}", id, entry);
        self.ids.push(id);
        Ok(())
    }

    /// Delete every logged entry after the overall operation succeeded.
    /// All deletions are attempted; failures are aggregated.
    pub async fn retire(self, storage: &dyn Storage) -> Result<()> {
        let mut errors = Vec::new();
        for id in &self.ids {
            if let Err(e) = storage.delete(&format!("{}{}", WAL_PREFIX, id)).await {
                errors.push(e.context(format!("error deleting WAL entry {}", id)));
            }
        }
        aggregate("WAL cleanup failed", errors)
    }
}

impl Backend {
    /// Undo the create a WAL entry protects. Invoked by the host's recovery
    /// sweep for every entry still in the log.
    ///
    /// Deletes are idempotent, so an entry whose create never happened (or
    /// was already cleaned up) rolls back successfully. A failed delete
    /// propagates so the sweep retries later, unless the entry has expired;
    /// then the failure is swallowed and the entry is dropped, trading a
    /// possible remote-object leak for bounded WAL growth.
    pub async fn rollback_wal(&self, entry: &WalEntry) -> Result<()> {
        let client = self.client().await?;

        let result = match entry {
            WalEntry::Role {
                namespace,
                name,
                role_type,
                ..
            } => {
                debug!("rolling back {} {}/{}", role_type, namespace, name);
                client.delete_role(namespace, name, *role_type).await
            }
            WalEntry::RoleBinding {
                namespace,
                name,
                is_cluster,
                ..
            } => {
                debug!(
                    "rolling back role binding {}/{} (cluster={})",
                    namespace, name, is_cluster
                );
                client.delete_role_binding(namespace, name, *is_cluster).await
            }
            WalEntry::ServiceAccount {
                namespace, name, ..
            } => {
                debug!("rolling back service account {}/{}", namespace, name);
                client.delete_service_account(namespace, name).await
            }
        };

        if let Err(e) = result {
            if Utc::now() > entry.expiration() {
                warn!(
                    "WAL entry expired, dropping despite rollback failure: {:#}",
                    e
                );
                return Ok(());
            }
            return Err(e);
        }
        Ok(())
    }

    /// One pass of the recovery sweep: roll back every stored WAL entry and
    /// delete the entries whose rollback succeeded. Run periodically and at
    /// startup by the host (or the dev harness).
    pub async fn process_wal(&self) -> Result<usize> {
        let keys = self.storage.list(WAL_PREFIX).await?;
        let mut retired = 0;
        let mut errors = Vec::new();

        for key in keys {
            let Some(bytes) = self.storage.get(&key).await? else {
                continue;
            };
            // an undecodable record must not block rollback of the rest
            let entry = match WalEntry::decode(&bytes) {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(e.context(format!("skipping undecodable entry {}", key)));
                    continue;
                }
            };
            match self.rollback_wal(&entry).await {
                Ok(()) => {
                    self.storage.delete(&key).await?;
                    retired += 1;
                }
                Err(e) => {
                    errors.push(e.context(format!("rollback failed for {}", key)));
                }
            }
        }

        aggregate("WAL sweep incomplete", errors)?;
        Ok(retired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_uses_kind_tags() {
        let entry = WalEntry::RoleBinding {
            namespace: "app".to_string(),
            name: "creds-1".to_string(),
            is_cluster: false,
            expiration: wal_expiration(),
        };
        let json: serde_json::Value = serde_json::from_slice(&entry.encode().unwrap()).unwrap();
        assert_eq!(json["kind"], "roleBinding");

        let entry = WalEntry::ServiceAccount {
            namespace: "app".to_string(),
            name: "creds-1".to_string(),
            expiration: wal_expiration(),
        };
        let json: serde_json::Value = serde_json::from_slice(&entry.encode().unwrap()).unwrap();
        assert_eq!(json["kind"], "serviceAccount");
    }

    #[test]
    fn decode_round_trip() {
        let entry = WalEntry::Role {
            namespace: "app".to_string(),
            name: "creds-1".to_string(),
            role_type: RoleType::ClusterRole,
            expiration: wal_expiration(),
        };
        let decoded = WalEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn unknown_kind_fails_decode() {
        let raw = br#"{"kind":"volume","namespace":"app","name":"x"}"#;
        assert!(WalEntry::decode(raw).is_err());
    }

    #[test]
    fn expiration_is_in_the_future() {
        assert!(wal_expiration() > Utc::now());
    }
}
