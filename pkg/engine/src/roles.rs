use anyhow::{Context, Result};
use tracing::info;

use pkg_constants::storage::ROLES_PREFIX;
use pkg_types::role::{Metadata, RoleEntry, RoleType};

use crate::{Backend, EngineError};

/// One upsert against a named role. `None` fields keep the stored value, so
/// partial updates merge onto the existing entry; the merged result is
/// re-validated before anything touches storage.
#[derive(Debug, Clone, Default)]
pub struct RoleParams {
    pub allowed_kubernetes_namespaces: Option<Vec<String>>,
    pub token_ttl: Option<u64>,
    pub token_max_ttl: Option<u64>,
    pub service_account_name: Option<String>,
    pub kubernetes_role_name: Option<String>,
    /// Parsed case-insensitively; stored canonicalized.
    pub kubernetes_role_type: Option<String>,
    pub generated_role_rules: Option<String>,
    pub name_template: Option<String>,
    pub additional_metadata: Option<Metadata>,
}

impl Backend {
    pub async fn read_role(&self, name: &str) -> Result<Option<RoleEntry>> {
        if name.is_empty() {
            return Err(EngineError::Validation("missing role name".to_string()).into());
        }
        match self.storage.get(&role_key(name)).await? {
            Some(bytes) => {
                let role = serde_json::from_slice(&bytes)
                    .with_context(|| format!("failed to decode stored role {:?}", name))?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }

    /// Create or update a role. Every invariant is checked on every write;
    /// an invalid update leaves the previous record untouched.
    pub async fn write_role(&self, name: &str, params: RoleParams) -> Result<()> {
        if name.is_empty() {
            return Err(EngineError::Validation("role name must be specified".to_string()).into());
        }

        let mut entry = self.read_role(name).await?.unwrap_or_else(|| RoleEntry {
            name: name.to_string(),
            ..Default::default()
        });

        if let Some(namespaces) = params.allowed_kubernetes_namespaces {
            entry.allowed_kubernetes_namespaces = namespaces;
        }
        if let Some(ttl) = params.token_ttl {
            entry.token_ttl = ttl;
        }
        if let Some(max_ttl) = params.token_max_ttl {
            entry.token_max_ttl = max_ttl;
        }
        if let Some(sa) = params.service_account_name {
            entry.service_account_name = sa;
        }
        if let Some(role_name) = params.kubernetes_role_name {
            entry.kubernetes_role_name = role_name;
        }
        if let Some(role_type) = params.kubernetes_role_type {
            entry.kubernetes_role_type = RoleType::parse(&role_type)
                .map_err(|e| EngineError::Validation(e.to_string()))?;
        }
        if let Some(rules) = params.generated_role_rules {
            entry.generated_role_rules = rules;
        }
        if let Some(template) = params.name_template {
            entry.name_template = template;
        }
        if let Some(metadata) = params.additional_metadata {
            entry.additional_metadata = metadata;
        }

        entry
            .validate()
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        let bytes = serde_json::to_vec(&entry)?;
        self.storage.put(&role_key(name), &bytes).await?;
        info!("Role {} written", name);
        Ok(())
    }

    /// Remove a role definition. Credentials already issued against it keep
    /// their leases and revoke normally.
    pub async fn delete_role(&self, name: &str) -> Result<()> {
        self.storage.delete(&role_key(name)).await
    }

    pub async fn list_roles(&self) -> Result<Vec<String>> {
        let keys = self.storage.list(ROLES_PREFIX).await?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(ROLES_PREFIX).map(str::to_string))
            .collect())
    }
}

fn role_key(name: &str) -> String {
    format!("{}{}", ROLES_PREFIX, name)
}
