use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::rbac::parse_rules;

// --- Role type ---

/// Whether generated/bound RBAC objects are namespace- or cluster-scoped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleType {
    #[default]
    Role,
    ClusterRole,
}

impl RoleType {
    /// Parse a role type case-insensitively ("role", "ClusterRole", "CLUSTERROLE", ...).
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "role" => Ok(RoleType::Role),
            "clusterrole" => Ok(RoleType::ClusterRole),
            _ => bail!("kubernetes_role_type must be either 'Role' or 'ClusterRole'"),
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleType::Role => write!(f, "Role"),
            RoleType::ClusterRole => write!(f, "ClusterRole"),
        }
    }
}

// --- Metadata ---

/// Extra labels/annotations stamped onto every generated Kubernetes object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

// --- Role entry ---

/// A named credentials role, persisted at `roles/<name>`.
///
/// Exactly one of `service_account_name`, `kubernetes_role_name`, or
/// `generated_role_rules` is set; that choice selects the issuance path
/// (token only / bind to existing role / generate the full chain).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub name: String,
    /// Namespaces credentials may be issued into; `"*"` allows any.
    pub allowed_kubernetes_namespaces: Vec<String>,
    /// Default token TTL in seconds; 0 means "use the system default".
    #[serde(default)]
    pub token_ttl: u64,
    /// Upper bound on the token TTL in seconds; 0 means unbounded.
    #[serde(default)]
    pub token_max_ttl: u64,
    /// Pre-existing service account to issue tokens for.
    #[serde(default)]
    pub service_account_name: String,
    /// Pre-existing Role/ClusterRole to bind a generated service account to.
    #[serde(default)]
    pub kubernetes_role_name: String,
    #[serde(default)]
    pub kubernetes_role_type: RoleType,
    /// Inline JSON-or-YAML policy rules used to generate a Role/ClusterRole.
    #[serde(default)]
    pub generated_role_rules: String,
    /// Template for generated object names; empty selects the built-in default.
    #[serde(default)]
    pub name_template: String,
    #[serde(default)]
    pub additional_metadata: Metadata,
}

impl RoleEntry {
    /// Check every write-time invariant. Called on each upsert so partial
    /// updates cannot leave an invalid record behind.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!("role name must be specified");
        }
        if self.allowed_kubernetes_namespaces.is_empty() {
            bail!("allowed_kubernetes_namespaces must be set");
        }
        let set = [
            &self.service_account_name,
            &self.kubernetes_role_name,
            &self.generated_role_rules,
        ]
        .iter()
        .filter(|v| !v.is_empty())
        .count();
        if set != 1 {
            bail!(
                "one (and only one) of service_account_name, kubernetes_role_name or generated_role_rules must be set"
            );
        }
        if self.token_ttl > 0 && self.token_max_ttl > 0 && self.token_ttl > self.token_max_ttl {
            bail!("token_ttl {}s exceeds token_max_ttl {}s", self.token_ttl, self.token_max_ttl);
        }
        if !self.generated_role_rules.is_empty() {
            parse_rules(&self.generated_role_rules)?;
        }
        Ok(())
    }

    /// True when `namespace` is covered by the role's allow list.
    pub fn allows_namespace(&self, namespace: &str) -> bool {
        self.allowed_kubernetes_namespaces
            .iter()
            .any(|ns| ns == "*" || ns == namespace)
    }
}
