use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single credential request against a named role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredsRequest {
    pub role_name: String,
    /// Namespace the service account (and any namespace-scoped objects) live in.
    pub kubernetes_namespace: String,
    /// Grant the bound role cluster-wide instead of within the namespace.
    /// Only valid when the role targets a ClusterRole.
    #[serde(default)]
    pub cluster_role_binding: bool,
    /// Per-request TTL override; takes precedence over the role default.
    #[serde(default)]
    pub ttl: Option<Duration>,
    /// Display name of the requesting entity, fed to the name template.
    #[serde(default)]
    pub display_name: String,
}

impl CredsRequest {
    pub fn new(role_name: &str, namespace: &str) -> Self {
        Self {
            role_name: role_name.to_string(),
            kubernetes_namespace: namespace.to_string(),
            cluster_role_binding: false,
            ttl: None,
            display_name: String::new(),
        }
    }
}
