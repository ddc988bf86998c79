//! Minimal wire representations of the Kubernetes objects the engine creates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use pkg_constants::kube::RBAC_API_VERSION;
use pkg_types::rbac::{PolicyRule, RoleRef, Subject};
use pkg_types::role::{Metadata, RoleType};

/// Parent/child link for Kubernetes cascade deletion. The remote garbage
/// collector is only a secondary cleanup mechanism; explicit revocation and
/// WAL rollback never rely on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    /// Object metadata carrying the role's extra labels/annotations and an
    /// optional owning parent.
    pub fn new(
        name: &str,
        namespace: Option<&str>,
        metadata: &Metadata,
        owner: Option<&OwnerReference>,
    ) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            labels: metadata.labels.clone(),
            annotations: metadata.annotations.clone(),
            owner_references: owner.into_iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAccountObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
}

impl ServiceAccountObject {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "ServiceAccount".to_string(),
            metadata,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub rules: Vec<PolicyRule>,
}

impl RoleObject {
    pub fn new(role_type: RoleType, metadata: ObjectMeta, rules: &[PolicyRule]) -> Self {
        Self {
            api_version: RBAC_API_VERSION.to_string(),
            kind: role_type.to_string(),
            metadata,
            rules: rules.to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBindingObject {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub subjects: Vec<Subject>,
    pub role_ref: RoleRef,
}

impl RoleBindingObject {
    pub fn new(
        is_cluster: bool,
        metadata: ObjectMeta,
        subject: Subject,
        role_type: RoleType,
        role_ref_name: &str,
    ) -> Self {
        Self {
            api_version: RBAC_API_VERSION.to_string(),
            kind: binding_kind(is_cluster).to_string(),
            metadata,
            subjects: vec![subject],
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: role_type.to_string(),
                name: role_ref_name.to_string(),
            },
        }
    }
}

pub fn binding_kind(is_cluster: bool) -> &'static str {
    if is_cluster { "ClusterRoleBinding" } else { "RoleBinding" }
}

// --- TokenRequest ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub api_version: String,
    pub kind: String,
    pub spec: TokenRequestSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequestSpec {
    pub expiration_seconds: i64,
}

impl TokenRequest {
    pub fn new(expiration_seconds: i64) -> Self {
        Self {
            api_version: "authentication.k8s.io/v1".to_string(),
            kind: "TokenRequest".to_string(),
            spec: TokenRequestSpec { expiration_seconds },
        }
    }
}

/// The issued token as returned by the TokenRequest subresource.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub token: String,
    #[serde(default)]
    pub expiration_timestamp: Option<String>,
}

/// The slice of a create response the client cares about.
#[derive(Debug, Deserialize)]
pub struct CreatedObject {
    #[serde(default)]
    pub metadata: CreatedMeta,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatedMeta {
    #[serde(default)]
    pub uid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_meta_skips_empty_fields() {
        let meta = ObjectMeta::new("creds-abc", Some("app"), &Metadata::default(), None);
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["name"], "creds-abc");
        assert_eq!(json["namespace"], "app");
        assert!(json.get("labels").is_none());
        assert!(json.get("ownerReferences").is_none());
    }

    #[test]
    fn binding_references_service_account() {
        let binding = RoleBindingObject::new(
            false,
            ObjectMeta::new("creds-abc", Some("app"), &Metadata::default(), None),
            Subject::service_account("creds-abc", "app"),
            RoleType::Role,
            "existing-role",
        );
        let json = serde_json::to_value(&binding).unwrap();
        assert_eq!(json["kind"], "RoleBinding");
        assert_eq!(json["roleRef"]["kind"], "Role");
        assert_eq!(json["roleRef"]["name"], "existing-role");
        assert_eq!(json["subjects"][0]["kind"], "ServiceAccount");
        assert_eq!(json["subjects"][0]["namespace"], "app");
    }

    #[test]
    fn token_request_wire_format() {
        let req = TokenRequest::new(600);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["apiVersion"], "authentication.k8s.io/v1");
        assert_eq!(json["spec"]["expirationSeconds"], 600);
    }
}
