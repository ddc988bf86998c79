use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// --- Policy rules ---

/// A single RBAC rule, in `rbac.authorization.k8s.io/v1` wire format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    /// API groups this rule applies to (e.g., "" for core, "*" for all)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_groups: Vec<String>,
    /// Resource types (e.g., "pods", "serviceaccounts", "*" for all)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    /// Allowed verbs (e.g., "get", "list", "create", "update", "delete", "*" for all)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verbs: Vec<String>,
    /// Restrict the rule to named resource instances.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_names: Vec<String>,
    /// Non-resource URL paths (ClusterRole only).
    #[serde(default, rename = "nonResourceURLs", skip_serializing_if = "Vec::is_empty")]
    pub non_resource_urls: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RuleSet {
    #[serde(default)]
    rules: Vec<PolicyRule>,
}

/// Parse a `generated_role_rules` policy document.
///
/// The document is a `{"rules": [...]}` object, accepted as JSON first and
/// YAML as a fallback. A document that parses as neither is a validation
/// error surfaced to the role writer.
pub fn parse_rules(doc: &str) -> Result<Vec<PolicyRule>> {
    let parsed: RuleSet = match serde_json::from_str(doc) {
        Ok(rs) => rs,
        Err(_) => serde_yaml::from_str(doc)
            .context("failed to parse rules as a JSON or YAML PolicyRule document")?,
    };
    Ok(parsed.rules)
}

// --- Bindings ---

/// Identity a RoleBinding/ClusterRoleBinding grants permissions to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Subject {
    pub fn service_account(name: &str, namespace: &str) -> Self {
        Self {
            kind: "ServiceAccount".to_string(),
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
        }
    }
}

/// Reference from a binding to the Role/ClusterRole it grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    pub api_group: String,
    pub kind: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rules_json() {
        let doc = r#"{"rules":[{"apiGroups":[""],"resources":["pods"],"verbs":["get","list"]}]}"#;
        let rules = parse_rules(doc).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].resources, vec!["pods"]);
        assert_eq!(rules[0].verbs, vec!["get", "list"]);
    }

    #[test]
    fn parse_rules_yaml() {
        let doc = "rules:\n- apiGroups: [\"\"]\n  resources: [\"secrets\"]\n  verbs: [\"get\"]\n";
        let rules = parse_rules(doc).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].resources, vec!["secrets"]);
    }

    #[test]
    fn parse_rules_garbage() {
        assert!(parse_rules("{rules: [{{").is_err());
    }

    #[test]
    fn rule_wire_format() {
        let rule = PolicyRule {
            api_groups: vec!["".to_string()],
            resources: vec!["pods".to_string()],
            verbs: vec!["get".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert!(json.get("apiGroups").is_some());
        assert!(json.get("resourceNames").is_none());
    }
}
