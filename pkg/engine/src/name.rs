//! Object name generation.
//!
//! Each issuance renders the role's name template once and reuses the result
//! for every object it creates, so the service account, binding, and any
//! generated role can be correlated and torn down together.

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use pkg_types::validate::{sanitize_name, validate_name};

use crate::EngineError;

/// Substitution inputs available to a name template.
#[derive(Debug, Clone, Default)]
pub struct NameInputs<'a> {
    pub role_name: &'a str,
    pub display_name: &'a str,
}

/// Render a name template.
///
/// Supported tokens: `{{role_name}}`, `{{display_name}}`, `{{unix_time}}`,
/// `{{random N}}` (N hex chars, 1..=32, default 8). Output is lowercased,
/// squashed to `[a-z0-9-]`, and truncated to the 63-char object name limit.
pub fn render_name(template: &str, inputs: &NameInputs<'_>) -> Result<String> {
    let mut out = String::new();
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            return Err(EngineError::Validation(format!(
                "unterminated token in name template {:?}",
                template
            ))
            .into());
        };
        out.push_str(&expand_token(after[..end].trim(), inputs)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);

    let name = sanitize_name(&out);
    validate_name(&name).map_err(|e| EngineError::Validation(e.to_string()))?;
    Ok(name)
}

fn expand_token(token: &str, inputs: &NameInputs<'_>) -> Result<String> {
    match token {
        "role_name" => Ok(inputs.role_name.to_string()),
        "display_name" => Ok(inputs.display_name.to_string()),
        "unix_time" => Ok(Utc::now().timestamp().to_string()),
        _ => {
            if let Some(arg) = token.strip_prefix("random") {
                let n: usize = match arg.trim() {
                    "" => 8,
                    raw => raw.parse().map_err(|_| {
                        EngineError::Validation(format!(
                            "invalid random length in name template token {:?}",
                            token
                        ))
                    })?,
                };
                let n = n.clamp(1, 32);
                Ok(Uuid::new_v4().simple().to_string()[..n].to_string())
            } else {
                Err(EngineError::Validation(format!(
                    "unknown name template token {:?}",
                    token
                ))
                .into())
            }
        }
    }
}
