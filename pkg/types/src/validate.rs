use anyhow::{Result, bail};

/// Validate a Kubernetes-style object name.
/// Rules: lowercase `[a-z0-9-]`, max 63 chars, no leading/trailing hyphens.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("name must not be empty");
    }
    if name.len() > 63 {
        bail!("name '{}' exceeds 63 characters (got {})", name, name.len());
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("name '{}' must not start or end with a hyphen", name);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        bail!(
            "name '{}' must contain only lowercase letters, digits, and hyphens [a-z0-9-]",
            name
        );
    }
    Ok(())
}

/// Coerce arbitrary template output into a valid object name: lowercase,
/// squash disallowed characters to hyphens, truncate to 63, trim hyphens.
pub fn sanitize_name(raw: &str) -> String {
    let mut out: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    out.truncate(63);
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_name("sample-app").is_ok());
        assert!(validate_name("v-token-review-1700000000").is_ok());
        assert!(validate_name("a").is_ok());
    }

    #[test]
    fn invalid_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name("Sample-App").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name("trailing-").is_err());
        assert!(validate_name("under_score").is_err());
        assert!(validate_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn sanitize_squashes_and_truncates() {
        assert_eq!(sanitize_name("Root User"), "root-user");
        assert_eq!(sanitize_name("--padded--"), "padded");
        let long = sanitize_name(&"x".repeat(100));
        assert_eq!(long.len(), 63);
        assert!(validate_name(&sanitize_name("Token.Review@7")).is_ok());
    }
}
