use crate::base32;
use sha2::{Digest, Sha256};
use thrum_types::{AgentName, Error, RESERVED_AGENT_NAMES};

const ROLE_ID_LEN: usize = 10;

/// Validate a user-supplied agent name against the naming grammar: lowercase
/// ASCII letters, digits and underscores only, non-empty, not a reserved
/// word. Rejects mixed case, dots, spaces and path separators rather than
/// silently normalizing them, so a typo never resolves to a different agent
/// than the one the caller meant.
pub fn validate_agent_name(raw: &str) -> Result<AgentName, Error> {
    if raw.is_empty() {
        return Err(Error::validation("agent name must not be empty"));
    }
    if raw.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::validation(format!(
            "agent name '{raw}' must be lowercase"
        )));
    }
    if !raw
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(Error::validation(format!(
            "agent name '{raw}' may only contain lowercase letters, digits and underscores"
        )));
    }
    if RESERVED_AGENT_NAMES.contains(&raw) {
        return Err(Error::validation(format!(
            "agent name '{raw}' is reserved"
        )));
    }
    Ok(AgentName::from_validated(raw))
}

/// Normalize an arbitrary string into a safe git branch component: lowercase,
/// collapse any run of characters outside `[a-z0-9_]` into a single `_`, trim
/// leading/trailing separators, and fall back to `"main"` if nothing is left.
pub fn sanitize_branch_name(raw: &str) -> String {
    let lowered = raw.to_ascii_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_sep = false;
    for ch in lowered.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "main".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Derive a stable `role_`-prefixed agent id for a role-scoped agent (one
/// that isn't tied to a single human-chosen name). The id is a pure function
/// of `(repo_id, role, module)` so the same role running in the same module
/// of the same repo always resolves to the same agent across restarts and
/// across machines.
pub fn mint_role_agent_id(repo_id: &str, role: &str, module: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(repo_id.as_bytes());
    hasher.update(b"|");
    hasher.update(role.as_bytes());
    hasher.update(b"|");
    hasher.update(module.as_bytes());
    let digest = hasher.finalize();
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&digest[..16]);
    let value = u128::from_be_bytes(buf);
    format!(
        "role_{}",
        base32::encode_u128(value, ROLE_ID_LEN).to_ascii_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_snake_case_names() {
        assert!(validate_agent_name("claude_backend").is_ok());
    }

    #[test]
    fn rejects_mixed_case() {
        assert!(validate_agent_name("Claude").is_err());
    }

    #[test]
    fn rejects_dots_and_spaces() {
        assert!(validate_agent_name("claude.backend").is_err());
        assert!(validate_agent_name("claude backend").is_err());
    }

    #[test]
    fn rejects_path_separators() {
        assert!(validate_agent_name("claude/backend").is_err());
    }

    #[test]
    fn rejects_reserved_names() {
        assert!(validate_agent_name("daemon").is_err());
        assert!(validate_agent_name("all").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(validate_agent_name("").is_err());
    }

    #[test]
    fn sanitizes_branch_names() {
        assert_eq!(sanitize_branch_name("Feature/Foo Bar!!"), "feature_foo_bar");
        assert_eq!(sanitize_branch_name("   "), "main");
        assert_eq!(sanitize_branch_name("__weird__"), "weird");
    }

    #[test]
    fn role_agent_id_is_deterministic_and_scoped() {
        let a = mint_role_agent_id("r_abc123", "reviewer", "core");
        let b = mint_role_agent_id("r_abc123", "reviewer", "core");
        let c = mint_role_agent_id("r_abc123", "reviewer", "edge");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("role_"));
    }

    #[test]
    fn role_agent_id_satisfies_the_name_grammar_it_must_pass() {
        let id = mint_role_agent_id("r_abc123", "reviewer", "core");
        assert!(!id.chars().any(|c| c.is_ascii_uppercase()));
        assert!(validate_agent_name(&id).is_ok());
    }
}
