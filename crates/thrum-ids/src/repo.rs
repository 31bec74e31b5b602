use crate::base32;
use sha2::{Digest, Sha256};
use thrum_types::RepoId;

const REPO_ID_LEN: usize = 12;

/// Derive the stable repo identifier from a git origin URL. Normalizes
/// `git@host:path` SSH shorthand to an `https://` form, lowercases the host,
/// and strips a trailing `.git` so the same remote always hashes to the same
/// id regardless of which URL form a clone happens to use.
pub fn repo_id_from_origin_url(origin_url: &str) -> RepoId {
    let normalized = normalize_origin_url(origin_url);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&digest[..16]);
    let value = u128::from_be_bytes(buf);
    RepoId::from_raw(format!("r_{}", base32::encode_u128(value, REPO_ID_LEN)))
}

fn normalize_origin_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let as_https = if let Some(rest) = trimmed.strip_prefix("git@") {
        match rest.split_once(':') {
            Some((host, path)) => format!("https://{host}/{path}"),
            None => trimmed.to_string(),
        }
    } else {
        trimmed.to_string()
    };

    let without_suffix = as_https.strip_suffix(".git").unwrap_or(&as_https);

    match without_suffix.split_once("://") {
        Some((scheme, rest)) => match rest.split_once('/') {
            Some((host, path)) => format!("{scheme}://{}/{path}", host.to_ascii_lowercase()),
            None => format!("{scheme}://{}", rest.to_ascii_lowercase()),
        },
        None => without_suffix.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_and_https_forms_resolve_to_the_same_id() {
        let ssh = repo_id_from_origin_url("git@github.com:lanegrid/thrum.git");
        let https = repo_id_from_origin_url("https://github.com/lanegrid/thrum.git");
        assert_eq!(ssh.as_str(), https.as_str());
    }

    #[test]
    fn host_case_is_ignored() {
        let lower = repo_id_from_origin_url("https://github.com/lanegrid/thrum");
        let upper = repo_id_from_origin_url("https://GitHub.com/lanegrid/thrum");
        assert_eq!(lower.as_str(), upper.as_str());
    }

    #[test]
    fn different_repos_get_different_ids() {
        let a = repo_id_from_origin_url("https://github.com/lanegrid/thrum.git");
        let b = repo_id_from_origin_url("https://github.com/lanegrid/other.git");
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn id_has_expected_shape() {
        let id = repo_id_from_origin_url("https://github.com/lanegrid/thrum.git");
        assert!(id.as_str().starts_with("r_"));
        assert_eq!(id.as_str().len(), 2 + REPO_ID_LEN);
    }
}
