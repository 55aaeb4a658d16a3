//! Issue key handling: `proj-12`, `feature/PROJ-12-login` and the current
//! git branch all resolve to `PROJ-12`.

use anyhow::{anyhow, bail, Context, Result};
use std::process::Command;
use tracing::debug;

/// Extracts the first `ABC-123` shaped key from `input`, upper-cased.
pub fn normalize(input: &str) -> Option<String> {
    let bytes = input.as_bytes();

    for start in 0..bytes.len() {
        if !bytes[start].is_ascii_alphabetic() {
            continue;
        }
        if start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            continue;
        }

        let mut dash = start;
        while dash < bytes.len() && (bytes[dash].is_ascii_alphanumeric() || bytes[dash] == b'_') {
            dash += 1;
        }
        if bytes.get(dash) != Some(&b'-') {
            continue;
        }

        let mut end = dash + 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end > dash + 1 {
            return Some(input[start..end].to_ascii_uppercase());
        }
    }
    None
}

/// The key named on the command line, or the one in the current branch.
pub fn resolve(input: Option<&str>) -> Result<String> {
    match input {
        Some(raw) => normalize(raw)
            .ok_or_else(|| anyhow!("'{}' is not an issue key (expected something like PROJ-123)", raw)),
        None => from_git_branch(),
    }
}

pub fn from_git_branch() -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--abbrev-ref", "HEAD"])
        .output()
        .context("Failed to run git")?;
    if !output.status.success() {
        bail!("No issue key given and not inside a git repository");
    }

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!(%branch, "issue key from branch");
    normalize(&branch).ok_or_else(|| {
        anyhow!(
            "Branch '{}' does not contain an issue key. Pass one explicitly.",
            branch
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plain_key() {
        assert_eq!(normalize("PROJ-123").as_deref(), Some("PROJ-123"));
        assert_eq!(normalize("proj-7").as_deref(), Some("PROJ-7"));
    }

    #[test]
    fn test_key_inside_branch_name() {
        assert_eq!(
            normalize("feature/STREET-4105-login-form").as_deref(),
            Some("STREET-4105")
        );
        assert_eq!(normalize("bugfix/ab2-9").as_deref(), Some("AB2-9"));
    }

    #[test]
    fn test_skips_words_without_numbers() {
        assert_eq!(
            normalize("fix-login-PROJ-42").as_deref(),
            Some("PROJ-42")
        );
    }

    #[test]
    fn test_rejects_non_keys() {
        assert!(normalize("main").is_none());
        assert!(normalize("123-456").is_none());
        assert!(normalize("PROJ-").is_none());
        assert!(normalize("").is_none());
    }

    #[test]
    fn test_resolve_explicit_input() {
        assert_eq!(resolve(Some("x-1")).unwrap(), "X-1");
        assert!(resolve(Some("develop")).is_err());
    }

    proptest! {
        #[test]
        fn prop_normalize_never_panics(input in "\\PC{0,40}") {
            let _ = normalize(&input);
        }

        #[test]
        fn prop_normalize_finds_key(project in "[A-Z][A-Z0-9]{0,6}", n in 1u32..100000) {
            let key = format!("{}-{}", project, n);
            let branch = format!("feature/{}-some-work", key.to_lowercase());
            prop_assert_eq!(normalize(&branch), Some(key));
        }
    }
}
