//! Domain identifier validation.
//!
//! Domain names supplied by callers become file name components
//! (`db.<domain>`, `hosts.<domain>`), so this check is the only thing
//! standing between user input and path traversal. Every manager calls
//! [`validate_domain`] before touching the filesystem.

use crate::error::{ManagerError, Result};
use regex::Regex;
use std::sync::LazyLock;

static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9.-]*[a-zA-Z0-9]$").expect("domain regex is valid")
});

/// Validate a domain identifier (without any `db.`/`hosts.` prefix)
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(ManagerError::InvalidDomain(
            "domain cannot be empty".to_string(),
        ));
    }
    if domain.contains(['/', '\\']) {
        return Err(ManagerError::InvalidDomain(format!(
            "{}: contains invalid path characters",
            domain
        )));
    }
    if domain.contains("..") {
        return Err(ManagerError::InvalidDomain(format!(
            "{}: contains path traversal sequence",
            domain
        )));
    }
    if !DOMAIN_REGEX.is_match(domain) {
        return Err(ManagerError::InvalidDomain(format!(
            "{}: contains invalid characters (allowed: a-z, 0-9, ., -)",
            domain
        )));
    }
    Ok(())
}

/// Convenience predicate over [`validate_domain`]
pub fn is_valid_domain(domain: &str) -> bool {
    validate_domain(domain).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_domains() {
        for d in ["example.com", "a1", "sub.example-site.org", "10.0.0.in-addr.arpa"] {
            assert!(validate_domain(d).is_ok(), "{} should be valid", d);
        }
    }

    #[test]
    fn test_rejects_traversal_and_separators() {
        for d in ["", "../etc", "a/b", "a\\b", "example..com", "/", ".."] {
            assert!(
                matches!(validate_domain(d), Err(ManagerError::InvalidDomain(_))),
                "{:?} should be rejected",
                d
            );
        }
    }

    #[test]
    fn test_rejects_bad_edges_and_characters() {
        for d in [
            "-example.com",
            "example.com-",
            ".example.com",
            "example.com.",
            "a",
            "exa mple.com",
            "exa_mple.com",
            "example.com;rm",
            "ex\u{e4}mple.com",
        ] {
            assert!(!is_valid_domain(d), "{:?} should be rejected", d);
        }
    }

    #[test]
    fn test_error_messages_name_the_reason() {
        let err = validate_domain("a/b").unwrap_err();
        assert!(err.to_string().contains("path characters"));

        let err = validate_domain("a..b").unwrap_err();
        assert!(err.to_string().contains("traversal"));

        let err = validate_domain("").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
