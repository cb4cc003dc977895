//! Credential scrubbing for log and error text.
//!
//! Upstream error bodies can echo request headers or keys back. Anything
//! that may end up in a log line or a diagnostic error field goes through
//! [`scrub`] first.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Replacement text for redacted material.
pub const REDACTED: &str = "[REDACTED]";

/// Credential-shaped tokens that are redacted even when not configured:
/// `sk-…` / `sk-ant-…` API keys, bearer tokens, and `x-api-key` header echoes.
static CREDENTIAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"sk-[A-Za-z0-9_\-]{8,}",
        r"(?i)bearer\s+[A-Za-z0-9._~+/\-]{8,}=*",
        r#"(?i)x-api-key["']?\s*[:=]\s*["']?[A-Za-z0-9._\-]{8,}"#,
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Redact every known secret and every credential-shaped token in `text`.
pub fn scrub(text: &str, known_secrets: &[String]) -> String {
    let mut out = text.to_string();

    // Longest first, so a secret that contains another is removed whole.
    let mut secrets: Vec<&String> = known_secrets.iter().filter(|s| !s.is_empty()).collect();
    secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
    for secret in secrets {
        out = out.replace(secret.as_str(), REDACTED);
    }

    for pattern in CREDENTIAL_PATTERNS.iter() {
        out = pattern.replace_all(&out, REDACTED).into_owned();
    }

    out
}

/// Check if an output string contains any of the known secrets (leakage detection).
pub fn contains_secret(output: &str, secrets: &[String]) -> bool {
    secrets.iter().any(|s| !s.is_empty() && output.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_known_secrets() {
        let secrets = vec!["hunter2-shared".to_string()];
        let out = scrub("auth failed for hunter2-shared", &secrets);
        assert_eq!(out, "auth failed for [REDACTED]");
        assert!(!contains_secret(&out, &secrets));
    }

    #[test]
    fn scrubs_api_key_shapes() {
        let out = scrub(
            r#"{"error":"invalid x-api-key: sk-ant-api03-abcdefghijkl"}"#,
            &[],
        );
        assert!(!out.contains("sk-ant-api03-abcdefghijkl"));
        assert!(out.contains(REDACTED));
    }

    #[test]
    fn scrubs_bearer_tokens() {
        let out = scrub("header was Bearer abcDEF123456789", &[]);
        assert!(!out.contains("abcDEF123456789"));
    }

    #[test]
    fn longer_secret_wins_over_its_prefix() {
        let secrets = vec!["abc".to_string(), "abcdef".to_string()];
        assert_eq!(scrub("key=abcdef", &secrets), "key=[REDACTED]");
    }

    #[test]
    fn plain_text_is_untouched() {
        let text = "upstream returned 503 Service Unavailable";
        assert_eq!(scrub(text, &[]), text);
    }

    #[test]
    fn leakage_detection_empty_secrets() {
        assert!(!contains_secret("anything", &[]));
        assert!(!contains_secret("anything", &["".to_string()]));
    }

    #[test]
    fn scrubbing_is_idempotent() {
        let secrets = vec!["s3cr3t-value".to_string()];
        let once = scrub("s3cr3t-value and sk-abcdefghijk", &secrets);
        assert_eq!(scrub(&once, &secrets), once);
    }
}
