//! # Secret Redaction
//!
//! Log lines in this project regularly carry HTTP error bodies, request
//! headers, and environment snapshots. Anything that looks like a credential
//! is masked before it reaches a `tracing` sink.

use once_cell::sync::Lazy;
use regex::Regex;

/// Redacts values that look like secrets in a string.
///
/// Key names are preserved so the output stays useful for debugging.
///
/// # Example
/// ```rust
/// use nftdonate_util::redact_sensitive;
///
/// let redacted = redact_sensitive("IEXEC_SCRT_OPENAI_API_KEY=sk-abc123");
/// assert_eq!(redacted, "IEXEC_SCRT_OPENAI_API_KEY=[REDACTED]");
///
/// let redacted = redact_sensitive("Authorization: Bearer secret123");
/// assert_eq!(redacted, "Authorization: [REDACTED]");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    redact_sensitive_with(input, "[REDACTED]")
}

/// Redacts sensitive-looking values, using a custom replacement token.
pub fn redact_sensitive_with(input: &str, replacement: &str) -> String {
    let mut redacted = input.to_string();

    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &regex::Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                let suffix = captures.get(3).map(|m| m.as_str()).unwrap_or("");
                if captures.get(2).is_some() {
                    format!("{prefix}{replacement}{suffix}")
                } else {
                    replacement.to_string()
                }
            })
            .to_string();
    }

    redacted
}

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(build_redact_patterns);

/// Ordered from most specific to most general.
fn build_redact_patterns() -> Vec<Regex> {
    const SECRET_KEYWORDS: &str = "API_KEY|APIKEY|SECRET|TOKEN|PASSWORD|PRIVATE_KEY|SCRT_[A-Z0-9_]+";

    vec![
        // OpenAI-style keys and JWTs appear bare in error bodies.
        Regex::new(r"\b(sk-(?:proj-)?[A-Za-z0-9_\-]{8,})").unwrap(),
        Regex::new(r"(eyJ[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]+\.[A-Za-z0-9\-_]*)").unwrap(),
        Regex::new(r"(?i)(authorization:\s+)([^\s]+(?:\s+[^\s]+)*)").unwrap(),
        Regex::new(r"(?i)((?:^|\b)Bearer\s+)([A-Za-z0-9\-._~+/]+=*)").unwrap(),
        Regex::new(&format!(r"(?i)((?:export\s+)?[A-Za-z0-9_]*?(?:{SECRET_KEYWORDS})[A-Za-z0-9_]*\s*=\s*)([^\s]+)")).unwrap(),
        Regex::new(r#"(?i)("[A-Za-z0-9_]*(?:apiKey|api_key|token|secret|password)[A-Za-z0-9_]*"\s*:\s*")([^"]+)(")"#).unwrap(),
    ]
}
