//! HTTP clients used by the recommender.
//!
//! Two remote services are reached over HTTP:
//!
//! - an OpenAI-compatible chat-completions endpoint, called by the worker
//!   from inside the confidential environment ([`ModelClient`])
//! - the compute marketplace gateway, called by the orchestrator on behalf
//!   of a signed-in wallet ([`GatewayClient`])
//!
//! Both clients validate their base URL before use and share [`ApiError`].

mod error;
mod gateway;
mod model;

use url::Url;

pub use error::ApiError;
pub use gateway::GatewayClient;
pub use model::{DEFAULT_MODEL_BASE_URL, MODEL_BASE_URL_ENV, ModelClient, ModelSettings};

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Validate that a base URL is acceptable for use by a client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS, and when `allowed_domains` is given the
///   host must be one of them or a subdomain thereof
pub(crate) fn validate_base_url(base: &str, allowed_domains: Option<&[&str]>) -> Result<(), ApiError> {
    let parsed = Url::parse(base).map_err(|error| ApiError::invalid_base_url(base, error.to_string()))?;

    let host_name = parsed
        .host_str()
        .ok_or_else(|| ApiError::invalid_base_url(base, "URL must include a host"))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(ApiError::invalid_base_url(
            base,
            format!("non-localhost hosts must use https; got '{}://'", parsed.scheme()),
        ));
    }

    if let Some(domains) = allowed_domains {
        let is_allowed = domains.iter().any(|&domain| {
            host_name.eq_ignore_ascii_case(domain) || host_name.ends_with(&format!(".{domain}"))
        });
        if !is_allowed {
            return Err(ApiError::invalid_base_url(
                base,
                format!("host '{host_name}' is not allowed; must be one of {domains:?} or a subdomain, or localhost"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localhost_accepts_any_scheme() {
        assert!(validate_base_url("http://localhost:8080/v1", Some(&["openai.com"])).is_ok());
        assert!(validate_base_url("http://127.0.0.1:9000", None).is_ok());
    }

    #[test]
    fn remote_hosts_require_https() {
        let error = validate_base_url("http://api.openai.com/v1", Some(&["openai.com"])).unwrap_err();
        assert!(matches!(error, ApiError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn domain_allow_list_includes_subdomains() {
        assert!(validate_base_url("https://api.openai.com/v1", Some(&["openai.com"])).is_ok());
        assert!(validate_base_url("https://openai.com.evil.io/v1", Some(&["openai.com"])).is_err());
        assert!(validate_base_url("https://gateway.example.org", None).is_ok());
    }

    #[test]
    fn rejects_unparsable_urls() {
        assert!(validate_base_url("not a url", None).is_err());
    }
}
