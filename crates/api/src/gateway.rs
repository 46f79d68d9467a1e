use std::time::{Duration, Instant};

use nftdonate_util::{parse_json_strict, redact_sensitive};
use reqwest::{Client, Method, RequestBuilder, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{ApiError, validate_base_url};

/// Thin wrapper around a configured `reqwest::Client` for the marketplace gateway.
///
/// Requests are resolved relative to a validated base URL and carry a
/// consistent User-Agent. Authenticated calls pass the wallet session token
/// explicitly; the client itself holds no credentials.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    http: Client,
    user_agent: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        validate_base_url(base_url, None)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .map_err(|error| ApiError::Client(error.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            user_agent: format!("nftdonate/{}; {}", env!("CARGO_PKG_VERSION"), std::env::consts::OS),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let text = self.send(Method::GET, path, self.request(Method::GET, path)).await?;
        decode_json(&text, path)
    }

    /// POST a JSON body to `path`, optionally authenticated with a bearer token.
    pub async fn post_json<B, T>(&self, path: &str, body: &B, bearer: Option<&str>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self.request(Method::POST, path).json(body);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        let text = self.send(Method::POST, path, builder).await?;
        decode_json(&text, path)
    }

    /// GET `path` and return the raw body bytes.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let start = Instant::now();
        let response = self
            .request(Method::GET, path)
            .send()
            .await
            .map_err(ApiError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = redact_sensitive(&response.text().await.unwrap_or_default());
            warn!(path = %path, status = %status, duration_ms = start.elapsed().as_millis(), "gateway download failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await.map_err(ApiError::Transport)?;
        debug!(
            path = %path,
            status = %status,
            len = bytes.len(),
            duration_ms = start.elapsed().as_millis(),
            "gateway download completed"
        );
        Ok(bytes.to_vec())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, %method, "building gateway request");
        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }

    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<String, ApiError> {
        let start = Instant::now();
        let response = builder.send().await.map_err(|error| {
            warn!(method = %method, path = %path, error = %error, "gateway request did not complete");
            ApiError::Transport(error)
        })?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            let body = redact_sensitive(&text);
            warn!(
                method = %method,
                path = %path,
                status = %status,
                duration_ms = start.elapsed().as_millis(),
                body = %body,
                "gateway request failed"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "gateway request completed"
        );
        Ok(text)
    }
}

fn decode_json<T: DeserializeOwned>(text: &str, path: &str) -> Result<T, ApiError> {
    let value = parse_json_strict(text, path).map_err(|error| ApiError::decode(error.to_string()))?;
    serde_json::from_value(value).map_err(|error| ApiError::decode(format!("{path}: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct DealReply {
        dealid: String,
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = GatewayClient::new("https://gateway.example.org/api/").unwrap();
        assert_eq!(client.base_url(), "https://gateway.example.org/api");
    }

    #[test]
    fn plain_http_is_rejected_off_localhost() {
        assert!(GatewayClient::new("http://gateway.example.org").is_err());
        assert!(GatewayClient::new("http://localhost:3000").is_ok());
    }

    #[test]
    fn decode_reports_path_on_shape_mismatch() {
        let reply: DealReply = decode_json(r#"{"dealid":"0x01"}"#, "/orders/match").unwrap();
        assert_eq!(reply.dealid, "0x01");

        let error = decode_json::<DealReply>(r#"{"deal":"0x01"}"#, "/orders/match").unwrap_err();
        assert!(error.to_string().contains("/orders/match"));
    }
}
