// # Cloudflare Gateway
//
// RemoteGateway implementation relaying dnsdash calls to Cloudflare API v4.
//
// - ✅ Exactly one HTTP request per `call`
// - ✅ HTTP timeout configured (30 seconds by default)
// - ✅ Bearer token or e-mail + global key authentication
// - ✅ Non-JSON error bodies mapped to status-specific messages (401/403, 404, 409, 429, 5xx)
// - ❌ NO retry logic (there is no retry policy anywhere)
// - ❌ NO caching (the record store is owned by SyncEngine)
// - ❌ NO background tasks
//
// ## Trust Level: Untrusted (Remote Gateway)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the configured base URL only
// - ✅ Parse Cloudflare response envelopes
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Retry or back off
// - ❌ Keep credentials beyond a single request
//
// ## Security Requirements
//
// - Credentials arrive with each request and are never stored
// - Secrets NEVER appear in logs; auth headers are marked sensitive
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones`
// - DNS Records: GET/POST `/zones/:zone_id/dns_records`,
//   PATCH/DELETE `/zones/:zone_id/dns_records/:record_id`
// - SSL/TLS mode: GET/PATCH `/zones/:zone_id/settings/ssl`

use async_trait::async_trait;
use dnsdash_core::config::GatewayConfig;
use dnsdash_core::traits::{
    Credentials, GatewayRequest, GatewayResponse, Method, RemoteGateway, RemoteGatewayFactory,
};
use dnsdash_core::{Error, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of a non-JSON error body carried into a message
const ERROR_BODY_LIMIT: usize = 200;

/// Cloudflare API v4 gateway
///
/// # Trust Level: Untrusted
///
/// Isolated, stateless and single-shot. It holds no credentials: every
/// request carries its own.
#[derive(Debug, Clone)]
pub struct CloudflareGateway {
    /// API root, without a trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl CloudflareGateway {
    /// Create a gateway
    ///
    /// # Parameters
    ///
    /// - `base_url`: API root; `None` selects the public Cloudflare endpoint
    /// - `timeout`: per-request timeout
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an endpoint relative to the API root
    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Build the HTTP request for a gateway call
    fn build(&self, request: &GatewayRequest) -> Result<reqwest::RequestBuilder> {
        let url = self.url(&request.endpoint);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };

        let builder = authorize(builder, &request.credentials)?
            .header(CONTENT_TYPE, "application/json");

        Ok(match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        })
    }
}

#[async_trait]
impl RemoteGateway for CloudflareGateway {
    /// Relay one request
    ///
    /// This implementation:
    /// - Makes ONE HTTP request
    /// - Returns transport failures as `Err` (no retry, no backoff)
    /// - Returns API failures as an envelope with `success=false`
    /// - Never logs credentials
    async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        tracing::debug!("Cloudflare {} /{}", request.method, request.endpoint);

        let response = self
            .build(&request)?
            .send()
            .await
            .map_err(|e| Error::remote(format!("HTTP request failed: {}", e.without_url())))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::remote_status(status, format!("Unable to read response: {}", e)))?;

        let envelope = interpret(status, &body)?;
        if !envelope.success {
            tracing::debug!(
                "Cloudflare {} /{} failed: {}",
                request.method,
                request.endpoint,
                envelope.failure_reason()
            );
        }
        Ok(envelope)
    }

    fn gateway_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Attach credentials: bearer token, or e-mail plus global key
fn authorize(
    builder: reqwest::RequestBuilder,
    credentials: &Credentials,
) -> Result<reqwest::RequestBuilder> {
    credentials.validate()?;

    if credentials.is_token() {
        return Ok(builder.bearer_auth(&credentials.secret));
    }

    let mut key = HeaderValue::from_str(&credentials.secret)
        .map_err(|_| Error::validation("API key contains invalid header characters"))?;
    key.set_sensitive(true);
    Ok(builder
        .header("X-Auth-Email", credentials.identity.as_str())
        .header("X-Auth-Key", key))
}

/// Turn an HTTP status and body into a response envelope
///
/// - JSON envelope: taken as-is, with the HTTP status recorded
/// - Non-JSON body on an error status: failed envelope with a
///   status-specific message
/// - Non-JSON body on a success status: malformed response (`Err`)
pub fn interpret(status: u16, body: &str) -> Result<GatewayResponse> {
    let is_success = (200..300).contains(&status);

    match serde_json::from_str::<GatewayResponse>(body) {
        Ok(mut envelope) => {
            envelope.status = status;
            if !is_success {
                envelope.success = false;
            }
            if !envelope.success && envelope.errors.is_empty() {
                return Ok(GatewayResponse::failure(status, status_message(status, body)));
            }
            Ok(envelope)
        }
        Err(e) if is_success => Err(Error::remote_status(
            status,
            format!("Failed to parse response: {}", e),
        )),
        Err(_) => Ok(GatewayResponse::failure(status, status_message(status, body))),
    }
}

/// Message for an error status without a usable envelope
fn status_message(status: u16, body: &str) -> String {
    let detail = excerpt(body);
    match status {
        401 | 403 => format!(
            "Authentication failed: Invalid API credentials or insufficient permissions. Status: {}",
            status
        ),
        404 => format!("Resource not found. Status: {}", status),
        409 => format!(
            "Conflict: Resource is being modified by another process. Status: {}",
            status
        ),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Cloudflare server error (transient): {} - {}", status, detail),
        _ => format!("Request failed: {} - {}", status, detail),
    }
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    if body.len() <= ERROR_BODY_LIMIT {
        return body;
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Factory for creating Cloudflare gateways
pub struct CloudflareFactory;

impl RemoteGatewayFactory for CloudflareFactory {
    fn create(&self, config: &GatewayConfig) -> Result<Box<dyn RemoteGateway>> {
        config.validate()?;
        match config {
            GatewayConfig::Cloudflare {
                base_url,
                timeout_secs,
            } => {
                if let Some(url) = base_url
                    && url.trim_end_matches('/') != CLOUDFLARE_API_BASE
                {
                    tracing::warn!("Cloudflare gateway using non-default API base: {}", url);
                }
                Ok(Box::new(CloudflareGateway::new(
                    base_url.clone(),
                    Duration::from_secs(*timeout_secs),
                )?))
            }
        }
    }
}
