// # Remote Gateway Trait
//
// Defines the single network boundary of dnsdash: "call this remote
// endpoint with this method and body, using these credentials".
//
// ## Implementations
//
// - Cloudflare API v4: `dnsdash-gateway-cloudflare` crate
// - Tests: in-memory doubles under `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use dnsdash_core::traits::{Credentials, GatewayRequest, Method, RemoteGateway};
//
// async fn zones(gateway: &dyn RemoteGateway, creds: &Credentials) -> dnsdash_core::Result<()> {
//     let response = gateway
//         .call(GatewayRequest::new(Method::Get, "zones", creds.clone()))
//         .await?;
//     let zones = response.into_result()?;
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};

/// HTTP-style method of a gateway call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied credentials, forwarded untouched to the gateway
///
/// An empty `identity` means `secret` is a bearer token; otherwise the pair
/// is an account e-mail and global key.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identity: String,
    /// ⚠️ NEVER log this value
    pub secret: String,
}

impl Credentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    /// Bearer-token credentials
    pub fn token(secret: impl Into<String>) -> Self {
        Self::new(String::new(), secret)
    }

    pub fn is_token(&self) -> bool {
        self.identity.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.secret.is_empty() {
            return Err(Error::validation("API secret is required"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

/// A relayed call
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Path segment relative to the API root, e.g. `zones/abc/dns_records`
    pub endpoint: String,
    pub method: Method,
    pub body: Option<Value>,
    pub credentials: Credentials,
}

impl GatewayRequest {
    pub fn new(method: Method, endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            body: None,
            credentials,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// One entry of the envelope's `errors` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayMessage {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

impl GatewayMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// Pagination metadata of list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub total_pages: u32,
}

/// Envelope returned by every gateway call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// HTTP-style status code
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GatewayMessage>,
    #[serde(default)]
    pub result_info: Option<PageInfo>,
}

impl GatewayResponse {
    /// Successful envelope carrying `result`
    pub fn ok(result: Value) -> Self {
        Self {
            status: 200,
            success: true,
            result: Some(result),
            errors: Vec::new(),
            result_info: None,
        }
    }

    /// Failed envelope with a single message
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            success: false,
            result: None,
            errors: vec![GatewayMessage::new(message)],
            result_info: None,
        }
    }

    pub fn with_page_info(mut self, info: PageInfo) -> Self {
        self.result_info = Some(info);
        self
    }

    /// First reported error, or a generic fallback naming the status
    pub fn failure_reason(&self) -> String {
        self.errors
            .first()
            .map(|e| e.message.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status {}", self.status))
    }

    /// Unwrap the `result` payload, turning `success=false` into
    /// [`Error::RemoteCallFailed`]
    pub fn into_result(self) -> Result<Value> {
        if !self.success {
            return Err(Error::remote_status(self.status, self.failure_reason()));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Trait for remote gateway implementations
///
/// # Trust Level: Untrusted
///
/// Gateways are isolated, stateless and single-shot:
/// - ✅ Perform exactly one HTTP/HTTPS round trip per `call`
/// - ✅ Attach the supplied credentials
/// - ✅ Return transport failures as `Err`, API failures as `success=false`
/// - ❌ Retry, back off or cache (owned by nobody: there is no retry policy)
/// - ❌ Touch the record store or selection (owned by `SyncEngine`)
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Relay one request
    ///
    /// # Returns
    ///
    /// - `Ok(GatewayResponse)`: a response envelope was received (it may
    ///   still report `success=false`)
    /// - `Err(Error)`: transport failure or an unreadable response
    async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse>;

    /// Gateway name (for logging/debugging)
    fn gateway_name(&self) -> &'static str;
}

/// Helper trait for constructing gateways from configuration
pub trait RemoteGatewayFactory: Send + Sync {
    fn create(&self, config: &crate::config::GatewayConfig) -> Result<Box<dyn RemoteGateway>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("ops@example.com", "super_secret_key");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("ops@example.com"));
        assert!(!debug.contains("super_secret_key"));
        assert!(Credentials::token("t").is_token());
        assert!(Credentials::token("").validate().is_err());
    }

    #[test]
    fn test_failure_reason_fallback() {
        let response = GatewayResponse {
            status: 502,
            success: false,
            result: None,
            errors: Vec::new(),
            result_info: None,
        };
        assert_eq!(response.failure_reason(), "Request failed with status 502");

        let response = GatewayResponse::failure(400, "Invalid TTL");
        match response.into_result() {
            Err(Error::RemoteCallFailed { status, message }) => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "Invalid TTL");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_deserialize() {
        let response: GatewayResponse = serde_json::from_value(json!({
            "success": true,
            "errors": [],
            "messages": [],
            "result": [{"id": "z1"}],
            "result_info": {"page": 1, "per_page": 20, "count": 1, "total_count": 1, "total_pages": 1}
        }))
        .unwrap();
        assert!(response.success);
        assert_eq!(response.result_info.unwrap().total_pages, 1);
        assert_eq!(response.into_result().unwrap()[0]["id"], "z1");
    }
}
