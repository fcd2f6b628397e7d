//! Configuration types for dnsdash
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main dnsdash configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashConfig {
    /// Remote gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Address lab settings
    #[serde(default)]
    pub lab: LabConfig,

    /// Sync engine settings
    #[serde(default)]
    pub sync: SyncConfig,
}

impl DashConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.gateway.validate()?;
        self.lab.validate()?;
        self.sync.validate()?;
        Ok(())
    }
}

/// Remote gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayConfig {
    /// Cloudflare API v4
    Cloudflare {
        /// API base URL (defaults to the public Cloudflare endpoint)
        #[serde(default)]
        base_url: Option<String>,
        /// Per-request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl GatewayConfig {
    /// Validate the gateway configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            GatewayConfig::Cloudflare {
                base_url,
                timeout_secs,
            } => {
                if let Some(url) = base_url {
                    if url.is_empty() {
                        return Err(crate::Error::config("Gateway base URL cannot be empty"));
                    }
                    if !url.starts_with("https://") && !url.starts_with("http://") {
                        return Err(crate::Error::config(format!(
                            "Gateway base URL must use HTTP or HTTPS scheme. Got: {}",
                            url
                        )));
                    }
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Gateway timeout must be > 0"));
                }
                Ok(())
            }
        }
    }

    /// Get the gateway type name
    pub fn type_name(&self) -> &str {
        match self {
            GatewayConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig::Cloudflare {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Address lab configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabConfig {
    /// Upper bound on the number of samples generated per request
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl LabConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.max_samples == 0 {
            return Err(crate::Error::config("Lab max_samples must be > 0"));
        }
        Ok(())
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            max_samples: default_max_samples(),
        }
    }
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Page size used when listing records
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Capacity of the log-trail event channel
    ///
    /// When full, new events are dropped (with a warning log) rather than
    /// blocking an operation.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=5000).contains(&self.per_page) {
            return Err(crate::Error::config(format!(
                "Sync per_page must be between 1 and 5000. Got: {}",
                self.per_page
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Sync event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_samples() -> usize {
    256
}

fn default_per_page() -> u32 {
    100
}

fn default_event_channel_capacity() -> usize {
    1000
}
