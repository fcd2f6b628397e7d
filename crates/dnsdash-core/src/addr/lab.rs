// # Address Lab
//
// Request/response layer over `addr::math`: single analyses, batches of
// randomized sample addresses and IPv4 subnet reports. Never touches the
// network and keeps no state between calls.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::math::{
    self, ArpaName, Ipv6Address, Ipv6Prefix, SubnetReport, parse_ipv4_prefix, parse_ipv6,
    parse_ipv6_prefix, to_arpa_name,
};
use crate::config::LabConfig;
use crate::error::{Error, Result};

/// Result of analysing one IPv6 address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// The address in canonical compressed form
    pub input: String,
    /// Fully expanded form
    pub expanded: String,
    pub arpa: ArpaName,
}

/// One generated address and its reverse name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub address: String,
    pub arpa: ArpaName,
}

/// Address laboratory
#[derive(Debug, Clone)]
pub struct AddressLab {
    max_samples: usize,
}

impl AddressLab {
    pub fn new(config: &LabConfig) -> Self {
        Self {
            max_samples: config.max_samples,
        }
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Parse an address and derive its reverse name
    pub fn analyze(&self, text: &str) -> Result<Analysis> {
        let address = parse_ipv6(text)?;
        Ok(analysis_of(&address))
    }

    /// Generate `count` independent random addresses inside `prefix`
    ///
    /// Samples are independent draws; duplicates are possible.
    pub fn generate_samples(&self, prefix: &Ipv6Prefix, count: usize) -> Result<Vec<Sample>> {
        self.generate_samples_with(prefix, count, &mut rand::thread_rng())
    }

    /// [`AddressLab::generate_samples`] with a caller-supplied RNG
    pub fn generate_samples_with<R: Rng + ?Sized>(
        &self,
        prefix: &Ipv6Prefix,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<Sample>> {
        if count > self.max_samples {
            return Err(Error::validation(format!(
                "sample count {} exceeds the limit of {}",
                count, self.max_samples
            )));
        }
        debug!("Generating {} sample(s) within {}", count, prefix);

        Ok((0..count)
            .map(|_| {
                let address = math::random_within_prefix_with(prefix, rng);
                Sample {
                    address: address.to_string(),
                    arpa: to_arpa_name(&address),
                }
            })
            .collect())
    }

    /// Parse `address/length` text, then generate samples
    pub fn generate_samples_from_text(&self, text: &str, count: usize) -> Result<Vec<Sample>> {
        let prefix = parse_ipv6_prefix(text)?;
        self.generate_samples(&prefix, count)
    }

    /// IPv4 subnet report for `a.b.c.d/length` text
    pub fn subnet(&self, text: &str) -> Result<SubnetReport> {
        let prefix = parse_ipv4_prefix(text)?;
        Ok(math::subnet_report(&prefix))
    }
}

impl Default for AddressLab {
    fn default() -> Self {
        Self::new(&LabConfig::default())
    }
}

fn analysis_of(address: &Ipv6Address) -> Analysis {
    Analysis {
        input: address.to_string(),
        expanded: address.expanded(),
        arpa: to_arpa_name(address),
    }
}
