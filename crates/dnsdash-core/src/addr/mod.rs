//! Address computation
//!
//! - [`math`]: IPv6 parsing, `ip6.arpa` names, prefix sampling, IPv4 CIDR arithmetic
//! - [`lab`]: request/response layer used by callers

pub mod lab;
pub mod math;

pub use lab::{AddressLab, Analysis, Sample};
pub use math::{
    ArpaName, Ipv4Prefix, Ipv6Address, Ipv6Prefix, Prefix, SubnetReport, ipv4_mask_from_prefix,
    parse_ipv4_prefix, parse_ipv6, parse_ipv6_prefix, parse_prefix, random_within_prefix,
    subnet_report, to_arpa_name,
};
