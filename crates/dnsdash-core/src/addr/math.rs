// # Address Math
//
// Pure functions over IPv6/IPv4 address representations.
//
// - IPv6 text parsing with `::` compression (strict: hex groups only)
// - Nibble reversal into `ip6.arpa` names
// - Random host-bit fill inside a prefix
// - IPv4 CIDR arithmetic (mask, network, broadcast, usable range)
//
// Malformed text is the only failure mode. Everything operating on an
// already-parsed value is total.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use ipnetwork::Ipv4Network;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Zone suffix appended to every reverse IPv6 name
pub const ARPA_SUFFIX: &str = "ip6.arpa";

/// Number of nibble labels in a full IPv6 reverse name
pub const ARPA_NIBBLES: usize = 32;

/// A 128-bit IPv6 address stored as eight 16-bit groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ipv6Address {
    groups: [u16; 8],
}

impl Ipv6Address {
    /// Build an address from its eight groups
    pub const fn from_groups(groups: [u16; 8]) -> Self {
        Self { groups }
    }

    /// Build an address from its 128-bit integer value
    pub const fn from_bits(bits: u128) -> Self {
        let mut groups = [0u16; 8];
        let mut i = 0;
        while i < 8 {
            groups[i] = (bits >> (112 - 16 * i)) as u16;
            i += 1;
        }
        Self { groups }
    }

    /// The eight 16-bit groups, most significant first
    pub fn groups(&self) -> [u16; 8] {
        self.groups
    }

    /// The address as a 128-bit integer
    pub fn to_bits(&self) -> u128 {
        self.groups
            .iter()
            .fold(0u128, |acc, group| (acc << 16) | u128::from(*group))
    }

    /// The 32 hex nibbles, most significant first
    pub fn nibbles(&self) -> [u8; ARPA_NIBBLES] {
        let bits = self.to_bits();
        let mut out = [0u8; ARPA_NIBBLES];
        for (i, nibble) in out.iter_mut().enumerate() {
            *nibble = ((bits >> (124 - 4 * i)) & 0xf) as u8;
        }
        out
    }

    /// Fully expanded textual form (`2001:0db8:0000:...`)
    pub fn expanded(&self) -> String {
        self.groups
            .iter()
            .map(|g| format!("{:04x}", g))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl fmt::Display for Ipv6Address {
    /// Canonical compressed form, as produced by `std::net::Ipv6Addr`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Ipv6Addr::from(*self), f)
    }
}

impl FromStr for Ipv6Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_ipv6(s)
    }
}

impl From<Ipv6Addr> for Ipv6Address {
    fn from(addr: Ipv6Addr) -> Self {
        Self::from_groups(addr.segments())
    }
}

impl From<Ipv6Address> for Ipv6Addr {
    fn from(addr: Ipv6Address) -> Self {
        let [a, b, c, d, e, f, g, h] = addr.groups;
        Ipv6Addr::new(a, b, c, d, e, f, g, h)
    }
}

/// Parse textual IPv6 (standard or `::`-compressed) into an address
///
/// Rejected with [`Error::MalformedAddress`]:
/// - more than 8 groups, or fewer than 8 without `::`
/// - more than one `::`
/// - a group that is empty (outside `::`), longer than 4 digits, or non-hex
pub fn parse_ipv6(text: &str) -> Result<Ipv6Address> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::malformed("empty IPv6 address"));
    }

    let halves: Vec<&str> = text.split("::").collect();
    let groups = match halves.as_slice() {
        [whole] => {
            let groups = parse_groups(whole, text)?;
            if groups.len() != 8 {
                return Err(Error::malformed(format!(
                    "expected 8 groups, found {} in '{}'",
                    groups.len(),
                    text
                )));
            }
            groups
        }
        [head, tail] => {
            let head = parse_groups(head, text)?;
            let tail = parse_groups(tail, text)?;
            // `::` stands for at least one zero group
            if head.len() + tail.len() > 7 {
                return Err(Error::malformed(format!("too many groups in '{}'", text)));
            }
            let mut groups = head;
            groups.resize(8 - tail.len(), 0);
            groups.extend(tail);
            groups
        }
        _ => {
            return Err(Error::malformed(format!(
                "'::' may appear only once in '{}'",
                text
            )));
        }
    };

    let mut out = [0u16; 8];
    out.copy_from_slice(&groups);
    Ok(Ipv6Address::from_groups(out))
}

fn parse_groups(part: &str, whole: &str) -> Result<Vec<u16>> {
    if part.is_empty() {
        return Ok(Vec::new());
    }
    part.split(':')
        .map(|group| {
            if group.is_empty() || group.len() > 4 {
                return Err(Error::malformed(format!(
                    "invalid group '{}' in '{}'",
                    group, whole
                )));
            }
            if !group.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::malformed(format!(
                    "non-hex characters in group '{}' of '{}'",
                    group, whole
                )));
            }
            u16::from_str_radix(group, 16)
                .map_err(|e| Error::malformed(format!("invalid group '{}': {}", group, e)))
        })
        .collect()
}

/// Reverse-DNS name of an IPv6 address (`x.x.….x.ip6.arpa`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArpaName(String);

impl ArpaName {
    /// The name as text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Nibble labels, in reversed (least significant first) order
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0
            .strip_suffix(ARPA_SUFFIX)
            .unwrap_or(&self.0)
            .split('.')
            .filter(|l| !l.is_empty())
    }
}

impl fmt::Display for ArpaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Expand to 32 nibbles, reverse their order, dot-join and append `ip6.arpa`
pub fn to_arpa_name(address: &Ipv6Address) -> ArpaName {
    ArpaName(nibble_name(&address.nibbles()))
}

fn nibble_name(nibbles: &[u8]) -> String {
    let mut name = String::with_capacity(nibbles.len() * 2 + ARPA_SUFFIX.len());
    for nibble in nibbles.iter().rev() {
        name.push(char::from_digit(u32::from(*nibble), 16).unwrap_or('0'));
        name.push('.');
    }
    name.push_str(ARPA_SUFFIX);
    name
}

/// An IPv6 address paired with a prefix length (0..=128)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv6Prefix {
    address: Ipv6Address,
    length: u8,
}

impl Ipv6Prefix {
    /// Pair an address with a prefix length
    pub fn new(address: Ipv6Address, length: u8) -> Result<Self> {
        if length > 128 {
            return Err(Error::malformed(format!(
                "IPv6 prefix length {} exceeds 128",
                length
            )));
        }
        Ok(Self { address, length })
    }

    pub fn address(&self) -> Ipv6Address {
        self.address
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    /// Mask with the leading `length` bits set
    pub fn mask(&self) -> u128 {
        match self.length {
            0 => 0,
            n => u128::MAX << (128 - u32::from(n)),
        }
    }

    /// The prefix's network address (host bits zeroed)
    pub fn network(&self) -> Ipv6Address {
        Ipv6Address::from_bits(self.address.to_bits() & self.mask())
    }

    /// Whether `address` shares this prefix's leading bits
    pub fn contains(&self, address: &Ipv6Address) -> bool {
        (address.to_bits() & self.mask()) == (self.address.to_bits() & self.mask())
    }

    /// Delegation zone covering exactly the network nibbles
    ///
    /// `2001:db8::/32` → `8.b.d.0.1.0.0.2.ip6.arpa`. Only nibble-aligned
    /// lengths have such a zone.
    pub fn arpa_zone(&self) -> Result<ArpaName> {
        if self.length % 4 != 0 {
            return Err(Error::malformed(format!(
                "prefix length {} is not on a nibble boundary",
                self.length
            )));
        }
        let nibbles = self.address.nibbles();
        Ok(ArpaName(nibble_name(&nibbles[..usize::from(self.length / 4)])))
    }
}

impl fmt::Display for Ipv6Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.length)
    }
}

impl FromStr for Ipv6Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_ipv6_prefix(s)
    }
}

/// Parse `address/length`; a bare address is taken as a /128
pub fn parse_ipv6_prefix(text: &str) -> Result<Ipv6Prefix> {
    let (addr, length) = split_prefix(text, 128)?;
    Ipv6Prefix::new(parse_ipv6(addr)?, length)
}

fn split_prefix(text: &str, max: u8) -> Result<(&str, u8)> {
    let text = text.trim();
    match text.split_once('/') {
        Some((addr, len)) => {
            let length: u8 = len
                .trim()
                .parse()
                .map_err(|_| Error::malformed(format!("invalid prefix length in '{}'", text)))?;
            if length > max {
                return Err(Error::malformed(format!(
                    "prefix length {} exceeds {} in '{}'",
                    length, max, text
                )));
            }
            Ok((addr, length))
        }
        None => Ok((text, max)),
    }
}

/// Keep the network bits of `prefix` and fill the host bits at random
pub fn random_within_prefix(prefix: &Ipv6Prefix) -> Ipv6Address {
    random_within_prefix_with(prefix, &mut rand::thread_rng())
}

/// [`random_within_prefix`] with a caller-supplied RNG
pub fn random_within_prefix_with<R: Rng + ?Sized>(prefix: &Ipv6Prefix, rng: &mut R) -> Ipv6Address {
    let mask = prefix.mask();
    let random: u128 = rng.r#gen();
    Ipv6Address::from_bits((prefix.address.to_bits() & mask) | (random & !mask))
}

/// An IPv4 address paired with a prefix length (0..=32)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Prefix {
    network: Ipv4Network,
}

impl Ipv4Prefix {
    pub fn new(address: Ipv4Addr, length: u8) -> Result<Self> {
        let network = Ipv4Network::new(address, length)
            .map_err(|e| Error::malformed(format!("invalid IPv4 prefix: {}", e)))?;
        Ok(Self { network })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.network.ip()
    }

    pub fn length(&self) -> u8 {
        self.network.prefix()
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.network.mask()
    }
}

impl fmt::Display for Ipv4Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address(), self.length())
    }
}

impl FromStr for Ipv4Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_ipv4_prefix(s)
    }
}

/// Parse `a.b.c.d/length`; a bare address is taken as a /32
pub fn parse_ipv4_prefix(text: &str) -> Result<Ipv4Prefix> {
    let (addr, length) = split_prefix(text, 32)?;
    Ipv4Prefix::new(parse_ipv4(addr)?, length)
}

/// Parse dotted-decimal IPv4 text
pub fn parse_ipv4(text: &str) -> Result<Ipv4Addr> {
    text.trim()
        .parse()
        .map_err(|_| Error::malformed(format!("invalid IPv4 address '{}'", text.trim())))
}

/// Either address family, as typed by a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    V4(Ipv4Prefix),
    V6(Ipv6Prefix),
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_prefix(s)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::V4(p) => fmt::Display::fmt(p, f),
            Prefix::V6(p) => fmt::Display::fmt(p, f),
        }
    }
}

/// Parse a prefix of either family, deciding by the presence of `:`
pub fn parse_prefix(text: &str) -> Result<Prefix> {
    if text.contains(':') {
        parse_ipv6_prefix(text).map(Prefix::V6)
    } else {
        parse_ipv4_prefix(text).map(Prefix::V4)
    }
}

/// Contiguous-ones IPv4 mask in dotted-decimal form
pub fn ipv4_mask_from_prefix(length: u8) -> Result<String> {
    if length > 32 {
        return Err(Error::malformed(format!(
            "IPv4 prefix length {} exceeds 32",
            length
        )));
    }
    Ok(ipv4_mask(length).to_string())
}

fn ipv4_mask(length: u8) -> Ipv4Addr {
    match length {
        0 => Ipv4Addr::UNSPECIFIED,
        n => Ipv4Addr::from(u32::MAX << (32 - u32::from(n.min(32)))),
    }
}

/// Derived attributes of an IPv4 CIDR block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetReport {
    pub address: Ipv4Addr,
    pub prefix: u8,
    pub mask: Ipv4Addr,
    pub network: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    /// First usable host; absent for /31 and /32
    pub first_host: Option<Ipv4Addr>,
    /// Last usable host; absent for /31 and /32
    pub last_host: Option<Ipv4Addr>,
    /// `2^(32-prefix) - 2`, and 0 for /31 and /32
    pub usable_hosts: u64,
}

impl SubnetReport {
    /// `first – last` for display, or `-` when the block has no usable hosts
    pub fn host_range(&self) -> String {
        match (self.first_host, self.last_host) {
            (Some(first), Some(last)) => format!("{}–{}", first, last),
            _ => "-".to_string(),
        }
    }
}

/// Network, broadcast, usable range and host count of a CIDR block
pub fn subnet_report(prefix: &Ipv4Prefix) -> SubnetReport {
    let length = prefix.length();
    let network = prefix.network.network();
    let broadcast = prefix.network.broadcast();

    let block = 1u64 << (32 - u32::from(length));
    let (first_host, last_host, usable_hosts) = if length <= 30 {
        (
            Some(Ipv4Addr::from(u32::from(network) + 1)),
            Some(Ipv4Addr::from(u32::from(broadcast) - 1)),
            block - 2,
        )
    } else {
        (None, None, 0)
    };

    SubnetReport {
        address: prefix.address(),
        prefix: length,
        mask: ipv4_mask(length),
        network,
        broadcast,
        first_host,
        last_host,
        usable_hosts,
    }
}
