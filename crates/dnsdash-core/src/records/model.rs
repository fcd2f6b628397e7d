// # Record Model
//
// Zones, accounts and DNS records mirrored from the remote API.
//
// `RecordData` is a tagged union over the record type enumeration; types
// without a variant of their own travel as `RecordType::Other`. Every remote
// payload and every import row passes through
// `RecordData::parse` / `RecordData::from_wire`, so a `DnsRecord` held in
// memory is always well formed.
//
// ## Wire mapping (Cloudflare API v4)
//
// | type  | content              | priority | data                          |
// |-------|----------------------|----------|-------------------------------|
// | MX    | exchange             | yes      | -                             |
// | SRV   | `weight port target` | yes      | `{priority,weight,port,target}` |
// | CAA   | `flags tag "value"`  | -        | `{flags,tag,value}`           |
// | other | content              | -        | -                             |

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};

/// TTL value the remote API interprets as "automatic"
pub const TTL_AUTO: u32 = 1;

/// Lowest explicit TTL accepted
pub const TTL_MIN: u32 = 30;

/// Highest explicit TTL accepted
pub const TTL_MAX: u32 = 86_400;

/// Longest record type mnemonic accepted for types without a variant
const MNEMONIC_MAX: usize = 16;

/// DNS record type
///
/// Types without a dedicated variant are kept as [`RecordType::Other`] with
/// their upper-case mnemonic, so every record the remote serves stays
/// visible locally. They are never proxyable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordType {
    A,
    Aaaa,
    Caa,
    Cert,
    Cname,
    Dnskey,
    Ds,
    Https,
    Loc,
    Mx,
    Naptr,
    Ns,
    Openpgpkey,
    Ptr,
    Smimea,
    Srv,
    Sshfp,
    Svcb,
    Tlsa,
    Txt,
    Uri,
    Other(String),
}

impl RecordType {
    /// Every type with a dedicated variant
    pub const ALL: [RecordType; 21] = [
        RecordType::A,
        RecordType::Aaaa,
        RecordType::Caa,
        RecordType::Cert,
        RecordType::Cname,
        RecordType::Dnskey,
        RecordType::Ds,
        RecordType::Https,
        RecordType::Loc,
        RecordType::Mx,
        RecordType::Naptr,
        RecordType::Ns,
        RecordType::Openpgpkey,
        RecordType::Ptr,
        RecordType::Smimea,
        RecordType::Srv,
        RecordType::Sshfp,
        RecordType::Svcb,
        RecordType::Tlsa,
        RecordType::Txt,
        RecordType::Uri,
    ];

    /// Upper-case mnemonic
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Caa => "CAA",
            RecordType::Cert => "CERT",
            RecordType::Cname => "CNAME",
            RecordType::Dnskey => "DNSKEY",
            RecordType::Ds => "DS",
            RecordType::Https => "HTTPS",
            RecordType::Loc => "LOC",
            RecordType::Mx => "MX",
            RecordType::Naptr => "NAPTR",
            RecordType::Ns => "NS",
            RecordType::Openpgpkey => "OPENPGPKEY",
            RecordType::Ptr => "PTR",
            RecordType::Smimea => "SMIMEA",
            RecordType::Srv => "SRV",
            RecordType::Sshfp => "SSHFP",
            RecordType::Svcb => "SVCB",
            RecordType::Tlsa => "TLSA",
            RecordType::Txt => "TXT",
            RecordType::Uri => "URI",
            RecordType::Other(mnemonic) => mnemonic,
        }
    }

    /// Only A, AAAA and CNAME can be routed through the edge proxy
    pub fn is_proxyable(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa | RecordType::Cname)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        if let Some(known) = RecordType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
        {
            return Ok(known);
        }

        let mut chars = wanted.chars();
        let well_formed = wanted.len() <= MNEMONIC_MAX
            && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !well_formed {
            return Err(Error::validation(format!("invalid record type '{}'", wanted)));
        }
        Ok(RecordType::Other(wanted.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for RecordType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(record_type: RecordType) -> Self {
        record_type.as_str().to_string()
    }
}

/// Type-specific record payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A { address: Ipv4Addr },
    Aaaa { address: Ipv6Addr },
    Cname { target: String },
    Mx { priority: u16, exchange: String },
    Txt { text: String },
    Ns { nameserver: String },
    Ptr { target: String },
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Caa { flags: u8, tag: String, value: String },
    /// Remaining types, carried as opaque presentation text
    Generic { record_type: RecordType, content: String },
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::A { .. } => RecordType::A,
            Self::Aaaa { .. } => RecordType::Aaaa,
            Self::Cname { .. } => RecordType::Cname,
            Self::Mx { .. } => RecordType::Mx,
            Self::Txt { .. } => RecordType::Txt,
            Self::Ns { .. } => RecordType::Ns,
            Self::Ptr { .. } => RecordType::Ptr,
            Self::Srv { .. } => RecordType::Srv,
            Self::Caa { .. } => RecordType::Caa,
            Self::Generic { record_type, .. } => record_type.clone(),
        }
    }

    /// Parse presentation text for `record_type`
    ///
    /// MX is `priority exchange`, SRV is `priority weight port target` and
    /// CAA is `flags tag "value"`. Everything else is taken verbatim.
    pub fn parse(record_type: RecordType, content: &str) -> Result<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::validation(format!(
                "{} record content is required",
                record_type
            )));
        }

        let data = match record_type {
            RecordType::A => Self::A {
                address: content.parse().map_err(|_| {
                    Error::validation(format!("'{}' is not a valid IPv4 address", content))
                })?,
            },
            RecordType::Aaaa => Self::Aaaa {
                address: content.parse().map_err(|_| {
                    Error::validation(format!("'{}' is not a valid IPv6 address", content))
                })?,
            },
            RecordType::Cname => Self::Cname {
                target: content.to_string(),
            },
            RecordType::Ns => Self::Ns {
                nameserver: content.to_string(),
            },
            RecordType::Ptr => Self::Ptr {
                target: content.to_string(),
            },
            RecordType::Txt => Self::Txt {
                text: content.to_string(),
            },
            RecordType::Mx => {
                let fields = split_fields(content, 2, "MX", "priority exchange")?;
                Self::Mx {
                    priority: parse_num(fields[0], "MX priority")?,
                    exchange: fields[1].to_string(),
                }
            }
            RecordType::Srv => {
                let fields = split_fields(content, 4, "SRV", "priority weight port target")?;
                Self::Srv {
                    priority: parse_num(fields[0], "SRV priority")?,
                    weight: parse_num(fields[1], "SRV weight")?,
                    port: parse_num(fields[2], "SRV port")?,
                    target: fields[3].to_string(),
                }
            }
            RecordType::Caa => parse_caa(content)?,
            other => Self::Generic {
                record_type: other,
                content: content.to_string(),
            },
        };
        Ok(data)
    }

    /// Presentation text; the inverse of [`RecordData::parse`]
    pub fn content(&self) -> String {
        self.to_string()
    }

    /// Rebuild from a remote payload's `content`, `priority` and `data` fields
    pub fn from_wire(
        record_type: RecordType,
        content: &str,
        priority: Option<u16>,
        data: Option<&Value>,
    ) -> Result<Self> {
        match record_type {
            RecordType::Mx => match priority {
                Some(priority) if !content.trim().is_empty() => Ok(Self::Mx {
                    priority,
                    exchange: content.trim().to_string(),
                }),
                _ => Self::parse(record_type, content),
            },
            RecordType::Srv => match data {
                Some(data) => Ok(Self::Srv {
                    priority: data_num(data, "priority")?,
                    weight: data_num(data, "weight")?,
                    port: data_num(data, "port")?,
                    target: data_str(data, "target")?,
                }),
                None => match priority {
                    Some(priority) if content.split_whitespace().count() == 3 => {
                        Self::parse(record_type, &format!("{} {}", priority, content.trim()))
                    }
                    _ => Self::parse(record_type, content),
                },
            },
            RecordType::Caa => match data {
                Some(data) => Ok(Self::Caa {
                    flags: data_num(data, "flags")?,
                    tag: data_str(data, "tag")?,
                    value: data_str(data, "value")?,
                }),
                None => Self::parse(record_type, content),
            },
            _ => Self::parse(record_type, content),
        }
    }

    /// `content` field sent to the remote API
    pub fn wire_content(&self) -> String {
        match self {
            Self::Mx { exchange, .. } => exchange.clone(),
            Self::Srv {
                weight,
                port,
                target,
                ..
            } => format!("{} {} {}", weight, port, target),
            other => other.content(),
        }
    }

    /// `priority` field sent to the remote API
    pub fn wire_priority(&self) -> Option<u16> {
        match self {
            Self::Mx { priority, .. } | Self::Srv { priority, .. } => Some(*priority),
            _ => None,
        }
    }

    /// `data` field sent to the remote API
    pub fn wire_data(&self) -> Option<Value> {
        match self {
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => Some(json!({
                "priority": priority,
                "weight": weight,
                "port": port,
                "target": target,
            })),
            Self::Caa { flags, tag, value } => Some(json!({
                "flags": flags,
                "tag": tag,
                "value": value,
            })),
            _ => None,
        }
    }

    /// Insert the type-specific wire fields into a request body
    fn write_wire_fields(&self, body: &mut serde_json::Map<String, Value>) {
        body.insert("type".into(), json!(self.record_type().as_str()));
        body.insert("content".into(), json!(self.wire_content()));
        if let Some(priority) = self.wire_priority() {
            body.insert("priority".into(), json!(priority));
        }
        if let Some(data) = self.wire_data() {
            body.insert("data".into(), data);
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A { address } => write!(f, "{}", address),
            Self::Aaaa { address } => write!(f, "{}", address),
            Self::Cname { target } | Self::Ptr { target } => f.write_str(target),
            Self::Ns { nameserver } => f.write_str(nameserver),
            Self::Txt { text } => f.write_str(text),
            Self::Mx { priority, exchange } => write!(f, "{} {}", priority, exchange),
            Self::Srv {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
            Self::Caa { flags, tag, value } => write!(f, "{} {} \"{}\"", flags, tag, value),
            Self::Generic { content, .. } => f.write_str(content),
        }
    }
}

fn split_fields<'a>(content: &'a str, n: usize, kind: &str, shape: &str) -> Result<Vec<&'a str>> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() != n {
        return Err(Error::validation(format!(
            "{} content must be '{}', got '{}'",
            kind, shape, content
        )));
    }
    Ok(fields)
}

fn parse_num<T: FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| Error::validation(format!("invalid {} '{}'", what, field)))
}

fn parse_caa(content: &str) -> Result<RecordData> {
    let malformed = || {
        Error::validation(format!(
            "CAA content must be 'flags tag \"value\"', got '{}'",
            content
        ))
    };

    let (flags, rest) = content.split_once(char::is_whitespace).ok_or_else(malformed)?;
    let (tag, value) = rest
        .trim_start()
        .split_once(char::is_whitespace)
        .ok_or_else(malformed)?;
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(malformed());
    }
    let value = value.trim();
    if value.is_empty() {
        return Err(malformed());
    }
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    Ok(RecordData::Caa {
        flags: parse_num(flags, "CAA flags")?,
        tag: tag.to_string(),
        value: value.to_string(),
    })
}

fn data_num<T: TryFrom<u64>>(data: &Value, key: &str) -> Result<T> {
    data[key]
        .as_u64()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| Error::remote(format!("Invalid response format: data.{} is not a valid number", key)))
}

fn data_str(data: &Value, key: &str) -> Result<String> {
    data[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::remote(format!("Invalid response format: data.{} is not a string", key)))
}

/// Accept [`TTL_AUTO`] or an explicit value within [`TTL_MIN`]..=[`TTL_MAX`]
pub fn validate_ttl(ttl: u32) -> Result<()> {
    if ttl == TTL_AUTO || (TTL_MIN..=TTL_MAX).contains(&ttl) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "TTL {} must be {} (automatic) or between {} and {}",
            ttl, TTL_AUTO, TTL_MIN, TTL_MAX
        )))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("record name is required"));
    }
    if name.len() > 253 {
        return Err(Error::validation(format!(
            "record name too long: {} chars (max 253)",
            name.len()
        )));
    }
    Ok(())
}

/// A DNS record as held by the remote system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Remote-assigned identifier, opaque and immutable
    pub id: String,
    pub name: String,
    pub data: RecordData,
    pub proxied: bool,
    pub ttl: u32,
}

impl DnsRecord {
    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }

    pub fn content(&self) -> String {
        self.data.content()
    }

    pub fn is_proxyable(&self) -> bool {
        self.record_type().is_proxyable()
    }
}

/// DNS record payload as returned by the remote API
#[derive(Debug, Clone, Deserialize)]
pub struct WireRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    #[serde(default)]
    pub priority: Option<u16>,
    #[serde(default)]
    pub data: Option<Value>,
}

fn default_ttl() -> u32 {
    TTL_AUTO
}

impl TryFrom<WireRecord> for DnsRecord {
    type Error = Error;

    fn try_from(wire: WireRecord) -> Result<Self> {
        let record_type: RecordType = wire.record_type.parse()?;
        let data = RecordData::from_wire(
            record_type,
            &wire.content,
            wire.priority,
            wire.data.as_ref(),
        )?;
        Ok(DnsRecord {
            id: wire.id,
            name: wire.name,
            data,
            proxied: wire.proxied,
            ttl: wire.ttl,
        })
    }
}

/// Fields for a record that does not exist yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub data: RecordData,
    pub proxied: bool,
    pub ttl: u32,
}

impl NewRecord {
    pub fn new(name: impl Into<String>, data: RecordData) -> Self {
        Self {
            name: name.into(),
            data,
            proxied: false,
            ttl: TTL_AUTO,
        }
    }

    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Build from loose tabular fields, validating everything
    pub fn from_parts(
        record_type: &str,
        name: &str,
        content: &str,
        proxied: bool,
        ttl: u32,
    ) -> Result<Self> {
        let record_type: RecordType = record_type.parse()?;
        let record = Self {
            name: name.trim().to_string(),
            data: RecordData::parse(record_type, content)?,
            proxied,
            ttl,
        };
        record.validate()?;
        Ok(record)
    }

    /// Local checks performed before any remote call
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_ttl(self.ttl)?;
        if self.proxied && !self.data.record_type().is_proxyable() {
            return Err(Error::validation(format!(
                "{} records cannot be proxied",
                self.data.record_type()
            )));
        }
        Ok(())
    }

    /// Request body for record creation
    pub fn to_body(&self) -> Value {
        let mut body = serde_json::Map::new();
        body.insert("name".into(), json!(self.name));
        self.data.write_wire_fields(&mut body);
        body.insert("ttl".into(), json!(self.ttl));
        if self.data.record_type().is_proxyable() {
            body.insert("proxied".into(), json!(self.proxied));
        }
        Value::Object(body)
    }

    /// Short label used where no remote id exists yet
    pub fn label(&self) -> String {
        format!("{}/{}", self.name, self.data.record_type())
    }
}

/// Partial update of an existing record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub data: Option<RecordData>,
    pub proxied: Option<bool>,
    pub ttl: Option<u32>,
}

impl RecordPatch {
    pub fn proxied(enabled: bool) -> Self {
        Self {
            proxied: Some(enabled),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.data.is_none() && self.proxied.is_none() && self.ttl.is_none()
    }

    /// Local checks; `current_type` is the type of the record being patched,
    /// when known
    pub fn validate(&self, current_type: Option<RecordType>) -> Result<()> {
        if self.is_empty() {
            return Err(Error::validation("update contains no changes"));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(ttl) = self.ttl {
            validate_ttl(ttl)?;
        }
        if self.proxied == Some(true) {
            let effective = self
                .data
                .as_ref()
                .map(RecordData::record_type)
                .or(current_type);
            if let Some(record_type) = effective
                && !record_type.is_proxyable()
            {
                return Err(Error::validation(format!(
                    "{} records cannot be proxied",
                    record_type
                )));
            }
        }
        Ok(())
    }

    /// Request body for a PATCH
    pub fn to_body(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(name) = &self.name {
            body.insert("name".into(), json!(name.trim()));
        }
        if let Some(data) = &self.data {
            data.write_wire_fields(&mut body);
        }
        if let Some(proxied) = self.proxied {
            body.insert("proxied".into(), json!(proxied));
        }
        if let Some(ttl) = self.ttl {
            body.insert("ttl".into(), json!(ttl));
        }
        Value::Object(body)
    }
}

/// Account reference embedded in a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// A DNS-managed domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub account: Option<AccountRef>,
}

/// An account owning zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Zone SSL/TLS encryption mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Off,
    Flexible,
    Full,
    Strict,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Off => "off",
            SslMode::Flexible => "flexible",
            SslMode::Full => "full",
            SslMode::Strict => "strict",
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SslMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Ok(SslMode::Off),
            "flexible" => Ok(SslMode::Flexible),
            "full" => Ok(SslMode::Full),
            "strict" => Ok(SslMode::Strict),
            other => Err(Error::validation(format!(
                "SSL mode '{}' is not valid. Valid modes: off, flexible, full, strict",
                other
            ))),
        }
    }
}
