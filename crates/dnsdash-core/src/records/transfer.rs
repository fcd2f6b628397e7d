// # Record Import/Export
//
// Flat tabular form of DNS records: `type, name, content, proxied, ttl`.
// Two interchangeable encodings are supported:
//
// - CSV with a header row
// - JSON array of objects
//
// Import runs every row through the same validation as remote payloads, so
// an exported table always imports back to the same tuples.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::model::{DnsRecord, NewRecord};
use crate::error::{Error, Result};

/// One row of the tabular form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default = "default_row_ttl")]
    pub ttl: u32,
}

fn default_row_ttl() -> u32 {
    super::model::TTL_AUTO
}

impl From<&DnsRecord> for RecordRow {
    fn from(record: &DnsRecord) -> Self {
        Self {
            record_type: record.record_type().to_string(),
            name: record.name.clone(),
            content: record.content(),
            proxied: record.proxied,
            ttl: record.ttl,
        }
    }
}

impl From<&NewRecord> for RecordRow {
    fn from(record: &NewRecord) -> Self {
        Self {
            record_type: record.data.record_type().to_string(),
            name: record.name.clone(),
            content: record.data.content(),
            proxied: record.proxied,
            ttl: record.ttl,
        }
    }
}

impl TryFrom<RecordRow> for NewRecord {
    type Error = Error;

    fn try_from(row: RecordRow) -> Result<Self> {
        NewRecord::from_parts(&row.record_type, &row.name, &row.content, row.proxied, row.ttl)
    }
}

/// Text encoding of the tabular form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferFormat {
    Csv,
    Json,
}

impl TransferFormat {
    /// Guess from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for TransferFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for TransferFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(Error::validation(format!(
                "unknown format '{}'. Valid formats: csv, json",
                other
            ))),
        }
    }
}

/// Encode records as text
pub fn export<'a>(
    format: TransferFormat,
    records: impl IntoIterator<Item = &'a DnsRecord>,
) -> Result<String> {
    let rows: Vec<RecordRow> = records.into_iter().map(RecordRow::from).collect();
    debug!("Exporting {} record(s) as {}", rows.len(), format);
    encode_rows(format, &rows)
}

/// Encode rows as text
pub fn encode_rows(format: TransferFormat, rows: &[RecordRow]) -> Result<String> {
    match format {
        TransferFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
        TransferFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in rows {
                writer.serialize(row)?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| Error::Other(format!("CSV writer flush failed: {}", e)))?;
            String::from_utf8(bytes)
                .map_err(|e| Error::Other(format!("CSV output is not UTF-8: {}", e)))
        }
    }
}

/// Decode text into raw rows, without record validation
pub fn decode_rows(format: TransferFormat, text: &str) -> Result<Vec<RecordRow>> {
    match format {
        TransferFormat::Json => Ok(serde_json::from_str(text)?),
        TransferFormat::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .trim(csv::Trim::Fields)
                .from_reader(text.as_bytes());
            reader
                .deserialize()
                .map(|row| row.map_err(Error::from))
                .collect()
        }
    }
}

/// Decode and validate text into records ready for creation
///
/// The first invalid row aborts the import; the error names its position.
pub fn import(format: TransferFormat, text: &str) -> Result<Vec<NewRecord>> {
    decode_rows(format, text)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            NewRecord::try_from(row)
                .map_err(|e| Error::validation(format!("row {}: {}", i + 1, e.reason())))
        })
        .collect()
}

/// Write records to `path`, picking the format from the extension
pub fn export_to_path<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a DnsRecord>,
) -> Result<()> {
    let format = TransferFormat::from_path(path).ok_or_else(|| {
        Error::validation(format!("cannot infer format from '{}'", path.display()))
    })?;
    std::fs::write(path, export(format, records)?)?;
    Ok(())
}

/// Read records from `path`, picking the format from the extension
pub fn import_from_path(path: &Path) -> Result<Vec<NewRecord>> {
    let format = TransferFormat::from_path(path).ok_or_else(|| {
        Error::validation(format!("cannot infer format from '{}'", path.display()))
    })?;
    import(format, &std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::model::{RecordData, RecordType};

    fn records() -> Vec<DnsRecord> {
        [
            ("a1", RecordType::A, "www.example.com", "192.0.2.1", true, 1),
            ("a2", RecordType::Mx, "example.com", "10 mail.example.com", false, 3600),
            ("a3", RecordType::Txt, "example.com", "v=spf1 include:a.example, b ~all", false, 300),
            ("a4", RecordType::Caa, "example.com", "0 issue \"letsencrypt.org\"", false, 1),
        ]
        .into_iter()
        .map(|(id, t, name, content, proxied, ttl)| DnsRecord {
            id: id.to_string(),
            name: name.to_string(),
            data: RecordData::parse(t, content).unwrap(),
            proxied,
            ttl,
        })
        .collect()
    }

    fn tuples(rows: impl IntoIterator<Item = RecordRow>) -> Vec<RecordRow> {
        let mut rows: Vec<RecordRow> = rows.into_iter().collect();
        rows.sort_by(|a, b| {
            (&a.record_type, &a.name, &a.content).cmp(&(&b.record_type, &b.name, &b.content))
        });
        rows
    }

    #[test]
    fn test_csv_roundtrip() {
        let records = records();
        let text = export(TransferFormat::Csv, &records).unwrap();
        assert!(text.starts_with("type,name,content,proxied,ttl"));

        let imported = import(TransferFormat::Csv, &text).unwrap();
        assert_eq!(imported.len(), records.len());
        assert_eq!(
            tuples(imported.iter().map(RecordRow::from)),
            tuples(records.iter().map(RecordRow::from))
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let records = records();
        let text = export(TransferFormat::Json, &records).unwrap();
        let imported = import(TransferFormat::Json, &text).unwrap();
        assert_eq!(
            tuples(imported.iter().map(RecordRow::from)),
            tuples(records.iter().map(RecordRow::from))
        );
    }

    #[test]
    fn test_import_reports_bad_row() {
        let text = "type,name,content,proxied,ttl\nA,www,192.0.2.1,false,1\nA,,192.0.2.2,false,1\n";
        let err = import(TransferFormat::Csv, text).unwrap_err();
        assert!(err.to_string().contains("row 2"), "{}", err);

        let text = r#"[{"type": "TXT", "name": "x", "content": "y", "proxied": true}]"#;
        assert!(import(TransferFormat::Json, text).is_err());
    }

    #[test]
    fn test_json_defaults() {
        let text = r#"[{"type": "cname", "name": "blog", "content": "example.net"}]"#;
        let imported = import(TransferFormat::Json, text).unwrap();
        assert_eq!(imported[0].ttl, 1);
        assert!(!imported[0].proxied);
        assert_eq!(imported[0].data.record_type(), RecordType::Cname);
    }

    #[test]
    fn test_path_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.csv");
        export_to_path(&path, &records()).unwrap();
        assert_eq!(import_from_path(&path).unwrap().len(), 4);

        let unknown = dir.path().join("records.txt");
        assert!(export_to_path(&unknown, &records()).is_err());
    }
}
