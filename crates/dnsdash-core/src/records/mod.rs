//! Zones, records and their local snapshot
//!
//! - [`model`]: record types, payloads and remote entity shapes
//! - [`store`]: the in-memory snapshot and selection set
//! - [`transfer`]: CSV/JSON import and export

pub mod model;
pub mod store;
pub mod transfer;

pub use model::{
    Account, AccountRef, DnsRecord, NewRecord, RecordData, RecordPatch, RecordType, SslMode,
    WireRecord, Zone,
};
pub use store::{RecordQuery, RecordStore, SelectionSet};
pub use transfer::{RecordRow, TransferFormat};
