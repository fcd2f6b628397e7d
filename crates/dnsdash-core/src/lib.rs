// # dnsdash-core
//
// Core library for the dnsdash DNS dashboard.
//
// ## Architecture Overview
//
// - **AddressMath** (`addr::math`): IPv6 parsing, `ip6.arpa` names, random
//   addresses inside a prefix, IPv4 CIDR arithmetic
// - **AddressLab** (`addr::lab`): request/response layer over AddressMath
// - **RecordStore** (`records::store`): one zone's records plus the selection
//   used for bulk operations
// - **SyncEngine** (`engine`): single and bulk mutations through a
//   RemoteGateway, with a full refresh after every change
// - **Session** (`session`): credentials, record snapshot and operation state
//   of one dashboard session
// - **RemoteGateway** (`traits`): the only network access point
//
// ## Design Principles
//
// 1. **Pure address math**: no I/O, safe to call from anywhere
// 2. **Remote is authoritative**: the store is replaced, never patched
// 3. **Independent bulk items**: one failure never aborts a batch
// 4. **Library-First**: the CLI is a thin shell over this crate

pub mod addr;
pub mod config;
pub mod engine;
pub mod error;
pub mod records;
pub mod session;
pub mod traits;

// Re-export core types for convenience
pub use addr::AddressLab;
pub use config::{DashConfig, GatewayConfig, LabConfig, SyncConfig};
pub use engine::{Ack, BulkFailure, BulkResult, SyncEngine, SyncEvent, SyncEventKind};
pub use error::{Error, Result};
pub use records::{DnsRecord, NewRecord, RecordPatch, RecordStore, RecordType};
pub use session::{Operation, OperationState, Session};
pub use traits::{Credentials, RemoteGateway, RemoteGatewayFactory};
