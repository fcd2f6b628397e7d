//! Session-scoped context
//!
//! Everything a dashboard session mutates lives here instead of in global
//! state: the caller's credentials, the record snapshot with its selection,
//! and the state of the last operation. A session is created at login and
//! dropped at logout; nothing leaks between sessions.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::records::RecordStore;
use crate::traits::Credentials;

/// Engine operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListZones,
    ListAccounts,
    ListRecords,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
    SetProxied,
    BulkDelete,
    BulkSetProxied,
    BulkCreate,
    GetSslMode,
    SetSslMode,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListZones => "list_zones",
            Operation::ListAccounts => "list_accounts",
            Operation::ListRecords => "list_records",
            Operation::CreateRecord => "create_record",
            Operation::UpdateRecord => "update_record",
            Operation::DeleteRecord => "delete_record",
            Operation::SetProxied => "set_proxied",
            Operation::BulkDelete => "bulk_delete",
            Operation::BulkSetProxied => "bulk_set_proxied",
            Operation::BulkCreate => "bulk_create",
            Operation::GetSslMode => "get_ssl_mode",
            Operation::SetSslMode => "set_ssl_mode",
        }
    }

    /// Whether the operation can change remote record state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Operation::ListZones
                | Operation::ListAccounts
                | Operation::ListRecords
                | Operation::GetSslMode
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Idle -> InFlight -> {Applied, Failed}`
///
/// `Applied` and `Failed` are resting states: a new operation may start from
/// either of them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    InFlight {
        operation: Operation,
        since: DateTime<Utc>,
    },
    Applied {
        operation: Operation,
    },
    Failed {
        operation: Operation,
        reason: String,
    },
}

impl OperationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, OperationState::InFlight { .. })
    }
}

/// One dashboard session
#[derive(Debug)]
pub struct Session {
    credentials: Credentials,
    store: RecordStore,
    state: OperationState,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Start a session; the secret must be non-empty
    pub fn new(credentials: Credentials) -> Result<Self> {
        credentials.validate()?;
        Ok(Self {
            credentials,
            store: RecordStore::new(),
            state: OperationState::Idle,
            started_at: Utc::now(),
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Selection edits (select/deselect/toggle) go through here
    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    /// Inputs are disabled while this is true
    pub fn is_busy(&self) -> bool {
        self.state.is_in_flight()
    }

    pub fn active_zone(&self) -> Option<&str> {
        self.store.zone_id()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Switch the active zone, dropping the snapshot and selection when it
    /// actually changes
    pub fn switch_zone(&mut self, zone_id: &str) {
        if self.store.zone_id() != Some(zone_id) {
            self.store.reset();
            self.store.set_records(zone_id, Vec::new());
        }
    }

    pub(crate) fn set_state(&mut self, state: OperationState) {
        self.state = state;
    }
}
