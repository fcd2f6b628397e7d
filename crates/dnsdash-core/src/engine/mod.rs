//! Record synchronization engine
//!
//! The SyncEngine is responsible for:
//! - Listing zones, accounts and records through the RemoteGateway
//! - Applying single mutations, then refreshing the RecordStore wholesale
//! - Applying bulk mutations item by item, aggregating per-item outcomes
//! - Emitting a log trail of what happened
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!  &mut Session ─▶│  SyncEngine  │── SyncEvent ──▶ log trail (mpsc)
//!                 └──────────────┘
//!                        │
//!          ┌─────────────┴─────────────┐
//!          ▼                           ▼
//! ┌─────────────────┐         ┌─────────────────┐
//! │  RemoteGateway  │         │  RecordStore    │
//! │  (one call per  │         │  (replaced after│
//! │   item)         │         │   every change) │
//! └─────────────────┘         └─────────────────┘
//! ```
//!
//! ## Mutation Flow
//!
//! 1. Validate locally (no network on failure)
//! 2. One gateway round trip per record
//! 3. Full `list_records` refresh into the store
//! 4. Bulk only: clear the selection once

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::records::{Account, DnsRecord, NewRecord, RecordPatch, SslMode, WireRecord, Zone};
use crate::session::{Operation, OperationState, Session};
use crate::traits::{GatewayRequest, GatewayResponse, Method, RemoteGateway};

/// Page size used for zone and account listings
const DIRECTORY_PAGE_SIZE: u32 = 50;

/// What happened, for the log trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEventKind {
    /// Operation started
    Started { operation: Operation },

    /// Operation completed without errors
    Applied { operation: Operation },

    /// Operation failed (or a bulk operation had failed items)
    Failed { operation: Operation, reason: String },

    /// One item of a bulk operation failed
    BulkItemFailed {
        operation: Operation,
        id: String,
        reason: String,
    },

    /// Bulk operation ran over all its items
    BulkCompleted {
        operation: Operation,
        attempted: usize,
        succeeded: usize,
        failed: usize,
    },

    /// RecordStore replaced with a fresh snapshot
    RecordsRefreshed { zone_id: String, count: usize },
}

/// Timestamped log-trail entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub at: DateTime<Utc>,
    pub kind: SyncEventKind,
}

impl SyncEvent {
    pub fn now(kind: SyncEventKind) -> Self {
        Self {
            at: Utc::now(),
            kind,
        }
    }
}

/// Acknowledgement of a delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub id: String,
}

/// One failed item of a bulk operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    /// Record id, or `name/TYPE` for records being created
    pub id: String,
    pub reason: String,
}

/// Aggregate outcome of a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<BulkFailure>,
    /// Set when the trailing refresh failed
    pub refresh_error: Option<String>,
}

impl BulkResult {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold one item outcome into the aggregate
    pub fn absorb(&mut self, id: impl Into<String>, outcome: Result<()>) {
        self.attempted += 1;
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(e) => self.failures.push(BulkFailure {
                id: id.into(),
                reason: e.reason(),
            }),
        }
    }
}

/// A gateway call planned for one bulk item
struct PlannedCall {
    method: Method,
    endpoint: String,
    body: Option<Value>,
}

/// Record synchronization engine
///
/// ## Threading
///
/// Every operation takes `&mut Session`: one operation per session at a
/// time, enforced at compile time. Engines hold no session state and can be
/// shared between sessions.
///
/// ## Load Resistance
///
/// - **Sequential bulk items**: item k+1 starts after item k resolves
/// - **Bounded event channel**: full channel drops events (logged)
pub struct SyncEngine {
    /// The only network access point
    gateway: Box<dyn RemoteGateway>,

    /// Page size for record listings
    per_page: u32,

    /// Log-trail sender
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields the
    /// log trail
    pub fn new(
        gateway: Box<dyn RemoteGateway>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            gateway,
            per_page: config.per_page,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.gateway_name()
    }

    /// List every zone visible to the session's credentials
    pub async fn list_zones(&self, session: &mut Session) -> Result<Vec<Zone>> {
        let operation = Operation::ListZones;
        self.begin(session, operation);
        let result = self.fetch_directory(session, "zones").await;
        self.finish(session, operation, &result);
        result
    }

    /// List every account visible to the session's credentials
    pub async fn list_accounts(&self, session: &mut Session) -> Result<Vec<Account>> {
        let operation = Operation::ListAccounts;
        self.begin(session, operation);
        let result = self.fetch_directory(session, "accounts").await;
        self.finish(session, operation, &result);
        result
    }

    /// Fetch all records of `zone_id` into the session's store
    ///
    /// Makes `zone_id` the active zone. Returns the number of records held.
    pub async fn list_records(&self, session: &mut Session, zone_id: &str) -> Result<usize> {
        let operation = Operation::ListRecords;
        require("zone id", zone_id)?;
        self.begin(session, operation);
        let result = self.refresh(session, zone_id).await;
        self.finish(session, operation, &result);
        result
    }

    /// Create one record, then refresh
    pub async fn create_record(
        &self,
        session: &mut Session,
        zone_id: &str,
        record: &NewRecord,
    ) -> Result<DnsRecord> {
        require("zone id", zone_id)?;
        record.validate()?;

        let operation = Operation::CreateRecord;
        self.begin(session, operation);
        let result = self
            .call(
                session,
                Method::Post,
                records_endpoint(zone_id),
                Some(record.to_body()),
            )
            .await
            .and_then(parse_record);
        self.complete_single(session, operation, zone_id, result)
            .await
    }

    /// Patch one record, then refresh
    pub async fn update_record(
        &self,
        session: &mut Session,
        zone_id: &str,
        id: &str,
        patch: &RecordPatch,
    ) -> Result<DnsRecord> {
        self.patch_record(session, Operation::UpdateRecord, zone_id, id, patch)
            .await
    }

    /// Toggle the proxy flag of one record, then refresh
    pub async fn set_proxied(
        &self,
        session: &mut Session,
        zone_id: &str,
        id: &str,
        enabled: bool,
    ) -> Result<DnsRecord> {
        self.patch_record(
            session,
            Operation::SetProxied,
            zone_id,
            id,
            &RecordPatch::proxied(enabled),
        )
        .await
    }

    /// Delete one record, then refresh
    pub async fn delete_record(
        &self,
        session: &mut Session,
        zone_id: &str,
        id: &str,
    ) -> Result<Ack> {
        require("zone id", zone_id)?;
        require("record id", id)?;

        let operation = Operation::DeleteRecord;
        self.begin(session, operation);
        let result = self
            .call(session, Method::Delete, record_endpoint(zone_id, id), None)
            .await
            .map(|value| Ack {
                id: value
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or(id)
                    .to_string(),
            });
        self.complete_single(session, operation, zone_id, result)
            .await
    }

    /// Delete every id, one call at a time
    ///
    /// Duplicate ids are attempted once. Item failures never abort the
    /// batch; they are recorded in the returned [`BulkResult`].
    pub async fn bulk_delete(
        &self,
        session: &mut Session,
        zone_id: &str,
        ids: &[String],
    ) -> Result<BulkResult> {
        require("zone id", zone_id)?;

        let steps = dedup(ids)
            .into_iter()
            .map(|id| {
                let call = PlannedCall {
                    method: Method::Delete,
                    endpoint: record_endpoint(zone_id, id),
                    body: None,
                };
                (id.to_string(), Ok(call))
            })
            .collect();

        Ok(self
            .run_bulk(session, Operation::BulkDelete, zone_id, steps)
            .await)
    }

    /// Set the proxy flag on every proxyable id, one call at a time
    ///
    /// Ids that are unknown to the store or whose type cannot be proxied
    /// are skipped and not counted.
    pub async fn bulk_set_proxied(
        &self,
        session: &mut Session,
        zone_id: &str,
        ids: &[String],
        enabled: bool,
    ) -> Result<BulkResult> {
        require("zone id", zone_id)?;

        let store = session.store();
        let steps: Vec<_> = dedup(ids)
            .into_iter()
            .filter(|id| {
                let proxyable = store.get(id).is_some_and(DnsRecord::is_proxyable);
                if !proxyable {
                    debug!("Skipping {}: not a proxyable record", id);
                }
                proxyable
            })
            .map(|id| {
                let call = PlannedCall {
                    method: Method::Patch,
                    endpoint: record_endpoint(zone_id, id),
                    body: Some(json!({ "proxied": enabled })),
                };
                (id.to_string(), Ok(call))
            })
            .collect();

        Ok(self
            .run_bulk(session, Operation::BulkSetProxied, zone_id, steps)
            .await)
    }

    /// Create every record, one call at a time
    ///
    /// Records failing local validation are recorded as failed items
    /// without a remote call. Failure ids are `name/TYPE` labels.
    pub async fn bulk_create(
        &self,
        session: &mut Session,
        zone_id: &str,
        records: &[NewRecord],
    ) -> Result<BulkResult> {
        require("zone id", zone_id)?;

        let steps = records
            .iter()
            .map(|record| {
                let call = record.validate().map(|()| PlannedCall {
                    method: Method::Post,
                    endpoint: records_endpoint(zone_id),
                    body: Some(record.to_body()),
                });
                (record.label(), call)
            })
            .collect();

        Ok(self
            .run_bulk(session, Operation::BulkCreate, zone_id, steps)
            .await)
    }

    /// Current SSL/TLS mode of a zone
    pub async fn ssl_mode(&self, session: &mut Session, zone_id: &str) -> Result<SslMode> {
        require("zone id", zone_id)?;

        let operation = Operation::GetSslMode;
        self.begin(session, operation);
        let result = self
            .call(session, Method::Get, ssl_endpoint(zone_id), None)
            .await
            .and_then(parse_ssl_mode);
        self.finish(session, operation, &result);
        result
    }

    /// Change the SSL/TLS mode of a zone
    pub async fn set_ssl_mode(
        &self,
        session: &mut Session,
        zone_id: &str,
        mode: SslMode,
    ) -> Result<SslMode> {
        require("zone id", zone_id)?;

        let operation = Operation::SetSslMode;
        self.begin(session, operation);
        let result = self
            .call(
                session,
                Method::Patch,
                ssl_endpoint(zone_id),
                Some(json!({ "value": mode })),
            )
            .await
            .and_then(parse_ssl_mode);
        if let Ok(applied) = &result {
            info!("Zone {} SSL mode set to {}", zone_id, applied);
        }
        self.finish(session, operation, &result);
        result
    }

    async fn patch_record(
        &self,
        session: &mut Session,
        operation: Operation,
        zone_id: &str,
        id: &str,
        patch: &RecordPatch,
    ) -> Result<DnsRecord> {
        require("zone id", zone_id)?;
        require("record id", id)?;

        let current_type = session
            .store()
            .get(id)
            .filter(|_| session.active_zone() == Some(zone_id))
            .map(DnsRecord::record_type);
        patch.validate(current_type)?;

        self.begin(session, operation);
        let result = self
            .call(
                session,
                Method::Patch,
                record_endpoint(zone_id, id),
                Some(patch.to_body()),
            )
            .await
            .and_then(parse_record);
        self.complete_single(session, operation, zone_id, result)
            .await
    }

    /// Refresh after a successful single mutation and settle the state
    ///
    /// A failed refresh is logged; the mutation itself still succeeded.
    async fn complete_single<T>(
        &self,
        session: &mut Session,
        operation: Operation,
        zone_id: &str,
        result: Result<T>,
    ) -> Result<T> {
        if result.is_ok()
            && let Err(e) = self.refresh(session, zone_id).await
        {
            warn!("Refresh after {} failed: {}", operation, e);
        }
        self.finish(session, operation, &result);
        result
    }

    /// Run a planned batch sequentially, then refresh once and clear the
    /// selection once
    async fn run_bulk(
        &self,
        session: &mut Session,
        operation: Operation,
        zone_id: &str,
        steps: Vec<(String, Result<PlannedCall>)>,
    ) -> BulkResult {
        self.begin(session, operation);
        info!("{}: {} item(s) in zone {}", operation, steps.len(), zone_id);

        let mut result = BulkResult::default();
        for (id, planned) in steps {
            let outcome = match planned {
                Ok(call) => self
                    .call(session, call.method, call.endpoint, call.body)
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = &outcome {
                warn!("{} failed for {}: {}", operation, id, e);
                self.emit_event(SyncEventKind::BulkItemFailed {
                    operation,
                    id: id.clone(),
                    reason: e.reason(),
                });
            }
            result.absorb(id, outcome);
        }

        if let Err(e) = self.refresh(session, zone_id).await {
            warn!("Refresh after {} failed: {}", operation, e);
            result.refresh_error = Some(e.reason());
        }
        session.store_mut().clear_selection();

        info!(
            "{} finished: {} attempted, {} succeeded, {} failed",
            operation,
            result.attempted,
            result.succeeded,
            result.failed()
        );
        self.emit_event(SyncEventKind::BulkCompleted {
            operation,
            attempted: result.attempted,
            succeeded: result.succeeded,
            failed: result.failed(),
        });

        if result.is_success() {
            self.applied(session, operation);
        } else {
            let reason = format!(
                "{} of {} item(s) failed",
                result.failed(),
                result.attempted
            );
            self.failed(session, operation, reason);
        }
        result
    }

    /// Replace the store with every record of `zone_id`
    async fn refresh(&self, session: &mut Session, zone_id: &str) -> Result<usize> {
        let items = self
            .fetch_pages(session, &records_endpoint(zone_id), self.per_page)
            .await?;

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match parse_record(item) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping record in zone {}: {}", zone_id, e.reason()),
            }
        }

        let count = records.len();
        session.store_mut().set_records(zone_id, records);
        debug!("Zone {} refreshed: {} record(s)", zone_id, count);
        self.emit_event(SyncEventKind::RecordsRefreshed {
            zone_id: zone_id.to_string(),
            count,
        });
        Ok(count)
    }

    async fn fetch_directory<T: serde::de::DeserializeOwned>(
        &self,
        session: &Session,
        endpoint: &str,
    ) -> Result<Vec<T>> {
        self.fetch_pages(session, endpoint, DIRECTORY_PAGE_SIZE)
            .await?
            .into_iter()
            .map(|item| {
                serde_json::from_value(item).map_err(|e| {
                    Error::remote(format!("malformed {} payload: {}", endpoint, e))
                })
            })
            .collect()
    }

    /// Follow `result_info.total_pages` until every page is fetched
    async fn fetch_pages(
        &self,
        session: &Session,
        endpoint: &str,
        per_page: u32,
    ) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let response = self
                .send(
                    session,
                    Method::Get,
                    format!("{}?page={}&per_page={}", endpoint, page, per_page),
                    None,
                )
                .await?;
            let total_pages = response.result_info.map_or(1, |info| info.total_pages);

            let batch = match response.into_result()? {
                Value::Array(batch) => batch,
                Value::Null => Vec::new(),
                other => {
                    return Err(Error::remote(format!(
                        "expected a list from {}, got {}",
                        endpoint,
                        json_kind(&other)
                    )));
                }
            };
            let exhausted = batch.is_empty();
            items.extend(batch);

            if exhausted || page >= total_pages {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    /// One round trip, unwrapped to its `result`
    async fn call(
        &self,
        session: &Session,
        method: Method,
        endpoint: String,
        body: Option<Value>,
    ) -> Result<Value> {
        self.send(session, method, endpoint, body)
            .await?
            .into_result()
    }

    /// One round trip; every gateway error surfaces as `RemoteCallFailed`
    async fn send(
        &self,
        session: &Session,
        method: Method,
        endpoint: String,
        body: Option<Value>,
    ) -> Result<GatewayResponse> {
        debug!("{} {} via {}", method, endpoint, self.gateway.gateway_name());

        let mut request = GatewayRequest::new(method, endpoint, session.credentials().clone());
        if let Some(body) = body {
            request = request.with_body(body);
        }

        self.gateway.call(request).await.map_err(|e| match e {
            Error::RemoteCallFailed { .. } => e,
            other => Error::remote(other.reason()),
        })
    }

    fn begin(&self, session: &mut Session, operation: Operation) {
        debug!("Starting {}", operation);
        session.set_state(OperationState::InFlight {
            operation,
            since: Utc::now(),
        });
        self.emit_event(SyncEventKind::Started { operation });
    }

    fn finish<T>(&self, session: &mut Session, operation: Operation, result: &Result<T>) {
        match result {
            Ok(_) => self.applied(session, operation),
            Err(e) => {
                warn!("{} failed: {}", operation, e);
                self.failed(session, operation, e.reason());
            }
        }
    }

    fn applied(&self, session: &mut Session, operation: Operation) {
        session.set_state(OperationState::Applied { operation });
        self.emit_event(SyncEventKind::Applied { operation });
    }

    fn failed(&self, session: &mut Session, operation: Operation, reason: String) {
        session.set_state(OperationState::Failed {
            operation,
            reason: reason.clone(),
        });
        self.emit_event(SyncEventKind::Failed { operation, reason });
    }

    /// Emit a log-trail event
    fn emit_event(&self, kind: SyncEventKind) {
        // Never block an operation on a slow consumer
        if self.event_tx.try_send(SyncEvent::now(kind)).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

fn records_endpoint(zone_id: &str) -> String {
    format!("zones/{}/dns_records", zone_id)
}

fn record_endpoint(zone_id: &str, id: &str) -> String {
    format!("zones/{}/dns_records/{}", zone_id, id)
}

fn ssl_endpoint(zone_id: &str) -> String {
    format!("zones/{}/settings/ssl", zone_id)
}

fn require(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{} is required", what)));
    }
    Ok(())
}

/// First-occurrence order, duplicates dropped
fn dedup(ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect()
}

fn parse_record(value: Value) -> Result<DnsRecord> {
    let wire: WireRecord = serde_json::from_value(value)
        .map_err(|e| Error::remote(format!("malformed record payload: {}", e)))?;
    DnsRecord::try_from(wire)
        .map_err(|e| Error::remote(format!("malformed record payload: {}", e.reason())))
}

fn parse_ssl_mode(value: Value) -> Result<SslMode> {
    value
        .get("value")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::remote("SSL setting payload has no value"))?
        .parse()
        .map_err(|e: Error| Error::remote(e.reason()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
