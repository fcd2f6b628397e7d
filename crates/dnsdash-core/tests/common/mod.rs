//! Test doubles and common utilities for contract tests
//!
//! [`MockGateway`] is an in-memory stand-in for the remote record API. It
//! keeps zones and records, answers the endpoints the engine uses, and lets
//! tests inject per-record failures or a total outage.

#![allow(dead_code)]

use dnsdash_core::error::{Error, Result};
use dnsdash_core::records::{DnsRecord, RecordData, RecordType};
use dnsdash_core::traits::{
    Credentials, GatewayRequest, GatewayResponse, Method, PageInfo, RemoteGateway,
};
use dnsdash_core::{Session, SyncConfig, SyncEngine, SyncEvent};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Default)]
struct MockState {
    /// zone id -> (zone name, records in wire form)
    zones: Vec<(String, String, Vec<Value>)>,
    ssl: HashMap<String, String>,
    /// record id -> failure message for mutations
    failing_ids: HashMap<String, String>,
    outage: bool,
    next_id: usize,
    requests: Vec<(Method, String)>,
}

impl MockState {
    fn zone_mut(&mut self, zone_id: &str) -> Option<&mut Vec<Value>> {
        self.zones
            .iter_mut()
            .find(|(id, _, _)| id == zone_id)
            .map(|(_, _, records)| records)
    }
}

/// In-memory remote record API
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
    call_count: Arc<AtomicUsize>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a zone holding `records`
    pub fn with_zone(self, zone_id: &str, name: &str, records: Vec<DnsRecord>) -> Self {
        let wire = records.iter().map(to_wire).collect();
        {
            let mut state = self.state.lock().unwrap();
            state
                .zones
                .push((zone_id.to_string(), name.to_string(), wire));
            state.ssl.insert(zone_id.to_string(), "full".to_string());
        }
        self
    }

    /// Make every mutation of `id` fail with `message`
    pub fn fail_id(&self, id: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_ids
            .insert(id.to_string(), message.to_string());
    }

    /// Make every call fail at the transport level
    pub fn set_outage(&self, outage: bool) {
        self.state.lock().unwrap().outage = outage;
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every `(method, endpoint)` received, in order
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Number of record listings (page fetches) received
    pub fn list_call_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|(method, endpoint)| *method == Method::Get && endpoint.contains("dns_records?"))
            .count()
    }

    /// Ids currently held remotely for `zone_id`
    pub fn remote_ids(&self, zone_id: &str) -> Vec<String> {
        let mut state = self.state.lock().unwrap();
        state
            .zone_mut(zone_id)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| r["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remote proxied flag of one record
    pub fn remote_proxied(&self, zone_id: &str, id: &str) -> Option<bool> {
        let mut state = self.state.lock().unwrap();
        state
            .zone_mut(zone_id)?
            .iter()
            .find(|r| r["id"] == id)
            .and_then(|r| r["proxied"].as_bool())
    }

    fn handle(&self, request: &GatewayRequest) -> GatewayResponse {
        let mut state = self.state.lock().unwrap();
        let (path, query) = request
            .endpoint
            .split_once('?')
            .unwrap_or((request.endpoint.as_str(), ""));
        let segments: Vec<&str> = path.split('/').collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["zones"]) => {
                let zones: Vec<Value> = state
                    .zones
                    .iter()
                    .map(|(id, name, _)| json!({"id": id, "name": name, "status": "active"}))
                    .collect();
                paginate(zones, query)
            }
            (Method::Get, ["accounts"]) => {
                paginate(vec![json!({"id": "acc1", "name": "Ops"})], query)
            }
            (Method::Get, ["zones", zone, "dns_records"]) => match state.zone_mut(zone) {
                Some(records) => paginate(records.clone(), query),
                None => GatewayResponse::failure(404, "Zone not found"),
            },
            (Method::Post, ["zones", zone, "dns_records"]) => {
                state.next_id += 1;
                let id = format!("new{}", state.next_id);
                let Some(mut body) = request.body.clone() else {
                    return GatewayResponse::failure(400, "Missing body");
                };
                body["id"] = json!(id);
                if body.get("proxied").is_none() {
                    body["proxied"] = json!(false);
                }
                match state.zone_mut(zone) {
                    Some(records) => {
                        records.push(body.clone());
                        GatewayResponse::ok(body)
                    }
                    None => GatewayResponse::failure(404, "Zone not found"),
                }
            }
            (Method::Patch, ["zones", zone, "dns_records", id]) => {
                if let Some(message) = state.failing_ids.get(*id) {
                    return GatewayResponse::failure(400, message.clone());
                }
                let Some(record) = state
                    .zone_mut(zone)
                    .and_then(|records| records.iter_mut().find(|r| r["id"] == *id))
                else {
                    return GatewayResponse::failure(404, "Record not found");
                };
                if let Some(Value::Object(patch)) = &request.body {
                    for (key, value) in patch {
                        record[key.as_str()] = value.clone();
                    }
                }
                GatewayResponse::ok(record.clone())
            }
            (Method::Delete, ["zones", zone, "dns_records", id]) => {
                if let Some(message) = state.failing_ids.get(*id) {
                    return GatewayResponse::failure(400, message.clone());
                }
                let Some(records) = state.zone_mut(zone) else {
                    return GatewayResponse::failure(404, "Zone not found");
                };
                let before = records.len();
                records.retain(|r| r["id"] != *id);
                if records.len() == before {
                    return GatewayResponse::failure(404, "Record not found");
                }
                GatewayResponse::ok(json!({ "id": id }))
            }
            (Method::Get, ["zones", zone, "settings", "ssl"]) => match state.ssl.get(*zone) {
                Some(mode) => GatewayResponse::ok(json!({"id": "ssl", "value": mode})),
                None => GatewayResponse::failure(404, "Zone not found"),
            },
            (Method::Patch, ["zones", zone, "settings", "ssl"]) => {
                let mode = request
                    .body
                    .as_ref()
                    .and_then(|b| b["value"].as_str())
                    .unwrap_or_default()
                    .to_string();
                state.ssl.insert(zone.to_string(), mode.clone());
                GatewayResponse::ok(json!({"id": "ssl", "value": mode}))
            }
            _ => GatewayResponse::failure(404, "No route"),
        }
    }
}

#[async_trait::async_trait]
impl RemoteGateway for MockGateway {
    async fn call(&self, request: GatewayRequest) -> Result<GatewayResponse> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.state.lock().unwrap();
            state
                .requests
                .push((request.method, request.endpoint.clone()));
            if state.outage {
                return Err(Error::remote("connection refused"));
            }
        }
        Ok(self.handle(&request))
    }

    fn gateway_name(&self) -> &'static str {
        "mock"
    }
}

fn paginate(items: Vec<Value>, query: &str) -> GatewayResponse {
    let params: HashMap<&str, u32> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter_map(|(k, v)| v.parse().ok().map(|v| (k, v)))
        .collect();
    let page = params.get("page").copied().unwrap_or(1).max(1);
    let per_page = params.get("per_page").copied().unwrap_or(100).max(1);

    let total = items.len() as u32;
    let total_pages = total.div_ceil(per_page).max(1);
    let batch: Vec<Value> = items
        .into_iter()
        .skip(((page - 1) * per_page) as usize)
        .take(per_page as usize)
        .collect();

    GatewayResponse::ok(Value::Array(batch.clone())).with_page_info(PageInfo {
        page,
        per_page,
        count: batch.len() as u32,
        total_count: total,
        total_pages,
    })
}

fn to_wire(record: &DnsRecord) -> Value {
    let mut wire = json!({
        "id": record.id,
        "type": record.record_type().as_str(),
        "name": record.name,
        "content": record.data.wire_content(),
        "proxied": record.proxied,
        "ttl": record.ttl,
    });
    if let Some(priority) = record.data.wire_priority() {
        wire["priority"] = json!(priority);
    }
    if let Some(data) = record.data.wire_data() {
        wire["data"] = data;
    }
    wire
}

/// Build a record from presentation-form content
pub fn record(id: &str, name: &str, record_type: RecordType, content: &str) -> DnsRecord {
    DnsRecord {
        id: id.to_string(),
        name: name.to_string(),
        data: RecordData::parse(record_type, content).unwrap(),
        proxied: false,
        ttl: 1,
    }
}

/// Five records: three proxyable, two not
pub fn sample_records() -> Vec<DnsRecord> {
    vec![
        record("1", "www.example.com", RecordType::A, "192.0.2.1"),
        record("2", "v6.example.com", RecordType::Aaaa, "2001:db8::2"),
        record("3", "api.example.com", RecordType::A, "192.0.2.3"),
        record("4", "example.com", RecordType::Mx, "10 mail.example.com"),
        record("5", "example.com", RecordType::Txt, "v=spf1 -all"),
    ]
}

/// Engine over `gateway` with a small page size so pagination is exercised
pub fn engine_for(gateway: &MockGateway) -> (SyncEngine, mpsc::Receiver<SyncEvent>) {
    let config = SyncConfig {
        per_page: 2,
        ..SyncConfig::default()
    };
    SyncEngine::new(Box::new(gateway.clone()), &config).expect("engine construction succeeds")
}

pub fn session() -> Session {
    Session::new(Credentials::token("test-token")).expect("session starts")
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

pub fn store_ids(session: &Session) -> HashSet<String> {
    session
        .store()
        .records()
        .iter()
        .map(|r| r.id.clone())
        .collect()
}

/// Drain every pending log-trail event
pub fn drain(events: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
