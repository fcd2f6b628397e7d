// # Record Store
//
// In-memory copy of one zone's DNS records plus the selection used for bulk
// operations.
//
// ## Ownership
//
// The store is replaced wholesale after every mutating call (see
// `SyncEngine`); it is never patched locally. The selection only ever holds
// ids present in the current snapshot.

use std::collections::HashSet;

use super::model::{DnsRecord, RecordType};

/// Text/type filter over the record table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
    /// Substring matched against name, content and type
    pub text: Option<String>,
    /// Exact type restriction
    pub record_type: Option<RecordType>,
    pub case_insensitive: bool,
}

impl RecordQuery {
    /// Case-insensitive substring search
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            record_type: None,
            case_insensitive: true,
        }
    }

    pub fn with_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    /// Whether `record` passes this filter
    pub fn matches(&self, record: &DnsRecord) -> bool {
        if let Some(record_type) = &self.record_type
            && record.record_type() != *record_type
        {
            return false;
        }

        let Some(needle) = self.text.as_deref().filter(|t| !t.is_empty()) else {
            return true;
        };

        let haystacks = [
            record.name.clone(),
            record.content(),
            record.record_type().as_str().to_string(),
        ];
        if self.case_insensitive {
            let needle = needle.to_lowercase();
            haystacks.iter().any(|h| h.to_lowercase().contains(&needle))
        } else {
            haystacks.iter().any(|h| h.contains(needle))
        }
    }
}

/// Record ids marked for a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: HashSet<String>,
}

impl SelectionSet {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.ids.retain(|id| keep(id));
    }
}

/// Local snapshot of a zone's records
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    zone_id: Option<String>,
    records: Vec<DnsRecord>,
    selection: SelectionSet,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zone the snapshot belongs to
    pub fn zone_id(&self) -> Option<&str> {
        self.zone_id.as_deref()
    }

    /// Records in fetch order
    pub fn records(&self) -> &[DnsRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DnsRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Replace the snapshot wholesale
    ///
    /// Switching zones clears the selection; otherwise selected ids missing
    /// from the new snapshot are dropped.
    pub fn set_records(&mut self, zone_id: &str, records: Vec<DnsRecord>) {
        if self.zone_id.as_deref() != Some(zone_id) {
            self.selection.clear();
            self.zone_id = Some(zone_id.to_string());
        }
        self.records = records;

        let present: HashSet<&str> = self.records.iter().map(|r| r.id.as_str()).collect();
        self.selection.retain(|id| present.contains(id));
    }

    /// Forget the snapshot and the selection
    pub fn reset(&mut self) {
        self.zone_id = None;
        self.records.clear();
        self.selection.clear();
    }

    /// Records passing `query`, in fetch order
    pub fn filter(&self, query: &RecordQuery) -> Vec<&DnsRecord> {
        self.records.iter().filter(|r| query.matches(r)).collect()
    }

    /// Ids of the records passing `query`, in fetch order
    pub fn visible_ids(&self, query: &RecordQuery) -> Vec<String> {
        self.filter(query).into_iter().map(|r| r.id.clone()).collect()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Selected ids in fetch order
    pub fn selected_ids(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| self.selection.contains(&r.id))
            .map(|r| r.id.clone())
            .collect()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Mark `id`; ids absent from the snapshot are ignored
    pub fn select(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.selection.insert(id)
    }

    pub fn deselect(&mut self, id: &str) -> bool {
        self.selection.remove(id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Flip "select all" for the visible rows
    ///
    /// Visible ids not in the snapshot are ignored. When every remaining id
    /// is already selected (or none remain) the selection is cleared;
    /// otherwise it becomes exactly those ids.
    pub fn toggle_all(&mut self, visible_ids: &[String]) {
        let known: Vec<&String> = visible_ids.iter().filter(|id| self.contains(id)).collect();
        let all_selected = known.iter().all(|id| self.selection.contains(id));
        self.selection.clear();
        if all_selected {
            return;
        }
        for id in known {
            self.selection.insert(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::model::RecordData;

    fn record(id: &str, name: &str, record_type: RecordType, content: &str) -> DnsRecord {
        DnsRecord {
            id: id.to_string(),
            name: name.to_string(),
            data: RecordData::parse(record_type, content).unwrap(),
            proxied: false,
            ttl: 1,
        }
    }

    fn sample_store() -> RecordStore {
        let mut store = RecordStore::new();
        store.set_records(
            "zone1",
            vec![
                record("1", "www.example.com", RecordType::A, "192.0.2.1"),
                record("2", "api.example.com", RecordType::Aaaa, "2001:db8::2"),
                record("3", "example.com", RecordType::Mx, "10 mail.example.com"),
                record("4", "example.com", RecordType::Txt, "v=spf1 -all"),
                record("5", "WWW2.example.com", RecordType::Cname, "www.example.com"),
            ],
        );
        store
    }

    fn ids(records: &[&DnsRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_filter_preserves_order() {
        let store = sample_store();
        let hits = store.filter(&RecordQuery::search("www"));
        assert_eq!(ids(&hits), vec!["1", "5"]);

        let all = store.filter(&RecordQuery::default());
        assert_eq!(ids(&all), vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_filter_matches_content_and_type() {
        let store = sample_store();
        assert_eq!(ids(&store.filter(&RecordQuery::search("mail"))), vec!["3"]);
        assert_eq!(ids(&store.filter(&RecordQuery::search("aaaa"))), vec!["2"]);
        assert_eq!(
            ids(&store.filter(&RecordQuery::search("example").with_type(RecordType::Txt))),
            vec!["4"]
        );
    }

    #[test]
    fn test_filter_case_sensitivity() {
        let store = sample_store();
        assert_eq!(
            ids(&store.filter(&RecordQuery::search("WWW2").case_sensitive())),
            vec!["5"]
        );
        assert!(store
            .filter(&RecordQuery::search("www2").case_sensitive())
            .is_empty());
    }

    #[test]
    fn test_select_unknown_id_is_ignored() {
        let mut store = sample_store();
        assert!(store.select("1"));
        assert!(!store.select("1"));
        assert!(!store.select("missing"));
        assert_eq!(store.selected_ids(), vec!["1"]);
        assert!(store.deselect("1"));
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_toggle_all_twice() {
        let mut store = sample_store();
        let visible = store.visible_ids(&RecordQuery::search("example.com").with_type(RecordType::A));
        assert_eq!(visible, vec!["1"]);

        let visible = store.visible_ids(&RecordQuery::search("www"));
        store.select("2");

        store.toggle_all(&visible);
        assert_eq!(store.selected_ids(), vec!["1", "5"]);

        store.toggle_all(&visible);
        assert!(store.selection().is_empty());

        store.toggle_all(&visible);
        assert_eq!(store.selected_ids(), vec!["1", "5"]);
    }

    #[test]
    fn test_toggle_all_ignores_stale_visible_ids() {
        let mut store = sample_store();
        let visible = vec!["1".to_string(), "gone".to_string()];

        store.toggle_all(&visible);
        assert_eq!(store.selected_ids(), vec!["1"]);

        store.toggle_all(&visible);
        assert!(store.selection().is_empty());

        // Nothing visible is still in the snapshot
        store.select("4");
        store.toggle_all(&["gone".to_string()]);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_toggle_all_empty_view_clears() {
        let mut store = sample_store();
        store.select("3");
        store.toggle_all(&[]);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_set_records_prunes_selection() {
        let mut store = sample_store();
        store.select("1");
        store.select("2");

        let kept = store.records()[1..].to_vec();
        store.set_records("zone1", kept);
        assert_eq!(store.selected_ids(), vec!["2"]);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_zone_change_clears_selection() {
        let mut store = sample_store();
        store.select("1");

        let same_ids = store.records().to_vec();
        store.set_records("zone2", same_ids);
        assert_eq!(store.zone_id(), Some("zone2"));
        assert!(store.selection().is_empty());
    }
}
