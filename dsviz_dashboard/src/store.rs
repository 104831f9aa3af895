use crate::config::{HISTORY_CAP, LOG_DISPLAY_LIMIT};
use crate::render::value_text;
use chrono::{DateTime, Local, Utc};
use dsviz_protocol::{OperationRecord, StructureKind, StructurePayload, StructureSnapshot};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::sync::watch;

/// One row of the structure list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureSummary {
    pub id: String,
    pub kind: StructureKind,
    pub type_label: String,
    pub size_text: String,
}

/// One row of the operation log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub op_type: String,
    pub target: String,
    pub timestamp: DateTime<Utc>,
    pub params_text: Option<String>,
}

impl LogEntry {
    fn from_record(op: &OperationRecord) -> Self {
        let params_text = (!op.parameters.is_empty()).then(|| {
            op.parameters
                .iter()
                .map(|(k, v)| format!("{k}: {}", value_text(v)))
                .collect::<Vec<_>>()
                .join(", ")
        });
        Self {
            op_type: op.op_type.clone(),
            target: op.data_structure.clone(),
            timestamp: op.timestamp,
            params_text,
        }
    }

    pub fn time_text(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%H:%M:%S")
            .to_string()
    }

    pub fn is_recent(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match (now - self.timestamp).to_std() {
            Ok(age) => age < window,
            // Timestamps from a clock ahead of ours count as fresh.
            Err(_) => true,
        }
    }
}

/// Size text for the structure list. Never fails on missing fields.
pub fn size_summary(snapshot: &StructureSnapshot) -> String {
    match snapshot.payload() {
        StructurePayload::List(list) => format!("Length: {}", list.length),
        StructurePayload::Stack(stack) => format!("Size: {}", stack.size),
        StructurePayload::Queue(queue) => format!("Size: {}", queue.size),
        StructurePayload::BinaryTree(tree) => {
            format!("Size: {}, Height: {}", tree.size, tree.height)
        }
        StructurePayload::Unknown => "Unknown".to_string(),
    }
}

/// Client-side mirror of the server: latest snapshot per id plus a bounded,
/// newest-first operation history. The structure list and the log are derived
/// from these after every mutation and published on watch channels.
pub struct StateStore {
    mirror: BTreeMap<String, StructureSnapshot>,
    history: VecDeque<OperationRecord>,
    history_cap: usize,
    log_limit: usize,
    structures_tx: watch::Sender<Vec<StructureSummary>>,
    log_tx: watch::Sender<Vec<LogEntry>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::with_limits(HISTORY_CAP, LOG_DISPLAY_LIMIT)
    }

    pub fn with_limits(history_cap: usize, log_limit: usize) -> Self {
        let (structures_tx, _) = watch::channel(Vec::new());
        let (log_tx, _) = watch::channel(Vec::new());
        Self {
            mirror: BTreeMap::new(),
            history: VecDeque::with_capacity(history_cap),
            history_cap,
            log_limit,
            structures_tx,
            log_tx,
        }
    }

    /// Full resynchronisation: prior mirror and history are discarded first.
    pub fn reset_with(&mut self, snapshots: BTreeMap<String, StructureSnapshot>) {
        self.mirror = snapshots;
        self.history.clear();
        self.publish();
    }

    /// Always logged; the mirror only moves when the record carries `after`.
    pub fn record_operation(&mut self, op: OperationRecord) {
        if let Some(after) = &op.after {
            self.mirror.insert(op.data_structure.clone(), after.clone());
        }
        self.history.push_front(op);
        while self.history.len() > self.history_cap {
            self.history.pop_back();
        }
        self.publish();
    }

    /// Replaces the entry for `snapshot.id` wholesale. History is untouched.
    pub fn apply_snapshot(&mut self, snapshot: StructureSnapshot) {
        self.mirror.insert(snapshot.id.clone(), snapshot);
        self.publish();
    }

    pub fn clear(&mut self) {
        self.mirror.clear();
        self.history.clear();
        self.publish();
    }

    pub fn snapshot(&self, id: &str) -> Option<&StructureSnapshot> {
        self.mirror.get(id)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &StructureSnapshot> {
        self.mirror.values()
    }

    pub fn len(&self) -> usize {
        self.mirror.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirror.is_empty()
    }

    /// Newest first.
    pub fn history(&self) -> impl Iterator<Item = &OperationRecord> {
        self.history.iter()
    }

    pub fn structure_summaries(&self) -> Vec<StructureSummary> {
        self.mirror
            .iter()
            .map(|(id, snapshot)| StructureSummary {
                id: id.clone(),
                kind: snapshot.kind.clone(),
                type_label: snapshot.kind.label(),
                size_text: size_summary(snapshot),
            })
            .collect()
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.history
            .iter()
            .take(self.log_limit)
            .map(LogEntry::from_record)
            .collect()
    }

    pub fn subscribe_structures(&self) -> watch::Receiver<Vec<StructureSummary>> {
        self.structures_tx.subscribe()
    }

    pub fn subscribe_log(&self) -> watch::Receiver<Vec<LogEntry>> {
        self.log_tx.subscribe()
    }

    fn publish(&self) {
        self.structures_tx.send_replace(self.structure_summaries());
        self.log_tx.send_replace(self.log_entries());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn stack(id: &str, items: &[i64]) -> StructureSnapshot {
        StructureSnapshot::new(
            id,
            StructureKind::Stack,
            json!({"items": items, "size": items.len(), "top": items.last()}),
        )
    }

    fn op(n: i64, target: &str, after: Option<StructureSnapshot>) -> OperationRecord {
        OperationRecord {
            id: Some(format!("op-{n}")),
            op_type: "push".to_string(),
            data_structure: target.to_string(),
            parameters: json!({"value": n}).as_object().cloned().unwrap_or_default(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + n, 0).unwrap(),
            before: None,
            after,
        }
    }

    #[test]
    fn last_operation_with_after_wins() {
        let mut store = StateStore::new();
        store.record_operation(op(1, "s1", Some(stack("s1", &[1]))));
        store.record_operation(op(2, "s1", Some(stack("s1", &[1, 2]))));
        store.record_operation(op(3, "s1", None));
        assert_eq!(store.snapshot("s1"), Some(&stack("s1", &[1, 2])));
        assert_eq!(store.history().count(), 3);
    }

    #[test]
    fn history_is_capped_newest_first() {
        let mut store = StateStore::new();
        for n in 1..=101 {
            store.record_operation(op(n, "s1", None));
        }
        let ids: Vec<_> = store.history().filter_map(|o| o.id.clone()).collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(ids.first().map(String::as_str), Some("op-101"));
        assert_eq!(ids.last().map(String::as_str), Some("op-2"));
        assert!(!ids.iter().any(|id| id == "op-1"));
    }

    #[test]
    fn log_shows_twenty_most_recent() {
        let mut store = StateStore::new();
        for n in 1..=30 {
            store.record_operation(op(n, "s1", None));
        }
        let log = store.log_entries();
        assert_eq!(log.len(), 20);
        assert_eq!(log[0].timestamp.timestamp(), 1_700_000_030);
        assert_eq!(log[0].params_text.as_deref(), Some("value: 30"));
    }

    #[test]
    fn reset_discards_and_is_idempotent() {
        let mut store = StateStore::new();
        store.apply_snapshot(stack("old", &[9]));
        store.record_operation(op(1, "old", None));

        let baseline: BTreeMap<_, _> = [("s1".to_string(), stack("s1", &[1, 2, 3]))].into();
        store.reset_with(baseline.clone());
        let first: Vec<_> = store.snapshots().cloned().collect();
        store.reset_with(baseline);
        let second: Vec<_> = store.snapshots().cloned().collect();

        assert_eq!(first, second);
        assert!(store.snapshot("old").is_none());
        assert_eq!(store.history().count(), 0);
    }

    #[test]
    fn summaries_tolerate_partial_payloads() {
        let mut store = StateStore::new();
        store.apply_snapshot(StructureSnapshot::new("l", StructureKind::List, json!({})));
        store.apply_snapshot(StructureSnapshot::new("q", StructureKind::Queue, json!(null)));
        store.apply_snapshot(StructureSnapshot::new("t", StructureKind::BinaryTree, json!({"size": 4})));
        store.apply_snapshot(StructureSnapshot::new("x", StructureKind::Other("heap".into()), json!({})));

        let rows: Vec<_> = store
            .structure_summaries()
            .into_iter()
            .map(|r| (r.id, r.type_label, r.size_text))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("l".into(), "List".into(), "Length: 0".into()),
                ("q".into(), "Queue".into(), "Size: 0".into()),
                ("t".into(), "Binary Tree".into(), "Size: 4, Height: 0".into()),
                ("x".into(), "Heap".into(), "Unknown".into()),
            ]
        );
    }

    #[test]
    fn every_mutation_refreshes_both_panels() {
        let mut store = StateStore::new();
        let structures = store.subscribe_structures();
        let log = store.subscribe_log();

        store.apply_snapshot(stack("s1", &[1, 2, 3]));
        assert_eq!(structures.borrow()[0].size_text, "Size: 3");
        assert!(log.borrow().is_empty());

        store.record_operation(op(4, "s1", Some(stack("s1", &[1, 2, 3, 4]))));
        assert_eq!(structures.borrow()[0].size_text, "Size: 4");
        assert_eq!(log.borrow()[0].op_type, "push");

        store.clear();
        assert!(structures.borrow().is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn recency_window() {
        let entry = LogEntry::from_record(&op(0, "s1", None));
        let t = entry.timestamp;
        let window = Duration::from_secs(5);
        assert!(entry.is_recent(t + chrono::Duration::seconds(4), window));
        assert!(!entry.is_recent(t + chrono::Duration::seconds(5), window));
        assert!(entry.is_recent(t - chrono::Duration::seconds(1), window));
    }
}
