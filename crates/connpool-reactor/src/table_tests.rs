use super::*;
use crate::watcher::{PeriodicWatcher, Watcher};
use std::sync::Arc;
use std::time::Duration;

fn dummy_periodic() -> Watcher {
    Watcher::Periodic(PeriodicWatcher {
        interval: Duration::from_secs(1),
        on_tick: Arc::new(|_| crate::status::Status::Ok),
    })
}

#[test]
fn insert_get_remove_round_trip() {
    let mut table = WatcherTable::new();
    let id = table.insert(dummy_periodic());
    assert_eq!(table.len(), 1);
    assert!(table.get(id).is_some());
    assert!(table.remove(id).is_some());
    assert_eq!(table.len(), 0);
    assert!(table.get(id).is_none());
}

#[test]
fn freed_slot_is_reused_without_growing() {
    let mut table = WatcherTable::new();
    let id1 = table.insert(dummy_periodic());
    table.remove(id1);
    let id2 = table.insert(dummy_periodic());
    assert_eq!(id1, id2);
    assert_eq!(table.len(), 1);
}

#[test]
fn iter_visits_only_live_entries() {
    let mut table = WatcherTable::new();
    let id1 = table.insert(dummy_periodic());
    let _id2 = table.insert(dummy_periodic());
    table.remove(id1);
    assert_eq!(table.iter().count(), 1);
}
