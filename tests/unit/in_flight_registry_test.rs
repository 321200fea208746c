//! Unit tests for the in-flight registry: joining, completion and teardown.

use gitbrowser_core::services::in_flight::InFlightRegistry;
use gitbrowser_core::types::command::{SearchCommand, SearchKey};
use tokio::sync::oneshot;

type Registry = InFlightRegistry<SearchCommand, u32>;

fn suggest(query: &str) -> SearchCommand {
    SearchCommand::FetchSuggestions {
        query: query.to_string(),
    }
}

fn key(query: &str) -> SearchKey {
    SearchKey::Suggestions(query.to_string())
}

#[test]
fn test_join_without_record_hands_sink_back() {
    let mut registry = Registry::new();
    let (tx, _rx) = oneshot::channel();
    assert!(registry.join(&key("abc"), suggest("abc"), tx).is_err());
    assert!(registry.is_empty());
}

#[test]
fn test_join_attaches_to_open_record() {
    let mut registry = Registry::new();
    let (tx1, _rx1) = oneshot::channel();
    let (tx2, _rx2) = oneshot::channel();

    let id = registry.open(suggest("abc"), tx1);
    let joined = registry.join(&key("abc"), suggest("abc"), tx2).ok();

    assert_eq!(joined, Some(id));
    assert!(registry.is_in_flight(&key("abc")));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_complete_resolves_every_waiter() {
    let mut registry = Registry::new();
    let (tx1, mut rx1) = oneshot::channel();
    let (tx2, mut rx2) = oneshot::channel();
    let (tx3, mut rx3) = oneshot::channel();

    let id = registry.open(suggest("abc"), tx1);
    registry.join(&key("abc"), suggest("abc"), tx2).ok().unwrap();
    registry.join(&key("abc"), suggest("abc"), tx3).ok().unwrap();

    let record = registry.complete(id).unwrap();
    assert_eq!(record.waiters(), 3);
    assert_eq!(record.resolve(7), 3);

    assert_eq!(rx1.try_recv().unwrap(), 7);
    assert_eq!(rx2.try_recv().unwrap(), 7);
    assert_eq!(rx3.try_recv().unwrap(), 7);
}

#[test]
fn test_complete_frees_the_key() {
    let mut registry = Registry::new();
    let (tx, _rx) = oneshot::channel();
    let id = registry.open(suggest("abc"), tx);

    assert!(registry.complete(id).is_some());
    assert!(!registry.is_in_flight(&key("abc")));
    assert!(registry.complete(id).is_none(), "a record completes once");

    let (late, _late_rx) = oneshot::channel();
    assert!(registry.join(&key("abc"), suggest("abc"), late).is_err());
}

#[test]
fn test_distinct_keys_get_distinct_records() {
    let mut registry = Registry::new();
    let (tx1, _rx1) = oneshot::channel();
    let (tx2, _rx2) = oneshot::channel();

    let a = registry.open(suggest("abc"), tx1);
    let b = registry.open(suggest("xyz"), tx2);

    assert_ne!(a, b);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_resolve_skips_dropped_callers() {
    let mut registry = Registry::new();
    let (tx1, rx1) = oneshot::channel();
    let (tx2, mut rx2) = oneshot::channel();

    let id = registry.open(suggest("abc"), tx1);
    registry.join(&key("abc"), suggest("abc"), tx2).ok().unwrap();
    drop(rx1);

    assert_eq!(registry.complete(id).unwrap().resolve(1), 1);
    assert_eq!(rx2.try_recv().unwrap(), 1);
}

#[test]
fn test_drain_empties_registry() {
    let mut registry = Registry::new();
    let (tx1, _rx1) = oneshot::channel();
    let (tx2, _rx2) = oneshot::channel();
    registry.open(suggest("abc"), tx1);
    registry.open(suggest("xyz"), tx2);

    let drained = registry.drain();
    assert_eq!(drained.len(), 2);
    assert!(registry.is_empty());
    assert!(!registry.is_in_flight(&key("abc")));
}

#[test]
fn test_record_remembers_opening_command() {
    let mut registry = Registry::new();
    let (tx, _rx) = oneshot::channel();
    let id = registry.open(suggest("  ABC "), tx);
    assert!(registry.is_in_flight(&key("abc")));

    let record = registry.complete(id).unwrap();
    assert!(matches!(
        record.command(),
        SearchCommand::FetchSuggestions { query } if query == "  ABC "
    ));
}

#[test]
fn test_resolve_with_shapes_per_caller_command() {
    let mut registry = Registry::new();
    let (tx1, mut rx1) = oneshot::channel();
    let (tx2, mut rx2) = oneshot::channel();
    let (tx3, mut rx3) = oneshot::channel();

    let id = registry.open(suggest("abc"), tx1);
    registry.join(&key("abc"), suggest(" ABC"), tx2).ok().unwrap();
    registry.join(&key("abc"), suggest("abc   "), tx3).ok().unwrap();

    let record = registry.complete(id).unwrap();
    let delivered = record.resolve_with(100, |command, shared| match command {
        SearchCommand::FetchSuggestions { query } => shared + query.len() as u32,
        SearchCommand::ResolveDomain { .. } => *shared,
    });

    assert_eq!(delivered, 3);
    assert_eq!(rx1.try_recv().unwrap(), 103);
    assert_eq!(rx2.try_recv().unwrap(), 104);
    assert_eq!(rx3.try_recv().unwrap(), 106);
}
