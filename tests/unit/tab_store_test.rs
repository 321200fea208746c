//! Unit tests for the SQLite and in-memory tab stores.

use gitbrowser_core::managers::tab_store::{MemoryTabStore, SqliteTabStore, TabStore};
use gitbrowser_core::types::errors::StoreError;
use gitbrowser_core::types::tab::{Tab, TabContent, TabId};
use tempfile::TempDir;
use url::Url;

fn site(url: &str, title: &str) -> Tab {
    Tab::site(Url::parse(url).unwrap(), title)
}

fn ids(tabs: &[Tab]) -> Vec<TabId> {
    tabs.iter().map(|t| t.id().clone()).collect()
}

// === SQLite ===

#[test]
fn test_sqlite_empty_store_loads_nothing() {
    let mut store = SqliteTabStore::open_in_memory().unwrap();
    assert!(store.load_all().unwrap().is_empty());
}

#[test]
fn test_sqlite_insert_keeps_insertion_order() {
    let mut store = SqliteTabStore::open_in_memory().unwrap();
    let a = site("https://a.example", "A");
    let b = Tab::blank();
    let c = Tab::new(TabContent::TopSites);
    for tab in [&a, &b, &c] {
        store.insert(tab).unwrap();
    }

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded, vec![a, b, c]);
}

#[test]
fn test_sqlite_insert_same_id_replaces_content_in_place() {
    let mut store = SqliteTabStore::open_in_memory().unwrap();
    let a = site("https://a.example", "A");
    let b = site("https://b.example", "B");
    store.insert(&a).unwrap();
    store.insert(&b).unwrap();

    let replaced = a
        .with_content(TabContent::site(Url::parse("https://c.example").unwrap(), "C"))
        .with_preview(vec![1, 2, 3]);
    store.insert(&replaced).unwrap();

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0], replaced);
    assert_eq!(loaded[0].preview(), Some(&[1u8, 2, 3][..]));
    assert_eq!(loaded[1], b);
}

#[test]
fn test_sqlite_remove_and_reorder() {
    let mut store = SqliteTabStore::open_in_memory().unwrap();
    let tabs: Vec<Tab> = (0..4).map(|_| Tab::blank()).collect();
    for tab in &tabs {
        store.insert(tab).unwrap();
    }

    store.remove(&tabs[1]).unwrap();
    let order = vec![
        tabs[3].id().clone(),
        tabs[0].id().clone(),
        tabs[2].id().clone(),
    ];
    store.reorder(&order).unwrap();

    assert_eq!(ids(&store.load_all().unwrap()), order);
}

#[test]
fn test_sqlite_remove_missing_tab_is_ok() {
    let mut store = SqliteTabStore::open_in_memory().unwrap();
    assert!(store.remove(&Tab::blank()).is_ok());
}

#[test]
fn test_sqlite_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabs.db");
    let a = site("https://github.com", "GitHub");
    let b = Tab::blank();

    {
        let mut store = SqliteTabStore::open(&path).unwrap();
        store.insert(&a).unwrap();
        store.insert(&b).unwrap();
        store
            .reorder(&[b.id().clone(), a.id().clone()])
            .unwrap();
    }

    let mut reopened = SqliteTabStore::open(&path).unwrap();
    assert_eq!(reopened.load_all().unwrap(), vec![b, a]);
}

#[test]
fn test_sqlite_corrupt_content_is_serialization_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tabs.db");
    {
        let db = gitbrowser_core::database::Database::open(&path).unwrap();
        db.connection()
            .execute(
                "INSERT INTO tabs (id, position, content, created_at) VALUES ('x', 0, 'not json', 0)",
                [],
            )
            .unwrap();
    }

    let mut store = SqliteTabStore::open(&path).unwrap();
    assert!(matches!(
        store.load_all(),
        Err(StoreError::Serialization(_))
    ));
}

// === In-memory ===

#[test]
fn test_memory_store_tracks_writes_through_probe() {
    let mut store = MemoryTabStore::new();
    let probe = store.probe();
    let a = Tab::blank();
    let b = Tab::blank();

    store.insert(&a).unwrap();
    store.insert(&b).unwrap();
    store.reorder(&[b.id().clone(), a.id().clone()]).unwrap();
    store.remove(&b).unwrap();

    assert_eq!(probe.tabs(), vec![a]);
    assert_eq!(probe.writes(), 4);
}

#[test]
fn test_memory_store_failing_writes() {
    let mut store = MemoryTabStore::new();
    let probe = store.probe();
    probe.set_fail_writes(true);

    assert!(matches!(
        store.insert(&Tab::blank()),
        Err(StoreError::Unavailable(_))
    ));
    assert!(probe.tabs().is_empty());
    assert_eq!(probe.writes(), 0);
}

#[test]
fn test_memory_store_failing_load() {
    let mut store = MemoryTabStore::with_tabs(vec![Tab::blank()]).failing_load();
    assert!(store.load_all().is_err());
}
