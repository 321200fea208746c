//! Backing stores for the tab list.
//!
//! A [`TabStore`] is owned by one dedicated thread (see [`StoreWorker`]) that
//! performs the initial load and then applies queued writes in order, so a
//! store is never called concurrently with itself.

use std::io;
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use rusqlite::params;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::database::Database;
use crate::types::errors::StoreError;
use crate::types::tab::{Tab, TabContent, TabId};

/// Durable storage of the tab list.
pub trait TabStore: Send + 'static {
    /// Loads every stored tab in display order.
    fn load_all(&mut self) -> Result<Vec<Tab>, StoreError>;

    /// Stores `tab`, replacing any stored tab with the same id.
    fn insert(&mut self, tab: &Tab) -> Result<(), StoreError>;

    fn remove(&mut self, tab: &Tab) -> Result<(), StoreError>;

    /// Records the display order. Stores that keep insertion order may ignore it.
    fn reorder(&mut self, order: &[TabId]) -> Result<(), StoreError> {
        let _ = order;
        Ok(())
    }
}

// === SQLite ===

/// Tab store backed by the SQLite `tabs` table.
pub struct SqliteTabStore {
    db: Database,
}

impl SqliteTabStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }
}

impl TabStore for SqliteTabStore {
    fn load_all(&mut self) -> Result<Vec<Tab>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, content, preview, created_at FROM tabs ORDER BY position ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<Vec<u8>>>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut tabs = Vec::new();
        for row in rows {
            let (id, content, preview, created_at) = row?;
            let content: TabContent = serde_json::from_str(&content)?;
            tabs.push(Tab::restore(TabId::from(id), content, preview, created_at));
        }
        Ok(tabs)
    }

    fn insert(&mut self, tab: &Tab) -> Result<(), StoreError> {
        let content = serde_json::to_string(tab.content())?;
        self.db.connection().execute(
            "INSERT INTO tabs (id, position, content, preview, created_at)
             VALUES (?1, (SELECT COALESCE(MAX(position), -1) + 1 FROM tabs), ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET content = excluded.content, preview = excluded.preview",
            params![tab.id().as_str(), content, tab.preview(), tab.created_at()],
        )?;
        Ok(())
    }

    fn remove(&mut self, tab: &Tab) -> Result<(), StoreError> {
        self.db
            .connection()
            .execute("DELETE FROM tabs WHERE id = ?1", params![tab.id().as_str()])?;
        Ok(())
    }

    fn reorder(&mut self, order: &[TabId]) -> Result<(), StoreError> {
        let tx = self.db.connection_mut().transaction()?;
        {
            let mut stmt = tx.prepare("UPDATE tabs SET position = ?1 WHERE id = ?2")?;
            for (position, id) in order.iter().enumerate() {
                stmt.execute(params![position as i64, id.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

// === In-memory ===

#[derive(Debug, Default)]
struct MemoryState {
    tabs: Vec<Tab>,
    fail_load: bool,
    fail_writes: bool,
    writes: usize,
}

/// Tab store kept in process memory; used for private sessions and tests.
#[derive(Default)]
pub struct MemoryTabStore {
    state: Arc<Mutex<MemoryState>>,
    gate: Option<std_mpsc::Receiver<()>>,
}

/// Holds back [`MemoryTabStore::load_all`] until opened or dropped.
pub struct LoadGate(std_mpsc::Sender<()>);

impl LoadGate {
    pub fn open(self) {
        let _ = self.0.send(());
    }
}

/// Shared view into a [`MemoryTabStore`] that stays usable after the store
/// has been handed to a tab manager.
#[derive(Clone)]
pub struct MemoryStoreProbe {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTabStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tabs(tabs: Vec<Tab>) -> Self {
        let store = Self::new();
        lock(&store.state).tabs = tabs;
        store
    }

    /// Makes `load_all` fail.
    pub fn failing_load(self) -> Self {
        lock(&self.state).fail_load = true;
        self
    }

    /// Makes `load_all` wait until the returned gate is opened.
    pub fn gated(mut self) -> (Self, LoadGate) {
        let (tx, rx) = std_mpsc::channel();
        self.gate = Some(rx);
        (self, LoadGate(tx))
    }

    pub fn probe(&self) -> MemoryStoreProbe {
        MemoryStoreProbe {
            state: self.state.clone(),
        }
    }

    fn write(&self, apply: impl FnOnce(&mut Vec<Tab>)) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        if state.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        apply(&mut state.tabs);
        state.writes += 1;
        Ok(())
    }
}

impl MemoryStoreProbe {
    pub fn tabs(&self) -> Vec<Tab> {
        lock(&self.state).tabs.clone()
    }

    pub fn writes(&self) -> usize {
        lock(&self.state).writes
    }

    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }
}

impl TabStore for MemoryTabStore {
    fn load_all(&mut self) -> Result<Vec<Tab>, StoreError> {
        if let Some(gate) = self.gate.take() {
            // Either an explicit open or a dropped gate releases the load.
            let _ = gate.recv();
        }
        let state = lock(&self.state);
        if state.fail_load {
            return Err(StoreError::Unavailable("load disabled".to_string()));
        }
        Ok(state.tabs.clone())
    }

    fn insert(&mut self, tab: &Tab) -> Result<(), StoreError> {
        self.write(|tabs| match tabs.iter().position(|t| t.id() == tab.id()) {
            Some(index) => tabs[index] = tab.clone(),
            None => tabs.push(tab.clone()),
        })
    }

    fn remove(&mut self, tab: &Tab) -> Result<(), StoreError> {
        self.write(|tabs| tabs.retain(|t| t.id() != tab.id()))
    }

    fn reorder(&mut self, order: &[TabId]) -> Result<(), StoreError> {
        self.write(|tabs| {
            tabs.sort_by_key(|t| order.iter().position(|id| id == t.id()).unwrap_or(usize::MAX))
        })
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// === Store thread ===

/// A write queued for the store thread.
#[derive(Debug)]
pub(crate) enum StoreOp {
    Insert(Tab),
    Remove(Tab),
    Reorder(Vec<TabId>),
    /// Answered once every earlier operation has been applied.
    Flush(oneshot::Sender<()>),
}

/// A persistence failure, reported on the diagnostics channel.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDiagnostic {
    pub operation: &'static str,
    pub tab_id: Option<TabId>,
    pub error: StoreError,
}

pub(crate) type LoadResult = Result<Vec<Tab>, StoreError>;

/// Handle to the thread owning a [`TabStore`].
pub(crate) struct StoreWorker {
    ops: mpsc::UnboundedSender<StoreOp>,
}

impl StoreWorker {
    /// Starts the store thread. It loads the stored tabs first and reports
    /// them on the returned receiver, then serves queued writes until every
    /// `StoreWorker` handle is dropped.
    pub(crate) fn spawn(
        store: Box<dyn TabStore>,
        diagnostics: broadcast::Sender<StoreDiagnostic>,
    ) -> io::Result<(Self, oneshot::Receiver<LoadResult>)> {
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        let (loaded_tx, loaded_rx) = oneshot::channel();
        thread::Builder::new()
            .name("tab-store".to_string())
            .spawn(move || run_store(store, loaded_tx, ops_rx, diagnostics))?;
        Ok((Self { ops: ops_tx }, loaded_rx))
    }

    /// Queues `op`. Returns `false` if the store thread is gone.
    pub(crate) fn send(&self, op: StoreOp) -> bool {
        self.ops.send(op).is_ok()
    }
}

fn run_store(
    mut store: Box<dyn TabStore>,
    loaded: oneshot::Sender<LoadResult>,
    mut ops: mpsc::UnboundedReceiver<StoreOp>,
    diagnostics: broadcast::Sender<StoreDiagnostic>,
) {
    let _ = loaded.send(store.load_all());

    while let Some(op) = ops.blocking_recv() {
        let (operation, tab_id, result) = match op {
            StoreOp::Insert(tab) => ("insert", Some(tab.id().clone()), store.insert(&tab)),
            StoreOp::Remove(tab) => ("remove", Some(tab.id().clone()), store.remove(&tab)),
            StoreOp::Reorder(order) => ("reorder", None, store.reorder(&order)),
            StoreOp::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };
        if let Err(error) = result {
            warn!(operation, tab_id = ?tab_id, %error, "tab persistence failed");
            let _ = diagnostics.send(StoreDiagnostic {
                operation,
                tab_id,
                error,
            });
        }
    }
    debug!("tab store thread exiting");
}
