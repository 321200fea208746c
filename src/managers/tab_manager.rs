//! Tab Manager for GitBrowser.
//!
//! The tab list is a [`DataService`] specialization. Its state (the ordered
//! [`TabCollection`] and the ready flag) lives on the service task, so every
//! command is applied in submission order. The store is loaded once on the
//! store thread at startup; afterwards each mutation is applied in memory,
//! answered, and then persisted on a best-effort basis.

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{broadcast, oneshot};
use tracing::{info, warn};

use super::tab_collection::TabCollection;
use super::tab_policy::{selection_strategy, PositioningPolicy, PrecedingTab, SelectionStrategy};
use super::tab_store::{LoadResult, StoreDiagnostic, StoreOp, StoreWorker, TabStore};
use crate::services::data_service::{
    DataHandler, DataService, Execution, Executor, ServiceState,
};
use crate::types::command::{TabCommand, TabData};
use crate::types::errors::{StoreError, TabError};
use crate::types::settings::TabSettings;
use crate::types::tab::{Placement, Tab, TabContent, TabId};

const DIAGNOSTICS_CAPACITY: usize = 64;

/// Policies a tab manager is built with.
pub struct TabManagerOptions {
    pub selection: Box<dyn SelectionStrategy>,
    /// Placement of tabs added without an explicit one.
    pub placement: Placement,
}

impl Default for TabManagerOptions {
    fn default() -> Self {
        Self {
            selection: Box::new(PrecedingTab),
            placement: Placement::back(),
        }
    }
}

impl From<&TabSettings> for TabManagerOptions {
    fn from(settings: &TabSettings) -> Self {
        Self {
            selection: selection_strategy(settings.selection_after_close),
            placement: settings.default_placement(),
        }
    }
}

/// Tab list state machine run by the data-service engine.
pub struct TabListHandler {
    collection: TabCollection,
    ready: bool,
    selection: Box<dyn SelectionStrategy>,
    placement: Placement,
    store: StoreWorker,
    restore: Option<oneshot::Receiver<LoadResult>>,
}

impl TabListHandler {
    fn persist(&self, op: StoreOp) {
        if !self.store.send(op) {
            warn!("tab store thread is gone, change not persisted");
        }
    }

    fn persist_order(&self) {
        self.persist(StoreOp::Reorder(self.collection.order()));
    }

    fn insert(&mut self, tab: Tab, placement: &Placement) -> Result<TabData, TabError> {
        let index = self.collection.insert(tab.clone(), placement)?;
        let appended = index + 1 == self.collection.len();
        self.persist(StoreOp::Insert(tab));
        if !appended {
            self.persist_order();
        }
        Ok(TabData::Done)
    }

    fn read(&self, command: &TabCommand) -> TabData {
        match command {
            TabCommand::GetAll => TabData::Tabs(self.collection.tabs().to_vec()),
            TabCommand::GetCount => TabData::Count(self.collection.len()),
            TabCommand::GetSelectedId => TabData::SelectedId(self.collection.selected().cloned()),
            TabCommand::GetTab { id } => TabData::Tab(self.collection.get(id).cloned()),
            _ => unreachable!("not a read command: {:?}", command),
        }
    }

    fn flush(&self) -> Execution<TabData, TabError> {
        let (done, flushed) = oneshot::channel();
        if !self.store.send(StoreOp::Flush(done)) {
            return Execution::ready(Err(TabError::BackingStore(
                "tab store thread stopped".to_string(),
            )));
        }
        Execution::pending(async move {
            flushed
                .await
                .map(|_| TabData::Done)
                .map_err(|_| TabError::BackingStore("tab store thread stopped".to_string()))
        })
    }
}

impl DataHandler for TabListHandler {
    type Command = TabCommand;
    type Data = TabData;
    type Error = TabError;
    type Init = LoadResult;

    fn initialize(&mut self) -> Option<BoxFuture<'static, LoadResult>> {
        let restore = self.restore.take()?;
        Some(
            async move {
                restore.await.unwrap_or_else(|_| {
                    Err(StoreError::Unavailable("tab store thread exited".to_string()))
                })
            }
            .boxed(),
        )
    }

    fn initialized(&mut self, loaded: LoadResult) {
        match loaded {
            Ok(tabs) => {
                self.collection = TabCollection::restored(tabs);
                info!(tabs = self.collection.len(), "tab list restored");
            }
            Err(error) => {
                // Degraded but usable: start empty, no retry.
                warn!(%error, "tab list restore failed, starting empty");
                self.collection = TabCollection::new();
            }
        }
        self.ready = true;
    }

    fn begin(&mut self, command: &TabCommand) -> Execution<TabData, TabError> {
        if command.is_read() {
            // The collection stays empty until the restore lands, so reads
            // issued before that see defaults.
            return Execution::ready(Ok(self.read(command)));
        }
        if let TabCommand::Flush = command {
            return self.flush();
        }
        if !self.ready {
            return Execution::ready(Err(TabError::NotReadyYet));
        }

        let outcome = match command {
            TabCommand::Add { tab, placement } => {
                let placement = placement.unwrap_or(self.placement);
                if let Some(delay) = placement.delay() {
                    return Execution::pending(async move {
                        tokio::time::sleep(delay).await;
                        Ok(TabData::Done)
                    });
                }
                self.insert(tab.clone(), &placement)
            }
            TabCommand::Remove { id } => {
                if let Some(removed) = self.collection.remove(id, self.selection.as_ref()) {
                    self.persist(StoreOp::Remove(removed));
                }
                Ok(TabData::Done)
            }
            TabCommand::Select { id } => self.collection.select(id).map(|_| TabData::Done),
            TabCommand::ReplaceSelected { content } => {
                self.collection.replace_selected(content.clone()).map(|tab| {
                    self.persist(StoreOp::Insert(tab.clone()));
                    TabData::Replaced(tab)
                })
            }
            TabCommand::Move { id, to } => self.collection.move_tab(id, *to).map(|_| {
                self.persist_order();
                TabData::Done
            }),
            _ => unreachable!("unhandled tab command: {:?}", command),
        };
        Execution::ready(outcome)
    }

    fn finish(
        &mut self,
        command: &TabCommand,
        outcome: Result<TabData, TabError>,
    ) -> Result<TabData, TabError> {
        match (command, outcome) {
            // A delayed add is inserted once its delay has elapsed.
            (TabCommand::Add { tab, placement }, Ok(_)) => {
                let placement = placement.unwrap_or(self.placement);
                self.insert(tab.clone(), &placement)
            }
            (_, outcome) => outcome,
        }
    }
}

/// Tab list service handle.
#[derive(Clone)]
pub struct TabManager {
    service: DataService<TabListHandler>,
    diagnostics: broadcast::Sender<StoreDiagnostic>,
}

impl TabManager {
    /// Starts the tab list over `store`. The store is loaded on a background
    /// thread; until that finishes reads return empty defaults and mutations
    /// fail with [`TabError::NotReadyYet`].
    pub fn new(
        store: impl TabStore,
        options: TabManagerOptions,
        executor: &Executor,
    ) -> Result<Self, TabError> {
        let (diagnostics, _) = broadcast::channel(DIAGNOSTICS_CAPACITY);
        let (worker, restore) = StoreWorker::spawn(Box::new(store), diagnostics.clone())
            .map_err(|e| TabError::BackingStore(format!("failed to start tab store: {}", e)))?;

        let handler = TabListHandler {
            collection: TabCollection::new(),
            ready: false,
            selection: options.selection,
            placement: options.placement,
            store: worker,
            restore: Some(restore),
        };

        Ok(Self {
            service: DataService::spawn("tabs", handler, executor)?,
            diagnostics,
        })
    }

    pub fn from_settings(
        store: impl TabStore,
        settings: &TabSettings,
        executor: &Executor,
    ) -> Result<Self, TabError> {
        Self::new(store, TabManagerOptions::from(settings), executor)
    }

    /// The underlying service, for the blocking, callback and stream forms.
    pub fn service(&self) -> &DataService<TabListHandler> {
        &self.service
    }

    pub async fn execute(&self, command: TabCommand) -> Result<TabData, TabError> {
        self.service.execute(command).await
    }

    /// Adds `tab` using the configured placement.
    pub async fn add_tab(&self, tab: Tab) -> Result<(), TabError> {
        self.add(tab, None).await
    }

    pub async fn add_tab_with(&self, tab: Tab, placement: Placement) -> Result<(), TabError> {
        self.add(tab, Some(placement)).await
    }

    async fn add(&self, tab: Tab, placement: Option<Placement>) -> Result<(), TabError> {
        self.execute(TabCommand::Add { tab, placement })
            .await
            .map(expect_done)
    }

    /// Removes a tab. Removing a tab that is not open succeeds without effect.
    pub async fn remove_tab(&self, id: &TabId) -> Result<(), TabError> {
        self.execute(TabCommand::Remove { id: id.clone() })
            .await
            .map(expect_done)
    }

    pub async fn select_tab(&self, id: &TabId) -> Result<(), TabError> {
        self.execute(TabCommand::Select { id: id.clone() })
            .await
            .map(expect_done)
    }

    /// Replaces what the selected tab shows, returning its new snapshot.
    pub async fn replace_selected(&self, content: TabContent) -> Result<Tab, TabError> {
        match self.execute(TabCommand::ReplaceSelected { content }).await? {
            TabData::Replaced(tab) => Ok(tab),
            other => unreachable!("replace-selected answered with {:?}", other),
        }
    }

    pub async fn move_tab(&self, id: &TabId, to: usize) -> Result<(), TabError> {
        self.execute(TabCommand::Move { id: id.clone(), to })
            .await
            .map(expect_done)
    }

    /// Tabs in display order.
    pub async fn get_all(&self) -> Vec<Tab> {
        match self.execute(TabCommand::GetAll).await {
            Ok(TabData::Tabs(tabs)) => tabs,
            Ok(other) => unreachable!("get-all answered with {:?}", other),
            Err(_) => Vec::new(),
        }
    }

    pub async fn tab_count(&self) -> usize {
        match self.execute(TabCommand::GetCount).await {
            Ok(TabData::Count(count)) => count,
            Ok(other) => unreachable!("get-count answered with {:?}", other),
            Err(_) => 0,
        }
    }

    /// The selected tab id; `None` means nothing is selected.
    pub async fn selected_id(&self) -> Option<TabId> {
        match self.execute(TabCommand::GetSelectedId).await {
            Ok(TabData::SelectedId(id)) => id,
            Ok(other) => unreachable!("get-selected-id answered with {:?}", other),
            Err(_) => None,
        }
    }

    pub async fn get_tab(&self, id: &TabId) -> Option<Tab> {
        match self.execute(TabCommand::GetTab { id: id.clone() }).await {
            Ok(TabData::Tab(tab)) => tab,
            Ok(other) => unreachable!("get-tab answered with {:?}", other),
            Err(_) => None,
        }
    }

    /// Waits until every change made so far has been handed to the store.
    pub async fn flush(&self) -> Result<(), TabError> {
        self.execute(TabCommand::Flush).await.map(expect_done)
    }

    /// Persistence failures, as they happen.
    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<StoreDiagnostic> {
        self.diagnostics.subscribe()
    }

    pub fn is_ready(&self) -> bool {
        self.service.state() == ServiceState::Ready
    }

    pub async fn wait_ready(&self) -> ServiceState {
        self.service.wait_ready().await
    }

    /// Flushes pending writes and stops the service.
    pub async fn shutdown(&self) {
        if let Err(error) = self.flush().await {
            warn!(%error, "tab flush before shutdown failed");
        }
        self.service.shutdown().await;
    }
}

fn expect_done(data: TabData) {
    match data {
        TabData::Done => {}
        other => unreachable!("mutation answered with {:?}", other),
    }
}
