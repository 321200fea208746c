//! Ordered tab collection with a single selection.
//!
//! Invariants kept by every operation:
//! - no two tabs share an identifier;
//! - the selection, when present, names a tab in the collection.

use tracing::warn;

use super::tab_policy::{PositioningPolicy, SelectionStrategy};
use crate::types::errors::TabError;
use crate::types::tab::{Tab, TabContent, TabId};

/// Display-ordered tabs plus the selected identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabCollection {
    tabs: Vec<Tab>,
    selected: Option<TabId>,
}

impl TabCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from restored tabs, dropping duplicate ids and
    /// selecting the first tab.
    pub fn restored(tabs: Vec<Tab>) -> Self {
        let mut collection = Self::new();
        for tab in tabs {
            if collection.contains(tab.id()) {
                warn!(tab_id = %tab.id(), "dropping duplicate restored tab");
                continue;
            }
            collection.tabs.push(tab);
        }
        collection.selected = collection.tabs.first().map(|t| t.id().clone());
        collection
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn selected(&self) -> Option<&TabId> {
        self.selected.as_ref()
    }

    pub fn selected_tab(&self) -> Option<&Tab> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn get(&self, id: &TabId) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id() == id)
    }

    pub fn position(&self, id: &TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id() == id)
    }

    pub fn contains(&self, id: &TabId) -> bool {
        self.position(id).is_some()
    }

    pub fn order(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id().clone()).collect()
    }

    /// Inserts `tab` where `policy` says, selecting it if the policy asks to.
    /// Returns the index it landed at.
    pub fn insert(&mut self, tab: Tab, policy: &dyn PositioningPolicy) -> Result<usize, TabError> {
        if self.contains(tab.id()) {
            return Err(TabError::AlreadyExists(tab.id().to_string()));
        }
        let index = policy
            .insertion_index(&self.tabs, &tab, self.selected.as_ref())
            .min(self.tabs.len());
        if policy.selects_new_tab() {
            self.selected = Some(tab.id().clone());
        }
        self.tabs.insert(index, tab);
        Ok(index)
    }

    /// Removes the tab with `id`, letting `strategy` pick the next selection.
    /// Returns the removed tab, or `None` when it was not present.
    pub fn remove(&mut self, id: &TabId, strategy: &dyn SelectionStrategy) -> Option<Tab> {
        let index = self.position(id)?;
        let next = strategy.selection_after_removal(id, &self.tabs, self.selected.as_ref());
        let removed = self.tabs.remove(index);

        self.selected = match next {
            Some(next) if self.contains(&next) => Some(next),
            Some(next) => {
                warn!(tab_id = %next, "selection strategy chose a tab that is not open");
                None
            }
            None => None,
        };
        Some(removed)
    }

    /// Selects `id`. Returns whether the selection changed.
    pub fn select(&mut self, id: &TabId) -> Result<bool, TabError> {
        if !self.contains(id) {
            return Err(TabError::NotFound(id.to_string()));
        }
        if self.selected.as_ref() == Some(id) {
            return Ok(false);
        }
        self.selected = Some(id.clone());
        Ok(true)
    }

    /// Swaps the selected tab for a new snapshot showing `content`.
    pub fn replace_selected(&mut self, content: TabContent) -> Result<Tab, TabError> {
        let id = self.selected.clone().ok_or(TabError::NoSelection)?;
        let index = self
            .position(&id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))?;
        let replacement = self.tabs[index].with_content(content);
        self.tabs[index] = replacement.clone();
        Ok(replacement)
    }

    /// Moves a tab to `to` in display order.
    pub fn move_tab(&mut self, id: &TabId, to: usize) -> Result<(), TabError> {
        let from = self
            .position(id)
            .ok_or_else(|| TabError::NotFound(id.to_string()))?;
        if to >= self.tabs.len() {
            return Err(TabError::InvalidIndex(to));
        }
        let tab = self.tabs.remove(from);
        self.tabs.insert(to, tab);
        Ok(())
    }
}
