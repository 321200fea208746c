//! Selection and positioning policies of the tab list.

use std::time::Duration;

use crate::types::settings::SelectionPolicy;
use crate::types::tab::{Placement, Position, Tab, TabId};

/// Chooses the selection after a tab is removed.
pub trait SelectionStrategy: Send + Sync {
    /// `collection` is the display order *before* `removed` is taken out.
    /// Returns the new selection, or `None` for no selection.
    fn selection_after_removal(
        &self,
        removed: &TabId,
        collection: &[Tab],
        previous: Option<&TabId>,
    ) -> Option<TabId>;
}

/// Chooses where a new tab is inserted and whether insertion waits.
pub trait PositioningPolicy: Send + Sync {
    fn insertion_index(&self, collection: &[Tab], new_tab: &Tab, selected: Option<&TabId>) -> usize;

    fn delay(&self) -> Option<Duration> {
        None
    }

    fn selects_new_tab(&self) -> bool {
        false
    }
}

/// Selects the tab before the removed one, or the one after it when the
/// removed tab was first.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecedingTab;

impl SelectionStrategy for PrecedingTab {
    fn selection_after_removal(
        &self,
        removed: &TabId,
        collection: &[Tab],
        previous: Option<&TabId>,
    ) -> Option<TabId> {
        if previous != Some(removed) {
            return previous.cloned();
        }
        let index = collection.iter().position(|t| t.id() == removed)?;
        let neighbor = if index > 0 {
            collection.get(index - 1)
        } else {
            collection.get(index + 1)
        };
        neighbor.map(|t| t.id().clone())
    }
}

/// Selects the tab after the removed one, or the one before it when the
/// removed tab was last.
#[derive(Debug, Clone, Copy, Default)]
pub struct FollowingTab;

impl SelectionStrategy for FollowingTab {
    fn selection_after_removal(
        &self,
        removed: &TabId,
        collection: &[Tab],
        previous: Option<&TabId>,
    ) -> Option<TabId> {
        if previous != Some(removed) {
            return previous.cloned();
        }
        let index = collection.iter().position(|t| t.id() == removed)?;
        collection
            .get(index + 1)
            .or_else(|| index.checked_sub(1).and_then(|i| collection.get(i)))
            .map(|t| t.id().clone())
    }
}

/// Builds the strategy configured in settings.
pub fn selection_strategy(policy: SelectionPolicy) -> Box<dyn SelectionStrategy> {
    match policy {
        SelectionPolicy::Preceding => Box::new(PrecedingTab),
        SelectionPolicy::Following => Box::new(FollowingTab),
    }
}

impl PositioningPolicy for Placement {
    fn insertion_index(&self, collection: &[Tab], _new_tab: &Tab, selected: Option<&TabId>) -> usize {
        match self.position {
            Position::Front => 0,
            Position::Back => collection.len(),
            Position::AfterSelected => selected
                .and_then(|id| collection.iter().position(|t| t.id() == id))
                .map(|index| index + 1)
                .unwrap_or(collection.len()),
        }
    }

    fn delay(&self) -> Option<Duration> {
        self.delay.filter(|delay| !delay.is_zero())
    }

    fn selects_new_tab(&self) -> bool {
        self.select
    }
}
