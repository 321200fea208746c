//! Command and response vocabularies of the data services.
//!
//! Each service accepts one closed command enum and answers with the matching
//! variant of its data enum. Two commands with the same coalescing key describe
//! the same work and share a single backing-store invocation.

use std::fmt;
use std::hash::Hash;

use url::Url;

use super::tab::{Placement, Tab, TabContent, TabId};

/// A command accepted by a data service.
pub trait ServiceCommand: fmt::Debug + Send + 'static {
    type Key: Clone + Eq + Hash + fmt::Debug + Send + 'static;

    /// Key under which equivalent in-flight commands are merged.
    /// `None` means the command always executes on its own.
    fn coalescing_key(&self) -> Option<Self::Key>;
}

// === Tab list ===

/// Commands understood by the tab list service.
#[derive(Debug, Clone)]
pub enum TabCommand {
    /// Insert `tab`; `placement` overrides the service's positioning policy.
    Add {
        tab: Tab,
        placement: Option<Placement>,
    },
    Remove {
        id: TabId,
    },
    Select {
        id: TabId,
    },
    ReplaceSelected {
        content: TabContent,
    },
    Move {
        id: TabId,
        to: usize,
    },
    GetAll,
    GetCount,
    GetSelectedId,
    GetTab {
        id: TabId,
    },
    /// Completes once every persistence write queued before it has been applied.
    Flush,
}

impl TabCommand {
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            TabCommand::GetAll
                | TabCommand::GetCount
                | TabCommand::GetSelectedId
                | TabCommand::GetTab { .. }
        )
    }
}

impl ServiceCommand for TabCommand {
    type Key = TabId;

    /// Tab commands are never merged: mutations must each apply in submission
    /// order and reads are answered straight from the snapshot.
    fn coalescing_key(&self) -> Option<TabId> {
        None
    }
}

/// Responses of the tab list service.
#[derive(Debug, Clone, PartialEq)]
pub enum TabData {
    /// A mutation was applied.
    Done,
    /// The new snapshot of the tab whose content was replaced.
    Replaced(Tab),
    Tabs(Vec<Tab>),
    Count(usize),
    /// `None` is the no-selection sentinel.
    SelectedId(Option<TabId>),
    Tab(Option<Tab>),
}

// === Search and resolution ===

/// Commands understood by the search/resolution service.
#[derive(Debug, Clone)]
pub enum SearchCommand {
    FetchSuggestions { query: String },
    ResolveDomain { url: Url },
}

/// Coalescing key of a search command.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchKey {
    Suggestions(String),
    Domain(String),
}

impl ServiceCommand for SearchCommand {
    type Key = SearchKey;

    fn coalescing_key(&self) -> Option<SearchKey> {
        match self {
            SearchCommand::FetchSuggestions { query } => {
                Some(SearchKey::Suggestions(normalize_query(query)))
            }
            SearchCommand::ResolveDomain { url } => url
                .host_str()
                .map(|host| SearchKey::Domain(host.to_ascii_lowercase())),
        }
    }
}

/// Outcome of a domain resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainResolution {
    /// The host was replaced by a resolved address.
    Resolved(Url),
    /// Resolution was not requested or not needed; the URL is returned as given.
    Unchanged(Url),
}

impl DomainResolution {
    pub fn url(&self) -> &Url {
        match self {
            DomainResolution::Resolved(url) | DomainResolution::Unchanged(url) => url,
        }
    }

    pub fn into_url(self) -> Url {
        match self {
            DomainResolution::Resolved(url) | DomainResolution::Unchanged(url) => url,
        }
    }
}

/// Responses of the search/resolution service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchData {
    Suggestions(Vec<String>),
    Resolution(DomainResolution),
}

/// Normalizes query text: trims, collapses inner whitespace and lowercases.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
