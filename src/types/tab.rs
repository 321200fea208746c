use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Opaque, stable identifier of a tab.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TabId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a tab is currently showing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TabContent {
    /// A web page.
    Site { url: Url, title: String },
    /// An empty new-tab page.
    Blank,
    /// The top-sites overview.
    TopSites,
}

impl TabContent {
    pub fn site(url: Url, title: impl Into<String>) -> Self {
        TabContent::Site {
            url,
            title: title.into(),
        }
    }
}

/// Immutable snapshot of a browser tab.
///
/// Changing what a tab shows produces a new `Tab` carrying the same [`TabId`];
/// the collection then swaps the old value for the new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    id: TabId,
    content: TabContent,
    preview: Option<Vec<u8>>,
    created_at: i64,
}

impl Tab {
    /// Creates a tab with a freshly generated identifier.
    pub fn new(content: TabContent) -> Self {
        Self {
            id: TabId::new(),
            content,
            preview: None,
            created_at: now(),
        }
    }

    pub fn blank() -> Self {
        Self::new(TabContent::Blank)
    }

    pub fn site(url: Url, title: impl Into<String>) -> Self {
        Self::new(TabContent::site(url, title))
    }

    /// Rebuilds a tab from persisted fields.
    pub fn restore(
        id: TabId,
        content: TabContent,
        preview: Option<Vec<u8>>,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            content,
            preview,
            created_at,
        }
    }

    /// Returns a new snapshot with the same identity showing `content`.
    /// The preview belongs to the old content and is dropped.
    pub fn with_content(&self, content: TabContent) -> Tab {
        Tab {
            id: self.id.clone(),
            content,
            preview: None,
            created_at: self.created_at,
        }
    }

    /// Returns a new snapshot with the given preview/favicon payload.
    pub fn with_preview(&self, preview: Vec<u8>) -> Tab {
        Tab {
            preview: Some(preview),
            ..self.clone()
        }
    }

    pub fn id(&self) -> &TabId {
        &self.id
    }

    pub fn content(&self) -> &TabContent {
        &self.content
    }

    pub fn preview(&self) -> Option<&[u8]> {
        self.preview.as_deref()
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.content {
            TabContent::Site { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Title shown in the tab strip.
    pub fn title(&self) -> &str {
        match &self.content {
            TabContent::Site { title, .. } if !title.is_empty() => title,
            TabContent::Site { url, .. } => url.as_str(),
            TabContent::Blank => "New Tab",
            TabContent::TopSites => "Top Sites",
        }
    }
}

/// Where a newly added tab lands in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Front,
    #[default]
    Back,
    /// Directly after the selected tab, or at the back when nothing is selected.
    AfterSelected,
}

/// Placement of a new tab: insertion position, whether it takes the selection,
/// and an optional delay before it is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub position: Position,
    pub select: bool,
    pub delay: Option<Duration>,
}

impl Placement {
    pub fn front() -> Self {
        Self {
            position: Position::Front,
            ..Self::default()
        }
    }

    pub fn back() -> Self {
        Self::default()
    }

    pub fn after_selected() -> Self {
        Self {
            position: Position::AfterSelected,
            ..Self::default()
        }
    }

    /// Makes the new tab the selected one once inserted.
    pub fn selecting(mut self) -> Self {
        self.select = true;
        self
    }

    /// Defers insertion by `delay`; used when many tabs are opened in a burst.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
