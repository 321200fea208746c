use std::fmt;

// === ServiceStopped ===

/// The data service has been shut down and no longer accepts commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStopped;

impl fmt::Display for ServiceStopped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Data service stopped")
    }
}

impl std::error::Error for ServiceStopped {}

// === NoRuntime ===

/// A data service was started outside a tokio runtime without an explicit handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoRuntime;

impl fmt::Display for NoRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No tokio runtime to run the data service on")
    }
}

impl std::error::Error for NoRuntime {}

// === TabError ===

/// Errors related to tab list operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabError {
    /// A mutation arrived before the initial load from the store completed.
    NotReadyYet,
    /// Tab with the given ID was not found.
    NotFound(String),
    /// There is no selected tab to operate on.
    NoSelection,
    /// A tab with the given ID already exists.
    AlreadyExists(String),
    /// The provided tab index is out of bounds.
    InvalidIndex(usize),
    /// The backing store failed.
    BackingStore(String),
    /// The tab service has been shut down.
    ServiceStopped,
    /// The tab service could not be started.
    NoRuntime,
}

impl fmt::Display for TabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabError::NotReadyYet => write!(f, "Tab list is not initialized yet"),
            TabError::NotFound(id) => write!(f, "Tab not found: {}", id),
            TabError::NoSelection => write!(f, "No tab is selected"),
            TabError::AlreadyExists(id) => write!(f, "Tab already exists: {}", id),
            TabError::InvalidIndex(index) => write!(f, "Invalid tab index: {}", index),
            TabError::BackingStore(msg) => write!(f, "Tab store failure: {}", msg),
            TabError::ServiceStopped => write!(f, "Tab service stopped"),
            TabError::NoRuntime => write!(f, "Tab service has no runtime to run on"),
        }
    }
}

impl std::error::Error for TabError {}

impl From<ServiceStopped> for TabError {
    fn from(_: ServiceStopped) -> Self {
        TabError::ServiceStopped
    }
}

impl From<NoRuntime> for TabError {
    fn from(_: NoRuntime) -> Self {
        TabError::NoRuntime
    }
}

impl From<StoreError> for TabError {
    fn from(err: StoreError) -> Self {
        TabError::BackingStore(err.to_string())
    }
}

// === StoreError ===

/// Errors reported by a tab backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database operation failed.
    Database(String),
    /// A stored record could not be encoded or decoded.
    Serialization(String),
    /// The store is not reachable.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(msg) => write!(f, "Tab store database error: {}", msg),
            StoreError::Serialization(msg) => {
                write!(f, "Tab store serialization error: {}", msg)
            }
            StoreError::Unavailable(msg) => write!(f, "Tab store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

// === SearchError ===

/// Errors related to suggestion fetches and domain resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The remote endpoint could not be reached.
    Network(String),
    /// The remote endpoint answered with something unusable.
    InvalidResponse(String),
    /// The domain could not be resolved.
    ResolutionFailed(String),
    /// The URL cannot be used for the request.
    InvalidUrl(String),
    /// The search service has been shut down.
    ServiceStopped,
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Network(msg) => write!(f, "Search network error: {}", msg),
            SearchError::InvalidResponse(msg) => {
                write!(f, "Invalid search response: {}", msg)
            }
            SearchError::ResolutionFailed(msg) => {
                write!(f, "Domain resolution failed: {}", msg)
            }
            SearchError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            SearchError::ServiceStopped => write!(f, "Search service stopped"),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<ServiceStopped> for SearchError {
    fn from(_: ServiceStopped) -> Self {
        SearchError::ServiceStopped
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        SearchError::Network(err.to_string())
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// File system I/O error.
    IoError(String),
    /// JSON serialization or deserialization failed.
    SerializationError(String),
    /// The settings key does not exist.
    InvalidKey(String),
    /// The value provided for a setting is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}
