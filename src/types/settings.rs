use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::errors::SettingsError;
use super::tab::{Placement, Position};

/// Top-level settings of the data-service core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CoreSettings {
    #[serde(default)]
    pub tabs: TabSettings,
    #[serde(default)]
    pub search: SearchSettings,
}

/// Tab list behavior and persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TabSettings {
    /// SQLite file name, relative to the platform data directory.
    pub database_file: String,
    pub default_position: Position,
    pub select_new_tabs: bool,
    /// Delay applied to tabs opened in a burst; 0 inserts immediately.
    #[serde(default)]
    pub burst_delay_ms: u64,
    pub selection_after_close: SelectionPolicy,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            database_file: "tabs.db".to_string(),
            default_position: Position::Back,
            select_new_tabs: true,
            burst_delay_ms: 0,
            selection_after_close: SelectionPolicy::Preceding,
        }
    }
}

impl TabSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.database_file.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "tabs.database_file cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Placement used for tabs added without an explicit one.
    pub fn default_placement(&self) -> Placement {
        Placement {
            position: self.default_position,
            select: self.select_new_tabs,
            delay: None,
        }
    }

    /// Placement used for tabs opened in a burst.
    pub fn burst_placement(&self) -> Placement {
        let placement = self.default_placement();
        if self.burst_delay_ms == 0 {
            placement
        } else {
            placement.delayed(Duration::from_millis(self.burst_delay_ms))
        }
    }
}

/// Which tab takes over when the selected tab is closed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    #[default]
    Preceding,
    Following,
}

/// Remote suggestion and resolution endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSettings {
    /// OpenSearch suggestion endpoint; the query is appended as `q`.
    pub suggestion_endpoint: String,
    /// DNS-over-HTTPS JSON endpoint.
    pub doh_endpoint: String,
    pub resolve_domains: bool,
    /// Resolve through the system resolver instead of DoH.
    #[serde(default)]
    pub use_system_resolver: bool,
    pub request_timeout_ms: u64,
    pub max_suggestions: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            suggestion_endpoint: "https://duckduckgo.com/ac/?type=list".to_string(),
            doh_endpoint: "https://cloudflare-dns.com/dns-query".to_string(),
            resolve_domains: false,
            use_system_resolver: false,
            request_timeout_ms: 5000,
            max_suggestions: 8,
        }
    }
}

impl SearchSettings {
    /// Endpoints must be absolute http(s) URLs and the timeout non-zero.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (key, endpoint) in [
            ("search.suggestion_endpoint", &self.suggestion_endpoint),
            ("search.doh_endpoint", &self.doh_endpoint),
        ] {
            let url = Url::parse(endpoint).map_err(|e| {
                SettingsError::InvalidValue(format!("{} is not a valid URL: {}", key, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(SettingsError::InvalidValue(format!(
                    "{} must use http or https",
                    key
                )));
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "search.request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
