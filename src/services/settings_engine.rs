// GitBrowser Settings Engine
// Loads, saves, updates and resets the core settings.
// Settings are stored as a JSON file at the platform-specific config path.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::CoreSettings;

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<CoreSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &CoreSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists settings as JSON on disk.
pub struct SettingsEngine {
    config_path: String,
    settings: CoreSettings,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `core.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("core.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            settings: CoreSettings::default(),
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// A missing file yields defaults; a malformed one is a serialization error
    /// and a well-formed one with unusable values is an invalid value.
    fn load(&mut self) -> Result<CoreSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            debug!(path = %self.config_path, "no settings file, using defaults");
            self.settings = CoreSettings::default();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: CoreSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;
        settings.tabs.validate()?;
        settings.search.validate()?;
        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Saves the current settings, creating parent directories as needed.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.settings).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))
    }

    fn get_settings(&self) -> &CoreSettings {
        &self.settings
    }

    /// Updates one setting, addressed as `<section>.<setting>`, and saves.
    ///
    /// # Examples
    /// - `"tabs.select_new_tabs"` → updates `settings.tabs.select_new_tabs`
    /// - `"search.resolve_domains"` → updates `settings.search.resolve_domains`
    ///
    /// The updated section is validated before it replaces the current one.
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        let (section, field) = Section::parse(key)?;
        match section {
            Section::Tabs => {
                let tabs = with_field(&self.settings.tabs, key, field, value)?;
                tabs.validate()?;
                self.settings.tabs = tabs;
            }
            Section::Search => {
                let search = with_field(&self.settings.search, key, field, value)?;
                search.validate()?;
                self.settings.search = search;
            }
        }
        debug!(key, "setting updated");
        self.save()
    }

    /// Resets all settings to factory defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = CoreSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}

/// Sections of [`CoreSettings`] addressable by `set_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Tabs,
    Search,
}

impl Section {
    /// Splits `key` into its section and the setting inside it.
    fn parse(key: &str) -> Result<(Section, &str), SettingsError> {
        let (section, field) = key.split_once('.').ok_or_else(|| {
            SettingsError::InvalidKey(format!(
                "Key '{}' is not of the form <section>.<setting>",
                key
            ))
        })?;
        let section = match section {
            "tabs" => Section::Tabs,
            "search" => Section::Search,
            other => {
                return Err(SettingsError::InvalidKey(format!(
                    "Unknown settings section '{}'",
                    other
                )))
            }
        };
        Ok((section, field))
    }
}

/// Returns a copy of `current` with `field` set to `value`.
fn with_field<T>(
    current: &T,
    key: &str,
    field: &str,
    value: serde_json::Value,
) -> Result<T, SettingsError>
where
    T: Serialize + DeserializeOwned,
{
    let mut section = serde_json::to_value(current).map_err(|e| {
        SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
    })?;
    match section.as_object_mut() {
        Some(fields) if fields.contains_key(field) => {
            fields.insert(field.to_string(), value);
        }
        _ => {
            return Err(SettingsError::InvalidKey(format!(
                "Key '{}' not found in settings",
                key
            )))
        }
    }
    serde_json::from_value(section).map_err(|e| {
        SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
    })
}
