// GitBrowser services
// The data-service engine and its specializations: search suggestions, domain resolution, settings.

pub mod data_service;
pub mod in_flight;
pub mod search_backend;
pub mod search_service;
pub mod settings_engine;
