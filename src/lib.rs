//! GitBrowser core — concurrent data services behind the browser UI.
//!
//! The tab list and the search/resolution service are both built on the
//! [`services::data_service`] engine. This library crate exposes all modules
//! for use by the binary and integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod services;
pub mod types;
