// GitBrowser core shared type definitions
// Value types and command vocabularies used by the data services.

pub mod command;
pub mod errors;
pub mod settings;
pub mod tab;
