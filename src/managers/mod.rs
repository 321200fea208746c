// GitBrowser state managers
// The tab list: collection, policies, persistence and the service driving them.

pub mod tab_collection;
pub mod tab_manager;
pub mod tab_policy;
pub mod tab_store;
