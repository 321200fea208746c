//! Search suggestion and domain resolution service.
//!
//! Concurrent requests for the same normalized query, or for the same host,
//! share one backend call.

use std::sync::Arc;

use tracing::warn;
use url::{Host, Url};

use super::data_service::{DataHandler, DataService, Execution, Executor};
use super::search_backend::{rewrite_host, SearchBackend};
use crate::types::command::{normalize_query, DomainResolution, SearchCommand, SearchData};
use crate::types::errors::{NoRuntime, SearchError};
use crate::types::settings::SearchSettings;

/// Search state machine run by the data-service engine.
pub struct SearchHandler {
    backend: Arc<dyn SearchBackend>,
    resolve_domains: bool,
    max_suggestions: usize,
}

impl SearchHandler {
    pub fn new(backend: Arc<dyn SearchBackend>, settings: &SearchSettings) -> Self {
        Self {
            backend,
            resolve_domains: settings.resolve_domains,
            max_suggestions: settings.max_suggestions,
        }
    }

    fn needs_resolution(&self, url: &Url) -> bool {
        self.resolve_domains && matches!(url.host(), Some(Host::Domain(_)))
    }
}

impl DataHandler for SearchHandler {
    type Command = SearchCommand;
    type Data = SearchData;
    type Error = SearchError;
    type Init = ();

    fn begin(&mut self, command: &SearchCommand) -> Execution<SearchData, SearchError> {
        match command {
            SearchCommand::FetchSuggestions { query } => {
                let query = normalize_query(query);
                if query.is_empty() {
                    return Execution::ready(Ok(SearchData::Suggestions(Vec::new())));
                }
                let backend = self.backend.clone();
                Execution::pending(async move {
                    backend
                        .fetch_suggestions(&query)
                        .await
                        .map(SearchData::Suggestions)
                })
            }
            SearchCommand::ResolveDomain { url } => {
                if !self.needs_resolution(url) {
                    return Execution::ready(Ok(SearchData::Resolution(
                        DomainResolution::Unchanged(url.clone()),
                    )));
                }
                let backend = self.backend.clone();
                let url = url.clone();
                Execution::pending(async move {
                    backend
                        .resolve_domain(&url)
                        .await
                        .map(|resolved| SearchData::Resolution(DomainResolution::Resolved(resolved)))
                })
            }
        }
    }

    fn finish(
        &mut self,
        command: &SearchCommand,
        outcome: Result<SearchData, SearchError>,
    ) -> Result<SearchData, SearchError> {
        match (command, outcome) {
            (SearchCommand::FetchSuggestions { query }, Err(error)) => {
                warn!(query = %query, %error, "suggestion fetch failed");
                Ok(SearchData::Suggestions(Vec::new()))
            }
            (SearchCommand::FetchSuggestions { .. }, Ok(SearchData::Suggestions(mut list))) => {
                if self.max_suggestions > 0 {
                    list.truncate(self.max_suggestions);
                }
                Ok(SearchData::Suggestions(list))
            }
            (_, outcome) => outcome,
        }
    }

    fn deliver(
        &self,
        command: &SearchCommand,
        shared: &Result<SearchData, SearchError>,
    ) -> Result<SearchData, SearchError> {
        match (command, shared) {
            (
                SearchCommand::ResolveDomain { url },
                Ok(SearchData::Resolution(DomainResolution::Resolved(resolved))),
            ) => splice_host(url, resolved)
                .map(|url| SearchData::Resolution(DomainResolution::Resolved(url))),
            _ => shared.clone(),
        }
    }
}

/// Applies the host of `resolved` to `url`, keeping everything else of `url`.
fn splice_host(url: &Url, resolved: &Url) -> Result<Url, SearchError> {
    match resolved.host() {
        Some(Host::Ipv4(ip)) => rewrite_host(url, ip.into()),
        Some(Host::Ipv6(ip)) => rewrite_host(url, ip.into()),
        Some(Host::Domain(domain)) => {
            let mut spliced = url.clone();
            spliced
                .set_host(Some(domain))
                .map_err(|e| SearchError::InvalidUrl(format!("{}: {}", url, e)))?;
            Ok(spliced)
        }
        None => Err(SearchError::InvalidResponse(format!(
            "resolved URL has no host: {}",
            resolved
        ))),
    }
}

/// Search/resolution service handle.
#[derive(Clone)]
pub struct SearchService {
    service: DataService<SearchHandler>,
}

impl SearchService {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        settings: &SearchSettings,
        executor: &Executor,
    ) -> Result<Self, NoRuntime> {
        let handler = SearchHandler::new(backend, settings);
        Ok(Self {
            service: DataService::spawn("search", handler, executor)?,
        })
    }

    /// The underlying service, for the blocking, callback and stream forms.
    pub fn service(&self) -> &DataService<SearchHandler> {
        &self.service
    }

    /// Suggestions for `query`. Backend failures yield an empty list.
    pub async fn suggestions(&self, query: &str) -> Vec<String> {
        let command = SearchCommand::FetchSuggestions {
            query: query.to_string(),
        };
        match self.service.execute(command).await {
            Ok(SearchData::Suggestions(list)) => list,
            Ok(other) => unreachable!("fetch-suggestions answered with {:?}", other),
            Err(_) => Vec::new(),
        }
    }

    /// Resolves the host of `url`.
    ///
    /// Requests for the same host share one lookup; the resolved address is
    /// applied to the caller's own URL.
    pub async fn resolve_domain(&self, url: &Url) -> Result<DomainResolution, SearchError> {
        let command = SearchCommand::ResolveDomain { url: url.clone() };
        match self.service.execute(command).await? {
            SearchData::Resolution(resolution) => Ok(resolution),
            other => unreachable!("resolve-domain answered with {:?}", other),
        }
    }

    pub async fn shutdown(&self) {
        self.service.shutdown().await;
    }
}
