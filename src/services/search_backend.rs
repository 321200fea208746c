//! Remote backends for suggestion fetches and domain resolution.
//!
//! [`HttpSearchBackend`] talks to an OpenSearch suggestion endpoint and a
//! DNS-over-HTTPS JSON endpoint. With the `network` feature,
//! [`SystemDnsBackend`] resolves through the system resolver instead.

use std::net::IpAddr;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::types::errors::SearchError;
use crate::types::settings::SearchSettings;

/// Remote side of the search/resolution service.
///
/// Both calls must be safe to repeat with the same input.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Suggestions for an already normalized query, best match first.
    async fn fetch_suggestions(&self, query: &str) -> Result<Vec<String>, SearchError>;

    /// Returns `url` with its host replaced by a resolved address.
    async fn resolve_domain(&self, url: &Url) -> Result<Url, SearchError>;
}

/// DNS record type codes used in DoH JSON answers.
const RECORD_A: u16 = 1;
const RECORD_AAAA: u16 = 28;

/// Backend speaking plain HTTPS to the configured endpoints.
pub struct HttpSearchBackend {
    client: Client,
    suggestion_endpoint: Url,
    doh_endpoint: Url,
}

impl HttpSearchBackend {
    pub fn new(settings: &SearchSettings) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(concat!("GitBrowser/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            suggestion_endpoint: parse_endpoint(&settings.suggestion_endpoint)?,
            doh_endpoint: parse_endpoint(&settings.doh_endpoint)?,
        })
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, SearchError> {
    Url::parse(endpoint).map_err(|e| SearchError::InvalidUrl(format!("{}: {}", endpoint, e)))
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn fetch_suggestions(&self, query: &str) -> Result<Vec<String>, SearchError> {
        let mut url = self.suggestion_endpoint.clone();
        url.query_pairs_mut().append_pair("q", query);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let body = response.text().await?;
        parse_suggestions(&body)
    }

    async fn resolve_domain(&self, url: &Url) -> Result<Url, SearchError> {
        let host = url
            .host_str()
            .ok_or_else(|| SearchError::InvalidUrl(url.to_string()))?;

        let mut query = self.doh_endpoint.clone();
        query
            .query_pairs_mut()
            .append_pair("name", host)
            .append_pair("type", "A");

        let response = self
            .client
            .get(query)
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .await
            .map_err(|e| SearchError::ResolutionFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| SearchError::ResolutionFailed(e.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::ResolutionFailed(e.to_string()))?;

        let address = parse_doh_answer(&body, host)?;
        rewrite_host(url, address)
    }
}

/// Parses an OpenSearch suggestion document: `["query", ["s1", "s2", ...], ...]`.
pub fn parse_suggestions(body: &str) -> Result<Vec<String>, SearchError> {
    let document: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SearchError::InvalidResponse(e.to_string()))?;
    let suggestions = document
        .get(1)
        .and_then(|v| v.as_array())
        .ok_or_else(|| SearchError::InvalidResponse("missing suggestion list".to_string()))?;
    Ok(suggestions
        .iter()
        .filter_map(|s| s.as_str())
        .map(str::to_string)
        .collect())
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status", default)]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

/// Picks the first address record out of a DoH JSON response.
pub fn parse_doh_answer(body: &str, host: &str) -> Result<IpAddr, SearchError> {
    let response: DohResponse =
        serde_json::from_str(body).map_err(|e| SearchError::ResolutionFailed(e.to_string()))?;
    if response.status != 0 {
        return Err(SearchError::ResolutionFailed(format!(
            "{}: DNS status {}",
            host, response.status
        )));
    }
    response
        .answer
        .iter()
        .filter(|a| a.record_type == RECORD_A || a.record_type == RECORD_AAAA)
        .find_map(|a| a.data.parse::<IpAddr>().ok())
        .ok_or_else(|| SearchError::ResolutionFailed(format!("{}: no address records", host)))
}

/// Replaces the host of `url` with `address`.
pub fn rewrite_host(url: &Url, address: IpAddr) -> Result<Url, SearchError> {
    let mut rewritten = url.clone();
    rewritten
        .set_ip_host(address)
        .map_err(|_| SearchError::InvalidUrl(url.to_string()))?;
    Ok(rewritten)
}

#[cfg(feature = "network")]
pub use system_dns::SystemDnsBackend;

#[cfg(feature = "network")]
mod system_dns {
    use std::sync::Arc;

    use async_trait::async_trait;
    use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
    use trust_dns_resolver::TokioAsyncResolver;
    use url::Url;

    use super::{rewrite_host, SearchBackend};
    use crate::types::errors::SearchError;

    /// Resolves through the system resolver; suggestions go to `suggestions`.
    pub struct SystemDnsBackend {
        resolver: TokioAsyncResolver,
        suggestions: Arc<dyn SearchBackend>,
    }

    impl SystemDnsBackend {
        pub fn new(suggestions: Arc<dyn SearchBackend>) -> Self {
            Self {
                resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
                suggestions,
            }
        }
    }

    #[async_trait]
    impl SearchBackend for SystemDnsBackend {
        async fn fetch_suggestions(&self, query: &str) -> Result<Vec<String>, SearchError> {
            self.suggestions.fetch_suggestions(query).await
        }

        async fn resolve_domain(&self, url: &Url) -> Result<Url, SearchError> {
            let host = url
                .host_str()
                .ok_or_else(|| SearchError::InvalidUrl(url.to_string()))?;
            let lookup = self
                .resolver
                .lookup_ip(host)
                .await
                .map_err(|e| SearchError::ResolutionFailed(format!("{}: {}", host, e)))?;
            let address = lookup
                .iter()
                .next()
                .ok_or_else(|| SearchError::ResolutionFailed(format!("{}: no address records", host)))?;
            rewrite_host(url, address)
        }
    }
}
