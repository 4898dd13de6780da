//! doi.org handle resolver, the last resort for DOIs no registry knows.

use serde::Deserialize;

use crate::models::PreprintServer;
use crate::sources::SourceError;
use crate::utils::HttpClient;

const DOI_RESOLVER_BASE: &str = "https://doi.org";

/// Handle System response code for an unknown handle
const HANDLE_NOT_FOUND: i64 = 100;

/// Type tag of the handle value carrying the landing-page URL
const URL_VALUE_TYPE: &str = "URL";

/// Substring shared by the bioRxiv and medRxiv domains
const PREPRINT_DOMAIN_TOKEN: &str = "rxiv.org";

/// Journals absent from every registry, keyed by a domain token of their site
pub const KNOWN_UNREGISTERED: &[(&str, &str)] = &[("jthoracdis.com", "Journal of Thorasic Disease")];

/// What the resolver knows about a DOI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleLookup {
    /// The handle does not exist
    Missing,
    /// The handle exists and points at this URL
    Url(String),
}

/// Classification of a resolved article URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlClass {
    Preprint(PreprintServer),
    KnownUnregistered(&'static str),
    Unknown,
}

/// Client for the doi.org handles API
#[derive(Debug, Clone)]
pub struct DoiResolver {
    client: HttpClient,
    base_url: String,
}

impl DoiResolver {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, DOI_RESOLVER_BASE)
    }

    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve an already percent-encoded DOI to its target URL.
    ///
    /// doi.org reports unknown handles with HTTP 404 and a JSON body, so the
    /// body is read whatever the status.
    pub async fn resolve(&self, encoded_doi: &str) -> Result<HandleLookup, SourceError> {
        let url = format!("{}/api/handles/{}", self.base_url, encoded_doi);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to query doi.org: {}", e)))?;

        let status = response.status();
        let body = response.text().await?;

        let handle: HandleResponse = match serde_json::from_str(&body) {
            Ok(handle) => handle,
            Err(_) if !status.is_success() => {
                return Err(SourceError::Api(format!(
                    "doi.org returned status: {}",
                    status
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if handle.response_code == HANDLE_NOT_FOUND {
            return Ok(HandleLookup::Missing);
        }

        handle
            .target_url()
            .map(|url| HandleLookup::Url(url.to_string()))
            .ok_or_else(|| {
                SourceError::Parse(format!(
                    "doi.org handle {} has no URL value",
                    encoded_doi
                ))
            })
    }
}

/// Classify a resolved article URL.
///
/// Matching is case-sensitive, on the URL exactly as doi.org returned it.
pub fn classify_url(url: &str) -> UrlClass {
    if url.contains(PREPRINT_DOMAIN_TOKEN) {
        if url.contains("biorxiv") {
            return UrlClass::Preprint(PreprintServer::BioRxiv);
        }
        if url.contains("medrxiv") {
            return UrlClass::Preprint(PreprintServer::MedRxiv);
        }
    }

    KNOWN_UNREGISTERED
        .iter()
        .find(|(token, _)| url.contains(*token))
        .map_or(UrlClass::Unknown, |&(_, journal)| {
            UrlClass::KnownUnregistered(journal)
        })
}

// ===== Handle API Types =====

#[derive(Debug, Deserialize)]
struct HandleResponse {
    #[serde(rename = "responseCode")]
    response_code: i64,
    #[serde(default)]
    values: Vec<HandleValue>,
}

impl HandleResponse {
    /// The URL record is usually second, after HS_ADMIN, but not always
    fn target_url(&self) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value_type == URL_VALUE_TYPE)
            .and_then(|v| v.data.value.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct HandleValue {
    #[serde(rename = "type")]
    value_type: String,
    data: HandleData,
}

#[derive(Debug, Deserialize)]
struct HandleData {
    // HS_ADMIN values are objects, URL values are strings
    value: serde_json::Value,
}
