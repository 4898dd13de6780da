//! UMLS Terminology Services concept search.
//!
//! Every search request needs a single-use service ticket, obtained from a
//! ticket-granting ticket (TGT) that is valid for eight hours.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::Endpoints;
use crate::models::{Concept, SearchType, TermResults};
use crate::sources::SourceError;
use crate::utils::HttpClient;

/// Service the tickets are issued for
const UMLS_SERVICE: &str = "http://umlsks.nlm.nih.gov";

/// Placeholder name UMLS returns instead of an empty result list
const NO_RESULTS: &str = "NO RESULTS";

const PAGE_SIZE: &str = "3";

/// Client for the UMLS authentication and search services
#[derive(Debug, Clone)]
pub struct UmlsClient {
    client: HttpClient,
    api_key: String,
    auth_base: String,
    rest_base: String,
}

impl UmlsClient {
    pub fn new(client: HttpClient, api_key: &str) -> Self {
        Self::from_endpoints(client, api_key, &Endpoints::default())
    }

    pub fn from_endpoints(client: HttpClient, api_key: &str, endpoints: &Endpoints) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            auth_base: endpoints.umls_auth.trim_end_matches('/').to_string(),
            rest_base: endpoints.umls_rest.trim_end_matches('/').to_string(),
        }
    }

    /// Request a ticket-granting ticket and return its URL
    pub async fn ticket_granting_url(&self) -> Result<String, SourceError> {
        let url = format!("{}/cas/v1/api-key", self.auth_base);
        let response = self
            .client
            .post(&url)
            .form(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to reach UMLS login: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "UMLS login returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        parse_form_action(&body)
            .ok_or_else(|| SourceError::Parse("UMLS login response has no TGT URL".to_string()))
    }

    /// Exchange the TGT for a service ticket.
    ///
    /// An expired TGT makes UMLS answer 500; `tgt_url` is then replaced with a
    /// fresh one and the exchange retried once.
    pub async fn service_ticket(&self, tgt_url: &mut String) -> Result<String, SourceError> {
        let mut refreshed = false;

        loop {
            let response = self
                .client
                .post(tgt_url.as_str())
                .form(&[("service", UMLS_SERVICE)])
                .send()
                .await
                .map_err(|e| {
                    SourceError::Network(format!("Failed to request service ticket: {}", e))
                })?;

            let status = response.status();
            if status == StatusCode::INTERNAL_SERVER_ERROR && !refreshed {
                tracing::info!("UMLS ticket-granting ticket rejected, requesting a new one");
                *tgt_url = self.ticket_granting_url().await?;
                refreshed = true;
                continue;
            }

            if !status.is_success() {
                return Err(SourceError::Api(format!(
                    "UMLS service ticket request returned status: {}",
                    status
                )));
            }

            return Ok(response.text().await?.trim().to_string());
        }
    }

    /// Search UMLS for each term, keeping the top three concepts.
    ///
    /// A single-word term with no matches is searched again with
    /// [`SearchType::Approximate`].
    pub async fn search<S: AsRef<str>>(
        &self,
        terms: &[S],
        search_type: SearchType,
    ) -> Result<Vec<TermResults>, SourceError> {
        let mut tgt_url = self.ticket_granting_url().await?;
        let mut results = Vec::with_capacity(terms.len());

        for term in terms {
            let term = term.as_ref();
            let concepts = self.search_term(term, search_type, &mut tgt_url).await?;

            let retry_approximate = is_empty_result(&concepts)
                && !term.contains(' ')
                && search_type != SearchType::Approximate;

            if retry_approximate {
                tracing::debug!("No {} matches for '{}', trying approximate", search_type, term);
                let concepts = self
                    .search_term(term, SearchType::Approximate, &mut tgt_url)
                    .await?;
                results.push(TermResults {
                    term: term.to_string(),
                    requested: search_type,
                    used: SearchType::Approximate,
                    concepts,
                });
            } else {
                results.push(TermResults {
                    term: term.to_string(),
                    requested: search_type,
                    used: search_type,
                    concepts,
                });
            }
        }

        Ok(results)
    }

    async fn search_term(
        &self,
        term: &str,
        search_type: SearchType,
        tgt_url: &mut String,
    ) -> Result<Vec<Concept>, SourceError> {
        let ticket = self.service_ticket(tgt_url).await?;
        let url = format!("{}/rest/search/current", self.rest_base);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("string", term),
                ("searchType", search_type.as_str()),
                ("ticket", ticket.as_str()),
                ("pageSize", PAGE_SIZE),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search UMLS: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "UMLS search returned status: {}",
                response.status()
            )));
        }

        let data: UmlsSearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        Ok(data
            .result
            .results
            .into_iter()
            .map(|r| Concept {
                name: r.name,
                cui: r.ui,
            })
            .collect())
    }
}

fn is_empty_result(concepts: &[Concept]) -> bool {
    concepts.first().map_or(true, |c| c.name == NO_RESULTS)
}

/// The TGT URL is the action of the HTML form UMLS returns
static FORM_ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"action="([^"]+)""#).expect("form action pattern is valid"));

fn parse_form_action(html: &str) -> Option<String> {
    FORM_ACTION
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

// ===== UMLS API Types =====

#[derive(Debug, Deserialize)]
struct UmlsSearchResponse {
    result: UmlsResult,
}

#[derive(Debug, Deserialize)]
struct UmlsResult {
    #[serde(default)]
    results: Vec<UmlsConcept>,
}

#[derive(Debug, Deserialize)]
struct UmlsConcept {
    ui: String,
    name: String,
}
