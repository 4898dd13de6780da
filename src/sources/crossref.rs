//! CrossRef works registry.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::sources::{MetadataRegistry, RegistryAnswer, SourceError};
use crate::utils::HttpClient;

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// CrossRef research source
///
/// Uses the CrossRef REST API `works` endpoint for DOI metadata lookup.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: HttpClient,
    base_url: String,
}

impl CrossRefSource {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, CROSSREF_API_BASE)
    }

    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MetadataRegistry for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    async fn lookup_journal(&self, encoded_doi: &str) -> Result<RegistryAnswer, SourceError> {
        let url = format!("{}/works/{}", self.base_url, encoded_doi);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch DOI from CrossRef: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(format!(
                "CrossRef has no record for {}",
                encoded_doi
            )));
        }

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "CrossRef API returned status: {}",
                response.status()
            )));
        }

        let data: CRWorkResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        // An empty container-title list is what CrossRef returns for posted
        // content such as bioRxiv preprints.
        Ok(match data.message.container_title.into_iter().next() {
            Some(journal) => RegistryAnswer::Journal(journal),
            None => RegistryAnswer::NoContainerTitle,
        })
    }
}

// ===== CrossRef API Types =====

#[derive(Debug, Deserialize)]
struct CRWorkResponse {
    message: CRWork,
}

#[derive(Debug, Deserialize)]
struct CRWork {
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn source(base_url: &str) -> CrossRefSource {
        CrossRefSource::with_base_url(HttpClient::new().unwrap(), base_url)
    }

    #[tokio::test]
    async fn test_lookup_returns_first_container_title() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.2217%2Fcns-2016-0001")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"ok","message":{"DOI":"10.2217/cns-2016-0001",
                    "container-title":["CNS Oncology","CNS Oncol"]}}"#,
            )
            .create_async()
            .await;

        let answer = source(&server.url())
            .lookup_journal("10.2217%2Fcns-2016-0001")
            .await
            .unwrap();

        assert_eq!(answer, RegistryAnswer::Journal("CNS Oncology".to_string()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_empty_container_title() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/works/10.1101%2F001727")
            .with_status(200)
            .with_body(r#"{"message":{"container-title":[]}}"#)
            .create_async()
            .await;

        let answer = source(&server.url())
            .lookup_journal("10.1101%2F001727")
            .await
            .unwrap();

        assert_eq!(answer, RegistryAnswer::NoContainerTitle);
    }

    #[tokio::test]
    async fn test_lookup_not_found_is_recoverable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/works/10.9999%2Fmissing")
            .with_status(404)
            .with_body("Resource not found.")
            .create_async()
            .await;

        let err = source(&server.url())
            .lookup_journal("10.9999%2Fmissing")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_lookup_server_error_is_fatal() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/works/10.9999%2Fboom")
            .with_status(503)
            .create_async()
            .await;

        let err = source(&server.url())
            .lookup_journal("10.9999%2Fboom")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::Api(_)));
    }
}
