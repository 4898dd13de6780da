//! Twitter standard search for drug-name mentions.
//!
//! Authentication uses the application-only OAuth 2 flow: the percent-encoded
//! key and secret are exchanged for a bearer token that signs every search.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::models::Tweet;
use crate::sources::{encode_doi as percent_encode, SourceError};
use crate::utils::HttpClient;

const TWITTER_API_BASE: &str = "https://api.twitter.com";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Standard search allows 400 calls per 15-minute window
const SEARCH_WINDOW: Duration = Duration::from_secs(900);
const SEARCH_CALLS_PER_WINDOW: NonZeroU32 = nonzero!(400u32);

/// Tweets requested per search
pub const DEFAULT_TWEET_COUNT: u32 = 100;

/// Column of the drug CSV holding the drug names
pub const DRUG_COLUMN: &str = "word";

/// Holds the application credentials and the current bearer token
#[derive(Debug, Clone)]
pub struct BearerTokenHandler {
    client: HttpClient,
    base_url: String,
    api_key: String,
    api_secret: String,
    token: String,
}

impl BearerTokenHandler {
    /// Create a handler and obtain a bearer token
    pub async fn connect(
        client: HttpClient,
        base_url: &str,
        api_key: &str,
        api_secret: &str,
    ) -> Result<Self, SourceError> {
        let mut handler = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: percent_encode(api_key),
            api_secret: percent_encode(api_secret),
            token: String::new(),
        };
        handler.token = handler.bearer_token().await?;
        Ok(handler)
    }

    /// Base64 of `key:secret`, both percent-encoded
    pub fn bearer_credentials(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.api_key, self.api_secret))
    }

    /// POST a form to `url` with basic application credentials
    pub async fn request(&self, url: &str, form: &[(&str, &str)]) -> Result<Response, SourceError> {
        self.client
            .post(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Basic {}", self.bearer_credentials()),
            )
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(encode_form(form))
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Twitter request failed: {}", e)))
    }

    /// Request a new bearer token
    pub async fn bearer_token(&self) -> Result<String, SourceError> {
        let url = format!("{}/oauth2/token", self.base_url);
        let response = self
            .request(&url, &[("grant_type", "client_credentials")])
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Twitter token endpoint returned status: {}",
                response.status()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        if token.token_type != "bearer" {
            return Err(SourceError::Api(format!(
                "The token type should be \"bearer\". {} was received.",
                token.token_type
            )));
        }

        Ok(token.access_token)
    }

    /// Invalidate `token`, then fetch a fresh one.
    ///
    /// Returns `false` when Twitter refuses the invalidation.
    pub async fn invalidate_token(&mut self, token: &str) -> Result<bool, SourceError> {
        let url = format!("{}/oauth2/invalidate_token", self.base_url);
        let response = self.request(&url, &[("access_token", token)]).await?;

        if response.status() != StatusCode::OK {
            tracing::warn!("Twitter refused to invalidate token: {}", response.status());
            return Ok(false);
        }

        self.token = self.bearer_token().await?;
        Ok(true)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value of the `Authorization` header for API calls
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

fn encode_form(form: &[(&str, &str)]) -> String {
    form.iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Rate-limited Twitter search client
#[derive(Clone)]
pub struct TwitterClient {
    client: HttpClient,
    base_url: String,
    tokens: BearerTokenHandler,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TwitterClient {
    /// Authenticate against the public API
    pub async fn connect(
        client: HttpClient,
        api_key: &str,
        api_secret: &str,
    ) -> Result<Self, SourceError> {
        Self::connect_to(client, TWITTER_API_BASE, api_key, api_secret).await
    }

    /// Authenticate against the API at `base_url`
    pub async fn connect_to(
        client: HttpClient,
        base_url: &str,
        api_key: &str,
        api_secret: &str,
    ) -> Result<Self, SourceError> {
        let tokens = BearerTokenHandler::connect(client.clone(), base_url, api_key, api_secret).await?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            limiter: Arc::new(RateLimiter::direct(search_quota()?)),
        })
    }

    pub fn tokens(&self) -> &BearerTokenHandler {
        &self.tokens
    }

    /// Search recent tweets, waiting for the rate limiter first.
    ///
    /// A response without `statuses` means the window is exhausted.
    pub async fn search(
        &self,
        query: &str,
        count: u32,
        language: Option<&str>,
    ) -> Result<Vec<Status>, SourceError> {
        self.limiter.until_ready().await;

        let url = format!("{}/1.1/search/tweets.json", self.base_url);
        let count = count.to_string();
        let mut params = vec![
            ("q", query),
            ("count", count.as_str()),
            ("tweet_mode", "extended"),
        ];
        if let Some(lang) = language {
            params.push(("lang", lang));
        }

        let response = self
            .client
            .get(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                self.tokens.authorization_header(),
            )
            .query(&params)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search Twitter: {}", e)))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimit);
        }

        let data: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        data.statuses.ok_or(SourceError::RateLimit)
    }

    /// Search every drug in turn.
    ///
    /// Stops at the first rate-limit error and returns what was collected.
    pub async fn search_drugs<S: AsRef<str>>(&self, drugs: &[S]) -> Result<Vec<Tweet>, SourceError> {
        let mut tweets = Vec::new();

        for drug in drugs {
            let drug = drug.as_ref();
            match self.search(drug, DEFAULT_TWEET_COUNT, None).await {
                Ok(statuses) => {
                    tracing::debug!("{} tweets mention {}", statuses.len(), drug);
                    tweets.extend(extract_tweets(drug, &statuses));
                }
                Err(SourceError::RateLimit) => {
                    tracing::error!("Rate limit exceeded while searching for {}", drug);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(tweets)
    }

    /// Search a single keyword
    pub async fn search_by_keyword(&self, keyword: &str) -> Result<Vec<Tweet>, SourceError> {
        let statuses = self.search(keyword, DEFAULT_TWEET_COUNT, None).await?;
        Ok(extract_tweets(keyword, &statuses))
    }
}

/// Search calls evenly spaced so no 15-minute window exceeds the limit
fn search_quota() -> Result<Quota, SourceError> {
    Quota::with_period(SEARCH_WINDOW / SEARCH_CALLS_PER_WINDOW.get())
        .ok_or_else(|| SourceError::Other("Invalid search quota".to_string()))
}

/// Flatten search statuses into output rows
pub fn extract_tweets(drug: &str, statuses: &[Status]) -> Vec<Tweet> {
    statuses
        .iter()
        .map(|status| {
            let text = if status.retweeted {
                status
                    .retweeted_status
                    .as_ref()
                    .map(|rt| rt.full_text.clone())
                    .unwrap_or_else(|| status.full_text.clone())
            } else {
                status.full_text.clone()
            };

            Tweet {
                drug: drug.to_string(),
                tweet_id: status.id,
                user_id: status.user.id,
                username: status.user.screen_name.clone(),
                text,
            }
        })
        .collect()
}

/// Unique values of the `word` column, in first-seen order
pub fn load_drug_names(path: &Path) -> Result<Vec<String>, SourceError> {
    let mut reader = csv::Reader::from_path(path)?;
    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == DRUG_COLUMN)
        .ok_or_else(|| {
            SourceError::InvalidRequest(format!(
                "{} has no '{}' column",
                path.display(),
                DRUG_COLUMN
            ))
        })?;

    let mut seen = HashSet::new();
    let mut drugs = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(drug) = record.get(column).filter(|d| !d.trim().is_empty()) {
            if seen.insert(drug.to_string()) {
                drugs.push(drug.to_string());
            }
        }
    }

    Ok(drugs)
}

/// Write tweets as CSV with a header row
pub fn write_tweets(path: &Path, tweets: &[Tweet]) -> Result<(), SourceError> {
    let mut writer = csv::Writer::from_path(path)?;
    for tweet in tweets {
        writer.serialize(tweet)?;
    }
    writer.flush()?;
    Ok(())
}

// ===== Twitter API Types =====

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    statuses: Option<Vec<Status>>,
}

/// A tweet as returned by standard search in extended mode
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: u64,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub retweeted: bool,
    pub retweeted_status: Option<RetweetedStatus>,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetweetedStatus {
    #[serde(default)]
    pub full_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: u64,
    pub screen_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use tempfile::tempdir;

    async fn mock_token(server: &mut ServerGuard, hits: usize) -> mockito::Mock {
        server
            .mock("POST", "/oauth2/token")
            .expect(hits)
            .match_header("authorization", "Basic a2V5OnNlY3JldA==")
            .match_header("content-type", FORM_CONTENT_TYPE)
            .match_body("grant_type=client_credentials")
            .with_status(200)
            .with_body(r#"{"token_type":"bearer","access_token":"AAAA"}"#)
            .create_async()
            .await
    }

    fn status(id: u64, text: &str, retweet_text: Option<&str>) -> serde_json::Value {
        let mut value = serde_json::json!({
            "id": id,
            "full_text": text,
            "retweeted": retweet_text.is_some(),
            "user": {"id": 7, "screen_name": "pharma_watch"}
        });
        if let Some(rt) = retweet_text {
            value["retweeted_status"] = serde_json::json!({"full_text": rt});
        }
        value
    }

    #[test]
    fn test_extract_tweets_prefers_retweeted_text() {
        let statuses: Vec<Status> = serde_json::from_value(serde_json::json!([
            status(1, "original", None),
            status(2, "RT @x: truncated…", Some("full retweeted text")),
        ]))
        .unwrap();

        let tweets = extract_tweets("aspirin", &statuses);
        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0].text, "original");
        assert_eq!(tweets[1].text, "full retweeted text");
        assert_eq!(tweets[1].username, "pharma_watch");
        assert_eq!(tweets[1].drug, "aspirin");
    }

    #[test]
    fn test_search_quota_stays_within_window() {
        use governor::clock::FakeRelativeClock;

        let clock = FakeRelativeClock::default();
        let limiter = RateLimiter::direct_with_clock(search_quota().unwrap(), &clock);

        let mut allowed = 0;
        for _ in 0..9000 {
            if limiter.check().is_ok() {
                allowed += 1;
            }
            clock.advance(Duration::from_millis(100));
        }

        assert!(allowed <= SEARCH_CALLS_PER_WINDOW.get());
        assert!(allowed >= 390);
    }

    #[test]
    fn test_load_drug_names_unique_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("drugs.csv");
        std::fs::write(&path, "word,count\nPegasys,3\naspirin,1\nPegasys,9\n,2\n").unwrap();

        let drugs = load_drug_names(&path).unwrap();
        assert_eq!(drugs, vec!["Pegasys".to_string(), "aspirin".to_string()]);
    }

    #[test]
    fn test_write_tweets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tweets.csv");
        let tweets = vec![Tweet {
            drug: "aspirin".to_string(),
            tweet_id: 1,
            user_id: 7,
            username: "pharma_watch".to_string(),
            text: "hello, world".to_string(),
        }];

        write_tweets(&path, &tweets).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "drug,tweet_id,user_id,username,text\naspirin,1,7,pharma_watch,\"hello, world\"\n"
        );
    }

    #[tokio::test]
    async fn test_connect_and_search() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server, 1).await;
        let search = server
            .mock("GET", "/1.1/search/tweets.json")
            .match_header("authorization", "Bearer AAAA")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "peginterferon alfa".into()),
                Matcher::UrlEncoded("count".into(), "100".into()),
                Matcher::UrlEncoded("tweet_mode".into(), "extended".into()),
            ]))
            .with_status(200)
            .with_body(
                serde_json::json!({"statuses": [status(10, "peginterferon alfa works", None)]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = TwitterClient::connect_to(HttpClient::new().unwrap(), &server.url(), "key", "secret")
            .await
            .unwrap();
        assert_eq!(client.tokens().token(), "AAAA");

        let tweets = client.search_by_keyword("peginterferon alfa").await.unwrap();
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].tweet_id, 10);

        token.assert_async().await;
        search.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_bearer_token_rejected() {
        let mut server = Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth2/token")
            .with_status(200)
            .with_body(r#"{"token_type":"mac","access_token":"AAAA"}"#)
            .create_async()
            .await;

        let result =
            TwitterClient::connect_to(HttpClient::new().unwrap(), &server.url(), "key", "secret")
                .await;
        assert!(matches!(result, Err(SourceError::Api(_))));
    }

    #[tokio::test]
    async fn test_search_drugs_stops_at_rate_limit() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let _first = server
            .mock("GET", "/1.1/search/tweets.json")
            .match_query(Matcher::UrlEncoded("q".into(), "aspirin".into()))
            .with_status(200)
            .with_body(serde_json::json!({"statuses": [status(1, "aspirin", None)]}).to_string())
            .create_async()
            .await;
        let _limited = server
            .mock("GET", "/1.1/search/tweets.json")
            .match_query(Matcher::UrlEncoded("q".into(), "ibuprofen".into()))
            .with_status(200)
            .with_body(r#"{"errors":[{"code":88,"message":"Rate limit exceeded"}]}"#)
            .create_async()
            .await;
        let never = server
            .mock("GET", "/1.1/search/tweets.json")
            .match_query(Matcher::UrlEncoded("q".into(), "naproxen".into()))
            .expect(0)
            .create_async()
            .await;

        let client = TwitterClient::connect_to(HttpClient::new().unwrap(), &server.url(), "key", "secret")
            .await
            .unwrap();
        let tweets = client
            .search_drugs(&["aspirin", "ibuprofen", "naproxen"])
            .await
            .unwrap();

        assert_eq!(tweets.len(), 1);
        never.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalidate_token_refreshes() {
        let mut server = Server::new_async().await;
        let token = mock_token(&mut server, 2).await;
        let _invalidate = server
            .mock("POST", "/oauth2/invalidate_token")
            .match_body("access_token=AAAA")
            .with_status(200)
            .with_body(r#"{"access_token":"AAAA"}"#)
            .create_async()
            .await;

        let mut handler =
            BearerTokenHandler::connect(HttpClient::new().unwrap(), &server.url(), "key", "secret")
                .await
                .unwrap();
        assert!(handler.invalidate_token("AAAA").await.unwrap());
        assert_eq!(handler.token(), "AAAA");
        assert_eq!(handler.authorization_header(), "Bearer AAAA");
        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalidate_token_refused() {
        let mut server = Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let _invalidate = server
            .mock("POST", "/oauth2/invalidate_token")
            .with_status(403)
            .create_async()
            .await;

        let mut handler =
            BearerTokenHandler::connect(HttpClient::new().unwrap(), &server.url(), "key", "secret")
                .await
                .unwrap();
        assert!(!handler.invalidate_token("AAAA").await.unwrap());
    }
}
