//! Configuration management.
//!
//! Settings are read from an optional file (TOML, INI or JSON, chosen by
//! extension) layered under environment variables prefixed `LITLOOKUP_`,
//! with `__` separating nested keys:
//!
//! ```toml
//! [api_keys]
//! umls = "your-umls-key"
//! twitter_key = "key"
//! twitter_secret = "secret"
//!
//! [endpoints]
//! crossref = "https://api.crossref.org"
//!
//! [http]
//! timeout_secs = 30
//! mailto = "you@example.org"
//! ```
//!
//! e.g. `LITLOOKUP_HTTP__TIMEOUT_SECS=60`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for various services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Base URLs of the remote services
    #[serde(default)]
    pub endpoints: Endpoints,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// API keys for external services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeys {
    /// UMLS Terminology Services API key
    #[serde(default = "env_umls_key")]
    pub umls: Option<String>,

    /// Twitter application key
    #[serde(default = "env_twitter_key")]
    pub twitter_key: Option<String>,

    /// Twitter application secret
    #[serde(default = "env_twitter_secret")]
    pub twitter_secret: Option<String>,
}

impl Default for ApiKeys {
    fn default() -> Self {
        Self {
            umls: env_umls_key(),
            twitter_key: env_twitter_key(),
            twitter_secret: env_twitter_secret(),
        }
    }
}

fn env_umls_key() -> Option<String> {
    std::env::var("UMLS_API_KEY").ok()
}

fn env_twitter_key() -> Option<String> {
    std::env::var("TWITTER_API_KEY").ok()
}

fn env_twitter_secret() -> Option<String> {
    std::env::var("TWITTER_API_SECRET").ok()
}

/// Base URLs, without trailing slash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_crossref")]
    pub crossref: String,

    #[serde(default = "default_medra")]
    pub medra: String,

    #[serde(default = "default_doi_resolver")]
    pub doi_resolver: String,

    /// UMLS ticket-granting service
    #[serde(default = "default_umls_auth")]
    pub umls_auth: String,

    /// UMLS REST search service
    #[serde(default = "default_umls_rest")]
    pub umls_rest: String,

    #[serde(default = "default_twitter")]
    pub twitter: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            crossref: default_crossref(),
            medra: default_medra(),
            doi_resolver: default_doi_resolver(),
            umls_auth: default_umls_auth(),
            umls_rest: default_umls_rest(),
            twitter: default_twitter(),
        }
    }
}

fn default_crossref() -> String {
    "https://api.crossref.org".to_string()
}

fn default_medra() -> String {
    "https://api.medra.org".to_string()
}

fn default_doi_resolver() -> String {
    "https://doi.org".to_string()
}

fn default_umls_auth() -> String {
    "https://utslogin.nlm.nih.gov".to_string()
}

fn default_umls_rest() -> String {
    "https://uts-ws.nlm.nih.gov".to_string()
}

fn default_twitter() -> String {
    "https://api.twitter.com".to_string()
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Contact address sent to Crossref for its polite pool
    #[serde(default)]
    pub mailto: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            mailto: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("LITLOOKUP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}

/// Look for a config file in the working directory, then the user config dir
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("litlookup.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("litlookup").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Get the default configuration (from env vars or defaults)
pub fn get_config() -> Config {
    Config::default()
}
