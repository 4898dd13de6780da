use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use litlookup::config::{find_config_file, get_config, load_config, Config};
use litlookup::models::SearchType;
use litlookup::sources::twitter::{load_drug_names, write_tweets, TwitterClient};
use litlookup::sources::umls::UmlsClient;
use litlookup::sources::JournalResolver;
use litlookup::ui::{self, Status};
use litlookup::utils::HttpClient;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// litlookup - Fill in journal names, search UMLS concepts and collect drug tweets
#[derive(Parser, Debug)]
#[command(name = "litlookup")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch lookups for literature mining", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress progress and non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fill in missing journal names in a metadata CSV
    #[command(alias = "j")]
    Journals {
        /// CSV with `journal` and `doi` columns
        #[arg(long, short)]
        metadata: PathBuf,

        /// Where to write the enriched table (default: overwrite the input)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search UMLS concepts for one or more terms
    Umls {
        /// Search type: words, exact or approximate
        #[arg(long, short, default_value = "words")]
        search_type: SearchType,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Terms to search
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Collect tweets from the standard search API
    Tweets {
        #[command(subcommand)]
        command: TweetCommands,
    },
}

#[derive(Subcommand, Debug)]
enum TweetCommands {
    /// Search every drug in a CSV `word` column
    Drugs {
        /// CSV with a `word` column
        #[arg(long, short)]
        input: PathBuf,

        /// Output CSV
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Search a single keyword
    Keyword {
        keyword: String,

        /// Output CSV
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("litlookup={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration from file if specified or found in default locations
    let mut config = if let Some(config_path) = &cli.config {
        load_config(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if let Some(config_path) = find_config_file() {
        tracing::info!("Using config file: {}", config_path.display());
        load_config(&config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else {
        get_config()
    };

    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }

    let client = HttpClient::from_config(&config.http)?;

    match cli.command {
        Commands::Journals {
            metadata,
            output,
            json,
        } => {
            let output = output.unwrap_or_else(|| metadata.clone());
            let resolver = JournalResolver::from_endpoints(client, &config.endpoints);
            let progress = ui::row_progress(cli.quiet);

            let summary = litlookup::run_journals(&resolver, &metadata, &output, &progress)
                .await
                .with_context(|| {
                    format!(
                        "Journal lookup stopped; partial results written to {}",
                        output.display()
                    )
                })?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                ui::print_summary(&summary);
            }
            if !cli.quiet {
                ui::print_status(Status::Success, &format!("Wrote {}", output.display()));
            }
        }

        Commands::Umls {
            search_type,
            json,
            terms,
        } => {
            let api_key = config
                .api_keys
                .umls
                .as_deref()
                .context("No UMLS API key: set UMLS_API_KEY or api_keys.umls")?;
            let umls = UmlsClient::from_endpoints(client, api_key, &config.endpoints);

            let spinner = ui::spinner("Searching UMLS", cli.quiet);
            let results = umls.search(&terms, search_type).await;
            spinner.finish_and_clear();
            let results = results.context("UMLS search failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                ui::print_term_results(&results);
            }
        }

        Commands::Tweets { command } => {
            let twitter = connect_twitter(client, &config).await?;

            let (tweets, searched, output) = match command {
                TweetCommands::Drugs { input, output } => {
                    let drugs = load_drug_names(&input)
                        .with_context(|| format!("Failed to read drugs from {}", input.display()))?;
                    tracing::info!("Searching tweets for {} drugs", drugs.len());
                    (twitter.search_drugs(&drugs).await?, drugs.len(), output)
                }
                TweetCommands::Keyword { keyword, output } => {
                    (twitter.search_by_keyword(&keyword).await?, 1, output)
                }
            };

            write_tweets(&output, &tweets)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            if !cli.quiet {
                ui::print_status(
                    Status::Success,
                    &format!("{} written to {}", ui::tweet_batch_line(&tweets, searched), output.display()),
                );
            }
        }
    }

    Ok(())
}

async fn connect_twitter(client: HttpClient, config: &Config) -> Result<TwitterClient> {
    let key = config
        .api_keys
        .twitter_key
        .as_deref()
        .context("No Twitter API key: set TWITTER_API_KEY or api_keys.twitter_key")?;
    let secret = config
        .api_keys
        .twitter_secret
        .as_deref()
        .context("No Twitter API secret: set TWITTER_API_SECRET or api_keys.twitter_secret")?;

    TwitterClient::connect_to(client, &config.endpoints.twitter, key, secret)
        .await
        .context("Twitter authentication failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_requires_command() {
        assert!(Cli::try_parse_from(["litlookup"]).is_err());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["litlookup", "-v", "journals", "-m", "meta.csv"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["litlookup", "journals", "-m", "meta.csv", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_and_timeout() {
        let cli = Cli::parse_from(["litlookup", "-q", "--timeout", "60", "journals", "-m", "m.csv"]);
        assert!(cli.quiet);
        assert_eq!(cli.timeout, Some(60));
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_cli_config_flag() {
        let cli = Cli::parse_from([
            "litlookup",
            "--config",
            "/path/to/config.toml",
            "journals",
            "-m",
            "m.csv",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
    }

    #[test]
    fn test_cli_journals_command() {
        let cli = Cli::parse_from(["litlookup", "journals", "--metadata", "metadata.csv"]);
        match &cli.command {
            Commands::Journals {
                metadata,
                output,
                json,
            } => {
                assert_eq!(metadata, &PathBuf::from("metadata.csv"));
                assert!(output.is_none());
                assert!(!*json);
            }
            _ => panic!("Expected Journals command"),
        }
    }

    #[test]
    fn test_cli_umls_command() {
        let cli = Cli::parse_from(["litlookup", "umls", "Pegasys", "IFN alpha 2a"]);
        match &cli.command {
            Commands::Umls {
                search_type, terms, ..
            } => {
                assert_eq!(*search_type, SearchType::Words);
                assert_eq!(terms, &vec!["Pegasys".to_string(), "IFN alpha 2a".to_string()]);
            }
            _ => panic!("Expected Umls command"),
        }
    }

    #[test]
    fn test_cli_umls_search_type() {
        let cli = Cli::parse_from(["litlookup", "umls", "--search-type", "exact", "aspirin"]);
        assert!(matches!(
            cli.command,
            Commands::Umls {
                search_type: SearchType::Exact,
                ..
            }
        ));

        assert!(Cli::try_parse_from(["litlookup", "umls", "-s", "fuzzy", "aspirin"]).is_err());
        assert!(Cli::try_parse_from(["litlookup", "umls"]).is_err());
    }

    #[test]
    fn test_cli_tweets_commands() {
        let cli = Cli::parse_from([
            "litlookup", "tweets", "drugs", "--input", "drugs.csv", "--output", "tweets.csv",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Tweets {
                command: TweetCommands::Drugs { .. }
            }
        ));

        let cli = Cli::parse_from(["litlookup", "tweets", "keyword", "Pegasys", "-o", "t.csv"]);
        match &cli.command {
            Commands::Tweets {
                command: TweetCommands::Keyword { keyword, output },
            } => {
                assert_eq!(keyword, "Pegasys");
                assert_eq!(output, &PathBuf::from("t.csv"));
            }
            _ => panic!("Expected Tweets keyword command"),
        }
    }
}
