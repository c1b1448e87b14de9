use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::time::Duration;
use tracing::info;

use skycurate::bluesky::client::AtpClient;
use skycurate::bluesky::feed::SourceSpec;
use skycurate::config::Config;
use skycurate::curation::filter::FilterRules;
use skycurate::curation::select::BacklogLimits;
use skycurate::pipeline::latest_run::{self, LatestSettings};
use skycurate::pipeline::repost_run::{self, RepostSettings};

/// Skycurate: feed curation and re-broadcast for Bluesky.
///
/// Scans a feed, list or list timeline, picks posts by recency, author
/// diversity and content shape, and reposts + likes them at a gentle pace.
#[derive(Parser)]
#[command(name = "skycurate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repost the recent backlog of a feed, oldest first
    Repost {
        #[command(flatten)]
        source: SourceArgs,

        /// Entries to fetch per feed (API max 100)
        #[arg(long, default_value_t = repost_run::DEFAULT_FETCH_LIMIT)]
        limit: usize,

        /// Only consider posts from the last N hours
        #[arg(
            long,
            default_value_t = repost_run::DEFAULT_HOURS_BACK,
            value_parser = clap::value_parser!(i64).range(0..)
        )]
        hours_back: i64,

        /// Max reposts per author per run
        #[arg(long, default_value_t = repost_run::DEFAULT_MAX_PER_AUTHOR)]
        max_per_author: usize,

        /// Max reposts per run
        #[arg(long, default_value_t = repost_run::DEFAULT_MAX_PER_RUN)]
        max_per_run: usize,

        /// Seconds to wait between reposts
        #[arg(long, default_value_t = repost_run::DEFAULT_DELAY.as_secs())]
        delay_secs: u64,

        /// Skip quote-posts
        #[arg(long)]
        original_only: bool,

        /// Only repost posts with images or video
        #[arg(long)]
        media_only: bool,

        /// Show what would be reposted without doing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Keep one repost per author, always on their newest photo/video post
    Latest {
        #[command(flatten)]
        source: SourceArgs,

        /// Entries to fetch per feed (API max 100)
        #[arg(long, default_value_t = latest_run::DEFAULT_FETCH_LIMIT)]
        limit: usize,

        /// Max distinct authors per run
        #[arg(long, default_value_t = latest_run::DEFAULT_MAX_AUTHORS)]
        max_authors: usize,

        /// Seconds to wait between authors
        #[arg(long, default_value_t = latest_run::DEFAULT_DELAY.as_secs())]
        delay_secs: u64,

        /// Show what would be promoted without doing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show ledger and configuration status
    Status,
}

/// Where to read candidates from. At most one may be given.
#[derive(clap::Args)]
struct SourceArgs {
    /// Feed generator URI (at://.../app.bsky.feed.generator/...)
    #[arg(long, conflicts_with_all = ["list_members", "list"])]
    feed: Option<String>,

    /// List URI; reads each member's own feed
    #[arg(long, conflicts_with = "list")]
    list_members: Option<String>,

    /// List URI; reads the list's timeline
    #[arg(long)]
    list: Option<String>,
}

impl SourceArgs {
    /// The explicitly chosen source, or `fallback` when no flag was given.
    fn resolve(self, fallback: Option<SourceSpec>) -> Result<SourceSpec> {
        if let Some(uri) = self.feed {
            return Ok(SourceSpec::Generator(uri));
        }
        if let Some(uri) = self.list_members {
            return Ok(SourceSpec::ListMembers(uri));
        }
        if let Some(uri) = self.list {
            return Ok(SourceSpec::ListFeed(uri));
        }
        fallback.ok_or_else(|| {
            anyhow::anyhow!(
                "No source given. Pass --feed, --list-members or --list,\n\
                 or set SKYCURATE_FEED_URI / SKYCURATE_LIST_URI in your .env file."
            )
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("skycurate=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Repost {
            source,
            limit,
            hours_back,
            max_per_author,
            max_per_run,
            delay_secs,
            original_only,
            media_only,
            dry_run,
        } => {
            let config = Config::load()?;
            config.require_credentials()?;
            let source = source.resolve(config.feed_uri.clone().map(SourceSpec::Generator))?;

            let settings = RepostSettings {
                fetch_limit: limit,
                rules: FilterRules {
                    original_only,
                    media_only,
                    window_hours: Some(hours_back),
                },
                limits: BacklogLimits {
                    max_per_author,
                    max_per_run,
                },
                delay: Duration::from_secs(delay_secs),
                dry_run,
                ..RepostSettings::new(source)
            };

            let mut ledger = skycurate::ledger::open_ledger(&config.ledger_path)?;
            let client = login(&config).await?;
            let repo = client.account_did()?.to_string();

            println!("Reposting from {}...", settings.source);

            let summary = repost_run::run(
                &client,
                &client,
                &repo,
                ledger.as_mut(),
                &settings,
                Utc::now(),
            )
            .await?;

            if dry_run {
                skycurate::output::terminal::display_selection(&summary);
            }
            println!("\n{}", "Repost run complete.".bold());
            skycurate::output::terminal::display_summary(&summary);
        }

        Commands::Latest {
            source,
            limit,
            max_authors,
            delay_secs,
            dry_run,
        } => {
            let config = Config::load()?;
            config.require_credentials()?;
            let source = source.resolve(config.list_uri.clone().map(SourceSpec::ListFeed))?;

            let settings = LatestSettings {
                fetch_limit: limit,
                max_authors,
                delay: Duration::from_secs(delay_secs),
                dry_run,
                ..LatestSettings::new(source)
            };

            let client = login(&config).await?;
            let repo = client.account_did()?.to_string();

            println!("Promoting newest media per author from {}...", settings.source);

            let summary =
                latest_run::run(&client, &client, &repo, &settings, Utc::now()).await?;

            if dry_run {
                skycurate::output::terminal::display_selection(&summary);
            }
            println!("\n{}", "Latest run complete.".bold());
            skycurate::output::terminal::display_summary(&summary);
        }

        Commands::Status => {
            let config = Config::load()?;
            skycurate::status::show(&config)?;
        }
    }

    info!(
        finished_at = %Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        "Run finished"
    );

    Ok(())
}

/// Create a client and log in with the configured credentials.
async fn login(config: &Config) -> Result<AtpClient> {
    let mut client = AtpClient::new(&config.service_url)?;
    let session = client
        .login(&config.bluesky_handle, &config.bluesky_app_password)
        .await?;
    info!(handle = %session.handle, did = session.did.as_str(), "Logged in");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours_back(arg: &str) -> Result<i64, clap::Error> {
        let flag = format!("--hours-back={arg}");
        let cli = Cli::try_parse_from(["skycurate", "repost", "--feed", "at://f", flag.as_str()])?;
        match cli.command {
            Commands::Repost { hours_back, .. } => Ok(hours_back),
            _ => unreachable!(),
        }
    }

    #[test]
    fn hours_back_accepts_large_values() {
        assert_eq!(hours_back("2").unwrap(), 2);
        assert_eq!(hours_back("9223372036854775807").unwrap(), i64::MAX);
    }

    #[test]
    fn hours_back_rejects_negative_values() {
        assert!(hours_back("-1").is_err());
    }
}
