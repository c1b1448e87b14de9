use std::env;
use std::path::PathBuf;

use anyhow::Result;

use crate::bluesky::client::DEFAULT_SERVICE_URL;

/// Default location of the repost ledger (one AT-URI per line).
pub const DEFAULT_LEDGER_PATH: &str = "./reposted.txt";

/// Central configuration loaded from environment variables.
///
/// Credentials come from env vars (never hardcoded). The .env file is loaded
/// automatically at startup via dotenvy. Per-run limits live in the CLI
/// arguments, not here.
pub struct Config {
    pub bluesky_handle: String,
    pub bluesky_app_password: String,
    /// PDS used for login, reads and record writes.
    pub service_url: String,
    pub ledger_path: PathBuf,
    /// Feed generator used by `repost` when no source flag is given.
    pub feed_uri: Option<String>,
    /// List used by `latest` when `--list` is not given.
    pub list_uri: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Ok(Self {
            bluesky_handle: env::var("BLUESKY_HANDLE").unwrap_or_default(),
            bluesky_app_password: env::var("BLUESKY_APP_PASSWORD").unwrap_or_default(),
            service_url: env::var("PDS_URL").unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string()),
            ledger_path: env::var("SKYCURATE_LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LEDGER_PATH)),
            feed_uri: non_empty_var("SKYCURATE_FEED_URI"),
            list_uri: non_empty_var("SKYCURATE_LIST_URI"),
        })
    }

    /// Check that login credentials are configured.
    /// Call this before anything that talks to the PDS.
    pub fn require_credentials(&self) -> Result<()> {
        if self.bluesky_handle.is_empty() {
            anyhow::bail!(
                "BLUESKY_HANDLE not set. Add it to your .env file.\n\
                 See .env.example for the required variables."
            );
        }
        if self.bluesky_app_password.is_empty() {
            anyhow::bail!(
                "BLUESKY_APP_PASSWORD not set. Reposting requires authentication.\n\
                 Add it to your .env file. See .env.example for details."
            );
        }
        Ok(())
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(handle: &str, password: &str) -> Config {
        Config {
            bluesky_handle: handle.to_string(),
            bluesky_app_password: password.to_string(),
            service_url: DEFAULT_SERVICE_URL.to_string(),
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            feed_uri: None,
            list_uri: None,
        }
    }

    #[test]
    fn missing_handle_is_fatal() {
        let err = config("", "pw").require_credentials().unwrap_err();
        assert!(err.to_string().contains("BLUESKY_HANDLE"));
    }

    #[test]
    fn missing_password_is_fatal() {
        let err = config("me.bsky.social", "").require_credentials().unwrap_err();
        assert!(err.to_string().contains("BLUESKY_APP_PASSWORD"));
    }

    #[test]
    fn complete_credentials_pass() {
        assert!(config("me.bsky.social", "pw").require_credentials().is_ok());
    }
}
