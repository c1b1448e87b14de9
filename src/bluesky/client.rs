// AT Protocol client — authenticated XRPC over HTTP.
//
// A thin reqwest wrapper with generic XRPC GET/POST helpers. Reads go
// through the account's PDS with the session token so that per-post viewer
// state (our own repost/like records) comes back populated.

use anyhow::{Context, Result};
use atrium_api::com::atproto::server::create_session;
use atrium_api::types::string::Did;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Default PDS endpoint for session creation and XRPC calls.
pub const DEFAULT_SERVICE_URL: &str = "https://bsky.social";

/// An authenticated session: the account DID plus its access token.
#[derive(Debug, Clone)]
pub struct Session {
    pub did: Did,
    pub handle: String,
    access_jwt: String,
}

/// HTTP client for AT Protocol XRPC endpoints.
pub struct AtpClient {
    client: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl AtpClient {
    /// Create a new client pointing at the given service URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("skycurate/0.1 (feed-curation)")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session: None,
        })
    }

    /// Log in with a handle (or email) and app password.
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<&Session> {
        let input = create_session::InputData {
            allow_takendown: None,
            auth_factor_token: None,
            identifier: identifier.to_string(),
            password: password.to_string(),
        };

        let output: create_session::Output = self
            .xrpc_post(create_session::NSID, &create_session::Input::from(input))
            .await
            .with_context(|| format!("Failed to log in as {identifier}"))?;
        let output = output.data;

        debug!(did = output.did.as_str(), "Session created");

        Ok(&*self.session.insert(Session {
            did: output.did,
            handle: output.handle.into(),
            access_jwt: output.access_jwt,
        }))
    }

    /// The active session, if logged in.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The logged-in account's DID, or an error before login.
    pub fn account_did(&self) -> Result<&str> {
        self.session
            .as_ref()
            .map(|s| s.did.as_str())
            .ok_or_else(|| anyhow::anyhow!("Not logged in"))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session {
            Some(session) => request.bearer_auth(&session.access_jwt),
            None => request,
        }
    }

    /// Make a GET request to an XRPC endpoint and deserialize the response.
    ///
    /// `nsid` is the XRPC method name (e.g. "app.bsky.feed.getFeed").
    /// `params` are query string key-value pairs.
    pub async fn xrpc_get<T: DeserializeOwned>(
        &self,
        nsid: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}/xrpc/{}", self.base_url, nsid);

        debug!(nsid = nsid, "XRPC GET request");

        let response = self
            .authorize(self.client.get(&url).query(params))
            .send()
            .await
            .with_context(|| format!("XRPC request failed: {nsid}"))?;

        decode(nsid, response).await
    }

    /// Make a POST request with a JSON body to an XRPC procedure.
    pub async fn xrpc_post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        nsid: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}/xrpc/{}", self.base_url, nsid);

        debug!(nsid = nsid, "XRPC POST request");

        let response = self
            .authorize(self.client.post(&url).json(body))
            .send()
            .await
            .with_context(|| format!("XRPC request failed: {nsid}"))?;

        decode(nsid, response).await
    }

    /// POST to an XRPC procedure whose response body we don't need.
    ///
    /// Some procedures (e.g. `com.atproto.repo.deleteRecord` on older PDS
    /// versions) answer with an empty body, so only the status is checked.
    pub async fn xrpc_call<B: Serialize + ?Sized>(&self, nsid: &str, body: &B) -> Result<()> {
        let url = format!("{}/xrpc/{}", self.base_url, nsid);

        debug!(nsid = nsid, "XRPC POST request");

        let response = self
            .authorize(self.client.post(&url).json(body))
            .send()
            .await
            .with_context(|| format!("XRPC request failed: {nsid}"))?;

        ensure_success(nsid, response).await.map(|_| ())
    }
}

async fn ensure_success(nsid: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("XRPC {nsid} returned {status}: {body}");
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(nsid: &str, response: reqwest::Response) -> Result<T> {
    ensure_success(nsid, response)
        .await?
        .json::<T>()
        .await
        .with_context(|| format!("Failed to deserialize {nsid} response"))
}
