// Record writes — creating and deleting repost and like records.
//
// Reposts and likes are ordinary records in the account's repo, written via
// `com.atproto.repo.createRecord` and removed via `deleteRecord` by record
// key. The record key of an existing action is the last path segment of its
// AT-URI.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use atrium_api::app::bsky::feed::{like, repost};
use atrium_api::com::atproto::repo::{create_record, delete_record, strong_ref};
use atrium_api::record::KnownRecord;
use atrium_api::types::string::{AtIdentifier, Cid, Datetime, Nsid, RecordKey};
use atrium_api::types::TryIntoUnknown;
use tracing::debug;

use super::client::AtpClient;
use crate::curation::models::ContentRef;

pub const REPOST_COLLECTION: &str = "app.bsky.feed.repost";
pub const LIKE_COLLECTION: &str = "app.bsky.feed.like";

/// Which kind of promotional record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Repost,
    Like,
}

impl ActionKind {
    pub fn collection(self) -> &'static str {
        match self {
            ActionKind::Repost => REPOST_COLLECTION,
            ActionKind::Like => LIKE_COLLECTION,
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ActionKind::Repost => "repost",
            ActionKind::Like => "like",
        })
    }
}

/// Extract the record key from a record AT-URI
/// (`at://did/collection/rkey` → `rkey`).
///
/// Returns `None` when the URI has no path separator or ends in one.
pub fn rkey_from_uri(uri: &str) -> Option<&str> {
    let (_, rkey) = uri.rsplit_once('/')?;
    if rkey.is_empty() {
        None
    } else {
        Some(rkey)
    }
}

/// Write side of the remote service.
///
/// `repo` is the acting account's DID. Create calls return the AT-URI of the
/// new record.
#[async_trait]
pub trait RemoteActions: Send + Sync {
    async fn create_repost(
        &self,
        repo: &str,
        subject: &ContentRef,
        created_at: &Datetime,
    ) -> Result<String>;

    async fn create_like(
        &self,
        repo: &str,
        subject: &ContentRef,
        created_at: &Datetime,
    ) -> Result<String>;

    async fn delete_repost(&self, repo: &str, rkey: &str) -> Result<()>;

    async fn delete_like(&self, repo: &str, rkey: &str) -> Result<()>;

    /// Create a record of the given kind.
    async fn create(
        &self,
        kind: ActionKind,
        repo: &str,
        subject: &ContentRef,
        created_at: &Datetime,
    ) -> Result<String> {
        match kind {
            ActionKind::Repost => self.create_repost(repo, subject, created_at).await,
            ActionKind::Like => self.create_like(repo, subject, created_at).await,
        }
    }

    /// Delete a record of the given kind by record key.
    async fn delete(&self, kind: ActionKind, repo: &str, rkey: &str) -> Result<()> {
        match kind {
            ActionKind::Repost => self.delete_repost(repo, rkey).await,
            ActionKind::Like => self.delete_like(repo, rkey).await,
        }
    }
}

/// Build the repost or like record pointing at `subject`.
pub fn subject_record(
    kind: ActionKind,
    subject: &ContentRef,
    created_at: &Datetime,
) -> Result<KnownRecord> {
    let cid = subject
        .cid
        .parse::<Cid>()
        .map_err(|e| anyhow!("Invalid CID {} for {}: {e}", subject.cid, subject.uri))?;
    let subject: strong_ref::Main = strong_ref::MainData {
        cid,
        uri: subject.uri.clone(),
    }
    .into();
    let created_at = created_at.clone();

    Ok(match kind {
        ActionKind::Repost => repost::RecordData {
            created_at,
            subject,
            via: None,
        }
        .into(),
        ActionKind::Like => like::RecordData {
            created_at,
            subject,
            via: None,
        }
        .into(),
    })
}

fn collection_nsid(kind: ActionKind) -> Result<Nsid> {
    kind.collection()
        .parse::<Nsid>()
        .map_err(|e| anyhow!("Invalid collection {}: {e}", kind.collection()))
}

fn repo_identifier(repo: &str) -> Result<AtIdentifier> {
    repo.parse::<AtIdentifier>()
        .map_err(|e| anyhow!("Invalid repo identifier {repo}: {e}"))
}

impl AtpClient {
    async fn create_subject_record(
        &self,
        kind: ActionKind,
        repo: &str,
        subject: &ContentRef,
        created_at: &Datetime,
    ) -> Result<String> {
        let record = subject_record(kind, subject, created_at)?
            .try_into_unknown()
            .with_context(|| format!("Failed to encode {kind} record"))?;
        let input = create_record::InputData {
            collection: collection_nsid(kind)?,
            record,
            repo: repo_identifier(repo)?,
            rkey: None,
            swap_commit: None,
            validate: None,
        };

        let output: create_record::Output = self
            .xrpc_post(create_record::NSID, &create_record::Input::from(input))
            .await
            .with_context(|| format!("Failed to create {kind} for {}", subject.uri))?;

        debug!(uri = %output.uri, "Created record");
        Ok(output.data.uri)
    }

    async fn delete_record(&self, kind: ActionKind, repo: &str, rkey: &str) -> Result<()> {
        let input = delete_record::InputData {
            collection: collection_nsid(kind)?,
            repo: repo_identifier(repo)?,
            rkey: RecordKey::new(rkey.to_string())
                .map_err(|e| anyhow!("Invalid record key {rkey}: {e}"))?,
            swap_commit: None,
            swap_record: None,
        };

        self.xrpc_call(delete_record::NSID, &delete_record::Input::from(input))
            .await
            .with_context(|| format!("Failed to delete {kind} record {rkey}"))
    }
}

#[async_trait]
impl RemoteActions for AtpClient {
    async fn create_repost(
        &self,
        repo: &str,
        subject: &ContentRef,
        created_at: &Datetime,
    ) -> Result<String> {
        self.create_subject_record(ActionKind::Repost, repo, subject, created_at)
            .await
    }

    async fn create_like(
        &self,
        repo: &str,
        subject: &ContentRef,
        created_at: &Datetime,
    ) -> Result<String> {
        self.create_subject_record(ActionKind::Like, repo, subject, created_at)
            .await
    }

    async fn delete_repost(&self, repo: &str, rkey: &str) -> Result<()> {
        self.delete_record(ActionKind::Repost, repo, rkey).await
    }

    async fn delete_like(&self, repo: &str, rkey: &str) -> Result<()> {
        self.delete_record(ActionKind::Like, repo, rkey).await
    }
}
