//! Remote shared store
//!
//! The shared store is an opaque HTTP resource with two readable documents
//! (the record array and the tombstone document) and two write endpoints.
//! It offers no delete and no transactions.

mod http;

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::models::TombstoneDocument;

pub use http::{HttpRemoteStore, RemoteEndpoints};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote store is not configured")]
    NotConfigured,
    #[error("Remote request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Remote HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Remote store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid remote payload: {0}")]
    Payload(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Access to the shared record and tombstone documents
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Fetch the raw record array. Entries are left unparsed so that one
    /// malformed record does not hide the rest.
    async fn fetch_records(&self) -> RemoteResult<Vec<Value>>;

    async fn fetch_tombstones(&self) -> RemoteResult<TombstoneDocument>;

    /// Overwrite the shared record array. `payload` may hold entries this
    /// client could not parse; they are written back untouched.
    async fn push_records(&self, payload: &[Value]) -> RemoteResult<()>;

    async fn push_tombstones(&self, document: &TombstoneDocument) -> RemoteResult<()>;
}

/// Remote used when no shared store is configured. Every call fails with
/// [`RemoteError::NotConfigured`], which keeps the engine in local-only mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnlyRemote;

impl RemoteStore for LocalOnlyRemote {
    async fn fetch_records(&self) -> RemoteResult<Vec<Value>> {
        Err(RemoteError::NotConfigured)
    }

    async fn fetch_tombstones(&self) -> RemoteResult<TombstoneDocument> {
        Err(RemoteError::NotConfigured)
    }

    async fn push_records(&self, _payload: &[Value]) -> RemoteResult<()> {
        Err(RemoteError::NotConfigured)
    }

    async fn push_tombstones(&self, _document: &TombstoneDocument) -> RemoteResult<()> {
        Err(RemoteError::NotConfigured)
    }
}

/// Runtime choice between the HTTP remote and local-only mode
#[derive(Debug, Clone)]
pub enum AnyRemote {
    Http(HttpRemoteStore),
    LocalOnly(LocalOnlyRemote),
}

impl AnyRemote {
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

impl RemoteStore for AnyRemote {
    async fn fetch_records(&self) -> RemoteResult<Vec<Value>> {
        match self {
            Self::Http(remote) => remote.fetch_records().await,
            Self::LocalOnly(remote) => remote.fetch_records().await,
        }
    }

    async fn fetch_tombstones(&self) -> RemoteResult<TombstoneDocument> {
        match self {
            Self::Http(remote) => remote.fetch_tombstones().await,
            Self::LocalOnly(remote) => remote.fetch_tombstones().await,
        }
    }

    async fn push_records(&self, payload: &[Value]) -> RemoteResult<()> {
        match self {
            Self::Http(remote) => remote.push_records(payload).await,
            Self::LocalOnly(remote) => remote.push_records(payload).await,
        }
    }

    async fn push_tombstones(&self, document: &TombstoneDocument) -> RemoteResult<()> {
        match self {
            Self::Http(remote) => remote.push_tombstones(document).await,
            Self::LocalOnly(remote) => remote.push_tombstones(document).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_only_remote_is_never_reachable() {
        let remote = AnyRemote::LocalOnly(LocalOnlyRemote);
        assert!(!remote.is_configured());
        assert!(matches!(
            remote.fetch_records().await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            remote.push_tombstones(&TombstoneDocument::default()).await,
            Err(RemoteError::NotConfigured)
        ));
    }

    #[test]
    fn test_timeout_error_message() {
        let error = RemoteError::Timeout(Duration::from_secs(8));
        assert_eq!(error.to_string(), "Remote request timed out after 8s");
    }
}
