//! One bounded read of the configuration document.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::time::timeout;

use crate::config::{split_endpoints, StoreConfig};
use crate::remote::error::LoadError;
use crate::store::{KvStore, StoreError};

/// A decoded document plus the store revision it came from.
#[derive(Debug)]
pub struct Fetched<T> {
    pub value: T,
    pub revision: i64,
}

/// Fetch and decode the document at `settings.key`.
///
/// The session is dropped on every path, including when the returned future
/// itself is dropped mid-request. Only the first returned pair is decoded.
pub async fn load_once<T>(store: &dyn KvStore, settings: &StoreConfig) -> Result<Fetched<T>, LoadError>
where
    T: DeserializeOwned,
{
    let dial_timeout = settings.dial_timeout();
    let request_timeout = settings.request_timeout();
    let connect_budget = connect_budget(settings);

    let session = match timeout(connect_budget, store.connect(dial_timeout)).await {
        Ok(Ok(session)) => session,
        Ok(Err(e)) => return Err(LoadError::Connect(e)),
        Err(_) => return Err(LoadError::Connect(StoreError::DialTimeout(connect_budget))),
    };

    let kvs = match timeout(request_timeout, session.get(&settings.key)).await {
        Ok(Ok(kvs)) => kvs,
        Ok(Err(e)) => return Err(LoadError::from_request(e, request_timeout)),
        Err(_) => {
            return Err(LoadError::Timeout {
                after: request_timeout,
                source: None,
            })
        }
    };
    drop(session);

    if kvs.len() > 1 {
        tracing::debug!(key = %settings.key, matches = kvs.len(), "Store returned several entries, using the first");
    }

    let first = kvs.into_iter().next().ok_or_else(|| LoadError::NotFound {
        key: settings.key.clone(),
    })?;

    let value = serde_json::from_slice(&first.value)?;

    Ok(Fetched {
        value,
        revision: first.mod_revision,
    })
}

/// Upper bound for `connect`: one dial timeout per endpoint.
///
/// A store walks its endpoints in order and bounds each attempt by the dial
/// timeout, so a node that accepts but never answers must not use up the
/// time owed to the nodes after it.
fn connect_budget(settings: &StoreConfig) -> Duration {
    let endpoints: usize = settings
        .endpoints
        .iter()
        .map(|raw| split_endpoints(raw).len())
        .sum();
    let endpoints = u32::try_from(endpoints.max(1)).unwrap_or(u32::MAX);
    settings.dial_timeout().saturating_mul(endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Fault, MemoryStore};
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Svc {
        port: u16,
        name: String,
    }

    fn settings() -> StoreConfig {
        StoreConfig::new(["memory"], "/cfg/svc")
    }

    #[tokio::test]
    async fn test_decodes_document_and_revision() {
        let store = MemoryStore::new();
        let revision = store.put("/cfg/svc", r#"{"port":8080,"name":"svc"}"#);

        let fetched: Fetched<Svc> = load_once(&store, &settings()).await.unwrap();
        assert_eq!(
            fetched.value,
            Svc {
                port: 8080,
                name: "svc".into()
            }
        );
        assert_eq!(fetched.revision, revision);
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_is_not_found() {
        let store = MemoryStore::new();
        let err = load_once::<Svc>(&store, &settings()).await.unwrap_err();
        assert!(matches!(err, LoadError::NotFound { ref key } if key == "/cfg/svc"));
    }

    #[tokio::test]
    async fn test_bad_document_is_decode_error() {
        let store = MemoryStore::new();
        store.put("/cfg/svc", r#"{"port":"not a number"}"#);
        let err = load_once::<Svc>(&store, &settings()).await.unwrap_err();
        assert_eq!(err.kind(), "decode");
        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_connect_and_store_failures() {
        let store = MemoryStore::new();
        store.put("/cfg/svc", r#"{"port":8080,"name":"svc"}"#);

        store.inject(Fault::Unreachable);
        assert_eq!(load_once::<Svc>(&store, &settings()).await.unwrap_err().kind(), "connect");

        store.inject(Fault::Canceled);
        assert_eq!(load_once::<Svc>(&store, &settings()).await.unwrap_err().kind(), "canceled");

        store.inject(Fault::EmptyKey);
        assert_eq!(load_once::<Svc>(&store, &settings()).await.unwrap_err().kind(), "invalid_key");

        store.inject(Fault::Unavailable);
        assert_eq!(load_once::<Svc>(&store, &settings()).await.unwrap_err().kind(), "store");

        assert_eq!(store.open_sessions(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_times_out_and_releases_session() {
        let store = MemoryStore::new();
        store.put("/cfg/svc", r#"{"port":8080,"name":"svc"}"#);
        store.inject(Fault::Hang);

        let mut settings = settings();
        settings.request_timeout_ms = 250;

        let err = load_once::<Svc>(&store, &settings).await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Timeout { after, source: None } if after == Duration::from_millis(250)
        ));
        assert_eq!(store.open_sessions(), 0);
    }

    #[test]
    fn test_connect_budget_covers_every_endpoint() {
        let mut settings = StoreConfig::new(["node1:2379,node2:2379", "node3:2379"], "/cfg/svc");
        settings.dial_timeout_ms = 500;
        assert_eq!(connect_budget(&settings), Duration::from_millis(1_500));

        settings.endpoints = vec!["node1:2379".into()];
        assert_eq!(connect_budget(&settings), Duration::from_millis(500));

        settings.endpoints.clear();
        assert_eq!(connect_budget(&settings), Duration::from_millis(500));
    }
}
