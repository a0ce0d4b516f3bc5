//! etcd v3 client over the JSON gateway.
//!
//! # Responsibilities
//! - Parse endpoint addresses (bare `host:port` or full URLs)
//! - Probe endpoints in order and bind a session to the first healthy one
//! - Issue range reads and decode the gateway's base64 payloads
//! - Map gateway error codes onto `StoreError`

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use url::Url;

use crate::config::schema::split_endpoints;
use crate::store::{KeyValue, KvSession, KvStore, StoreError, StoreResult};

const STATUS_PATH: &str = "/v3/maintenance/status";
const RANGE_PATH: &str = "/v3/kv/range";

// gRPC status codes relayed by the gateway.
const CODE_CANCELED: i32 = 1;
const CODE_INVALID_ARGUMENT: i32 = 3;
const CODE_DEADLINE_EXCEEDED: i32 = 4;

/// etcd store reached through its HTTP/JSON gateway.
#[derive(Debug, Clone)]
pub struct EtcdStore {
    /// Endpoints in failover order.
    endpoints: Vec<Url>,
}

impl EtcdStore {
    /// Create a store for the given endpoints.
    ///
    /// Entries may themselves be comma-separated lists.
    pub fn new<I, S>(endpoints: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = endpoints
            .into_iter()
            .flat_map(|raw| split_endpoints(raw.as_ref()))
            .map(|raw| parse_endpoint(&raw))
            .collect::<StoreResult<Vec<_>>>()?;

        if endpoints.is_empty() {
            return Err(StoreError::NoEndpoints);
        }

        Ok(Self { endpoints })
    }

    /// Get the parsed endpoints.
    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    fn endpoint_list(&self) -> String {
        self.endpoints
            .iter()
            .map(Url::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parse one endpoint, defaulting to plain HTTP when no scheme is given.
pub fn parse_endpoint(raw: &str) -> StoreResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(StoreError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: "empty address".to_string(),
        });
    }

    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|e| StoreError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(StoreError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

fn api_url(endpoint: &Url, path: &str) -> StoreResult<Url> {
    endpoint.join(path).map_err(|e| StoreError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

fn classify_transport(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::DeadlineExceeded(err.to_string())
    } else {
        StoreError::Transport(err.to_string())
    }
}

#[async_trait]
impl KvStore for EtcdStore {
    async fn connect(&self, dial_timeout: Duration) -> StoreResult<Box<dyn KvSession>> {
        let client = Client::builder()
            .connect_timeout(dial_timeout)
            .no_proxy()
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let mut failures = Vec::new();

        for (i, endpoint) in self.endpoints.iter().enumerate() {
            let probe = client
                .post(api_url(endpoint, STATUS_PATH)?)
                .json(&serde_json::json!({}))
                .send();

            match timeout(dial_timeout, probe).await {
                Ok(Ok(response)) if response.status().is_success() => {
                    tracing::debug!(endpoint = %endpoint, "Store session established");
                    return Ok(Box::new(EtcdSession {
                        client,
                        range_url: api_url(endpoint, RANGE_PATH)?,
                    }));
                }
                Ok(Ok(response)) => {
                    tracing::warn!(endpoint_idx = i, status = %response.status(), "Store probe rejected, trying next endpoint");
                    failures.push(format!("{}: status {}", endpoint, response.status()));
                }
                Ok(Err(e)) => {
                    tracing::warn!(endpoint_idx = i, error = %e, "Store probe failed, trying next endpoint");
                    failures.push(format!("{}: {}", endpoint, e));
                }
                Err(_) => {
                    tracing::warn!(endpoint_idx = i, "Store probe timeout, trying next endpoint");
                    failures.push(format!("{}: no answer within {:?}", endpoint, dial_timeout));
                }
            }
        }

        Err(StoreError::Unreachable {
            endpoints: self.endpoint_list(),
            reason: failures.join("; "),
        })
    }
}

/// A session bound to one healthy endpoint.
struct EtcdSession {
    client: Client,
    range_url: Url,
}

#[async_trait]
impl KvSession for EtcdSession {
    async fn get(&self, key: &str) -> StoreResult<Vec<KeyValue>> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }

        let request = RangeRequest {
            key: STANDARD.encode(key),
        };

        let response = self
            .client
            .post(self.range_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(classify_transport)?;

        if !status.is_success() {
            return Err(match serde_json::from_slice::<GatewayError>(&body) {
                Ok(err) => err.into_store_error(),
                Err(_) => StoreError::Server {
                    code: i32::from(status.as_u16()),
                    message: String::from_utf8_lossy(&body).into_owned(),
                },
            });
        }

        let range: RangeResponse =
            serde_json::from_slice(&body).map_err(|e| StoreError::Malformed(e.to_string()))?;

        range.kvs.into_iter().map(RawKeyValue::decode).collect()
    }
}

#[derive(Debug, Serialize)]
struct RangeRequest {
    key: String,
}

#[derive(Debug, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<RawKeyValue>,
}

/// Key-value pair as the gateway encodes it: bytes in base64, int64 as strings.
#[derive(Debug, Deserialize)]
struct RawKeyValue {
    key: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    mod_revision: Option<String>,
}

impl RawKeyValue {
    fn decode(self) -> StoreResult<KeyValue> {
        let key = STANDARD
            .decode(&self.key)
            .map_err(|e| StoreError::Malformed(format!("key is not base64: {}", e)))?;
        let value = STANDARD
            .decode(&self.value)
            .map_err(|e| StoreError::Malformed(format!("value is not base64: {}", e)))?;
        let mod_revision = match self.mod_revision.as_deref() {
            Some(raw) => raw
                .parse()
                .map_err(|e| StoreError::Malformed(format!("bad mod_revision '{}': {}", raw, e)))?,
            None => 0,
        };

        Ok(KeyValue {
            key,
            value,
            mod_revision,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: String,
}

impl GatewayError {
    fn into_store_error(self) -> StoreError {
        let message = if self.message.is_empty() {
            self.error
        } else {
            self.message
        };

        match self.code {
            CODE_CANCELED => StoreError::Canceled(message),
            CODE_DEADLINE_EXCEEDED => StoreError::DeadlineExceeded(message),
            CODE_INVALID_ARGUMENT if message.contains("key is not provided") => StoreError::EmptyKey,
            code => StoreError::Server { code, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoint_defaults_to_http() {
        let url = parse_endpoint("node1:2379").unwrap();
        assert_eq!(url.as_str(), "http://node1:2379/");

        let url = parse_endpoint("https://etcd.internal:2379").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.port(), Some(2379));
    }

    #[test]
    fn test_parse_endpoint_rejects_garbage() {
        assert!(matches!(parse_endpoint(""), Err(StoreError::InvalidEndpoint { .. })));
        assert!(matches!(parse_endpoint("http://"), Err(StoreError::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_new_splits_comma_lists() {
        let store = EtcdStore::new(["node1:2379,node2:2379", "node3:2379"]).unwrap();
        let hosts: Vec<_> = store.endpoints().iter().filter_map(Url::host_str).collect();
        assert_eq!(hosts, vec!["node1", "node2", "node3"]);

        assert!(matches!(EtcdStore::new(Vec::<String>::new()), Err(StoreError::NoEndpoints)));
        assert!(matches!(EtcdStore::new([" , "]), Err(StoreError::NoEndpoints)));
    }

    #[test]
    fn test_raw_key_value_decoding() {
        let raw = RawKeyValue {
            key: STANDARD.encode("/cfg/svc"),
            value: STANDARD.encode(r#"{"port":8080}"#),
            mod_revision: Some("42".into()),
        };
        let kv = raw.decode().unwrap();
        assert_eq!(kv.key, b"/cfg/svc");
        assert_eq!(kv.value, br#"{"port":8080}"#);
        assert_eq!(kv.mod_revision, 42);

        let bad = RawKeyValue {
            key: "%%%".into(),
            value: String::new(),
            mod_revision: None,
        };
        assert!(matches!(bad.decode(), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_gateway_error_mapping() {
        let err = |code: i32, message: &str| GatewayError {
            code,
            message: message.to_string(),
            error: String::new(),
        };

        assert!(matches!(err(1, "context canceled").into_store_error(), StoreError::Canceled(_)));
        assert!(matches!(
            err(4, "context deadline exceeded").into_store_error(),
            StoreError::DeadlineExceeded(_)
        ));
        assert!(matches!(
            err(3, "etcdserver: key is not provided").into_store_error(),
            StoreError::EmptyKey
        ));
        assert!(matches!(
            err(3, "etcdserver: range end is invalid").into_store_error(),
            StoreError::Server { code: 3, .. }
        ));
        assert!(matches!(
            err(14, "etcdserver: leader changed").into_store_error(),
            StoreError::Server { code: 14, .. }
        ));
    }
}
