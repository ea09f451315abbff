use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{request_timeout, SettingsStore, StoreError, StoreKind};
use crate::core::config::StoreConfig;

/// Settings kept in an etcd cluster, spoken to through its v3 JSON gateway.
#[derive(Debug)]
pub struct EtcdStore {
    client: reqwest::Client,
    endpoint: String,
    base_url: String,
}

#[derive(Serialize)]
struct RangeRequest {
    key: String,
    range_end: String,
}

#[derive(Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Deserialize)]
struct KeyValue {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Serialize)]
struct PutRequest {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct DeleteRangeRequest {
    key: String,
}

#[derive(Deserialize)]
struct DeleteRangeResponse {
    /// int64 counts arrive as JSON strings; absent when zero
    #[serde(default)]
    deleted: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct PutResponse {}

#[derive(Deserialize)]
struct GatewayError {
    message: Option<String>,
    error: Option<String>,
}

impl EtcdStore {
    /// Build a client for `endpoint`. A configured client certificate or
    /// CA switches the connection to https.
    pub fn connect(endpoint: &str, config: &StoreConfig) -> Result<Self, StoreError> {
        let mut builder = reqwest::Client::builder().timeout(request_timeout(config));
        let tls = config.cert_path.is_some() || config.ca_path.is_some();

        if let Some(path) = &config.cert_path {
            let pem = read_pem(path)?;
            let identity = reqwest::Identity::from_pem(&pem).map_err(|e| StoreError::Tls {
                path: path.clone(),
                message: e.to_string(),
            })?;
            builder = builder.identity(identity);
        }
        if let Some(path) = &config.ca_path {
            let pem = read_pem(path)?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| StoreError::Tls {
                path: path.clone(),
                message: e.to_string(),
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(|source| StoreError::Http {
            endpoint: endpoint.to_string(),
            source,
        })?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            base_url: format!("{}://{}", if tls { "https" } else { "http" }, endpoint),
        })
    }

    async fn call<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, StoreError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let http_err = |source: reqwest::Error| StoreError::Http {
            endpoint: self.endpoint.clone(),
            source,
        };

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(http_err)?;

        let status = response.status();
        let text = response.text().await.map_err(http_err)?;
        if !status.is_success() {
            return Err(StoreError::Rejected {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                message: gateway_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| StoreError::Protocol {
            endpoint: self.endpoint.clone(),
            message: format!("{} in {}", e, path),
        })
    }

    fn decode(&self, field: &str) -> Result<String, StoreError> {
        decode_field(field).ok_or_else(|| StoreError::Protocol {
            endpoint: self.endpoint.clone(),
            message: format!("undecodable key or value '{}'", field),
        })
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, StoreError> {
    std::fs::read(path).map_err(|e| StoreError::Tls {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn encode(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

fn decode_field(field: &str) -> Option<String> {
    let bytes = STANDARD.decode(field).ok()?;
    String::from_utf8(bytes).ok()
}

/// The smallest key greater than every key starting with `prefix`.
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    // every byte was 0xff: range to the end of the keyspace
    vec![0]
}

fn gateway_message(body: &str) -> String {
    serde_json::from_str::<GatewayError>(body)
        .ok()
        .and_then(|e| e.message.or(e.error))
        .unwrap_or_else(|| body.trim().to_string())
}

fn count_of(value: &Option<serde_json::Value>) -> u64 {
    match value {
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0),
        _ => 0,
    }
}

#[async_trait]
impl SettingsStore for EtcdStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Networked
    }

    fn location(&self) -> String {
        format!("etcd at {}", self.endpoint)
    }

    async fn get_prefix(&self, prefix: &str) -> Result<BTreeMap<String, String>, StoreError> {
        let request = RangeRequest {
            key: encode(prefix.as_bytes()),
            range_end: encode(&prefix_end(prefix.as_bytes())),
        };
        let response: RangeResponse = self.call("/v3/kv/range", &request).await?;

        let mut values = BTreeMap::new();
        for kv in response.kvs {
            values.insert(self.decode(&kv.key)?, self.decode(&kv.value)?);
        }
        tracing::debug!(prefix, count = values.len(), "read settings range");
        Ok(values)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let request = PutRequest {
            key: encode(key.as_bytes()),
            value: encode(value.as_bytes()),
        };
        let _: PutResponse = self.call("/v3/kv/put", &request).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let request = DeleteRangeRequest {
            key: encode(key.as_bytes()),
        };
        let response: DeleteRangeResponse = self.call("/v3/kv/deleterange", &request).await?;
        Ok(count_of(&response.deleted) > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one HTTP request with `status` and `body`; yields the request body.
    async fn serve_once(
        status: u16,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let body_start = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&buf[..body_start]).to_lowercase();
            let length: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while buf.len() < body_start + length {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }
            let reply = format!(
                "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[body_start..body_start + length]).to_string()
        });
        (addr, handle)
    }

    fn store_for(addr: &str) -> EtcdStore {
        EtcdStore::connect(addr, &StoreConfig::default()).unwrap()
    }

    #[test]
    fn prefix_end_increments_last_byte() {
        assert_eq!(prefix_end(b"/bw/"), b"/bw0".to_vec());
        assert_eq!(prefix_end(b"a\xff"), b"b".to_vec());
        assert_eq!(prefix_end(b"\xff\xff"), vec![0]);
    }

    #[test]
    fn base64_fields_round_trip() {
        let encoded = encode(b"/bw/bwCurrentUsed");
        assert_eq!(encoded, "L2J3L2J3Q3VycmVudFVzZWQ=");
        assert_eq!(decode_field(&encoded).as_deref(), Some("/bw/bwCurrentUsed"));
        assert_eq!(decode_field("%%%"), None);
    }

    #[test]
    fn gateway_message_prefers_structured_error() {
        let body = r#"{"error":"etcdserver: user name is empty","code":16,"message":"etcdserver: user name is empty"}"#;
        assert_eq!(gateway_message(body), "etcdserver: user name is empty");
        assert_eq!(gateway_message("plain failure\n"), "plain failure");
    }

    #[test]
    fn deleted_count_accepts_string_or_number() {
        assert_eq!(count_of(&Some(serde_json::json!("2"))), 2);
        assert_eq!(count_of(&Some(serde_json::json!(1))), 1);
        assert_eq!(count_of(&None), 0);
    }

    #[test]
    fn plain_endpoint_uses_http() {
        let store = store_for("127.0.0.1:2379");
        assert_eq!(store.base_url, "http://127.0.0.1:2379");
        assert_eq!(store.kind(), StoreKind::Networked);
        assert_eq!(store.location(), "etcd at 127.0.0.1:2379");
    }

    #[test]
    fn missing_client_cert_is_a_tls_error() {
        let config = StoreConfig {
            cert_path: Some("/no/such/client.pem".into()),
            ..StoreConfig::default()
        };
        let err = EtcdStore::connect("127.0.0.1:2379", &config).unwrap_err();
        assert!(matches!(err, StoreError::Tls { .. }));
    }

    #[tokio::test]
    async fn range_decodes_key_values() {
        let (addr, server) = serve_once(
            200,
            r#"{"header":{"revision":"7"},"kvs":[{"key":"L2J3L21vbnRoT2ZZZWFy","value":"Ng==","mod_revision":"7"}],"count":"1"}"#,
        )
        .await;
        let values = store_for(&addr).get_prefix("/bw/").await.unwrap();
        assert_eq!(values.get("/bw/monthOfYear").map(String::as_str), Some("6"));

        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["key"], encode(b"/bw/"));
        assert_eq!(request["range_end"], encode(b"/bw0"));
    }

    #[tokio::test]
    async fn empty_range_has_no_kvs_field() {
        let (addr, _server) = serve_once(200, r#"{"header":{"revision":"7"}}"#).await;
        let values = store_for(&addr).get_prefix("/bw/").await.unwrap();
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn put_sends_encoded_pair() {
        let (addr, server) = serve_once(200, r#"{"header":{"revision":"8"}}"#).await;
        store_for(&addr).put("/bw/bwMin", "12.500").await.unwrap();
        let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request["key"], encode(b"/bw/bwMin"));
        assert_eq!(request["value"], encode(b"12.500"));
    }

    #[tokio::test]
    async fn delete_reports_whether_key_existed() {
        let (addr, _server) = serve_once(200, r#"{"header":{},"deleted":"1"}"#).await;
        assert!(store_for(&addr).delete("/bw/dayOfMonth/03").await.unwrap());

        let (addr, _server) = serve_once(200, r#"{"header":{}}"#).await;
        assert!(!store_for(&addr).delete("/bw/dayOfMonth/04").await.unwrap());
    }

    #[tokio::test]
    async fn unauthenticated_is_rejected() {
        let (addr, _server) = serve_once(
            401,
            r#"{"error":"etcdserver: invalid auth token","code":16,"message":"etcdserver: invalid auth token"}"#,
        )
        .await;
        let err = store_for(&addr).get_prefix("/bw/").await.unwrap_err();
        match err {
            StoreError::Rejected { status, message, .. } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid auth token"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
