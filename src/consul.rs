//! Consul HTTP client.
//!
//! Writes the watched file's content to a single KV key and performs the
//! startup leader check. Uploads never raise: every failure is logged and
//! reported as `false` so the next poll tick can retry.

use crate::config::{KvTarget, TOKEN_HEADER};
use crate::error::SyncError;
use crate::hashing::short_digest;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{error, info, warn};

/// Something that can store the watched content remotely.
///
/// Returns `true` only when the write was acknowledged.
#[async_trait]
pub trait Publish {
    async fn publish(&self, content: &[u8]) -> bool;
}

pub struct ConsulClient {
    http: reqwest::Client,
    target: KvTarget,
}

impl ConsulClient {
    pub fn new(target: KvTarget, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, target })
    }

    pub fn target(&self) -> &KvTarget {
        &self.target
    }

    fn with_token(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.target.token() {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    /// Check that the store is reachable and accepts our token.
    ///
    /// Returns the current leader address (may be empty while the cluster
    /// has no leader).
    pub async fn check_leader(&self) -> Result<String, SyncError> {
        let request = self.with_token(self.http.get(self.target.leader_url()));
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status != StatusCode::OK {
            return Err(SyncError::Store {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let leader = body.trim().trim_matches('"').to_string();
        if leader.is_empty() {
            warn!("Consul is reachable but reports no cluster leader");
        }
        Ok(leader)
    }

    /// PUT the content to the configured key. Logs the outcome either way.
    pub async fn put_kv(&self, content: &[u8]) -> bool {
        let key = self.target.key();
        let request = self
            .with_token(self.http.put(self.target.kv_url()))
            .body(content.to_vec());

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(key = key, "Failed to write KV {}: {}", key, e);
                return false;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                key = key,
                status = status.as_u16(),
                "Failed to write KV {} (status {}): {}",
                key,
                status,
                body.trim()
            );
            return false;
        }

        info!(
            key = key,
            bytes = content.len(),
            sha256 = %short_digest(content),
            "Synced file to Consul KV: {}",
            key
        );
        true
    }
}

#[async_trait]
impl Publish for ConsulClient {
    async fn publish(&self, content: &[u8]) -> bool {
        self.put_kv(content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Address of a local port nothing listens on
    fn closed_port_uri() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}", port)
    }

    fn client_for(server: &MockServer, token: Option<&str>) -> ConsulClient {
        let target = KvTarget::new(
            &server.uri(),
            "ca/pub-key/id_rsa.pub",
            token.map(str::to_string),
        )
        .unwrap();
        ConsulClient::new(target, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_put_kv_success_sends_raw_bytes_and_token() {
        let server = MockServer::start().await;
        let content: &[u8] = &[0x73, 0x73, 0x68, 0x00, 0xff, 0x0a];

        Mock::given(method("PUT"))
            .and(path("/v1/kv/ca/pub-key/id_rsa.pub"))
            .and(header("X-Consul-Token", "secret"))
            .and(body_bytes(content.to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        assert!(client.put_kv(content).await);
    }

    #[tokio::test]
    async fn test_put_kv_non_200_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("rpc error"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        assert!(!client.put_kv(b"v1").await);
    }

    #[tokio::test]
    async fn test_put_kv_other_2xx_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(!client.put_kv(b"v1").await);
    }

    #[tokio::test]
    async fn test_put_kv_without_token_sends_no_header() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/kv/ca/pub-key/id_rsa.pub"))
            .respond_with(ResponseTemplate::new(200).set_body_string("true"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(client.publish(b"anonymous").await);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("X-Consul-Token").is_none());
    }

    #[tokio::test]
    async fn test_put_kv_connection_refused_is_failure() {
        let target = KvTarget::new(&closed_port_uri(), "k", None).unwrap();
        let client = ConsulClient::new(target, Duration::from_secs(1)).unwrap();

        assert!(!client.put_kv(b"v1").await);
    }

    #[tokio::test]
    async fn test_put_kv_timeout_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let target = KvTarget::new(&server.uri(), "k", None).unwrap();
        let client = ConsulClient::new(target, Duration::from_millis(200)).unwrap();
        assert!(!client.put_kv(b"v1").await);
    }

    #[tokio::test]
    async fn test_check_leader_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/status/leader"))
            .and(header("X-Consul-Token", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"10.0.0.5:8300\""))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("secret"));
        assert_eq!(client.check_leader().await.unwrap(), "10.0.0.5:8300");
    }

    #[tokio::test]
    async fn test_check_leader_without_leader_is_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/status/leader"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"\""))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert_eq!(client.check_leader().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_check_leader_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/status/leader"))
            .respond_with(ResponseTemplate::new(403).set_body_string("ACL not found"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("bad"));
        match client.check_leader().await {
            Err(SyncError::Store { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "ACL not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_check_leader_unreachable() {
        let target = KvTarget::new(&closed_port_uri(), "k", None).unwrap();
        let client = ConsulClient::new(target, Duration::from_secs(1)).unwrap();

        assert!(matches!(
            client.check_leader().await,
            Err(SyncError::Http(_))
        ));
    }
}
