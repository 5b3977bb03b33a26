//! Authenticated request pipeline.
//!
//! Every outbound backend call goes through [`HttpPipeline::send`]:
//!
//! 1. the current access credential is read from storage and attached as a
//!    bearer authorization header (requests go out unauthenticated when no
//!    credential is stored, since public endpoints need none);
//! 2. an authorization failure (401) triggers a single-flight renewal of
//!    the access credential via the refresh credential;
//! 3. the original request is resent exactly once with the fresh
//!    credential, and that outcome is returned as-is.
//!
//! The retry is a straight-line second attempt, not a loop: a request that
//! comes back 401 twice surfaces the second failure without another
//! renewal, and network-level failures are never retried at all.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::security::credentials::{CredentialStore, ACCESS_TOKEN_KEY};
use crate::security::renewal::RenewalCoordinator;
use crate::transport::{ApiResponse, RequestDescriptor};

pub struct HttpPipeline {
    http: Client,
    base_endpoint: String,
    storage: Arc<dyn CredentialStore>,
    renewal: RenewalCoordinator,
    retry_on_auth_failure: bool,
}

impl HttpPipeline {
    pub fn new(config: &ClientConfig, storage: Arc<dyn CredentialStore>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(config.with_credential_storage)
            .build()
            .context("creating HTTP client")?;

        let base_endpoint = config.base_endpoint.trim_end_matches('/').to_string();
        let renewal = RenewalCoordinator::new(http.clone(), &base_endpoint, storage.clone());

        debug!(base_endpoint = %base_endpoint, "pipeline initialized");

        Ok(Self {
            http,
            base_endpoint,
            storage,
            renewal,
            retry_on_auth_failure: config.retry_on_auth_failure,
        })
    }

    /// Send a request through the authenticated pipeline.
    ///
    /// Returns the backend's successful response, or:
    /// * [`ClientError::NetworkFailure`] when no response was received;
    /// * [`ClientError::AuthExpired`] when the access credential expired
    ///   and could not be renewed;
    /// * [`ClientError::RequestFailed`] for any other non-success status,
    ///   including an authorization failure on the post-renewal retry.
    pub async fn send(&self, request: RequestDescriptor) -> Result<ApiResponse, ClientError> {
        let access = self.storage.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty());
        let first = self.execute(&request, access.as_deref()).await?;

        if first.status() != StatusCode::UNAUTHORIZED || !self.retry_on_auth_failure {
            return classify(first);
        }

        debug!(path = %request.path, "authorization failure, renewing access credential");
        let renewed = match self.renewal.renew().await {
            Ok(token) => token,
            Err(err) => {
                warn!(path = %request.path, error = %err, "credential renewal failed");
                return Err(ClientError::AuthExpired);
            }
        };

        // One resend with the fresh credential; its outcome is final.
        let retried = self.execute(&request, Some(&renewed)).await?;
        classify(retried)
    }

    /// Time of the last successful credential renewal, if any.
    pub fn last_renewed(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.renewal.last_renewed()
    }

    async fn execute(
        &self,
        request: &RequestDescriptor,
        access: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = format!("{}{}", self.base_endpoint, request.path);
        let headers = self.build_headers(request, access)?;

        trace!(
            method = %request.method,
            url = %url,
            authenticated = access.is_some(),
            "sending request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(ClientError::NetworkFailure)?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(ClientError::NetworkFailure)?;

        trace!(status = %status, url = %url, "received response");

        Ok(ApiResponse::new(status, body.to_vec()))
    }

    fn build_headers(
        &self,
        request: &RequestDescriptor,
        access: Option<&str>,
    ) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| ClientError::InvalidRequest(format!("header {name}: {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| ClientError::InvalidRequest(format!("header value: {err}")))?;
            headers.insert(name, value);
        }

        if let Some(token) = access {
            let bearer = format!("Bearer {token}");
            let value = HeaderValue::from_str(&bearer)
                .map_err(|err| ClientError::InvalidRequest(format!("bearer credential: {err}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let request_id = Uuid::new_v4().to_string();
        headers.insert(
            "X-Request-Id",
            HeaderValue::from_str(&request_id)
                .map_err(|err| ClientError::InvalidRequest(err.to_string()))?,
        );

        Ok(headers)
    }
}

fn classify(response: ApiResponse) -> Result<ApiResponse, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ClientError::RequestFailed {
            status: response.status().as_u16(),
            payload: response.text(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::credentials::MemoryCredentialStore;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn pipeline(server: &ServerGuard, storage: Arc<MemoryCredentialStore>) -> HttpPipeline {
        let config = ClientConfig {
            base_endpoint: server.url(),
            with_credential_storage: false,
            retry_on_auth_failure: true,
            request_timeout_secs: 5,
            credentials_file: None,
        };
        HttpPipeline::new(&config, storage).expect("pipeline should build")
    }

    #[tokio::test]
    async fn test_attaches_stored_credential() {
        let mut server = Server::new_async().await;
        let storage = Arc::new(MemoryCredentialStore::with_session("abc", "xyz"));

        let mock = server
            .mock("GET", "/api/user/user-details")
            .match_header("Authorization", Matcher::Exact("Bearer abc".into()))
            .with_status(200)
            .with_body(json!({"success": true, "data": {}}).to_string())
            .create_async()
            .await;

        let pipeline = pipeline(&server, storage);
        let response = pipeline
            .send(RequestDescriptor::get("/api/user/user-details"))
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sends_unauthenticated_without_credential() {
        let mut server = Server::new_async().await;
        let storage = Arc::new(MemoryCredentialStore::new());

        let mock = server
            .mock("GET", "/api/category/get")
            .match_header("Authorization", Matcher::Missing)
            .with_status(200)
            .with_body(json!({"success": true, "data": []}).to_string())
            .create_async()
            .await;

        let pipeline = pipeline(&server, storage);
        pipeline
            .send(RequestDescriptor::get("/api/category/get"))
            .await
            .expect("public request should succeed");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_renews_and_retries_once_on_auth_failure() {
        let mut server = Server::new_async().await;
        let storage = Arc::new(MemoryCredentialStore::with_session("abc", "xyz"));

        let expired = server
            .mock("GET", "/api/cart/get")
            .match_header("Authorization", Matcher::Exact("Bearer abc".into()))
            .with_status(401)
            .with_body(json!({"success": false, "message": "jwt expired"}).to_string())
            .expect(1)
            .create_async()
            .await;
        let renewal = server
            .mock("POST", "/api/user/refresh-token")
            .match_header("Authorization", Matcher::Exact("Bearer xyz".into()))
            .with_status(200)
            .with_body(
                json!({"success": true, "data": {"accessToken": "def"}}).to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let retried = server
            .mock("GET", "/api/cart/get")
            .match_header("Authorization", Matcher::Exact("Bearer def".into()))
            .with_status(200)
            .with_body(json!({"success": true, "data": [{"_id": "c1"}]}).to_string())
            .expect(1)
            .create_async()
            .await;

        let pipeline = pipeline(&server, storage.clone());
        let response = pipeline
            .send(RequestDescriptor::get("/api/cart/get"))
            .await
            .expect("retried request should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        // Renewal persisted the fresh credential.
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("def"));
        assert!(pipeline.last_renewed().is_some());

        expired.assert_async().await;
        renewal.assert_async().await;
        retried.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_refresh_credential_is_auth_expired() {
        let mut server = Server::new_async().await;
        let storage = Arc::new(MemoryCredentialStore::new());
        storage.set(ACCESS_TOKEN_KEY, "abc");

        let expired = server
            .mock("GET", "/api/cart/get")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let renewal = server
            .mock("POST", "/api/user/refresh-token")
            .expect(0)
            .create_async()
            .await;

        let pipeline = pipeline(&server, storage);
        let result = pipeline.send(RequestDescriptor::get("/api/cart/get")).await;

        assert!(matches!(result, Err(ClientError::AuthExpired)));
        expired.assert_async().await;
        renewal.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_renewal_is_auth_expired_without_retry() {
        let mut server = Server::new_async().await;
        let storage = Arc::new(MemoryCredentialStore::with_session("abc", "stale"));

        let expired = server
            .mock("GET", "/api/order/order-list")
            .match_header("Authorization", Matcher::Exact("Bearer abc".into()))
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let renewal = server
            .mock("POST", "/api/user/refresh-token")
            .match_header("Authorization", Matcher::Exact("Bearer stale".into()))
            .with_status(401)
            .with_body(json!({"success": false, "message": "refresh expired"}).to_string())
            .expect(1)
            .create_async()
            .await;

        let pipeline = pipeline(&server, storage.clone());
        let result = pipeline
            .send(RequestDescriptor::get("/api/order/order-list"))
            .await;

        assert!(matches!(result, Err(ClientError::AuthExpired)));
        // No retry happened: the resource endpoint saw exactly one call.
        expired.assert_async().await;
        renewal.assert_async().await;
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_second_auth_failure_surfaces_without_second_renewal() {
        let mut server = Server::new_async().await;
        let storage = Arc::new(MemoryCredentialStore::with_session("abc", "xyz"));

        let expired = server
            .mock("GET", "/api/cart/get")
            .match_header("Authorization", Matcher::Exact("Bearer abc".into()))
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let renewal = server
            .mock("POST", "/api/user/refresh-token")
            .with_status(200)
            .with_body(
                json!({"success": true, "data": {"accessToken": "def"}}).to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        // The renewed credential is also rejected: surfaced as-is.
        let still_expired = server
            .mock("GET", "/api/cart/get")
            .match_header("Authorization", Matcher::Exact("Bearer def".into()))
            .with_status(401)
            .with_body(json!({"success": false, "message": "nope"}).to_string())
            .expect(1)
            .create_async()
            .await;

        let pipeline = pipeline(&server, storage);
        let result = pipeline.send(RequestDescriptor::get("/api/cart/get")).await;

        match result {
            Err(ClientError::RequestFailed { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected RequestFailed, got {other:?}"),
        }
        expired.assert_async().await;
        renewal.assert_async().await;
        still_expired.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_auth_failure_passes_through() {
        let mut server = Server::new_async().await;
        let storage = Arc::new(MemoryCredentialStore::with_session("abc", "xyz"));

        let not_found = server
            .mock("GET", "/api/product/get-product-details")
            .with_status(404)
            .with_body(json!({"success": false, "message": "no such product"}).to_string())
            .expect(1)
            .create_async()
            .await;
        let renewal = server
            .mock("POST", "/api/user/refresh-token")
            .expect(0)
            .create_async()
            .await;

        let pipeline = pipeline(&server, storage);
        let result = pipeline
            .send(RequestDescriptor::get("/api/product/get-product-details"))
            .await;

        match result {
            Err(ClientError::RequestFailed { status, payload }) => {
                assert_eq!(status, 404);
                assert!(payload.contains("no such product"));
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
        not_found.assert_async().await;
        renewal.assert_async().await;
    }

    #[tokio::test]
    async fn test_network_failure_propagates_immediately() {
        // Nothing listens on this port.
        let storage = Arc::new(MemoryCredentialStore::with_session("abc", "xyz"));
        let config = ClientConfig {
            base_endpoint: "http://127.0.0.1:1".to_string(),
            with_credential_storage: false,
            retry_on_auth_failure: true,
            request_timeout_secs: 2,
            credentials_file: None,
        };
        let pipeline = HttpPipeline::new(&config, storage).unwrap();

        let result = pipeline.send(RequestDescriptor::get("/api/cart/get")).await;
        assert!(matches!(result, Err(ClientError::NetworkFailure(_))));
    }

    #[tokio::test]
    async fn test_retry_disabled_surfaces_first_auth_failure() {
        let mut server = Server::new_async().await;
        let storage = Arc::new(MemoryCredentialStore::with_session("abc", "xyz"));

        let expired = server
            .mock("GET", "/api/cart/get")
            .with_status(401)
            .with_body(json!({"success": false, "message": "jwt expired"}).to_string())
            .expect(1)
            .create_async()
            .await;
        let renewal = server
            .mock("POST", "/api/user/refresh-token")
            .expect(0)
            .create_async()
            .await;

        let config = ClientConfig {
            base_endpoint: server.url(),
            with_credential_storage: false,
            retry_on_auth_failure: false,
            request_timeout_secs: 5,
            credentials_file: None,
        };
        let pipeline = HttpPipeline::new(&config, storage).unwrap();
        let result = pipeline.send(RequestDescriptor::get("/api/cart/get")).await;

        match result {
            Err(ClientError::RequestFailed { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected RequestFailed, got {other:?}"),
        }
        expired.assert_async().await;
        renewal.assert_async().await;
    }
}
