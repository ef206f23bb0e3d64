// Authenticated request gateway
// Attaches the session's bearer token and recovers from one 401 per request
// through a single shared token refresh.

use anyhow::Context;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::ApiError;
use crate::session::refresh::{self, RefreshFailure};
use crate::session::types::TokenPair;
use crate::session::CredentialStore;

/// Outcome of the one refresh call of a cycle, shared by every waiter
type PendingRefresh = Shared<BoxFuture<'static, Result<TokenPair, RefreshFailure>>>;

/// Refresh state of a gateway instance
enum RefreshState {
    Idle,
    Refreshing(PendingRefresh),
}

/// Why a new access token is wanted
enum RefreshCause<'a> {
    /// The backend answered 401 to a request sent with `sent_token`
    Rejected { sent_token: Option<&'a str> },
    /// Someone asked for a refresh explicitly
    Requested,
}

enum Renewal {
    /// A refresh already finished after the rejected request was sent
    Current(String),
    Pending(PendingRefresh),
}

/// Puts the gateway back to `Idle` when the refresh future finishes or is dropped
struct RefreshGuard(Arc<Mutex<RefreshState>>);

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        *lock(&self.0) = RefreshState::Idle;
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn short_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// HTTP client for the catalog API with the single-flight refresh protocol
pub struct CatalogHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// `<backend>/api/v1`
    api_base: String,

    /// Session the tokens are read from and written to
    store: Arc<CredentialStore>,

    refresh_state: Arc<Mutex<RefreshState>>,

    /// Upper bound for one refresh call
    refresh_timeout: Duration,
}

impl CatalogHttpClient {
    /// Create a new gateway
    pub fn new(
        store: Arc<CredentialStore>,
        api_base: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
        refresh_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            store,
            refresh_state: Arc::new(Mutex::new(RefreshState::Idle)),
            refresh_timeout,
        })
    }

    /// Absolute URL for an API path such as `/products`
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Whether a refresh cycle is in flight
    pub fn is_refreshing(&self) -> bool {
        matches!(*lock(&self.refresh_state), RefreshState::Refreshing(_))
    }

    /// Send an authenticated request.
    ///
    /// `build` is called once per dispatch so the request can be replayed
    /// after a refresh (multipart bodies cannot be cloned). Any non-401
    /// response is returned as is. A 401 triggers at most one refresh-and-replay;
    /// a 401 on the replay is returned as `ApiError::Unauthorized`.
    pub async fn send<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let request_id = short_request_id();
        let sent_token = self.store.access_token();

        let response = self.dispatch(&build, sent_token.as_deref(), &request_id).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::warn!(
            request_id = %request_id,
            url = %response.url(),
            "Received 401, renewing access token"
        );

        let token = self
            .acquire_token(RefreshCause::Rejected {
                sent_token: sent_token.as_deref(),
            })
            .await?;

        let replay = self.dispatch(&build, Some(&token), &request_id).await?;
        if replay.status() == StatusCode::UNAUTHORIZED {
            let url = replay.url().clone();
            let body = replay.text().await.unwrap_or_default();
            tracing::error!(
                request_id = %request_id,
                url = %url,
                "Request rejected again after token renewal"
            );
            return Err(ApiError::from_status(StatusCode::UNAUTHORIZED, &body));
        }

        Ok(replay)
    }

    /// Send with the current token attached but without 401 recovery
    pub async fn send_once<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.store.access_token();
        self.dispatch(&build, token.as_deref(), &short_request_id()).await
    }

    /// Send without any token (login, signup, forgotten password)
    pub async fn send_public<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.dispatch(&build, None, &short_request_id()).await
    }

    /// Authenticated request whose successful body is decoded as `T`
    pub async fn send_json<T, F>(&self, build: F) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = check_response(self.send(build).await?).await?;
        decode_json(response).await
    }

    /// Refresh the tokens now, joining a cycle already in flight
    pub async fn refresh_session(&self) -> Result<String, ApiError> {
        self.acquire_token(RefreshCause::Requested).await
    }

    async fn dispatch<F>(&self, build: &F, token: Option<&str>, request_id: &str) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut request = build(&self.client);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                tracing::debug!(
                    request_id = %request_id,
                    status = %response.status(),
                    url = %response.url(),
                    "Received HTTP response"
                );
                Ok(response)
            }
            Err(e) => {
                let error_kind = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection_failed"
                } else if e.is_request() {
                    "request_error"
                } else {
                    "unknown"
                };
                tracing::warn!(
                    request_id = %request_id,
                    error_kind = error_kind,
                    error = %e,
                    "HTTP request error"
                );
                Err(ApiError::Network(e))
            }
        }
    }

    async fn acquire_token(&self, cause: RefreshCause<'_>) -> Result<String, ApiError> {
        match self.join_or_start(cause)? {
            Renewal::Current(token) => Ok(token),
            Renewal::Pending(pending) => {
                let tokens = pending.await?;
                Ok(tokens.access_token)
            }
        }
    }

    /// Join the in-flight refresh or start one. The state check and the
    /// transition to `Refreshing` happen under one lock acquisition.
    fn join_or_start(&self, cause: RefreshCause<'_>) -> Result<Renewal, ApiError> {
        let mut state = lock(&self.refresh_state);

        if let RefreshState::Refreshing(pending) = &*state {
            tracing::debug!("Token refresh already in flight, waiting for it");
            return Ok(Renewal::Pending(pending.clone()));
        }

        if let RefreshCause::Rejected { sent_token } = cause {
            if let Some(current) = self.store.access_token() {
                if sent_token != Some(current.as_str()) {
                    tracing::debug!("Access token changed since the request was sent, replaying");
                    return Ok(Renewal::Current(current));
                }
            }
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::warn!("No refresh token available, ending session");
            end_session(&self.store);
            return Err(ApiError::SessionExpired("no refresh token available".to_string()));
        };

        let pending = self.start_refresh(refresh_token);
        *state = RefreshState::Refreshing(pending.clone());
        Ok(Renewal::Pending(pending))
    }

    fn start_refresh(&self, refresh_token: String) -> PendingRefresh {
        let client = self.client.clone();
        let url = refresh::refresh_url(&self.api_base);
        let store = Arc::clone(&self.store);
        let guard = RefreshGuard(Arc::clone(&self.refresh_state));
        let limit = self.refresh_timeout;

        async move {
            let _guard = guard;

            match refresh::refresh_with_timeout(&client, &url, &refresh_token, limit).await {
                Ok(tokens) => match store.update_tokens(&tokens) {
                    Ok(_) => Ok(tokens),
                    Err(e) => {
                        tracing::error!("Failed to persist refreshed tokens: {}", e);
                        end_session(&store);
                        Err(RefreshFailure::new(format!("failed to persist refreshed tokens: {}", e)))
                    }
                },
                Err(failure) => {
                    tracing::error!("Token refresh failed: {}", failure);
                    end_session(&store);
                    Err(failure)
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn end_session(store: &CredentialStore) {
    if let Err(e) = store.clear() {
        tracing::error!("Failed to clear session storage: {}", e);
    }
}

/// Turn a non-success response into the matching `ApiError`
pub async fn check_response(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }
}

/// Decode a successful response body as JSON
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let url = response.url().clone();
    response
        .json()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to parse JSON response from {}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStorage;
    use crate::session::types::{Role, SessionRecord, UserInfo};
    use mockito::Matcher;

    fn store_with(access: Option<&str>, refresh: Option<&str>) -> Arc<CredentialStore> {
        let store = Arc::new(CredentialStore::open(Arc::new(MemoryStorage::new())));
        store
            .save(SessionRecord {
                is_authenticated: false,
                user_info: Some(UserInfo {
                    id: 1,
                    name: "Asha".to_string(),
                    email: "asha@example.com".to_string(),
                    role: Role::Admin,
                }),
                access_token: access.map(str::to_string),
                refresh_token: refresh.map(str::to_string),
            })
            .unwrap();
        store
    }

    fn gateway(server: &mockito::ServerGuard, store: Arc<CredentialStore>) -> CatalogHttpClient {
        CatalogHttpClient::new(
            store,
            format!("{}/api/v1", server.url()),
            Duration::from_secs(5),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_bearer_token_attached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/products")
            .match_header("authorization", "Bearer a1")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = gateway(&server, store_with(Some("a1"), Some("r1")));
        let url = client.url("/products");
        let response = client.send(|c| c.get(&url)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_token_sends_no_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/categories")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = gateway(&server, Arc::new(CredentialStore::open(Arc::new(MemoryStorage::new()))));
        let url = client.url("/categories");
        let response = client.send(|c| c.get(&url)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_401_refreshes_and_replays_once() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("GET", "/api/v1/products")
            .match_header("authorization", "Bearer a1")
            .with_status(401)
            .with_body(r#"{"message":"jwt expired"}"#)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/v1/users/refresh-token")
            .match_body(Matcher::Json(serde_json::json!({"token": "r1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"accessToken":"a2","refreshToken":"r2"}}"#)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("GET", "/api/v1/products")
            .match_header("authorization", "Bearer a2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":1}]}"#)
            .expect(1)
            .create_async()
            .await;

        let store = store_with(Some("a1"), Some("r1"));
        let client = gateway(&server, store.clone());
        let url = client.url("/products");
        let body: serde_json::Value = client.send_json(|c| c.get(&url)).await.unwrap();

        assert_eq!(body["data"][0]["id"], 1);
        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
        assert!(store.is_authenticated());
        assert!(!client.is_refreshing());
        rejected.assert_async().await;
        refresh.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_401_errors_pass_through() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/v1/products/9")
            .with_status(403)
            .with_body(r#"{"message":"Not your product"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/v1/users/refresh-token")
            .expect(0)
            .create_async()
            .await;

        let client = gateway(&server, store_with(Some("a1"), Some("r1")));
        let url = client.url("/products/9");
        let response = client.send(|c| c.delete(&url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let err = check_response(response).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(ref m) if m == "Not your product"));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_public_request_never_refreshes() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/users/login")
            .match_header("authorization", Matcher::Missing)
            .with_status(401)
            .with_body(r#"{"message":"Invalid email or password"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/v1/users/refresh-token")
            .expect(0)
            .create_async()
            .await;

        let store = store_with(Some("a1"), Some("r1"));
        let client = gateway(&server, store.clone());
        let url = client.url("/users/login");
        let response = client.send_public(|c| c.post(&url)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_explicit_refresh() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/users/refresh-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{"accessToken":"a9","refreshToken":"r9"}}"#)
            .expect(1)
            .create_async()
            .await;

        let store = store_with(Some("a1"), Some("r1"));
        let client = gateway(&server, store.clone());

        let token = client.refresh_session().await.unwrap();
        assert_eq!(token, "a9");
        assert_eq!(store.refresh_token().as_deref(), Some("r9"));
    }
}
