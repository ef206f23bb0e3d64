// Token refresh call

use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;

use super::types::{Envelope, RefreshRequest, TokenPair};
use crate::error::ApiError;

/// Why a refresh cycle failed. Cloneable so every waiter of a shared
/// refresh gets the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RefreshFailure(String);

impl RefreshFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

impl From<RefreshFailure> for ApiError {
    fn from(failure: RefreshFailure) -> Self {
        ApiError::SessionExpired(failure.0)
    }
}

/// Build the refresh endpoint URL
pub fn refresh_url(api_base: &str) -> String {
    format!("{}/users/refresh-token", api_base)
}

/// Exchange a refresh token for a new token pair.
///
/// Goes straight through the raw client: the refresh call itself must never
/// pass through the gateway's 401 handling.
pub async fn refresh_tokens(client: &Client, url: &str, refresh_token: &str) -> Result<TokenPair, RefreshFailure> {
    tracing::debug!("Refreshing access token...");

    let response = client
        .post(url)
        .header(header::CONTENT_TYPE, "application/json")
        .json(&RefreshRequest {
            token: refresh_token,
        })
        .send()
        .await
        .map_err(|e| RefreshFailure::new(format!("refresh request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            status = status.as_u16(),
            body = %error_text,
            "Token refresh rejected"
        );
        return Err(RefreshFailure::new(ApiError::from_status(status, &error_text).to_string()));
    }

    let data: Envelope<TokenPair> = response
        .json()
        .await
        .map_err(|e| RefreshFailure::new(format!("invalid refresh response: {}", e)))?;

    if data.data.access_token.is_empty() || data.data.refresh_token.is_empty() {
        return Err(RefreshFailure::new("refresh response does not contain both tokens"));
    }

    tracing::info!("Tokens refreshed successfully");
    Ok(data.data)
}

/// [`refresh_tokens`] bounded by `limit`; running out of time is a failure
pub async fn refresh_with_timeout(
    client: &Client,
    url: &str,
    refresh_token: &str,
    limit: Duration,
) -> Result<TokenPair, RefreshFailure> {
    match tokio::time::timeout(limit, refresh_tokens(client, url, refresh_token)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("Token refresh timed out after {:?}", limit);
            Err(RefreshFailure::new(format!("refresh timed out after {:?}", limit)))
        }
    }
}
