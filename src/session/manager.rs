use std::sync::Arc;

use super::store::CredentialStore;
use super::types::{
    ChangePasswordRequest, Envelope, LoginData, LoginRequest, LogoutRequest, ResetPasswordRequest, Role,
    SessionRecord, SignupRequest, TokenPair,
};
use crate::error::{ApiError, Result};
use crate::http_client::{check_response, decode_json, CatalogHttpClient};
use crate::models::ApiMessage;
use crate::validation::{ForgotPasswordForm, LoginForm, ResetPasswordForm, SignupForm};

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub message: Option<String>,
    pub session: SessionRecord,
}

/// Session lifecycle: login, logout, restore, refresh and password flows.
/// Owns no state of its own; the credential store is the single source.
pub struct SessionManager {
    http: Arc<CatalogHttpClient>,
}

impl SessionManager {
    pub fn new(http: Arc<CatalogHttpClient>) -> Self {
        Self { http }
    }

    fn store(&self) -> &CredentialStore {
        self.http.store()
    }

    /// Reload the session persisted by a previous run
    pub fn restore(&self) -> SessionRecord {
        let record = self.store().load();
        if let Some(ref user) = record.user_info {
            tracing::debug!(user_id = user.id, role = %user.role, "Restored session");
        }
        record
    }

    pub fn current(&self) -> SessionRecord {
        self.store().snapshot()
    }

    /// Log in and persist the new session
    pub async fn login(&self, form: &LoginForm) -> Result<LoginOutcome> {
        form.validate()?;

        let url = self.http.url("/users/login");
        let body = LoginRequest {
            email: form.email.trim(),
            password: &form.password,
        };
        let response = self.http.send_public(|c| c.post(&url).json(&body)).await?;
        let response = check_response(response).await?;
        let envelope: Envelope<LoginData> = decode_json(response).await?;

        let LoginData {
            access_token,
            refresh_token,
            user,
        } = envelope.data;
        let (Some(access_token), Some(refresh_token)) = (
            access_token.filter(|t| !t.is_empty()),
            refresh_token.filter(|t| !t.is_empty()),
        ) else {
            tracing::error!("Login failed: missing tokens in response");
            return Err(ApiError::Unauthorized("login response is missing tokens".to_string()));
        };

        let session = self.store().save(SessionRecord::authenticated(
            user,
            TokenPair {
                access_token,
                refresh_token,
            },
        ))?;

        if let Some(ref user) = session.user_info {
            tracing::info!(user_id = user.id, role = %user.role, "Logged in");
        }

        Ok(LoginOutcome {
            message: envelope.message,
            session,
        })
    }

    /// Register a new account. New accounts are always plain users.
    pub async fn signup(&self, form: &SignupForm) -> Result<ApiMessage> {
        form.validate()?;

        let url = self.http.url("/users");
        let body = SignupRequest {
            name: form.name.trim(),
            email: form.email.trim(),
            password: &form.password,
            confirm_password: &form.confirm_password,
            role: Role::User,
        };
        let response = self.http.send_public(|c| c.post(&url).json(&body)).await?;
        decode_json(check_response(response).await?).await
    }

    /// End the session. The backend call is best effort; local state is
    /// cleared whatever it answers.
    pub async fn logout(&self) -> Result<SessionRecord> {
        if let Some(refresh_token) = self.store().refresh_token() {
            let url = self.http.url("/users/logout");
            let body = LogoutRequest {
                refresh_token: &refresh_token,
            };
            let result = match self.http.send_once(|c| c.post(&url).json(&body)).await {
                Ok(response) => check_response(response).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!("Logout API error (ignored): {}", e);
            }
        }

        self.store().clear()?;
        tracing::info!("Logged out");
        Ok(SessionRecord::anonymous())
    }

    /// Refresh the tokens now; returns the new access token.
    /// A failed refresh ends the session like any other refresh failure.
    pub async fn refresh(&self) -> Result<String> {
        self.http.refresh_session().await
    }

    /// Set a new password for an account without knowing the old one
    pub async fn forgot_password(&self, form: &ForgotPasswordForm) -> Result<ApiMessage> {
        form.validate()?;

        let url = self.http.url("/password/change-password");
        let body = ChangePasswordRequest {
            email: form.email.trim(),
            new_password: &form.password,
        };
        let response = self.http.send_public(|c| c.post(&url).json(&body)).await?;
        decode_json(check_response(response).await?).await
    }

    /// Change the password of the logged-in account
    pub async fn reset_password(&self, form: &ResetPasswordForm) -> Result<ApiMessage> {
        form.validate()?;

        let url = self.http.url("/password/reset-password");
        let body = ResetPasswordRequest {
            email: form.email.trim(),
            current_password: &form.old_password,
            new_password: &form.new_password,
        };
        self.http.send_json(|c| c.post(&url).json(&body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::storage::MemoryStorage;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn manager(server: &mockito::ServerGuard) -> SessionManager {
        let store = Arc::new(CredentialStore::open(Arc::new(MemoryStorage::new())));
        let http = CatalogHttpClient::new(
            store,
            format!("{}/api/v1", server.url()),
            Duration::from_secs(5),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .unwrap();
        SessionManager::new(Arc::new(http))
    }

    fn login_form() -> LoginForm {
        LoginForm {
            email: "asha@example.com".to_string(),
            password: "secret1".to_string(),
        }
    }

    async fn mock_login(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/api/v1/users/login")
            .match_body(Matcher::Json(json!({"email": "asha@example.com", "password": "secret1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "message": "Login successful",
                    "data": {
                        "accessToken": "a1",
                        "refreshToken": "r1",
                        "user": {"id": 1, "email": "asha@example.com", "name": "Asha", "role": "admin"}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_login_populates_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = mock_login(&mut server).await;
        let manager = manager(&server);

        let outcome = manager.login(&login_form()).await.unwrap();

        assert_eq!(outcome.message.as_deref(), Some("Login successful"));
        let session = manager.current();
        assert!(session.is_authenticated);
        assert_eq!(session.access_token.as_deref(), Some("a1"));
        assert_eq!(session.refresh_token.as_deref(), Some("r1"));
        assert_eq!(session.role(), Some(Role::Admin));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_rejects_missing_tokens() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/users/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"data": {"user": {"id": 1, "email": "a@b.co", "name": "Asha", "role": "user"}}}).to_string(),
            )
            .create_async()
            .await;
        let manager = manager(&server);

        let err = manager.login(&login_form()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert!(!manager.current().is_authenticated);
    }

    #[tokio::test]
    async fn test_login_bad_credentials_surface_backend_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/users/login")
            .with_status(401)
            .with_body(r#"{"message":"Invalid email or password"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/v1/users/refresh-token")
            .expect(0)
            .create_async()
            .await;
        let manager = manager(&server);

        let err = manager.login(&login_form()).await.unwrap_err();
        assert_eq!(err.user_message(), "Invalid email or password");
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_validates_before_calling_backend() {
        let server = mockito::Server::new_async().await;
        let manager = manager(&server);

        let form = LoginForm {
            email: "not-an-email".to_string(),
            password: "123".to_string(),
        };
        let err = manager.login(&form).await.unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_backend_fails() {
        let mut server = mockito::Server::new_async().await;
        mock_login(&mut server).await;
        let logout = server
            .mock("POST", "/api/v1/users/logout")
            .match_body(Matcher::Json(json!({"refreshToken": "r1"})))
            .with_status(500)
            .with_body(r#"{"message":"database down"}"#)
            .expect(1)
            .create_async()
            .await;
        let manager = manager(&server);
        assert_ok!(manager.login(&login_form()).await);

        let session = manager.logout().await.unwrap();

        assert!(!session.is_authenticated);
        assert_eq!(manager.current(), SessionRecord::anonymous());
        logout.assert_async().await;
    }

    #[tokio::test]
    async fn test_logout_without_session_makes_no_call() {
        let mut server = mockito::Server::new_async().await;
        let logout = server
            .mock("POST", "/api/v1/users/logout")
            .expect(0)
            .create_async()
            .await;
        let manager = manager(&server);

        assert_ok!(manager.logout().await);
        logout.assert_async().await;
    }

    #[tokio::test]
    async fn test_signup_sends_user_role() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/users")
            .match_body(Matcher::PartialJson(json!({"name": "Meera", "role": "user", "confirmPassword": "secret1"})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"User registered successfully!"}"#)
            .create_async()
            .await;
        let manager = manager(&server);

        let form = SignupForm {
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        let message = manager.signup(&form).await.unwrap();
        assert_eq!(message.message.as_deref(), Some("User registered successfully!"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reset_password_requires_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/password/reset-password")
            .with_status(401)
            .create_async()
            .await;
        let manager = manager(&server);

        let form = ResetPasswordForm {
            email: "asha@example.com".to_string(),
            old_password: "secret1".to_string(),
            new_password: "secret2".to_string(),
            confirm_new_password: "secret2".to_string(),
        };
        let err = assert_err!(manager.reset_password(&form).await);
        assert!(err.is_session_expired());
    }

    #[tokio::test]
    async fn test_forgot_password() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/password/change-password")
            .match_body(Matcher::Json(json!({"email": "asha@example.com", "newPassword": "secret2"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":"Password updated successfully! Please login again."}"#)
            .create_async()
            .await;
        let manager = manager(&server);

        let form = ForgotPasswordForm {
            email: "asha@example.com".to_string(),
            password: "secret2".to_string(),
        };
        assert_ok!(manager.forgot_password(&form).await);
        mock.assert_async().await;
    }
}
