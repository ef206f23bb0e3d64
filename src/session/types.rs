// Session types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role carried by a catalog user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    SubAdmin,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::SubAdmin => "sub-admin",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "sub-admin" | "subadmin" | "sub_admin" => Ok(Role::SubAdmin),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Identity of the logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The client's local belief about the current session.
///
/// `is_authenticated` is true exactly when both tokens and the user are
/// present. Construct through [`SessionRecord::authenticated`] or pass a
/// hand-built record through [`SessionRecord::normalized`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub is_authenticated: bool,
    #[serde(default)]
    pub user_info: Option<UserInfo>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl SessionRecord {
    /// Anonymous record (no user, no tokens)
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: UserInfo, tokens: TokenPair) -> Self {
        Self {
            is_authenticated: true,
            user_info: Some(user),
            access_token: Some(tokens.access_token),
            refresh_token: Some(tokens.refresh_token),
        }
    }

    /// Recompute `is_authenticated` from the fields. Empty tokens count as absent.
    pub fn normalized(mut self) -> Self {
        self.access_token = self.access_token.filter(|t| !t.is_empty());
        self.refresh_token = self.refresh_token.filter(|t| !t.is_empty());
        self.is_authenticated = self.user_info.is_some()
            && self.access_token.is_some()
            && self.refresh_token.is_some();
        self
    }

    /// Replace both tokens in place, keeping the user
    pub fn with_tokens(self, tokens: &TokenPair) -> Self {
        Self {
            access_token: Some(tokens.access_token.clone()),
            refresh_token: Some(tokens.refresh_token.clone()),
            ..self
        }
        .normalized()
    }

    pub fn role(&self) -> Option<Role> {
        self.user_info.as_ref().map(|u| u.role)
    }
}

/// Access/refresh token pair issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// `{message, data}` envelope used by most backend responses
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

/// Login request body
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `data` of a login response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserInfo,
}

/// Refresh request body
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub token: &'a str,
}

/// Logout request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest<'a> {
    pub refresh_token: &'a str,
}

/// Signup request body; new accounts always start as plain users
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub role: Role,
}

/// Forgot-password request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub email: &'a str,
    pub new_password: &'a str,
}

/// Reset-password request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest<'a> {
    pub email: &'a str,
    pub current_password: &'a str,
    pub new_password: &'a str,
}
