// User records managed by admins

use serde::{Deserialize, Serialize};

use crate::session::Role;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Body of `PUT /users/{id}`
#[derive(Debug, Clone, Serialize)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// `GET /users` answers with the list under `message` rather than `data`.
/// Both placements are accepted.
#[derive(Debug, Deserialize)]
pub struct UserListResponse {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl UserListResponse {
    pub fn into_users(self) -> Result<Vec<User>, serde_json::Error> {
        let list = [self.message, self.data]
            .into_iter()
            .flatten()
            .find(|value| value.is_array());
        match list {
            Some(value) => serde_json::from_value(value),
            None => Ok(Vec::new()),
        }
    }
}
