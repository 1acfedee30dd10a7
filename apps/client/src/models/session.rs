use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::record_id;

/// The user object as the identity service returns it and as it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    record_id(&value).ok_or_else(|| de::Error::custom("user id must be a string or a number"))
}

/// Proof of authenticated identity. At most one is active per client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub token: String,
}

impl Session {
    pub fn new(user: User, token: String) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            email: user.email,
            token,
        }
    }

    pub fn user(&self) -> User {
        User {
            id: self.user_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// `POST /auth/signup` and `POST /auth/login` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
