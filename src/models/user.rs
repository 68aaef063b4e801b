//! User - account owning places and reviews.

use super::{BaseModel, impl_model};
use serde::{Deserialize, Serialize};

/// A user account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identity and timestamps
    #[serde(skip)]
    pub base: BaseModel,
    /// Login email, required by the relational schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Password, required by the relational schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Given name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl_model!(User, ["email", "password", "first_name", "last_name"]);

impl User {
    /// Creates a user with the two required credentials.
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            ..Self::default()
        }
    }
}
