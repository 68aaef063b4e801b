//! Review - text written by a user about a place.

use super::{BaseModel, impl_model};
use serde::{Deserialize, Serialize};

/// A review of a place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Identity and timestamps
    #[serde(skip)]
    pub base: BaseModel,
    /// Id of the reviewed place
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    /// Id of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Review body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl_model!(Review, ["place_id", "user_id", "text"]);

impl Review {
    /// Creates a review of `place_id` written by `user_id`.
    #[must_use]
    pub fn new(place_id: &str, user_id: &str, text: &str) -> Self {
        Self {
            place_id: Some(place_id.to_string()),
            user_id: Some(user_id.to_string()),
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}
