//! City - belongs to one state and owns many places.

use super::{BaseModel, impl_model};
use serde::{Deserialize, Serialize};

/// A city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Identity and timestamps
    #[serde(skip)]
    pub base: BaseModel,
    /// Id of the owning state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
    /// Name of the city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl_model!(City, ["state_id", "name"]);

impl City {
    /// Creates a named city inside `state_id`.
    #[must_use]
    pub fn new(state_id: &str, name: &str) -> Self {
        Self {
            state_id: Some(state_id.to_string()),
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}
