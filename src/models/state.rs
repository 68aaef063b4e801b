//! State - top-level region. Owns many cities; deleting a state removes its cities on the
//! relational backend.

use super::{BaseModel, impl_model};
use serde::{Deserialize, Serialize};

/// A state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Identity and timestamps
    #[serde(skip)]
    pub base: BaseModel,
    /// Name of the state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl_model!(State, ["name"]);

impl State {
    /// Creates a named state with a fresh identity.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}
