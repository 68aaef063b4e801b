//! Amenity - a feature shared by many places through the `place_amenity` relation.

use super::{BaseModel, impl_model};
use serde::{Deserialize, Serialize};

/// An amenity such as "Wifi".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    /// Identity and timestamps
    #[serde(skip)]
    pub base: BaseModel,
    /// Display name, required by the relational schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl_model!(Amenity, ["name"]);

impl Amenity {
    /// Creates a named amenity.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}
