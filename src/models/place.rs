//! Place - a rentable place inside a city, owned by a user.
//!
//! Places own their reviews and are linked to amenities through a pure set relation.
//! On the file backend the link lives in [`Place::amenity_ids`]; the relational backend
//! mirrors the same ids into the `place_amenity` junction table when the place is saved.

use super::{Amenity, BaseModel, Model, impl_model};
use serde::{Deserialize, Serialize};

/// A place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Identity and timestamps
    #[serde(skip)]
    pub base: BaseModel,
    /// Id of the city the place is in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,
    /// Id of the owning user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Number of bedrooms
    #[serde(default)]
    pub number_rooms: i64,
    /// Number of bathrooms
    #[serde(default)]
    pub number_bathrooms: i64,
    /// Maximum number of guests
    #[serde(default)]
    pub max_guest: i64,
    /// Nightly price
    #[serde(default)]
    pub price_by_night: i64,
    /// Latitude in decimal degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Ids of the linked amenities, sorted and without duplicates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenity_ids: Vec<String>,
}

impl_model!(
    Place,
    [
        "city_id",
        "user_id",
        "name",
        "description",
        "number_rooms",
        "number_bathrooms",
        "max_guest",
        "price_by_night",
        "latitude",
        "longitude",
        "amenity_ids",
    ]
);

impl Place {
    /// Creates a named place in `city_id` owned by `user_id`.
    #[must_use]
    pub fn new(city_id: &str, user_id: &str, name: &str) -> Self {
        Self {
            city_id: Some(city_id.to_string()),
            user_id: Some(user_id.to_string()),
            name: Some(name.to_string()),
            ..Self::default()
        }
    }

    /// Links an amenity. Linking the same amenity twice has no effect.
    pub fn add_amenity(&mut self, amenity: &Amenity) {
        let id = &amenity.base().id;
        if !self.amenity_ids.contains(id) {
            self.amenity_ids.push(id.clone());
            self.amenity_ids.sort();
        }
    }
}
