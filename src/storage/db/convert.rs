//! Conversions between domain models and table rows.
//!
//! Loading a row always succeeds. Writing a model fails with [`Error::Transaction`] when a
//! column the schema declares `NOT NULL` is unset on the model, the same way a commit
//! would be rejected by the database. Free-form attributes have no column and are not
//! written.

use crate::{
    entities::{amenity, city, place, place_amenity, review, state, user},
    errors::{Error, Result},
    models::{Amenity, BaseModel, City, EntityKind, Place, Review, State, User},
};
use chrono::NaiveDateTime;
use sea_orm::Set;
use serde_json::Map;

fn base(id: String, created_at: NaiveDateTime, updated_at: NaiveDateTime) -> BaseModel {
    BaseModel {
        id,
        created_at,
        updated_at,
        extra: Map::new(),
    }
}

fn required(value: Option<&String>, kind: EntityKind, column: &str) -> Result<String> {
    value.cloned().ok_or_else(|| Error::Transaction {
        message: format!("{kind}.{column} cannot be null"),
    })
}

impl From<state::Model> for State {
    fn from(row: state::Model) -> Self {
        Self {
            base: base(row.id, row.created_at, row.updated_at),
            name: Some(row.name),
        }
    }
}

impl From<city::Model> for City {
    fn from(row: city::Model) -> Self {
        Self {
            base: base(row.id, row.created_at, row.updated_at),
            state_id: Some(row.state_id),
            name: Some(row.name),
        }
    }
}

impl From<user::Model> for User {
    fn from(row: user::Model) -> Self {
        Self {
            base: base(row.id, row.created_at, row.updated_at),
            email: Some(row.email),
            password: Some(row.password),
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

impl From<amenity::Model> for Amenity {
    fn from(row: amenity::Model) -> Self {
        Self {
            base: base(row.id, row.created_at, row.updated_at),
            name: Some(row.name),
        }
    }
}

impl From<review::Model> for Review {
    fn from(row: review::Model) -> Self {
        Self {
            base: base(row.id, row.created_at, row.updated_at),
            place_id: Some(row.place_id),
            user_id: Some(row.user_id),
            text: Some(row.text),
        }
    }
}

/// Builds a place from its row and the amenity ids found in `place_amenity`.
pub(super) fn place_from_row(row: place::Model, amenity_ids: Vec<String>) -> Place {
    Place {
        base: base(row.id, row.created_at, row.updated_at),
        city_id: Some(row.city_id),
        user_id: Some(row.user_id),
        name: Some(row.name),
        description: row.description,
        number_rooms: row.number_rooms,
        number_bathrooms: row.number_bathrooms,
        max_guest: row.max_guest,
        price_by_night: row.price_by_night,
        latitude: row.latitude,
        longitude: row.longitude,
        amenity_ids,
    }
}

pub(super) fn state_row(model: &State) -> Result<state::ActiveModel> {
    Ok(state::ActiveModel {
        id: Set(model.base.id.clone()),
        created_at: Set(model.base.created_at),
        updated_at: Set(model.base.updated_at),
        name: Set(required(model.name.as_ref(), EntityKind::State, "name")?),
    })
}

pub(super) fn city_row(model: &City) -> Result<city::ActiveModel> {
    Ok(city::ActiveModel {
        id: Set(model.base.id.clone()),
        created_at: Set(model.base.created_at),
        updated_at: Set(model.base.updated_at),
        state_id: Set(required(model.state_id.as_ref(), EntityKind::City, "state_id")?),
        name: Set(required(model.name.as_ref(), EntityKind::City, "name")?),
    })
}

pub(super) fn user_row(model: &User) -> Result<user::ActiveModel> {
    Ok(user::ActiveModel {
        id: Set(model.base.id.clone()),
        created_at: Set(model.base.created_at),
        updated_at: Set(model.base.updated_at),
        email: Set(required(model.email.as_ref(), EntityKind::User, "email")?),
        password: Set(required(model.password.as_ref(), EntityKind::User, "password")?),
        first_name: Set(model.first_name.clone()),
        last_name: Set(model.last_name.clone()),
    })
}

pub(super) fn amenity_row(model: &Amenity) -> Result<amenity::ActiveModel> {
    Ok(amenity::ActiveModel {
        id: Set(model.base.id.clone()),
        created_at: Set(model.base.created_at),
        updated_at: Set(model.base.updated_at),
        name: Set(required(model.name.as_ref(), EntityKind::Amenity, "name")?),
    })
}

pub(super) fn place_row(model: &Place) -> Result<place::ActiveModel> {
    Ok(place::ActiveModel {
        id: Set(model.base.id.clone()),
        created_at: Set(model.base.created_at),
        updated_at: Set(model.base.updated_at),
        city_id: Set(required(model.city_id.as_ref(), EntityKind::Place, "city_id")?),
        user_id: Set(required(model.user_id.as_ref(), EntityKind::Place, "user_id")?),
        name: Set(required(model.name.as_ref(), EntityKind::Place, "name")?),
        description: Set(model.description.clone()),
        number_rooms: Set(model.number_rooms),
        number_bathrooms: Set(model.number_bathrooms),
        max_guest: Set(model.max_guest),
        price_by_night: Set(model.price_by_night),
        latitude: Set(model.latitude),
        longitude: Set(model.longitude),
    })
}

pub(super) fn review_row(model: &Review) -> Result<review::ActiveModel> {
    Ok(review::ActiveModel {
        id: Set(model.base.id.clone()),
        created_at: Set(model.base.created_at),
        updated_at: Set(model.base.updated_at),
        place_id: Set(required(model.place_id.as_ref(), EntityKind::Review, "place_id")?),
        user_id: Set(required(model.user_id.as_ref(), EntityKind::Review, "user_id")?),
        text: Set(required(model.text.as_ref(), EntityKind::Review, "text")?),
    })
}

/// Junction rows for every amenity linked to `model`.
pub(super) fn amenity_links(model: &Place) -> Vec<place_amenity::ActiveModel> {
    model
        .amenity_ids
        .iter()
        .map(|amenity_id| place_amenity::ActiveModel {
            place_id: Set(model.base.id.clone()),
            amenity_id: Set(amenity_id.clone()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::models::base::now;
    use sea_orm::ActiveValue;

    #[test]
    fn test_required_column_missing() {
        let err = state_row(&State::default()).unwrap_err();
        assert!(matches!(err, Error::Transaction { message } if message == "State.name cannot be null"));
    }

    #[test]
    fn test_place_round_trip_through_row() {
        let mut place = Place::new("city", "user", "Loft");
        place.number_rooms = 4;
        place.longitude = Some(-122.431_297);
        place.amenity_ids = vec!["wifi".to_string()];

        let row = place_row(&place).unwrap();
        let ActiveValue::Set(rooms) = row.number_rooms else {
            panic!("number_rooms not set");
        };
        assert_eq!(rooms, 4);

        let stamp = now();
        let loaded = place_from_row(
            place::Model {
                id: place.base.id.clone(),
                created_at: stamp,
                updated_at: stamp,
                city_id: "city".to_string(),
                user_id: "user".to_string(),
                name: "Loft".to_string(),
                description: None,
                number_rooms: 4,
                number_bathrooms: 0,
                max_guest: 0,
                price_by_night: 0,
                latitude: None,
                longitude: Some(-122.431_297),
            },
            vec!["wifi".to_string()],
        );
        assert_eq!(loaded.amenity_ids, place.amenity_ids);
        assert_eq!(loaded.longitude, place.longitude);
        assert_eq!(amenity_links(&loaded).len(), 1);
    }
}
