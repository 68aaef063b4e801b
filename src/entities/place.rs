//! Place table - `places`.
//!
//! A place belongs to a city and a user and is removed along with either of them.
//! Its reviews and its `place_amenity` rows cascade from it in turn.

use sea_orm::entity::prelude::*;

/// Place row
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "places")]
pub struct Model {
    /// Shared identifier, also used in the `Place.<id>` key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// When the entity was first constructed
    pub created_at: DateTime,
    /// When the entity was last persisted
    pub updated_at: DateTime,
    /// Owning city
    #[sea_orm(indexed)]
    pub city_id: String,
    /// Owning user
    #[sea_orm(indexed)]
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Free-text description, up to 1024 characters
    #[sea_orm(column_type = "String(StringLen::N(1024))", nullable)]
    pub description: Option<String>,
    /// Number of bedrooms
    #[sea_orm(default_value = 0)]
    pub number_rooms: i64,
    /// Number of bathrooms
    #[sea_orm(default_value = 0)]
    pub number_bathrooms: i64,
    /// Maximum number of guests
    #[sea_orm(default_value = 0)]
    pub max_guest: i64,
    /// Nightly price
    #[sea_orm(default_value = 0)]
    pub price_by_night: i64,
    /// Latitude in decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
}

/// Defines relationships between Place and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each place belongs to one city
    #[sea_orm(
        belongs_to = "super::city::Entity",
        from = "Column::CityId",
        to = "super::city::Column::Id",
        on_delete = "Cascade"
    )]
    City,
    /// Each place belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    /// One place has many reviews
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
    /// Junction rows linking this place to amenities
    #[sea_orm(has_many = "super::place_amenity::Entity")]
    PlaceAmenity,
}

impl Related<super::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::City.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::place_amenity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlaceAmenity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
