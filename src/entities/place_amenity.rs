//! Junction table - `place_amenity`. A pure set relation keyed by `(place_id, amenity_id)`;
//! rows disappear when either side is deleted.

use sea_orm::entity::prelude::*;

/// Link row between a place and an amenity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "place_amenity")]
pub struct Model {
    /// Linked place
    #[sea_orm(primary_key, auto_increment = false)]
    pub place_id: String,
    /// Linked amenity
    #[sea_orm(primary_key, auto_increment = false)]
    pub amenity_id: String,
}

/// Both sides of the link
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The place side, removed along with the place
    #[sea_orm(
        belongs_to = "super::place::Entity",
        from = "Column::PlaceId",
        to = "super::place::Column::Id",
        on_delete = "Cascade"
    )]
    Place,
    /// The amenity side, removed along with the amenity
    #[sea_orm(
        belongs_to = "super::amenity::Entity",
        from = "Column::AmenityId",
        to = "super::amenity::Column::Id",
        on_delete = "Cascade"
    )]
    Amenity,
}

impl Related<super::place::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Place.def()
    }
}

impl Related<super::amenity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Amenity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
