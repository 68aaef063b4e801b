//! Amenity table - `amenities`.

use sea_orm::entity::prelude::*;

/// Amenity row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "amenities")]
pub struct Model {
    /// Shared identifier, also used in the `Amenity.<id>` key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// When the entity was first constructed
    pub created_at: DateTime,
    /// When the entity was last persisted
    pub updated_at: DateTime,
    /// Display name
    pub name: String,
}

/// Amenities reach places only through `place_amenity`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Junction rows naming this amenity
    #[sea_orm(has_many = "super::place_amenity::Entity")]
    PlaceAmenity,
}

impl Related<super::place_amenity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlaceAmenity.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
