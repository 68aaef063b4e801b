//! State table - `states`. Cities reference it with `ON DELETE CASCADE`.

use sea_orm::entity::prelude::*;

/// State row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "states")]
pub struct Model {
    /// Shared identifier, also used in the `State.<id>` key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// When the entity was first constructed
    pub created_at: DateTime,
    /// When the entity was last persisted
    pub updated_at: DateTime,
    /// Name of the state
    pub name: String,
}

/// Defines relationships between State and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One state has many cities
    #[sea_orm(has_many = "super::city::Entity")]
    Cities,
}

impl Related<super::city::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
