//! City table - `cities`. Belongs to a state and owns places.

use sea_orm::entity::prelude::*;

/// City row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cities")]
pub struct Model {
    /// Shared identifier, also used in the `City.<id>` key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// When the entity was first constructed
    pub created_at: DateTime,
    /// When the entity was last persisted
    pub updated_at: DateTime,
    /// Owning state, indexed for the state -> cities lookup
    #[sea_orm(indexed)]
    pub state_id: String,
    /// Name of the city
    pub name: String,
}

/// Defines relationships between City and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each city belongs to one state, removed along with it
    #[sea_orm(
        belongs_to = "super::state::Entity",
        from = "Column::StateId",
        to = "super::state::Column::Id",
        on_delete = "Cascade"
    )]
    State,
    /// One city has many places
    #[sea_orm(has_many = "super::place::Entity")]
    Places,
}

impl Related<super::state::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::State.def()
    }
}

impl Related<super::place::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Places.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
