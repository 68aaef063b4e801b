//! Review table - `reviews`. Removed when either its place or its author is removed.

use sea_orm::entity::prelude::*;

/// Review row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    /// Shared identifier, also used in the `Review.<id>` key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// When the entity was first constructed
    pub created_at: DateTime,
    /// When the entity was last persisted
    pub updated_at: DateTime,
    /// Reviewed place
    #[sea_orm(indexed)]
    pub place_id: String,
    /// Author
    #[sea_orm(indexed)]
    pub user_id: String,
    /// Review body, up to 1024 characters
    #[sea_orm(column_type = "String(StringLen::N(1024))")]
    pub text: String,
}

/// Defines relationships between Review and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each review is about one place
    #[sea_orm(
        belongs_to = "super::place::Entity",
        from = "Column::PlaceId",
        to = "super::place::Column::Id",
        on_delete = "Cascade"
    )]
    Place,
    /// Each review is written by one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::place::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Place.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
