use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// A registered customer or administrator of the restaurant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2 PHC string. Never leaves the server.
    pub password_hash: String,
    pub street: String,
    pub city: String,
    /// Postal code.
    pub cp: String,
    #[sea_orm(default_value = "false")]
    pub is_admin: bool,
    /// Set when the user is soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    // A user can place multiple orders.
    #[sea_orm(has_many = "super::order::Entity")]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
