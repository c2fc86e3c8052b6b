use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

/// Something happening at the restaurant (live music, tasting night, ...).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    /// Free-form start time as shown to guests, e.g. "20:30".
    pub time: String,
    pub image: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
