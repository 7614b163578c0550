use sea_orm::entity::prelude::*;
use serde::Serialize;

/// One lookup attempt: the submitted request body and the page it produced.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "queries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "Json")]
    pub query_data: Json,
    #[sea_orm(column_type = "Text", nullable)]
    pub raw_response: Option<String>,
    pub timestamp: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
