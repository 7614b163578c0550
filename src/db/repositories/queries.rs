use crate::entities::{prelude::*, queries};
use anyhow::Result;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, QuerySelect, Set};

pub struct QueryRepository {
    conn: DatabaseConnection,
}

impl QueryRepository {
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, query_data: &serde_json::Value, raw_response: &str) -> Result<i32> {
        let active_model = queries::ActiveModel {
            query_data: Set(query_data.clone()),
            raw_response: Set(Some(raw_response.to_string())),
            ..Default::default()
        };

        let result = Queries::insert(active_model).exec(&self.conn).await?;
        Ok(result.last_insert_id)
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<queries::Model>> {
        let items = Queries::find()
            .order_by_desc(queries::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(items)
    }
}
