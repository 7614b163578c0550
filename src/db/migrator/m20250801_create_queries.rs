use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Queries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Queries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Queries::QueryData).json().not_null())
                    // Result pages routinely exceed MySQL's 64 KiB TEXT limit.
                    .col(
                        ColumnDef::new(Queries::RawResponse)
                            .custom(Alias::new("LONGTEXT"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Queries::Timestamp)
                            .date_time()
                            .not_null()
                            .extra("DEFAULT CURRENT_TIMESTAMP".to_owned()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Queries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Queries {
    Table,
    Id,
    QueryData,
    RawResponse,
    Timestamp,
}
