//! Create `party` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Party::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Party::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Party::Ident).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Party::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: ident - a party is identified by its personal identifier
        manager
            .create_index(
                Index::create()
                    .name("idx_party_ident")
                    .table(Party::Table)
                    .col(Party::Ident)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Party::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum Party {
    Table,
    Id,
    Ident,
    CreatedAt,
}
