//! Create `request_child` table migration.

use super::m20250101_000002_create_travel_request_table::TravelRequest;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RequestChild::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(RequestChild::RequestId).integer().not_null())
                    .col(
                        ColumnDef::new(RequestChild::ChildIdent)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RequestChild::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .primary_key(
                        Index::create()
                            .col(RequestChild::RequestId)
                            .col(RequestChild::ChildIdent),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_child_request")
                            .from(RequestChild::Table, RequestChild::RequestId)
                            .to(TravelRequest::Table, TravelRequest::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Partial unique index: at most one active request per child,
        // across all party pairs
        manager
            .get_connection()
            .execute_unprepared(
                r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_request_child_active_child
                ON request_child (child_ident)
                WHERE active;
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RequestChild::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RequestChild {
    Table,
    RequestId,
    ChildIdent,
    Active,
}
