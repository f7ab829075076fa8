//! Create `travel_request` table migration.

use super::m20250101_000001_create_party_table::Party;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TravelRequest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TravelRequest::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TravelRequest::MainPartyId).integer().not_null())
                    .col(
                        ColumnDef::new(TravelRequest::CounterpartyId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TravelRequest::RequiresConsent)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TravelRequest::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(TravelRequest::ConsentedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TravelRequest::DeactivatedAt).timestamp_with_time_zone())
                    .check(
                        Expr::col(TravelRequest::MainPartyId)
                            .ne(Expr::col(TravelRequest::CounterpartyId)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_travel_request_main_party")
                            .from(TravelRequest::Table, TravelRequest::MainPartyId)
                            .to(Party::Table, Party::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_travel_request_counterparty")
                            .from(TravelRequest::Table, TravelRequest::CounterpartyId)
                            .to(Party::Table, Party::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: main_party_id (for listing a party's requests)
        manager
            .create_index(
                Index::create()
                    .name("idx_travel_request_main_party_id")
                    .table(TravelRequest::Table)
                    .col(TravelRequest::MainPartyId)
                    .to_owned(),
            )
            .await?;

        // Index: counterparty_id (for listing requests awaiting consent)
        manager
            .create_index(
                Index::create()
                    .name("idx_travel_request_counterparty_id")
                    .table(TravelRequest::Table)
                    .col(TravelRequest::CounterpartyId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TravelRequest::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub(super) enum TravelRequest {
    Table,
    Id,
    MainPartyId,
    CounterpartyId,
    RequiresConsent,
    CreatedAt,
    ConsentedAt,
    DeactivatedAt,
}
