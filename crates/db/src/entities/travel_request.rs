//! Travel cost sharing request entity.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "travel_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// The parent who initiated the request
    pub main_party_id: i32,

    /// The other named parent
    pub counterparty_id: i32,

    /// Fixed at creation
    pub requires_consent: bool,

    pub created_at: DateTimeUtc,

    /// Set once, when the counterparty consents
    #[sea_orm(nullable)]
    pub consented_at: Option<DateTimeUtc>,

    /// Set once, when the main party deactivates. Terminal.
    #[sea_orm(nullable)]
    pub deactivated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::party::Entity",
        from = "Column::MainPartyId",
        to = "super::party::Column::Id",
        on_delete = "Restrict"
    )]
    MainParty,

    #[sea_orm(
        belongs_to = "super::party::Entity",
        from = "Column::CounterpartyId",
        to = "super::party::Column::Id",
        on_delete = "Restrict"
    )]
    Counterparty,

    #[sea_orm(has_many = "super::request_child::Entity")]
    Children,
}

impl Related<super::request_child::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Children.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
