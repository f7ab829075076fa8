//! Child covered by a travel request.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "request_child")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub request_id: i32,

    #[sea_orm(primary_key, auto_increment = false)]
    pub child_ident: String,

    /// Mirrors whether the owning request is active. A partial unique index on
    /// `child_ident WHERE active` keeps one active request per child.
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::travel_request::Entity",
        from = "Column::RequestId",
        to = "super::travel_request::Column::Id",
        on_delete = "Restrict"
    )]
    Request,
}

impl Related<super::travel_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
