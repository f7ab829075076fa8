//! Database entities.

#![allow(missing_docs)]

pub mod party;
pub mod request_child;
pub mod travel_request;

pub use party::Entity as PartyEntity;
pub use request_child::Entity as RequestChildEntity;
pub use travel_request::Entity as TravelRequestEntity;
