//! Request lifecycle store.
//!
//! [`RequestStore`] is the persistence seam used by the services. Two
//! implementations exist: [`RequestRepository`] over sea-orm, and
//! [`InMemoryRequestStore`] for tests and local runs.

pub mod memory;
pub mod request;

pub use memory::InMemoryRequestStore;
pub use request::RequestRepository;

use crate::models::{NewTravelRequest, Party, TravelRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use travel_cost_common::AppResult;

/// Persistent home of requests and the parties they reference.
///
/// Creation checks child coverage and writes the request atomically.
/// Consent and deactivation are conditional writes that only take effect
/// while the request is still active.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Find a party by personal identifier.
    async fn find_party_by_ident(&self, ident: &str) -> AppResult<Option<Party>>;

    /// Find the active request that covers a child, if any.
    async fn find_active_request_covering_child(
        &self,
        child_ident: &str,
    ) -> AppResult<Option<TravelRequest>>;

    /// Find a request by ID, only if it is still active.
    async fn find_active_request(&self, id: i32) -> AppResult<Option<TravelRequest>>;

    /// Find a request by ID regardless of state.
    async fn find_request(&self, id: i32) -> AppResult<Option<TravelRequest>>;

    /// All requests where the identity is main party or counterparty, oldest first.
    async fn find_requests_for_party(&self, ident: &str) -> AppResult<Vec<TravelRequest>>;

    /// Store a new request.
    ///
    /// Parties are reused when a row with the identifier exists and created
    /// otherwise. Fails with `ValidationRejected(ChildAlreadyInActiveRequest)`
    /// if any child is covered by an active request at commit time.
    async fn create_request(&self, request: NewTravelRequest) -> AppResult<TravelRequest>;

    /// Set `consented_at` if the request is active, requires consent and has
    /// not been consented. Returns whether the write took effect.
    async fn record_consent(&self, id: i32, at: DateTime<Utc>) -> AppResult<bool>;

    /// Set `deactivated_at` if the request is active and release its children.
    /// Returns whether the write took effect.
    async fn record_deactivation(&self, id: i32, at: DateTime<Utc>) -> AppResult<bool>;

    /// Delete parties no request refers to. Returns the number removed.
    async fn remove_unreferenced_parties(&self) -> AppResult<u64>;
}
