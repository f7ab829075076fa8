//! Request aggregate as seen by the services.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// A parent. Identity is the personal identifier alone.
#[derive(Debug, Clone, Serialize)]
pub struct Party {
    /// Surrogate storage key.
    #[serde(skip)]
    pub id: i32,
    /// National personal identifier.
    pub ident: String,
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.ident == other.ident
    }
}

impl Eq for Party {}

impl Hash for Party {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ident.hash(state);
    }
}

/// Lifecycle state derived from a request's timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Active, waiting for the counterparty's consent.
    Pending,
    /// Active and no longer waiting for anything.
    InEffect,
    /// Deactivated. Terminal.
    Deactivated,
}

/// A request to split travel costs between two parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelRequest {
    /// Surrogate id, the external handle.
    pub id: i32,
    /// Initiating parent.
    pub main_party: Party,
    /// Parent whose consent may be required.
    pub counterparty: Party,
    /// Identifiers of the covered children.
    pub children: BTreeSet<String>,
    /// Fixed at creation.
    pub requires_consent: bool,
    pub created_at: DateTime<Utc>,
    /// Set once, never cleared.
    pub consented_at: Option<DateTime<Utc>>,
    /// Set once. Terminal.
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl TravelRequest {
    /// Whether the request has not been deactivated.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.deactivated_at.is_none()
    }

    /// Whether the request is active and still waiting for consent.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.is_active() && self.requires_consent && self.consented_at.is_none()
    }

    /// Whether the request is active and consent is either given or not needed.
    #[must_use]
    pub const fn is_in_effect(&self) -> bool {
        self.is_active() && (!self.requires_consent || self.consented_at.is_some())
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        if !self.is_active() {
            RequestStatus::Deactivated
        } else if self.is_pending() {
            RequestStatus::Pending
        } else {
            RequestStatus::InEffect
        }
    }

    /// Whether the given identity is one of the two parties.
    #[must_use]
    pub fn involves(&self, ident: &str) -> bool {
        self.main_party.ident == ident || self.counterparty.ident == ident
    }
}

/// Everything needed to store a new request.
#[derive(Debug, Clone)]
pub struct NewTravelRequest {
    /// Personal identifier of the initiating parent.
    pub main_party_ident: String,
    /// Personal identifier of the other parent.
    pub counterparty_ident: String,
    /// Children the request covers. Must not be empty.
    pub children: BTreeSet<String>,
    /// Whether the counterparty has to consent before the request is in effect.
    pub requires_consent: bool,
    /// Creation time, also used for parties created with the request.
    pub created_at: DateTime<Utc>,
}
