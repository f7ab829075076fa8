//! In-memory request store.
//!
//! Keeps the same guarantees as the database store by doing every check and
//! write under one lock.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::{NewTravelRequest, Party, TravelRequest};
use crate::repositories::RequestStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use travel_cost_common::{AppError, AppResult, RejectionReason};

#[derive(Debug, Default)]
struct MemoryState {
    parties: BTreeMap<String, Party>,
    requests: BTreeMap<i32, TravelRequest>,
    next_party_id: i32,
    next_request_id: i32,
}

impl MemoryState {
    fn party(&mut self, ident: &str) -> Party {
        if let Some(existing) = self.parties.get(ident) {
            return existing.clone();
        }
        self.next_party_id += 1;
        let party = Party {
            id: self.next_party_id,
            ident: ident.to_string(),
        };
        self.parties.insert(ident.to_string(), party.clone());
        party
    }
}

/// Request store backed by process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRequestStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRequestStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active requests covering a child.
    pub async fn active_coverage(&self, child_ident: &str) -> usize {
        let state = self.state.lock().await;
        state
            .requests
            .values()
            .filter(|r| r.is_active() && r.children.contains(child_ident))
            .count()
    }

    /// Number of stored parties.
    pub async fn party_count(&self) -> usize {
        self.state.lock().await.parties.len()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn find_party_by_ident(&self, ident: &str) -> AppResult<Option<Party>> {
        Ok(self.state.lock().await.parties.get(ident).cloned())
    }

    async fn find_active_request_covering_child(
        &self,
        child_ident: &str,
    ) -> AppResult<Option<TravelRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .find(|r| r.is_active() && r.children.contains(child_ident))
            .cloned())
    }

    async fn find_active_request(&self, id: i32) -> AppResult<Option<TravelRequest>> {
        let state = self.state.lock().await;
        Ok(state.requests.get(&id).filter(|r| r.is_active()).cloned())
    }

    async fn find_request(&self, id: i32) -> AppResult<Option<TravelRequest>> {
        Ok(self.state.lock().await.requests.get(&id).cloned())
    }

    async fn find_requests_for_party(&self, ident: &str) -> AppResult<Vec<TravelRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .filter(|r| r.involves(ident))
            .cloned()
            .collect())
    }

    async fn create_request(&self, request: NewTravelRequest) -> AppResult<TravelRequest> {
        if request.children.is_empty() {
            return Err(AppError::InvalidInput(
                "A request must name at least one child".to_string(),
            ));
        }

        let mut state = self.state.lock().await;

        let covered = state.requests.values().any(|r| {
            r.is_active() && r.children.iter().any(|c| request.children.contains(c))
        });
        if covered {
            return Err(AppError::ValidationRejected(
                RejectionReason::ChildAlreadyInActiveRequest,
            ));
        }

        let main_party = state.party(&request.main_party_ident);
        let counterparty = state.party(&request.counterparty_ident);

        state.next_request_id += 1;
        let stored = TravelRequest {
            id: state.next_request_id,
            main_party,
            counterparty,
            children: request.children,
            requires_consent: request.requires_consent,
            created_at: request.created_at,
            consented_at: None,
            deactivated_at: None,
        };
        state.requests.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn record_consent(&self, id: i32, at: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.requests.get_mut(&id) {
            Some(r) if r.is_pending() => {
                r.consented_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_deactivation(&self, id: i32, at: DateTime<Utc>) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.requests.get_mut(&id) {
            Some(r) if r.is_active() => {
                r.deactivated_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_unreferenced_parties(&self) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let MemoryState {
            parties, requests, ..
        } = &mut *state;

        let before = parties.len();
        parties.retain(|ident, _| requests.values().any(|r| r.involves(ident)));

        Ok((before - parties.len()) as u64)
    }
}
