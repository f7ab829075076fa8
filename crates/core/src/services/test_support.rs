//! In-process person directory for tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use travel_cost_common::AppResult;
use travel_cost_db::{InMemoryRequestStore, NewTravelRequest, Party, RequestStore, TravelRequest};

use crate::services::person_directory::{
    CoParentRelation, DirectoryError, FamilyMember, FamilyRelations, PersonDirectory, PersonInfo,
};

pub(crate) fn member(ident: &str) -> FamilyMember {
    FamilyMember {
        ident: ident.to_string(),
        first_name: Some(format!("Name {ident}")),
        birthdate: NaiveDate::from_ymd_opt(2015, 1, 1),
    }
}

pub(crate) fn member_born(ident: &str, birthdate: NaiveDate) -> FamilyMember {
    FamilyMember {
        birthdate: Some(birthdate),
        ..member(ident)
    }
}

/// Directory answering from fixed tables and counting calls.
#[derive(Default)]
pub(crate) struct FakeDirectory {
    families: HashMap<String, FamilyRelations>,
    persons: HashMap<String, PersonInfo>,
    failure: Option<DirectoryError>,
    family_calls: AtomicUsize,
    person_calls: AtomicUsize,
}

impl FakeDirectory {
    /// `main` and `co_parent` share `child`.
    pub(crate) fn with_shared_child(main: &str, co_parent: &str, child: &str) -> Self {
        Self::default()
            .with_family(
                main,
                FamilyRelations {
                    co_parent_relations: vec![CoParentRelation {
                        co_parent: member(co_parent),
                        shared_children: vec![member(child)],
                    }],
                    children_without_co_parent: vec![],
                },
            )
            .with_family(
                co_parent,
                FamilyRelations {
                    co_parent_relations: vec![CoParentRelation {
                        co_parent: member(main),
                        shared_children: vec![member(child)],
                    }],
                    children_without_co_parent: vec![],
                },
            )
            .with_person(&member(main))
            .with_person(&member(co_parent))
            .with_person(&member(child))
    }

    pub(crate) fn with_family(mut self, ident: &str, family: FamilyRelations) -> Self {
        self.families.insert(ident.to_string(), family);
        self
    }

    pub(crate) fn with_person(mut self, person: &FamilyMember) -> Self {
        self.persons.insert(
            person.ident.clone(),
            PersonInfo {
                ident: person.ident.clone(),
                first_name: person.first_name.clone(),
                birthdate: person.birthdate,
            },
        );
        self
    }

    pub(crate) fn failing(mut self, error: DirectoryError) -> Self {
        self.failure = Some(error);
        self
    }

    pub(crate) fn family_calls(&self) -> usize {
        self.family_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn person_calls(&self) -> usize {
        self.person_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersonDirectory for FakeDirectory {
    async fn fetch_family(&self, ident: &str) -> Result<FamilyRelations, DirectoryError> {
        self.family_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.families
            .get(ident)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn fetch_person_info(&self, ident: &str) -> Result<PersonInfo, DirectoryError> {
        self.person_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.persons.get(ident).cloned().ok_or(DirectoryError::NotFound)
    }
}

/// Store whose reads come from `inner` but whose conditional writes never apply,
/// as if another caller changed the request between read and write.
pub(crate) struct StaleStore {
    pub(crate) inner: InMemoryRequestStore,
}

#[async_trait]
impl RequestStore for StaleStore {
    async fn find_party_by_ident(&self, ident: &str) -> AppResult<Option<Party>> {
        self.inner.find_party_by_ident(ident).await
    }

    async fn find_active_request_covering_child(
        &self,
        child_ident: &str,
    ) -> AppResult<Option<TravelRequest>> {
        self.inner.find_active_request_covering_child(child_ident).await
    }

    async fn find_active_request(&self, id: i32) -> AppResult<Option<TravelRequest>> {
        self.inner.find_active_request(id).await
    }

    async fn find_request(&self, id: i32) -> AppResult<Option<TravelRequest>> {
        self.inner.find_request(id).await
    }

    async fn find_requests_for_party(&self, ident: &str) -> AppResult<Vec<TravelRequest>> {
        self.inner.find_requests_for_party(ident).await
    }

    async fn create_request(&self, request: NewTravelRequest) -> AppResult<TravelRequest> {
        self.inner.create_request(request).await
    }

    async fn record_consent(&self, _id: i32, _at: DateTime<Utc>) -> AppResult<bool> {
        Ok(false)
    }

    async fn record_deactivation(&self, _id: i32, _at: DateTime<Utc>) -> AppResult<bool> {
        Ok(false)
    }

    async fn remove_unreferenced_parties(&self) -> AppResult<u64> {
        self.inner.remove_unreferenced_parties().await
    }
}
