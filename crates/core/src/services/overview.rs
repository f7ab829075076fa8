//! Party overview service.

#![allow(missing_docs)]

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use travel_cost_common::AppResult;
use travel_cost_db::{RequestStatus, RequestStore, TravelRequest};

use crate::services::directory_session::{CacheScope, DirectorySession};
use crate::services::person_directory::{FamilyMember, PersonDirectory};

/// A co-parent and the shared children still below the self consent age.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoParentOverview {
    pub co_parent: FamilyMember,
    pub children: Vec<FamilyMember>,
}

/// A request as listed in an overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSummary {
    pub id: i32,
    pub main_party: String,
    pub counterparty: String,
    pub children: BTreeSet<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub consented_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl From<TravelRequest> for RequestSummary {
    fn from(r: TravelRequest) -> Self {
        Self {
            id: r.id,
            status: r.status(),
            main_party: r.main_party.ident,
            counterparty: r.counterparty.ident,
            children: r.children,
            created_at: r.created_at,
            consented_at: r.consented_at,
            deactivated_at: r.deactivated_at,
        }
    }
}

/// Everything a party sees on their landing page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyOverview {
    pub first_name: Option<String>,
    pub co_parents: Vec<CoParentOverview>,
    pub children_of_consent_age: Vec<FamilyMember>,
    pub requests_as_main_party: Vec<RequestSummary>,
    pub requests_as_counterparty: Vec<RequestSummary>,
}

/// Overview service.
#[derive(Clone)]
pub struct OverviewService {
    store: Arc<dyn RequestStore>,
    directory: Arc<dyn PersonDirectory>,
    self_consent_age: u32,
}

impl OverviewService {
    /// Create a new overview service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RequestStore>,
        directory: Arc<dyn PersonDirectory>,
        self_consent_age: u32,
    ) -> Self {
        Self {
            store,
            directory,
            self_consent_age,
        }
    }

    /// Overview for `principal`.
    pub async fn overview(&self, principal: &str) -> AppResult<PartyOverview> {
        let session = DirectorySession::new(principal, self.directory.clone())
            .with_scope(CacheScope::Operation);
        self.overview_in_session(&session).await
    }

    /// Overview for the principal of an open session.
    pub async fn overview_in_session(&self, session: &DirectorySession) -> AppResult<PartyOverview> {
        self.overview_on(session, Utc::now().date_naive()).await
    }

    async fn overview_on(
        &self,
        session: &DirectorySession,
        today: NaiveDate,
    ) -> AppResult<PartyOverview> {
        let principal = session.principal();
        let info = session
            .person_info(principal)
            .await
            .map_err(|e| e.into_app_error(principal))?;
        let family = session
            .family(principal)
            .await
            .map_err(|e| e.into_app_error(principal))?;

        let under_age = |c: &FamilyMember| c.age_on(today).is_none_or(|age| age < self.self_consent_age);

        let co_parents: Vec<CoParentOverview> = family
            .co_parent_relations
            .iter()
            .filter_map(|r| {
                let children: Vec<FamilyMember> =
                    r.shared_children.iter().filter(|c| under_age(*c)).cloned().collect();
                (!children.is_empty()).then(|| CoParentOverview {
                    co_parent: r.co_parent.clone(),
                    children,
                })
            })
            .collect();

        let children_of_consent_age: Vec<FamilyMember> = family
            .children()
            .into_iter()
            .filter(|c| !under_age(*c))
            .cloned()
            .collect();

        let (as_main, as_counter): (Vec<TravelRequest>, Vec<TravelRequest>) = self
            .store
            .find_requests_for_party(principal)
            .await?
            .into_iter()
            .partition(|r| r.main_party.ident == principal);

        debug!(
            co_parents = co_parents.len(),
            requests = as_main.len() + as_counter.len(),
            "Built party overview"
        );

        Ok(PartyOverview {
            first_name: info.first_name,
            co_parents,
            children_of_consent_age,
            requests_as_main_party: as_main.into_iter().map(Into::into).collect(),
            requests_as_counterparty: as_counter.into_iter().map(Into::into).collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::person_directory::{CoParentRelation, DirectoryError, FamilyRelations};
    use crate::services::test_support::{FakeDirectory, member, member_born};
    use travel_cost_common::AppError;
    use travel_cost_db::{InMemoryRequestStore, NewTravelRequest};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_directory() -> FakeDirectory {
        FakeDirectory::default()
            .with_person(&member("A"))
            .with_family(
                "A",
                FamilyRelations {
                    co_parent_relations: vec![
                        CoParentRelation {
                            co_parent: member("B"),
                            shared_children: vec![
                                member_born("YOUNG", date(2018, 5, 1)),
                                member_born("OLD", date(2008, 5, 1)),
                            ],
                        },
                        CoParentRelation {
                            co_parent: member("D"),
                            shared_children: vec![member_born("TEEN", date(2009, 1, 1))],
                        },
                    ],
                    children_without_co_parent: vec![],
                },
            )
    }

    async fn create_request(store: &InMemoryRequestStore, main: &str, counter: &str, child: &str) {
        store
            .create_request(NewTravelRequest {
                main_party_ident: main.to_string(),
                counterparty_ident: counter.to_string(),
                children: BTreeSet::from([child.to_string()]),
                requires_consent: true,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_overview_splits_children_by_age() {
        let store = InMemoryRequestStore::new();
        let directory = Arc::new(create_test_directory());
        let service = OverviewService::new(Arc::new(store), directory.clone(), 15);
        let session = DirectorySession::new("A", directory);

        let overview = service.overview_on(&session, date(2025, 1, 1)).await.unwrap();

        assert_eq!(overview.first_name.as_deref(), Some("Name A"));
        assert_eq!(overview.co_parents.len(), 1);
        assert_eq!(overview.co_parents[0].co_parent.ident, "B");
        assert_eq!(overview.co_parents[0].children[0].ident, "YOUNG");

        let adults: Vec<&str> = overview
            .children_of_consent_age
            .iter()
            .map(|c| c.ident.as_str())
            .collect();
        assert_eq!(adults, vec!["OLD", "TEEN"]);
    }

    #[tokio::test]
    async fn test_overview_lists_requests_by_role() {
        let store = InMemoryRequestStore::new();
        create_request(&store, "A", "B", "YOUNG").await;
        create_request(&store, "D", "A", "OTHER").await;
        store.record_deactivation(2, Utc::now()).await.unwrap();

        let service = OverviewService::new(Arc::new(store), Arc::new(create_test_directory()), 15);
        let overview = service.overview("A").await.unwrap();

        assert_eq!(overview.requests_as_main_party.len(), 1);
        assert_eq!(overview.requests_as_main_party[0].status, RequestStatus::Pending);
        assert_eq!(overview.requests_as_counterparty.len(), 1);
        assert_eq!(
            overview.requests_as_counterparty[0].status,
            RequestStatus::Deactivated
        );
    }

    #[tokio::test]
    async fn test_overview_maps_directory_failures() {
        let store = Arc::new(InMemoryRequestStore::new());

        let missing = OverviewService::new(store.clone(), Arc::new(FakeDirectory::default()), 15);
        assert!(matches!(
            missing.overview("A").await,
            Err(AppError::SubjectNotFound(_))
        ));

        let failing = OverviewService::new(
            store,
            Arc::new(FakeDirectory::default().failing(DirectoryError::Upstream { status: None })),
            15,
        );
        assert!(matches!(
            failing.overview("A").await,
            Err(AppError::UpstreamUnavailable { status: None })
        ));
    }
}
