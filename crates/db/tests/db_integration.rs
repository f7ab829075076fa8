//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `travel_cost_test`)
//!   `TEST_DB_PASSWORD` (default: `travel_cost_test`)

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use chrono::Utc;
use tokio::task::JoinSet;
use travel_cost_common::{AppError, RejectionReason};
use travel_cost_db::test_utils::{TestDatabase, TestDbConfig};
use travel_cost_db::{NewTravelRequest, RequestRepository, RequestStore};

fn new_request(main: &str, counter: &str, children: &[&str]) -> NewTravelRequest {
    NewTravelRequest {
        main_party_ident: main.to_string(),
        counterparty_ident: counter.to_string(),
        children: children.iter().map(ToString::to_string).collect::<BTreeSet<_>>(),
        requires_consent: true,
        created_at: Utc::now(),
    }
}

async fn repository() -> (TestDatabase, RequestRepository) {
    let db = TestDatabase::create_unique().await.expect("Failed to create database");
    let repo = RequestRepository::new(db.connection());
    (db, repo)
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_create_and_load_request() {
    let (db, repo) = repository().await;

    let created = repo
        .create_request(new_request("12345678910", "11111122222", &["33333355555"]))
        .await
        .unwrap();
    let loaded = repo.find_active_request(created.id).await.unwrap().unwrap();

    assert_eq!(created, loaded);
    assert!(loaded.is_pending());

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_child_is_released_by_deactivation() {
    let (db, repo) = repository().await;

    let first = repo
        .create_request(new_request("12345678910", "11111122222", &["33333355555"]))
        .await
        .unwrap();

    let again = repo
        .create_request(new_request("12345678910", "11111122222", &["33333355555"]))
        .await;
    assert!(matches!(
        again,
        Err(AppError::ValidationRejected(
            RejectionReason::ChildAlreadyInActiveRequest
        ))
    ));

    assert!(repo.record_deactivation(first.id, Utc::now()).await.unwrap());
    assert!(
        repo.find_active_request_covering_child("33333355555")
            .await
            .unwrap()
            .is_none()
    );

    let second = repo
        .create_request(new_request("12345678910", "11111122222", &["33333355555"]))
        .await
        .unwrap();
    assert_eq!(second.main_party.id, first.main_party.id);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_consent_after_deactivation_is_refused() {
    let (db, repo) = repository().await;

    let request = repo
        .create_request(new_request("12345678910", "11111122222", &["33333355555"]))
        .await
        .unwrap();

    assert!(repo.record_deactivation(request.id, Utc::now()).await.unwrap());
    assert!(!repo.record_consent(request.id, Utc::now()).await.unwrap());

    let stored = repo.find_request(request.id).await.unwrap().unwrap();
    assert!(stored.consented_at.is_none());
    assert!(stored.deactivated_at.is_some());

    db.drop_database().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_creation_for_same_child_has_one_winner() {
    let (db, repo) = repository().await;

    let mut attempts = JoinSet::new();
    for i in 0..8 {
        let repo = repo.clone();
        attempts.spawn(async move {
            let main = format!("1000000000{i}");
            repo.create_request(new_request(&main, "11111122222", &["33333355555"]))
                .await
        });
    }

    let mut successes = 0;
    while let Some(result) = attempts.join_next().await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(
                err.rejection_reason(),
                Some(RejectionReason::ChildAlreadyInActiveRequest)
            ),
        }
    }
    assert_eq!(successes, 1);

    db.drop_database().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires running PostgreSQL instance"]
async fn test_opposite_requests_between_new_parties_both_succeed() {
    let (db, repo) = repository().await;

    let forward = {
        let repo = repo.clone();
        tokio::spawn(async move {
            repo.create_request(new_request("12345678910", "11111122222", &["33333355555"]))
                .await
        })
    };
    let backward = {
        let repo = repo.clone();
        tokio::spawn(async move {
            repo.create_request(new_request("11111122222", "12345678910", &["44444466666"]))
                .await
        })
    };

    let forward = forward.await.unwrap().unwrap();
    let backward = backward.await.unwrap().unwrap();

    assert_eq!(forward.main_party.id, backward.counterparty.id);
    assert_eq!(forward.counterparty.id, backward.main_party.id);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_unreferenced_parties_are_removed_explicitly() {
    let (db, repo) = repository().await;

    repo.create_request(new_request("12345678910", "11111122222", &["33333355555"]))
        .await
        .unwrap();

    assert_eq!(repo.remove_unreferenced_parties().await.unwrap(), 0);
    assert!(repo.find_party_by_ident("12345678910").await.unwrap().is_some());

    db.drop_database().await.unwrap();
}
