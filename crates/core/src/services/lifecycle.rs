//! Request lifecycle service.
//!
//! Orchestrates create, consent and deactivate: directory data comes in
//! through a [`DirectorySession`], decisions come from [`crate::validation`],
//! and every state change is a single store write. A failed decision or
//! lookup leaves the store untouched.

use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use travel_cost_common::{AppError, AppResult, ConsentPolicy, Locale, RejectionReason};
use travel_cost_db::{NewTravelRequest, RequestStore, TravelRequest};
use validator::{Validate, ValidationError};

use crate::services::directory_session::{CacheKeyFn, CacheScope, DirectorySession};
use crate::services::document::{ConfirmationDocument, DocumentPerson, DocumentRenderer};
use crate::services::person_directory::PersonDirectory;
use crate::validation::{
    validate_consent, validate_deactivation, validate_document_access, validate_new_request,
};

/// Input for creating a request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestInput {
    /// Personal identifier of the initiating parent.
    #[validate(length(min = 1, max = 32))]
    pub main_party: String,
    /// Personal identifier of the other parent.
    #[validate(length(min = 1, max = 32))]
    pub counterparty: String,
    /// Children to cover. Duplicates collapse.
    #[validate(length(min = 1), custom(function = "validate_child_idents"))]
    pub children: Vec<String>,
}

fn validate_child_idents(children: &[String]) -> Result<(), ValidationError> {
    if children.iter().any(|c| c.is_empty() || c.len() > 32) {
        return Err(ValidationError::new("child_ident_length"));
    }
    Ok(())
}

/// Lifecycle service for travel cost requests.
#[derive(Clone)]
pub struct LifecycleService {
    store: Arc<dyn RequestStore>,
    directory: Arc<dyn PersonDirectory>,
    renderer: Arc<dyn DocumentRenderer>,
    consent_policy: ConsentPolicy,
    key_fn: Option<CacheKeyFn>,
}

impl LifecycleService {
    /// Create a new lifecycle service.
    #[must_use]
    pub fn new(
        store: Arc<dyn RequestStore>,
        directory: Arc<dyn PersonDirectory>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            store,
            directory,
            renderer,
            consent_policy: ConsentPolicy::default(),
            key_fn: None,
        }
    }

    /// Set the consent policy.
    pub fn set_consent_policy(&mut self, policy: ConsentPolicy) {
        self.consent_policy = policy;
    }

    /// Set the directory cache key function.
    pub fn set_cache_key_fn(&mut self, key_fn: CacheKeyFn) {
        self.key_fn = Some(key_fn);
    }

    fn session(&self, principal: &str, scope: CacheScope) -> DirectorySession {
        let session = match &self.key_fn {
            Some(key_fn) => {
                DirectorySession::with_key_fn(principal, self.directory.clone(), key_fn.clone())
            }
            None => DirectorySession::new(principal, self.directory.clone()),
        };
        session.with_scope(scope)
    }

    /// Open a directory session that the `*_in_session` calls can share.
    #[must_use]
    pub fn open_session(&self, principal: &str) -> DirectorySession {
        self.session(principal, CacheScope::Session)
    }

    fn ensure_principal(session: &DirectorySession, acting: &str) -> AppResult<()> {
        if session.principal() == acting {
            Ok(())
        } else {
            Err(AppError::InvalidInput(
                "Directory session belongs to another principal".to_string(),
            ))
        }
    }

    /// Create a request. Returns the new request id.
    pub async fn create_request(&self, input: CreateRequestInput) -> AppResult<i32> {
        let session = self.session(&input.main_party, CacheScope::Operation);
        self.create_request_in_session(&session, input).await
    }

    /// Create a request using an open session of the main party.
    pub async fn create_request_in_session(
        &self,
        session: &DirectorySession,
        input: CreateRequestInput,
    ) -> AppResult<i32> {
        input.validate()?;
        Self::ensure_principal(session, &input.main_party)?;

        let children: BTreeSet<String> = input.children.into_iter().collect();

        let family = session
            .family(&input.main_party)
            .await
            .map_err(|e| e.into_app_error(&input.main_party))?;

        let mut covered = BTreeSet::new();
        for child in &children {
            if self
                .store
                .find_active_request_covering_child(child)
                .await?
                .is_some()
            {
                covered.insert(child.clone());
            }
        }

        let requires_consent = validate_new_request(
            &input.main_party,
            &input.counterparty,
            &children,
            &family,
            &covered,
            self.consent_policy,
        )
        .map_err(|reason| {
            warn!(reason = %reason, "New request rejected");
            info!(
                target: "secure_log",
                main_party = %input.main_party,
                counterparty = %input.counterparty,
                children = ?children,
                reason = %reason,
                "New request rejected"
            );
            AppError::ValidationRejected(reason)
        })?;

        let created = self
            .store
            .create_request(NewTravelRequest {
                main_party_ident: input.main_party,
                counterparty_ident: input.counterparty,
                children,
                requires_consent,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            request_id = created.id,
            requires_consent,
            scope = ?session.scope(),
            "Created travel cost request"
        );
        info!(
            target: "secure_log",
            request_id = created.id,
            main_party = %created.main_party.ident,
            counterparty = %created.counterparty.ident,
            "Created travel cost request"
        );

        Ok(created.id)
    }

    /// Record the counterparty's consent.
    pub async fn give_consent(&self, request_id: i32, acting: &str) -> AppResult<()> {
        let request = self.store.find_active_request(request_id).await?;
        validate_consent(request.as_ref(), acting).map_err(|reason| {
            warn!(request_id, reason = %reason, "Consent refused");
            AppError::NotAuthorized(reason)
        })?;

        if !self.store.record_consent(request_id, Utc::now()).await? {
            warn!(request_id, "Request changed before consent was recorded");
            return Err(AppError::NotAuthorized(
                RejectionReason::NoMatchingActiveRequest,
            ));
        }

        info!(request_id, "Consent given");
        info!(target: "secure_log", request_id, counterparty = %acting, "Consent given");
        Ok(())
    }

    /// Consent using an open session of the counterparty.
    pub async fn give_consent_in_session(
        &self,
        session: &DirectorySession,
        request_id: i32,
    ) -> AppResult<()> {
        self.give_consent(request_id, session.principal()).await
    }

    /// Deactivate a request on behalf of its main party.
    pub async fn deactivate_request(&self, request_id: i32, acting: &str) -> AppResult<()> {
        let request = self.store.find_active_request(request_id).await?;
        validate_deactivation(request.as_ref(), acting).map_err(|reason| {
            warn!(request_id, reason = %reason, "Deactivation refused");
            AppError::NotAuthorized(reason)
        })?;

        if !self.store.record_deactivation(request_id, Utc::now()).await? {
            warn!(request_id, "Request was deactivated concurrently");
            return Err(AppError::NotAuthorized(
                RejectionReason::NotAuthorizedOrAlreadyInactive,
            ));
        }

        info!(request_id, "Request deactivated");
        info!(target: "secure_log", request_id, main_party = %acting, "Request deactivated");
        Ok(())
    }

    /// Deactivate using an open session of the main party.
    pub async fn deactivate_request_in_session(
        &self,
        session: &DirectorySession,
        request_id: i32,
    ) -> AppResult<()> {
        self.deactivate_request(request_id, session.principal()).await
    }

    /// Render the confirmation document of an in-effect request.
    pub async fn confirmation_document(
        &self,
        request_id: i32,
        acting: &str,
        locale: Locale,
    ) -> AppResult<Vec<u8>> {
        let session = self.session(acting, CacheScope::Operation);
        self.confirmation_document_in_session(&session, request_id, locale)
            .await
    }

    /// Render the confirmation document using an open session.
    pub async fn confirmation_document_in_session(
        &self,
        session: &DirectorySession,
        request_id: i32,
        locale: Locale,
    ) -> AppResult<Vec<u8>> {
        let request = self.store.find_request(request_id).await?;
        validate_document_access(request.as_ref(), session.principal())
            .map_err(AppError::NotAuthorized)?;
        let Some(request) = request else {
            return Err(AppError::NotAuthorized(RejectionReason::RequestNotInEffect));
        };

        let document = self.resolve_document(session, &request, locale).await?;
        debug!(request_id, children = document.children.len(), "Rendering confirmation document");
        self.renderer.render(&document).await
    }

    async fn resolve_document(
        &self,
        session: &DirectorySession,
        request: &TravelRequest,
        locale: Locale,
    ) -> AppResult<ConfirmationDocument> {
        let person = |ident: String| async move {
            session
                .person_info(&ident)
                .await
                .map(DocumentPerson::from)
                .map_err(|e| e.into_app_error(&ident))
        };

        let main_party = person(request.main_party.ident.clone()).await?;
        let counterparty = person(request.counterparty.ident.clone()).await?;
        let mut children = Vec::with_capacity(request.children.len());
        for child in &request.children {
            children.push(person(child.clone()).await?);
        }

        Ok(ConfirmationDocument {
            request_id: request.id,
            locale,
            main_party,
            counterparty,
            children,
        })
    }
}
