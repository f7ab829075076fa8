//! Lifecycle decisions.
//!
//! Pure functions over already fetched data. Nothing here performs I/O or
//! mutates state; each function returns a decision value.

use std::collections::{BTreeSet, HashSet};
use travel_cost_common::{ConsentPolicy, RejectionReason};
use travel_cost_db::TravelRequest;

use crate::services::person_directory::FamilyRelations;

/// Decide whether a new request may be created.
///
/// `covered` holds the named children that an active request already covers,
/// as reported by the store. Rules are checked in order and the first failure
/// wins. On success returns whether the counterparty must consent.
pub fn validate_new_request(
    main_party: &str,
    counterparty: &str,
    children: &BTreeSet<String>,
    family: &FamilyRelations,
    covered: &BTreeSet<String>,
    policy: ConsentPolicy,
) -> Result<bool, RejectionReason> {
    if family.is_empty() {
        return Err(RejectionReason::NoFamilyRelations);
    }

    if main_party == counterparty || !family.has_co_parent(counterparty) {
        return Err(RejectionReason::NoRelationToCounterparty);
    }

    if !children.iter().all(|c| family.has_child(c)) {
        return Err(RejectionReason::NoRelationToChild);
    }

    if children.iter().any(|c| covered.contains(c)) {
        return Err(RejectionReason::ChildAlreadyInActiveRequest);
    }

    let shared: HashSet<&str> = family
        .shared_children_with(counterparty)
        .map(|c| c.ident.as_str())
        .collect();

    Ok(requires_consent(children, &shared, policy))
}

fn requires_consent(
    children: &BTreeSet<String>,
    shared: &HashSet<&str>,
    policy: ConsentPolicy,
) -> bool {
    match policy {
        ConsentPolicy::AllShared => children.iter().all(|c| shared.contains(c.as_str())),
        ConsentPolicy::AnyShared => children.iter().any(|c| shared.contains(c.as_str())),
    }
}

/// Decide whether `acting` may consent to `request`.
pub fn validate_consent(
    request: Option<&TravelRequest>,
    acting: &str,
) -> Result<(), RejectionReason> {
    match request {
        Some(r) if r.is_pending() && r.counterparty.ident == acting => Ok(()),
        _ => Err(RejectionReason::NoMatchingActiveRequest),
    }
}

/// Decide whether `acting` may deactivate `request`.
pub fn validate_deactivation(
    request: Option<&TravelRequest>,
    acting: &str,
) -> Result<(), RejectionReason> {
    match request {
        Some(r) if r.is_active() && r.main_party.ident == acting => Ok(()),
        _ => Err(RejectionReason::NotAuthorizedOrAlreadyInactive),
    }
}

/// Decide whether `acting` may see the confirmation document of `request`.
pub fn validate_document_access(
    request: Option<&TravelRequest>,
    acting: &str,
) -> Result<(), RejectionReason> {
    match request {
        Some(r) if r.is_in_effect() && r.involves(acting) => Ok(()),
        _ => Err(RejectionReason::RequestNotInEffect),
    }
}
