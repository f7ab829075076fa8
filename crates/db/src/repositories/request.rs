//! Travel request repository.

use std::sync::Arc;

use crate::entities::{party, request_child, travel_request};
use crate::models::{NewTravelRequest, Party, TravelRequest};
use crate::repositories::RequestStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use travel_cost_common::{AppError, AppResult, RejectionReason};
use tracing::{debug, info, warn};

/// Travel request repository for database operations.
#[derive(Clone)]
pub struct RequestRepository {
    db: Arc<DatabaseConnection>,
}

impl RequestRepository {
    /// Create a new request repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Assemble the aggregate from a request row, its parties and its children.
    async fn load<C: ConnectionTrait>(
        conn: &C,
        model: travel_request::Model,
    ) -> Result<TravelRequest, DbErr> {
        let parties = party::Entity::find()
            .filter(party::Column::Id.is_in([model.main_party_id, model.counterparty_id]))
            .all(conn)
            .await?;

        let party = |id: i32| {
            parties
                .iter()
                .find(|p| p.id == id)
                .map(|p| Party {
                    id: p.id,
                    ident: p.ident.clone(),
                })
                .ok_or_else(|| DbErr::RecordNotFound(format!("party {id}")))
        };

        let children = request_child::Entity::find()
            .filter(request_child::Column::RequestId.eq(model.id))
            .all(conn)
            .await?
            .into_iter()
            .map(|c| c.child_ident)
            .collect();

        Ok(TravelRequest {
            id: model.id,
            main_party: party(model.main_party_id)?,
            counterparty: party(model.counterparty_id)?,
            children,
            requires_consent: model.requires_consent,
            created_at: model.created_at,
            consented_at: model.consented_at,
            deactivated_at: model.deactivated_at,
        })
    }

    /// Reuse the party row for `ident`, or create it.
    ///
    /// The insert ignores a conflicting row written concurrently, so two
    /// requests naming the same new parent both end up with one row.
    async fn find_or_create_party<C: ConnectionTrait>(
        conn: &C,
        ident: &str,
        now: DateTime<Utc>,
    ) -> Result<party::Model, DbErr> {
        if let Some(existing) = party::Entity::find()
            .filter(party::Column::Ident.eq(ident))
            .one(conn)
            .await?
        {
            return Ok(existing);
        }

        party::Entity::insert(party::ActiveModel {
            ident: Set(ident.to_string()),
            created_at: Set(now),
            ..Default::default()
        })
        .on_conflict(
            OnConflict::column(party::Column::Ident)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

        party::Entity::find()
            .filter(party::Column::Ident.eq(ident))
            .one(conn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("party after insert".to_string()))
    }
}

/// The order in which two parties are looked up and inserted.
fn party_lock_order<'a>(a: &'a str, b: &'a str) -> [&'a str; 2] {
    if a <= b { [a, b] } else { [b, a] }
}

/// A unique violation while writing children means another transaction
/// activated a request for one of them first.
fn map_child_write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            warn!("Lost race for a child to a concurrently created request");
            AppError::ValidationRejected(RejectionReason::ChildAlreadyInActiveRequest)
        }
        _ => AppError::Persistence(err.to_string()),
    }
}

#[async_trait]
impl RequestStore for RequestRepository {
    async fn find_party_by_ident(&self, ident: &str) -> AppResult<Option<Party>> {
        let model = party::Entity::find()
            .filter(party::Column::Ident.eq(ident))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        Ok(model.map(|p| Party {
            id: p.id,
            ident: p.ident,
        }))
    }

    async fn find_active_request_covering_child(
        &self,
        child_ident: &str,
    ) -> AppResult<Option<TravelRequest>> {
        let covering = request_child::Entity::find()
            .filter(request_child::Column::ChildIdent.eq(child_ident))
            .filter(request_child::Column::Active.eq(true))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        match covering {
            Some(row) => self.find_active_request(row.request_id).await,
            None => Ok(None),
        }
    }

    async fn find_active_request(&self, id: i32) -> AppResult<Option<TravelRequest>> {
        let model = travel_request::Entity::find_by_id(id)
            .filter(travel_request::Column::DeactivatedAt.is_null())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        match model {
            Some(m) => Self::load(self.db.as_ref(), m)
                .await
                .map(Some)
                .map_err(|e| AppError::Persistence(e.to_string())),
            None => Ok(None),
        }
    }

    async fn find_request(&self, id: i32) -> AppResult<Option<TravelRequest>> {
        let model = travel_request::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        match model {
            Some(m) => Self::load(self.db.as_ref(), m)
                .await
                .map(Some)
                .map_err(|e| AppError::Persistence(e.to_string())),
            None => Ok(None),
        }
    }

    async fn find_requests_for_party(&self, ident: &str) -> AppResult<Vec<TravelRequest>> {
        let Some(party) = self.find_party_by_ident(ident).await? else {
            return Ok(Vec::new());
        };

        let models = travel_request::Entity::find()
            .filter(
                Condition::any()
                    .add(travel_request::Column::MainPartyId.eq(party.id))
                    .add(travel_request::Column::CounterpartyId.eq(party.id)),
            )
            .order_by_asc(travel_request::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        let mut requests = Vec::with_capacity(models.len());
        for model in models {
            let request = Self::load(self.db.as_ref(), model)
                .await
                .map_err(|e| AppError::Persistence(e.to_string()))?;
            requests.push(request);
        }

        Ok(requests)
    }

    async fn create_request(&self, request: NewTravelRequest) -> AppResult<TravelRequest> {
        if request.children.is_empty() {
            return Err(AppError::InvalidInput(
                "A request must name at least one child".to_string(),
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        // Re-check coverage inside the transaction. The partial unique index
        // on request_child catches whatever commits between here and our insert.
        let covered = request_child::Entity::find()
            .filter(request_child::Column::ChildIdent.is_in(request.children.iter().cloned()))
            .filter(request_child::Column::Active.eq(true))
            .all(&txn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        if !covered.is_empty() {
            warn!("Rejected new request: a child is already covered by an active request");
            warn!(
                target: "secure_log",
                children = ?covered.iter().map(|c| c.child_ident.as_str()).collect::<Vec<_>>(),
                "Children already covered by an active request"
            );
            return Err(AppError::ValidationRejected(
                RejectionReason::ChildAlreadyInActiveRequest,
            ));
        }

        // Party rows are always written in identifier order, whatever the roles.
        let [first, second] =
            party_lock_order(&request.main_party_ident, &request.counterparty_ident);
        let first = Self::find_or_create_party(&txn, first, request.created_at)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        let second = Self::find_or_create_party(&txn, second, request.created_at)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        let (main_party, counterparty) = if first.ident == request.main_party_ident {
            (first, second)
        } else {
            (second, first)
        };

        let model = travel_request::ActiveModel {
            main_party_id: Set(main_party.id),
            counterparty_id: Set(counterparty.id),
            requires_consent: Set(request.requires_consent),
            created_at: Set(request.created_at),
            consented_at: Set(None),
            deactivated_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::Persistence(e.to_string()))?;

        let children = request.children.iter().map(|child| request_child::ActiveModel {
            request_id: Set(model.id),
            child_ident: Set(child.clone()),
            active: Set(true),
        });

        request_child::Entity::insert_many(children)
            .exec_without_returning(&txn)
            .await
            .map_err(map_child_write_error)?;

        txn.commit().await.map_err(map_child_write_error)?;

        info!(request_id = model.id, requires_consent = model.requires_consent, "Stored new request");

        Ok(TravelRequest {
            id: model.id,
            main_party: Party {
                id: main_party.id,
                ident: main_party.ident,
            },
            counterparty: Party {
                id: counterparty.id,
                ident: counterparty.ident,
            },
            children: request.children,
            requires_consent: model.requires_consent,
            created_at: model.created_at,
            consented_at: None,
            deactivated_at: None,
        })
    }

    async fn record_consent(&self, id: i32, at: DateTime<Utc>) -> AppResult<bool> {
        let result = travel_request::Entity::update_many()
            .col_expr(travel_request::Column::ConsentedAt, Expr::value(at))
            .filter(travel_request::Column::Id.eq(id))
            .filter(travel_request::Column::DeactivatedAt.is_null())
            .filter(travel_request::Column::ConsentedAt.is_null())
            .filter(travel_request::Column::RequiresConsent.eq(true))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        debug!(request_id = id, rows = result.rows_affected, "Conditional consent write");

        Ok(result.rows_affected == 1)
    }

    async fn record_deactivation(&self, id: i32, at: DateTime<Utc>) -> AppResult<bool> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        let result = travel_request::Entity::update_many()
            .col_expr(travel_request::Column::DeactivatedAt, Expr::value(at))
            .filter(travel_request::Column::Id.eq(id))
            .filter(travel_request::Column::DeactivatedAt.is_null())
            .exec(&txn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        if result.rows_affected == 0 {
            debug!(request_id = id, "Deactivation found no active request");
            return Ok(false);
        }

        request_child::Entity::update_many()
            .col_expr(request_child::Column::Active, Expr::value(false))
            .filter(request_child::Column::RequestId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        Ok(true)
    }

    async fn remove_unreferenced_parties(&self) -> AppResult<u64> {
        let as_main_party = Query::select()
            .column(travel_request::Column::MainPartyId)
            .from(travel_request::Entity)
            .to_owned();
        let as_counterparty = Query::select()
            .column(travel_request::Column::CounterpartyId)
            .from(travel_request::Entity)
            .to_owned();

        let result = party::Entity::delete_many()
            .filter(party::Column::Id.not_in_subquery(as_main_party))
            .filter(party::Column::Id.not_in_subquery(as_counterparty))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        info!(removed = result.rows_affected, "Removed unreferenced parties");

        Ok(result.rows_affected)
    }
}
