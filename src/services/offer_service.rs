use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::{
    audit,
    config::AppConfig,
    dto::offers::{
        CounterResponseRequest, CreateOfferRequest, OfferCard, OfferDetail, OfferList, OfferRole,
        UpdateOfferStatusRequest,
    },
    entity::{
        listings::{ActiveModel as ListingActive, Entity as Listings},
        offers::{self, ActiveModel as OfferActive, Column as OfferCol, Entity as Offers},
        order_items::{self, ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        sea_orm_active_enums::{ListingStatus, OfferStatus, UserStatus},
        users::{self, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    negotiation::{self, Plan, Transition},
    response::{ApiResponse, Meta},
    routes::params::OfferListQuery,
    state::AppState,
};

/// Open a new offer. The listing row is locked for the whole check-and-insert,
/// so one buyer cannot race a second open offer onto the same listing.
pub async fn create_offer(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOfferRequest,
) -> AppResult<ApiResponse<OfferDetail>> {
    let buyer = Users::find_by_id(user.user_id).one(&state.orm).await?;
    match buyer {
        Some(buyer) if buyer.status == UserStatus::Active => {}
        Some(_) => return Err(AppError::Forbidden("Account is not active".into())),
        None => return Err(AppError::Forbidden("Unknown user".into())),
    }

    let now = Utc::now();
    let expires_at = offer_deadline(&state.config, now)?;
    let txn = state.orm.begin().await?;

    let listing = Listings::find_by_id(payload.listing_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    negotiation::check_new_offer(&listing, user.user_id, &payload)?;

    let open_offers = Offers::find()
        .filter(
            Condition::all()
                .add(OfferCol::ListingId.eq(listing.id))
                .add(OfferCol::BuyerId.eq(user.user_id))
                .add(OfferCol::Status.is_in(OfferStatus::open_states()))
                .add(OfferCol::ExpiresAt.gt(now.fixed_offset())),
        )
        .count(&txn)
        .await?;
    if open_offers > 0 {
        return Err(AppError::Conflict(
            "You already have an open offer on this listing".into(),
        ));
    }

    let offer = OfferActive {
        id: NotSet,
        listing_id: Set(listing.id),
        buyer_id: Set(user.user_id),
        seller_id: Set(listing.seller_id),
        offer_price: Set(payload.offer_price),
        quantity: Set(payload.quantity),
        message: Set(payload.message),
        counter_price: Set(None),
        counter_quantity: Set(None),
        counter_message: Set(None),
        rejection_reason: Set(None),
        status: Set(OfferStatus::Pending),
        expires_at: Set(expires_at.into()),
        responded_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    tracing::info!(
        offer_id = offer.id,
        listing_id = offer.listing_id,
        buyer_id = offer.buyer_id,
        "offer created"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "offer_create",
        "offers",
        json!({ "offer_id": offer.id, "listing_id": offer.listing_id }),
    )
    .await;

    let detail = load_detail(&state.orm, offer).await?;
    Ok(ApiResponse::success("Offer created", detail, Some(Meta::empty())))
}

pub async fn get_sent_offers(
    state: &AppState,
    user: &AuthUser,
    query: OfferListQuery,
) -> AppResult<ApiResponse<OfferList>> {
    list_offers(state, user, query, OfferRole::Buyer).await
}

pub async fn get_received_offers(
    state: &AppState,
    user: &AuthUser,
    query: OfferListQuery,
) -> AppResult<ApiResponse<OfferList>> {
    list_offers(state, user, query, OfferRole::Seller).await
}

async fn list_offers(
    state: &AppState,
    user: &AuthUser,
    query: OfferListQuery,
    role: OfferRole,
) -> AppResult<ApiResponse<OfferList>> {
    let (page, page_size, offset) = query.pagination().normalize();

    let party = match role {
        OfferRole::Buyer => OfferCol::BuyerId,
        OfferRole::Seller => OfferCol::SellerId,
    };
    let mut condition = Condition::all().add(party.eq(user.user_id));
    if let Some(status) = query.status_filter {
        condition = condition.add(OfferCol::Status.eq(status));
    }

    let finder = Offers::find()
        .filter(condition)
        .order_by_desc(OfferCol::CreatedAt)
        .order_by_desc(OfferCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;

    let offers = finder
        .limit(page_size as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = build_cards(&state.orm, offers, role).await?;
    let meta = Meta::new(page, page_size, total);
    Ok(ApiResponse::success("Offers", OfferList { items }, Some(meta)))
}

/// Only the buyer or the seller can see an offer; anyone else gets 404.
pub async fn get_offer_by_id(
    state: &AppState,
    user: &AuthUser,
    id: i64,
) -> AppResult<ApiResponse<OfferDetail>> {
    let offer = Offers::find()
        .filter(
            Condition::all().add(OfferCol::Id.eq(id)).add(
                Condition::any()
                    .add(OfferCol::BuyerId.eq(user.user_id))
                    .add(OfferCol::SellerId.eq(user.user_id)),
            ),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let detail = load_detail(&state.orm, offer).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}

pub async fn update_offer_status(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: UpdateOfferStatusRequest,
) -> AppResult<ApiResponse<OfferDetail>> {
    let now = Utc::now();
    let txn = state.orm.begin().await?;

    let offer = Offers::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let plan = negotiation::plan_seller_action(&offer, user.user_id, &payload, now)?;
    execute_plan(state, user, txn, offer, plan, now).await
}

pub async fn respond_to_counter(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    payload: CounterResponseRequest,
) -> AppResult<ApiResponse<OfferDetail>> {
    let now = Utc::now();
    let txn = state.orm.begin().await?;

    let offer = Offers::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let plan = negotiation::plan_buyer_response(&offer, user.user_id, &payload, now)?;
    execute_plan(state, user, txn, offer, plan, now).await
}

/// Mark every open offer past its deadline as expired.
pub async fn expire_stale_offers(state: &AppState, now: DateTime<Utc>) -> AppResult<u64> {
    let result = Offers::update_many()
        .set(OfferActive {
            status: Set(OfferStatus::Expired),
            updated_at: Set(now.into()),
            ..Default::default()
        })
        .filter(OfferCol::Status.is_in(OfferStatus::open_states()))
        .filter(OfferCol::ExpiresAt.lte(now.fixed_offset()))
        .exec(&state.orm)
        .await?;

    if result.rows_affected > 0 {
        audit::record(
            &state.pool,
            None,
            "offer_expire_sweep",
            "offers",
            json!({ "expired": result.rows_affected }),
        )
        .await;
    }

    Ok(result.rows_affected)
}

pub fn spawn_expiry_sweeper(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.expiry_sweep_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match expire_stale_offers(&state, Utc::now()).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "expired stale offers"),
                Err(err) => tracing::warn!(error = %err, "offer expiry sweep failed"),
            }
        }
    })
}

async fn execute_plan(
    state: &AppState,
    user: &AuthUser,
    txn: DatabaseTransaction,
    offer: offers::Model,
    plan: Plan,
    now: DateTime<Utc>,
) -> AppResult<ApiResponse<OfferDetail>> {
    let transition = match plan {
        Plan::Expire => {
            let offer_id = offer.id;
            let mut active: OfferActive = offer.into();
            active.status = Set(OfferStatus::Expired);
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
            txn.commit().await?;

            tracing::info!(offer_id, "offer expired before action");
            audit::record(
                &state.pool,
                Some(user.user_id),
                "offer_expire",
                "offers",
                json!({ "offer_id": offer_id }),
            )
            .await;
            return Err(AppError::BadRequest("Offer has expired".into()));
        }
        Plan::Apply(transition) => transition,
    };

    let action = match &transition {
        Transition::Accept { .. } => "offer_accept",
        Transition::Reject { .. } => "offer_reject",
        Transition::Counter { .. } => "offer_counter",
    };

    let offer = apply_transition(&txn, &state.config, offer, transition, now).await?;
    txn.commit().await?;

    tracing::info!(offer_id = offer.id, status = %offer.status, actor = user.user_id, "offer updated");
    audit::record(
        &state.pool,
        Some(user.user_id),
        action,
        "offers",
        json!({ "offer_id": offer.id, "status": offer.status.as_str() }),
    )
    .await;

    let detail = load_detail(&state.orm, offer).await?;
    Ok(ApiResponse::success("Offer updated", detail, Some(Meta::empty())))
}

async fn apply_transition(
    txn: &DatabaseTransaction,
    config: &AppConfig,
    offer: offers::Model,
    transition: Transition,
    now: DateTime<Utc>,
) -> AppResult<offers::Model> {
    let status = transition.target_status();
    let offer_id = offer.id;
    let listing_id = offer.listing_id;
    let buyer_id = offer.buyer_id;
    let seller_id = offer.seller_id;

    let mut active: OfferActive = offer.into();
    match transition {
        Transition::Accept {
            unit_price,
            quantity,
        } => {
            let listing = Listings::find_by_id(listing_id)
                .lock(LockType::Update)
                .one(txn)
                .await?
                .ok_or_else(|| missing("listing", listing_id))?;
            negotiation::check_acceptable(&listing, quantity)?;

            let subtotal = unit_price
                .checked_mul(i64::from(quantity))
                .ok_or_else(|| AppError::BadRequest("Offer total is too large".into()))?;

            let remaining = listing.quantity - quantity;
            let mut listing: ListingActive = listing.into();
            listing.quantity = Set(remaining);
            if remaining == 0 {
                listing.status = Set(ListingStatus::Sold);
            }
            listing.updated_at = Set(now.into());
            listing.update(txn).await?;

            OrderItemActive {
                id: NotSet,
                listing_id: Set(listing_id),
                buyer_id: Set(buyer_id),
                seller_id: Set(seller_id),
                offer_id: Set(Some(offer_id)),
                quantity: Set(quantity),
                unit_price: Set(unit_price),
                subtotal: Set(subtotal),
                created_at: NotSet,
            }
            .insert(txn)
            .await?;
        }
        Transition::Reject { reason } => {
            active.rejection_reason = Set(reason);
        }
        Transition::Counter {
            price,
            quantity,
            message,
        } => {
            if let Some(quantity) = quantity {
                let listing = Listings::find_by_id(listing_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| missing("listing", listing_id))?;
                negotiation::check_stock(&listing, quantity)?;
            }
            active.counter_price = Set(Some(price));
            active.counter_quantity = Set(quantity);
            active.counter_message = Set(message);
            active.expires_at = Set(offer_deadline(config, now)?.into());
        }
    }

    active.status = Set(status);
    active.responded_at = Set(Some(now.into()));
    active.updated_at = Set(now.into());
    Ok(active.update(txn).await?)
}

async fn load_detail<C: ConnectionTrait>(conn: &C, offer: offers::Model) -> AppResult<OfferDetail> {
    let listing = Listings::find_by_id(offer.listing_id)
        .one(conn)
        .await?
        .ok_or_else(|| missing("listing", offer.listing_id))?;

    let mut parties: HashMap<i64, users::Model> = Users::find()
        .filter(UserCol::Id.is_in([offer.buyer_id, offer.seller_id]))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let buyer = parties
        .remove(&offer.buyer_id)
        .ok_or_else(|| missing("user", offer.buyer_id))?;
    let seller = parties
        .remove(&offer.seller_id)
        .ok_or_else(|| missing("user", offer.seller_id))?;

    let order_item: Option<order_items::Model> = OrderItems::find()
        .filter(OrderItemCol::OfferId.eq(offer.id))
        .one(conn)
        .await?;

    Ok(OfferDetail {
        offer: offer.into(),
        listing: listing.into(),
        buyer: buyer.into(),
        seller: seller.into(),
        order_item: order_item.map(Into::into),
    })
}

async fn build_cards<C: ConnectionTrait>(
    conn: &C,
    offers: Vec<offers::Model>,
    role: OfferRole,
) -> AppResult<Vec<OfferCard>> {
    if offers.is_empty() {
        return Ok(Vec::new());
    }

    let counterpart_of = |offer: &offers::Model| match role {
        OfferRole::Buyer => offer.seller_id,
        OfferRole::Seller => offer.buyer_id,
    };

    let listing_ids: Vec<i64> = offers.iter().map(|o| o.listing_id).collect();
    let user_ids: Vec<i64> = offers.iter().map(counterpart_of).collect();

    let titles: HashMap<i64, String> = Listings::find()
        .filter(crate::entity::listings::Column::Id.is_in(listing_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|l| (l.id, l.title))
        .collect();
    let counterparts: HashMap<i64, users::Model> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    offers
        .into_iter()
        .map(|offer| {
            let counterpart_id = counterpart_of(&offer);
            let listing_title = titles
                .get(&offer.listing_id)
                .cloned()
                .ok_or_else(|| missing("listing", offer.listing_id))?;
            let counterpart = counterparts
                .get(&counterpart_id)
                .cloned()
                .ok_or_else(|| missing("user", counterpart_id))?;
            Ok(OfferCard {
                id: offer.id,
                listing_id: offer.listing_id,
                listing_title,
                role,
                counterpart: counterpart.into(),
                offer_price: offer.offer_price,
                quantity: offer.quantity,
                counter_price: offer.counter_price,
                counter_quantity: offer.counter_quantity,
                status: offer.status,
                expires_at: offer.expires_at.with_timezone(&Utc),
                created_at: offer.created_at.with_timezone(&Utc),
            })
        })
        .collect()
}

fn offer_deadline(config: &AppConfig, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    config.offer_deadline(now).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "offer TTL of {} hours overflows the deadline",
            config.offer_ttl_hours
        ))
    })
}

fn missing(what: &str, id: i64) -> AppError {
    AppError::Internal(anyhow::anyhow!("offer references missing {what} {id}"))
}
