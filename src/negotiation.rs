//! Rules of the offer negotiation.
//!
//! Nothing here touches the database: callers load the rows, ask for a
//! [`Plan`], and persist it. An offer moves `pending -> countered* ->
//! accepted | rejected | expired`; the last three are terminal.
//!
//! The seller acts through [`plan_seller_action`] (accept, reject, counter);
//! once countered, the buyer answers through [`plan_buyer_response`]. A
//! countered offer stays open: the seller may revise the counter or reject
//! it, but accepting is the buyer's move.

use chrono::{DateTime, Utc};

use crate::{
    dto::offers::{
        CounterResponseAction, CounterResponseRequest, CreateOfferRequest, OfferAction,
        UpdateOfferStatusRequest,
    },
    entity::{
        listings,
        offers,
        sea_orm_active_enums::{ListingStatus, ListingType, OfferStatus},
    },
    error::{AppError, AppResult},
};

/// A state change to apply to an open offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Settle at the given terms; stock is taken from the listing.
    Accept { unit_price: i64, quantity: i32 },
    Reject { reason: Option<String> },
    Counter {
        price: i64,
        quantity: Option<i32>,
        message: Option<String>,
    },
}

impl Transition {
    pub fn target_status(&self) -> OfferStatus {
        match self {
            Transition::Accept { .. } => OfferStatus::Accepted,
            Transition::Reject { .. } => OfferStatus::Rejected,
            Transition::Counter { .. } => OfferStatus::Countered,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Apply(Transition),
    /// The offer ran out of time before the action; it must be marked expired.
    Expire,
}

pub fn is_expired(offer: &offers::Model, now: DateTime<Utc>) -> bool {
    offer.expires_at.with_timezone(&Utc) <= now
}

/// Validate a buyer's new offer against the listing it targets.
pub fn check_new_offer(
    listing: &listings::Model,
    buyer_id: i64,
    request: &CreateOfferRequest,
) -> AppResult<()> {
    if request.offer_price <= 0 {
        return Err(AppError::BadRequest(
            "offer_price must be greater than 0".into(),
        ));
    }
    if request.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".into(),
        ));
    }
    if listing.listing_type != ListingType::Material {
        return Err(AppError::BadRequest(
            "Offers are only available for material listings".into(),
        ));
    }
    if listing.status != ListingStatus::Active {
        return Err(AppError::BadRequest("Listing is not active".into()));
    }
    if listing.seller_id == buyer_id {
        return Err(AppError::BadRequest(
            "You cannot make an offer on your own listing".into(),
        ));
    }
    check_stock(listing, request.quantity)
}

pub fn check_stock(listing: &listings::Model, quantity: i32) -> AppResult<()> {
    if quantity > listing.quantity {
        return Err(AppError::BadRequest(format!(
            "Insufficient stock: requested {quantity}, available {}",
            listing.quantity
        )));
    }
    Ok(())
}

/// The listing must still be on sale and hold enough stock to settle.
pub fn check_acceptable(listing: &listings::Model, quantity: i32) -> AppResult<()> {
    if listing.status != ListingStatus::Active {
        return Err(AppError::BadRequest(
            "Listing is no longer available".into(),
        ));
    }
    check_stock(listing, quantity)
}

pub fn plan_seller_action(
    offer: &offers::Model,
    seller_id: i64,
    request: &UpdateOfferStatusRequest,
    now: DateTime<Utc>,
) -> AppResult<Plan> {
    if offer.seller_id != seller_id {
        return Err(AppError::Forbidden(
            "Only the seller can update this offer".into(),
        ));
    }
    ensure_open(offer)?;
    if is_expired(offer, now) {
        return Ok(Plan::Expire);
    }

    let transition = match request.action {
        OfferAction::Accept => {
            if offer.status == OfferStatus::Countered {
                return Err(AppError::BadRequest(
                    "Offer is awaiting the buyer's response to your counter-offer".into(),
                ));
            }
            Transition::Accept {
                unit_price: offer.offer_price,
                quantity: offer.quantity,
            }
        }
        OfferAction::Reject => Transition::Reject {
            reason: request.message.clone(),
        },
        OfferAction::Counter => {
            let price = request.counter_price.ok_or_else(|| {
                AppError::BadRequest("counter_price is required to counter an offer".into())
            })?;
            if price <= 0 {
                return Err(AppError::BadRequest(
                    "counter_price must be greater than 0".into(),
                ));
            }
            if request.counter_quantity.is_some_and(|q| q <= 0) {
                return Err(AppError::BadRequest(
                    "counter_quantity must be greater than 0".into(),
                ));
            }
            Transition::Counter {
                price,
                quantity: request.counter_quantity,
                message: request.message.clone(),
            }
        }
    };

    Ok(Plan::Apply(transition))
}

pub fn plan_buyer_response(
    offer: &offers::Model,
    buyer_id: i64,
    request: &CounterResponseRequest,
    now: DateTime<Utc>,
) -> AppResult<Plan> {
    if offer.buyer_id != buyer_id {
        return Err(AppError::Forbidden(
            "Only the buyer can respond to a counter-offer".into(),
        ));
    }
    ensure_open(offer)?;
    if offer.status != OfferStatus::Countered {
        return Err(AppError::BadRequest(
            "Offer has no counter-offer to respond to".into(),
        ));
    }
    if is_expired(offer, now) {
        return Ok(Plan::Expire);
    }

    let transition = match request.action {
        CounterResponseAction::Accept => Transition::Accept {
            unit_price: offer.counter_price.unwrap_or(offer.offer_price),
            quantity: offer.counter_quantity.unwrap_or(offer.quantity),
        },
        CounterResponseAction::Reject => Transition::Reject {
            reason: request.message.clone(),
        },
    };

    Ok(Plan::Apply(transition))
}

fn ensure_open(offer: &offers::Model) -> AppResult<()> {
    if offer.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "Offer is already {} and cannot be modified",
            offer.status
        )));
    }
    Ok(())
}
