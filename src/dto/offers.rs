use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::sea_orm_active_enums::OfferStatus,
    models::{ListingSummary, Offer, OrderItem, UserSummary},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOfferRequest {
    pub listing_id: i64,
    /// Proposed unit price in cents.
    pub offer_price: i64,
    pub quantity: i32,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OfferAction {
    Accept,
    Reject,
    Counter,
}

/// Seller's move on an open offer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOfferStatusRequest {
    pub action: OfferAction,
    /// Required when countering.
    pub counter_price: Option<i64>,
    pub counter_quantity: Option<i32>,
    /// Counter note or rejection reason.
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CounterResponseAction {
    Accept,
    Reject,
}

/// Buyer's answer to a counter-offer.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CounterResponseRequest {
    pub action: CounterResponseAction,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OfferRole {
    Buyer,
    Seller,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfferCard {
    pub id: i64,
    pub listing_id: i64,
    pub listing_title: String,
    /// The caller's side of the negotiation.
    pub role: OfferRole,
    pub counterpart: UserSummary,
    pub offer_price: i64,
    pub quantity: i32,
    pub counter_price: Option<i64>,
    pub counter_quantity: Option<i32>,
    pub status: OfferStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OfferList {
    #[schema(value_type = Vec<OfferCard>)]
    pub items: Vec<OfferCard>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OfferDetail {
    pub offer: Offer,
    pub listing: ListingSummary,
    pub buyer: UserSummary,
    pub seller: UserSummary,
    /// Present once the offer has been accepted.
    pub order_item: Option<OrderItem>,
}
