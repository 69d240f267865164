use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::{
    categories, listing_images, listings, offers, order_items, users,
    sea_orm_active_enums::{ListingStatus, ListingType, OfferStatus, UserRole, UserStatus},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

/// The public face of a user shown to the other party of an offer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    pub full_name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub listing_type: ListingType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Listing {
    pub id: i64,
    pub seller_id: i64,
    pub category_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub listing_type: ListingType,
    pub price: i64,
    pub quantity: i32,
    pub unit_measure: String,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingSummary {
    pub id: i64,
    pub title: String,
    pub price: i64,
    pub quantity: i32,
    pub unit_measure: String,
    pub status: ListingStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingImage {
    pub id: i64,
    pub listing_id: i64,
    pub image_url: String,
    pub is_primary: bool,
    pub display_order: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub listing_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub offer_id: Option<i64>,
    pub quantity: i32,
    pub unit_price: i64,
    pub subtotal: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Offer {
    pub id: i64,
    pub listing_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub offer_price: i64,
    pub quantity: i32,
    pub message: Option<String>,
    pub counter_price: Option<i64>,
    pub counter_quantity: Option<i32>,
    pub counter_message: Option<String>,
    pub rejection_reason: Option<String>,
    pub status: OfferStatus,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            full_name: model.full_name,
            role: model.role,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<users::Model> for UserSummary {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
        }
    }
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            listing_type: model.listing_type,
            description: model.description,
        }
    }
}

impl From<listings::Model> for Listing {
    fn from(model: listings::Model) -> Self {
        Self {
            id: model.id,
            seller_id: model.seller_id,
            category_id: model.category_id,
            title: model.title,
            description: model.description,
            listing_type: model.listing_type,
            price: model.price,
            quantity: model.quantity,
            unit_measure: model.unit_measure,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<listings::Model> for ListingSummary {
    fn from(model: listings::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            price: model.price,
            quantity: model.quantity,
            unit_measure: model.unit_measure,
            status: model.status,
        }
    }
}

impl From<listing_images::Model> for ListingImage {
    fn from(model: listing_images::Model) -> Self {
        Self {
            id: model.id,
            listing_id: model.listing_id,
            image_url: model.image_url,
            is_primary: model.is_primary,
            display_order: model.display_order,
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            listing_id: model.listing_id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            offer_id: model.offer_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            subtotal: model.subtotal,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<offers::Model> for Offer {
    fn from(model: offers::Model) -> Self {
        Self {
            id: model.id,
            listing_id: model.listing_id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            offer_price: model.offer_price,
            quantity: model.quantity,
            message: model.message,
            counter_price: model.counter_price,
            counter_quantity: model.counter_quantity,
            counter_message: model.counter_message,
            rejection_reason: model.rejection_reason,
            status: model.status,
            expires_at: model.expires_at.with_timezone(&Utc),
            responded_at: model.responded_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
