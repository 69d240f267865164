use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        listings::{CategoryList, ListingList, ListingWithImages},
        offers::{
            CounterResponseAction, CounterResponseRequest, CreateOfferRequest, OfferAction,
            OfferCard, OfferDetail, OfferList, OfferRole, UpdateOfferStatusRequest,
        },
    },
    entity::sea_orm_active_enums::{ListingStatus, ListingType, OfferStatus, UserRole, UserStatus},
    models::{Category, Listing, ListingImage, ListingSummary, Offer, OrderItem, User, UserSummary},
    response::{ApiResponse, Meta},
    routes::{categories, health, listings, offers, params, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        offers::create_offer,
        offers::list_sent_offers,
        offers::list_received_offers,
        offers::get_offer,
        offers::update_offer,
        offers::respond_to_counter,
        listings::list_listings,
        listings::get_listing,
        categories::list_categories,
        users::me
    ),
    components(
        schemas(
            User,
            UserSummary,
            UserRole,
            UserStatus,
            Category,
            Listing,
            ListingSummary,
            ListingImage,
            ListingType,
            ListingStatus,
            OrderItem,
            Offer,
            OfferStatus,
            OfferAction,
            OfferRole,
            OfferCard,
            OfferDetail,
            OfferList,
            CreateOfferRequest,
            UpdateOfferStatusRequest,
            CounterResponseAction,
            CounterResponseRequest,
            ListingList,
            ListingWithImages,
            CategoryList,
            params::Pagination,
            params::SortOrder,
            params::ListingSortBy,
            Meta,
            ApiResponse<OfferDetail>,
            ApiResponse<OfferList>,
            ApiResponse<ListingList>,
            ApiResponse<ListingWithImages>,
            ApiResponse<CategoryList>,
            ApiResponse<User>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Offers", description = "Offer negotiation between buyers and sellers"),
        (name = "Listings", description = "Material and product listings"),
        (name = "Categories", description = "Listing categories"),
        (name = "Users", description = "Account endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
