use axum::{
    Json, Router,
    extract::State,
    routing::get,
};

use crate::{
    dto::listings::{ListingList, ListingWithImages},
    error::AppResult,
    extract::{ApiPath, ApiQuery},
    response::ApiResponse,
    routes::params::ListingQuery,
    services::listing_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_listings))
        .route("/{id}", get(get_listing))
}

#[utoipa::path(
    get,
    path = "/api/listings",
    params(ListingQuery),
    responses(
        (status = 200, description = "List listings", body = ApiResponse<ListingList>)
    ),
    tag = "Listings"
)]
pub async fn list_listings(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListingQuery>,
) -> AppResult<Json<ApiResponse<ListingList>>> {
    let resp = listing_service::list_listings(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/listings/{id}",
    params(
        ("id" = i64, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "Listing with images", body = ApiResponse<ListingWithImages>),
        (status = 404, description = "Listing not found"),
    ),
    tag = "Listings"
)]
pub async fn get_listing(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<ListingWithImages>>> {
    let resp = listing_service::get_listing(&state, id).await?;
    Ok(Json(resp))
}
