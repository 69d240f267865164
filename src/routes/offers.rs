use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::offers::{CounterResponseRequest, CreateOfferRequest, OfferDetail, OfferList, UpdateOfferStatusRequest},
    error::AppResult,
    extract::{ApiJson, ApiPath, ApiQuery},
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::OfferListQuery,
    services::offer_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_offer))
        .route("/sent", get(list_sent_offers))
        .route("/received", get(list_received_offers))
        .route("/{offer_id}", get(get_offer).patch(update_offer))
        .route("/{offer_id}/respond", post(respond_to_counter))
}

#[utoipa::path(
    post,
    path = "/api/offers",
    request_body = CreateOfferRequest,
    responses(
        (status = 201, description = "Offer sent", body = ApiResponse<OfferDetail>),
        (status = 400, description = "Listing not eligible, own listing or insufficient stock"),
        (status = 403, description = "Account is not active"),
        (status = 404, description = "Listing not found"),
        (status = 409, description = "An open offer already exists for this listing"),
    ),
    security(("bearer_auth" = [])),
    tag = "Offers"
)]
pub async fn create_offer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateOfferRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OfferDetail>>)> {
    let resp = offer_service::create_offer(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/offers/sent",
    params(OfferListQuery),
    responses(
        (status = 200, description = "Offers sent by the caller as buyer", body = ApiResponse<OfferList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Offers"
)]
pub async fn list_sent_offers(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<OfferListQuery>,
) -> AppResult<Json<ApiResponse<OfferList>>> {
    let resp = offer_service::get_sent_offers(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/offers/received",
    params(OfferListQuery),
    responses(
        (status = 200, description = "Offers received by the caller as seller", body = ApiResponse<OfferList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Offers"
)]
pub async fn list_received_offers(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(query): ApiQuery<OfferListQuery>,
) -> AppResult<Json<ApiResponse<OfferList>>> {
    let resp = offer_service::get_received_offers(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/offers/{offer_id}",
    params(
        ("offer_id" = i64, Path, description = "Offer ID")
    ),
    responses(
        (status = 200, description = "Offer detail", body = ApiResponse<OfferDetail>),
        (status = 404, description = "Not found or caller is not a party to the offer"),
    ),
    security(("bearer_auth" = [])),
    tag = "Offers"
)]
pub async fn get_offer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(offer_id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<OfferDetail>>> {
    let resp = offer_service::get_offer_by_id(&state, &user, offer_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/offers/{offer_id}",
    params(
        ("offer_id" = i64, Path, description = "Offer ID")
    ),
    request_body = UpdateOfferStatusRequest,
    responses(
        (status = 200, description = "Offer accepted, rejected or countered", body = ApiResponse<OfferDetail>),
        (status = 400, description = "Offer is closed, expired or the action is invalid"),
        (status = 403, description = "Caller is not the seller"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Offers"
)]
pub async fn update_offer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(offer_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateOfferStatusRequest>,
) -> AppResult<Json<ApiResponse<OfferDetail>>> {
    let resp = offer_service::update_offer_status(&state, &user, offer_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/offers/{offer_id}/respond",
    params(
        ("offer_id" = i64, Path, description = "Offer ID")
    ),
    request_body = CounterResponseRequest,
    responses(
        (status = 200, description = "Counter-offer accepted or rejected", body = ApiResponse<OfferDetail>),
        (status = 400, description = "Offer has no open counter-offer"),
        (status = 403, description = "Caller is not the buyer"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Offers"
)]
pub async fn respond_to_counter(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(offer_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CounterResponseRequest>,
) -> AppResult<Json<ApiResponse<OfferDetail>>> {
    let resp = offer_service::respond_to_counter(&state, &user, offer_id, payload).await?;
    Ok(Json(resp))
}
