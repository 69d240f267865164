use axum::{Router, routing::post};

use crate::state::AppState;

pub mod categories;
pub mod doc;
pub mod health;
pub mod listings;
pub mod offers;
pub mod params;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        // Nesting maps "/" to "/offers"; the trailing-slash form is routed explicitly.
        .route("/offers/", post(offers::create_offer))
        .nest("/offers", offers::router())
        .nest("/listings", listings::router())
        .nest("/categories", categories::router())
        .nest("/users", users::router())
}
