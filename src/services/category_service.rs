use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    dto::listings::CategoryList,
    entity::categories::{Column, Entity as Categories},
    error::AppResult,
    models::Category,
    response::{ApiResponse, Meta},
    routes::params::CategoryQuery,
    state::AppState,
};

pub async fn list_categories(
    state: &AppState,
    query: CategoryQuery,
) -> AppResult<ApiResponse<CategoryList>> {
    let mut finder = Categories::find();
    if let Some(listing_type) = query.listing_type {
        finder = finder.filter(Column::ListingType.eq(listing_type));
    }

    let items: Vec<Category> = finder
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::unpaged(total)),
    ))
}
