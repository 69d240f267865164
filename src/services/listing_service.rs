use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::{
    dto::listings::{ListingList, ListingWithImages},
    entity::{
        listing_images::{Column as ImageCol, Entity as ListingImages},
        listings::{Column, Entity as Listings},
        sea_orm_active_enums::ListingStatus,
    },
    error::{AppError, AppResult},
    models::Listing,
    response::{ApiResponse, Meta},
    routes::params::{ListingQuery, ListingSortBy, SortOrder},
    state::AppState,
};

pub async fn list_listings(
    state: &AppState,
    query: ListingQuery,
) -> AppResult<ApiResponse<ListingList>> {
    let (page, page_size, offset) = query.pagination().normalize();

    let status = query.status.unwrap_or(ListingStatus::Active);
    let mut condition = Condition::all().add(Column::Status.eq(status));

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }
    if let Some(listing_type) = query.listing_type {
        condition = condition.add(Column::ListingType.eq(listing_type));
    }
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_column = match query.sort_by.unwrap_or(ListingSortBy::CreatedAt) {
        ListingSortBy::CreatedAt => Column::CreatedAt,
        ListingSortBy::Price => Column::Price,
        ListingSortBy::Title => Column::Title,
    };

    let mut finder = Listings::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_column).order_by_asc(Column::Id),
        SortOrder::Desc => finder.order_by_desc(sort_column).order_by_desc(Column::Id),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(page_size as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Listing::from)
        .collect();

    let meta = Meta::new(page, page_size, total);
    Ok(ApiResponse::success("Listings", ListingList { items }, Some(meta)))
}

pub async fn get_listing(state: &AppState, id: i64) -> AppResult<ApiResponse<ListingWithImages>> {
    let listing = Listings::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let images = ListingImages::find()
        .filter(ImageCol::ListingId.eq(listing.id))
        .order_by_asc(ImageCol::DisplayOrder)
        .order_by_asc(ImageCol::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::success(
        "Listing",
        ListingWithImages {
            listing: listing.into(),
            images,
        },
        Some(Meta::empty()),
    ))
}
