use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Category, Listing, ListingImage};

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ListingList {
    #[schema(value_type = Vec<Listing>)]
    pub items: Vec<Listing>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListingWithImages {
    pub listing: Listing,
    pub images: Vec<ListingImage>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CategoryList {
    #[schema(value_type = Vec<Category>)]
    pub items: Vec<Category>,
}
