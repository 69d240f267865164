pub mod category_service;
pub mod listing_service;
pub mod offer_service;
pub mod user_service;
