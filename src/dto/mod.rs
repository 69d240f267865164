pub mod listings;
pub mod offers;
