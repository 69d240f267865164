pub mod audit_logs;
pub mod categories;
pub mod listing_images;
pub mod listings;
pub mod offers;
pub mod order_items;
pub mod sea_orm_active_enums;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use categories::Entity as Categories;
pub use listing_images::Entity as ListingImages;
pub use listings::Entity as Listings;
pub use offers::Entity as Offers;
pub use order_items::Entity as OrderItems;
pub use users::Entity as Users;
