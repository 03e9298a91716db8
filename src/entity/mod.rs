pub mod audit_logs;
pub mod brands;
pub mod cart_items;
pub mod categories;
pub mod order_items;
pub mod orders;
pub mod product_images;
pub mod products;
pub mod reviews;
pub mod user_addresses;
pub mod users;
pub mod wishlist;

pub use audit_logs::Entity as AuditLogs;
pub use brands::Entity as Brands;
pub use cart_items::Entity as CartItems;
pub use categories::Entity as Categories;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_images::Entity as ProductImages;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use user_addresses::Entity as UserAddresses;
pub use users::Entity as Users;
pub use wishlist::Entity as Wishlist;
