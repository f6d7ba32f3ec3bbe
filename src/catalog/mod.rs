// Catalog boundary
// Restaurants, menu items, variants and add-ons are managed by the catalog service;
// pricing, cart and orders only read them through this module.

pub mod models;
pub mod repository;

pub use models::*;
pub use repository::*;
