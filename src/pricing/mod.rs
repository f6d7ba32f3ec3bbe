// Pricing engine
// Authoritative line and cart totals computed from catalog data, never from client prices

pub mod engine;
pub mod models;

pub use engine::PricingEngine;
pub use models::*;
