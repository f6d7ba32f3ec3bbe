// Coupon validator
// Eligibility checks and discount computation at checkout; redemptions are
// recorded only after the owning order has committed.

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod rules;
pub mod service;

pub use error::CouponError;
pub use models::*;
pub use repository::CouponRepository;
pub use rules::{compute_discount, normalize_code, CouponRules};
pub use service::{CouponService, CouponValidator};
