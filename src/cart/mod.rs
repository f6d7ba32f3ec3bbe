// Cart module
// One cart per user, pinned to a single restaurant; lines merge by fingerprint

pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use error::CartError;
pub use models::*;
pub use repository::CartRepository;
pub use service::CartService;
