pub mod error;
pub mod handlers;
pub mod models;
pub mod price_calculator;
pub mod repository;
pub mod service;
pub mod status_machine;

pub use error::OrderError;
pub use models::*;
pub use price_calculator::{OrderTotals, PriceCalculator};
pub use repository::{OrderItemsRepository, OrdersRepository};
pub use service::{CreateOrderOutcome, OrderService};
pub use status_machine::{StatusMachine, TransitionError};
