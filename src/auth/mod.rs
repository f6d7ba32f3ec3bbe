// Authentication boundary
// Sessions and tokens are issued by the external auth service; this module only
// validates bearer tokens and exposes the caller's identity and role.

pub mod error;
pub mod middleware;
pub mod models;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use middleware::AuthenticatedUser;
pub use models::Role;
pub use token::{Claims, TokenService};
