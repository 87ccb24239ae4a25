pub mod auth;
pub mod cors;
pub mod latency;
pub mod security;
pub mod tracing;

pub use auth::*;
pub use cors::*;
pub use latency::*;
pub use security::*;
pub use tracing::*;
