//! HTTP API handlers for vistoria-api

pub mod auth;
pub mod health;
pub mod inspections;
pub mod sync;

pub use auth::AuthUser;
pub use health::health_routes;
pub use inspections::inspection_routes;
pub use sync::sync_routes;
