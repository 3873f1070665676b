//! HTTP adapter for download delivery.
//!
//! - `GET /downloads/:token` - Redeem a download token
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::ErrorResponse;
pub use handlers::{DeliveryAppState, DeliveryApiError};
pub use routes::delivery_router;
