//! HTTP layer: routing, middleware, handlers and error mapping

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::build_router;
