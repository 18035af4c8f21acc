//! Inbound sales platform integrations

pub mod shopify;

pub use shopify::shopify_webhook_handler;
