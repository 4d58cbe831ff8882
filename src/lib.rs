//! Mailing list subscriptions: subscribe, reactivate and unsubscribe through
//! links carrying an opaque per-subscriber token.
//!
//! API endpoints:
//! - `/health_check` (GET)
//! - `/subscribe` (GET `?token=`: reactivate; POST json/form `email`: subscribe)
//! - `/unsubscribe` (GET or POST `?token=`)

pub mod configuration;
pub mod domain;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod utils;
