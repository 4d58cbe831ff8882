//! The `subscribers` table, as seen by the request handlers.
//!
//! Handlers never lock or retry: every operation here is a single atomic
//! statement (or PostgREST call) and the store alone serialises concurrent
//! writes to the same email or token.

mod postgres;
mod postgrest;

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
pub use postgres::get_connection_pool;
pub use postgres::PgSubscriberStore;
pub use postgrest::PostgrestSubscriberStore;
use serde::Deserialize;

use crate::configuration::StoreBackend;
use crate::configuration::StoreSettings;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;
use crate::domain::TokenPolicy;
use crate::utils::error_chain_fmt;

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Set `subscribed` on the row holding `token`, returning that row's
    /// email, or `None` if no row holds it.
    async fn set_subscribed(
        &self,
        token: &SubscriptionToken,
        subscribed: bool,
    ) -> Result<Option<String>, StoreError>;

    /// Insert `email` as subscribed with `token`, or, if `email` is already
    /// known, reactivate it and resolve the token according to `policy`.
    ///
    /// The returned record is what was actually stored; its token is the one
    /// to hand out.
    async fn upsert(
        &self,
        email: &SubscriberEmail,
        token: &SubscriptionToken,
        policy: TokenPolicy,
    ) -> Result<Subscriber, StoreError>;

    /// Release connections; called once the server has stopped.
    async fn close(&self) {}
}

#[derive(thiserror::Error)]
pub enum StoreError {
    /// The store answered, but failed or refused the operation.
    #[error("The store failed to execute the operation")]
    Query(#[source] anyhow::Error),
    /// The store could not be reached at all.
    #[error("The store could not be reached")]
    Unreachable(#[source] anyhow::Error),
}

impl Debug for StoreError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Raw `subscribers` row, shared by all backends. Converted to a `Subscriber`
/// before leaving the store, so that a corrupted row is reported as a store
/// failure instead of reaching the handlers.
#[derive(Deserialize, sqlx::FromRow)]
struct SubscriberRow {
    email: String,
    token: String,
    subscribed: bool,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = StoreError;
    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(row.email)
            .map_err(anyhow::Error::msg)
            .context("invalid email stored in the subscribers table")
            .map_err(StoreError::Query)?;
        let token = SubscriptionToken::parse(row.token)
            .map_err(anyhow::Error::msg)
            .context("invalid token stored in the subscribers table")
            .map_err(StoreError::Query)?;
        Ok(Subscriber {
            email,
            token,
            subscribed: row.subscribed,
        })
    }
}

/// Build the long-lived store described by `cfg`. Connections are opened
/// lazily, so this does not require the store to be up yet.
pub fn get_store(cfg: &StoreSettings) -> Result<Arc<dyn SubscriberStore>, anyhow::Error> {
    let store: Arc<dyn SubscriberStore> = match cfg.backend {
        StoreBackend::Postgrest => Arc::new(PostgrestSubscriberStore::new(
            cfg.url.clone(),
            cfg.service_key.clone(),
            cfg.timeout(),
        )?),
        StoreBackend::Postgres => Arc::new(PgSubscriberStore::new(get_connection_pool(cfg)?)),
    };
    Ok(store)
}
