use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::postgres::PgConnectOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::StoreError;
use super::SubscriberRow;
use super::SubscriberStore;
use crate::configuration::StoreSettings;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;
use crate::domain::TokenPolicy;

/// `connect_lazy_with` only connects when the pool is used for the first
/// time, so db-free requests (e.g. `health_check`) work before the db is up.
pub fn get_connection_pool(cfg: &StoreSettings) -> Result<PgPool, anyhow::Error> {
    let options = PgConnectOptions::from_str(&cfg.url)
        .context("store.url is not a valid postgres connection url")?
        .password(cfg.service_key.expose_secret());
    Ok(PgPoolOptions::new()
        .acquire_timeout(cfg.timeout())
        .connect_lazy_with(options))
}

/// `subscribers` accessed directly over the Postgres protocol. `PgPool` is
/// used over `PgConnection` as the former is shared safely by every worker.
pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

/// Anything that never got an answer out of postgres counts as unreachable.
fn store_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => StoreError::Unreachable(e.into()),
        _ => StoreError::Query(e.into()),
    }
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    #[tracing::instrument(name = "UPDATEing subscription state by token", skip(self, token))]
    async fn set_subscribed(
        &self,
        token: &SubscriptionToken,
        subscribed: bool,
    ) -> Result<Option<String>, StoreError> {
        sqlx::query_scalar::<_, String>(
            r#"
            UPDATE subscribers SET subscribed = $1
            WHERE token = $2
            RETURNING email
            "#,
        )
        .bind(subscribed)
        .bind(token.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("bad query: {e:?}");
            store_error(e)
        })
    }

    /// A single `INSERT ... ON CONFLICT`, so two concurrent subscribes for the
    /// same email can never produce two rows.
    #[tracing::instrument(
        name = "UPSERTing subscriber",
        skip(self, email, token),
        fields(subscriber_email = %email)
    )]
    async fn upsert(
        &self,
        email: &SubscriberEmail,
        token: &SubscriptionToken,
        policy: TokenPolicy,
    ) -> Result<Subscriber, StoreError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            INSERT INTO subscribers (email, token, subscribed)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (email) DO UPDATE
            SET subscribed = TRUE,
                token = CASE WHEN $3 THEN EXCLUDED.token ELSE subscribers.token END
            RETURNING email, token, subscribed
            "#,
        )
        .bind(email.as_ref())
        .bind(token.as_ref())
        .bind(policy == TokenPolicy::Rotate)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("bad query: {e:?}");
            store_error(e)
        })?;
        row.try_into()
    }

    async fn close(&self) { self.pool.close().await }
}
