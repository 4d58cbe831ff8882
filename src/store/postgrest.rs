use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::Method;
use reqwest::RequestBuilder;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use super::StoreError;
use super::SubscriberRow;
use super::SubscriberStore;
use crate::domain::Subscriber;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;
use crate::domain::TokenPolicy;

const COLUMNS: &str = "email,token,subscribed";
const TABLE: &str = "subscribers";
/// `migrations/*_create_upsert_subscriber_function.sql`
const UPSERT_FUNCTION: &str = "rpc/upsert_subscriber";

/// `subscribers` behind a PostgREST api (as hosted by Supabase), reached
/// with the service role key, which bypasses row level security.
///
/// Establishing a HTTP connection is expensive, so a single `Client` is built
/// at startup and its connection pool reused by every request.
pub struct PostgrestSubscriberStore {
    http_client: Client,
    /// `<url>/rest/v1`
    rest_url: String,
    service_key: Secret<String>,
}

#[derive(Serialize)]
struct NewRow<'a> {
    email: &'a str,
    token: &'a str,
    subscribed: bool,
}

/// Arguments of `upsert_subscriber`
#[derive(Serialize)]
struct UpsertArgs<'a> {
    p_email: &'a str,
    p_token: &'a str,
    p_rotate: bool,
}

#[derive(Serialize)]
struct SubscribedPatch {
    subscribed: bool,
}

#[derive(Deserialize)]
struct EmailRow {
    email: String,
}

impl PostgrestSubscriberStore {
    pub fn new(
        url: String,
        service_key: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, anyhow::Error> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build the PostgREST http client")?;
        Ok(Self {
            http_client,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            service_key,
        })
    }

    /// PostgREST (through Supabase's gateway) wants the key twice: once to
    /// pass the gateway, once as the JWT that selects the db role.
    fn request(
        &self,
        method: Method,
        resource: &str,
        prefer: &str,
    ) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{resource}", self.rest_url))
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(self.service_key.expose_secret())
            .header("Prefer", prefer)
    }
}

/// Send `req` and decode the returned representation. Only transport
/// failures count as `Unreachable`; any answer from PostgREST that isn't a
/// success is a `Query` failure.
async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<Vec<T>, StoreError> {
    let resp = req
        .send()
        .await
        .context("PostgREST request failed")
        .map_err(StoreError::Unreachable)?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::error!("PostgREST rejected the request: {status} {body}");
        return Err(StoreError::Query(anyhow::anyhow!(
            "PostgREST responded with {status}: {body}"
        )));
    }

    resp.json::<Vec<T>>()
        .await
        .context("PostgREST returned an unexpected body")
        .map_err(StoreError::Query)
}

#[async_trait]
impl SubscriberStore for PostgrestSubscriberStore {
    #[tracing::instrument(name = "PATCHing subscription state by token", skip(self, token))]
    async fn set_subscribed(
        &self,
        token: &SubscriptionToken,
        subscribed: bool,
    ) -> Result<Option<String>, StoreError> {
        let req = self
            .request(Method::PATCH, TABLE, "return=representation")
            .query(&[
                ("token", format!("eq.{token}")),
                ("select", "email".to_string()),
            ])
            .json(&SubscribedPatch { subscribed });
        let rows: Vec<EmailRow> = send(req).await?;
        Ok(rows.into_iter().next().map(|r| r.email))
    }

    #[tracing::instrument(
        name = "Upserting subscriber through PostgREST",
        skip(self, email, token),
        fields(subscriber_email = %email)
    )]
    async fn upsert(
        &self,
        email: &SubscriberEmail,
        token: &SubscriptionToken,
        policy: TokenPolicy,
    ) -> Result<Subscriber, StoreError> {
        let stored: Vec<SubscriberRow> = match policy {
            // a plain upsert can only overwrite every column it is sent
            TokenPolicy::Rotate => {
                let row = NewRow {
                    email: email.as_ref(),
                    token: token.as_ref(),
                    subscribed: true,
                };
                let req = self
                    .request(
                        Method::POST,
                        TABLE,
                        "resolution=merge-duplicates,return=representation",
                    )
                    .query(&[("on_conflict", "email"), ("select", COLUMNS)])
                    .json(&[row]);
                send(req).await?
            }
            TokenPolicy::Preserve => {
                let args = UpsertArgs {
                    p_email: email.as_ref(),
                    p_token: token.as_ref(),
                    p_rotate: false,
                };
                let req = self
                    .request(Method::POST, UPSERT_FUNCTION, "return=representation")
                    .query(&[("select", COLUMNS)])
                    .json(&args);
                send(req).await?
            }
        };

        stored
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Query(anyhow::anyhow!("upsert returned no row")))?
            .try_into()
    }
}
