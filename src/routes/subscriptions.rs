use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpMessage;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use anyhow::Context;
use serde::Deserialize;

use super::token_from_query;
use super::unsubscribe_link;
use crate::domain::SubscriberEmail;
use crate::domain::SubscriptionToken;
use crate::domain::TokenPolicy;
use crate::startup::AppBaseUrl;
use crate::store::StoreError;
use crate::store::SubscriberStore;
use crate::utils::error_chain_fmt;
use crate::utils::plain_text;

const REACTIVATION_GUIDANCE: &str =
    "This is not a reactivation link. To subscribe, send your email address with a POST request.";
const INVALID_LINK: &str = "Invalid link.";

/// `{"email": "..."}` or `email=...`; a missing email is treated like an
/// empty one and rejected by the email check.
#[derive(Deserialize)]
struct SubscribeBody {
    email: Option<String>,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Unsupported Content-Type")]
    UnsupportedContentType,
    #[error("Malformed request body")]
    MalformedBody(#[source] anyhow::Error),
    #[error("Payload Too Large")]
    PayloadTooLarge,
    #[error("Invalid email format")]
    InvalidEmail(#[source] anyhow::Error),
    // the body never says more than this; the cause chain is only logged
    #[error("Database error")]
    StoreError(#[source] StoreError),
    #[error("Server error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for SubscribeError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE, // 415
            Self::MalformedBody(_) | Self::InvalidEmail(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE, // 413
            Self::StoreError(_) | Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse { plain_text(self.status_code(), self) }
}

/// Failures of actix's own body extractor, which would otherwise reply in its
/// own format.
fn unreadable_body(e: actix_web::Error) -> SubscribeError {
    match e.as_response_error().status_code() {
        StatusCode::PAYLOAD_TOO_LARGE => SubscribeError::PayloadTooLarge,
        _ => SubscribeError::MalformedBody(anyhow::anyhow!("could not read the body: {e}")),
    }
}

/// The content type decides how the body is read; anything other than JSON
/// or an url-encoded form is refused before the body is looked at.
fn read_email(
    req: &HttpRequest,
    body: &[u8],
) -> Result<String, SubscribeError> {
    let mime = req
        .mime_type()
        .ok()
        .flatten()
        .ok_or(SubscribeError::UnsupportedContentType)?;

    let parsed: SubscribeBody = match mime.essence_str() {
        "application/json" => serde_json::from_slice(body)
            .context("body is not a valid json subscription")
            .map_err(SubscribeError::MalformedBody)?,
        "application/x-www-form-urlencoded" => serde_urlencoded::from_bytes(body)
            .context("body is not a valid url-encoded subscription")
            .map_err(SubscribeError::MalformedBody)?,
        _ => return Err(SubscribeError::UnsupportedContentType),
    };
    Ok(parsed.email.unwrap_or_default())
}

/// `GET /subscribe?token=...`
///
/// Turns a subscription back on from a link. The reply never tells an unknown
/// token apart from a store that refused the update, since anyone can probe
/// this endpoint.
#[tracing::instrument(name = "Reactivating subscriber", skip(req, store))]
pub async fn reactivate(
    req: HttpRequest,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, SubscribeError> {
    let Some(token) = token_from_query(&req) else {
        return Ok(plain_text(StatusCode::OK, REACTIVATION_GUIDANCE));
    };

    match store.set_subscribed(&token, true).await {
        Ok(Some(email)) => Ok(plain_text(
            StatusCode::OK,
            format!("Reactivated: {email}"),
        )),
        Ok(None) => Ok(plain_text(StatusCode::OK, INVALID_LINK)),
        Err(e @ StoreError::Query(_)) => {
            tracing::warn!(error.cause_chain = ?e, "reactivation rejected by the store");
            Ok(plain_text(StatusCode::OK, INVALID_LINK))
        }
        Err(e) => Err(anyhow::Error::new(e)
            .context("could not reactivate subscriber")
            .into()),
    }
}

/// `POST /subscribe`
///
/// Registers a new email, or renews a known one, and replies with the
/// unsubscribe link. The link is built from the token the store reports,
/// which under `TokenPolicy::Preserve` is not the one generated here.
///
/// # Request example
///
/// ```sh
///     curl --data 'email=john@foo.com' http://127.0.0.1:8000/subscribe
///     curl --json '{"email": "john@foo.com"}' http://127.0.0.1:8000/subscribe
/// ```
#[tracing::instrument(
    name = "Adding new subscriber",
    skip(req, body, store, base_url, policy),
    fields(subscriber_email = tracing::field::Empty)
)]
pub async fn subscribe(
    req: HttpRequest,
    body: Result<web::Bytes, actix_web::Error>,
    // all subsequent args are inherited via App.app_data; thus arg types must be unique
    store: web::Data<dyn SubscriberStore>,
    base_url: web::Data<AppBaseUrl>,
    policy: web::Data<TokenPolicy>,
) -> Result<HttpResponse, SubscribeError> {
    let body = body.map_err(unreadable_body)?;
    let email = read_email(&req, &body)?;
    let email = SubscriberEmail::parse(email)
        .map_err(|e| SubscribeError::InvalidEmail(anyhow::Error::msg(e)))?;
    tracing::Span::current().record("subscriber_email", tracing::field::display(&email));

    let token = SubscriptionToken::generate();
    let subscriber = store
        .upsert(&email, &token, *policy.get_ref())
        .await
        .map_err(SubscribeError::StoreError)?;

    let link = unsubscribe_link(&base_url.0, &subscriber.token);
    Ok(plain_text(
        StatusCode::OK,
        format!(
            "Subscribed: {}\nUnsubscribe link: {link}",
            subscriber.email
        ),
    ))
}
