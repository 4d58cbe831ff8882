use std::fmt::Debug;

use actix_web::http::StatusCode;
use actix_web::web;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::ResponseError;

use super::token_from_query;
use crate::domain::SubscriptionToken;
use crate::store::StoreError;
use crate::store::SubscriberStore;
use crate::utils::error_chain_fmt;
use crate::utils::plain_text;

const NOT_FOUND: &str = "Already processed or invalid link.";

/// The link handed out on every successful subscribe.
pub fn unsubscribe_link(
    base_url: &str,
    token: &SubscriptionToken,
) -> String {
    format!("{}/unsubscribe?token={token}", base_url.trim_end_matches('/'))
}

#[derive(thiserror::Error)]
pub enum UnsubscribeError {
    #[error("Bad request: missing token")]
    MissingToken,
    #[error("Server error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for UnsubscribeError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for UnsubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingToken => StatusCode::BAD_REQUEST,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse { plain_text(self.status_code(), self) }
}

/// `GET /unsubscribe?token=...` (and `POST`, for one-click unsubscribe from
/// mail clients)
///
/// An unknown token and a store that refused the update get the same reply.
/// Only a store that can't be reached at all is reported as a failure.
#[tracing::instrument(name = "Unsubscribing subscriber", skip(req, store))]
pub async fn unsubscribe(
    req: HttpRequest,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, UnsubscribeError> {
    let token = token_from_query(&req).ok_or(UnsubscribeError::MissingToken)?;

    match store.set_subscribed(&token, false).await {
        Ok(Some(email)) => Ok(plain_text(
            StatusCode::OK,
            format!("Unsubscribed: {email}"),
        )),
        Ok(None) => Ok(plain_text(StatusCode::OK, NOT_FOUND)),
        Err(e @ StoreError::Query(_)) => {
            tracing::warn!(error.cause_chain = ?e, "unsubscribe rejected by the store");
            Ok(plain_text(StatusCode::OK, NOT_FOUND))
        }
        Err(e) => Err(anyhow::Error::new(e)
            .context("could not unsubscribe subscriber")
            .into()),
    }
}
