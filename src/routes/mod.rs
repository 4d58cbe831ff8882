mod health_check;
mod subscriptions;
mod unsubscribe;

use actix_web::http::StatusCode;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
pub use health_check::*;
pub use subscriptions::*;
pub use unsubscribe::*;

use crate::domain::SubscriptionToken;
use crate::utils::plain_text;

/// The `?token=` of a link. Only the first `token` pair counts, so a link
/// with trailing junk appended still works. A missing, empty or unparseable
/// query string all count as no token at all.
fn token_from_query(req: &HttpRequest) -> Option<SubscriptionToken> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(req.query_string())
        .ok()?
        .into_iter()
        .find(|(key, _)| key == "token")
        .and_then(|(_, token)| SubscriptionToken::parse(token).ok())
}

/// Fallback for every method a resource doesn't route.
pub async fn method_not_allowed() -> HttpResponse {
    plain_text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}
