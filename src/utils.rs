use std::fmt::Display;

use actix_web::http::header::CacheControl;
use actix_web::http::header::CacheDirective;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;

/// Every response of the subscription endpoints is uncached plain text.
pub fn plain_text(
    status: StatusCode,
    body: impl Display,
) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header(ContentType::plaintext())
        .insert_header(CacheControl(vec![CacheDirective::NoStore]))
        .body(body.to_string())
}

/// Write the full chain of causes, so that a single log line explains where
/// an error came from.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{e}\n")?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{cause}")?;
        current = cause.source();
    }
    Ok(())
}
