//! Static pages.

use actix_web::HttpResponse;
use actix_web::http::header::ContentType;

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// GET /
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

/// GET /message
pub async fn message() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("<p>Hello! You are not alone. 💙</p>")
}
