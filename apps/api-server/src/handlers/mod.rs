//! HTTP handlers and route configuration.

mod health;
mod pages;
mod posts;
mod signup;
mod users;

use actix_web::{guard, web};

use crate::middleware::auth::AuthGate;
use crate::middleware::error::json_error_handler;
use crate::state::AppState;

/// Register shared state and every route.
pub fn configure_app(cfg: &mut web::ServiceConfig, state: AppState) {
    let gate = AuthGate::new(state.identity.clone(), state.request_timeout);

    cfg.app_data(web::Data::new(state))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        // Pages
        .route("/", web::get().to(pages::index))
        .route("/message", web::get().to(pages::message))
        // Posts: writes need a verified identity, reads are public
        .service(
            web::resource("/posts")
                .guard(guard::Post())
                .route(web::post().to(posts::create_post))
                .wrap(gate),
        )
        .service(web::resource("/posts").route(web::get().to(posts::list_posts)))
        // Accounts
        .route("/users", web::post().to(users::register))
        .route("/signup", web::post().to(signup::signup))
        .service(web::scope("/api").route("/health", web::get().to(health::health_check)));
}
