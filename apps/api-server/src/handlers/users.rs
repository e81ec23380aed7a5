//! User registration.

use actix_web::{HttpResponse, web};

use solace_core::Registration;
use solace_shared::MessageResponse;
use solace_shared::dto::RegisterUserRequest;

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /users
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let registration = Registration {
        email: req.email,
        username: req.username,
        password: req.password,
    };

    state
        .within_deadline(state.users.register(registration))
        .await?;

    Ok(HttpResponse::Created().json(MessageResponse::new("User created successfully")))
}
