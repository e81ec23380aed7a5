//! Account creation at the identity provider.

use actix_web::{HttpResponse, web};

use solace_core::DomainError;
use solace_shared::dto::{SignupRequest, SignupResponse};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// POST /signup
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let uid = state
        .within_deadline(async {
            state
                .identity
                .create_credential(&req.email, &req.password)
                .await
                .map_err(DomainError::from)
        })
        .await?;

    Ok(HttpResponse::Created().json(SignupResponse {
        message: "User created successfully".to_string(),
        uid,
    }))
}
