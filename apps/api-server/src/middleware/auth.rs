//! Auth Gate middleware and the `Identity` extractor.
//!
//! The gate wraps protected resources. A request passes only with an
//! `Authorization: Bearer <token>` header whose token the identity provider
//! verifies; the verified identity is then stored in the request extensions.
//! Anything else is answered with 401 before the inner service runs.

use std::future::{Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, ResponseError,
    body::EitherBody,
    dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{self, HeaderMap},
};
use futures::future::LocalBoxFuture;

use solace_core::ports::{AuthError, IdentityProvider, VerifiedIdentity};

use crate::middleware::error::AppError;

/// Authenticated caller, available to handlers behind [`AuthGate`].
///
/// ```ignore
/// async fn protected_route(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.subject)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub subject: String,
    pub email: Option<String>,
}

impl From<VerifiedIdentity> for Identity {
    fn from(verified: VerifiedIdentity) -> Self {
        Self {
            subject: verified.subject,
            email: verified.email,
        }
    }
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // Only present when the route is wrapped by AuthGate.
        let identity = req.extensions().get::<Identity>().cloned();
        ready(identity.ok_or_else(|| {
            tracing::error!(path = %req.path(), "Identity requested on an unguarded route");
            AppError::Unauthorized("Authentication required".to_string())
        }))
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<String, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim().to_string())
        }
        _ => Err(AuthError::InvalidToken("Expected Bearer token".to_string())),
    }
}

/// Middleware factory guarding a resource with bearer-token authentication.
pub struct AuthGate {
    provider: Arc<dyn IdentityProvider>,
    timeout: Duration,
}

impl AuthGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthGateService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGateService {
            service: Rc::new(service),
            provider: self.provider.clone(),
            timeout: self.timeout,
        }))
    }
}

pub struct AuthGateService<S> {
    service: Rc<S>,
    provider: Arc<dyn IdentityProvider>,
    timeout: Duration,
}

impl<S, B> Service<ServiceRequest> for AuthGateService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let provider = self.provider.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let verified = match authenticate(&req, provider.as_ref(), timeout).await {
                Ok(verified) => verified,
                Err(e) => {
                    // Short-circuit: the wrapped handler is never called.
                    let response = e.error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
            };

            tracing::debug!(subject = %verified.subject, "Request authenticated");
            req.extensions_mut().insert(Identity::from(verified));

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

async fn authenticate(
    req: &ServiceRequest,
    provider: &dyn IdentityProvider,
    timeout: Duration,
) -> Result<VerifiedIdentity, AppError> {
    let token = bearer_token(req.headers()).map_err(|e| {
        tracing::warn!(path = %req.path(), reason = %e, "Rejected unauthenticated request");
        AppError::from(e)
    })?;

    match tokio::time::timeout(timeout, provider.verify_token(&token)).await {
        Ok(Ok(verified)) => Ok(verified),
        Ok(Err(e)) => {
            tracing::warn!(path = %req.path(), reason = %e, "Token verification failed");
            Err(AppError::from(e))
        }
        Err(_) => {
            tracing::warn!(path = %req.path(), "Token verification timed out");
            Err(AppError::Timeout)
        }
    }
}
