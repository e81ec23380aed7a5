//! Firebase Authentication as the external identity provider.
//!
//! ID tokens are verified locally against Google's published signing keys.
//! New accounts are created through the Identity Toolkit admin API,
//! authorized with an OAuth2 token minted from the service account.

mod credentials;
mod keys;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use solace_core::ports::{AuthError, IdentityProvider, VerifiedIdentity};

pub use credentials::ServiceAccount;
use keys::KeyCache;

const SECURE_TOKEN_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const SECURE_TOKEN_ISSUER: &str = "https://securetoken.google.com";
const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const ADMIN_SCOPES: &str = "https://www.googleapis.com/auth/identitytoolkit \
                            https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Access tokens are refreshed this long before Google says they expire.
const ACCESS_TOKEN_MARGIN: Duration = Duration::from_secs(60);
const CLOCK_SKEW_SECS: i64 = 60;
const MAX_UID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    auth_time: Option<i64>,
    #[serde(default)]
    iat: Option<i64>,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Serialize)]
struct CreateAccountRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountResponse {
    local_id: String,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

/// Firebase-backed [`IdentityProvider`].
pub struct FirebaseIdentityProvider {
    account: ServiceAccount,
    issuer: String,
    api_base: String,
    client: reqwest::Client,
    keys: KeyCache,
    access_token: Mutex<Option<AccessToken>>,
}

impl FirebaseIdentityProvider {
    /// Build a provider whose outbound calls are each bounded by `http_timeout`.
    pub fn new(account: ServiceAccount, http_timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .map_err(|e| AuthError::Provider(format!("cannot build HTTP client: {e}")))?;
        let keys = KeyCache::new(client.clone(), SECURE_TOKEN_JWKS_URL);

        Ok(Self::assemble(account, client, keys))
    }

    pub fn from_credentials_file(
        path: impl AsRef<std::path::Path>,
        http_timeout: Duration,
    ) -> Result<Self, AuthError> {
        let account = ServiceAccount::from_file(path)?;
        tracing::info!(project_id = %account.project_id, "Firebase credentials loaded");
        Self::new(account, http_timeout)
    }

    fn assemble(account: ServiceAccount, client: reqwest::Client, keys: KeyCache) -> Self {
        Self {
            issuer: format!("{SECURE_TOKEN_ISSUER}/{}", account.project_id),
            api_base: IDENTITY_TOOLKIT_URL.to_string(),
            account,
            client,
            keys,
            access_token: Mutex::new(None),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    async fn admin_access_token(&self) -> Result<String, AuthError> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.refresh_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let assertion = self.account.sign_assertion(ADMIN_SCOPES)?;
        let response: AccessTokenResponse = self
            .client
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::Provider(format!("token exchange failed: {e}")))?
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("invalid token response: {e}")))?;

        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(ACCESS_TOKEN_MARGIN);
        *cached = Some(AccessToken {
            value: response.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(response.access_token)
    }

    fn validate_claims(&self, claims: &IdTokenClaims) -> Result<(), AuthError> {
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LEN {
            return Err(AuthError::InvalidToken("invalid subject".to_string()));
        }

        let latest = Utc::now().timestamp() + CLOCK_SKEW_SECS;
        if claims.auth_time.is_some_and(|t| t > latest) {
            return Err(AuthError::InvalidToken(
                "auth_time is in the future".to_string(),
            ));
        }
        if claims.iat.is_some_and(|t| t > latest) {
            return Err(AuthError::InvalidToken("issued in the future".to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("missing key id".to_string()))?;

        let key = self.keys.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = CLOCK_SKEW_SECS as u64;
        validation.set_audience(&[&self.account.project_id]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "aud", "iss", "sub"]);

        let data = decode::<IdTokenClaims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })?;
        self.validate_claims(&data.claims)?;

        Ok(VerifiedIdentity {
            subject: data.claims.sub,
            email: data.claims.email,
        })
    }

    async fn create_credential(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let access_token = self.admin_access_token().await?;
        let url = format!(
            "{}/projects/{}/accounts",
            self.api_base, self.account.project_id
        );

        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&CreateAccountRequest { email, password })
            .send()
            .await
            .map_err(|e| AuthError::Provider(format!("create account failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(classify_api_error(&message));
        }

        let created: CreateAccountResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("invalid create account response: {e}")))?;

        tracing::info!(uid = %created.local_id, "Identity provider account created");
        Ok(created.local_id)
    }
}

/// Identity Toolkit errors look like `WEAK_PASSWORD : Password should be...`.
fn classify_api_error(message: &str) -> AuthError {
    let code = message.split([' ', ':']).next().unwrap_or_default();
    match code {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => AuthError::CredentialExists,
        "INVALID_EMAIL" | "WEAK_PASSWORD" | "INVALID_PASSWORD" | "MISSING_PASSWORD" => {
            AuthError::Rejected(message.to_string())
        }
        _ => AuthError::Provider(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credentials::tests::{JWKS_JSON, OTHER_KEY_PEM, SIGNING_KEY_PEM, service_account_json};
    use jsonwebtoken::jwk::JwkSet;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider() -> FirebaseIdentityProvider {
        let account = ServiceAccount::from_json(&service_account_json()).unwrap();
        let client = reqwest::Client::new();
        let jwks: JwkSet = serde_json::from_str(JWKS_JSON).unwrap();
        // Unroutable: any refresh attempt fails instead of reaching Google.
        let keys = KeyCache::with_keys(client.clone(), "http://127.0.0.1:9/keys", jwks);
        FirebaseIdentityProvider::assemble(account, client, keys)
    }

    fn sign(claims: serde_json::Value, pem: &str, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        encode(&header, &claims, &EncodingKey::from_rsa_pem(pem.as_bytes()).unwrap()).unwrap()
    }

    fn claims(sub: &str) -> serde_json::Value {
        let now = Utc::now().timestamp();
        json!({
            "iss": "https://securetoken.google.com/solace-test",
            "aud": "solace-test",
            "sub": sub,
            "email": "a@b.com",
            "iat": now - 10,
            "auth_time": now - 10,
            "exp": now + 3600,
        })
    }

    #[tokio::test]
    async fn test_valid_token_yields_subject() {
        let token = sign(claims("uid-123"), SIGNING_KEY_PEM, "test-key");

        let identity = provider().verify_token(&token).await.unwrap();

        assert_eq!(identity.subject, "uid-123");
        assert_eq!(identity.email.as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_forged_signature_is_rejected() {
        let token = sign(claims("uid-123"), OTHER_KEY_PEM, "test-key");

        let err = provider().verify_token(&token).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_wrong_audience_is_rejected() {
        let mut claims = claims("uid-123");
        claims["aud"] = json!("someone-else");
        let token = sign(claims, SIGNING_KEY_PEM, "test-key");

        let err = provider().verify_token(&token).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_wrong_issuer_is_rejected() {
        let mut claims = claims("uid-123");
        claims["iss"] = json!("https://securetoken.google.com/other");
        let token = sign(claims, SIGNING_KEY_PEM, "test-key");

        let err = provider().verify_token(&token).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let mut claims = claims("uid-123");
        claims["exp"] = json!(Utc::now().timestamp() - 3600);
        let token = sign(claims, SIGNING_KEY_PEM, "test-key");

        let err = provider().verify_token(&token).await.unwrap_err();

        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn test_empty_subject_is_rejected() {
        let token = sign(claims(""), SIGNING_KEY_PEM, "test-key");

        let err = provider().verify_token(&token).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_future_auth_time_is_rejected() {
        let mut claims = claims("uid-123");
        claims["auth_time"] = json!(Utc::now().timestamp() + 3600);
        let token = sign(claims, SIGNING_KEY_PEM, "test-key");

        let err = provider().verify_token(&token).await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let err = provider().verify_token("not.a.jwt").await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_unknown_key_id_fails_after_refresh_attempt() {
        let token = sign(claims("uid-123"), SIGNING_KEY_PEM, "rotated-away");

        let err = provider().verify_token(&token).await.unwrap_err();

        assert!(matches!(err, AuthError::Provider(_)));
    }

    /// Provider whose admin calls go to `server` instead of Google.
    fn admin_provider(server: &MockServer) -> FirebaseIdentityProvider {
        let mut account = ServiceAccount::from_json(&service_account_json()).unwrap();
        account.token_uri = format!("{}/token", server.uri());
        let client = reqwest::Client::new();
        let keys = KeyCache::new(client.clone(), format!("{}/keys", server.uri()));
        let mut provider = FirebaseIdentityProvider::assemble(account, client, keys);
        provider.api_base = format!("{}/v1", server.uri());
        provider
    }

    async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "admin-token",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_create_credential_returns_local_id() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/solace-test/accounts"))
            .and(header("authorization", "Bearer admin-token"))
            .and(body_partial_json(json!({"email": "new@b.com", "password": "secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "identitytoolkit#SignupNewUserResponse",
                "localId": "uid-new",
                "email": "new@b.com"
            })))
            .expect(2)
            .mount(&server)
            .await;
        let provider = admin_provider(&server);

        let uid = provider.create_credential("new@b.com", "secret1").await.unwrap();
        // Second call reuses the cached access token.
        let again = provider.create_credential("new@b.com", "secret1").await.unwrap();

        assert_eq!(uid, "uid-new");
        assert_eq!(again, "uid-new");
        server.verify().await;
    }

    #[tokio::test]
    async fn test_create_credential_reads_error_envelope() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/solace-test/accounts"))
            .and(body_partial_json(json!({"email": "taken@b.com"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "EMAIL_EXISTS", "errors": []}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/solace-test/accounts"))
            .and(body_partial_json(json!({"email": "weak@b.com"})))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "WEAK_PASSWORD : Password should be at least 6 characters"
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/projects/solace-test/accounts"))
            .and(body_partial_json(json!({"email": "down@b.com"})))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;
        let provider = admin_provider(&server);

        let taken = provider.create_credential("taken@b.com", "secret1").await;
        let weak = provider.create_credential("weak@b.com", "123").await;
        let down = provider.create_credential("down@b.com", "secret1").await;

        assert!(matches!(taken, Err(AuthError::CredentialExists)));
        assert!(matches!(weak, Err(AuthError::Rejected(_))));
        assert!(matches!(down, Err(AuthError::Provider(_))));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_rejected_token_exchange_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
            .mount(&server)
            .await;
        let provider = admin_provider(&server);

        let result = provider.create_credential("new@b.com", "secret1").await;

        assert!(matches!(result, Err(AuthError::Provider(_))));
    }

    #[tokio::test]
    async fn test_forged_key_ids_fetch_keys_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/keys"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("cache-control", "public, max-age=3600")
                    .set_body_raw(JWKS_JSON, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;
        let provider = admin_provider(&server);

        for i in 0..20 {
            let token = sign(claims("uid-123"), SIGNING_KEY_PEM, &format!("forged-{i}"));
            let err = provider.verify_token(&token).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidToken(_)));
        }
        let valid = sign(claims("uid-123"), SIGNING_KEY_PEM, "test-key");
        assert_eq!(provider.verify_token(&valid).await.unwrap().subject, "uid-123");

        server.verify().await;
    }

    #[test]
    fn test_classify_api_error() {
        assert!(matches!(
            classify_api_error("EMAIL_EXISTS"),
            AuthError::CredentialExists
        ));
        assert!(matches!(
            classify_api_error("WEAK_PASSWORD : Password should be at least 6 characters"),
            AuthError::Rejected(_)
        ));
        assert!(matches!(
            classify_api_error("INTERNAL_ERROR"),
            AuthError::Provider(_)
        ));
    }
}
