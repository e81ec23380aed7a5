//! Google service-account credentials.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use solace_core::ports::AuthError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Assertions are valid for one hour, the maximum Google accepts.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Deserialize)]
struct ServiceAccountFile {
    project_id: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// A parsed service-account key file.
#[derive(Clone)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub token_uri: String,
    signing_key: EncodingKey,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl ServiceAccount {
    /// Load and validate a key file. The private key is parsed up front so a
    /// broken file fails at startup rather than on the first signup.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AuthError::Provider(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AuthError> {
        let file: ServiceAccountFile = serde_json::from_str(raw)
            .map_err(|e| AuthError::Provider(format!("invalid service account: {e}")))?;
        if file.project_id.is_empty() {
            return Err(AuthError::Provider(
                "service account has no project_id".to_string(),
            ));
        }

        let signing_key = EncodingKey::from_rsa_pem(file.private_key.as_bytes())
            .map_err(|e| AuthError::Provider(format!("invalid private key: {e}")))?;

        Ok(Self {
            project_id: file.project_id,
            client_email: file.client_email,
            token_uri: file
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            signing_key,
        })
    }

    /// Sign a JWT-bearer grant assertion for the given OAuth scopes.
    pub(crate) fn sign_assertion(&self, scope: &str) -> Result<String, AuthError> {
        let iat = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            sub: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| AuthError::Provider(format!("cannot sign assertion: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode, jwk::JwkSet};

    pub(crate) const SIGNING_KEY_PEM: &str = include_str!("testdata/signing_key.pem");
    pub(crate) const OTHER_KEY_PEM: &str = include_str!("testdata/other_key.pem");
    pub(crate) const JWKS_JSON: &str = include_str!("testdata/jwks.json");

    pub(crate) fn service_account_json() -> String {
        serde_json::json!({
            "type": "service_account",
            "project_id": "solace-test",
            "client_email": "svc@solace-test.iam.gserviceaccount.com",
            "private_key": SIGNING_KEY_PEM,
        })
        .to_string()
    }

    #[test]
    fn test_parses_key_file_and_defaults_token_uri() {
        let account = ServiceAccount::from_json(&service_account_json()).unwrap();

        assert_eq!(account.project_id, "solace-test");
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn test_rejects_bad_private_key() {
        let raw = serde_json::json!({
            "project_id": "solace-test",
            "client_email": "svc@solace-test.iam.gserviceaccount.com",
            "private_key": "not a key",
        })
        .to_string();

        assert!(matches!(
            ServiceAccount::from_json(&raw),
            Err(AuthError::Provider(_))
        ));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let account = ServiceAccount::from_json(&service_account_json()).unwrap();

        assert!(!format!("{account:?}").contains("PRIVATE KEY"));
    }

    #[test]
    fn test_assertion_is_signed_by_account_key() {
        let account = ServiceAccount::from_json(&service_account_json()).unwrap();
        let jwks: JwkSet = serde_json::from_str(JWKS_JSON).unwrap();
        let key = DecodingKey::from_jwk(&jwks.keys[0]).unwrap();

        let assertion = account.sign_assertion("scope-a").unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[DEFAULT_TOKEN_URI]);
        let data = decode::<serde_json::Value>(&assertion, &key, &validation).unwrap();
        assert_eq!(data.claims["scope"], "scope-a");
        assert_eq!(data.claims["iss"], "svc@solace-test.iam.gserviceaccount.com");
    }
}
