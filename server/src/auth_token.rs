use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{digest::KeyInit, Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Sha256, Sha384, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Validity window of a freshly issued session token.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthTokenError {
    #[error("session token secret is empty")]
    SigningError,

    #[error("session token signature is invalid")]
    InvalidSignature,

    #[error("session token is expired")]
    Expired,

    #[error("session token claims are malformed")]
    MalformedClaims,
}

/// Signing algorithms a token header may name. Anything outside the HMAC
/// family, `none` included, never gets this far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Hs256,
    Hs384,
    Hs512,
}

impl HmacAlgorithm {
    pub fn from_header(alg: &str) -> Option<Self> {
        match alg {
            "HS256" => Some(Self::Hs256),
            "HS384" => Some(Self::Hs384),
            "HS512" => Some(Self::Hs512),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }

    fn sign(self, secret: &[u8], data: &[u8]) -> Result<Vec<u8>, AuthTokenError> {
        match self {
            Self::Hs256 => mac_bytes::<HmacSha256>(secret, data),
            Self::Hs384 => mac_bytes::<HmacSha384>(secret, data),
            Self::Hs512 => mac_bytes::<HmacSha512>(secret, data),
        }
    }

    fn verify(self, secret: &[u8], data: &[u8], signature: &[u8]) -> Result<(), AuthTokenError> {
        match self {
            Self::Hs256 => verify_mac::<HmacSha256>(secret, data, signature),
            Self::Hs384 => verify_mac::<HmacSha384>(secret, data, signature),
            Self::Hs512 => verify_mac::<HmacSha512>(secret, data, signature),
        }
    }
}

fn mac_bytes<M: Mac + KeyInit>(secret: &[u8], data: &[u8]) -> Result<Vec<u8>, AuthTokenError> {
    let mut mac =
        <M as KeyInit>::new_from_slice(secret).map_err(|_| AuthTokenError::SigningError)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify_mac<M: Mac + KeyInit>(
    secret: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<(), AuthTokenError> {
    let mut mac =
        <M as KeyInit>::new_from_slice(secret).map_err(|_| AuthTokenError::InvalidSignature)?;
    mac.update(data);
    mac.verify_slice(signature)
        .map_err(|_| AuthTokenError::InvalidSignature)
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// Claims carried by a session token. `username` and `exp` (Unix seconds) are
/// required; any other claim is preserved as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClaims {
    pub username: String,
    pub exp: u64,
    pub extra: Map<String, Value>,
}

impl SessionClaims {
    pub fn new(username: impl Into<String>, exp: u64) -> Self {
        Self {
            username: username.into(),
            exp,
            extra: Map::new(),
        }
    }

    /// The claims as a single JSON object, as they appear in the token.
    pub fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("username".to_string(), Value::from(self.username.clone()));
        map.insert("exp".to_string(), Value::from(self.exp));
        Value::Object(map)
    }

    fn from_map(mut map: Map<String, Value>, reference_secs: u64) -> Result<Self, AuthTokenError> {
        let exp = match map.remove("exp") {
            Some(Value::Number(number)) => {
                number.as_f64().ok_or(AuthTokenError::MalformedClaims)?
            }
            _ => return Err(AuthTokenError::MalformedClaims),
        };

        // Compared as sent; a fractional expiry must not cut the window short.
        if reference_secs as f64 >= exp {
            return Err(AuthTokenError::Expired);
        }
        let exp = exp.ceil() as u64;

        let username = match map.remove("username") {
            Some(Value::String(username)) => username,
            _ => return Err(AuthTokenError::MalformedClaims),
        };

        Ok(Self {
            username,
            exp,
            extra: map,
        })
    }
}

#[derive(Clone)]
pub struct AuthTokenService {
    secret: Arc<[u8]>,
    ttl: Duration,
    algorithm: HmacAlgorithm,
}

impl std::fmt::Debug for AuthTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokenService")
            .field("ttl", &self.ttl)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl AuthTokenService {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Result<Self, AuthTokenError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthTokenError::SigningError);
        }

        Ok(Self {
            secret: Arc::<[u8]>::from(secret),
            ttl,
            algorithm: HmacAlgorithm::Hs512,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue_session_token(
        &self,
        username: &str,
        issued_at_secs: u64,
    ) -> Result<String, AuthTokenError> {
        let exp = issued_at_secs.saturating_add(self.ttl.as_secs());
        self.issue(&SessionClaims::new(username, exp))
    }

    pub fn issue(&self, claims: &SessionClaims) -> Result<String, AuthTokenError> {
        if self.secret.is_empty() {
            return Err(AuthTokenError::SigningError);
        }

        let header = TokenHeader {
            alg: self.algorithm.name().to_string(),
            typ: Some("JWT".to_string()),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|_| AuthTokenError::SigningError)?;
        let claims_json =
            serde_json::to_vec(&claims.to_value()).map_err(|_| AuthTokenError::SigningError)?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self.algorithm.sign(&self.secret, signing_input.as_bytes())?;

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    pub fn verify(&self, token: &str, reference_secs: u64) -> Result<SessionClaims, AuthTokenError> {
        let mut segments = token.split('.');
        let (header_b64, claims_b64, signature_b64) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(header), Some(claims), Some(signature), None) => (header, claims, signature),
                _ => return Err(AuthTokenError::InvalidSignature),
            };

        let header: TokenHeader = URL_SAFE_NO_PAD
            .decode(header_b64)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(AuthTokenError::InvalidSignature)?;

        // Algorithm confusion: only HMAC-family headers are ever verified.
        let algorithm =
            HmacAlgorithm::from_header(&header.alg).ok_or(AuthTokenError::InvalidSignature)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthTokenError::InvalidSignature)?;

        let signing_input_len = header_b64.len() + 1 + claims_b64.len();
        algorithm.verify(
            &self.secret,
            &token.as_bytes()[..signing_input_len],
            &signature,
        )?;

        let claims: Map<String, Value> = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or(AuthTokenError::MalformedClaims)?;

        SessionClaims::from_map(claims, reference_secs)
    }
}

/// Issues a token for `username` valid for `ttl` from now.
pub fn issue(username: &str, secret: &[u8], ttl: Duration) -> Result<String, AuthTokenError> {
    AuthTokenService::new(secret, ttl)?.issue_session_token(username, now_secs())
}

/// Verifies `token` against `secret` at the current time.
pub fn verify(token: &str, secret: &[u8]) -> Result<SessionClaims, AuthTokenError> {
    AuthTokenService::new(secret, DEFAULT_SESSION_TTL)
        .map_err(|_| AuthTokenError::InvalidSignature)?
        .verify(token, now_secs())
}

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
