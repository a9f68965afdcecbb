use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AccessError, TokenError},
    models::Role,
    repository::Repository,
};

/// Header accepted as a development credential when running in `Env::Local`.
pub const LOCAL_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the access tokens issued by /login and checked by the auth gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id. The role is re-read from the users table on
    /// every request, so it is not carried in the token.
    pub sub: Uuid,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
}

/// Identity
///
/// The authenticated caller. Written into the request extensions by the auth gate
/// and read by the role check and by handlers. Lives for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

/// Identity Extractor
///
/// Lets gated handlers take `Identity` as an argument. The value is only ever
/// produced by the auth gate; a handler mounted without one rejects with
/// `Unauthenticated` rather than running anonymously.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AccessError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .ok_or(AccessError::Unauthenticated)
    }
}

/// Credential
///
/// What a caller presented to prove who they are, before it has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A JWT from `Authorization: Bearer <token>`.
    Bearer(String),
    /// A raw user id from the `x-user-id` header. Only honoured in `Env::Local`.
    LocalUser(Uuid),
}

impl Credential {
    /// from_headers
    ///
    /// Collects the credentials present in the request headers, most preferred
    /// first. In `Env::Local` a well-formed `x-user-id` header comes before the
    /// Authorization header; in production it is ignored entirely.
    pub fn from_headers(headers: &HeaderMap, env: Env) -> Vec<Credential> {
        let local_user = (env == Env::Local)
            .then(|| headers.get(LOCAL_USER_HEADER))
            .flatten()
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .map(Credential::LocalUser);

        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Credential::Bearer(token.to_string()));

        local_user.into_iter().chain(bearer).collect()
    }
}

/// authenticate
///
/// Turns a credential into an `Identity` or fails with `Unauthenticated`.
///
/// 1. Token validation: signature and expiry are checked with the configured secret.
/// 2. DB lookup: the subject must still exist, so deleted users lose access at once.
/// 3. Role resolution: the stored role must be one of the known roles.
///
/// Only reads from the repository; nothing is written.
pub async fn authenticate(
    credential: &Credential,
    repo: &dyn Repository,
    config: &AppConfig,
) -> Result<Identity, AccessError> {
    let user_id = match credential {
        Credential::LocalUser(id) if config.env == Env::Local => *id,
        Credential::LocalUser(_) => {
            tracing::debug!("local credential rejected outside the local environment");
            return Err(AccessError::Unauthenticated);
        }
        Credential::Bearer(token) => decode_token(token, &config.jwt_secret)?.sub,
    };

    let user = match repo.get_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::debug!(%user_id, "credential refers to an unknown user");
            return Err(AccessError::Unauthenticated);
        }
        Err(e) => {
            tracing::error!(%user_id, "user lookup failed during authentication: {:?}", e);
            return Err(AccessError::Unauthenticated);
        }
    };

    let role = user.role.parse::<Role>().map_err(|e| {
        tracing::warn!(%user_id, "stored user has {}", e);
        AccessError::Unauthenticated
    })?;

    Ok(Identity { id: user.id, role })
}

/// authenticate_first
///
/// Tries each credential in order and returns the first identity that resolves.
/// A local `x-user-id` naming an unknown user therefore falls through to the
/// bearer token instead of rejecting the request.
pub async fn authenticate_first(
    credentials: &[Credential],
    repo: &dyn Repository,
    config: &AppConfig,
) -> Result<Identity, AccessError> {
    for credential in credentials {
        if let Ok(identity) = authenticate(credential, repo, config).await {
            return Ok(identity);
        }
    }
    Err(AccessError::Unauthenticated)
}

/// decode_token
///
/// Validates an HS256 token. Expiry validation is always on.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AccessError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("expired token"),
                other => tracing::debug!("invalid token: {:?}", other),
            }
            AccessError::Unauthenticated
        })
}

/// issue_token
///
/// Signs an access token for `user_id`. Returns the token and its lifetime in seconds.
pub fn issue_token(user_id: Uuid, config: &AppConfig) -> Result<(String, i64), TokenError> {
    let now = Utc::now();
    let out_of_range = || TokenError::Lifetime(config.jwt_expiry_hours);
    let lifetime = TimeDelta::try_hours(config.jwt_expiry_hours).ok_or_else(out_of_range)?;
    let expires_at = now.checked_add_signed(lifetime).ok_or_else(out_of_range)?;
    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: expires_at.timestamp() as usize,
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    let token = encode(&Header::default(), &claims, &key)?;
    Ok((token, lifetime.num_seconds()))
}

// --- Password Hashing ---

/// hash_password
///
/// Produces `"<salt>$<hex sha256(salt || password)>"` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = salted_digest(&salt, password);
    format!("{salt}${digest}")
}

/// verify_password
///
/// Recomputes the digest with the stored salt. A stored value that is not in
/// `salt$digest` form never verifies.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let actual = salted_digest(salt, password);
    constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
