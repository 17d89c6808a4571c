//! Authentication for the API group.
//!
//! Callers present a JWT either as `Authorization: Bearer <token>` or in a
//! cookie (default `access_token`). Every non-public route requires a valid
//! token; routes carrying a permission requirement additionally ask the
//! configured [`PermissionEvaluator`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use http::request::Parts;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::error::Error;
use crate::permission::{Access, ClaimsPermissionEvaluator, PermissionEvaluator};

const DEFAULT_EXPIRATION: u64 = 3600;
const DEFAULT_COOKIE: &str = "access_token";

/// Token claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    pub iat: u64,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// The authenticated caller, placed in the request extensions once the
/// token has been validated.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: String,
    pub claims: Claims,
}

#[derive(Clone)]
pub struct AuthConfig {
    secret: String,
    expiration: u64,
    cookie_name: String,
}

impl AuthConfig {
    pub fn new(secret: impl Into<String>, expiration: u64) -> Self {
        Self {
            secret: secret.into(),
            expiration,
            cookie_name: DEFAULT_COOKIE.to_string(),
        }
    }

    /// Reads `JWT_SECRET` (required) and `JWT_EXPIRATION` (seconds, default 3600).
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        let expiration = match std::env::var("JWT_EXPIRATION") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("JWT_EXPIRATION", raw))?,
            Err(_) => DEFAULT_EXPIRATION,
        };
        Ok(Self::new(secret, expiration))
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn expiration(&self) -> u64 {
        self.expiration
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn create_token(&self, sub: &str) -> Result<String, Error> {
        self.create_token_with(sub, Vec::new(), Vec::new())
    }

    pub fn create_token_with(
        &self,
        sub: &str,
        roles: Vec<String>,
        permissions: Vec<String>,
    ) -> Result<String, Error> {
        let now = unix_now();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + self.expiration,
            roles,
            permissions,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| Error::internal(format!("failed to create token: {}", e)))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| Error::unauthorized(format!("invalid token: {}", e)))
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("expiration", &self.expiration)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Applies a route's [`Access`] rule to a request before its handler runs.
#[derive(Clone)]
pub struct Gate {
    config: AuthConfig,
    evaluator: Arc<dyn PermissionEvaluator>,
}

impl Gate {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            evaluator: Arc::new(ClaimsPermissionEvaluator),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn PermissionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Returns the caller on success; 401 when credentials are missing or
    /// invalid, 403 when a required permission is not held.
    pub async fn check(&self, access: &Access, parts: &Parts) -> Result<Option<CurrentUser>, Error> {
        if access.is_public() {
            return Ok(None);
        }

        let token = token_from(parts, &self.config.cookie_name)
            .ok_or_else(|| Error::unauthorized("missing credentials"))?;
        let claims = self.config.decode(token)?;

        if let Some(requirement) = access.requirement() {
            if !self.evaluator.has_permission(&claims, requirement.name()).await {
                tracing::debug!(
                    subject = %claims.sub,
                    requirement = %requirement,
                    "permission denied"
                );
                return Err(Error::forbidden(format!(
                    "missing permission `{}`",
                    requirement.name()
                )));
            }
        }

        Ok(Some(CurrentUser {
            id: claims.sub.clone(),
            claims,
        }))
    }
}

fn token_from<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    let bearer = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        parts
            .headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == cookie_name)
            .map(|(_, value)| value)
            .filter(|t| !t.is_empty())
    })
}
