use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{SecurityConfig, MAX_SESSION_TTL_HOURS};

/// Server-verifiable proof of a prior login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub subject: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signed token payload carried in the session cookie
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(subject: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: subject,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        }
    }

    fn into_session(self) -> Option<Session> {
        Some(Session {
            id: self.jti,
            subject: self.sub,
            issued_at: DateTime::<Utc>::from_timestamp(self.iat, 0)?,
            expires_at: DateTime::<Utc>::from_timestamp(self.exp, 0)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session secret not configured")]
    MissingSecret,

    #[error("Session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid cookie header: {0}")]
    InvalidHeader(#[from] header::InvalidHeaderValue),
}

/// Holds the client-side session token
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Session carried by the request, if present and valid
    async fn read(&self, headers: &HeaderMap) -> Option<Session>;

    /// `Set-Cookie` value that removes the session from the client
    async fn revoke(&self, headers: &HeaderMap) -> Result<HeaderValue, SessionError>;
}

/// SessionStore keeping an HS256 JWT in an HttpOnly cookie
pub struct CookieSessionStore {
    cookie_name: String,
    secret: Option<String>,
    ttl: Duration,
    secure: bool,
}

impl CookieSessionStore {
    pub fn new(config: &SecurityConfig) -> Self {
        if config.session_secret.is_none() {
            tracing::warn!("SESSION_SECRET not configured; every request will be unauthenticated");
        }

        let hours = if config.session_ttl_hours > MAX_SESSION_TTL_HOURS {
            tracing::warn!(
                "Session TTL of {}h exceeds {}h; clamping",
                config.session_ttl_hours,
                MAX_SESSION_TTL_HOURS
            );
            MAX_SESSION_TTL_HOURS
        } else {
            config.session_ttl_hours
        };

        Self {
            cookie_name: config.session_cookie_name.clone(),
            secret: config.session_secret.clone(),
            // Bounded above, so the conversion cannot overflow
            ttl: Duration::hours(hours as i64),
            secure: config.cookie_secure,
        }
    }

    /// Mint a session for `subject` and return its `Set-Cookie` value
    pub fn issue(&self, subject: Uuid) -> Result<HeaderValue, SessionError> {
        let token = self.sign(&SessionClaims::new(subject, self.ttl))?;
        let cookie = self.cookie(&token, self.ttl.num_seconds());
        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// Sign arbitrary claims with the configured secret
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        let secret = self.secret.as_deref().ok_or(SessionError::MissingSecret)?;
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        Ok(encode(&Header::default(), claims, &encoding_key)?)
    }

    /// Validate a token and extract its session
    pub fn verify(&self, token: &str) -> Result<Session, SessionError> {
        let secret = self.secret.as_deref().ok_or(SessionError::MissingSecret)?;
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());
        let token_data = decode::<SessionClaims>(token, &decoding_key, &Validation::default())?;

        token_data
            .claims
            .into_session()
            .ok_or_else(|| SessionError::Token(ErrorKind::InvalidToken.into()))
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.cookie_name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

#[async_trait]
impl SessionStore for CookieSessionStore {
    async fn read(&self, headers: &HeaderMap) -> Option<Session> {
        let token = extract_session_token(headers, &self.cookie_name)?;

        match self.verify(&token) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                None
            }
        }
    }

    async fn revoke(&self, _headers: &HeaderMap) -> Result<HeaderValue, SessionError> {
        Ok(HeaderValue::from_str(&self.cookie("", 0))?)
    }
}

/// Extract the session token from the named cookie, falling back to a bearer token
pub fn extract_session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    find_cookie(headers, cookie_name).or_else(|| extract_bearer_token(headers))
}

/// Find a cookie by name across all `Cookie` headers
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}
