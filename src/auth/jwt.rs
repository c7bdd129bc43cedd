//! JSON Web Tokens in the `JWT <token>` scheme used by the mobile client.
//!
//! A token carries `orig_iat`, the time of the original login. Refreshing
//! issues a new token with a fresh `exp` but the same `orig_iat`, and is
//! only allowed while `orig_iat + refresh_expiration` lies in the future.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::JwtSettings;
use crate::database::entities::users;
use crate::errors::CoreError;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Signature has expired.")]
    Expired,

    #[error("Error decoding signature.")]
    Invalid,

    #[error("Refresh has expired.")]
    RefreshExpired,

    #[error("orig_iat field is required.")]
    RefreshDisabled,

    #[error("failed to encode token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

impl From<TokenError> for CoreError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encode(_) => CoreError::internal("Could not issue token").with_source(err),
            other => CoreError::field("non_field_errors", other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i32,
    pub email: String,
    pub username: String,
    pub exp: i64,
    pub orig_iat: i64,
}

#[derive(Clone)]
pub struct JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiration_secs: i64,
    allow_refresh: bool,
    refresh_expiration_secs: i64,
}

impl JwtCodec {
    pub fn new(settings: &JwtSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            expiration_secs: settings.expiration_secs as i64,
            allow_refresh: settings.allow_refresh,
            refresh_expiration_secs: settings.refresh_expiration_secs as i64,
        }
    }

    pub fn issue(&self, user: &users::Model) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Issues a token as if the login happened at `issued_at`.
    pub fn issue_at(&self, user: &users::Model, issued_at: i64) -> Result<String, TokenError> {
        let claims = Claims {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            exp: issued_at + self.expiration_secs,
            orig_iat: issued_at,
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding).map_err(TokenError::Encode)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }

    /// Exchanges a still-valid token for one with a fresh expiry.
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        if !self.allow_refresh {
            return Err(TokenError::RefreshDisabled);
        }
        let claims = self.decode(token)?;
        let now = Utc::now().timestamp();
        if claims.orig_iat + self.refresh_expiration_secs <= now {
            return Err(TokenError::RefreshExpired);
        }
        self.encode(&Claims {
            exp: now + self.expiration_secs,
            ..claims
        })
    }
}
