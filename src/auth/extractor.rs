use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use sea_orm::EntityTrait;

use crate::database::entities::users;
use crate::errors::CoreError;
use crate::server::AppState;
use crate::services::auth_service::AuthService;

pub const SESSION_COOKIE: &str = "sessionid";

/// Authenticated user, taken from a `JWT`/`Bearer` token or the session
/// cookie. Rejects anonymous requests with 401.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub users::Model);

/// Like [`CurrentUser`] but additionally requires `is_staff`.
#[derive(Clone, Debug)]
pub struct StaffUser(pub users::Model);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }
        resolve_user(parts, state)
            .await?
            .map(CurrentUser)
            .ok_or_else(|| CoreError::unauthorized("Authentication credentials were not provided."))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !(user.is_staff || user.is_superuser) {
            return Err(CoreError::forbidden(
                "You do not have permission to perform this action.",
            ));
        }
        Ok(StaffUser(user))
    }
}

/// Resolves the caller. `Ok(None)` means anonymous; a presented but
/// invalid token is an error, an unknown session cookie is not.
pub async fn resolve_user(parts: &Parts, state: &AppState) -> Result<Option<users::Model>, CoreError> {
    if let Some(token) = bearer_token(parts) {
        let claims = state
            .jwt
            .decode(token)
            .map_err(|err| CoreError::unauthorized(err.to_string()))?;
        let user = users::Entity::find_by_id(claims.user_id)
            .one(&state.db)
            .await
            .map_err(|e| CoreError::db("load token user", e))?
            .ok_or_else(|| CoreError::unauthorized("Invalid signature."))?;
        if !user.is_active {
            return Err(CoreError::unauthorized("User account is disabled."));
        }
        return Ok(Some(user));
    }

    if let Some(session_key) = session_cookie(&parts.headers) {
        let auth = AuthService::new(state.db.clone());
        return match auth.get_user_from_session(session_key).await {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                tracing::debug!("ignoring session cookie: {}", err);
                Ok(None)
            }
        };
    }

    Ok(None)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    match scheme {
        "JWT" | "Bearer" => Some(token.trim()),
        _ => None,
    }
}

/// Value of the `sessionid` cookie.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: (&str, &str)) -> Parts {
        let (parts, _) = Request::builder()
            .header(header.0, header.1)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn accepts_both_token_schemes() {
        assert_eq!(bearer_token(&parts(("authorization", "JWT abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(("authorization", "Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(("authorization", "Basic abc"))), None);
    }

    #[test]
    fn finds_session_cookie_among_others() {
        let parts = parts(("cookie", "csrftoken=x; sessionid=abc123; theme=dark"));
        assert_eq!(session_cookie(&parts.headers), Some("abc123"));
    }
}
