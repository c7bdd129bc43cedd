use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::auth::{session_cookie, SESSION_COOKIE};
use crate::errors::CoreError;
use crate::serializers::{CredentialsRequest, TokenRequest, TokenResponse, UserRead};
use crate::server::app::AppState;
use crate::server::middleware::ValidatedJson;
use crate::services::{AuthService, UserService};

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone())
}

#[utoipa::path(
    post,
    path = "/api/token",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "JWT issued", body = TokenResponse),
        (status = 400, description = "Unable to log in with provided credentials")
    )
)]
pub async fn obtain_token(
    State(state): State<AppState>,
    ValidatedJson((email, password)): ValidatedJson<CredentialsRequest>,
) -> Result<Json<TokenResponse>, CoreError> {
    let user = auth_service(&state).authenticate(&email, &password).await?;
    let token = state.jwt.issue(&user)?;
    tracing::debug!("issued token for user {}", user.id);
    Ok(Json(TokenResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/token/refresh",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token with a fresh expiry", body = TokenResponse),
        (status = 400, description = "Token expired, invalid or past the refresh window")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(token): ValidatedJson<TokenRequest>,
) -> Result<Json<TokenResponse>, CoreError> {
    let token = state.jwt.refresh(&token)?;
    Ok(Json(TokenResponse { token }))
}

/// Session login for browser clients. Sets the `sessionid` cookie.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Logged in", body = UserRead),
        (status = 400, description = "Unable to log in with provided credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson((email, password)): ValidatedJson<CredentialsRequest>,
) -> Result<impl IntoResponse, CoreError> {
    let auth = auth_service(&state);
    let user = auth.authenticate(&email, &password).await?;
    let age = state.settings.session_age_secs;
    let session = auth.create_session(user.id, age).await?;
    tracing::info!("session login for user {} ({})", user.id, user.username);

    let cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, session.session_key, age
    );
    let profile = UserService::new(state.db.clone(), state.settings.bcrypt_cost)
        .profile(user)
        .await?;
    Ok(([(SET_COOKIE, cookie)], Json(profile)))
}

#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session deleted"),
        (status = 401, description = "No session cookie")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, CoreError> {
    let session_key = session_cookie(&headers)
        .ok_or_else(|| CoreError::unauthorized("Authentication credentials were not provided."))?;
    auth_service(&state).delete_session(session_key).await?;

    let cleared = format!("{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax", SESSION_COOKIE);
    Ok((
        [(SET_COOKIE, cleared)],
        Json(json!({"detail": "Successfully logged out."})),
    ))
}
