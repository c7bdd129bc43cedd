use axum::{extract::State, response::Json};

use crate::auth::CurrentUser;
use crate::errors::CoreError;
use crate::serializers::UserRead;
use crate::server::app::AppState;
use crate::services::UserService;

#[utoipa::path(
    get,
    path = "/api/user",
    responses(
        (status = 200, description = "Profile of the authenticated user", body = UserRead),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn current_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserRead>, CoreError> {
    let profile = UserService::new(state.db.clone(), state.settings.bcrypt_cost)
        .profile(user)
        .await?;
    Ok(Json(profile))
}
