use bcrypt::{hash, verify};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
};

use crate::database::entities::{user_sessions, users};
use crate::errors::{CoreError, CoreResult};

const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

/// Password checks, login and server-side sessions.
#[derive(Clone)]
pub struct AuthService {
    db: DatabaseConnection,
}

impl AuthService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn hash_password(password: &str, cost: u32) -> CoreResult<String> {
        if password.is_empty() {
            return Err(CoreError::field("password", "This field may not be blank."));
        }
        if password.len() < 8 {
            return Err(CoreError::field(
                "password",
                "This password is too short. It must contain at least 8 characters.",
            ));
        }

        hash(password, cost)
            .map_err(|e| CoreError::internal("Failed to hash password").with_source(e))
    }

    pub fn verify_password(password: &str, hash: &str) -> bool {
        verify(password, hash).unwrap_or(false)
    }

    pub fn validate_email(email: &str) -> CoreResult<()> {
        let invalid = || CoreError::field("email", "Enter a valid email address.");
        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

        if local.is_empty() || domain.contains('@') || email.len() > 254 {
            return Err(invalid());
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(invalid());
        }

        Ok(())
    }

    /// Checks credentials and stamps `last_login`. Unknown users, wrong
    /// passwords and inactive accounts all fail with the same message.
    pub async fn authenticate(&self, email: &str, password: &str) -> CoreResult<users::Model> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("find user by email", e))?
            .ok_or_else(|| CoreError::field("non_field_errors", BAD_CREDENTIALS))?;

        if !user.is_active || !Self::verify_password(password, &user.password) {
            return Err(CoreError::field("non_field_errors", BAD_CREDENTIALS));
        }

        let user = user
            .into_active_model()
            .set_last_login()
            .update(&self.db)
            .await
            .map_err(|e| CoreError::db("update last login", e))?;

        Ok(user)
    }

    pub async fn create_session(&self, user_id: i32, age_secs: i64) -> CoreResult<user_sessions::Model> {
        user_sessions::ActiveModel::new(user_id, age_secs)
            .insert(&self.db)
            .await
            .map_err(|e| CoreError::db("create session", e))
    }

    pub async fn get_user_from_session(&self, session_key: &str) -> CoreResult<users::Model> {
        let session = user_sessions::Entity::find()
            .filter(user_sessions::Column::SessionKey.eq(session_key))
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("find session", e))?
            .ok_or_else(|| CoreError::unauthorized("Invalid or expired session"))?;

        if session.is_expired() {
            return Err(CoreError::unauthorized("Session expired"));
        }

        let user = users::Entity::find_by_id(session.user_id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("load session user", e))?
            .ok_or_else(|| CoreError::unauthorized("Invalid or expired session"))?;

        if !user.is_active {
            return Err(CoreError::unauthorized("User account is disabled."));
        }

        Ok(user)
    }

    pub async fn delete_session(&self, session_key: &str) -> CoreResult<()> {
        user_sessions::Entity::delete_many()
            .filter(user_sessions::Column::SessionKey.eq(session_key))
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::db("delete session", e))?;
        Ok(())
    }
}
