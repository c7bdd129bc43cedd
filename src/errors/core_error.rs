use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use serde_json::json;

use super::db::{format_db_error, DbErrorKind};

/// Per-field validation messages, rendered as `{field: [messages]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoreErrorKind {
    NotFound,
    Validation,
    Conflict,
    Forbidden,
    Unauthorized,
    Throttled,
    Unavailable,
    Internal,
}

impl CoreErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation | Self::Conflict => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Throttled => StatusCode::TOO_MANY_REQUESTS,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
pub struct CoreError {
    kind: CoreErrorKind,
    message: String,
    fields: Option<FieldErrors>,
    retry_after: Option<u64>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: None,
            retry_after: None,
            source: None,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::new(
            CoreErrorKind::NotFound,
            format!("{} {} not found", entity.into(), id),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Validation, message)
    }

    /// A validation failure carrying a single field message.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.into(), vec![message.into()]);
        Self::validation("Invalid input").with_fields(fields)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Forbidden, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unauthorized, message)
    }

    pub fn throttled(wait_secs: u64) -> Self {
        let mut err = Self::new(
            CoreErrorKind::Throttled,
            format!(
                "The maximum number of failed login attempts has been reached. \
                 Try again in {} seconds or ask for a new password",
                wait_secs
            ),
        );
        err.retry_after = Some(wait_secs);
        err
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CoreErrorKind::Internal, message)
    }

    /// Wraps a database error, keeping the categorized kind.
    pub fn db(operation: &str, err: DbErr) -> Self {
        let (db_kind, message) = format_db_error(operation, &err);
        let kind = match db_kind {
            DbErrorKind::NotFound => CoreErrorKind::NotFound,
            DbErrorKind::UniqueViolation => CoreErrorKind::Conflict,
            DbErrorKind::ForeignKeyViolation => CoreErrorKind::Validation,
            DbErrorKind::ConnectionError => CoreErrorKind::Unavailable,
            DbErrorKind::Unknown => CoreErrorKind::Internal,
        };
        Self::new(kind, message).with_source(err)
    }

    pub fn with_fields(mut self, fields: FieldErrors) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> CoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> Option<&FieldErrors> {
        self.fields.as_ref()
    }

    pub fn retry_after(&self) -> Option<u64> {
        self.retry_after
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl StdError for CoreError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<DbErr> for CoreError {
    fn from(err: DbErr) -> Self {
        CoreError::db("database", err)
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let body = match (&self.kind, &self.fields) {
            (CoreErrorKind::Validation, Some(fields)) => json!(fields),
            (CoreErrorKind::Throttled, _) => json!({ "message": self.message }),
            (CoreErrorKind::Internal, _) => {
                tracing::error!(error = ?self.source, "{}", self.message);
                json!({ "detail": "Internal server error" })
            }
            _ => json!({ "detail": self.message }),
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(CoreErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(CoreErrorKind::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            CoreErrorKind::Unavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            CoreErrorKind::Throttled.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn throttled_carries_wait_and_message() {
        let err = CoreError::throttled(42);
        assert_eq!(err.retry_after(), Some(42));
        assert!(err.message().contains("Try again in 42 seconds"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn field_errors_are_collected() {
        let err = CoreError::field("canopy_status", "This field is required.");
        assert_eq!(err.kind(), CoreErrorKind::Validation);
        let fields = err.fields().unwrap();
        assert_eq!(fields["canopy_status"], vec!["This field is required."]);
    }

    #[test]
    fn db_errors_keep_their_source() {
        let err = CoreError::db("insert country", DbErr::Custom("boom".into()));
        assert_eq!(err.kind(), CoreErrorKind::Internal);
        assert!(StdError::source(&err).is_some());
        assert!(err.message().starts_with("insert country"));
    }

    #[test]
    fn record_not_found_maps_to_404() {
        let err = CoreError::db("find aoi", DbErr::RecordNotFound("aoi".into()));
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }
}
