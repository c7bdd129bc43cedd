//! Database error categorization and message formatting.

use sea_orm::DbErr;

/// Categories of database errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Query returned no results
    NotFound,
    UniqueViolation,
    /// Invalid reference, usually a bad foreign key id in the payload
    ForeignKeyViolation,
    ConnectionError,
    Unknown,
}

impl DbErrorKind {
    pub fn from_db_err(err: &DbErr) -> Self {
        match err {
            DbErr::RecordNotFound(_) => Self::NotFound,
            DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => Self::ConnectionError,
            DbErr::Exec(_) | DbErr::Query(_) | DbErr::RecordNotInserted => {
                let msg = err.to_string().to_lowercase();
                if msg.contains("unique") || msg.contains("duplicate") {
                    Self::UniqueViolation
                } else if msg.contains("foreign key") || msg.contains("fk_") {
                    Self::ForeignKeyViolation
                } else {
                    Self::Unknown
                }
            }
            _ => Self::Unknown,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::UniqueViolation | Self::ForeignKeyViolation
        )
    }
}

/// Categorizes `err` and prefixes the message with the failed operation.
pub fn format_db_error(operation: &str, err: &DbErr) -> (DbErrorKind, String) {
    let kind = DbErrorKind::from_db_err(err);

    let message = match kind {
        DbErrorKind::NotFound => format!("{}: record not found", operation),
        DbErrorKind::UniqueViolation => format!("{}: duplicate key violation", operation),
        DbErrorKind::ForeignKeyViolation => {
            format!("{}: foreign key constraint violation", operation)
        }
        DbErrorKind::ConnectionError => format!("{}: database connection failed", operation),
        DbErrorKind::Unknown => format!("{}: database error - {}", operation, err),
    };

    (kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorizes_record_not_found() {
        let err = DbErr::RecordNotFound("User not found".to_string());
        assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::NotFound);
        assert!(DbErrorKind::NotFound.is_client_error());
    }

    #[test]
    fn formats_with_operation_context() {
        let err = DbErr::RecordNotFound("gone".to_string());
        let (kind, message) = format_db_error("find aoi", &err);
        assert_eq!(kind, DbErrorKind::NotFound);
        assert_eq!(message, "find aoi: record not found");
    }

    #[test]
    fn custom_errors_are_unknown() {
        let err = DbErr::Custom("boom".to_string());
        let (kind, message) = format_db_error("export", &err);
        assert_eq!(kind, DbErrorKind::Unknown);
        assert!(message.starts_with("export: database error"));
    }
}
