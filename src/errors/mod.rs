pub mod core_error;
pub mod db;

pub use core_error::{CoreError, CoreErrorKind, FieldErrors};
pub use db::{format_db_error, DbErrorKind};

pub type CoreResult<T> = Result<T, CoreError>;
