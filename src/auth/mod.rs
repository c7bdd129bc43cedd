pub mod extractor;
pub mod jwt;

pub use extractor::{resolve_user, session_cookie, CurrentUser, StaffUser, SESSION_COOKIE};
pub use jwt::{Claims, JwtCodec, TokenError};

use crate::database::entities::users;

/// The authenticated caller a service call is made on behalf of.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Actor {
    pub user_id: i32,
}

impl From<&users::Model> for Actor {
    fn from(user: &users::Model) -> Self {
        Self { user_id: user.id }
    }
}
