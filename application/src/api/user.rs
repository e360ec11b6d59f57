//! [`User`]-related definitions.

use serde::Serialize;
use service::domain;

/// A `User` of the system, as rendered in API responses.
#[derive(Clone, Debug, Serialize)]
pub struct User {
    /// Unique identifier of this `User`.
    pub id: domain::user::Id,

    /// Name of this `User`.
    pub name: String,

    /// Email of this `User`.
    pub email: String,

    /// [RFC 3339] date and time when this `User` was created.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    pub created_at: String,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        let domain::User {
            id,
            name,
            email,
            password_hash: _,
            created_at,
        } = user;
        Self {
            id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: created_at.to_rfc3339(),
        }
    }
}
