//! [`Command`] definition.

pub mod authorize_user_session;
pub mod create_user;
pub mod create_user_session;
pub mod update_user_details;
pub mod update_user_password;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession, create_user::CreateUser,
    create_user_session::CreateUserSession,
    update_user_details::UpdateUserDetails,
    update_user_password::UpdateUserPassword,
};

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use jsonwebtoken::{DecodingKey, EncodingKey};

    use crate::Config;

    /// Returns a [`Config`] suitable for [`Command`] testing.
    ///
    /// [`Command`]: super::Command
    pub(crate) fn config() -> Config {
        Config {
            jwt_encoding_key: EncodingKey::from_secret(b"test-secret"),
            jwt_decoding_key: DecodingKey::from_secret(b"test-secret"),
            session_expiration: Duration::from_secs(30 * 60),
        }
    }
}
