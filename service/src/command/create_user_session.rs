//! [`Command`] for creating a [`Session`].

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{session::Token, Email, Password};
use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a [`Session`].
#[derive(Clone, Debug, From)]
pub enum CreateUserSession {
    /// Create a new [`Session`] by [`User`] credentials.
    ///
    /// Both credentials are optional here, so their absence is reported as a
    /// [`ExecutionError::MissingCredentials`] without touching the
    /// [`Database`] at all.
    ByCredentials {
        /// [`Email`] of a [`User`].
        email: Option<user::Email>,

        /// [`Password`] of a [`User`].
        password: Option<SecretBox<user::Password>>,
    },

    /// Create a new [`Session`] by [`User`] ID.
    ByUserId(user::Id),
}

/// Output of [`CreateUserSession`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// [`Token`] of the created [`Session`].
    pub token: session::Token,

    /// [`User`] whose [`Session`] has been created.
    pub user: User,

    /// [`DateTime`] when the [`Session`] expires.
    pub expires_at: session::ExpirationDateTime,
}

impl<Db> Command<CreateUserSession> for Service<Db>
where
    Db: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use CreateUserSession as Cmd;
        use ExecutionError as E;

        let user = match cmd {
            Cmd::ByCredentials { email, password } => {
                let (Some(email), Some(password)) = (email, password) else {
                    return Err(tracerr::new!(E::MissingCredentials));
                };

                // TODO: Execute in constant time to avoid timing attacks.
                let user = self
                    .database()
                    .execute(Select(By::new(email)))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or_else(|| E::WrongCredentials)
                    .map_err(tracerr::wrap!())?;

                if !user.password_hash.matches(password.expose_secret()) {
                    return Err(tracerr::new!(E::WrongCredentials));
                }

                user
            }
            Cmd::ByUserId(user_id) => self
                .database()
                .execute(Select(By::new(user_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or_else(|| E::UserNotExists(user_id))
                .map_err(tracerr::wrap!())?,
        };

        let expires_at =
            (DateTime::now() + self.config.session_expiration).coerce();
        let token = jsonwebtoken::encode::<Session>(
            &jsonwebtoken::Header::default(),
            &Session {
                user_id: user.id,
                expires_at,
            },
            &self.config.jwt_encoding_key,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        // SAFETY: `jsonwebtoken::encode` always returns a valid
        //         `session::Token`.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let token = unsafe { session::Token::new_unchecked(token) };

        Ok(Output {
            token,
            user,
            expires_at,
        })
    }
}

/// Error of [`CreateUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] encoding error.
    #[display("Failed to encode a JSON Web Token: {_0}")]
    JsonWebTokenEncodeError(jsonwebtoken::errors::Error),

    /// [`CreateUserSession::ByCredentials`] lacks an [`Email`] or a
    /// [`Password`].
    #[display("Missing `User` credentials")]
    MissingCredentials,

    /// [`User`] with the provided ID does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// [`CreateUserSession::ByCredentials`] contains wrong credentials.
    #[display("Wrong `User` credentials")]
    WrongCredentials,
}

#[cfg(test)]
mod spec {
    use futures::executor::block_on;
    use secrecy::SecretBox;

    use crate::{
        command::{tests, AuthorizeUserSession, CreateUser},
        domain::user,
        infra::database::mock::Mock,
        Service,
    };

    use super::{Command as _, CreateUserSession, ExecutionError};

    fn registered(service: &Service<Mock>, email: &str, password: &str) {
        drop(
            block_on(service.execute(CreateUser {
                name: user::Name::new("John Doe").unwrap(),
                email: user::Email::new(email).unwrap(),
                password: SecretBox::init_with(|| {
                    user::Password::new(password).unwrap()
                }),
            }))
            .unwrap(),
        );
    }

    fn by_credentials(
        email: Option<&str>,
        password: Option<&str>,
    ) -> CreateUserSession {
        CreateUserSession::ByCredentials {
            email: email.map(|e| user::Email::new(e).unwrap()),
            password: password.map(|p| {
                SecretBox::init_with(|| user::Password::new(p).unwrap())
            }),
        }
    }

    #[test]
    fn issues_token_for_valid_credentials() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db);
        registered(&service, "john@example.com", "sup3r-secret");

        let out = block_on(service.execute(by_credentials(
            Some("john@example.com"),
            Some("sup3r-secret"),
        )))
        .unwrap();

        assert_eq!(
            out.user.email,
            user::Email::new("john@example.com").unwrap(),
        );
        let authorized = block_on(service.execute(AuthorizeUserSession {
            token: out.token,
        }))
        .unwrap();
        assert_eq!(authorized.id, out.user.id);
    }

    #[test]
    fn requires_both_credentials_before_any_lookup() {
        for (email, password) in [
            (None, None),
            (Some("john@example.com"), None),
            (None, Some("sup3r-secret")),
        ] {
            let db = Mock::default();
            let service = Service::new(tests::config(), db.clone());

            let err =
                block_on(service.execute(by_credentials(email, password)))
                    .unwrap_err();

            assert!(matches!(
                err.as_ref(),
                ExecutionError::MissingCredentials,
            ));
            assert!(db.calls().is_empty());
        }
    }

    #[test]
    fn rejects_unknown_email_and_wrong_password_identically() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db);
        registered(&service, "john@example.com", "sup3r-secret");

        let unknown_email = block_on(service.execute(by_credentials(
            Some("jane@example.com"),
            Some("sup3r-secret"),
        )))
        .unwrap_err();
        let wrong_password = block_on(service.execute(by_credentials(
            Some("john@example.com"),
            Some("not-my-password"),
        )))
        .unwrap_err();

        assert!(matches!(
            unknown_email.as_ref(),
            ExecutionError::WrongCredentials,
        ));
        assert!(matches!(
            wrong_password.as_ref(),
            ExecutionError::WrongCredentials,
        ));
        assert_eq!(
            unknown_email.as_ref().to_string(),
            wrong_password.as_ref().to_string(),
        );
    }
}
