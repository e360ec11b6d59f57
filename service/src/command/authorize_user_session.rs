//! [`Command`] for authorizing a [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use jsonwebtoken::Validation;
use tracerr::Traced;

use crate::{
    domain::{
        user::{self, session, Session},
        User,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`User`].
///
/// Returns the authorized [`User`] in its current state, so expired
/// [`Session`]s and [`Session`]s of removed [`User`]s are both rejected.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config.jwt_decoding_key,
            &Validation::default(),
        )
        .map_err(tracerr::from_and_wrap!(=> E))?
        .claims;

        self.database()
            .execute(Select(By::new(session.user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or_else(|| E::UserNotExists(session.user_id))
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),

    /// [`User`] the [`Session`] belongs to does not exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use futures::executor::block_on;
    use secrecy::SecretBox;

    use crate::{
        command::{tests, CreateUser, CreateUserSession},
        domain::user::{self, session},
        infra::database::mock::Mock,
        Service,
    };

    use super::{AuthorizeUserSession, Command as _, ExecutionError};

    fn issued_token(service: &Service<Mock>) -> (user::Id, session::Token) {
        let user = block_on(service.execute(CreateUser {
            name: user::Name::new("John Doe").unwrap(),
            email: user::Email::new("john@example.com").unwrap(),
            password: SecretBox::init_with(|| {
                user::Password::new("sup3r-secret").unwrap()
            }),
        }))
        .unwrap();
        let out =
            block_on(service.execute(CreateUserSession::ByUserId(user.id)))
                .unwrap();
        (user.id, out.token)
    }

    #[test]
    fn authorizes_own_tokens() {
        let service = Service::new(tests::config(), Mock::default());
        let (user_id, token) = issued_token(&service);

        let user = block_on(
            service.execute(AuthorizeUserSession { token }),
        )
        .unwrap();

        assert_eq!(user.id, user_id);
    }

    #[test]
    fn rejects_tampered_token() {
        let service = Service::new(tests::config(), Mock::default());
        let (_, token) = issued_token(&service);

        let mut tampered = token.to_string();
        drop(tampered.pop());
        // SAFETY: Tampering preserves the token shape.
        #[expect(unsafe_code, reason = "invariants are preserved")]
        let tampered = unsafe { session::Token::new_unchecked(tampered) };

        let err = block_on(
            service.execute(AuthorizeUserSession { token: tampered }),
        )
        .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::JsonWebTokenDecodeError(_),
        ));
    }

    #[test]
    fn rejects_token_of_removed_user() {
        let service = Service::new(tests::config(), Mock::default());
        let (_, token) = issued_token(&service);

        // Same signing keys, but an empty storage.
        let vacated = Service::new(tests::config(), Mock::default());
        let err = block_on(
            vacated.execute(AuthorizeUserSession { token }),
        )
        .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
