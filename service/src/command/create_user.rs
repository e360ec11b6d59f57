//! [`Command`] for creating a new [`User`].

use common::{
    operations::{Commit, Insert, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,
}

impl<Db> Command<CreateUser> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<User>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
        } = cmd;

        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash: user::PasswordHash::new(password.expose_secret()),
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(user.clone()))
            .await
            .map_err(|e| {
                if e.as_ref()
                    .is_unique_violation(database::EMAIL_UNIQUE_CONSTRAINT)
                {
                    tracerr::new!(E::EmailOccupied(user.email.clone()))
                } else {
                    tracerr::map_from_and_wrap!(=> E)(e)
                }
            })
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`user::Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    EmailOccupied(#[error(not(source))] user::Email),
}

#[cfg(test)]
mod spec {
    use futures::executor::block_on;
    use secrecy::SecretBox;

    use crate::{
        command::tests,
        domain::user,
        infra::database::mock::{Call, Mock},
        Service,
    };

    use super::{Command as _, CreateUser, ExecutionError};

    fn command(email: &str) -> CreateUser {
        CreateUser {
            name: user::Name::new("John Doe").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: SecretBox::init_with(|| {
                user::Password::new("sup3r-secret").unwrap()
            }),
        }
    }

    #[test]
    fn persists_user_with_hashed_password() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db.clone());

        let user =
            block_on(service.execute(command("john@example.com"))).unwrap();

        let stored = db.user(user.id).unwrap();
        assert_eq!(stored.email, user.email);
        assert!(stored
            .password_hash
            .matches(&user::Password::new("sup3r-secret").unwrap()));
        assert_eq!(
            db.calls(),
            [Call::Transact, Call::InsertUser, Call::Commit],
        );
    }

    #[test]
    fn reports_occupied_email() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db);

        drop(block_on(service.execute(command("john@example.com"))).unwrap());
        let err =
            block_on(service.execute(command("john@example.com"))).unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }
}
