//! [`Command`] for updating an [`user::Password`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Password;
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating an [`user::Password`].
///
/// The current [`Password`] is verified before anything is written, so a
/// wrong `old_password` leaves the [`User`] completely untouched.
#[derive(Clone, Debug, From)]
pub struct UpdateUserPassword {
    /// ID of the [`User`] which [`Password`] should be updated.
    pub user_id: user::Id,

    /// New [`Password`] of the [`User`].
    pub new_password: user::Password,

    /// Old [`Password`] of the [`User`].
    pub old_password: user::Password,
}

impl<Db> Command<UpdateUserPassword> for Service<Db>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: UpdateUserPassword,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserPassword {
            user_id,
            new_password,
            old_password,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if !user.password_hash.matches(&old_password) {
            return Err(tracerr::new!(E::WrongPassword));
        }

        if new_password == old_password {
            return Ok(user);
        }

        user.password_hash = user::PasswordHash::new(&new_password);
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUserPassword`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// Wrong old [`Password`] provided.
    #[display("Wrong old password")]
    WrongPassword,
}

#[cfg(test)]
mod spec {
    use futures::executor::block_on;
    use secrecy::SecretBox;

    use crate::{
        command::{tests, CreateUser},
        domain::{user, User},
        infra::database::mock::{Call, Mock},
        Service,
    };

    use super::{Command as _, ExecutionError, UpdateUserPassword};

    fn registered(service: &Service<Mock>) -> User {
        block_on(service.execute(CreateUser {
            name: user::Name::new("John Doe").unwrap(),
            email: user::Email::new("john@example.com").unwrap(),
            password: SecretBox::init_with(|| {
                user::Password::new("sup3r-secret").unwrap()
            }),
        }))
        .unwrap()
    }

    #[test]
    fn rehashes_on_correct_old_password() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db.clone());
        let user = registered(&service);

        drop(
            block_on(service.execute(UpdateUserPassword {
                user_id: user.id,
                new_password: user::Password::new("n3w-secret").unwrap(),
                old_password: user::Password::new("sup3r-secret").unwrap(),
            }))
            .unwrap(),
        );

        let stored = db.user(user.id).unwrap();
        assert!(stored
            .password_hash
            .matches(&user::Password::new("n3w-secret").unwrap()));
        assert!(!stored
            .password_hash
            .matches(&user::Password::new("sup3r-secret").unwrap()));
    }

    #[test]
    fn keeps_password_on_wrong_old_one() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db.clone());
        let user = registered(&service);

        let err = block_on(service.execute(UpdateUserPassword {
            user_id: user.id,
            new_password: user::Password::new("n3w-secret").unwrap(),
            old_password: user::Password::new("not-my-secret").unwrap(),
        }))
        .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::WrongPassword));
        let stored = db.user(user.id).unwrap();
        assert_eq!(stored.password_hash, user.password_hash);
        assert!(stored
            .password_hash
            .matches(&user::Password::new("sup3r-secret").unwrap()));
        assert!(!db.calls().contains(&Call::UpdateUser));
    }

    #[test]
    fn reports_missing_user() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db);

        let err = block_on(service.execute(UpdateUserPassword {
            user_id: user::Id::new(),
            new_password: user::Password::new("n3w-secret").unwrap(),
            old_password: user::Password::new("sup3r-secret").unwrap(),
        }))
        .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
