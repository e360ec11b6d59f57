//! [`Command`] for updating a [`User`]'s profile details.

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name};
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`User`]'s profile details.
#[derive(Clone, Debug, From)]
pub struct UpdateUserDetails {
    /// ID of the [`User`] which details should be updated.
    pub user_id: user::Id,

    /// New [`Name`] of the [`User`].
    ///
    /// [`None`] leaves the current [`Name`] untouched.
    pub name: Option<user::Name>,

    /// New [`Email`] address of the [`User`].
    ///
    /// [`None`] leaves the current [`Email`] untouched.
    pub email: Option<user::Email>,
}

impl<Db> Command<UpdateUserDetails> for Service<Db>
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
        cmd: UpdateUserDetails,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserDetails {
            user_id,
            name,
            email,
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
        if name.as_ref().map_or(true, |n| *n == user.name)
            && email.as_ref().map_or(true, |e| *e == user.email)
        {
            return Ok(user);
        }

        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        tx.execute(Update(user.clone())).await.map_err(|e| {
            if e.as_ref().is_unique_violation(database::EMAIL_UNIQUE_CONSTRAINT)
            {
                tracerr::new!(E::EmailOccupied(user.email.clone()))
            } else {
                tracerr::map_from_and_wrap!(=> E)(e)
            }
        })?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`UpdateUserDetails`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Provided [`Email`] is occupied by another [`User`] already.
    #[display("`Email` is occupied already: {_0}")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
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

    use super::{Command as _, ExecutionError, UpdateUserDetails};

    fn registered(service: &Service<Mock>, email: &str) -> User {
        block_on(service.execute(CreateUser {
            name: user::Name::new("John Doe").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: SecretBox::init_with(|| {
                user::Password::new("sup3r-secret").unwrap()
            }),
        }))
        .unwrap()
    }

    #[test]
    fn updates_provided_fields_only() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db.clone());
        let user = registered(&service, "john@example.com");

        let updated = block_on(service.execute(UpdateUserDetails {
            user_id: user.id,
            name: Some(user::Name::new("John Smith").unwrap()),
            email: None,
        }))
        .unwrap();

        assert_eq!(updated.name, user::Name::new("John Smith").unwrap());
        assert_eq!(updated.email, user.email);
        let stored = db.user(user.id).unwrap();
        assert_eq!(stored.name, updated.name);
        assert_eq!(stored.email, user.email);
    }

    #[test]
    fn skips_update_when_nothing_changes() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db.clone());
        let user = registered(&service, "john@example.com");

        drop(
            block_on(service.execute(UpdateUserDetails {
                user_id: user.id,
                name: None,
                email: Some(user.email.clone()),
            }))
            .unwrap(),
        );

        assert!(!db.calls().contains(&Call::UpdateUser));
    }

    #[test]
    fn reports_occupied_email() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db);
        let user = registered(&service, "john@example.com");
        drop(registered(&service, "jane@example.com"));

        let err = block_on(service.execute(UpdateUserDetails {
            user_id: user.id,
            name: None,
            email: Some(user::Email::new("jane@example.com").unwrap()),
        }))
        .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }

    #[test]
    fn reports_missing_user() {
        let db = Mock::default();
        let service = Service::new(tests::config(), db);

        let err = block_on(service.execute(UpdateUserDetails {
            user_id: user::Id::new(),
            name: Some(user::Name::new("John Smith").unwrap()),
            email: None,
        }))
        .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
