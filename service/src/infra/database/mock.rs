//! In-memory [`Database`] implementation for tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use tracerr::Traced;

use crate::{
    domain::{user, User},
    infra::{database, Database},
};

/// Operation executed by a [`Mock`] database.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Call {
    Commit,
    InsertUser,
    LockUser,
    SelectUserByEmail,
    SelectUserById,
    Transact,
    UpdateUser,
}

/// In-memory [`Database`] recording every operation it executes.
#[derive(Clone, Debug, Default)]
pub(crate) struct Mock {
    /// Stored [`User`]s.
    users: Arc<Mutex<HashMap<user::Id, User>>>,

    /// [`Call`]s executed by this [`Mock`] so far.
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Mock {
    /// Returns the stored [`User`] with the provided [`user::Id`], if any.
    pub(crate) fn user(&self, id: user::Id) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    /// Returns the [`Call`]s executed by this [`Mock`] so far.
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Records the provided [`Call`].
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Database<Transact> for Mock {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        self.record(Call::Transact);
        Ok(self.clone())
    }
}

impl Database<Commit> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.record(Call::Commit);
        Ok(())
    }
}

impl Database<Lock<By<User, user::Id>>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.record(Call::LockUser);
        Ok(())
    }
}

impl Database<Select<By<Option<User>, user::Id>>> for Mock {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.record(Call::SelectUserById);
        Ok(self.users.lock().unwrap().get(&by.into_inner()).cloned())
    }
}

impl Database<Select<By<Option<User>, user::Email>>> for Mock {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.record(Call::SelectUserByEmail);
        let email = by.into_inner();
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

impl Database<Insert<User>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.record(Call::InsertUser);
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(tracerr::new!(database::Error::UniqueViolation(
                database::EMAIL_UNIQUE_CONSTRAINT,
            )));
        }
        drop(users.insert(user.id, user));
        Ok(())
    }
}

impl Database<Update<User>> for Mock {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.record(Call::UpdateUser);
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email && u.id != user.id) {
            return Err(tracerr::new!(database::Error::UniqueViolation(
                database::EMAIL_UNIQUE_CONSTRAINT,
            )));
        }
        drop(users.insert(user.id, user));
        Ok(())
    }
}
