//! Staff directory read model (login lookups, user management).

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

use invenhub_auth::{Role, UserEvent, UserId, UserStatus};
use invenhub_events::EventEnvelope;

use super::{Cursors, Projection, ProjectionError, decode, ensure_stream};
use crate::read_model::ReadStore;
use crate::streams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReadModel {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserReadModel {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

#[derive(Debug)]
pub struct UsersProjection<S> {
    store: S,
    cursors: Cursors,
}

impl<S> UsersProjection<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: Cursors::new(),
        }
    }

    pub fn get(&self, user_id: &UserId) -> Option<UserReadModel> {
        self.store.get(user_id)
    }

    /// Case-insensitive email lookup.
    pub fn find_by_email(&self, email: &str) -> Option<UserReadModel> {
        let email = email.trim().to_lowercase();
        self.store.list().into_iter().find(|u| u.email == email)
    }

    pub fn list(&self) -> Vec<UserReadModel> {
        let mut users = self.store.list();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        users
    }

    pub fn is_empty(&self) -> bool {
        self.store.list().is_empty()
    }

    fn update(&self, user_id: UserId, at: DateTime<Utc>, f: impl FnOnce(&mut UserReadModel)) {
        if let Some(mut rm) = self.store.get(&user_id) {
            f(&mut rm);
            rm.updated_at = at;
            self.store.upsert(user_id, rm);
        }
    }
}

impl<S> Projection for UsersProjection<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    fn name(&self) -> &'static str {
        "auth.users"
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != streams::USER || !self.cursors.admit(envelope)? {
            return Ok(());
        }

        let ev: UserEvent = decode(envelope)?;
        let user_id = match &ev {
            UserEvent::Registered(e) => e.user_id,
            UserEvent::RoleChanged(e) => e.user_id,
            UserEvent::PasswordChanged(e) => e.user_id,
            UserEvent::Deactivated(e) => e.user_id,
            UserEvent::Activated(e) => e.user_id,
        };
        ensure_stream(envelope, user_id.0)?;

        match ev {
            UserEvent::Registered(e) => {
                self.store.upsert(
                    e.user_id,
                    UserReadModel {
                        user_id: e.user_id,
                        email: e.email,
                        name: e.name,
                        role: e.role,
                        password_hash: e.password_hash,
                        status: UserStatus::Active,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            UserEvent::RoleChanged(e) => self.update(e.user_id, e.occurred_at, |u| u.role = e.role),
            UserEvent::PasswordChanged(e) => {
                self.update(e.user_id, e.occurred_at, |u| u.password_hash = e.password_hash)
            }
            UserEvent::Deactivated(e) => {
                self.update(e.user_id, e.occurred_at, |u| u.status = UserStatus::Deactivated)
            }
            UserEvent::Activated(e) => self.update(e.user_id, e.occurred_at, |u| u.status = UserStatus::Active),
        }

        self.cursors.advance(envelope);
        Ok(())
    }

    fn reset(&self) {
        self.store.clear();
        self.cursors.clear();
    }
}
