//! Staff user aggregate (event-sourced).
//!
//! Password hashes travel in events so the user read model can be rebuilt
//! from the log; they are never exposed by the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use invenhub_core::{Aggregate, AggregateRoot, DomainError, typed_id};
use invenhub_events::Event;

use crate::Role;

typed_id!(
    /// Identifier of a staff user.
    UserId
);

// ─────────────────────────────────────────────────────────────────────────────
// User Status
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Can log in.
    #[default]
    Active,
    /// Cannot log in; existing tokens are rejected by the API.
    Deactivated,
}

// ─────────────────────────────────────────────────────────────────────────────
// User Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// Staff user.
///
/// # Invariants
/// - Email is trimmed and lowercased on registration.
/// - Deactivated users cannot change role.
/// - A user cannot demote or deactivate themselves.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub status: UserStatus,
    pub version: u64,
    pub created: bool,
}

impl User {
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            email: String::new(),
            name: String::new(),
            role: Role::Cashier,
            password_hash: String::new(),
            status: UserStatus::Active,
            version: 0,
            created: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.created && self.status == UserStatus::Active
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRole {
    pub user_id: UserId,
    pub role: Role,
    /// The user performing the change.
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePassword {
    pub user_id: UserId,
    pub password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeactivateUser {
    pub user_id: UserId,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserCommand {
    Register(RegisterUser),
    ChangeRole(ChangeRole),
    ChangePassword(ChangePassword),
    Deactivate(DeactivateUser),
    Activate(ActivateUser),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChanged {
    pub user_id: UserId,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordChanged {
    pub user_id: UserId,
    pub password_hash: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeactivated {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivated {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Registered(UserRegistered),
    RoleChanged(RoleChanged),
    PasswordChanged(PasswordChanged),
    Deactivated(UserDeactivated),
    Activated(UserActivated),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => "auth.user.registered",
            UserEvent::RoleChanged(_) => "auth.user.role_changed",
            UserEvent::PasswordChanged(_) => "auth.user.password_changed",
            UserEvent::Deactivated(_) => "auth.user.deactivated",
            UserEvent::Activated(_) => "auth.user.activated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered(e) => e.occurred_at,
            UserEvent::RoleChanged(e) => e.occurred_at,
            UserEvent::PasswordChanged(e) => e.occurred_at,
            UserEvent::Deactivated(e) => e.occurred_at,
            UserEvent::Activated(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Registered(e) => {
                self.id = e.user_id;
                self.email = e.email.clone();
                self.name = e.name.clone();
                self.role = e.role;
                self.password_hash = e.password_hash.clone();
                self.status = UserStatus::Active;
                self.created = true;
            }
            UserEvent::RoleChanged(e) => self.role = e.role,
            UserEvent::PasswordChanged(e) => self.password_hash = e.password_hash.clone(),
            UserEvent::Deactivated(_) => self.status = UserStatus::Deactivated,
            UserEvent::Activated(_) => self.status = UserStatus::Active,
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Register(cmd) => self.handle_register(cmd),
            UserCommand::ChangeRole(cmd) => self.handle_change_role(cmd),
            UserCommand::ChangePassword(cmd) => {
                self.ensure_exists()?;
                if cmd.password_hash.is_empty() {
                    return Err(DomainError::validation("password hash cannot be empty"));
                }
                Ok(vec![UserEvent::PasswordChanged(PasswordChanged {
                    user_id: cmd.user_id,
                    password_hash: cmd.password_hash.clone(),
                    occurred_at: cmd.occurred_at,
                })])
            }
            UserCommand::Deactivate(cmd) => self.handle_deactivate(cmd),
            UserCommand::Activate(cmd) => {
                self.ensure_exists()?;
                if self.status == UserStatus::Active {
                    return Err(DomainError::invariant("user already active"));
                }
                Ok(vec![UserEvent::Activated(UserActivated {
                    user_id: cmd.user_id,
                    occurred_at: cmd.occurred_at,
                })])
            }
        }
    }
}

impl User {
    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("user already exists"));
        }

        let email = cmd.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.password_hash.is_empty() {
            return Err(DomainError::validation("password hash cannot be empty"));
        }

        Ok(vec![UserEvent::Registered(UserRegistered {
            user_id: cmd.user_id,
            email,
            name: cmd.name.trim().to_string(),
            role: cmd.role,
            password_hash: cmd.password_hash.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_role(&self, cmd: &ChangeRole) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_exists()?;

        if self.status == UserStatus::Deactivated {
            return Err(DomainError::invariant("user is deactivated"));
        }
        if cmd.actor_id == self.id && self.role == Role::Admin && cmd.role != Role::Admin {
            return Err(DomainError::invariant("admins cannot demote themselves"));
        }
        if self.role == cmd.role {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::RoleChanged(RoleChanged {
            user_id: cmd.user_id,
            role: cmd.role,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_exists()?;

        if cmd.actor_id == self.id {
            return Err(DomainError::invariant("users cannot deactivate themselves"));
        }
        if self.status == UserStatus::Deactivated {
            return Err(DomainError::invariant("user already deactivated"));
        }

        Ok(vec![UserEvent::Deactivated(UserDeactivated {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use invenhub_events::execute;

    use super::*;

    fn registered(role: Role) -> User {
        let id = UserId::generate();
        let mut user = User::empty(id);
        execute(
            &mut user,
            &UserCommand::Register(RegisterUser {
                user_id: id,
                email: "  Alice@Shop.TEST ".to_string(),
                name: "Alice".to_string(),
                role,
                password_hash: "pbkdf2-sha256$1$00$00".to_string(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        user
    }

    #[test]
    fn register_normalises_email() {
        let user = registered(Role::Cashier);
        assert_eq!(user.email, "alice@shop.test");
        assert!(user.is_active());
        assert_eq!(user.version, 1);
    }

    #[test]
    fn register_rejects_invalid_email() {
        let id = UserId::generate();
        let err = User::empty(id)
            .handle(&UserCommand::Register(RegisterUser {
                user_id: id,
                email: "not-an-email".to_string(),
                name: "Bob".to_string(),
                role: Role::Cashier,
                password_hash: "x".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn duplicate_registration_conflicts() {
        let user = registered(Role::Cashier);
        let err = user
            .handle(&UserCommand::Register(RegisterUser {
                user_id: user.id,
                email: "alice@shop.test".to_string(),
                name: "Alice".to_string(),
                role: Role::Cashier,
                password_hash: "x".to_string(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn admin_cannot_demote_self() {
        let admin = registered(Role::Admin);
        let err = admin
            .handle(&UserCommand::ChangeRole(ChangeRole {
                user_id: admin.id,
                role: Role::Cashier,
                actor_id: admin.id,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn role_change_by_other_admin_applies() {
        let mut user = registered(Role::Cashier);
        let id = user.id;
        execute(
            &mut user,
            &UserCommand::ChangeRole(ChangeRole {
                user_id: id,
                role: Role::Manager,
                actor_id: UserId::generate(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert_eq!(user.role, Role::Manager);
    }

    #[test]
    fn deactivate_then_activate() {
        let mut user = registered(Role::Cashier);
        let id = user.id;
        execute(
            &mut user,
            &UserCommand::Deactivate(DeactivateUser {
                user_id: id,
                actor_id: UserId::generate(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        assert!(!user.is_active());

        let err = user
            .handle(&UserCommand::ChangeRole(ChangeRole {
                user_id: id,
                role: Role::Manager,
                actor_id: UserId::generate(),
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(err.to_string().contains("deactivated"));

        execute(
            &mut user,
            &UserCommand::Activate(ActivateUser { user_id: id, occurred_at: Utc::now() }),
        )
        .unwrap();
        assert!(user.is_active());
    }

    #[test]
    fn cannot_deactivate_self() {
        let admin = registered(Role::Admin);
        let err = admin
            .handle(&UserCommand::Deactivate(DeactivateUser {
                user_id: admin.id,
                actor_id: admin.id,
                occurred_at: Utc::now(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn commands_on_unknown_user_are_not_found() {
        let id = UserId::generate();
        let err = User::empty(id)
            .handle(&UserCommand::Activate(ActivateUser { user_id: id, occurred_at: Utc::now() }))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }
}
