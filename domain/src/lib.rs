//! Domain library for the user administration service.
//!
//! Holds the entity types (profiles and users), the ports (traits) the stores
//! are built on, and the error definitions. Keep HTTP and other IO concerns out
//! of this crate.

use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Opaque identifier of a profile.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.trim().is_empty() {
            return Err(CoreError::Invalid("profileId must not be empty".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProfileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a user.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.trim().is_empty() {
            return Err(CoreError::Invalid("user id must not be empty".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named role that users are attached to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
}

/// A person record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub profile_id: ProfileId,
}

/// Input data for creating a profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewProfile {
    pub name: String,
}

/// Partial update of a profile. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
}

/// Input data for creating a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub profile_id: ProfileId,
}

impl NewUser {
    fn into_user(self, id: UserId) -> User {
        User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            is_active: self.is_active,
            profile_id: self.profile_id,
        }
    }
}

/// Partial update of a user. Every field is optional; only the provided ones
/// overwrite the stored record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub profile_id: Option<ProfileId>,
}

impl UserPatch {
    /// Merge the provided fields onto `user`.
    pub fn apply_to(&self, user: &mut User) {
        let Self {
            first_name,
            last_name,
            email,
            is_active,
            profile_id,
        } = self;
        if let Some(v) = first_name {
            user.first_name.clone_from(v);
        }
        if let Some(v) = last_name {
            user.last_name.clone_from(v);
        }
        if let Some(v) = email {
            user.email.clone_from(v);
        }
        if let Some(v) = is_active {
            user.is_active = *v;
        }
        if let Some(v) = profile_id {
            user.profile_id = v.clone();
        }
    }
}

/// Key used by the uniqueness indexes (profile names, user emails).
pub fn unique_key(s: &str) -> String {
    s.to_lowercase()
}

/// Source of fresh record identifiers.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Repository port for profiles.
///
/// Implementations enforce name uniqueness (see [`unique_key`]) atomically
/// with the mutation that could violate it.
pub trait ProfileRepository: Send + Sync {
    /// All profiles in insertion order.
    fn list(&self) -> Result<Vec<Profile>, CoreError>;
    fn get(&self, id: &ProfileId) -> Result<Option<Profile>, CoreError>;
    /// Fails with `Conflict` if the id or the name is already taken.
    fn insert(&self, profile: Profile) -> Result<(), CoreError>;
    /// Fails with `NotFound`, then `Conflict` if another profile owns `name`.
    fn rename(&self, id: &ProfileId, name: &str) -> Result<Profile, CoreError>;
    fn delete(&self, id: &ProfileId) -> Result<(), CoreError>;
}

/// Repository port for users.
///
/// Implementations enforce email uniqueness (see [`unique_key`]) atomically
/// with the mutation that could violate it.
pub trait UserRepository: Send + Sync {
    /// All users in insertion order.
    fn list(&self) -> Result<Vec<User>, CoreError>;
    fn get(&self, id: &UserId) -> Result<Option<User>, CoreError>;
    fn list_by_profile(&self, profile_id: &ProfileId) -> Result<Vec<User>, CoreError>;
    /// Fails with `Conflict` if the id or the email is already taken.
    fn insert(&self, user: User) -> Result<(), CoreError>;
    /// Fails with `NotFound`, then `Conflict` if another user owns the patched email.
    fn apply_patch(&self, id: &UserId, patch: &UserPatch) -> Result<User, CoreError>;
    /// Flip `is_active` and return the updated record.
    fn toggle_active(&self, id: &UserId) -> Result<User, CoreError>;
    fn delete(&self, id: &UserId) -> Result<(), CoreError>;
}

/// Read-only profile lookup used by the user store for referential checks.
pub trait ProfileDirectory: Send + Sync {
    fn find_one(&self, id: &ProfileId) -> Result<Profile, CoreError>;
}

impl<T: ProfileDirectory + ?Sized> ProfileDirectory for std::sync::Arc<T> {
    fn find_one(&self, id: &ProfileId) -> Result<Profile, CoreError> {
        (**self).find_one(id)
    }
}

/// Kind of record an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entity {
    Profile,
    User,
}

impl Entity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Profile => "Profile",
            Entity::User => "User",
        }
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core domain errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: Entity, id: String },
    #[error("{entity} with {field} \"{value}\" already exists")]
    Conflict {
        entity: Entity,
        field: &'static str,
        value: String,
    },
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl CoreError {
    pub fn profile_not_found(id: &ProfileId) -> Self {
        CoreError::NotFound {
            entity: Entity::Profile,
            id: id.as_str().to_string(),
        }
    }

    pub fn user_not_found(id: &UserId) -> Self {
        CoreError::NotFound {
            entity: Entity::User,
            id: id.as_str().to_string(),
        }
    }

    pub fn conflict(entity: Entity, field: &'static str, value: &str) -> Self {
        CoreError::Conflict {
            entity,
            field,
            value: value.to_string(),
        }
    }
}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{}", pkg, ver)
}

pub mod adapters;
pub mod ids;
pub mod seed;
pub mod service;
pub mod validate;

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_user() -> User {
        User {
            id: UserId::new("u1").unwrap(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "john@example.com".into(),
            is_active: true,
            profile_id: ProfileId::new("1").unwrap(),
        }
    }

    #[test]
    fn ids_reject_blank_values() {
        assert!(ProfileId::new("1").is_ok());
        assert!(matches!(ProfileId::new(""), Err(CoreError::Invalid(_))));
        assert!(matches!(UserId::new("   "), Err(CoreError::Invalid(_))));
    }

    #[test]
    fn patch_only_overwrites_provided_fields() {
        let mut user = mk_user();
        let patch = UserPatch {
            last_name: Some("Smith".into()),
            is_active: Some(false),
            ..Default::default()
        };
        patch.apply_to(&mut user);
        assert_eq!(user.first_name, "John");
        assert_eq!(user.last_name, "Smith");
        assert_eq!(user.email, "john@example.com");
        assert!(!user.is_active);
        assert_eq!(user.profile_id.as_str(), "1");
    }

    #[test]
    fn user_serializes_camel_case() {
        let v = serde_json::to_value(mk_user()).unwrap();
        assert_eq!(v["firstName"], "John");
        assert_eq!(v["isActive"], true);
        assert_eq!(v["profileId"], "1");
        assert_eq!(v["id"], "u1");
    }

    #[test]
    fn error_messages_name_the_record() {
        let err = CoreError::profile_not_found(&ProfileId::new("9").unwrap());
        assert_eq!(err.to_string(), "Profile with ID 9 not found");
        let err = CoreError::conflict(Entity::User, "email", "a@b.com");
        assert_eq!(err.to_string(), "User with email \"a@b.com\" already exists");
    }
}
