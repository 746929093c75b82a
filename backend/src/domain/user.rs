//! User accounts and the credential validators used by the auth flows.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use super::entity::{
    Entity, EntityField, EntityId, FieldError, FieldKind, FieldValue, Timestamps, apply_timestamp,
};
use super::validation::{ValidationError, ValidationRule, check_length};

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$";

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(EMAIL_PATTERN)
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Columns of the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Id,
    Name,
    Email,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl EntityField for UserField {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Name,
        Self::Email,
        Self::PasswordHash,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::DeletedAt,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::PasswordHash => "password",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Id => FieldKind::Integer,
            Self::Name | Self::Email | Self::PasswordHash => FieldKind::Text,
            Self::CreatedAt | Self::UpdatedAt | Self::DeletedAt => FieldKind::Timestamp,
        }
    }

    fn nullable(self) -> bool {
        self == Self::DeletedAt
    }

    fn readable(self) -> bool {
        self != Self::PasswordHash
    }
}

/// Check the email against the accepted address syntax and length.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    check_length("email", email, 5, 255)?;
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::new("email", ValidationRule::EmailSyntax))
    }
}

/// Check the plaintext password length.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    check_length("password", password, 6, 50)
}

/// Check the display name length.
pub fn validate_user_name(name: &str) -> Result<(), ValidationError> {
    check_length("name", name, 3, 200)
}

/// A registration request carrying the plaintext password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_user_name(&self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

/// Draft for a new user with an already hashed password.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// A stored user account.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    id: EntityId,
    name: String,
    email: String,
    #[serde(skip)]
    password_hash: String,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("timestamps", &self.timestamps)
            .finish_non_exhaustive()
    }
}

impl User {
    pub fn restore(id: EntityId, draft: NewUser, timestamps: Timestamps) -> Self {
        Self {
            id,
            name: draft.name,
            email: draft.email,
            password_hash: draft.password_hash,
            timestamps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

impl Entity for User {
    type Field = UserField;
    type New = NewUser;

    const LABEL: &'static str = "user";
    const TABLE: &'static str = "users";
    const ID: UserField = UserField::Id;
    const CREATED_AT: UserField = UserField::CreatedAt;
    const UPDATED_AT: UserField = UserField::UpdatedAt;
    const DELETED_AT: UserField = UserField::DeletedAt;

    fn id(&self) -> EntityId {
        self.id
    }

    fn timestamps(&self) -> Timestamps {
        self.timestamps
    }

    fn value(&self, field: UserField) -> FieldValue {
        match field {
            UserField::Id => self.id.into(),
            UserField::Name => self.name.clone().into(),
            UserField::Email => self.email.clone().into(),
            UserField::PasswordHash => self.password_hash.clone().into(),
            UserField::CreatedAt => self.timestamps.created_at.into(),
            UserField::UpdatedAt => self.timestamps.updated_at.into(),
            UserField::DeletedAt => self.timestamps.deleted_at.into(),
        }
    }

    fn apply(&mut self, field: UserField, value: FieldValue) -> Result<(), FieldError> {
        let target = match field {
            UserField::Name => &mut self.name,
            UserField::Email => &mut self.email,
            UserField::PasswordHash => &mut self.password_hash,
            UserField::Id | UserField::CreatedAt | UserField::UpdatedAt | UserField::DeletedAt => {
                return apply_timestamp(
                    &mut self.timestamps,
                    field,
                    UserField::UpdatedAt,
                    UserField::DeletedAt,
                    value,
                );
            }
        };
        match value {
            FieldValue::Text(text) => {
                *target = text;
                Ok(())
            }
            _ => Err(FieldError::TypeMismatch {
                field: field.name(),
                expected: FieldKind::Text,
            }),
        }
    }

    fn insert_values(new: &NewUser, now: DateTime<Utc>) -> Vec<(UserField, FieldValue)> {
        vec![
            (UserField::Name, new.name.clone().into()),
            (UserField::Email, new.email.clone().into()),
            (UserField::PasswordHash, new.password_hash.clone().into()),
            (UserField::CreatedAt, now.into()),
            (UserField::UpdatedAt, now.into()),
        ]
    }

    fn materialise(id: EntityId, new: NewUser, now: DateTime<Utc>) -> Self {
        Self::restore(id, new, Timestamps::created(now))
    }

    fn unique_fields() -> &'static [UserField] {
        &[UserField::Email]
    }
}
