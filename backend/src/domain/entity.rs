//! Entity model shared by every persisted record type.
//!
//! Field access by name goes through a descriptor table per entity: each
//! entity declares an [`EntityField`] enum listing its columns, and the
//! [`Entity`] trait exposes a typed accessor ([`Entity::value`]) and mutator
//! ([`Entity::apply`]) over that enum. Callers that work with field names
//! (filters, projections, patches) resolve them through
//! [`EntityField::parse`] first, so an unknown name is rejected before any
//! storage is touched.

use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Store-assigned identifier. Always positive and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EntityId(i64);

/// Raised when an identifier is zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("identifier must be a positive integer, got {0}")]
pub struct InvalidEntityId(pub i64);

impl EntityId {
    /// Validate a raw identifier.
    pub fn new(raw: i64) -> Result<Self, InvalidEntityId> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(InvalidEntityId(raw))
        }
    }

    /// Raw integer value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for EntityId {
    type Error = InvalidEntityId;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EntityId> for i64 {
    fn from(value: EntityId) -> Self {
        value.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
    Timestamp,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
        };
        f.write_str(label)
    }
}

/// A dynamically typed column value.
///
/// Serialises untagged: `Null` as JSON `null`, timestamps as RFC 3339.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Whether this is SQL `NULL`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Convert the value to `kind`, returning `None` when it cannot be
    /// represented without loss. `Null` coerces to every kind.
    #[must_use]
    pub fn coerce(self, kind: FieldKind) -> Option<Self> {
        match (self, kind) {
            (Self::Null, _) => Some(Self::Null),
            (value @ Self::Integer(_), FieldKind::Integer)
            | (value @ Self::Float(_), FieldKind::Float)
            | (value @ Self::Text(_), FieldKind::Text)
            | (value @ Self::Timestamp(_), FieldKind::Timestamp) => Some(value),
            (Self::Integer(raw), FieldKind::Float) => Some(Self::Float(raw as f64)),
            (Self::Float(raw), FieldKind::Integer) => {
                let truncated = raw.trunc();
                let in_range = truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64;
                (truncated == raw && in_range).then(|| Self::Integer(truncated as i64))
            }
            (Self::Text(raw), FieldKind::Timestamp) => DateTime::parse_from_rfc3339(&raw)
                .ok()
                .map(|parsed| Self::Timestamp(parsed.with_timezone(&Utc))),
            _ => None,
        }
    }

    /// Order two values of compatible kinds. `Null` and mismatched kinds are
    /// unordered.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(left), Self::Integer(right)) => Some(left.cmp(right)),
            (Self::Float(left), Self::Float(right)) => left.partial_cmp(right),
            (Self::Integer(left), Self::Float(right)) => (*left as f64).partial_cmp(right),
            (Self::Float(left), Self::Integer(right)) => left.partial_cmp(&(*right as f64)),
            (Self::Text(left), Self::Text(right)) => Some(left.cmp(right)),
            (Self::Timestamp(left), Self::Timestamp(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    /// Text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Timestamp content, if this is a timestamp value.
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<EntityId> for FieldValue {
    fn from(value: EntityId) -> Self {
        Self::Integer(value.get())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Descriptor for one column of an entity.
pub trait EntityField: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Every column, in storage order.
    const ALL: &'static [Self];

    /// Column name.
    fn name(self) -> &'static str;

    /// Storage type.
    fn kind(self) -> FieldKind;

    /// Whether the column accepts `NULL`.
    fn nullable(self) -> bool {
        false
    }

    /// Whether the column may be projected into responses. Secrets such as
    /// password hashes return `false`.
    fn readable(self) -> bool {
        true
    }

    /// Resolve a column by name.
    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }

    /// Columns that may be projected.
    fn readable_fields() -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|field| field.readable())
            .collect()
    }
}

/// Raised when a mutator receives a value it cannot store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("field `{field}` expects a {expected} value")]
    TypeMismatch {
        field: &'static str,
        expected: FieldKind,
    },
    #[error("field `{field}` cannot be changed")]
    Immutable { field: &'static str },
}

/// Lifecycle timestamps carried by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Timestamps {
    /// Timestamps for a record created at `now`.
    #[must_use]
    pub fn created(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether the record has been soft-deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A persisted record type.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Column descriptor enum.
    type Field: EntityField;
    /// Validated draft used to create a record.
    type New: Clone + fmt::Debug + Send + Sync + 'static;

    /// Singular label used in messages, e.g. `product`.
    const LABEL: &'static str;
    /// Storage table.
    const TABLE: &'static str;
    const ID: Self::Field;
    const CREATED_AT: Self::Field;
    const UPDATED_AT: Self::Field;
    const DELETED_AT: Self::Field;

    /// Identifier.
    fn id(&self) -> EntityId;

    /// Lifecycle timestamps.
    fn timestamps(&self) -> Timestamps;

    /// Read one column.
    fn value(&self, field: Self::Field) -> FieldValue;

    /// Write one column. The identifier and `created_at` are immutable.
    fn apply(&mut self, field: Self::Field, value: FieldValue) -> Result<(), FieldError>;

    /// Columns written on insert, excluding the identifier.
    fn insert_values(new: &Self::New, now: DateTime<Utc>) -> Vec<(Self::Field, FieldValue)>;

    /// Build the stored record for a draft assigned `id` at `now`.
    fn materialise(id: EntityId, new: Self::New, now: DateTime<Utc>) -> Self;

    /// Columns whose values must be unique across the table.
    fn unique_fields() -> &'static [Self::Field] {
        &[]
    }
}

/// Shared mutator for lifecycle columns, used by entity `apply` impls.
pub(crate) fn apply_timestamp<F: EntityField>(
    timestamps: &mut Timestamps,
    field: F,
    updated_at: F,
    deleted_at: F,
    value: FieldValue,
) -> Result<(), FieldError> {
    let mismatch = || FieldError::TypeMismatch {
        field: field.name(),
        expected: FieldKind::Timestamp,
    };
    if field == updated_at {
        timestamps.updated_at = value.as_timestamp().ok_or_else(mismatch)?;
        Ok(())
    } else if field == deleted_at {
        timestamps.deleted_at = match value {
            FieldValue::Null => None,
            FieldValue::Timestamp(at) => Some(at),
            _ => return Err(mismatch()),
        };
        Ok(())
    } else {
        Err(FieldError::Immutable {
            field: field.name(),
        })
    }
}

/// A partial update addressed to one record.
///
/// Patches without an identifier are skipped by repositories.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch<F> {
    pub id: Option<EntityId>,
    pub changes: Vec<(F, FieldValue)>,
}

impl<F: EntityField> Patch<F> {
    /// Start a patch for `id`.
    #[must_use]
    pub fn for_id(id: EntityId) -> Self {
        Self {
            id: Some(id),
            changes: Vec::new(),
        }
    }

    /// Add a column change.
    #[must_use]
    pub fn set(mut self, field: F, value: impl Into<FieldValue>) -> Self {
        self.changes.push((field, value.into()));
        self
    }
}

/// Merge `patch` into `entity` and stamp `updated_at`.
///
/// Changes to the identifier or `created_at` are ignored. `updated_at` is
/// always moved strictly forward, even when the clock has not advanced.
pub fn merge_patch<E: Entity>(
    entity: &mut E,
    changes: &[(E::Field, FieldValue)],
    now: DateTime<Utc>,
) -> Result<(), FieldError> {
    for (field, value) in changes {
        if *field == E::ID || *field == E::CREATED_AT || *field == E::UPDATED_AT {
            continue;
        }
        entity.apply(*field, value.clone())?;
    }
    let stamp = next_update_stamp(entity.timestamps().updated_at, now);
    entity.apply(E::UPDATED_AT, FieldValue::Timestamp(stamp))
}

/// The next `updated_at` value: `now`, or one microsecond past `previous`
/// when the clock has not moved beyond it.
#[must_use]
pub fn next_update_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

/// An ordered projection of named column values.
///
/// Serialises as a JSON object preserving column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(Vec<(&'static str, FieldValue)>);

impl Record {
    /// Project `fields` of `entity`.
    pub fn project<E: Entity>(entity: &E, fields: &[E::Field]) -> Self {
        Self(
            fields
                .iter()
                .map(|field| (field.name(), entity.value(*field)))
                .collect(),
        )
    }

    /// Project every readable column of `entity`.
    pub fn from_entity<E: Entity>(entity: &E) -> Self {
        Self::project(entity, &E::Field::readable_fields())
    }

    /// Look a value up by column name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| value)
    }

    /// Column names in projection order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|(column, _)| *column)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (column, value) in &self.0 {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
