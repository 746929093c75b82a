//! Declarative query specifications and their compilation into plans.
//!
//! A [`QuerySpec`] names fields as strings, the way they arrive from HTTP
//! requests. [`compile`] resolves every name against the entity's
//! [`EntityField`] table, coerces filter values to the column kind and
//! produces a [`QueryPlan`] that storage adapters execute: the in-memory
//! adapter evaluates [`Predicate::matches`], the PostgreSQL adapter renders
//! the same plan to SQL.
//!
//! Unknown filter fields are rejected. Unknown order columns are skipped.

use std::cmp::Ordering;

use pagination::PageRequest;
use tracing::debug;

use super::entity::{Entity, EntityField, FieldKind, FieldValue};

/// Comparison operator for [`Condition::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    LessThan,
    Equal,
}

/// Constraint placed on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Equality; `Null` matches `IS NULL`.
    Exact(FieldValue),
    /// Inclusive range.
    Range { min: FieldValue, max: FieldValue },
    /// Strict comparison or equality.
    Compare(CompareOp, FieldValue),
    /// Case-insensitive `LIKE` pattern; the caller places the `%` wildcards.
    Pattern(String),
}

impl Condition {
    /// Plain-value constraint. Text containing `%` becomes a pattern match.
    pub fn exact(value: impl Into<FieldValue>) -> Self {
        match value.into() {
            FieldValue::Text(text) if text.contains('%') => Self::Pattern(text),
            other => Self::Exact(other),
        }
    }

    /// Inclusive range constraint.
    pub fn between(min: impl Into<FieldValue>, max: impl Into<FieldValue>) -> Self {
        Self::Range {
            min: min.into(),
            max: max.into(),
        }
    }
}

/// Ordered field-to-condition mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec(Vec<(String, Condition)>);

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition, builder style.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.push(field, condition);
        self
    }

    pub fn push(&mut self, field: impl Into<String>, condition: Condition) {
        self.0.push((field.into(), condition));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.0.iter().map(|(field, condition)| (field.as_str(), condition))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Everything a listing query may ask for, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub page: PageRequest,
    /// Conjunctive filters.
    pub filters: FilterSpec,
    /// Disjunctive filters, conjoined with `filters`.
    pub or_filters: FilterSpec,
    /// Projection; empty selects every readable column.
    pub columns: Vec<String>,
    pub order_by: Vec<(String, Direction)>,
    /// Keep soft-deleted rows in the result.
    pub include_deleted: bool,
}

/// Raised when a specification does not fit the entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("unknown field `{field}`")]
    InvalidField { field: String },
    #[error("field `{field}` does not accept this value; expected {expected}")]
    InvalidValue { field: String, expected: FieldKind },
}

impl FilterError {
    fn invalid_field(field: &str) -> Self {
        Self::InvalidField {
            field: field.to_owned(),
        }
    }
}

/// Resolved operator with values coerced to the column kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// `= value`, or `IS NULL` when the value is `Null`.
    Equals(FieldValue),
    Between(FieldValue, FieldValue),
    GreaterThan(FieldValue),
    LessThan(FieldValue),
    ILike(String),
}

impl Op {
    /// Evaluate against one column value. `NULL` only satisfies
    /// `Equals(Null)`.
    pub fn matches(&self, value: &FieldValue) -> bool {
        match self {
            Self::Equals(FieldValue::Null) => value.is_null(),
            Self::Equals(expected) => value.compare(expected) == Some(Ordering::Equal),
            Self::Between(min, max) => {
                matches!(
                    value.compare(min),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(value.compare(max), Some(Ordering::Less | Ordering::Equal))
            }
            Self::GreaterThan(bound) => value.compare(bound) == Some(Ordering::Greater),
            Self::LessThan(bound) => value.compare(bound) == Some(Ordering::Less),
            Self::ILike(pattern) => value.as_text().is_some_and(|text| ilike(pattern, text)),
        }
    }
}

/// One resolved constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause<F> {
    pub field: F,
    pub op: Op,
}

/// `(all of all) AND (any of any)`; an empty `any` set is true.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate<F> {
    pub all: Vec<Clause<F>>,
    pub any: Vec<Clause<F>>,
}

impl<F> Default for Predicate<F> {
    fn default() -> Self {
        Self {
            all: Vec::new(),
            any: Vec::new(),
        }
    }
}

impl<F: EntityField> Predicate<F> {
    /// Evaluate against an entity in memory.
    pub fn matches<E: Entity<Field = F>>(&self, entity: &E) -> bool {
        let holds = |clause: &Clause<F>| clause.op.matches(&entity.value(clause.field));
        self.all.iter().all(holds) && (self.any.is_empty() || self.any.iter().any(holds))
    }
}

/// A compiled, storage-neutral query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan<F> {
    pub predicate: Predicate<F>,
    /// Sort keys; always ends with the identifier.
    pub order: Vec<(F, Direction)>,
    pub columns: Vec<F>,
    pub page: PageRequest,
}

/// Compile `spec` against `E`'s field table.
pub fn compile<E: Entity>(spec: &QuerySpec) -> Result<QueryPlan<E::Field>, FilterError> {
    let predicate = compile_predicate::<E>(spec)?;
    let columns = resolve_columns::<E::Field>(&spec.columns)?;
    let order = resolve_order::<E>(&spec.order_by);
    Ok(QueryPlan {
        predicate,
        order,
        columns,
        page: spec.page,
    })
}

/// Compile only the filtering part of `spec`, applying the soft-delete
/// policy.
pub fn compile_predicate<E: Entity>(
    spec: &QuerySpec,
) -> Result<Predicate<E::Field>, FilterError> {
    let mut all = compile_clauses::<E::Field>(&spec.filters)?;
    let any = compile_clauses::<E::Field>(&spec.or_filters)?;
    if !spec.include_deleted {
        all.push(Clause {
            field: E::DELETED_AT,
            op: Op::Equals(FieldValue::Null),
        });
    }
    Ok(Predicate { all, any })
}

/// Resolve a projection. Empty input selects every readable column;
/// unknown or unreadable names are rejected.
pub fn resolve_columns<F: EntityField>(names: &[String]) -> Result<Vec<F>, FilterError> {
    if names.is_empty() {
        return Ok(F::readable_fields());
    }
    names
        .iter()
        .map(|name| {
            F::parse(name)
                .filter(|field| field.readable())
                .ok_or_else(|| FilterError::invalid_field(name))
        })
        .collect()
}

fn resolve_order<E: Entity>(order_by: &[(String, Direction)]) -> Vec<(E::Field, Direction)> {
    let mut order: Vec<(E::Field, Direction)> = Vec::with_capacity(order_by.len() + 1);
    for (name, direction) in order_by {
        match E::Field::parse(name).filter(|field| field.readable()) {
            Some(field) if !order.iter().any(|(seen, _)| *seen == field) => {
                order.push((field, *direction));
            }
            Some(_) => {}
            None => debug!(column = %name, entity = E::LABEL, "skipping unknown order column"),
        }
    }
    if !order.iter().any(|(field, _)| *field == E::ID) {
        order.push((E::ID, Direction::Asc));
    }
    order
}

fn compile_clauses<F: EntityField>(spec: &FilterSpec) -> Result<Vec<Clause<F>>, FilterError> {
    spec.iter()
        .map(|(name, condition)| {
            let field = F::parse(name).ok_or_else(|| FilterError::invalid_field(name))?;
            Ok(Clause {
                field,
                op: compile_condition(field, condition)?,
            })
        })
        .collect()
}

fn compile_condition<F: EntityField>(field: F, condition: &Condition) -> Result<Op, FilterError> {
    let invalid = || FilterError::InvalidValue {
        field: field.name().to_owned(),
        expected: field.kind(),
    };
    let coerce = |value: &FieldValue| -> Result<FieldValue, FilterError> {
        value
            .clone()
            .coerce(field.kind())
            .filter(|coerced| !coerced.is_null())
            .ok_or_else(invalid)
    };

    match condition {
        Condition::Exact(FieldValue::Null) => Ok(Op::Equals(FieldValue::Null)),
        Condition::Exact(FieldValue::Text(text)) if text.contains('%') => {
            compile_pattern(field, text)
        }
        Condition::Exact(value) | Condition::Compare(CompareOp::Equal, value) => {
            Ok(Op::Equals(coerce(value)?))
        }
        Condition::Range { min, max } => Ok(Op::Between(coerce(min)?, coerce(max)?)),
        Condition::Compare(CompareOp::GreaterThan, value) => Ok(Op::GreaterThan(coerce(value)?)),
        Condition::Compare(CompareOp::LessThan, value) => Ok(Op::LessThan(coerce(value)?)),
        Condition::Pattern(pattern) => compile_pattern(field, pattern),
    }
}

fn compile_pattern<F: EntityField>(field: F, pattern: &str) -> Result<Op, FilterError> {
    if field.kind() == FieldKind::Text {
        Ok(Op::ILike(pattern.to_owned()))
    } else {
        Err(FilterError::InvalidValue {
            field: field.name().to_owned(),
            expected: field.kind(),
        })
    }
}

/// Case-insensitive SQL `LIKE`: `%` matches any run, `_` one character.
///
/// There is no escape character, so `\` matches itself.
pub fn ilike(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().flat_map(char::to_lowercase).collect();
    let text: Vec<char> = text.chars().flat_map(char::to_lowercase).collect();

    // Classic two-pointer wildcard match with backtracking to the last `%`.
    let (mut p, mut t) = (0, 0);
    let mut resume: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                resume = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match resume {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    resume = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}
