//! Validation failures shared by the entity validators.
//!
//! Validators are pure: they inspect a draft and report the first rule it
//! violates. Batch validators stop at the first failing record and report
//! its position so nothing from the batch is persisted.

use std::fmt;

use serde_json::{Value, json};

/// The rule a value broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// Character count outside `min..=max`.
    Length { min: usize, max: usize },
    /// Character count above `max`.
    MaxLength { max: usize },
    /// Not a syntactically valid email address.
    EmailSyntax,
    /// Number below zero.
    NonNegative,
    /// NaN or infinite number.
    Finite,
    /// A required value was absent or blank.
    Required,
}

impl ValidationRule {
    fn code(self) -> &'static str {
        match self {
            Self::Length { .. } => "length",
            Self::MaxLength { .. } => "max_length",
            Self::EmailSyntax => "email_syntax",
            Self::NonNegative => "non_negative",
            Self::Finite => "finite",
            Self::Required => "required",
        }
    }
}

/// First rule violated by a candidate record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    field: &'static str,
    rule: ValidationRule,
    position: Option<usize>,
}

impl ValidationError {
    pub fn new(field: &'static str, rule: ValidationRule) -> Self {
        Self {
            field,
            rule,
            position: None,
        }
    }

    /// Record the offending record's index within a batch.
    #[must_use]
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn rule(&self) -> ValidationRule {
        self.rule
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Stable machine-readable code, e.g. `name_length`.
    pub fn code(&self) -> String {
        format!("{}_{}", self.field, self.rule.code())
    }

    /// Structured details for error payloads.
    pub fn details(&self) -> Value {
        match self.position {
            Some(index) => json!({ "field": self.field, "code": self.code(), "index": index }),
            None => json!({ "field": self.field, "code": self.code() }),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(index) = self.position {
            write!(f, "record {index}: ")?;
        }
        let field = self.field;
        match self.rule {
            ValidationRule::Length { min, max } => {
                write!(f, "{field} must be between {min} and {max} characters")
            }
            ValidationRule::MaxLength { max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            ValidationRule::EmailSyntax => write!(f, "{field} is not a valid email address"),
            ValidationRule::NonNegative => write!(f, "{field} must not be negative"),
            ValidationRule::Finite => write!(f, "{field} must be a finite number"),
            ValidationRule::Required => write!(f, "{field} is required"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check that `value` holds between `min` and `max` characters inclusive.
pub(crate) fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let count = value.chars().count();
    if (min..=max).contains(&count) {
        Ok(())
    } else {
        Err(ValidationError::new(field, ValidationRule::Length { min, max }))
    }
}

/// Check that `value` holds at most `max` characters.
pub(crate) fn check_max_length(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() <= max {
        Ok(())
    } else {
        Err(ValidationError::new(field, ValidationRule::MaxLength { max }))
    }
}

/// Run `validate` over a batch, tagging the first failure with its index.
pub(crate) fn validate_batch<T>(
    batch: &[T],
    validate: impl Fn(&T) -> Result<(), ValidationError>,
) -> Result<(), ValidationError> {
    batch
        .iter()
        .enumerate()
        .try_for_each(|(index, item)| validate(item).map_err(|err| err.at(index)))
}
