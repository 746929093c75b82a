//! Product entity, its field descriptors and validators.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::entity::{
    Entity, EntityField, EntityId, FieldError, FieldKind, FieldValue, Patch, Timestamps,
    apply_timestamp,
};
use super::validation::{
    ValidationError, ValidationRule, check_length, check_max_length, validate_batch,
};

/// Product names hold more than this many characters.
pub const NAME_MIN_EXCLUSIVE: usize = 3;
pub const NAME_MAX: usize = 200;
pub const DESCRIPTION_MAX: usize = 1000;

/// Columns of the `products` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Id,
    Name,
    Description,
    Price,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

impl EntityField for ProductField {
    const ALL: &'static [Self] = &[
        Self::Id,
        Self::Name,
        Self::Description,
        Self::Price,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::DeletedAt,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Description => "description",
            Self::Price => "price",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DeletedAt => "deleted_at",
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Id => FieldKind::Integer,
            Self::Name | Self::Description => FieldKind::Text,
            Self::Price => FieldKind::Float,
            Self::CreatedAt | Self::UpdatedAt | Self::DeletedAt => FieldKind::Timestamp,
        }
    }

    fn nullable(self) -> bool {
        matches!(self, Self::Description | Self::DeletedAt)
    }
}

/// Draft for a new product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
}

impl NewProduct {
    /// Check every product rule, reporting the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        validate_price(self.price)
    }
}

/// Validate a whole batch; any failure rejects the batch.
pub fn validate_products(batch: &[NewProduct]) -> Result<(), ValidationError> {
    validate_batch(batch, NewProduct::validate)
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    check_length("name", name, NAME_MIN_EXCLUSIVE + 1, NAME_MAX)
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    check_max_length("description", description, DESCRIPTION_MAX)
}

fn validate_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() {
        return Err(ValidationError::new("price", ValidationRule::Finite));
    }
    if price < 0.0 {
        return Err(ValidationError::new("price", ValidationRule::NonNegative));
    }
    Ok(())
}

/// Requested changes to one existing product. Absent fields stay untouched;
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductChanges {
    pub id: EntityId,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
}

impl ProductChanges {
    /// Validate only the supplied fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(Some(description)) = &self.description {
            validate_description(description)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        Ok(())
    }

    /// Translate into a repository patch.
    pub fn into_patch(self) -> Patch<ProductField> {
        let mut patch = Patch::for_id(self.id);
        if let Some(name) = self.name {
            patch = patch.set(ProductField::Name, name);
        }
        if let Some(description) = self.description {
            patch = patch.set(ProductField::Description, description);
        }
        if let Some(price) = self.price {
            patch = patch.set(ProductField::Price, price);
        }
        patch
    }
}

/// Validate a batch of change sets.
pub fn validate_product_changes(batch: &[ProductChanges]) -> Result<(), ValidationError> {
    validate_batch(batch, ProductChanges::validate)
}

/// A stored product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    id: EntityId,
    name: String,
    description: Option<String>,
    price: f64,
    #[serde(flatten)]
    timestamps: Timestamps,
}

impl Product {
    /// Rebuild a product from stored column values.
    pub fn restore(id: EntityId, draft: NewProduct, timestamps: Timestamps) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            timestamps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn price(&self) -> f64 {
        self.price
    }
}

impl Entity for Product {
    type Field = ProductField;
    type New = NewProduct;

    const LABEL: &'static str = "product";
    const TABLE: &'static str = "products";
    const ID: ProductField = ProductField::Id;
    const CREATED_AT: ProductField = ProductField::CreatedAt;
    const UPDATED_AT: ProductField = ProductField::UpdatedAt;
    const DELETED_AT: ProductField = ProductField::DeletedAt;

    fn id(&self) -> EntityId {
        self.id
    }

    fn timestamps(&self) -> Timestamps {
        self.timestamps
    }

    fn value(&self, field: ProductField) -> FieldValue {
        match field {
            ProductField::Id => self.id.into(),
            ProductField::Name => self.name.clone().into(),
            ProductField::Description => self.description.clone().into(),
            ProductField::Price => self.price.into(),
            ProductField::CreatedAt => self.timestamps.created_at.into(),
            ProductField::UpdatedAt => self.timestamps.updated_at.into(),
            ProductField::DeletedAt => self.timestamps.deleted_at.into(),
        }
    }

    fn apply(&mut self, field: ProductField, value: FieldValue) -> Result<(), FieldError> {
        let mismatch = FieldError::TypeMismatch {
            field: field.name(),
            expected: field.kind(),
        };
        match field {
            ProductField::Name => match value {
                FieldValue::Text(name) => self.name = name,
                _ => return Err(mismatch),
            },
            ProductField::Description => match value {
                FieldValue::Text(description) => self.description = Some(description),
                FieldValue::Null => self.description = None,
                _ => return Err(mismatch),
            },
            ProductField::Price => match value.coerce(FieldKind::Float) {
                Some(FieldValue::Float(price)) => self.price = price,
                _ => return Err(mismatch),
            },
            ProductField::Id
            | ProductField::CreatedAt
            | ProductField::UpdatedAt
            | ProductField::DeletedAt => {
                return apply_timestamp(
                    &mut self.timestamps,
                    field,
                    ProductField::UpdatedAt,
                    ProductField::DeletedAt,
                    value,
                );
            }
        }
        Ok(())
    }

    fn insert_values(new: &NewProduct, now: DateTime<Utc>) -> Vec<(ProductField, FieldValue)> {
        vec![
            (ProductField::Name, new.name.clone().into()),
            (ProductField::Description, new.description.clone().into()),
            (ProductField::Price, new.price.into()),
            (ProductField::CreatedAt, now.into()),
            (ProductField::UpdatedAt, now.into()),
        ]
    }

    fn materialise(id: EntityId, new: NewProduct, now: DateTime<Utc>) -> Self {
        Self::restore(id, new, Timestamps::created(now))
    }
}

#[cfg(test)]
mod tests {
    //! Validator coverage for product drafts and change sets.

    use super::*;
    use rstest::rstest;

    fn draft(name: &str, price: f64) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            description: None,
            price,
        }
    }

    #[rstest]
    #[case(draft("Widget", 9.99), None)]
    #[case(draft("abcd", 0.0), None)]
    #[case(draft("ab", 1.0), Some("name_length"))]
    #[case(draft("abc", 1.0), Some("name_length"))]
    #[case(draft(&"x".repeat(201), 1.0), Some("name_length"))]
    #[case(draft("Widget", -0.01), Some("price_non_negative"))]
    #[case(draft("Widget", f64::NAN), Some("price_finite"))]
    fn validates_new_products(#[case] product: NewProduct, #[case] code: Option<&str>) {
        let result = product.validate().map_err(|err| err.code());
        match code {
            None => assert_eq!(result, Ok(())),
            Some(code) => assert_eq!(result, Err(code.to_owned())),
        }
    }

    #[rstest]
    fn rejects_long_descriptions() {
        let product = NewProduct {
            description: Some("d".repeat(1001)),
            ..draft("Widget", 1.0)
        };
        let err = product.validate().expect_err("description too long");
        assert_eq!(err.code(), "description_max_length");
    }

    #[rstest]
    fn batch_validation_is_all_or_nothing() {
        let batch = vec![draft("Widget", 1.0), draft("ab", 1.0)];
        let err = validate_products(&batch).expect_err("second draft invalid");
        assert_eq!(err.position(), Some(1));
    }

    #[rstest]
    fn changes_validate_only_supplied_fields() {
        let changes = ProductChanges {
            id: EntityId::new(1).expect("positive id"),
            name: None,
            description: Some(None),
            price: Some(5.0),
        };
        assert!(changes.validate().is_ok());

        let patch = changes.into_patch();
        assert_eq!(
            patch.changes,
            vec![
                (ProductField::Description, FieldValue::Null),
                (ProductField::Price, FieldValue::Float(5.0)),
            ]
        );
    }

    #[rstest]
    fn apply_rejects_mismatched_values() {
        let mut product = Product::materialise(
            EntityId::new(1).expect("positive id"),
            draft("Widget", 1.0),
            Utc::now(),
        );
        let err = product
            .apply(ProductField::Name, FieldValue::Integer(4))
            .expect_err("name must be text");
        assert!(matches!(err, FieldError::TypeMismatch { field: "name", .. }));

        let err = product
            .apply(ProductField::Id, FieldValue::Integer(4))
            .expect_err("id is immutable");
        assert_eq!(err, FieldError::Immutable { field: "id" });
    }
}
