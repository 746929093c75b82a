//! Driving port for the product catalogue use-cases.

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use crate::domain::entity::{EntityId, Record};
use crate::domain::product::{NewProduct, Product, ProductChanges};
use crate::domain::Error;

/// Listing parameters accepted by [`ProductCatalogue::list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductListQuery {
    pub page: PageRequest,
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<f64>,
    /// Inclusive upper price bound.
    pub max_price: Option<f64>,
    /// Also list soft-deleted products.
    pub include_deleted: bool,
}

/// Domain use-case port for managing products.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductCatalogue: Send + Sync {
    /// Validate and persist a batch, all or nothing.
    async fn create(&self, drafts: Vec<NewProduct>) -> Result<Vec<Product>, Error>;

    /// One page of the default product projection.
    async fn list(&self, query: ProductListQuery) -> Result<Page<Record>, Error>;

    /// A single product by identifier.
    async fn get(&self, id: EntityId) -> Result<Product, Error>;

    /// Apply per-product changes. Every identifier must exist.
    async fn update(&self, changes: Vec<ProductChanges>) -> Result<Vec<Product>, Error>;

    /// Soft-delete products, returning the affected identifiers.
    async fn delete(&self, ids: Vec<EntityId>) -> Result<Vec<EntityId>, Error>;
}
