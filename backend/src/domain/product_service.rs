//! Product catalogue service implementing the [`ProductCatalogue`] port.
//!
//! Every write validates first and then runs inside a repository
//! transaction. Deletion is soft: it stamps `deleted_at` and the default
//! listing stops returning the product.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Page;
use tracing::{debug, info, warn};

use super::entity::{EntityField, EntityId, Patch, Record};
use super::filter::{Condition, Direction, FilterSpec, QuerySpec};
use super::ports::{ProductCatalogue, ProductListQuery, Repository, RepositoryError};
use super::product::{
    NewProduct, Product, ProductChanges, ProductField, validate_product_changes,
    validate_products,
};
use super::service_errors::{repository_failure, validation_failure};
use super::Error;

/// Columns returned by the product listing.
pub const LIST_COLUMNS: &[ProductField] = &[
    ProductField::Id,
    ProductField::Name,
    ProductField::Price,
    ProductField::UpdatedAt,
];

/// Product use-cases over any [`Repository<Product>`].
pub struct ProductService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R> ProductService<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> ProductService<R>
where
    R: Repository<Product>,
{
    fn listing_spec(query: ProductListQuery) -> Result<QuerySpec, Error> {
        let mut filters = FilterSpec::new();
        if let Some(name) = query.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
            filters.push(
                ProductField::Name.name(),
                Condition::Pattern(format!("%{name}%")),
            );
        }
        match (query.min_price, query.max_price) {
            (None, None) => {}
            (min, max) => {
                let min = min.unwrap_or(0.0);
                let max = max.unwrap_or(f64::MAX);
                if min > max {
                    warn!(min, max, "rejected inverted price range");
                    return Err(Error::invalid_request(
                        "min_price must not exceed max_price",
                    ));
                }
                filters.push(ProductField::Price.name(), Condition::between(min, max));
            }
        }
        Ok(QuerySpec {
            page: query.page,
            filters,
            columns: LIST_COLUMNS
                .iter()
                .map(|field| field.name().to_owned())
                .collect(),
            order_by: vec![(ProductField::UpdatedAt.name().to_owned(), Direction::Desc)],
            include_deleted: query.include_deleted,
            ..QuerySpec::default()
        })
    }

    /// Strict existence check shared by update and delete.
    async fn require_all(&self, operation: &'static str, ids: &[EntityId]) -> Result<(), Error> {
        match self.repo.get_by_ids(ids).await {
            Ok(_) => Ok(()),
            Err(RepositoryError::NotFound { message }) => {
                warn!(operation, %message, "unknown product identifiers");
                Err(Error::not_found("Some product IDs are invalid or not found."))
            }
            Err(err) => Err(repository_failure(operation, err)),
        }
    }

    async fn apply_patches(
        &self,
        operation: &'static str,
        patches: Vec<Patch<ProductField>>,
    ) -> Result<Vec<Product>, Error> {
        let mut tx = self
            .repo
            .begin()
            .await
            .map_err(|err| repository_failure(operation, err))?;
        let result = self.repo.update(&mut tx, patches).await;
        tx.finish(result)
            .await
            .map_err(|err| repository_failure(operation, err))
    }
}

#[async_trait]
impl<R> ProductCatalogue for ProductService<R>
where
    R: Repository<Product> + 'static,
{
    async fn create(&self, drafts: Vec<NewProduct>) -> Result<Vec<Product>, Error> {
        if drafts.is_empty() {
            warn!("create called without products");
            return Err(Error::invalid_request("At least one product must be provided."));
        }
        validate_products(&drafts).map_err(|err| validation_failure("create_products", &err))?;

        let created = self
            .repo
            .create(drafts)
            .await
            .map_err(|err| repository_failure("create_products", err))?;
        info!(count = created.len(), "products created");
        Ok(created)
    }

    async fn list(&self, query: ProductListQuery) -> Result<Page<Record>, Error> {
        let spec = Self::listing_spec(query)?;
        let page = self
            .repo
            .get_all(&spec)
            .await
            .map_err(|err| repository_failure("list_products", err))?;
        debug!(
            returned = page.items.len(),
            total = page.info.total,
            "products listed"
        );
        Ok(page)
    }

    async fn get(&self, id: EntityId) -> Result<Product, Error> {
        let found = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|err| repository_failure("get_product", err))?;
        found.ok_or_else(|| {
            warn!(%id, "product not found");
            Error::not_found("Data Not Found")
        })
    }

    async fn update(&self, changes: Vec<ProductChanges>) -> Result<Vec<Product>, Error> {
        if changes.is_empty() {
            warn!("update called without products");
            return Err(Error::invalid_request(
                "Product IDs and product details must be provided.",
            ));
        }
        validate_product_changes(&changes)
            .map_err(|err| validation_failure("update_products", &err))?;

        let ids: Vec<EntityId> = changes.iter().map(|change| change.id).collect();
        self.require_all("update_products", &ids).await?;

        let patches = changes.into_iter().map(ProductChanges::into_patch).collect();
        let updated = self.apply_patches("update_products", patches).await?;
        info!(count = updated.len(), "products updated");
        Ok(updated)
    }

    async fn delete(&self, mut ids: Vec<EntityId>) -> Result<Vec<EntityId>, Error> {
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            warn!("delete called without identifiers");
            return Err(Error::invalid_request("Product IDs must be provided."));
        }
        self.require_all("delete_products", &ids).await?;

        let now = self.clock.utc();
        let patches = ids
            .iter()
            .map(|id| Patch::for_id(*id).set(ProductField::DeletedAt, now))
            .collect();
        let deleted = self.apply_patches("delete_products", patches).await?;
        let deleted_ids: Vec<EntityId> = deleted.iter().map(super::entity::Entity::id).collect();
        info!(count = deleted_ids.len(), "products soft deleted");
        Ok(deleted_ids)
    }
}

#[cfg(test)]
#[path = "product_service_tests.rs"]
mod tests;
