//! Generic persistence port shared by every entity type.
//!
//! Adapters implement the primitive operations; the provided methods layer
//! the shared semantics on top (projection, strict multi-fetch, pagination
//! totals, transaction wrapping) so every adapter behaves identically.

use async_trait::async_trait;
use pagination::{Page, PageInfo};

use crate::domain::entity::{Entity, EntityId, FieldError, Patch, Record};
use crate::domain::filter::{
    FilterError, Predicate, QueryPlan, QuerySpec, compile, compile_predicate, resolve_columns,
};
use crate::domain::transaction::{Transaction, TransactionScope, TransactionState};

use super::define_port_error;

define_port_error! {
    /// Errors raised by repository adapters.
    pub enum RepositoryError {
        /// The store could not be reached.
        Connection { message: String } => "repository connection failed: {message}",
        /// A statement failed during execution or row conversion.
        Query { message: String } => "repository query failed: {message}",
        /// A unique constraint rejected the write.
        Conflict { message: String } => "conflicting record: {message}",
        /// Requested records do not exist.
        NotFound { message: String } => "{message}",
        /// Caller supplied an unusable argument.
        InvalidArgument { message: String } => "invalid argument: {message}",
        /// A field name did not resolve against the entity.
        InvalidField { field: String } => "unknown field `{field}`",
        /// The transaction has already been committed or rolled back.
        TransactionClosed { state: TransactionState } => "transaction already {state}",
    }
}

impl From<FilterError> for RepositoryError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::InvalidField { field } => Self::InvalidField { field },
            other @ FilterError::InvalidValue { .. } => Self::invalid_argument(other.to_string()),
        }
    }
}

impl From<FieldError> for RepositoryError {
    fn from(err: FieldError) -> Self {
        Self::invalid_argument(err.to_string())
    }
}

/// CRUD and transaction-scoped operations over one entity type.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Adapter state held by an open transaction.
    type Scope: TransactionScope + Send;

    /// Open a transaction.
    async fn begin(&self) -> Result<Transaction<Self::Scope>, RepositoryError>;

    /// Persist `records` within `tx`, returning them with identifiers.
    async fn insert(
        &self,
        tx: &mut Transaction<Self::Scope>,
        records: Vec<E::New>,
    ) -> Result<Vec<E>, RepositoryError>;

    /// Load one window of rows matching `plan`.
    async fn select(&self, plan: &QueryPlan<E::Field>) -> Result<Vec<E>, RepositoryError>;

    /// Count rows matching `predicate`.
    async fn count_matching(&self, predicate: &Predicate<E::Field>)
    -> Result<u64, RepositoryError>;

    /// Fetch one row by identifier, soft-deleted or not.
    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>, RepositoryError>;

    /// Fetch the rows that exist among `ids`, ordered by identifier.
    async fn find_by_ids(&self, ids: &[EntityId]) -> Result<Vec<E>, RepositoryError>;

    /// Merge each patch into its stored row and refresh `updated_at`.
    ///
    /// Patches without an identifier, or addressing a missing row, are
    /// skipped; only the rows actually updated are returned.
    async fn update(
        &self,
        tx: &mut Transaction<Self::Scope>,
        patches: Vec<Patch<E::Field>>,
    ) -> Result<Vec<E>, RepositoryError>;

    /// Physically remove rows. Returns whether any row was removed.
    async fn delete(
        &self,
        tx: &mut Transaction<Self::Scope>,
        ids: &[EntityId],
    ) -> Result<bool, RepositoryError>;

    async fn commit(&self, tx: &mut Transaction<Self::Scope>) -> Result<(), RepositoryError> {
        tx.commit().await
    }

    async fn rollback(&self, tx: &mut Transaction<Self::Scope>) -> Result<(), RepositoryError> {
        tx.rollback().await
    }

    /// Insert a batch in its own transaction.
    async fn create(&self, records: Vec<E::New>) -> Result<Vec<E>, RepositoryError> {
        let mut tx = self.begin().await?;
        let result = self.insert(&mut tx, records).await;
        tx.finish(result).await
    }

    /// One page of projected records plus pagination totals computed with
    /// the same predicate.
    async fn get_all(&self, spec: &QuerySpec) -> Result<Page<Record>, RepositoryError> {
        let plan = compile::<E>(spec)?;
        let total = self.count_matching(&plan.predicate).await?;
        let rows = self.select(&plan).await?;
        let records = rows
            .iter()
            .map(|row| Record::project(row, &plan.columns))
            .collect();
        Ok(Page::new(records, PageInfo::new(plan.page, total)))
    }

    /// One record projected onto `fields`, or every readable column.
    async fn get_by_id(
        &self,
        id: EntityId,
        fields: Option<&[String]>,
    ) -> Result<Option<Record>, RepositoryError> {
        let columns = resolve_columns::<E::Field>(fields.unwrap_or_default())?;
        let found = self.find_by_id(id).await?;
        Ok(found.map(|entity| Record::project(&entity, &columns)))
    }

    /// Fetch every requested record or fail.
    ///
    /// Duplicate identifiers are collapsed. An empty request is
    /// `InvalidArgument`; any missing identifier is `NotFound`.
    async fn get_by_ids(&self, ids: &[EntityId]) -> Result<Vec<E>, RepositoryError> {
        if ids.is_empty() {
            return Err(RepositoryError::invalid_argument(format!(
                "at least one {} identifier is required",
                E::LABEL
            )));
        }
        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let found = self.find_by_ids(&unique).await?;
        if found.len() != unique.len() {
            let missing: Vec<String> = unique
                .iter()
                .filter(|id| !found.iter().any(|entity| entity.id() == **id))
                .map(ToString::to_string)
                .collect();
            return Err(RepositoryError::not_found(format!(
                "{} not found: {}",
                E::LABEL,
                missing.join(", ")
            )));
        }
        Ok(found)
    }

    /// Number of rows the same `spec` would page through.
    async fn count(&self, spec: &QuerySpec) -> Result<u64, RepositoryError> {
        let predicate = compile_predicate::<E>(spec)?;
        self.count_matching(&predicate).await
    }
}
