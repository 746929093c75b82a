//! In-memory [`Repository`] over a locked table.
//!
//! A transaction takes the table lock for its whole lifetime and works on a
//! staged copy, which replaces the table on commit and is dropped on
//! rollback. Reads issued while a transaction is open wait for it to end.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::entity::{Entity, EntityField, EntityId, FieldValue, Patch, merge_patch};
use crate::domain::filter::{Direction, Predicate, QueryPlan};
use crate::domain::ports::{Repository, RepositoryError};
use crate::domain::transaction::{Transaction, TransactionScope};

struct Table<E> {
    rows: BTreeMap<EntityId, E>,
    last_id: i64,
}

impl<E: Clone> Clone for Table<E> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            last_id: self.last_id,
        }
    }
}

impl<E: Entity> Table<E> {
    fn next_id(&mut self) -> Result<EntityId, RepositoryError> {
        let candidate = self
            .last_id
            .checked_add(1)
            .ok_or_else(|| RepositoryError::query("identifier space exhausted"))?;
        let id = EntityId::new(candidate).map_err(|err| RepositoryError::query(err.to_string()))?;
        self.last_id = candidate;
        Ok(id)
    }

    fn ensure_unique(&self, candidate: &E) -> Result<(), RepositoryError> {
        for field in E::unique_fields() {
            let value = candidate.value(*field);
            let clash = self
                .rows
                .values()
                .any(|row| row.id() != candidate.id() && row.value(*field) == value);
            if clash {
                return Err(RepositoryError::conflict(format!(
                    "{} with this {} already exists",
                    E::LABEL,
                    field.name()
                )));
            }
        }
        Ok(())
    }
}

/// Adapter state for an open in-memory transaction.
pub struct MemoryScope<E> {
    table: OwnedMutexGuard<Table<E>>,
    staged: Option<Table<E>>,
}

impl<E: Entity> MemoryScope<E> {
    fn staged(&mut self) -> Result<&mut Table<E>, RepositoryError> {
        self.staged
            .as_mut()
            .ok_or_else(|| RepositoryError::query("transaction scope already settled"))
    }
}

#[async_trait]
impl<E: Entity> TransactionScope for MemoryScope<E> {
    async fn commit(&mut self) -> Result<(), RepositoryError> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| RepositoryError::query("transaction scope already settled"))?;
        *self.table = staged;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), RepositoryError> {
        self.staged = None;
        Ok(())
    }
}

/// Repository keeping rows in process memory.
pub struct InMemoryRepository<E: Entity> {
    table: Arc<Mutex<Table<E>>>,
    clock: Arc<dyn Clock>,
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                rows: BTreeMap::new(),
                last_id: 0,
            })),
            clock,
        }
    }
}

impl<E: Entity> Clone for InMemoryRepository<E> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Order with `NULL` sorting after every value, as PostgreSQL does.
fn compare_values(left: &FieldValue, right: &FieldValue) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => left.compare(right).unwrap_or(Ordering::Equal),
    }
}

fn compare_rows<E: Entity>(left: &E, right: &E, order: &[(E::Field, Direction)]) -> Ordering {
    order
        .iter()
        .map(|(field, direction)| {
            let ordering = compare_values(&left.value(*field), &right.value(*field));
            match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

#[async_trait]
impl<E: Entity> Repository<E> for InMemoryRepository<E> {
    type Scope = MemoryScope<E>;

    async fn begin(&self) -> Result<Transaction<Self::Scope>, RepositoryError> {
        let table = Arc::clone(&self.table).lock_owned().await;
        let staged = Some(table.clone());
        Ok(Transaction::new(MemoryScope { table, staged }))
    }

    async fn insert(
        &self,
        tx: &mut Transaction<Self::Scope>,
        records: Vec<E::New>,
    ) -> Result<Vec<E>, RepositoryError> {
        let now = self.clock.utc();
        let table = tx.scope_mut()?.staged()?;
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            let id = table.next_id()?;
            let entity = E::materialise(id, record, now);
            table.ensure_unique(&entity)?;
            table.rows.insert(id, entity.clone());
            created.push(entity);
        }
        Ok(created)
    }

    async fn select(&self, plan: &QueryPlan<E::Field>) -> Result<Vec<E>, RepositoryError> {
        let table = self.table.lock().await;
        let mut rows: Vec<&E> = table
            .rows
            .values()
            .filter(|row| plan.predicate.matches(*row))
            .collect();
        rows.sort_by(|left, right| compare_rows(*left, *right, &plan.order));

        let offset = usize::try_from(plan.page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(plan.page.limit()).unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_matching(
        &self,
        predicate: &Predicate<E::Field>,
    ) -> Result<u64, RepositoryError> {
        let table = self.table.lock().await;
        let count = table
            .rows
            .values()
            .filter(|row| predicate.matches(*row))
            .count();
        u64::try_from(count).map_err(|err| RepositoryError::query(err.to_string()))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>, RepositoryError> {
        Ok(self.table.lock().await.rows.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> Result<Vec<E>, RepositoryError> {
        let table = self.table.lock().await;
        Ok(table
            .rows
            .values()
            .filter(|row| ids.contains(&row.id()))
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        tx: &mut Transaction<Self::Scope>,
        patches: Vec<Patch<E::Field>>,
    ) -> Result<Vec<E>, RepositoryError> {
        let now = self.clock.utc();
        let table = tx.scope_mut()?.staged()?;
        let mut updated = Vec::new();
        for patch in patches {
            let Some(id) = patch.id else { continue };
            let Some(current) = table.rows.get(&id) else {
                continue;
            };
            let mut merged = current.clone();
            merge_patch(&mut merged, &patch.changes, now)?;
            table.ensure_unique(&merged)?;
            table.rows.insert(id, merged.clone());
            updated.push(merged);
        }
        Ok(updated)
    }

    async fn delete(
        &self,
        tx: &mut Transaction<Self::Scope>,
        ids: &[EntityId],
    ) -> Result<bool, RepositoryError> {
        let table = tx.scope_mut()?.staged()?;
        let mut removed = false;
        for id in ids {
            removed |= table.rows.remove(id).is_some();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests;
