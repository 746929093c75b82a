//! PostgreSQL-backed [`Repository`] for any entity with a row mapping.
//!
//! Statements come from [`super::sql`] and run through `sql_query`, so the
//! same compiled query plan drives this adapter and the in-memory one.
//! Writes run on an owned pooled connection held by [`PgScope`] between
//! `BEGIN` and `COMMIT`/`ROLLBACK`.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::result::QueryResult;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Double, Nullable, Text, Timestamptz};
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use mockable::Clock;
use tracing::debug;

use crate::domain::entity::{Entity, EntityId, FieldKind, FieldValue, Patch, merge_patch};
use crate::domain::filter::{Predicate, QueryPlan};
use crate::domain::ports::{Repository, RepositoryError};
use crate::domain::transaction::{Transaction, TransactionScope};
use crate::domain::{Product, User};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{CountRow, ProductRow, UserRow};
use super::pool::DbPool;
use super::sql::{self, Bind, SqlStatement};

type BoxedQuery = BoxedSqlQuery<'static, Pg, SqlQuery>;

/// Entities that can be loaded from raw SQL result rows.
#[async_trait]
pub trait PgEntity: Entity {
    /// Row struct matching the entity's table.
    type Row: Send;

    /// Run `query` and load its rows.
    async fn load_rows(conn: &mut AsyncPgConnection, query: BoxedQuery)
    -> QueryResult<Vec<Self::Row>>;

    /// Convert one loaded row.
    fn from_row(row: Self::Row) -> Result<Self, RepositoryError>;
}

macro_rules! pg_entity {
    ($entity:ty => $row:ty) => {
        #[async_trait]
        impl PgEntity for $entity {
            type Row = $row;

            async fn load_rows(
                conn: &mut AsyncPgConnection,
                query: BoxedQuery,
            ) -> QueryResult<Vec<$row>> {
                query.load::<$row>(conn).await
            }

            fn from_row(row: $row) -> Result<Self, RepositoryError> {
                <$entity>::try_from(row)
            }
        }
    };
}

pg_entity!(Product => ProductRow);
pg_entity!(User => UserRow);

fn bind_value(query: BoxedQuery, bind: Bind) -> BoxedQuery {
    match (bind.value, bind.kind) {
        (FieldValue::Integer(value), _) => query.bind::<BigInt, _>(value),
        (FieldValue::Float(value), _) => query.bind::<Double, _>(value),
        (FieldValue::Text(value), _) => query.bind::<Text, _>(value),
        (FieldValue::Timestamp(value), _) => query.bind::<Timestamptz, _>(value),
        (FieldValue::Null, FieldKind::Integer) => query.bind::<Nullable<BigInt>, _>(None::<i64>),
        (FieldValue::Null, FieldKind::Float) => query.bind::<Nullable<Double>, _>(None::<f64>),
        (FieldValue::Null, FieldKind::Text) => query.bind::<Nullable<Text>, _>(None::<String>),
        (FieldValue::Null, FieldKind::Timestamp) => {
            query.bind::<Nullable<Timestamptz>, _>(None::<DateTime<Utc>>)
        }
    }
}

fn prepare(statement: SqlStatement) -> BoxedQuery {
    debug!(sql = %statement.text, binds = statement.binds.len(), "prepared statement");
    statement
        .binds
        .into_iter()
        .fold(sql_query(statement.text).into_boxed::<Pg>(), bind_value)
}

async fn load<E: PgEntity>(
    conn: &mut AsyncPgConnection,
    statement: SqlStatement,
) -> Result<Vec<E>, RepositoryError> {
    let rows = E::load_rows(conn, prepare(statement))
        .await
        .map_err(map_diesel_error::<E>)?;
    rows.into_iter().map(E::from_row).collect()
}

/// An open PostgreSQL transaction on a dedicated pooled connection.
pub struct PgScope {
    conn: PooledConnection<'static, AsyncPgConnection>,
}

impl PgScope {
    fn connection(&mut self) -> &mut AsyncPgConnection {
        &mut self.conn
    }
}

#[async_trait]
impl TransactionScope for PgScope {
    async fn commit(&mut self) -> Result<(), RepositoryError> {
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::commit_transaction(
            self.connection(),
        )
        .await
        .map_err(|err| RepositoryError::query(err.to_string()))
    }

    async fn rollback(&mut self) -> Result<(), RepositoryError> {
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::rollback_transaction(
            self.connection(),
        )
        .await
        .map_err(|err| RepositoryError::query(err.to_string()))
    }
}

/// Diesel-backed repository for entity `E`.
pub struct DieselRepository<E> {
    pool: DbPool,
    clock: Arc<dyn Clock>,
    entity: PhantomData<fn() -> E>,
}

impl<E> Clone for DieselRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            clock: Arc::clone(&self.clock),
            entity: PhantomData,
        }
    }
}

impl<E: PgEntity> DieselRepository<E> {
    /// Create a repository over `pool`, stamping writes with `clock`.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            entity: PhantomData,
        }
    }

    async fn read(&self, statement: SqlStatement) -> Result<Vec<E>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        load::<E>(&mut conn, statement).await
    }
}

#[async_trait]
impl<E: PgEntity> Repository<E> for DieselRepository<E> {
    type Scope = PgScope;

    async fn begin(&self) -> Result<Transaction<PgScope>, RepositoryError> {
        let mut conn = self.pool.get_owned().await.map_err(map_pool_error)?;
        <AnsiTransactionManager as TransactionManager<AsyncPgConnection>>::begin_transaction(
            &mut conn,
        )
        .await
        .map_err(map_diesel_error::<E>)?;
        Ok(Transaction::new(PgScope { conn }))
    }

    async fn insert(
        &self,
        tx: &mut Transaction<PgScope>,
        records: Vec<E::New>,
    ) -> Result<Vec<E>, RepositoryError> {
        let now = self.clock.utc();
        let rows: Vec<_> = records
            .iter()
            .map(|record| E::insert_values(record, now))
            .collect();
        let Some(statement) = sql::insert::<E>(&rows) else {
            return Ok(Vec::new());
        };
        load::<E>(tx.scope_mut()?.connection(), statement).await
    }

    async fn select(&self, plan: &QueryPlan<E::Field>) -> Result<Vec<E>, RepositoryError> {
        self.read(sql::select::<E>(plan)).await
    }

    async fn count_matching(
        &self,
        predicate: &Predicate<E::Field>,
    ) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: CountRow = prepare(sql::count::<E>(predicate))
            .get_result(&mut *conn)
            .await
            .map_err(map_diesel_error::<E>)?;
        u64::try_from(row.count).map_err(|err| RepositoryError::query(err.to_string()))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<E>, RepositoryError> {
        let rows = self.read(sql::find_by_ids::<E>(&[id], false)).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_ids(&self, ids: &[EntityId]) -> Result<Vec<E>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read(sql::find_by_ids::<E>(ids, false)).await
    }

    async fn update(
        &self,
        tx: &mut Transaction<PgScope>,
        patches: Vec<Patch<E::Field>>,
    ) -> Result<Vec<E>, RepositoryError> {
        let now = self.clock.utc();
        let conn = tx.scope_mut()?.connection();
        let mut updated = Vec::with_capacity(patches.len());
        for patch in patches {
            let Some(id) = patch.id else {
                debug!(entity = E::LABEL, "skipping patch without identifier");
                continue;
            };
            let locked = load::<E>(&mut *conn, sql::find_by_ids::<E>(&[id], true)).await?;
            let Some(mut current) = locked.into_iter().next() else {
                debug!(entity = E::LABEL, %id, "skipping patch for missing row");
                continue;
            };
            merge_patch(&mut current, &patch.changes, now)?;
            let stored = load::<E>(&mut *conn, sql::update(&current)).await?;
            updated.extend(stored);
        }
        Ok(updated)
    }

    async fn delete(
        &self,
        tx: &mut Transaction<PgScope>,
        ids: &[EntityId],
    ) -> Result<bool, RepositoryError> {
        if ids.is_empty() {
            return Ok(false);
        }
        let removed = prepare(sql::delete::<E>(ids))
            .execute(tx.scope_mut()?.connection())
            .await
            .map_err(map_diesel_error::<E>)?;
        Ok(removed > 0)
    }
}
