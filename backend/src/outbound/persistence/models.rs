//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Rows are loaded through `sql_query`, so
//! they derive `QueryableByName` and are matched to columns by name.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::BigInt;

use crate::domain::entity::{EntityId, Timestamps};
use crate::domain::ports::RepositoryError;
use crate::domain::{NewProduct, NewUser, Product, User};

use super::schema::{products, users};

fn entity_id(raw: i64) -> Result<EntityId, RepositoryError> {
    EntityId::new(raw).map_err(|err| RepositoryError::query(err.to_string()))
}

/// Row struct for reading from the products table.
#[derive(Debug, Clone, QueryableByName)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self::restore(
            entity_id(row.id)?,
            NewProduct {
                name: row.name,
                description: row.description,
                price: row.price,
            },
            Timestamps {
                created_at: row.created_at,
                updated_at: row.updated_at,
                deleted_at: row.deleted_at,
            },
        ))
    }
}

/// Row struct for reading from the users table.
#[derive(Clone, QueryableByName)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self::restore(
            entity_id(row.id)?,
            NewUser {
                name: row.name,
                email: row.email,
                password_hash: row.password,
            },
            Timestamps {
                created_at: row.created_at,
                updated_at: row.updated_at,
                deleted_at: row.deleted_at,
            },
        ))
    }
}

/// Result of `SELECT COUNT(*) AS count`.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub(crate) struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}
