//! Translation of pool and Diesel failures into [`RepositoryError`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::entity::{Entity, EntityField};
use crate::domain::ports::RepositoryError;

use super::pool::PoolError;

/// Pool failures mean the database is unreachable.
pub(crate) fn map_pool_error(error: PoolError) -> RepositoryError {
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    RepositoryError::connection(message)
}

/// Map a Diesel failure raised while operating on `E`.
///
/// Unique violations become conflicts naming the first unique column whose
/// name appears in the violated constraint, e.g. `users_email_key` yields
/// "user with this email already exists".
pub(crate) fn map_diesel_error<E: Entity>(error: DieselError) -> RepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), entity = E::LABEL, "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            entity = E::LABEL,
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            conflict::<E>(info.constraint_name())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RepositoryError::connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
            RepositoryError::invalid_argument(info.message().to_owned())
        }
        DieselError::NotFound => RepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => RepositoryError::query("database query error"),
        _ => RepositoryError::query("database error"),
    }
}

fn conflict<E: Entity>(constraint: Option<&str>) -> RepositoryError {
    let column = E::unique_fields()
        .iter()
        .map(|field| field.name())
        .find(|name| constraint.is_some_and(|constraint| constraint.contains(name)))
        .unwrap_or("value");
    RepositoryError::conflict(format!("{} with this {column} already exists", E::LABEL))
}
