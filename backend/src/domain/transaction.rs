//! Explicit transaction boundaries for repository writes.
//!
//! A [`Transaction`] wraps an adapter-specific [`TransactionScope`] and
//! enforces the lifecycle `Active -> Committed | RolledBack`. Terminal
//! states never reopen; a second `commit` or `rollback` fails with
//! [`RepositoryError::TransactionClosed`].

use std::fmt;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::ports::RepositoryError;

/// Lifecycle state of a [`Transaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    RolledBack,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Committed => "committed",
            Self::RolledBack => "rolled back",
        })
    }
}

/// Adapter hook that makes staged work durable or discards it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionScope: Send {
    async fn commit(&mut self) -> Result<(), RepositoryError>;
    async fn rollback(&mut self) -> Result<(), RepositoryError>;
}

/// An open unit of work.
#[derive(Debug)]
pub struct Transaction<S> {
    scope: S,
    state: TransactionState,
}

impl<S: TransactionScope> Transaction<S> {
    /// Wrap a freshly opened adapter scope.
    pub fn new(scope: S) -> Self {
        Self {
            scope,
            state: TransactionState::Active,
        }
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Borrow the adapter scope for staging work.
    pub fn scope_mut(&mut self) -> Result<&mut S, RepositoryError> {
        self.ensure_active()?;
        Ok(&mut self.scope)
    }

    /// Commit staged work. A failed commit rolls back and returns the
    /// commit error.
    pub async fn commit(&mut self) -> Result<(), RepositoryError> {
        self.ensure_active()?;
        match self.scope.commit().await {
            Ok(()) => {
                self.state = TransactionState::Committed;
                debug!("transaction committed");
                Ok(())
            }
            Err(err) => {
                if let Err(rollback_err) = self.scope.rollback().await {
                    warn!(error = %rollback_err, "rollback after failed commit also failed");
                }
                self.state = TransactionState::RolledBack;
                warn!(error = %err, "transaction commit failed; rolled back");
                Err(err)
            }
        }
    }

    /// Discard staged work.
    pub async fn rollback(&mut self) -> Result<(), RepositoryError> {
        self.ensure_active()?;
        self.state = TransactionState::RolledBack;
        self.scope.rollback().await
    }

    /// Commit when `result` is `Ok`, roll back otherwise, and hand the
    /// result back.
    pub async fn finish<T: Send>(
        &mut self,
        result: Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    fn ensure_active(&self) -> Result<(), RepositoryError> {
        match self.state {
            TransactionState::Active => Ok(()),
            closed => Err(RepositoryError::transaction_closed(closed)),
        }
    }
}
