//! Relational store: pooled Postgres access with transparent unit-of-work routing.
//!
//! Repositories take a [`Db`] handle and never touch the pool directly. A `Db`
//! is either bound to the shared pool or to a connection with an open
//! transaction, so the same repository call can run standalone or as one step
//! of a larger unit of work (see [`Store::run_in_transaction`]).

mod db;
mod tx;

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub use db::Db;
pub use tx::UnitOfWork;

/// Postgres SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to start transaction")]
    Begin(#[source] sqlx::Error),

    #[error("failed to commit transaction")]
    Commit(#[source] sqlx::Error),

    #[error("failed to roll back transaction")]
    Rollback(#[source] sqlx::Error),

    #[error(transparent)]
    Query(#[from] sqlx::Error),

    #[error("store call exceeded its deadline of {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Query(sqlx::Error::Database(db)) => {
                db.code().as_deref() == Some(UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }
}

/// Shared handle to the database. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Store {
    pool: PgPool,
    call_timeout: Duration,
}

impl Store {
    pub fn new(pool: PgPool, call_timeout: Duration) -> Self {
        Self { pool, call_timeout }
    }

    /// A handle that runs every call straight against the pool.
    pub fn db(&self) -> Db<'_> {
        Db::pool(&self.pool, self.call_timeout)
    }

    /// Opens a unit of work. Dropping it without [`UnitOfWork::commit`] rolls back.
    pub async fn begin(&self) -> Result<UnitOfWork, StoreError> {
        UnitOfWork::begin(&self.pool, self.call_timeout).await
    }

    /// Runs `f` inside a single transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise and hands back the
    /// error produced by `f` unchanged. If the returned future is dropped
    /// before completion (deadline, client disconnect) or `f` panics, the
    /// transaction is rolled back when the connection goes back to the pool.
    ///
    /// ```ignore
    /// let user = store
    ///     .run_in_transaction::<_, AuthError, _>(move |db| {
    ///         Box::pin(async move { Ok(User::find_by_login(db, &login).await?) })
    ///     })
    ///     .await?;
    /// ```
    pub async fn run_in_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: for<'t> FnOnce(&'t mut Db<'_>) -> futures::future::BoxFuture<'t, Result<T, E>> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        let uow = self.begin().await?;
        tx::run(uow, f).await
    }
}

/// Default maximum connections for the pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_not_a_conflict() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn timeout_is_not_a_conflict() {
        let err = StoreError::Timeout(Duration::from_secs(5));
        assert!(!err.is_unique_violation());
        assert!(err.to_string().contains("deadline"));
    }

    #[test]
    fn query_errors_keep_the_driver_message() {
        let err = StoreError::from(sqlx::Error::ColumnNotFound("login".into()));
        assert!(err.to_string().contains("login"));
    }
}
