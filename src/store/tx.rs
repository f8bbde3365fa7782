use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};

use super::{Db, StoreError};

/// One open transaction. Exactly one of commit / rollback happens: both
/// consume the guard, and a guard dropped without either (early return, panic,
/// cancelled future) rolls back when its connection is returned to the pool.
pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
    call_timeout: Duration,
}

impl UnitOfWork {
    pub(super) async fn begin(pool: &PgPool, call_timeout: Duration) -> Result<Self, StoreError> {
        let tx = tokio::time::timeout(call_timeout, pool.begin())
            .await
            .map_err(|_| StoreError::Timeout(call_timeout))?
            .map_err(StoreError::Begin)?;
        debug!("transaction started");
        Ok(Self { tx, call_timeout })
    }

    /// Handle routed to this transaction.
    pub fn db(&mut self) -> Db<'_> {
        Db::tx(&mut *self.tx, self.call_timeout)
    }

    /// Bounded by the per-call deadline like every other store call.
    pub async fn commit(self) -> Result<(), StoreError> {
        let limit = self.call_timeout;
        tokio::time::timeout(limit, self.tx.commit())
            .await
            .map_err(|_| StoreError::Timeout(limit))?
            .map_err(StoreError::Commit)?;
        debug!("transaction committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), StoreError> {
        let limit = self.call_timeout;
        tokio::time::timeout(limit, self.tx.rollback())
            .await
            .map_err(|_| StoreError::Timeout(limit))?
            .map_err(StoreError::Rollback)?;
        debug!("transaction rolled back");
        Ok(())
    }
}

pub(super) async fn run<T, E, F>(mut uow: UnitOfWork, f: F) -> Result<T, E>
where
    F: for<'t> FnOnce(&'t mut Db<'_>) -> BoxFuture<'t, Result<T, E>> + Send,
    T: Send,
    E: From<StoreError> + Send,
{
    let outcome = {
        let mut db = uow.db();
        f(&mut db).await
    };

    match outcome {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            // The caller gets the unit of work's error, not the rollback's.
            if let Err(rb) = uow.rollback().await {
                warn!(error = %rb, "rollback after failed unit of work");
            }
            Err(err)
        }
    }
}
