use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::{
    postgres::{PgArguments, PgQueryResult, PgRow},
    query::{Query, QueryAs, QueryScalar},
    FromRow, PgConnection, PgPool, Postgres,
};

use super::{tx, StoreError, UnitOfWork};

enum Conn<'c> {
    Pool(&'c PgPool),
    Tx(&'c mut PgConnection),
}

/// Executes queries against whatever this handle is bound to: the pool, or
/// the connection holding an open transaction.
///
/// Every call is bounded by the store's per-call deadline. Driver errors are
/// passed through untouched inside [`StoreError::Query`].
pub struct Db<'c> {
    conn: Conn<'c>,
    call_timeout: Duration,
}

impl<'c> Db<'c> {
    pub(super) fn pool(pool: &'c PgPool, call_timeout: Duration) -> Self {
        Self {
            conn: Conn::Pool(pool),
            call_timeout,
        }
    }

    pub(super) fn tx(conn: &'c mut PgConnection, call_timeout: Duration) -> Self {
        Self {
            conn: Conn::Tx(conn),
            call_timeout,
        }
    }

    pub fn in_transaction(&self) -> bool {
        matches!(self.conn, Conn::Tx(_))
    }

    pub async fn execute<'q>(
        &mut self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<PgQueryResult, StoreError> {
        let limit = self.call_timeout;
        bounded(limit, async {
            match &mut self.conn {
                Conn::Pool(pool) => query.execute(*pool).await,
                Conn::Tx(conn) => query.execute(&mut **conn).await,
            }
        })
        .await
    }

    /// Zero or one row; more rows than one are silently ignored.
    pub async fn fetch_optional<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Option<O>, StoreError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        let limit = self.call_timeout;
        bounded(limit, async {
            match &mut self.conn {
                Conn::Pool(pool) => query.fetch_optional(*pool).await,
                Conn::Tx(conn) => query.fetch_optional(&mut **conn).await,
            }
        })
        .await
    }

    /// Exactly one row; none is `sqlx::Error::RowNotFound`.
    pub async fn fetch_one<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<O, StoreError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        let limit = self.call_timeout;
        bounded(limit, async {
            match &mut self.conn {
                Conn::Pool(pool) => query.fetch_one(*pool).await,
                Conn::Tx(conn) => query.fetch_one(&mut **conn).await,
            }
        })
        .await
    }

    pub async fn fetch_all<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Vec<O>, StoreError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        let limit = self.call_timeout;
        bounded(limit, async {
            match &mut self.conn {
                Conn::Pool(pool) => query.fetch_all(*pool).await,
                Conn::Tx(conn) => query.fetch_all(&mut **conn).await,
            }
        })
        .await
    }

    pub async fn fetch_scalar<'q, O>(
        &mut self,
        query: QueryScalar<'q, Postgres, O, PgArguments>,
    ) -> Result<O, StoreError>
    where
        O: Send + Unpin,
        (O,): for<'r> FromRow<'r, PgRow>,
    {
        let limit = self.call_timeout;
        bounded(limit, async {
            match &mut self.conn {
                Conn::Pool(pool) => query.fetch_one(*pool).await,
                Conn::Tx(conn) => query.fetch_one(&mut **conn).await,
            }
        })
        .await
    }

    /// Runs `f` atomically.
    ///
    /// Inside a unit of work the open transaction is reused as is: no
    /// savepoint is taken and nothing is committed here, the outermost owner
    /// decides. On a pool handle a fresh unit of work is opened.
    pub async fn run_in_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: for<'t> FnOnce(&'t mut Db<'_>) -> BoxFuture<'t, Result<T, E>> + Send,
        T: Send,
        E: From<StoreError> + Send,
    {
        match self.conn {
            Conn::Tx(_) => f(self).await,
            Conn::Pool(pool) => {
                let uow = UnitOfWork::begin(pool, self.call_timeout).await?;
                tx::run(uow, f).await
            }
        }
    }
}

async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(StoreError::Query),
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
