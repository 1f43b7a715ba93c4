//! Executor abstraction for statement execution.
//!
//! Repositories never talk to a driver directly. They render a statement and
//! hand the SQL plus its [`Value`] arguments to an [`Executor`], which may be a
//! connection, a transaction or a pooled client.

use crate::error::{DbError, DbResult};
use crate::row::Record;
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// A trait that unifies database clients and transactions.
///
/// This allows repository methods to accept either a direct client connection
/// or a transaction, making it easy to compose operations within transactions.
/// Driver errors are passed through as [`DbError::Query`].
pub trait Executor: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl std::future::Future<Output = DbResult<u64>> + Send;

    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl std::future::Future<Output = DbResult<Vec<Record>>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`DbError::NotFound`]
    /// - 1 or more rows: returns the first row
    fn query_one(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl std::future::Future<Output = DbResult<Record>> + Send {
        async move {
            self.query(sql, args)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| DbError::not_found("Expected one row, got none"))
        }
    }

    /// Execute a query and require that it returns **exactly one** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`DbError::NotFound`]
    /// - 1 row: returns that row
    /// - multiple rows: returns [`DbError::TooManyRows`]
    fn query_one_strict(
        &self,
        sql: &str,
        args: &[Value],
    ) -> impl std::future::Future<Output = DbResult<Record>> + Send {
        async move {
            let mut rows = self.query(sql, args).await?;
            match rows.len() {
                0 => Err(DbError::not_found("Expected 1 row, got 0")),
                1 => rows
                    .pop()
                    .ok_or_else(|| DbError::not_found("Expected 1 row, got 0")),
                got => Err(DbError::too_many_rows(1, got)),
            }
        }
    }
}

fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|a| a as &(dyn ToSql + Sync)).collect()
}

#[inline]
fn log_statement(sql: &str, args: &[Value]) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        target: "iamdb.sql",
        sql = %sql,
        param_count = args.len(),
        "executing statement"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = (sql, args);
}

fn records(rows: Vec<tokio_postgres::Row>) -> DbResult<Vec<Record>> {
    rows.iter().map(Record::from_pg_row).collect()
}

impl Executor for tokio_postgres::Client {
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<u64> {
        log_statement(sql, args);
        let params = params(args);
        Ok(tokio_postgres::Client::execute(self, sql, &params).await?)
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Record>> {
        log_statement(sql, args);
        let params = params(args);
        records(tokio_postgres::Client::query(self, sql, &params).await?)
    }
}

impl Executor for tokio_postgres::Transaction<'_> {
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<u64> {
        log_statement(sql, args);
        let params = params(args);
        Ok(tokio_postgres::Transaction::execute(self, sql, &params).await?)
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Record>> {
        log_statement(sql, args);
        let params = params(args);
        records(tokio_postgres::Transaction::query(self, sql, &params).await?)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<u64> {
        // Delegate to the deref target (ClientWrapper / tokio_postgres::Client).
        Executor::execute(&**self, sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Record>> {
        Executor::query(&**self, sql, args).await
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::ClientWrapper {
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<u64> {
        Executor::execute(&**self, sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Record>> {
        Executor::query(&**self, sql, args).await
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Transaction<'_> {
    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<u64> {
        Executor::execute(&**self, sql, args).await
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<Vec<Record>> {
        Executor::query(&**self, sql, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRows(usize);

    impl Executor for FixedRows {
        async fn execute(&self, _sql: &str, _args: &[Value]) -> DbResult<u64> {
            Ok(self.0 as u64)
        }

        async fn query(&self, _sql: &str, _args: &[Value]) -> DbResult<Vec<Record>> {
            Ok((0..self.0)
                .map(|i| Record::from_pairs([("n", Some(Value::BigInt(i as i64)))]))
                .collect())
        }
    }

    #[tokio::test]
    async fn query_one_returns_first_row() {
        let row = FixedRows(3).query_one("SELECT", &[]).await.unwrap();
        assert_eq!(row.try_get::<i64>(0).unwrap(), 0);
        assert!(FixedRows(0).query_one("SELECT", &[]).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn query_one_strict_checks_cardinality() {
        assert!(FixedRows(1).query_one_strict("SELECT", &[]).await.is_ok());
        assert!(
            FixedRows(0)
                .query_one_strict("SELECT", &[])
                .await
                .unwrap_err()
                .is_not_found()
        );
        let err = FixedRows(2).query_one_strict("SELECT", &[]).await.unwrap_err();
        assert!(matches!(err, DbError::TooManyRows { expected: 1, got: 2 }));
    }
}
