use std::sync::Arc;

use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use futures::{future::BoxFuture, stream::BoxStream};
use sqlx::{
    sqlite::{
        SqliteConnectOptions, SqlitePoolOptions, SqliteQueryResult, SqliteRow, SqliteStatement,
        SqliteTypeInfo,
    },
    Describe, Either, Error as SqlxError, Execute, Executor, Sqlite, SqlitePool, Transaction,
};

use crate::clock::{Clock, SystemClock};

#[derive(Debug)]
pub struct Database {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl Database {
    /// Connects to the given sqlite database, creating file and schema if necessary.
    pub async fn new(url: &str) -> Result<Self> {
        Self::with_clock(url, Arc::new(SystemClock)).await
    }

    /// Same as [`new`](Self::new) but with a caller-provided time source.
    pub async fn with_clock(url: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        let options = url
            .parse::<SqliteConnectOptions>()
            .wrap_err("invalid database url")?
            .create_if_missing(true);

        // An in-memory database lives and dies with its connection so the
        // pool must hold on to a single one and never recycle it.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .wrap_err("failed to connect to database")?;

        let database = Self { pool, clock };
        database.init_schema().await?;

        Ok(database)
    }

    async fn init_schema(&self) -> Result<()> {
        debug!("Initializing schema");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                body VARCHAR(255) NOT NULL,
                username VARCHAR(50) NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(self)
        .await
        .wrap_err("failed to create messages table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages (created_at)")
            .execute(self)
            .await
            .wrap_err("failed to create created_at index")?;

        Ok(())
    }

    /// The current time according to the injected [`Clock`].
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Retrieves a connection and immediately begins a new transaction.
    pub(crate) async fn begin(&self) -> Result<Transaction<'static, Sqlite>, SqlxError> {
        self.pool.begin().await
    }
}

impl<'d, 'p> Executor<'p> for &'d Database {
    type Database = Sqlite;

    #[inline]
    fn fetch_many<'e, 'q: 'e, E>(
        self,
        query: E,
    ) -> BoxStream<'e, Result<Either<SqliteQueryResult, SqliteRow>, SqlxError>>
    where
        'p: 'e,
        E: 'q + Execute<'q, Self::Database>,
    {
        <&SqlitePool as Executor<'p>>::fetch_many(&self.pool, query)
    }

    #[inline]
    fn fetch_optional<'e, 'q: 'e, E>(
        self,
        query: E,
    ) -> BoxFuture<'e, Result<Option<SqliteRow>, SqlxError>>
    where
        'p: 'e,
        E: 'q + Execute<'q, Self::Database>,
    {
        <&SqlitePool as Executor<'p>>::fetch_optional(&self.pool, query)
    }

    #[inline]
    fn prepare_with<'e, 'q: 'e>(
        self,
        sql: &'q str,
        parameters: &'e [SqliteTypeInfo],
    ) -> BoxFuture<'e, Result<SqliteStatement<'q>, SqlxError>>
    where
        'p: 'e,
    {
        <&SqlitePool as Executor<'p>>::prepare_with(&self.pool, sql, parameters)
    }

    #[inline]
    fn describe<'e, 'q: 'e>(
        self,
        sql: &'q str,
    ) -> BoxFuture<'e, Result<Describe<Self::Database>, SqlxError>>
    where
        'p: 'e,
    {
        <&SqlitePool as Executor<'p>>::describe(&self.pool, sql)
    }
}
