use sqlx::{
    Sqlite, pool::PoolConnection, sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
    }
};
use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

use std::{
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};
use anyhow::Context;

pub(super) struct StoreState {
    database_file: PathBuf,
    pool: RwLock<SqlitePool>,
    // SQLite already serializes writers; this keeps id order and timestamp
    // order aligned within the process.
    writer: Mutex<()>,
}

impl std::fmt::Debug for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("database_file", &self.database_file)
            .finish()
    }
}

fn connect_options(database_file: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(database_file)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
}

impl StoreState {
    pub(super) async fn new<P: AsRef<Path>>(database_file: P) -> anyhow::Result<Self> {
        let database_file = database_file.as_ref().to_path_buf();

        if let Some(parent) = database_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                anyhow::bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options(&database_file))
            .await
            .with_context(|| format!("Failed to open database {:?}", database_file))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .with_context(|| format!("Failed to migrate database {:?}", database_file))?;
        log::debug!("Opened detection database {:?}", database_file);

        Ok(Self {
            database_file,
            pool: RwLock::new(pool),
            writer: Mutex::new(()),
        })
    }

    pub(super) fn database_file(&self) -> &Path {
        &self.database_file
    }

    /// Acquire a pooled connection and hold the pool read lock for the entire lifetime
    /// of the returned guard.
    pub(super) async fn conn(&self) -> anyhow::Result<DbConnGuard<'_>> {
        let pool_guard = self.pool.read().await;

        // acquire while the read lock is held; close() cannot run underneath us
        let conn = pool_guard.acquire().await?;

        Ok(DbConnGuard {
            _pool_guard: pool_guard,
            conn,
        })
    }

    /// Exclusive access for a single logical write.
    pub(super) async fn writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }

    /// Waits for in-flight queries, flushes the WAL into the main file and
    /// closes the pool. Later queries fail.
    pub(super) async fn close(&self) -> anyhow::Result<()> {
        let pool_guard = self.pool.write().await;
        if pool_guard.is_closed() {
            return Ok(());
        }

        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&*pool_guard)
            .await?;
        pool_guard.close().await;
        log::debug!("Closed detection database {:?}", self.database_file);
        Ok(())
    }
}

pub struct DbConnGuard<'a> {
    _pool_guard: RwLockReadGuard<'a, SqlitePool>,
    conn: PoolConnection<Sqlite>,
}

impl<'a> Deref for DbConnGuard<'a> {
    type Target = PoolConnection<Sqlite>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<'a> DerefMut for DbConnGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}
