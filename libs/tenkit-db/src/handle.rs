//! Database handle and typed connection options.

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tenkit_errors::Error;

use crate::Result;
use crate::policy::TenantPolicy;
use crate::repo::Repository;

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

/// Typed connection options; each backend applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    pub max_lifetime: Option<Duration>,
    /// Whether to log every SQL statement through `tracing`.
    pub sqlx_logging: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            sqlx_logging: false,
        }
    }
}

/// Main handle: the shared connection pool plus engine metadata.
///
/// Cloning shares the pool. The handle itself never holds a connection
/// outside a single operation or a single `execute` block.
#[derive(Clone)]
pub struct DbHandle {
    engine: DbEngine,
    sea: DatabaseConnection,
}

impl std::fmt::Debug for DbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbHandle")
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl DbHandle {
    /// Detect engine by DSN scheme prefix. The tail (credentials etc.) is
    /// not inspected.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the scheme is not recognized.
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("mysql://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(Error::invalid_argument(format!("unknown DSN scheme: {dsn}")))
        }
    }

    /// Connect and build the handle.
    ///
    /// # Errors
    /// Returns `InvalidArgument` for an unrecognized DSN and `Unavailable`
    /// when the database cannot be reached.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;

        let mut conn_opts = ConnectOptions::new(dsn.to_owned());
        if let Some(max) = opts.max_conns {
            conn_opts.max_connections(max);
        }
        if let Some(min) = opts.min_conns {
            conn_opts.min_connections(min);
        }
        if let Some(timeout) = opts.acquire_timeout {
            conn_opts.connect_timeout(timeout);
        }
        if let Some(timeout) = opts.idle_timeout {
            conn_opts.idle_timeout(timeout);
        }
        if let Some(lifetime) = opts.max_lifetime {
            conn_opts.max_lifetime(lifetime);
        }
        conn_opts.sqlx_logging(opts.sqlx_logging);

        let sea = Database::connect(conn_opts)
            .await
            .map_err(|e| Error::wrap(tenkit_errors::ErrorCode::Unavailable, "database connect failed", e))?;

        Ok(Self { engine, sea })
    }

    /// Graceful pool close. Dropping the handle also closes it; this just
    /// makes it explicit.
    ///
    /// # Errors
    /// Returns `Internal` if the pool fails to shut down cleanly.
    pub async fn close(self) -> Result<()> {
        self.sea
            .close()
            .await
            .map_err(|e| Error::wrap(tenkit_errors::ErrorCode::Internal, "database close failed", e))
    }

    /// Get the backend.
    #[must_use]
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Build a repository for `E` backed by this handle.
    #[must_use]
    pub fn repository<E>(&self) -> Repository<E>
    where
        E: TenantPolicy,
    {
        Repository::new(self.clone())
    }

    /// Raw connection access for infrastructure code (schema setup, ad-hoc
    /// maintenance queries).
    ///
    /// # Security
    ///
    /// Queries issued here bypass tenant scoping entirely. Application code
    /// goes through [`Repository`](crate::Repository).
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.sea
    }

    pub(crate) fn sea(&self) -> &DatabaseConnection {
        &self.sea
    }
}
