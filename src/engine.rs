//! Transactional query-file execution.
//!
//! A [`ConnectionManager`] owns at most one live database connection; the
//! executor functions drive it through a strict read file → connect →
//! execute → commit-or-rollback → close sequence. Every call opens its own
//! fresh connection — isolation is traded for efficiency on purpose, so one
//! failed call can never leak an open transaction into the next.
//!
//! Backed by sqlx's `Any` driver: Postgres in production, SQLite in tests.

use std::fs;
use std::path::Path;

use sqlx::any::AnyRow;
use sqlx::{AnyConnection, Column, Connection, Executor, Row as _, TypeInfo};
use tracing::{error, info, warn};

use crate::error::{ForgeError, ForgeResult};
use crate::model::{Row, ScalarValue, parse_timestamp};

/// Connection lifecycle state.
///
/// Legal transitions: `Disconnected → Connected → (Committed | RolledBack)
/// → Disconnected`, or straight back to `Disconnected` for read-only use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Disconnected,
    Connected,
    Committed,
    RolledBack,
}

/// Owns the lifecycle of a single database connection.
///
/// Construct one per invocation or unit of work and pass it by reference —
/// there is no ambient global instance. Not safe for concurrent use; the
/// `&mut` receivers make the single-caller rule a compile-time fact.
pub struct ConnectionManager {
    url: String,
    conn: Option<AnyConnection>,
    state: ConnState,
}

impl ConnectionManager {
    /// Create a manager for the given connection URL. No connection is
    /// opened until [`connect`](Self::connect).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: None,
            state: ConnState::Disconnected,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Open the connection. Fails with a `Connection` error on bad
    /// credentials or an unreachable host; never retries. Calling this while
    /// a connection is already open is an error — the manager holds at most
    /// one open connection at a time.
    pub async fn connect(&mut self) -> ForgeResult<()> {
        if self.conn.is_some() {
            return Err(ForgeError::connection("already connected"));
        }
        sqlx::any::install_default_drivers();

        let conn = AnyConnection::connect(&self.url).await.map_err(|e| {
            error!(error = %e, "error connecting to database");
            ForgeError::connection(e)
        })?;
        self.conn = Some(conn);
        self.state = ConnState::Connected;
        info!("connected to database");
        Ok(())
    }

    /// Close the connection if one is open. Idempotent, and never propagates
    /// a cleanup failure past this point — a close error is logged and
    /// dropped.
    pub async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                warn!(error = %e, "error closing connection");
            } else {
                info!("connection closed");
            }
        }
        self.state = ConnState::Disconnected;
    }

    fn conn_mut(&mut self) -> ForgeResult<&mut AnyConnection> {
        self.conn
            .as_mut()
            .ok_or_else(|| ForgeError::connection("not connected"))
    }
}

/// Tagged disposition of one transactional execution.
///
/// Callers branch on this value instead of catching errors to learn whether
/// the transaction committed. [`RolledBack`](ExecOutcome::RolledBack)
/// carries the original execution error unchanged.
#[derive(Debug)]
pub enum ExecOutcome {
    /// The transaction committed; `rows` holds the fetched result set when
    /// one was requested and produced.
    Committed { rows: Option<Vec<Row>> },
    /// Execution failed and the transaction was rolled back.
    RolledBack { reason: ForgeError },
}

impl ExecOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ExecOutcome::Committed { .. })
    }

    /// Collapse the outcome back into a plain result, re-raising the
    /// rollback reason for callers that want error propagation.
    pub fn into_rows(self) -> ForgeResult<Option<Vec<Row>>> {
        match self {
            ExecOutcome::Committed { rows } => Ok(rows),
            ExecOutcome::RolledBack { reason } => Err(reason),
        }
    }
}

/// Execute a query file inside a single transaction.
///
/// The file's full text is passed to the driver as one opaque batch — no
/// client-side statement splitting. On success the transaction commits and,
/// when `fetch_results` is set, all produced rows are returned. On an
/// execution failure the transaction rolls back and the original error is
/// captured as the outcome's reason. The connection is closed
/// unconditionally before this function returns, even when commit or
/// rollback itself failed.
///
/// Errors outside the transaction (unreadable file, failed connect) surface
/// as `Err`; the transaction disposition itself is the returned
/// [`ExecOutcome`].
pub async fn execute_query_file(
    manager: &mut ConnectionManager,
    path: impl AsRef<Path>,
    fetch_results: bool,
) -> ForgeResult<ExecOutcome> {
    let path = path.as_ref();
    let sql = fs::read_to_string(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "error reading query file");
        ForgeError::from(e)
    })?;
    info!(path = %path.display(), "executing query file");

    manager.connect().await?;
    let outcome = run_transaction(manager, &sql, fetch_results).await;
    manager.close().await;
    outcome
}

async fn run_transaction(
    manager: &mut ConnectionManager,
    sql: &str,
    fetch_results: bool,
) -> ForgeResult<ExecOutcome> {
    let conn = manager.conn_mut()?;
    let mut tx = conn.begin().await.map_err(ForgeError::execution)?;

    let result = if fetch_results {
        (&mut *tx)
            .fetch_all(sql)
            .await
            .map(|rows| Some(rows.iter().map(decode_row).collect::<Vec<Row>>()))
    } else {
        (&mut *tx).execute(sql).await.map(|_| None)
    };

    match result {
        Ok(rows) => {
            tx.commit().await.map_err(ForgeError::execution)?;
            manager.state = ConnState::Committed;
            info!("transaction committed");
            Ok(ExecOutcome::Committed { rows })
        }
        Err(e) => {
            error!(error = %e, "error executing query, rolling back");
            let reason = ForgeError::execution(&e);
            if let Err(rb) = tx.rollback().await {
                warn!(error = %rb, "rollback failed");
            }
            manager.state = ConnState::RolledBack;
            Ok(ExecOutcome::RolledBack { reason })
        }
    }
}

/// A fetched result set: ordered column names paired with ordered rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl DataFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read-only sibling of [`execute_query_file`]: always fetches, pairs the
/// rows with their column names, and issues no explicit commit or rollback.
/// Intended for read-only statements; any error propagates after the
/// unconditional close.
///
/// The `Any` driver only exposes column metadata through rows, so a zero-row
/// result comes back with an empty column list.
pub async fn fetch_dataframe(
    manager: &mut ConnectionManager,
    path: impl AsRef<Path>,
) -> ForgeResult<DataFrame> {
    let path = path.as_ref();
    let sql = fs::read_to_string(path)?;
    info!(path = %path.display(), "fetching query file");

    manager.connect().await?;
    let result = match manager.conn_mut() {
        Ok(conn) => (&mut *conn).fetch_all(sql.as_str()).await.map_err(|e| {
            error!(error = %e, "error executing query");
            ForgeError::execution(e)
        }),
        Err(e) => Err(e),
    };
    manager.close().await;

    let any_rows = result?;
    let columns = any_rows
        .first()
        .map(|row| {
            row.columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect()
        })
        .unwrap_or_default();
    let rows = any_rows.iter().map(decode_row).collect();
    Ok(DataFrame { columns, rows })
}

/// Decode a driver row into scalars by column type name. Cells the driver
/// cannot hand back in a matching Rust type become `Null`.
fn decode_row(row: &AnyRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| match column.type_info().name() {
            "BOOL" | "BOOLEAN" => row
                .try_get::<bool, _>(i)
                .map(ScalarValue::Boolean)
                .unwrap_or(ScalarValue::Null),
            "INT2" | "INT4" | "INT8" | "INTEGER" | "BIGINT" | "SMALLINT" => row
                .try_get::<i64, _>(i)
                .map(ScalarValue::Integer)
                .unwrap_or(ScalarValue::Null),
            "FLOAT4" | "FLOAT8" | "REAL" | "DOUBLE" => row
                .try_get::<f64, _>(i)
                .map(ScalarValue::Float)
                .unwrap_or(ScalarValue::Null),
            "TIMESTAMP" | "TIMESTAMPTZ" | "DATETIME" => row
                .try_get::<String, _>(i)
                .map(|s| match parse_timestamp(&s) {
                    Some(t) => ScalarValue::Timestamp(t),
                    None => ScalarValue::Text(s),
                })
                .unwrap_or(ScalarValue::Null),
            _ => row
                .try_get::<String, _>(i)
                .map(ScalarValue::Text)
                .unwrap_or(ScalarValue::Null),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_manager_is_disconnected() {
        let manager = ConnectionManager::new("sqlite::memory:");
        assert_eq!(manager.state(), ConnState::Disconnected);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_when_nothing_open() {
        let mut manager = ConnectionManager::new("sqlite::memory:");
        manager.close().await;
        manager.close().await;
        assert_eq!(manager.state(), ConnState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_bad_url_is_connection_error() {
        let mut manager = ConnectionManager::new("postgres://nobody@127.0.0.1:1/nope");
        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, ForgeError::Connection(_)));
        assert_eq!(manager.state(), ConnState::Disconnected);
    }

    #[tokio::test]
    async fn test_double_connect_is_rejected() {
        let mut manager = ConnectionManager::new("sqlite::memory:");
        manager.connect().await.unwrap();
        assert_eq!(manager.state(), ConnState::Connected);

        let err = manager.connect().await.unwrap_err();
        assert!(matches!(err, ForgeError::Connection(_)));

        manager.close().await;
        assert_eq!(manager.state(), ConnState::Disconnected);
    }

    #[test]
    fn test_outcome_into_rows() {
        let committed = ExecOutcome::Committed { rows: None };
        assert!(committed.into_rows().unwrap().is_none());

        let rolled_back = ExecOutcome::RolledBack {
            reason: ForgeError::execution("boom"),
        };
        assert!(matches!(
            rolled_back.into_rows(),
            Err(ForgeError::Execution(_))
        ));
    }
}
