//! Database workload: full CRUD cycle on a scratch table.
//!
//! The connection is never owned here. The caller injects a
//! [`QueryExecutor`] through [`WorkloadParams::Db`] and keeps responsibility
//! for acquiring and releasing it.

use crate::error::{BoxError, ConfigError};
use crate::workload::{QueryExecutor, WorkloadParams};

/// Scratch table name, appended to the caller's prefix.
pub const DUMMY_TABLE_NAME: &str = "stability_meter_dummy";

/// Rows inserted by the single bulk insert.
pub const ROW_COUNT: usize = 63;

/// Length of the filler string stored in each row.
pub const FILLER_LEN: usize = 256;

const UPDATE_MARKER: &str = "StabilityMeter";

/// Missing executor for the database workload.
#[derive(Debug, thiserror::Error)]
#[error("db workload requires a query executor")]
pub struct MissingExecutor;

/// Run one CRUD cycle through the executor carried in `params`.
pub fn run_once(params: &mut WorkloadParams<'_>) -> Result<(), BoxError> {
    match params {
        WorkloadParams::Db(db) => run_cycle(&mut *db.executor, &db.table_prefix),
        WorkloadParams::None => Err(Box::new(MissingExecutor)),
    }
}

/// Whether `prefix` can be pasted into a table name as is.
pub fn is_valid_table_prefix(prefix: &str) -> bool {
    prefix.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Execute every statement of the cycle in order, stopping at the first fault.
///
/// A prefix outside `[A-Za-z0-9_]` is rejected before anything is executed.
pub fn run_cycle(executor: &mut dyn QueryExecutor, table_prefix: &str) -> Result<(), BoxError> {
    if !is_valid_table_prefix(table_prefix) {
        return Err(Box::new(ConfigError::InvalidTablePrefix(table_prefix.to_string())));
    }
    for sql in statements(table_prefix) {
        executor.execute(&sql)?;
    }
    Ok(())
}

/// The six statements of one cycle: create, insert, select, update,
/// delete, drop.
fn statements(table_prefix: &str) -> Vec<String> {
    let table = format!("{table_prefix}{DUMMY_TABLE_NAME}");
    let filler = "Z".repeat(FILLER_LEN);
    let values = vec![format!("('{filler}')"); ROW_COUNT].join(",");

    vec![
        format!("CREATE TABLE IF NOT EXISTS {table} (dummydata text NOT NULL DEFAULT '')"),
        format!("INSERT INTO {table} (dummydata) VALUES {values}"),
        format!("SELECT * FROM {table}"),
        format!("UPDATE {table} SET dummydata = '{UPDATE_MARKER}'"),
        format!("DELETE FROM {table}"),
        format!("DROP TABLE IF EXISTS {table}"),
    ]
}

/// [`QueryExecutor`] over a SQLite connection.
#[cfg(feature = "sqlite")]
pub struct SqliteExecutor {
    conn: rusqlite::Connection,
}

#[cfg(feature = "sqlite")]
impl SqliteExecutor {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<std::path::Path>) -> rusqlite::Result<Self> {
        Ok(Self {
            conn: rusqlite::Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Ok(Self {
            conn: rusqlite::Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }
}

#[cfg(feature = "sqlite")]
impl QueryExecutor for SqliteExecutor {
    fn execute(&mut self, sql: &str) -> Result<(), BoxError> {
        // Step through every row so SELECTs do the same work as on a real client.
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        while rows.next()?.is_some() {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingExecutor {
        statements: Vec<String>,
        fail_on: Option<&'static str>,
    }

    impl QueryExecutor for RecordingExecutor {
        fn execute(&mut self, sql: &str) -> Result<(), BoxError> {
            if let Some(prefix) = self.fail_on {
                if sql.starts_with(prefix) {
                    return Err(format!("rejected: {prefix}").into());
                }
            }
            self.statements.push(sql.to_string());
            Ok(())
        }
    }

    #[test]
    fn should_issue_full_crud_cycle_in_order() {
        let mut exec = RecordingExecutor::default();
        run_once(&mut WorkloadParams::db(&mut exec, "wp_")).unwrap();

        let verbs: Vec<_> = exec
            .statements
            .iter()
            .map(|s| s.split_whitespace().next().unwrap())
            .collect();
        assert_eq!(verbs, ["CREATE", "INSERT", "SELECT", "UPDATE", "DELETE", "DROP"]);
        assert!(exec
            .statements
            .iter()
            .all(|s| s.contains("wp_stability_meter_dummy")));
    }

    #[test]
    fn should_insert_63_rows_of_256_bytes() {
        let stmts = statements("");
        let insert = &stmts[1];
        let row = format!("('{}')", "Z".repeat(FILLER_LEN));
        assert_eq!(insert.matches(&row).count(), ROW_COUNT);
    }

    #[test]
    fn should_fail_when_executor_missing() {
        let err = run_once(&mut WorkloadParams::None).unwrap_err();
        assert!(err.to_string().contains("query executor"));
    }

    #[test]
    fn should_stop_at_first_fault() {
        let mut exec = RecordingExecutor {
            fail_on: Some("SELECT"),
            ..Default::default()
        };
        let err = run_cycle(&mut exec, "").unwrap_err();
        assert!(err.to_string().contains("SELECT"));
        assert_eq!(exec.statements.len(), 2);
    }

    #[test]
    fn should_reject_prefix_when_not_identifier_safe() {
        let mut exec = RecordingExecutor::default();
        for prefix in ["x; DROP TABLE users; --", "a b", "wp-", "t'"] {
            let err = run_cycle(&mut exec, prefix).unwrap_err();
            assert!(err.to_string().contains("table prefix"), "{prefix}");
        }
        assert!(exec.statements.is_empty());
        assert!(is_valid_table_prefix(""));
        assert!(is_valid_table_prefix("Wp_2"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn should_run_cycle_against_sqlite() {
        let mut exec = SqliteExecutor::open_in_memory().unwrap();
        run_cycle(&mut exec, "t1_").unwrap();
        run_cycle(&mut exec, "t1_").unwrap();

        let tables: i64 = exec
            .connection()
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE name = 't1_stability_meter_dummy'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }
}
