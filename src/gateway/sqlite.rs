//! SQLite Gateway - full-table snapshot reads
//!
//! Every call opens its own read-only connection, runs `SELECT * FROM "<table>"`
//! and closes the connection again before returning, whether the read
//! succeeded or not.

use super::error::{DataSourceError, DataSourceResult};
use super::snapshot::{json_value, Payload, TableSnapshot};
use super::{is_valid_table_name, SnapshotSource};
use crate::config::DataSourceConfig;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Gateway over a single table of an SQLite database file
#[derive(Debug, Clone)]
pub struct SqliteGateway {
    path: PathBuf,
    table: String,
}

impl SqliteGateway {
    /// Create a gateway for `table` in the database at `path`
    ///
    /// The file is not touched until the first snapshot is requested.
    pub fn new(path: impl Into<PathBuf>, table: impl Into<String>) -> DataSourceResult<Self> {
        let table = table.into();
        if !is_valid_table_name(&table) {
            return Err(DataSourceError::InvalidTable(table));
        }

        Ok(Self {
            path: path.into(),
            table,
        })
    }

    /// Create a gateway from the `[data_source]` config section
    ///
    /// A leading `~` in the path is resolved against the home directory.
    pub fn from_config(config: &DataSourceConfig) -> DataSourceResult<Self> {
        Self::new(expand_home(&config.path), config.table.as_str())
    }

    /// Read the whole table into memory
    pub fn query_snapshot(&self) -> DataSourceResult<TableSnapshot> {
        // Without SQLITE_OPEN_CREATE a missing file is reported instead of created
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DataSourceError::Open {
            path: self.path.clone(),
            source: e,
        })?;

        let result = self.read_table(&conn);

        if let Err((_, e)) = conn.close() {
            tracing::warn!(path = ?self.path, error = %e, "Failed to close data source");
        }

        result
    }

    fn read_table(&self, conn: &Connection) -> DataSourceResult<TableSnapshot> {
        let query_err = |e: rusqlite::Error| DataSourceError::Query {
            table: self.table.clone(),
            source: e,
        };

        let sql = format!("SELECT * FROM \"{}\"", self.table);
        let mut stmt = conn.prepare(&sql).map_err(query_err)?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut snapshot = TableSnapshot::new(columns);

        let mut rows = stmt.query([]).map_err(query_err)?;
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(json_value(row.get_ref(idx).map_err(query_err)?));
            }
            snapshot.push_row(values);
        }

        tracing::debug!(table = %self.table, rows = snapshot.len(), "Read table snapshot");
        Ok(snapshot)
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

impl SnapshotSource for SqliteGateway {
    fn fetch_snapshot(&self) -> DataSourceResult<Payload> {
        let snapshot = self.query_snapshot()?;
        Ok(snapshot.to_payload()?)
    }
}
