//! Data Query Gateway
//!
//! Turns the configured table into a transport-ready text payload.
//!
//! ## Architecture
//!
//! - **SnapshotSource**: the seam the exchange loop calls on every trigger
//! - **SqliteGateway**: scoped read-only connection + `SELECT *` per call
//! - **TableSnapshot**: ordered rows, encoded as a JSON array of objects

mod error;
mod snapshot;
mod sqlite;

pub use error::{DataSourceError, DataSourceResult};
pub use snapshot::{json_value, Payload, Row, TableSnapshot};
pub use sqlite::SqliteGateway;

/// Anything that can produce a fresh snapshot payload on demand
///
/// Implementations are called synchronously from the exchange loop; a call
/// is not cancellable once started.
pub trait SnapshotSource: Send + Sync {
    fn fetch_snapshot(&self) -> DataSourceResult<Payload>;
}

/// Check that a table name is a plain identifier that can be quoted safely
///
/// Accepts ASCII letters, digits and underscores, not starting with a digit.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_table_names() {
        assert!(is_valid_table_name("actor"));
        assert!(is_valid_table_name("_staging"));
        assert!(is_valid_table_name("film_actor2"));

        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("2fast"));
        assert!(!is_valid_table_name("actor name"));
        assert!(!is_valid_table_name("actor\""));
        assert!(!is_valid_table_name("main.actor"));
    }
}
