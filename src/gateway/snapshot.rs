//! Table Snapshot
//!
//! In-memory materialization of a full-table read. Rows keep their column
//! order, and the JSON encoding is an array of objects whose keys follow that
//! order, e.g. `[{"id":1,"name":"A"}]`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rusqlite::types::ValueRef;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::Value;

/// Serialized snapshot text, ready to be sent as a single text frame
pub type Payload = String;

/// Column names plus rows of values, in the order the data source returned them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSnapshot {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Borrowed view of one row: an ordered column → value mapping
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl TableSnapshot {
    /// Create an empty snapshot with the given column layout
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Missing trailing values are padded with null and extra
    /// values are dropped so every row matches the column layout.
    pub fn push_row(&mut self, mut values: Vec<Value>) {
        values.resize(self.columns.len(), Value::Null);
        self.rows.push(values);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows in result order
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |values| Row {
            columns: &self.columns,
            values,
        })
    }

    /// Encode the snapshot as JSON text
    pub fn to_payload(&self) -> Result<Payload, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<'a> Row<'a> {
    /// Value of a column by name (first match if names repeat)
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let values = self.values;
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &values[idx])
    }

    /// Column/value pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        let (columns, values) = (self.columns, self.values);
        columns.iter().map(String::as_str).zip(values.iter())
    }
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl Serialize for TableSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows() {
            seq.serialize_element(&row)?;
        }
        seq.end()
    }
}

/// Convert a SQLite cell into its JSON representation
///
/// Non-finite reals become null; BLOBs are base64 encoded.
pub fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(STANDARD.encode(bytes)),
    }
}
