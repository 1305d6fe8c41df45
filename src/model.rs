//! Data model for sqlforge.
//!
//! Tables, columns, and scalar values, plus the two leaf pieces of the
//! compiler: type inference (a value domain to one SQL type) and literal
//! encoding (one scalar to its SQL text form).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, ForgeResult};

/// The closed set of SQL column types sqlforge emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keyword = match self {
            SqlType::Integer => "INTEGER",
            SqlType::Float => "FLOAT",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Timestamp => "TIMESTAMP",
            SqlType::Text => "TEXT",
        };
        write!(f, "{}", keyword)
    }
}

impl SqlType {
    /// The SQL type of a single value. `Null` carries no type information
    /// and falls back to `Text`.
    pub fn of(value: &ScalarValue) -> SqlType {
        match value {
            ScalarValue::Integer(_) => SqlType::Integer,
            ScalarValue::Float(_) => SqlType::Float,
            ScalarValue::Boolean(_) => SqlType::Boolean,
            ScalarValue::Timestamp(_) => SqlType::Timestamp,
            ScalarValue::Text(_) | ScalarValue::Null => SqlType::Text,
        }
    }

    /// Infer the SQL type of a column from its sampled value domain.
    ///
    /// Precedence is fixed and first match wins: an all-integer domain is
    /// `Integer`; a numeric domain with any float is `Float`; all-boolean is
    /// `Boolean`; all-datetime is `Timestamp`; everything else (mixed,
    /// empty, or all-null) falls back to `Text`. The fallback is silent —
    /// an unrecognized domain is not an error.
    pub fn infer(domain: &[ScalarValue]) -> SqlType {
        let sample: Vec<&ScalarValue> = domain
            .iter()
            .filter(|v| !matches!(v, ScalarValue::Null))
            .collect();

        if sample.is_empty() {
            return SqlType::Text;
        }
        if sample.iter().all(|v| matches!(v, ScalarValue::Integer(_))) {
            return SqlType::Integer;
        }
        if sample
            .iter()
            .all(|v| matches!(v, ScalarValue::Integer(_) | ScalarValue::Float(_)))
        {
            return SqlType::Float;
        }
        if sample.iter().all(|v| matches!(v, ScalarValue::Boolean(_))) {
            return SqlType::Boolean;
        }
        if sample.iter().all(|v| matches!(v, ScalarValue::Timestamp(_))) {
            return SqlType::Timestamp;
        }
        SqlType::Text
    }
}

/// One scalar cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// NULL value
    Null,
    /// Integer
    Integer(i64),
    /// Float
    Float(f64),
    /// Boolean
    Boolean(bool),
    /// Datetime, naive (no zone), second precision
    Timestamp(NaiveDateTime),
    /// String
    Text(String),
}

/// Encodes the value as a SQL literal.
///
/// `Text` is single-quoted with embedded quotes doubled; nothing else is
/// escaped — backslashes pass through untouched. This is the established
/// output contract for generated artifacts, so don't harden it here.
impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Integer(n) => write!(f, "{}", n),
            ScalarValue::Float(n) => write!(f, "{}", n),
            ScalarValue::Boolean(b) => write!(f, "{}", b),
            ScalarValue::Timestamp(t) => write!(f, "'{}'", t.format("%Y-%m-%d %H:%M:%S")),
            ScalarValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

impl ScalarValue {
    /// Convert a JSON cell into a scalar, attaching the type once at
    /// ingestion. Strings in `YYYY-MM-DD HH:MM:SS` or RFC 3339 form become
    /// timestamps; arrays and objects keep their JSON text as `Text`.
    pub fn from_json(value: &serde_json::Value) -> ScalarValue {
        match value {
            serde_json::Value::Null => ScalarValue::Null,
            serde_json::Value::Bool(b) => ScalarValue::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ScalarValue::Integer(i)
                } else {
                    ScalarValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => match parse_timestamp(s) {
                Some(t) => ScalarValue::Timestamp(t),
                None => ScalarValue::Text(s.clone()),
            },
            other => ScalarValue::Text(other.to_string()),
        }
    }
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(t);
    }
    if let Ok(t) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(t.naive_utc());
    }
    None
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Boolean(b)
    }
}

impl From<i32> for ScalarValue {
    fn from(n: i32) -> Self {
        ScalarValue::Integer(n as i64)
    }
}

impl From<i64> for ScalarValue {
    fn from(n: i64) -> Self {
        ScalarValue::Integer(n)
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::Float(n)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Text(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Text(s)
    }
}

impl From<NaiveDateTime> for ScalarValue {
    fn from(t: NaiveDateTime) -> Self {
        ScalarValue::Timestamp(t)
    }
}

/// One row of values, positionally matching a table's column order.
pub type Row = Vec<ScalarValue>;

/// Column definition with its inferred type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// Table definition. Column order is authoritative: it is preserved from
/// ingestion through DDL emission and must match the positional order of
/// every row handed to the seed compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    /// Create a table with no columns yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column, keeping declaration order.
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }
}

/// Raw tabular input as it arrives from a JSON dataset file.
///
/// Rows are positional arrays matching `columns`; ingestion attaches the
/// type tag to each column exactly once, by inference over the column's
/// value domain.
///
/// ```json
/// {
///     "table": "users",
///     "columns": ["id", "name"],
///     "rows": [[1, "Ada"], [2, "O'Brien"]]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Dataset {
    /// Load a dataset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Convert the raw cells into typed rows and an inferred table
    /// definition. A row whose arity does not match the column list is a
    /// configuration error caught here, at ingestion.
    pub fn into_table(self) -> ForgeResult<(Table, Vec<Row>)> {
        let mut rows: Vec<Row> = Vec::with_capacity(self.rows.len());
        for (i, raw) in self.rows.iter().enumerate() {
            if raw.len() != self.columns.len() {
                return Err(ForgeError::config(format!(
                    "row {} has {} values, expected {}",
                    i,
                    raw.len(),
                    self.columns.len()
                )));
            }
            rows.push(raw.iter().map(ScalarValue::from_json).collect());
        }

        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let domain: Vec<ScalarValue> = rows.iter().map(|r| r[idx].clone()).collect();
                Column::new(name.clone(), SqlType::infer(&domain))
            })
            .collect();

        Ok((
            Table {
                name: self.table,
                columns,
            },
            rows,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_infer_integer_domain() {
        let domain: Vec<ScalarValue> = vec![1i64.into(), ScalarValue::Null, 3i64.into()];
        assert_eq!(SqlType::infer(&domain), SqlType::Integer);
    }

    #[test]
    fn test_infer_float_domain() {
        // Ints mixed into a float column stay numeric.
        let domain: Vec<ScalarValue> = vec![1i64.into(), 2.5f64.into()];
        assert_eq!(SqlType::infer(&domain), SqlType::Float);
    }

    #[test]
    fn test_infer_boolean_and_timestamp_domains() {
        let bools: Vec<ScalarValue> = vec![true.into(), false.into()];
        assert_eq!(SqlType::infer(&bools), SqlType::Boolean);

        let times: Vec<ScalarValue> = vec![ts("2024-01-01 00:00:00").into()];
        assert_eq!(SqlType::infer(&times), SqlType::Timestamp);
    }

    #[test]
    fn test_infer_fallback_is_text() {
        let mixed: Vec<ScalarValue> = vec![1i64.into(), "x".into()];
        assert_eq!(SqlType::infer(&mixed), SqlType::Text);

        let empty: Vec<ScalarValue> = vec![];
        assert_eq!(SqlType::infer(&empty), SqlType::Text);

        let all_null = vec![ScalarValue::Null, ScalarValue::Null];
        assert_eq!(SqlType::infer(&all_null), SqlType::Text);
    }

    #[test]
    fn test_literal_encoding() {
        assert_eq!(ScalarValue::Null.to_string(), "NULL");
        assert_eq!(ScalarValue::Integer(42).to_string(), "42");
        assert_eq!(ScalarValue::Boolean(true).to_string(), "true");
        assert_eq!(ScalarValue::Text("hello".into()).to_string(), "'hello'");
        assert_eq!(
            ScalarValue::Timestamp(ts("2024-06-01 12:30:00")).to_string(),
            "'2024-06-01 12:30:00'"
        );
    }

    #[test]
    fn test_literal_quote_doubling_roundtrip() {
        let cases = ["O'Brien", "''", "a'b'c", "'leading", "trailing'"];
        for original in cases {
            let literal = ScalarValue::Text(original.to_string()).to_string();
            // Decode under standard single-quote SQL rules.
            let inner = &literal[1..literal.len() - 1];
            assert_eq!(inner.replace("''", "'"), original);
        }
    }

    #[test]
    fn test_literal_leaves_backslashes_alone() {
        assert_eq!(
            ScalarValue::Text(r"C:\temp".into()).to_string(),
            r"'C:\temp'"
        );
    }

    #[test]
    fn test_from_json_cells() {
        use serde_json::json;
        assert_eq!(ScalarValue::from_json(&json!(null)), ScalarValue::Null);
        assert_eq!(ScalarValue::from_json(&json!(7)), ScalarValue::Integer(7));
        assert_eq!(ScalarValue::from_json(&json!(2.5)), ScalarValue::Float(2.5));
        assert_eq!(
            ScalarValue::from_json(&json!("2024-01-01 00:00:00")),
            ScalarValue::Timestamp(ts("2024-01-01 00:00:00"))
        );
        assert_eq!(
            ScalarValue::from_json(&json!("plain text")),
            ScalarValue::Text("plain text".into())
        );
    }

    #[test]
    fn test_dataset_ingestion() {
        let dataset = Dataset::from_json(
            r#"{
                "table": "users",
                "columns": ["id", "name"],
                "rows": [[1, "Ada"], [2, null]]
            }"#,
        )
        .unwrap();

        let (table, rows) = dataset.into_table().unwrap();
        assert_eq!(table.name, "users");
        assert_eq!(
            table.columns,
            vec![
                Column::new("id", SqlType::Integer),
                Column::new("name", SqlType::Text),
            ]
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![ScalarValue::Integer(2), ScalarValue::Null]);
    }

    #[test]
    fn test_dataset_arity_mismatch_is_config_error() {
        let dataset = Dataset {
            table: "t".into(),
            columns: vec!["a".into(), "b".into()],
            rows: vec![vec![serde_json::json!(1)]],
        };
        let err = dataset.into_table().unwrap_err();
        assert!(matches!(err, ForgeError::Config(_)));
    }
}
