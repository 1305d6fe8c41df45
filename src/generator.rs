//! DDL/DML artifact generation.
//!
//! Compiles a [`Table`] into a `CREATE TABLE` statement and rows into
//! `INSERT` statements, and writes the resulting text to artifact files.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::ForgeResult;
use crate::model::{Row, Table};

/// Generate the `CREATE TABLE` statement for a table.
///
/// Column names are double-quoted to preserve case and dodge reserved-word
/// collisions; the table name is emitted bare. Columns appear in declaration
/// order.
pub fn create_table_sql(table: &Table) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|col| format!("\"{}\" {}", col.name, col.sql_type))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
        table.name,
        columns.join(",\n")
    )
}

/// Generate one `INSERT` statement per row, newline-joined in input order.
///
/// No column list is emitted, so rows must match the table's column arity
/// and positional order — that is the caller's obligation, not checked here.
/// Nothing is reordered or deduplicated.
pub fn insert_sql(table: &Table, rows: &[Row]) -> String {
    let statements: Vec<String> = rows
        .iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            format!("INSERT INTO {} VALUES ({});", table.name, values.join(", "))
        })
        .collect();
    statements.join("\n")
}

/// Write SQL text to a file, creating missing parent directories first.
/// The handle is scoped to this call and released on every exit path.
pub fn write_query_file(path: impl AsRef<Path>, sql: &str) -> ForgeResult<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    fs::write(path, sql)?;
    info!(path = %path.display(), "query written");
    Ok(())
}

/// Compile a table's schema and write it to `path`, returning the DDL text.
pub fn generate_schema(table: &Table, path: impl AsRef<Path>) -> ForgeResult<String> {
    info!(table = %table.name, "generating schema");
    let sql = create_table_sql(table);
    write_query_file(path, &sql)?;
    Ok(sql)
}

/// Compile seed inserts for `rows` and write them to `path`, returning the
/// DML text.
pub fn generate_seed(table: &Table, rows: &[Row], path: impl AsRef<Path>) -> ForgeResult<String> {
    info!(table = %table.name, rows = rows.len(), "generating seed data");
    let sql = insert_sql(table, rows);
    write_query_file(path, &sql)?;
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Column, ScalarValue, SqlType};
    use pretty_assertions::assert_eq;

    fn my_table() -> Table {
        Table {
            name: "my_table".into(),
            columns: vec![
                Column::new("id", SqlType::Integer),
                Column::new("name", SqlType::Text),
            ],
        }
    }

    #[test]
    fn test_create_table_sql() {
        assert_eq!(
            create_table_sql(&my_table()),
            "CREATE TABLE IF NOT EXISTS my_table (\n\"id\" INTEGER,\n\"name\" TEXT\n);"
        );
    }

    #[test]
    fn test_insert_sql_null_and_quote() {
        let rows = vec![vec![ScalarValue::Null, ScalarValue::Text("O'Brien".into())]];
        assert_eq!(
            insert_sql(&my_table(), &rows),
            "INSERT INTO my_table VALUES (NULL, 'O''Brien');"
        );
    }

    #[test]
    fn test_insert_sql_one_statement_per_row_in_order() {
        let rows: Vec<Row> = (0..4)
            .map(|i| vec![ScalarValue::Integer(i), ScalarValue::Text(format!("u{}", i))])
            .collect();
        let sql = insert_sql(&my_table(), &rows);
        let lines: Vec<&str> = sql.lines().collect();
        assert_eq!(lines.len(), 4);
        for (i, line) in lines.iter().enumerate() {
            assert_eq!(
                *line,
                format!("INSERT INTO my_table VALUES ({}, 'u{}');", i, i)
            );
        }
    }

    #[test]
    fn test_insert_sql_empty_rows() {
        assert_eq!(insert_sql(&my_table(), &[]), "");
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sql").join("nested").join("schema.sql");
        let sql = generate_schema(&my_table(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), sql);
    }

    #[test]
    fn test_generate_seed_writes_and_returns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seed_data.sql");
        let rows = vec![
            vec![ScalarValue::Integer(1), ScalarValue::Text("Ada".into())],
            vec![ScalarValue::Integer(2), ScalarValue::Null],
        ];
        let sql = generate_seed(&my_table(), &rows, &path).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO my_table VALUES (1, 'Ada');\nINSERT INTO my_table VALUES (2, NULL);"
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), sql);
    }
}
