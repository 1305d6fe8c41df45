//! # sqlforge
//!
//! Turn tabular data into SQL artifacts, and run SQL query files against a
//! database with transactional safety.
//!
//! Two halves:
//!
//! - **Compiler** — infer a SQL type per column, encode scalar values as SQL
//!   literals, and emit `CREATE TABLE` / `INSERT` artifacts to files.
//! - **Executor** — drive a single connection through a
//!   connect/execute/commit-or-rollback/close lifecycle for one query file.
//!
//! ## Quick example
//!
//! ```rust,ignore
//! use sqlforge::prelude::*;
//!
//! let dataset = Dataset::from_json(r#"{
//!     "table": "users",
//!     "columns": ["id", "name"],
//!     "rows": [[1, "Ada"], [2, "O'Brien"]]
//! }"#)?;
//! let (table, rows) = dataset.into_table()?;
//!
//! generate_schema(&table, "sql/schema.sql")?;
//! generate_seed(&table, &rows, "sql/seed_data.sql")?;
//!
//! let mut manager = ConnectionManager::new(config.url());
//! let outcome = execute_query_file(&mut manager, "sql/schema.sql", false).await?;
//! assert!(outcome.is_committed());
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod model;

pub mod prelude {
    pub use crate::config::DbConfig;
    pub use crate::engine::{
        execute_query_file, fetch_dataframe, ConnState, ConnectionManager, DataFrame, ExecOutcome,
    };
    pub use crate::error::{ForgeError, ForgeResult};
    pub use crate::generator::{
        create_table_sql, generate_schema, generate_seed, insert_sql, write_query_file,
    };
    pub use crate::model::{Column, Dataset, Row, ScalarValue, SqlType, Table};
}
