//! Sales data query tool
//!
//! Runs agent-written SQLite queries against the read-only sales database.
//! Every call opens its own connection on a blocking thread, so concurrent
//! calls never share a statement or result buffer.
//!
//! The tool never fails from the run's point of view: query errors are sent
//! back as `{"error", "query"}` so the agent can correct itself.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::core::{AgentError, Result, ToolCall, ToolDefinition};
use crate::tools::codec::{decode_arguments, encode_query_error, encode_result, FetchSalesDataArgs};
use crate::tools::registry::Tool;

/// Name the agent uses to request a query
pub const FETCH_SALES_DATA_TOOL: &str = "fetch_sales_data_using_sqlite_query";

/// Returned instead of an empty table so the agent can answer in prose
pub const NO_RESULTS: &str = "The query returned no results. Try a different question.";

/// Distinct-value summaries appended to the schema description
const SALES_SUMMARIES: &[(&str, &str, bool)] = &[
    ("Regions", "region", false),
    ("Product Types", "product_type", false),
    ("Product Categories", "main_category", false),
    ("Reporting Years", "year", true),
];

/// Column name -> values, in projection order
pub type ColumnTable = Map<String, Value>;

/// Handle on the read-only sales database
#[derive(Debug, Clone)]
pub struct SalesData {
    database_path: PathBuf,
}

impl SalesData {
    /// Point at the database file; a missing file is a setup error
    pub fn open(database_path: impl Into<PathBuf>) -> Result<Self> {
        let database_path = database_path.into();
        if !database_path.is_file() {
            return Err(AgentError::setup(format!(
                "Database file not found at {}",
                database_path.display()
            )));
        }
        Ok(Self { database_path })
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Execute `query` verbatim and serialize the outcome
    pub async fn fetch_sales_data(&self, query: &str) -> String {
        info!(tool = FETCH_SALES_DATA_TOOL, query, "Executing query");

        let path = self.database_path.clone();
        let sql = query.to_string();
        let result = tokio::task::spawn_blocking(move || run_query(&path, &sql)).await;

        match result {
            Ok(Ok(None)) => NO_RESULTS.to_string(),
            Ok(Ok(Some(table))) => encode_result(&table)
                .unwrap_or_else(|e| encode_query_error(e.to_string(), query)),
            Ok(Err(e)) => {
                debug!(error = %e, "Query failed");
                encode_query_error(e.to_string(), query)
            }
            Err(e) => encode_query_error(format!("Query task failed: {}", e), query),
        }
    }

    /// Describe tables, columns and the main sales dimensions for the instructions
    pub async fn database_info(&self) -> Result<String> {
        let path = self.database_path.clone();
        tokio::task::spawn_blocking(move || describe(&path))
            .await
            .map_err(|e| AgentError::Other(format!("Schema task failed: {}", e)))?
            .map_err(AgentError::from)
    }
}

fn connect(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

/// Run a query, returning `None` when it produced no rows
fn run_query(path: &Path, query: &str) -> rusqlite::Result<Option<ColumnTable>> {
    let conn = connect(path)?;
    let mut stmt = conn.prepare(query)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut values: Vec<Vec<Value>> = vec![Vec::new(); columns.len()];

    let mut row_count = 0usize;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (index, column) in values.iter_mut().enumerate() {
            column.push(json_value(row.get_ref(index)?));
        }
        row_count += 1;
    }

    if row_count == 0 {
        return Ok(None);
    }

    let mut table = ColumnTable::new();
    for (name, column) in unique_column_names(columns).into_iter().zip(values) {
        table.insert(name, Value::Array(column));
    }
    Ok(Some(table))
}

/// Suffix repeated column names (`id`, `id_1`, `id_2`) so joins keep every column
fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut taken = HashSet::new();
    columns
        .into_iter()
        .map(|name| {
            let mut unique = name.clone();
            let mut suffix = 1;
            while taken.contains(&unique) {
                unique = format!("{}_{}", name, suffix);
                suffix += 1;
            }
            taken.insert(unique.clone());
            unique
        })
        .collect()
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

fn display_value(value: ValueRef<'_>) -> String {
    match json_value(value) {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn describe(path: &Path) -> rusqlite::Result<String> {
    let conn = connect(path)?;
    let mut description = String::new();

    let mut tables_stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'")?;
    let tables: Vec<String> = tables_stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    let mut columns_stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
    let mut sales_columns = HashSet::new();

    for table in &tables {
        let columns: Vec<(String, String)> = columns_stmt
            .query_map([table], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        if table == "sales_data" {
            sales_columns.extend(columns.iter().map(|(name, _)| name.clone()));
        }

        let listed: Vec<String> = columns
            .iter()
            .map(|(name, kind)| format!("{}: ({})", name, kind))
            .collect();
        description.push_str(&format!(
            "Table {} Schema: Columns: {}\n",
            table,
            listed.join(", ")
        ));
    }

    for (label, column, ordered) in SALES_SUMMARIES {
        if !sales_columns.contains(*column) {
            continue;
        }
        let order = if *ordered {
            format!(" ORDER BY {}", column)
        } else {
            String::new()
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT {} FROM sales_data{}",
            column, order
        ))?;
        let values: Vec<String> = stmt
            .query_map([], |row| Ok(display_value(row.get_ref(0)?)))?
            .collect::<rusqlite::Result<_>>()?;
        description.push_str(&format!("{}: {}\n", label, values.join(", ")));
    }

    Ok(description)
}

/// Registry adapter for [`SalesData`]
pub struct SalesDataTool {
    sales: SalesData,
}

impl SalesDataTool {
    pub fn new(sales: SalesData) -> Self {
        Self { sales }
    }
}

#[async_trait]
impl Tool for SalesDataTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::function(
            FETCH_SALES_DATA_TOOL,
            "This function is used to answer user questions about Contoso sales data by executing SQLite queries against the database.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The input should be a well-formed SQLite query to extract information based on the user's question. The query result will be returned as a JSON object."
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn call(&self, call: &ToolCall) -> Result<String> {
        let args: FetchSalesDataArgs = decode_arguments(call)?;
        Ok(self.sales.fetch_sales_data(&args.query).await)
    }
}
