//! Engine Module
//!
//! The service that coordinates databases, table handles and statements.
//!
//! ## Responsibilities
//! - Map databases to directories under the data root
//! - Execute statements against tables
//! - Keep a bounded LRU of open table handles
//! - Invalidate cached handles when their table or database is dropped

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::{TableCache, TableHandle};
use crate::config::Config;
use crate::error::{LeafError, Result};
use crate::schema::{ColumnDef, Schema, Value};
use crate::statement::{Outcome, Statement};
use crate::table::{Predicate, ResultSet, Table, TableOptions};

/// The main database engine
///
/// ## Concurrency Model
///
/// - The handle cache sits behind its own mutex, held only long enough to
///   find or insert a handle
/// - Each table sits behind a mutex; a statement holds it from index
///   lookup to the final persist, so table operations never interleave
/// - Statements on different tables run independently
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Per-table settings derived from the config
    options: TableOptions,

    /// Open table handles
    cache: Mutex<TableCache>,

    /// Database selected by `UseDatabase`
    current: Mutex<Option<String>>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// Steps:
    /// 1. Validate the config
    /// 2. Create the data root if it doesn't exist
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        tracing::debug!(
            "Engine opened at {} (order {}, cache {})",
            config.data_dir.display(),
            config.tree_order,
            config.cache_capacity
        );

        Ok(Self {
            options: TableOptions::from_config(&config),
            cache: Mutex::new(TableCache::new(config.cache_capacity)),
            current: Mutex::new(None),
            config,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a statement
    ///
    /// Routes statements to the appropriate handler
    pub fn execute(&self, statement: Statement) -> Result<Outcome> {
        tracing::trace!("Executing {:?}", statement.statement_type());

        match statement {
            Statement::CreateDatabase { name } => {
                self.create_database(&name)?;
                Ok(Outcome::Done)
            }
            Statement::DropDatabase { name } => {
                self.drop_database(&name)?;
                Ok(Outcome::Done)
            }
            Statement::UseDatabase { name } => {
                self.use_database(&name)?;
                Ok(Outcome::Done)
            }
            Statement::CreateTable {
                database,
                table,
                columns,
            } => {
                let database = self.resolve(database)?;
                self.create_table(&database, &table, &columns)?;
                Ok(Outcome::Done)
            }
            Statement::Insert {
                database,
                table,
                values,
            } => {
                let database = self.resolve(database)?;
                self.insert(&database, &table, values)?;
                Ok(Outcome::Affected(1))
            }
            Statement::Select {
                database,
                table,
                columns,
                conditions,
            } => {
                let database = self.resolve(database)?;
                let rows = self.select(&database, &table, &columns, &conditions)?;
                Ok(Outcome::Rows(rows))
            }
            Statement::Update {
                database,
                table,
                column,
                value,
                conditions,
            } => {
                let database = self.resolve(database)?;
                let count = self.update(&database, &table, &column, value, &conditions)?;
                Ok(Outcome::Affected(count))
            }
            Statement::Delete {
                database,
                table,
                conditions,
            } => {
                let database = self.resolve(database)?;
                let count = self.delete(&database, &table, &conditions)?;
                Ok(Outcome::Affected(count))
            }
            Statement::DropTable { database, table } => {
                let database = self.resolve(database)?;
                self.drop_table(&database, &table)?;
                Ok(Outcome::Done)
            }
        }
    }

    // =========================================================================
    // Databases
    // =========================================================================

    pub fn create_database(&self, name: &str) -> Result<()> {
        validate_name("database", name)?;
        let dir = self.database_dir(name);
        if dir.exists() {
            return Err(LeafError::DatabaseExists(name.to_string()));
        }

        fs::create_dir(&dir)?;
        tracing::info!("Created database {}", name);
        Ok(())
    }

    /// Drop a database and every table in it
    ///
    /// Cached handles of its tables are invalidated first.
    pub fn drop_database(&self, name: &str) -> Result<()> {
        let dir = self.existing_database_dir(name)?;

        let handles = self.cache.lock().remove_database(name);
        for handle in handles {
            handle.lock().mark_dropped();
        }
        fs::remove_dir_all(&dir)?;

        let mut current = self.current.lock();
        if current.as_deref() == Some(name) {
            *current = None;
        }

        tracing::info!("Dropped database {}", name);
        Ok(())
    }

    pub fn use_database(&self, name: &str) -> Result<()> {
        self.existing_database_dir(name)?;
        *self.current.lock() = Some(name.to_string());
        Ok(())
    }

    /// Database selected by `use_database`
    pub fn current_database(&self) -> Option<String> {
        self.current.lock().clone()
    }

    /// Names of all databases, sorted
    pub fn list_databases(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.data_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Names of all tables in a database, sorted
    pub fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        let dir = self.existing_database_dir(database)?;
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "prof") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Create a table
    ///
    /// At most one column may be primary; with none, the first column is.
    pub fn create_table(&self, database: &str, table: &str, columns: &[ColumnDef]) -> Result<()> {
        validate_name("table", table)?;
        let dir = self.existing_database_dir(database)?;
        let schema = Schema::from_defs(columns)?;

        let created = Table::create(&dir, table, schema, self.options)?;
        self.cache
            .lock()
            .insert(database, table, Arc::new(Mutex::new(created)));
        Ok(())
    }

    /// Drop a table: remove its files and invalidate any cached handle
    pub fn drop_table(&self, database: &str, table: &str) -> Result<()> {
        let dir = self.existing_database_dir(database)?;

        let cached = self.cache.lock().remove(database, table);
        match cached {
            Some(handle) => handle.lock().drop_table(),
            None => Table::destroy(&dir, table),
        }
    }

    /// Shared handle to a table, opening it on a cache miss
    pub fn table(&self, database: &str, table: &str) -> Result<TableHandle> {
        if let Some(handle) = self.cache.lock().get(database, table) {
            return Ok(handle);
        }

        let dir = self.existing_database_dir(database)?;
        let handle = Arc::new(Mutex::new(Table::open(&dir, table, self.options)?));

        let mut cache = self.cache.lock();
        // Another thread may have opened it meanwhile; keep the first handle
        if let Some(existing) = cache.get(database, table) {
            return Ok(existing);
        }
        cache.insert(database, table, Arc::clone(&handle));
        Ok(handle)
    }

    // =========================================================================
    // Rows
    // =========================================================================

    pub fn insert(&self, database: &str, table: &str, values: Vec<Value>) -> Result<()> {
        let handle = self.table(database, table)?;
        let mut table = handle.lock();
        table.insert_row(values)?;
        Ok(())
    }

    pub fn select(
        &self,
        database: &str,
        table: &str,
        columns: &[String],
        conditions: &[Predicate],
    ) -> Result<ResultSet> {
        let handle = self.table(database, table)?;
        let mut table = handle.lock();
        table.read_rows(columns, conditions)
    }

    pub fn update(
        &self,
        database: &str,
        table: &str,
        column: &str,
        value: Value,
        conditions: &[Predicate],
    ) -> Result<usize> {
        let handle = self.table(database, table)?;
        let mut table = handle.lock();
        table.update_rows(column, value, conditions)
    }

    pub fn delete(&self, database: &str, table: &str, conditions: &[Predicate]) -> Result<usize> {
        let handle = self.table(database, table)?;
        let mut table = handle.lock();
        table.delete_rows(conditions)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cached `(database, table)` pairs, most recent first
    pub fn cached_tables(&self) -> Vec<(String, String)> {
        self.cache.lock().keys()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn database_dir(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    fn existing_database_dir(&self, name: &str) -> Result<PathBuf> {
        validate_name("database", name)?;
        let dir = self.database_dir(name);
        if !dir.is_dir() {
            return Err(LeafError::DatabaseNotFound(name.to_string()));
        }
        Ok(dir)
    }

    /// Explicit database, else the selected one
    fn resolve(&self, database: Option<String>) -> Result<String> {
        database
            .or_else(|| self.current_database())
            .ok_or_else(|| LeafError::InvalidArgument("no database selected".to_string()))
    }
}

/// Names become file and directory names: ASCII letters, digits, `_`, `-`
fn validate_name(kind: &str, name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(LeafError::InvalidArgument(format!(
            "invalid {} name '{}'",
            kind, name
        )));
    }
    Ok(())
}
