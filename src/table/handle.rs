//! Table handle
//!
//! Binds a schema to its index and record store and routes row operations.
//!
//! ## Lifecycle
//! ```text
//!   open()  ──► MetadataLoaded ──(first use)──► IndexOpen ──► [ops]*
//!   create() ─────────────────────────────────► IndexOpen
//!   drop_table() ──► Dropped (every later call fails)
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::config::Config;
use crate::error::{LeafError, Result};
use crate::index::{Entry, Index, IndexKey, SlotId};
use crate::schema::{meta, ColumnType, Schema, Value};
use crate::storage::TableFiles;

use super::codec::{decode_row, encode_row};
use super::predicate::{Bound, Predicate};
use super::result::ResultSet;

/// Settings a table needs from the engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub tree_order: usize,
    pub sync: bool,
}

impl TableOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tree_order: config.tree_order,
            sync: config.sync_strategy.syncs(),
        }
    }
}

impl Default for TableOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Index specialized to the table's key type
enum TableIndex {
    Int(Index<i32>),
    Str(Index<String>),
}

/// Run `$body` against whichever index variant is active
macro_rules! dispatch {
    ($index:expr, $ix:ident => $body:expr) => {
        match $index {
            TableIndex::Int($ix) => $body,
            TableIndex::Str($ix) => $body,
        }
    };
}

impl TableIndex {
    fn create(files: &TableFiles, key_type: ColumnType, options: TableOptions) -> Result<Self> {
        Ok(match key_type {
            ColumnType::Int => {
                TableIndex::Int(Index::create(files, options.tree_order, options.sync)?)
            }
            ColumnType::Str => {
                TableIndex::Str(Index::create(files, options.tree_order, options.sync)?)
            }
        })
    }

    fn open(files: &TableFiles, key_type: ColumnType, options: TableOptions) -> Result<Self> {
        Ok(match key_type {
            ColumnType::Int => TableIndex::Int(Index::open(files, options.tree_order, options.sync)?),
            ColumnType::Str => TableIndex::Str(Index::open(files, options.tree_order, options.sync)?),
        })
    }
}

enum State {
    MetadataLoaded,
    IndexOpen(TableIndex),
    Dropped,
}

/// A table: schema, primary-key index and record store
pub struct Table {
    name: String,
    files: TableFiles,
    schema: Schema,
    options: TableOptions,
    state: State,
}

impl Table {
    /// Create a table's files in `dir`
    ///
    /// Steps:
    /// 1. Refuse if any of the table's files already exists
    /// 2. Write the metadata file (schema + zero cursor)
    /// 3. Create the data file and an empty index
    ///
    /// On failure only the files written by this call are removed.
    pub fn create(dir: &Path, name: &str, schema: Schema, options: TableOptions) -> Result<Self> {
        let files = TableFiles::new(dir, name);
        if files.all().iter().any(|path| path.exists()) {
            return Err(LeafError::TableExists(name.to_string()));
        }

        if let Err(e) = meta::create(&files.meta, &schema, options.sync) {
            if !is_already_exists(&e) {
                discard_partial(&[files.meta.as_path()]);
            }
            return Err(e);
        }

        let index = match TableIndex::create(&files, schema.key_type(), options) {
            Ok(index) => index,
            Err(e) => {
                // The data file is created first; if it was already there it is not ours
                if is_already_exists(&e) {
                    discard_partial(&[files.meta.as_path()]);
                } else {
                    discard_partial(&[files.meta.as_path(), files.data.as_path(), files.index.as_path()]);
                }
                return Err(e);
            }
        };

        tracing::info!(
            "Created table {} ({} columns, key {})",
            name,
            schema.len(),
            schema.primary_column().name
        );

        Ok(Self {
            name: name.to_string(),
            files,
            schema,
            options,
            state: State::IndexOpen(index),
        })
    }

    /// Open an existing table; the index is loaded on first use
    pub fn open(dir: &Path, name: &str, options: TableOptions) -> Result<Self> {
        let files = TableFiles::new(dir, name);
        if !files.meta.exists() {
            return Err(LeafError::TableNotFound(name.to_string()));
        }

        let schema = meta::load(&files.meta)?;
        tracing::debug!("Loaded metadata for table {}", name);

        Ok(Self {
            name: name.to_string(),
            files,
            schema,
            options,
            state: State::MetadataLoaded,
        })
    }

    // =========================================================================
    // Row Operations
    // =========================================================================

    /// Insert a row, or overwrite the row with the same primary key
    ///
    /// Values are coerced to the column types; a count or type mismatch is
    /// reported without touching any file.
    pub fn insert_row(&mut self, values: Vec<Value>) -> Result<SlotId> {
        let (schema, index) = self.parts()?;
        let values = coerce_row(schema, values)?;
        let payload = encode_row(schema, &values)?;
        let key = &values[schema.primary_index()];

        dispatch!(index, ix => insert_keyed(ix, key, &payload))
    }

    /// Select rows matching every predicate, projected to `columns`
    ///
    /// An empty projection or `*` selects every column.
    pub fn read_rows(&mut self, columns: &[String], predicates: &[Predicate]) -> Result<ResultSet> {
        let (schema, index) = self.parts()?;

        let projection: Vec<usize> = if columns.is_empty() || (columns.len() == 1 && columns[0] == "*") {
            (0..schema.len()).collect()
        } else {
            columns
                .iter()
                .map(|c| schema.position(c))
                .collect::<Result<_>>()?
        };
        let bounds = bind_all(schema, predicates)?;

        let rows = dispatch!(index, ix => select(ix, schema, &bounds)?
            .into_iter()
            .map(|m| m.row)
            .collect::<Vec<_>>());

        let names = projection
            .iter()
            .map(|&i| schema.columns()[i].name.clone())
            .collect();
        let rows = rows
            .into_iter()
            .map(|row| projection.iter().map(|&i| row[i].to_string()).collect())
            .collect();

        Ok(ResultSet::new(names, rows))
    }

    /// Set `column = value` on every matching row; returns the row count
    ///
    /// The primary key column cannot be updated. All rewritten records are
    /// checked for capacity before any is written.
    pub fn update_rows(&mut self, column: &str, value: Value, predicates: &[Predicate]) -> Result<usize> {
        let (schema, index) = self.parts()?;

        let position = schema.position(column)?;
        if position == schema.primary_index() {
            return Err(LeafError::InvalidArgument(format!(
                "primary key column '{}' cannot be updated",
                column
            )));
        }
        let value = value.coerce(schema.columns()[position].ty)?;
        let bounds = bind_all(schema, predicates)?;

        dispatch!(index, ix => update_matching(ix, schema, &bounds, position, &value))
    }

    /// Delete every matching row; returns the row count
    pub fn delete_rows(&mut self, predicates: &[Predicate]) -> Result<usize> {
        let (schema, index) = self.parts()?;
        let bounds = bind_all(schema, predicates)?;

        dispatch!(index, ix => delete_matching(ix, schema, &bounds))
    }

    /// Remove the table's files; the handle is unusable afterwards
    pub fn drop_table(&mut self) -> Result<()> {
        if matches!(self.state, State::Dropped) {
            return Err(LeafError::TableDropped(self.name.clone()));
        }

        // Close file handles before removing the files
        self.state = State::Dropped;
        remove_files(&self.files)?;

        tracing::info!("Dropped table {}", self.name);
        Ok(())
    }

    /// Remove a table's files without opening it
    pub fn destroy(dir: &Path, name: &str) -> Result<()> {
        let files = TableFiles::new(dir, name);
        if !files.meta.exists() {
            return Err(LeafError::TableNotFound(name.to_string()));
        }
        remove_files(&files)?;

        tracing::info!("Dropped table {}", name);
        Ok(())
    }

    /// Invalidate the handle without touching its files
    pub fn mark_dropped(&mut self) {
        self.state = State::Dropped;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn files(&self) -> &TableFiles {
        &self.files
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self.state, State::Dropped)
    }

    pub fn is_index_open(&self) -> bool {
        matches!(self.state, State::IndexOpen(_))
    }

    /// Slots allocated in the data file (live, dead and continuation)
    pub fn slot_count(&mut self) -> Result<usize> {
        let (_, index) = self.parts()?;
        Ok(dispatch!(index, ix => ix.store().slot_count()))
    }

    /// Number of live rows
    pub fn row_count(&mut self) -> Result<usize> {
        let (_, index) = self.parts()?;
        Ok(dispatch!(index, ix => ix.len()))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Schema plus the open index, loading the index on first use
    fn parts(&mut self) -> Result<(&Schema, &mut TableIndex)> {
        if matches!(self.state, State::MetadataLoaded) {
            let index = TableIndex::open(&self.files, self.schema.key_type(), self.options)?;
            tracing::debug!("Opened index for table {}", self.name);
            self.state = State::IndexOpen(index);
        }

        match &mut self.state {
            State::IndexOpen(index) => Ok((&self.schema, index)),
            _ => Err(LeafError::TableDropped(self.name.clone())),
        }
    }
}

// =============================================================================
// Key-typed Helpers
// =============================================================================

/// A row that passed every predicate, with its index entry
struct Matched<K> {
    entry: Entry<K>,
    row: Vec<Value>,
}

/// Collect rows matching `bounds`
///
/// The first bound on the primary key is answered by an index range scan
/// and the rest filter decoded rows; without one every leaf is scanned.
fn select<K: IndexKey>(index: &mut Index<K>, schema: &Schema, bounds: &[Bound]) -> Result<Vec<Matched<K>>> {
    let pk = schema.primary_index();

    let (entries, rest): (Vec<Entry<K>>, Vec<&Bound>) =
        match bounds.iter().position(|b| b.position == pk) {
            Some(i) => {
                let key = key_from_value::<K>(&bounds[i].value)?;
                let rest = bounds
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, b)| b)
                    .collect();
                (index.range_entries(&key, bounds[i].op), rest)
            }
            None => (index.entries(), bounds.iter().collect()),
        };

    let slots: Vec<SlotId> = entries.iter().map(|e| e.slot).collect();
    let payloads = index.read_many(&slots)?;

    let mut matched = Vec::new();
    for (entry, payload) in entries.into_iter().zip(payloads) {
        let row = decode_row(schema, &payload)?;
        if rest.iter().all(|b| b.matches(&row)) {
            matched.push(Matched { entry, row });
        }
    }
    Ok(matched)
}

fn insert_keyed<K: IndexKey>(index: &mut Index<K>, key: &Value, payload: &[u8]) -> Result<SlotId> {
    let key = key_from_value::<K>(key)?;
    index.insert(key, payload)
}

fn update_matching<K: IndexKey>(
    index: &mut Index<K>,
    schema: &Schema,
    bounds: &[Bound],
    position: usize,
    value: &Value,
) -> Result<usize> {
    let matched = select(index, schema, bounds)?;
    if matched.is_empty() {
        return Ok(0);
    }

    let mut slots = Vec::with_capacity(matched.len());
    let mut payloads = Vec::with_capacity(matched.len());
    for Matched { entry, mut row } in matched {
        row[position] = value.clone();
        payloads.push(encode_row(schema, &row)?);
        slots.push(entry.slot);
    }

    index.update_many(&slots, &payloads)?;
    Ok(slots.len())
}

fn delete_matching<K: IndexKey>(index: &mut Index<K>, schema: &Schema, bounds: &[Bound]) -> Result<usize> {
    let keys: Vec<K> = select(index, schema, bounds)?
        .into_iter()
        .map(|m| m.entry.key)
        .collect();
    if keys.is_empty() {
        return Ok(0);
    }
    index.delete_many(&keys)
}

fn key_from_value<K: IndexKey>(value: &Value) -> Result<K> {
    K::from_value(value).ok_or_else(|| {
        LeafError::SchemaMismatch(format!("{:?} is not a {} key", value, K::KEY_TYPE))
    })
}

fn coerce_row(schema: &Schema, values: Vec<Value>) -> Result<Vec<Value>> {
    if values.len() != schema.len() {
        return Err(LeafError::SchemaMismatch(format!(
            "table has {} columns, row has {} values",
            schema.len(),
            values.len()
        )));
    }
    schema
        .columns()
        .iter()
        .zip(values)
        .map(|(column, value)| value.coerce(column.ty))
        .collect()
}

fn bind_all(schema: &Schema, predicates: &[Predicate]) -> Result<Vec<Bound>> {
    predicates.iter().map(|p| p.bind(schema)).collect()
}

/// Remove all three table files, reporting the first failure
///
/// Missing files are not an error.
/// Best-effort removal of files left by a failed create
fn discard_partial(paths: &[&Path]) {
    for path in paths {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {} after a failed create: {}", path.display(), e),
        }
    }
}

fn is_already_exists(error: &LeafError) -> bool {
    matches!(error, LeafError::Io(e) if e.kind() == ErrorKind::AlreadyExists)
}

fn remove_files(files: &TableFiles) -> Result<()> {
    let mut first_error = None;
    for path in files.all() {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
