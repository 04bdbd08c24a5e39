//! Error types for leafdb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::index::SlotId;

/// Result type alias using LeafError
pub type Result<T> = std::result::Result<T, LeafError>;

/// Unified error type for leafdb operations
#[derive(Debug, Error)]
pub enum LeafError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Catalog Errors
    // -------------------------------------------------------------------------
    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Database already exists: {0}")]
    DatabaseExists(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Table has been dropped: {0}")]
    TableDropped(String),

    // -------------------------------------------------------------------------
    // Schema Errors
    // -------------------------------------------------------------------------
    #[error("Row does not match schema: {0}")]
    SchemaMismatch(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Record capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    #[error("Slot {0} holds no live record")]
    VacantSlot(SlotId),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
