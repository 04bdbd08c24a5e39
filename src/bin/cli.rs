//! leafdb CLI
//!
//! Runs one statement against a data directory and prints the outcome.

use clap::{Parser, Subcommand};
use leafdb::config::SyncStrategy;
use leafdb::{ColumnDef, ColumnType, Config, Engine, LeafError, Predicate, Statement, Value};
use tracing_subscriber::{fmt, EnvFilter};

/// leafdb CLI
#[derive(Parser, Debug)]
#[command(name = "leafdb")]
#[command(about = "Embedded table store on a persistent B+ tree")]
#[command(version)]
struct Args {
    /// Data directory (one subdirectory per database)
    #[arg(short, long, default_value = "./data")]
    data_dir: String,

    /// Database for table statements
    #[arg(short = 'D', long)]
    database: Option<String>,

    /// B+ tree order
    #[arg(short, long, default_value = "3")]
    order: usize,

    /// Leave flushing to the OS instead of fsyncing every write
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a database
    CreateDatabase {
        name: String,
    },

    /// Drop a database and all its tables
    DropDatabase {
        name: String,
    },

    /// List databases
    Databases,

    /// List tables of --database
    Tables,

    /// Create a table: columns as name:type[:primary], type is int or string
    CreateTable {
        table: String,

        #[arg(required = true)]
        columns: Vec<String>,
    },

    /// Drop a table
    DropTable {
        table: String,
    },

    /// Insert a row (overwrites the row with the same primary key)
    Insert {
        table: String,

        /// Literals in column order; -?\d+ is an int, anything else a string
        #[arg(required = true, allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Select rows
    Select {
        table: String,

        /// Columns to show, comma separated (default: all)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Condition like id>=2 (repeatable, all must hold)
        #[arg(short = 'w', long = "where")]
        conditions: Vec<String>,
    },

    /// Update one column of matching rows
    Update {
        table: String,

        /// Assignment like name=bob
        #[arg(short, long)]
        set: String,

        /// Condition like id=1 (repeatable, all must hold)
        #[arg(short = 'w', long = "where")]
        conditions: Vec<String>,
    },

    /// Delete matching rows
    Delete {
        table: String,

        /// Condition like id<3 (repeatable, all must hold)
        #[arg(short = 'w', long = "where")]
        conditions: Vec<String>,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,leafdb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::debug!("leafdb v{}", leafdb::VERSION);
    tracing::debug!("Data directory: {}", args.data_dir);

    let sync_strategy = if args.no_sync {
        SyncStrategy::OsBuffered
    } else {
        SyncStrategy::EveryWrite
    };
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .tree_order(args.order)
        .sync_strategy(sync_strategy)
        .build();

    let engine = match Engine::open(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&engine, args.database, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(engine: &Engine, database: Option<String>, command: Commands) -> leafdb::Result<()> {
    let statement = match command {
        Commands::Databases => {
            for name in engine.list_databases()? {
                println!("{}", name);
            }
            return Ok(());
        }
        Commands::Tables => {
            let database = database
                .ok_or_else(|| LeafError::InvalidArgument("--database is required".to_string()))?;
            for name in engine.list_tables(&database)? {
                println!("{}", name);
            }
            return Ok(());
        }
        Commands::CreateDatabase { name } => Statement::CreateDatabase { name },
        Commands::DropDatabase { name } => Statement::DropDatabase { name },
        Commands::CreateTable { table, columns } => Statement::CreateTable {
            database,
            table,
            columns: columns
                .iter()
                .map(|text| parse_column(text))
                .collect::<leafdb::Result<_>>()?,
        },
        Commands::DropTable { table } => Statement::DropTable { database, table },
        Commands::Insert { table, values } => Statement::Insert {
            database,
            table,
            values: values.iter().map(|v| Value::parse_literal(v)).collect(),
        },
        Commands::Select {
            table,
            columns,
            conditions,
        } => Statement::Select {
            database,
            table,
            columns,
            conditions: parse_conditions(&conditions)?,
        },
        Commands::Update {
            table,
            set,
            conditions,
        } => {
            let (column, literal) = set.split_once('=').ok_or_else(|| {
                LeafError::InvalidArgument(format!("expected column=value, got '{}'", set))
            })?;
            Statement::Update {
                database,
                table,
                column: column.trim().to_string(),
                value: Value::parse_literal(literal),
                conditions: parse_conditions(&conditions)?,
            }
        }
        Commands::Delete { table, conditions } => Statement::Delete {
            database,
            table,
            conditions: parse_conditions(&conditions)?,
        },
    };

    let outcome = engine.execute(statement)?;
    println!("{}", outcome);
    Ok(())
}

/// Parse `name:type[:primary]`
fn parse_column(text: &str) -> leafdb::Result<ColumnDef> {
    let mut parts = text.split(':');
    let name = parts.next().unwrap_or_default();
    let ty: ColumnType = parts
        .next()
        .ok_or_else(|| LeafError::InvalidSchema(format!("column '{}' has no type", text)))?
        .parse()?;

    let column = ColumnDef::new(name, ty);
    match parts.next() {
        None => Ok(column),
        Some("primary") | Some("pk") => Ok(column.primary()),
        Some(other) => Err(LeafError::InvalidSchema(format!(
            "unknown column flag '{}' in '{}'",
            other, text
        ))),
    }
}

fn parse_conditions(conditions: &[String]) -> leafdb::Result<Vec<Predicate>> {
    conditions.iter().map(|c| c.parse()).collect()
}
