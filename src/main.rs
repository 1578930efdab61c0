use std::io::{self, Write};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rowstore::statement::{Input, MetaCommand, Statement};
use rowstore::{
    Column, Database, MemEngine, PAGE_SIZE, ROW_SIZE, ROWS_PER_PAGE, Row, Schema, TABLE_MAX_PAGES,
    TABLE_MAX_ROWS, Table, TableError, Type, Value,
};

const KEYED_TABLE: &str = "users";

/// Single-table record store with a line-oriented prompt.
#[derive(Parser, Debug)]
#[command(name = "rowstore", version)]
struct Args {
    /// Storage strategy the prompt drives
    #[arg(
        short,
        long,
        value_enum,
        default_value = "paged",
        env = "ROWSTORE_MODE"
    )]
    mode: Mode,

    /// Log level for messages written to stderr (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", env = "ROWSTORE_LOG")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Fixed-width rows packed into pages
    Paged,
    /// Rows flattened onto an ordered key-value store
    Keyed,
}

struct InputBuffer {
    buffer: String,
}

impl InputBuffer {
    fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Returns false once stdin is exhausted.
    fn read_input(&mut self) -> io::Result<bool> {
        self.buffer.clear();
        let read = io::stdin().read_line(&mut self.buffer)?;
        self.buffer = self.buffer.trim().to_string();
        Ok(read > 0)
    }
}

enum Store {
    Paged(Table),
    Keyed(Database<MemEngine>),
}

impl Store {
    fn open(mode: Mode) -> Result<Self> {
        match mode {
            Mode::Paged => Ok(Store::Paged(Table::new())),
            Mode::Keyed => {
                let schema = Schema::new([
                    ("id", Column::primary_key(Type::Integer)),
                    ("username", Column::new(Type::Text)),
                    ("email", Column::new(Type::Text)),
                ])?;
                let mut db = Database::new(MemEngine::new());
                db.create_table(KEYED_TABLE, schema)?;
                Ok(Store::Keyed(db))
            }
        }
    }

    fn insert(&mut self, row: Row) -> Result<()> {
        match self {
            Store::Paged(table) => match table.insert(&row) {
                Ok(()) => println!("Executed."),
                Err(TableError::TableFull { .. }) => println!("Error: Table full."),
                Err(e) => println!("Error: {e}."),
            },
            Store::Keyed(db) => {
                let values = [
                    Value::from(row.id),
                    Value::from(row.username),
                    Value::from(row.email),
                ];
                match db.insert(KEYED_TABLE, &values) {
                    Ok(()) => println!("Executed."),
                    Err(e) => println!("Error: {e}."),
                }
            }
        }
        Ok(())
    }

    fn select(&self) -> Result<()> {
        match self {
            Store::Paged(table) => {
                for row in table.scan() {
                    println!("{}", row?);
                }
            }
            Store::Keyed(db) => {
                for (key, value) in db.engine().iter() {
                    println!("{key} = {value}");
                }
            }
        }
        println!("Executed.");
        Ok(())
    }
}

fn print_prompt() -> io::Result<()> {
    print!("db > ");
    io::stdout().flush()
}

fn print_constants() {
    println!("ROW_SIZE: {ROW_SIZE}");
    println!("PAGE_SIZE: {PAGE_SIZE}");
    println!("ROWS_PER_PAGE: {ROWS_PER_PAGE}");
    println!("TABLE_MAX_PAGES: {TABLE_MAX_PAGES}");
    println!("TABLE_MAX_ROWS: {TABLE_MAX_ROWS}");
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("rowstore={level}")))
        .unwrap_or_else(|_| EnvFilter::new("rowstore=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);
    debug!(mode = ?args.mode, "starting");

    let mut store = Store::open(args.mode)?;
    let mut input_buffer = InputBuffer::new();

    loop {
        print_prompt()?;
        if !input_buffer.read_input()? {
            break;
        }
        if input_buffer.buffer.is_empty() {
            continue;
        }

        match Input::parse(&input_buffer.buffer) {
            Input::Meta(MetaCommand::Exit) => break,
            Input::Meta(MetaCommand::Constants) => print_constants(),
            Input::Meta(MetaCommand::Unrecognized) => {
                println!("Unrecognized meta-command: {}", input_buffer.buffer);
            }
            Input::Statement(Ok(Statement::Insert(row))) => store.insert(row)?,
            Input::Statement(Ok(Statement::Select)) => store.select()?,
            Input::Statement(Err(e)) => println!("{e}"),
        }
    }

    Ok(())
}
