//! itembridge CLI
//!
//! Host binary for the bridge runtime: lists the registered symbols,
//! invokes natives with literal arguments and drives the log natives.

mod literal;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use itembridge_core::{TextConfig, item_to_text};
use itembridge_runtime::{BridgeConfig, Context, Item, stdlib};
use std::io;
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "itembridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Call bridge natives from the command line", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered symbols
    Symbols,

    /// Invoke a symbol and print its result
    Call {
        /// Symbol name
        name: String,

        /// Arguments: NIL, .T., .F., numbers, 0dYYYYMMDD dates or strings
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Write or read log files
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// Append one record per TEXT
    Write {
        file: String,

        #[arg(required = true)]
        text: Vec<String>,

        /// Truncate the file first
        #[arg(long)]
        create: bool,
    },

    /// Print the content of a log file
    Load { file: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    debug!(?config, "configuration loaded");

    let result = match cli.command {
        Commands::Symbols => {
            run_symbols();
            Ok(())
        }
        Commands::Call { name, args } => run_call(config, &name, &args),
        Commands::Log { command } => run_log(config, command),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "itembridge", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn default_filter() -> EnvFilter {
    let filter = EnvFilter::from_default_env();
    match "itembridge_runtime=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig, String> {
    match path {
        Some(path) => BridgeConfig::load(path).map_err(|e| e.to_string()),
        None => Ok(BridgeConfig::default()),
    }
}

fn run_symbols() {
    let table = stdlib::table();
    for (symbol, name, target) in table.iter() {
        println!("{:>4}  {:<10} {}", symbol.index(), target.kind_name(), name);
    }
}

fn run_call(config: BridgeConfig, name: &str, args: &[String]) -> Result<(), String> {
    let mut ctx = Context::with_config(stdlib::table(), config);
    let args: Vec<Item> = args.iter().map(|a| literal::parse(a)).collect();
    let result = ctx.call(name, args).map_err(|e| e.to_string())?;
    println!("{}", item_to_text(&result, &TextConfig::literal()));
    Ok(())
}

fn run_log(config: BridgeConfig, command: LogCommands) -> Result<(), String> {
    let mut ctx = Context::with_config(stdlib::table(), config);
    match command {
        LogCommands::Write { file, text, create } => {
            let records: Vec<&[u8]> = text.iter().map(|t| t.as_bytes()).collect();
            ctx.log_writer()
                .write(&file, create, records.as_slice())
                .map_err(|e| format!("{}: {}", file, e))
        }
        LogCommands::Load { file } => {
            let content = ctx
                .log_writer()
                .load(&file)
                .map_err(|e| format!("{}: {}", file, e))?;
            print!("{}", String::from_utf8_lossy(&content));
            Ok(())
        }
    }
}
