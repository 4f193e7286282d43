//! `routedef` command line tool.
//!
//! Checks route definition files without a running application: `validate`
//! runs the schema check, `inspect` resolves the whole tree by name and
//! prints the routes it would produce.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};

use routedef::config::{load_config, ParserConfig};
use routedef::observability::init_logging;
use routedef::schema;
use routedef::{Parser, RoutePlan};

#[derive(ClapParser)]
#[command(name = "routedef")]
#[command(about = "Validate and inspect route definition files", long_about = None)]
struct Cli {
    /// Parser configuration file (TOML).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a definition against the schema
    Validate {
        file: PathBuf,
        /// Schema version to validate against (x.y.z)
        #[arg(long)]
        schema_version: Option<String>,
    },
    /// Print the routes a definition resolves to
    Inspect {
        file: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ParserConfig::default(),
    };
    init_logging(&config.observability);

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &ParserConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Validate {
            file,
            schema_version,
        } => {
            let version = schema_version.unwrap_or_else(|| config.schema_version.clone());
            let document: serde_json::Value = serde_json::from_str(&read(&file)?)?;
            schema::validate(&document, &version)?;
            println!("{}: valid (schema {})", file.display(), version);
        }
        Commands::Inspect { file, json } => {
            let plans = Parser::from_config(config)?.plan(&read(&file)?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&plans)?);
            } else {
                print_table(&plans);
            }
        }
    }
    Ok(())
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e).into())
}

fn print_table(plans: &[RoutePlan]) {
    for plan in plans {
        let methods = if plan.methods.is_empty() {
            "*".to_string()
        } else {
            plan.methods.join(",")
        };
        let host = if plan.host.is_empty() { "*" } else { plan.host.as_str() };
        println!("{:<12} {:<32} {:<20} {}", methods, plan.pattern, host, plan.handler);
        if !plan.middleware.is_empty() {
            println!("{:<12} {:<32} {:<20} via {}", "", "", "", plan.middleware.join(" → "));
        }
    }
}
