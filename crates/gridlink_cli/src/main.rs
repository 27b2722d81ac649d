//! gridlink CLI
//!
//! Command-line tools for inspecting how gridlink stores data.
//!
//! # Commands
//!
//! - `resolve` - Show where an association's rows would be stored
//! - `options` - Show the effective options of an entity or property
//! - `flatten` - Flatten key segments into a store identifier
//! - `unflatten` - Split a store identifier back into segments

mod commands;

use clap::{Parser, Subcommand};
use commands::{Backend, Format};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// gridlink command-line tools.
#[derive(Parser)]
#[command(name = "gridlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON options file
    #[arg(global = true, short, long)]
    options: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where an association's rows would be stored
    Resolve {
        /// Owning entity
        #[arg(short, long)]
        entity: String,

        /// Association role (property name)
        #[arg(short, long)]
        role: String,

        /// Collection semantics
        #[arg(short = 't', long, value_enum, default_value = "bag")]
        association_type: commands::resolve::Semantics,

        /// Rows are embedded values rather than entity references
        #[arg(long)]
        embedded: bool,

        /// Rows are keyed by a single string index (map keys)
        #[arg(long)]
        string_index: bool,

        /// Backend capabilities to resolve against
        #[arg(short, long, value_enum, default_value = "document")]
        backend: Backend,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show the effective options of an entity or property
    Options {
        /// Entity name
        #[arg(short, long)]
        entity: Option<String>,

        /// Property name (requires --entity)
        #[arg(short, long, requires = "entity")]
        property: Option<String>,

        /// Backend whose defaults apply
        #[arg(short, long, value_enum, default_value = "document")]
        backend: Backend,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Flatten key segments such as `s:users i:42` into a store identifier
    Flatten {
        /// Segments as `<kind>:<value>`; kinds are n, b, i, d, s, x
        #[arg(required = true)]
        segments: Vec<String>,
    },

    /// Split a store identifier back into segments
    Unflatten {
        /// Flattened key
        key: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Resolve {
            entity,
            role,
            association_type,
            embedded,
            string_index,
            backend,
            format,
        } => {
            let options = commands::load_options(cli.options.as_deref())?;
            let request = commands::resolve::Request {
                entity: &entity,
                role: &role,
                semantics: association_type,
                embedded,
                string_index,
            };
            commands::resolve::run(&options, &request, backend, format)?;
        }
        Commands::Options {
            entity,
            property,
            backend,
            format,
        } => {
            let options = commands::load_options(cli.options.as_deref())?;
            commands::options::run(&options, entity.as_deref(), property.as_deref(), backend, format)?;
        }
        Commands::Flatten { segments } => {
            commands::keys::flatten(&segments)?;
        }
        Commands::Unflatten { key, format } => {
            commands::keys::unflatten(&key, format)?;
        }
        Commands::Version => {
            println!("gridlink CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
