//! gtfsdb CLI - load GTFS feeds into SQLite and query them back

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "gtfsdb")]
#[command(version)]
#[command(about = "Import GTFS transit feeds into SQLite and query them as rows, CSV or GeoJSON")]
#[command(long_about = r#"
gtfsdb loads GTFS feeds (zip archives or directories, local or remote)
into a SQLite database and serves them back out:
  • Query any GTFS file as a table, with filters through related entities
  • Re-export the loaded feed as GTFS text files
  • Render routes' shapes and stops as GeoJSON

Example usage:
  gtfsdb init --agency-key caltrain --url http://www.caltrain.com/Assets/GTFS/caltrain/GTFS-Caltrain-Devs.zip
  gtfsdb import
  gtfsdb query stops --filter route_id=Bu-130 --order-by stop_name
  gtfsdb geojson shapes --filter route_id=Bu-130
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file (defaults to ./gtfsdb.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,

        /// Key of the first agency
        #[arg(long)]
        agency_key: Option<String>,

        /// Remote zip URL of the first agency's feed
        #[arg(long, conflicts_with = "path")]
        url: Option<String>,

        /// Local zip or directory of the first agency's feed
        #[arg(long)]
        path: Option<String>,
    },

    /// Import the configured agencies (or one ad-hoc feed)
    Import {
        /// Only import this configured agency, or name an ad-hoc feed
        #[arg(short, long)]
        agency_key: Option<String>,

        /// Ad-hoc remote feed URL (requires --agency-key)
        #[arg(long, conflicts_with = "path", requires = "agency_key")]
        url: Option<String>,

        /// Ad-hoc local feed path (requires --agency-key)
        #[arg(long, requires = "agency_key")]
        path: Option<String>,
    },

    /// Export the loaded feed as GTFS text files
    Export {
        /// Only export for this configured agency
        #[arg(short, long)]
        agency_key: Option<String>,
    },

    /// Query one GTFS entity
    Query {
        /// Entity (table) name, e.g. stops, routes, stop_times
        entity: String,

        /// Filter as column=value; repeatable
        #[arg(short, long = "filter", value_parser = commands::parse_filter)]
        filters: Vec<(String, String)>,

        /// Comma-separated columns to return
        #[arg(long)]
        fields: Option<String>,

        /// Sort order as column[:desc],...
        #[arg(short, long)]
        order_by: Option<String>,
    },

    /// Render shapes or stops as GeoJSON
    Geojson {
        #[command(subcommand)]
        kind: GeojsonKind,
    },

    /// Show row counts per table
    Stats,

    /// Serve the loaded feed over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

#[derive(Subcommand)]
enum GeojsonKind {
    /// Consolidated route shapes as line strings
    Shapes {
        #[arg(short, long = "filter", value_parser = commands::parse_filter)]
        filters: Vec<(String, String)>,
    },
    /// Stops as points with the routes serving them
    Stops {
        #[arg(short, long = "filter", value_parser = commands::parse_filter)]
        filters: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human)
    }
}

/// Print a JSON success envelope for `command`
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode == OutputMode::Json {
        let envelope = serde_json::json!({
            "ok": true,
            "command": command,
            "data": data,
        });
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG takes precedence
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force, agency_key, url, path } => {
            commands::run_init(output_mode, config_path, force, agency_key, url, path)
        }
        Commands::Import { agency_key, url, path } => {
            commands::run_import(output_mode, config_path, agency_key, url, path)
        }
        Commands::Export { agency_key } => commands::run_export(output_mode, config_path, agency_key),
        Commands::Query { entity, filters, fields, order_by } => commands::run_query(
            output_mode,
            config_path,
            &entity,
            filters,
            fields.as_deref(),
            order_by.as_deref(),
        ),
        Commands::Geojson { kind } => match kind {
            GeojsonKind::Shapes { filters } => {
                commands::run_geojson(output_mode, config_path, commands::GeojsonTarget::Shapes, filters)
            }
            GeojsonKind::Stops { filters } => {
                commands::run_geojson(output_mode, config_path, commands::GeojsonTarget::Stops, filters)
            }
        },
        Commands::Stats => commands::run_stats(output_mode, config_path),
        Commands::Serve { port } => commands::run_serve(config_path, port),
    }
}
