use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

mod api;
mod archive;
mod config;
mod db;
mod ingest;
mod logging;
mod registry;
#[cfg(test)]
mod test_utils;

use crate::api::HandlerResponse;
use crate::archive::S3Archive;
use crate::db::PostgresDatabase;
use crate::ingest::StatusIngestor;
use crate::registry::{DeviceRegistry, LambdaRegistrar, Registrar};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.toml",
        global = true
    )]
    config: String,

    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a device status report
    Ingest {
        /// Read the report from this file instead of stdin
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Register a device
    AddDevice {
        /// Display name of the device
        #[arg(long)]
        name: String,

        /// Manufacturer-assigned serial number
        #[arg(long)]
        serial: String,

        /// Device type code
        #[arg(long = "type")]
        device_type: Option<i32>,

        /// Owner to link the device to
        #[arg(long)]
        userid: Option<i64>,
    },
    /// Fetch the latest status of a device
    GetStatus {
        #[arg(long)]
        deviceid: i64,
    },
    /// List a user's devices with their latest status
    ListDevices {
        #[arg(long)]
        userid: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cli.config, e);
            process::exit(1);
        }
    };

    let _log_guard = logging::init_logging(config.logging.as_ref(), cli.verbose)?;

    info!("Device Status Ingestor v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", cli.config);

    match cli.command {
        Commands::Ingest { file } => run_ingest(config, file).await,
        Commands::AddDevice {
            name,
            serial,
            device_type,
            userid,
        } => run_add_device(config, name, serial, device_type, userid).await,
        Commands::GetStatus { deviceid } => run_get_status(config, deviceid).await,
        Commands::ListDevices { userid } => run_list_devices(config, userid).await,
    }
}

/// Ingest one status report from a file or stdin
async fn run_ingest(config: config::Config, file: Option<PathBuf>) -> Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(&path)
            .context(format!("Failed to read payload from {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read payload from stdin")?;
            buffer
        }
    };

    let event: Value =
        serde_json::from_str(&raw).context("Payload is not a valid JSON document")?;

    let database = Arc::new(connect_database(&config).await?);
    let archive = Arc::new(
        S3Archive::new(&config.s3)
            .await
            .context("Failed to create S3 archive")?,
    );
    let registrar = build_registrar(&config, database.clone()).await?;

    let ingestor = StatusIngestor::new(
        database,
        archive,
        registrar,
        config.ingest.default_device_type,
    );

    let response = api::status::update_status(&ingestor, &event).await;
    print_response(response)
}

/// Register a device directly against the store
async fn run_add_device(
    config: config::Config,
    name: String,
    serial: String,
    device_type: Option<i32>,
    userid: Option<i64>,
) -> Result<()> {
    let database = Arc::new(connect_database(&config).await?);
    let registry = DeviceRegistry::new(database);

    let mut event = serde_json::json!({
        "devicename": name,
        "serial": serial,
        "type": device_type.unwrap_or(config.ingest.default_device_type),
    });
    if let Some(userid) = userid {
        event["userid"] = serde_json::json!(userid);
    }

    let response = api::devices::add_device(&registry, &event).await;
    print_response(response)
}

/// Fetch the latest status of a device
async fn run_get_status(config: config::Config, deviceid: i64) -> Result<()> {
    let database = connect_database(&config).await?;

    let event = serde_json::json!({
        "queryStringParameters": {"deviceid": deviceid.to_string()}
    });
    let response = api::devices::get_device_status(&database, &event).await;
    print_response(response)
}

/// List a user's devices
async fn run_list_devices(config: config::Config, userid: i64) -> Result<()> {
    let database = connect_database(&config).await?;

    let event = serde_json::json!({
        "queryStringParameters": {"userid": userid.to_string()}
    });
    let response = api::devices::list_devices(&database, &event).await;
    print_response(response)
}

async fn connect_database(config: &config::Config) -> Result<PostgresDatabase> {
    let database =
        PostgresDatabase::new(&config.database.url, config.database.max_connections)
            .await
            .context("Failed to connect to database")?;
    Ok(database)
}

/// Pick the registration collaborator: remote when configured, otherwise
/// the in-process registry over the same store
async fn build_registrar(
    config: &config::Config,
    database: Arc<PostgresDatabase>,
) -> Result<Arc<dyn Registrar>> {
    match &config.registrar {
        Some(registrar_config) => {
            let registrar = LambdaRegistrar::new(registrar_config)
                .await
                .context("Failed to create registration collaborator client")?;
            Ok(Arc::new(registrar))
        }
        None => {
            info!("No registrar configured, registering devices in-process");
            Ok(Arc::new(DeviceRegistry::new(database)))
        }
    }
}

/// Print the handler's response envelope and exit non-zero on failure
fn print_response(response: HandlerResponse) -> Result<()> {
    let status_code = response.status_code;
    let envelope = response.into_envelope();
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if status_code != 200 {
        error!("Request failed with status {}", status_code);
        process::exit(1);
    }
    Ok(())
}
