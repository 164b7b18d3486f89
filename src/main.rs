//! OOB Manager
//!
//! Command-line front end of the BMC client facade. Connects through the
//! facade to a simulated BMC described by a YAML fixture and runs one
//! operation, printing its result as JSON.

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use oob_manager::{
    ClientCache, ClientFactory, ClientOptions, ConnectionConfig, Error, ErasePattern, Fixture,
    MediaType, RaidConfigRequest, Result, SimulatedConnector,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// OOB Manager - out-of-band server management through the BMC
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulated server fixture (YAML)
    #[arg(long, env = "OOB_FIXTURE")]
    fixture: PathBuf,

    /// Connection configuration file (YAML); overrides the address flags
    #[arg(long, env = "OOB_CONNECTION_CONFIG")]
    connection_config: Option<PathBuf>,

    /// Client options file (YAML)
    #[arg(long, env = "OOB_CLIENT_OPTIONS")]
    client_options: Option<PathBuf>,

    /// BMC address
    #[arg(long, env = "BMC_ADDRESS", default_value = "")]
    address: String,

    /// BMC username
    #[arg(long, env = "BMC_USERNAME", default_value = "")]
    username: String,

    /// BMC password
    #[arg(long, env = "BMC_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Use only the standardized protocol
    #[arg(long, env = "BMC_FORCE_STANDARD")]
    force_standard: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the server product name
    ProductName,
    /// Invoke any operation by its wire name
    Call {
        /// Operation name, e.g. get_host_power_status
        operation: String,
        /// Named arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// RAID configuration
    #[command(subcommand)]
    Raid(RaidCommand),
    /// Sanitize erase all unassigned drives of one media type
    Erase {
        /// HDD or SSD
        #[arg(long)]
        disk_type: MediaType,
        /// overwrite, block, crypto or zero
        #[arg(long)]
        pattern: Option<ErasePattern>,
    },
    /// Report whether disk erase completed on every controller
    EraseStatus,
    /// List media types present in the server
    DiskTypes,
}

#[derive(Subcommand, Debug)]
enum RaidCommand {
    /// Create logical drives from a RAID configuration file
    Create {
        #[arg(long)]
        config: PathBuf,
    },
    /// Read logical drives, optionally only those of a RAID configuration
    Read {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Delete all logical drives
    Delete,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting OOB Manager");
    info!("  Version: {}", oob_manager::VERSION);
    info!("  Fixture: {}", args.fixture.display());

    let options = match &args.client_options {
        Some(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        None => ClientOptions::default(),
    };
    let mut config = match &args.connection_config {
        Some(path) => ConnectionConfig::from_yaml_file(path)?,
        None => ConnectionConfig::new(&args.address, &args.username, &args.password),
    };
    config.force_standard |= args.force_standard;

    let fixture = Fixture::from_yaml_file(&args.fixture)?;
    let connector = Arc::new(SimulatedConnector::new(fixture).with_options(&options));
    let cache = ClientCache::new(ClientFactory::new(connector, options)?);
    let client = cache.get(&config).await?;

    let output = match args.command {
        Command::ProductName => Value::String(client.get_product_name().await?),
        Command::Call { operation, args } => {
            let args: Value = serde_json::from_str(&args)?;
            client.dispatch_by_name(&operation, args).await?
        }
        Command::Raid(RaidCommand::Create { config }) => {
            let request = load_raid_config(&config)?;
            client.create_raid_configuration(&request).await?;
            Value::Null
        }
        Command::Raid(RaidCommand::Read { config }) => {
            let request = config.as_deref().map(load_raid_config).transpose()?;
            serde_json::to_value(client.read_raid_configuration(request.as_ref()).await?)?
        }
        Command::Raid(RaidCommand::Delete) => {
            client.delete_raid_configuration().await?;
            Value::Null
        }
        Command::Erase { disk_type, pattern } => {
            client.do_disk_erase(disk_type, pattern).await?;
            Value::Null
        }
        Command::EraseStatus => Value::Bool(client.has_disk_erase_completed().await?),
        Command::DiskTypes => serde_json::to_value(client.get_available_disk_types().await?)?,
    };

    if !output.is_null() {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

/// RAID configuration from a YAML or JSON file
fn load_raid_config(path: &std::path::Path) -> Result<RaidConfigRequest> {
    let content = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| {
        Error::InvalidInput(format!("Invalid RAID configuration {}: {}", path.display(), e))
    })
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
