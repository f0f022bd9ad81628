//! Command-line interface for the LoRaWAN device checker.

mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use loracheck_core::provisioning;
use loracheck_core::{
    ActivationKind, CredentialField, DeviceChecker, DeviceCredentials, Provisioning,
    ProvisioningRequest,
};
use loracheck_registry::{IotHubConfig, IotHubRegistry};

/// LoRaCheck - verify and provision LoRaWAN leaf devices in Azure IoT Hub.
#[derive(Parser, Debug)]
#[command(name = "loracheck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Settings file holding the IoT Hub connection string.
    #[arg(long, global = true, default_value = settings::DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List devices.
    List {
        /// Devices per page.
        #[arg(long, default_value_t = 10)]
        page: usize,
        /// Maximum number of devices to list. Default is all.
        #[arg(long)]
        total: Option<usize>,
    },
    /// Query a device twin.
    Query {
        /// DevEUI / device id.
        #[arg(long)]
        deveui: String,
    },
    /// Verify a single device.
    Verify {
        /// DevEUI / device id.
        #[arg(long)]
        deveui: String,
    },
    /// Add a new ABP device.
    #[command(name = "addabpdevice")]
    AddAbpDevice {
        /// AppEUI. Generated when left blank.
        #[arg(long)]
        appeui: Option<String>,
        /// AppKey. Generated when left blank.
        #[arg(long)]
        appkey: Option<String>,
        #[command(flatten)]
        device: DeviceOptions,
    },
    /// Add a new OTAA device.
    #[command(name = "addotaadevice")]
    AddOtaaDevice {
        /// AppSKey. Generated when left blank.
        #[arg(long)]
        appskey: Option<String>,
        /// NwkSKey. Generated when left blank.
        #[arg(long)]
        nwkskey: Option<String>,
        /// DevAddr. Generated when left blank.
        #[arg(long)]
        devaddr: Option<String>,
        #[command(flatten)]
        device: DeviceOptions,
    },
}

/// Options shared by both add commands.
#[derive(clap::Args, Debug)]
struct DeviceOptions {
    /// DevEUI / device id. Generated when left blank.
    #[arg(long)]
    deveui: Option<String>,
    /// GatewayID (optional).
    #[arg(long)]
    gatewayid: Option<String>,
    /// SensorDecoder (optional).
    #[arg(long)]
    decoder: Option<String>,
    /// ClassType (optional).
    #[arg(long)]
    classtype: Option<String>,
    /// Validate and print the desired properties without contacting IoT Hub.
    #[arg(long)]
    dry_run: bool,
}

impl DeviceOptions {
    fn credentials(&self) -> DeviceCredentials {
        DeviceCredentials::new()
            .with_opt(CredentialField::DevEui, self.deveui.clone())
            .with_opt(CredentialField::GatewayId, self.gatewayid.clone())
            .with_opt(CredentialField::SensorDecoder, self.decoder.clone())
            .with_opt(CredentialField::ClassType, self.classtype.clone())
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    let success = match run(args).await {
        Ok(success) => success,
        Err(e) => {
            eprintln!("Error: {e:#}");
            false
        }
    };

    if success {
        println!("\nSuccessfully terminated.");
    } else {
        println!("\nTerminated with errors.");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let json_logging = std::env::var(settings::env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("warn,loracheck={default_level}"))
    });

    // Logs go to stderr; stdout carries the command's report.
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::List { page, total } => {
            let Some(checker) = connect(&args.settings) else {
                return Ok(false);
            };
            run_list(&checker, page, total).await
        }
        Command::Query { deveui } => {
            let Some(checker) = connect(&args.settings) else {
                return Ok(false);
            };
            run_query(&checker, &deveui).await
        }
        Command::Verify { deveui } => {
            let Some(checker) = connect(&args.settings) else {
                return Ok(false);
            };
            run_verify(&checker, &deveui).await
        }
        Command::AddAbpDevice {
            appeui,
            appkey,
            device,
        } => {
            let credentials = device
                .credentials()
                .with_opt(CredentialField::AppEui, appeui)
                .with_opt(CredentialField::AppKey, appkey);
            run_add(
                ProvisioningRequest::abp(credentials),
                device.dry_run,
                &args.settings,
            )
            .await
        }
        Command::AddOtaaDevice {
            appskey,
            nwkskey,
            devaddr,
            device,
        } => {
            let credentials = device
                .credentials()
                .with_opt(CredentialField::AppSKey, appskey)
                .with_opt(CredentialField::NwkSKey, nwkskey)
                .with_opt(CredentialField::DevAddr, devaddr);
            run_add(
                ProvisioningRequest::otaa(credentials),
                device.dry_run,
                &args.settings,
            )
            .await
        }
    }
}

/// Registry-backed checker, or `None` after reporting why it is unavailable.
fn connect(settings_path: &Path) -> Option<DeviceChecker> {
    let connection = match settings::load(settings_path) {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!("{}", settings::FORMAT_HINT);
            return None;
        }
    };

    println!(
        "Using IoT Hub {} with policy {}\n",
        connection.host_name, connection.shared_access_key_name
    );

    let config = IotHubConfig::default();
    tracing::debug!(
        host = %connection.host_name,
        timeout_secs = config.timeout.as_secs(),
        "Creating IoT Hub registry client"
    );
    match IotHubRegistry::new(&connection, config) {
        Ok(registry) => Some(DeviceChecker::new(Arc::new(registry))),
        Err(e) => {
            eprintln!("Error connecting to IoT Hub (possible error in connection string): {e}");
            None
        }
    }
}

async fn run_list(checker: &DeviceChecker, page: usize, total: Option<usize>) -> Result<bool> {
    let limit = total.map_or_else(|| "all".to_string(), |t| t.to_string());
    println!("Listing devices (page size {page}, total {limit})...\n");

    let mut records = checker.list_devices(page, total);
    let mut count = 0usize;
    while let Some(record) = records.next().await {
        let record = record?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        count += 1;
    }

    println!("\nInfo: {count} device(s) listed.");
    Ok(true)
}

async fn run_query(checker: &DeviceChecker, device_id: &str) -> Result<bool> {
    let twin = checker.query_twin(device_id).await?;
    println!("{}", serde_json::to_string_pretty(&twin)?);
    Ok(true)
}

async fn run_verify(checker: &DeviceChecker, device_id: &str) -> Result<bool> {
    let verification = checker.verify_device(device_id).await?;
    println!("{}\n", serde_json::to_string_pretty(&verification.twin)?);

    if verification.kind != ActivationKind::Indeterminate {
        println!("{} device configuration detected.", verification.kind);
    }
    for line in verification.outcome.render() {
        println!("{line}");
    }

    let valid = verification.is_valid();
    if valid {
        println!("The configuration for device {device_id} is valid.");
    } else {
        println!("Error: The configuration for device {device_id} is NOT valid.");
    }
    Ok(valid)
}

async fn run_add(
    request: ProvisioningRequest,
    dry_run: bool,
    settings_path: &Path,
) -> Result<bool> {
    let prepared = provisioning::prepare(request);
    print_prepared(&prepared);

    let (Some(payload), Some(device_id)) = (&prepared.payload, prepared.device_id()) else {
        println!("Error: Can not add {} device.", prepared.mode);
        return Ok(false);
    };

    if dry_run {
        println!("\nDry run, {} device {device_id} was not submitted.", prepared.mode);
        println!("{}", serde_json::to_string_pretty(payload)?);
        return Ok(true);
    }

    let Some(checker) = connect(settings_path) else {
        return Ok(false);
    };

    println!("Adding {} device to IoT Hub: {device_id} ...", prepared.mode);
    let Some(result) = checker.register(&prepared).await? else {
        return Ok(false);
    };

    if !result.is_successful {
        println!("Error adding device:");
        for error in &result.errors {
            println!(
                "Device Id: {}, Code: {}, Error: {}",
                error.device_id, error.error_code, error.error_status
            );
        }
        return Ok(false);
    }

    println!("Success!\n");
    let twin = checker.query_twin(device_id).await?;
    println!("{}", serde_json::to_string_pretty(&twin)?);
    Ok(true)
}

fn print_prepared(prepared: &Provisioning) {
    for field in &prepared.generated {
        let value = prepared.credentials.get(*field).unwrap_or_default();
        println!("Info: Generating missing {field}: {value}");
    }
    for line in prepared.outcome.render() {
        println!("{line}");
    }
}
