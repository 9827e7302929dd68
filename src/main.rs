use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use direwolf_monitor::config::{self, MonitorConfigFile, Overrides};
use direwolf_monitor::line_follower::StartPosition;
use direwolf_monitor::log_format::MonitorFormat;
use direwolf_monitor::metrics;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;

#[derive(Parser)]
#[command(name = "dwm")]
#[command(about = "Bridge direwolf's log to MQTT and render APRS packets in the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail direwolf.log and put entries in MQTT
    LogToMqtt {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        broker: BrokerArgs,

        /// The direwolf log path and filename [default: ./direwolf.log]
        #[arg(long)]
        direwolf_log: Option<PathBuf>,

        /// Replay the whole log before following it
        #[arg(long)]
        from_start: bool,
    },
    /// Read entries from MQTT and print decoded packets
    MqttToTerminal {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        broker: BrokerArgs,

        /// Your latitude, for bearing and distance to each station
        #[arg(long, env = "DWM_LATITUDE", allow_negative_numbers = true)]
        latitude: Option<f64>,

        /// Your longitude, for bearing and distance to each station
        #[arg(long, env = "DWM_LONGITUDE", allow_negative_numbers = true)]
        longitude: Option<f64>,

        /// No colors or symbol icons
        #[arg(long)]
        plain: bool,
    },
    /// Show the version and build details
    Version,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Critical | LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// The log level to use for logging
    #[arg(long, value_enum, ignore_case = true, default_value = "DEBUG")]
    loglevel: LogLevel,

    /// Don't log to the console
    #[arg(long)]
    quiet: bool,

    /// Config file for direwolf-monitor (falls back to DWM_CONFIG, then ./direwolf-monitor.toml)
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Serve Prometheus metrics on this port
    #[arg(long)]
    metrics_port: Option<u16>,
}

#[derive(Args, Debug)]
struct BrokerArgs {
    /// MQTT hostname
    #[arg(long, env = "DWM_MQTT_HOST")]
    mqtt_host: Option<String>,

    /// MQTT port [default: 1883]
    #[arg(long, env = "DWM_MQTT_PORT")]
    mqtt_port: Option<u16>,

    /// The MQTT topic for log entries [default: direwolf]
    #[arg(long, env = "DWM_MQTT_TOPIC")]
    mqtt_topic: Option<String>,

    /// The MQTT username for login
    #[arg(long, env = "DWM_MQTT_USERNAME")]
    mqtt_username: Option<String>,

    /// The MQTT password for login
    #[arg(long, env = "DWM_MQTT_PASSWORD", hide_env_values = true)]
    mqtt_password: Option<String>,
}

impl BrokerArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            mqtt_host: self.mqtt_host,
            mqtt_port: self.mqtt_port,
            mqtt_topic: self.mqtt_topic,
            mqtt_username: self.mqtt_username,
            mqtt_password: self.mqtt_password,
            ..Default::default()
        }
    }
}

fn init_logging(common: &CommonArgs, config: &MonitorConfigFile) -> Result<()> {
    // RUST_LOG wins over --loglevel
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = common.loglevel.as_filter();
        EnvFilter::new(format!("warn,direwolf_monitor={0},dwm={0}", level))
    });

    let console_layer = (!common.quiet).then(|| {
        tracing_subscriber::fmt::layer()
            .event_format(MonitorFormat::new(
                config.date_format(),
                std::io::stderr().is_terminal(),
            ))
            .with_writer(std::io::stderr)
    });

    let file_layer = match &config.logging.logfile {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .event_format(MonitorFormat::new(config.date_format(), false))
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")
}

/// Load config, start logging, and bring up the metrics endpoint when asked for
fn prepare(common: &CommonArgs, initialize_metrics: fn()) -> Result<MonitorConfigFile> {
    let config = config::load_config(common.config_file.as_deref())?;
    init_logging(common, &config)?;
    info!("direwolf-monitor {} starting", env!("CARGO_PKG_VERSION"));

    if let Some(port) = common.metrics_port {
        // Install the recorder and zero the counters before the first scrape
        metrics::init_metrics()?;
        initialize_metrics();
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(port).await {
                error!("Metrics server stopped: {:#}", e);
            }
        });
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::LogToMqtt {
            common,
            broker,
            direwolf_log,
            from_start,
        } => {
            let config = prepare(&common, metrics::initialize_publish_metrics)?;
            let overrides = Overrides {
                direwolf_log,
                ..broker.into_overrides()
            };
            let settings = config.publish_settings(&overrides)?;
            let start = if from_start {
                StartPosition::Beginning
            } else {
                StartPosition::End
            };
            commands::handle_log_to_mqtt(settings, start).await
        }
        Commands::MqttToTerminal {
            common,
            broker,
            latitude,
            longitude,
            plain,
        } => {
            let config = prepare(&common, metrics::initialize_subscribe_metrics)?;
            let overrides = Overrides {
                latitude,
                longitude,
                ..broker.into_overrides()
            };
            let settings = config.subscribe_settings(&overrides)?;
            commands::handle_mqtt_to_terminal(settings, plain).await
        }
        Commands::Version => {
            commands::handle_version();
            Ok(())
        }
    }
}
