use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::geo::GeoFix;
use crate::line_follower::DEFAULT_POLL_INTERVAL;
use crate::mqtt_bridge::{
    BrokerConfig, BrokerConfigBuilder, DEFAULT_KEEP_ALIVE, DEFAULT_PORT, DEFAULT_TOPIC,
    PUBLISH_CLIENT_ID, SUBSCRIBE_CLIENT_ID,
};

pub const CONFIG_ENV_VAR: &str = "DWM_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "./direwolf-monitor.toml";
pub const DEFAULT_DIREWOLF_LOG: &str = "./direwolf.log";
pub const DEFAULT_PRIMARY_SHEET: &str = "./aprs-symbols-128-0.png";
pub const DEFAULT_SECONDARY_SHEET: &str = "./aprs-symbols-128-1.png";
pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MqttSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub topic: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirewolfSection {
    pub log_file: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocationSection {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SymbolsSection {
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// chrono strftime pattern for log timestamps
    pub date_format: Option<String>,
    /// Also append log records to this file
    pub logfile: Option<PathBuf>,
}

/// Top-level config file structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfigFile {
    pub mqtt: MqttSection,
    pub direwolf: DirewolfSection,
    pub location: LocationSection,
    pub symbols: SymbolsSection,
    pub logging: LoggingSection,
}

/// Values given on the command line or through `DWM_*` environment variables.
/// They win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mqtt_host: Option<String>,
    pub mqtt_port: Option<u16>,
    pub mqtt_topic: Option<String>,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub direwolf_log: Option<PathBuf>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Everything `log-to-mqtt` needs
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub broker: BrokerConfig,
    pub log_file: PathBuf,
    pub poll_interval: Duration,
}

/// Everything `mqtt-to-terminal` needs
#[derive(Debug, Clone)]
pub struct SubscribeSettings {
    pub broker: BrokerConfig,
    pub reference: Option<GeoFix>,
    pub primary_sheet: PathBuf,
    pub secondary_sheet: PathBuf,
}

impl MonitorConfigFile {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config: MonitorConfigFile =
            toml::from_str(&contents).with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(config)
    }

    pub fn date_format(&self) -> &str {
        self.logging
            .date_format
            .as_deref()
            .unwrap_or(DEFAULT_DATE_FORMAT)
    }

    pub fn publish_settings(&self, overrides: &Overrides) -> Result<PublishSettings> {
        let broker = self.broker_config(overrides, PUBLISH_CLIENT_ID)?;
        let log_file = overrides
            .direwolf_log
            .clone()
            .or_else(|| self.direwolf.log_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DIREWOLF_LOG));
        let poll_interval = self
            .direwolf
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL);

        Ok(PublishSettings {
            broker,
            log_file,
            poll_interval,
        })
    }

    pub fn subscribe_settings(&self, overrides: &Overrides) -> Result<SubscribeSettings> {
        Ok(SubscribeSettings {
            broker: self.broker_config(overrides, SUBSCRIBE_CLIENT_ID)?,
            reference: self.reference(overrides)?,
            primary_sheet: self
                .symbols
                .primary
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PRIMARY_SHEET)),
            secondary_sheet: self
                .symbols
                .secondary
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SECONDARY_SHEET)),
        })
    }

    fn broker_config(&self, overrides: &Overrides, client_id: &str) -> Result<BrokerConfig> {
        let Some(host) = overrides.mqtt_host.clone().or_else(|| self.mqtt.host.clone()) else {
            bail!("No MQTT host configured (use --mqtt-host, DWM_MQTT_HOST or [mqtt] host)");
        };

        Ok(BrokerConfigBuilder::new()
            .host(host)
            .port(overrides.mqtt_port.or(self.mqtt.port).unwrap_or(DEFAULT_PORT))
            .topic(
                overrides
                    .mqtt_topic
                    .clone()
                    .or_else(|| self.mqtt.topic.clone())
                    .unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            )
            .credentials(
                overrides
                    .mqtt_username
                    .clone()
                    .or_else(|| self.mqtt.username.clone()),
                overrides
                    .mqtt_password
                    .clone()
                    .or_else(|| self.mqtt.password.clone()),
            )
            .client_id(client_id)
            .keep_alive(
                self.mqtt
                    .keep_alive_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_KEEP_ALIVE),
            )
            .build())
    }

    /// Reference location for geo annotation; both coordinates or neither
    fn reference(&self, overrides: &Overrides) -> Result<Option<GeoFix>> {
        let latitude = overrides.latitude.or(self.location.latitude);
        let longitude = overrides.longitude.or(self.location.longitude);

        match (latitude, longitude) {
            (None, None) => Ok(None),
            (Some(latitude), Some(longitude)) => {
                if !(-90.0..=90.0).contains(&latitude) {
                    bail!("Latitude {} is outside -90..90", latitude);
                }
                if !(-180.0..=180.0).contains(&longitude) {
                    bail!("Longitude {} is outside -180..180", longitude);
                }
                Ok(Some(GeoFix::new(latitude, longitude)))
            }
            _ => bail!("Both latitude and longitude are needed for a reference location"),
        }
    }
}

/// Resolve the config file path.
///
/// Priority:
/// 1. `--config-file`
/// 2. `DWM_CONFIG` env var
/// 3. `./direwolf-monitor.toml`, when it exists
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}

/// Load the config file if one is configured, otherwise use built-in defaults
pub fn load_config(explicit: Option<&Path>) -> Result<MonitorConfigFile> {
    match config_file_path(explicit) {
        Some(path) => MonitorConfigFile::load(&path),
        None => Ok(MonitorConfigFile::default()),
    }
}
