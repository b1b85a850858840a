//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `dashboard.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - SerialConfig: which port to open and how to pace errors.
//!     - StorageConfig: where the latest reading is persisted.
//!     - DashboardConfig: web server address, refresh cycle, map zoom.
//!     - IngestConfig: what a Longitude line publishes when no condition is set.
//!     - AuthConfig: demo credentials file and recovery questions.
//!     - LoggingConfig: log level and serial line echo.
//!
//! ==============================================================================

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// how long one read may block before it is retried silently
    pub read_timeout_ms: u64,
    /// pause after a failed read before the loop resumes
    pub retry_pause_ms: u64,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 1000,
            retry_pause_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub record_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { record_file: PathBuf::from("coordinates.json") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind_addr: String,
    pub refresh_ms: u64,
    pub zoom: u8,
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        // interval() panics on zero
        Duration::from_millis(self.refresh_ms.max(100))
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            refresh_ms: 2000,
            zoom: 20,
        }
    }
}

/// What a Longitude line publishes while the condition is empty.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmptyConditionPolicy {
    /// publish the empty record, dropping the coordinates just read
    #[default]
    Clear,
    /// publish the coordinates with an empty condition
    KeepCoordinates,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct IngestConfig {
    pub empty_condition: EmptyConditionPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecoveryEntry {
    pub section: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub credentials_file: PathBuf,
    pub default_section: String,
    pub default_password: String,
    pub recovery: Vec<RecoveryEntry>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("credentials.json"),
            default_section: "ECE".to_string(),
            default_password: "1234".to_string(),
            recovery: vec![RecoveryEntry {
                section: "ECE".to_string(),
                question: "What is your name?".to_string(),
                answer: "s".to_string(),
            }],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_serial_lines: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_serial_lines: true }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback
    ///
    /// runs before the tracing subscriber exists, so it reports with println.
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("dashboard.toml"),
            PathBuf::from("..").join("config").join("dashboard.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("┌─────────────────────────────────────────┐");
        println!("│         DASHBOARD CONFIGURATION         │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Serial: {} @ {} baud", self.serial.port, self.serial.baud_rate);
        println!("│ Record file: {}", self.storage.record_file.display());
        println!("│ Web: http://{}", self.dashboard.bind_addr);
        println!("│ Refresh: {}ms | Zoom: {}", self.dashboard.refresh_ms, self.dashboard.zoom);
        println!("│ Empty condition: {:?}", self.ingest.empty_condition);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}
