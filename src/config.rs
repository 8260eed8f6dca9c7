use crate::error::{EgressError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EgressConfig {
    pub buffers: BufferConfig,
    pub cleanup: CleanupConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BufferConfig {
    /// Capacity of the private quit-reason copy, in bytes
    #[serde(default = "default_reason_capacity")]
    pub reason_capacity: usize,

    /// Capacity of the user-facing alert buffer, in bytes
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,

    /// Maximum script-stack frames included in an error alert
    #[serde(default = "default_stack_frame_limit")]
    pub stack_frame_limit: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CleanupConfig {
    /// Filename prefix of engine temp files swept at exit
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,

    /// Filename suffix of engine temp files swept at exit
    #[serde(default = "default_temp_suffix")]
    pub temp_suffix: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiagnosticsConfig {
    /// Run the engine in debug mode
    #[serde(default = "default_debug_mode")]
    pub debug_mode: bool,

    /// On a normal exit in debug mode, log dynamic render resources that
    /// were never deleted
    #[serde(default = "default_leak_check_at_exit")]
    pub leak_check_at_exit: bool,
}

impl EgressConfig {
    /// Load configuration from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_file("egress.toml")
    }

    /// Load configuration from a specific file, with `EGRESS_` environment
    /// variable overrides layered on top
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let settings = Config::builder()
            .set_default("buffers.reason_capacity", default_reason_capacity() as i64)?
            .set_default("buffers.alert_capacity", default_alert_capacity() as i64)?
            .set_default(
                "buffers.stack_frame_limit",
                default_stack_frame_limit() as i64,
            )?
            .set_default("cleanup.temp_prefix", default_temp_prefix())?
            .set_default("cleanup.temp_suffix", default_temp_suffix())?
            .set_default("diagnostics.debug_mode", default_debug_mode())?
            .set_default(
                "diagnostics.leak_check_at_exit",
                default_leak_check_at_exit(),
            )?
            // Configuration file is optional
            .add_source(File::with_name(&path_str).required(false))
            // Environment variables with EGRESS_ prefix. Field names
            // contain underscores, so nesting uses a double underscore:
            // EGRESS_BUFFERS__REASON_CAPACITY -> buffers.reason_capacity.
            .add_source(
                Environment::with_prefix("EGRESS")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: EgressConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.buffers.reason_capacity == 0 {
            return Err(EgressError::system(
                "Reason capacity must be greater than 0",
            ));
        }

        if self.buffers.alert_capacity == 0 {
            return Err(EgressError::system("Alert capacity must be greater than 0"));
        }

        if self.buffers.stack_frame_limit == 0 {
            return Err(EgressError::system(
                "Stack frame limit must be greater than 0",
            ));
        }

        if self.cleanup.temp_prefix.is_empty() && self.cleanup.temp_suffix.is_empty() {
            return Err(EgressError::system(
                "Temp file pattern must have a prefix or a suffix; an empty pattern would sweep every file",
            ));
        }

        Ok(())
    }

    /// Serialize the configuration to TOML, for `--print-config`
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            buffers: BufferConfig {
                reason_capacity: default_reason_capacity(),
                alert_capacity: default_alert_capacity(),
                stack_frame_limit: default_stack_frame_limit(),
            },
            cleanup: CleanupConfig {
                temp_prefix: default_temp_prefix(),
                temp_suffix: default_temp_suffix(),
            },
            diagnostics: DiagnosticsConfig {
                debug_mode: default_debug_mode(),
                leak_check_at_exit: default_leak_check_at_exit(),
            },
        }
    }
}

fn default_reason_capacity() -> usize {
    2048
}

fn default_alert_capacity() -> usize {
    1500
}

fn default_stack_frame_limit() -> usize {
    5
}

fn default_temp_prefix() -> String {
    "~eg".to_string()
}

fn default_temp_suffix() -> String {
    ".tmp".to_string()
}

fn default_debug_mode() -> bool {
    false
}

fn default_leak_check_at_exit() -> bool {
    true
}
