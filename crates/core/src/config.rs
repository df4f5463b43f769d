use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Settings;

/// Configuration manager for cuelight settings.
///
/// Separates the schema (defaults, valid ranges, descriptions) from the persisted values.
/// Settings are stored as JSON, `cuelight.json` in the working directory by default.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub playback: PlaybackConfigSchema,
    pub output: OutputConfigSchema,
    pub osc: OscConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfigSchema {
    pub clip_directory: ConfigOption<String>,
    pub target_fps: ConfigOption<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfigSchema {
    pub output_enabled: ConfigOption<bool>,
    pub brightness: ConfigOption<f32>,
    pub start_universe: ConfigOption<u16>,
    pub blackout_channels: ConfigOption<usize>,
    pub artnet_broadcast: ConfigOption<bool>,
    pub artnet_source_ip: ConfigOption<String>,
    pub artnet_dest_ip: ConfigOption<String>,
    pub artnet_port: ConfigOption<u16>,
    pub keepalive_interval_ms: ConfigOption<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscConfigSchema {
    pub osc_enabled: ConfigOption<bool>,
    pub osc_address: ConfigOption<String>,
    pub osc_port: ConfigOption<u16>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub description: String,
    pub requires_restart: bool,
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Failed to parse config file: {0}")]
    ParseError(String),
    #[error("Failed to serialize config: {0}")]
    SerializeError(String),
    #[error("Config validation errors: {}", .0.join(", "))]
    ValidationError(Vec<String>),
}

impl ConfigManager {
    /// Create a new configuration manager.
    /// If no path is provided, defaults to 'cuelight.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(|| PathBuf::from("cuelight.json"));

        Self {
            config_path,
            settings: Settings::default(),
        }
    }

    /// Load and validate settings from the configuration file.
    /// Writes a default file first if none exists.
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            log::info!(
                "No config at {}, writing defaults",
                self.config_path.display()
            );
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let config_file: ConfigFile =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        Self::validate_settings(&config_file.settings).map_err(ConfigError::ValidationError)?;

        self.settings = config_file.settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let created_at = self
            .read_created_at()
            .unwrap_or_else(|| now.clone());

        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at,
            modified_at: now,
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Validate, update and save settings
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::ValidationError)?;
        self.settings = settings;
        self.save()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        let defaults = Settings::default();

        ConfigSchema {
            playback: PlaybackConfigSchema {
                clip_directory: ConfigOption {
                    default: defaults.clip_directory,
                    valid_range: None,
                    description: "Directory scanned for .json and .bin clips".to_string(),
                    requires_restart: true,
                },
                target_fps: ConfigOption {
                    default: defaults.target_fps,
                    valid_range: Some((1.0, 240.0)),
                    description: "Clip playback rate in frames per second".to_string(),
                    requires_restart: true,
                },
            },
            output: OutputConfigSchema {
                output_enabled: ConfigOption {
                    default: defaults.output_enabled,
                    valid_range: None,
                    description: "Send frames to fixtures via Art-Net".to_string(),
                    requires_restart: true,
                },
                brightness: ConfigOption {
                    default: defaults.brightness,
                    valid_range: Some((0.0, 1.0)),
                    description: "Master brightness applied to every dispatched frame"
                        .to_string(),
                    requires_restart: false,
                },
                start_universe: ConfigOption {
                    default: defaults.start_universe,
                    valid_range: Some((0, 32767)),
                    description: "Art-Net universe receiving channels 1-512".to_string(),
                    requires_restart: true,
                },
                blackout_channels: ConfigOption {
                    default: defaults.blackout_channels,
                    valid_range: Some((1, 65536)),
                    description: "Channels zeroed by a hard stop".to_string(),
                    requires_restart: false,
                },
                artnet_broadcast: ConfigOption {
                    default: defaults.artnet_broadcast,
                    valid_range: None,
                    description: "Use broadcast mode for Art-Net (vs unicast)".to_string(),
                    requires_restart: true,
                },
                artnet_source_ip: ConfigOption {
                    default: defaults.artnet_source_ip,
                    valid_range: None,
                    description: "Local IP address Art-Net is sent from".to_string(),
                    requires_restart: true,
                },
                artnet_dest_ip: ConfigOption {
                    default: defaults.artnet_dest_ip,
                    valid_range: None,
                    description: "Destination IP for Art-Net unicast (empty for broadcast)"
                        .to_string(),
                    requires_restart: true,
                },
                artnet_port: ConfigOption {
                    default: defaults.artnet_port,
                    valid_range: Some((1024, 65535)),
                    description: "UDP port for Art-Net output".to_string(),
                    requires_restart: true,
                },
                keepalive_interval_ms: ConfigOption {
                    default: defaults.keepalive_interval_ms,
                    valid_range: Some((100, 10_000)),
                    description: "How often the last frame is re-sent while idle".to_string(),
                    requires_restart: true,
                },
            },
            osc: OscConfigSchema {
                osc_enabled: ConfigOption {
                    default: defaults.osc_enabled,
                    valid_range: None,
                    description: "Listen for OSC cue events".to_string(),
                    requires_restart: true,
                },
                osc_address: ConfigOption {
                    default: defaults.osc_address,
                    valid_range: None,
                    description: "Address the OSC listener binds to".to_string(),
                    requires_restart: true,
                },
                osc_port: ConfigOption {
                    default: defaults.osc_port,
                    valid_range: Some((1024, 65535)),
                    description: "UDP port the OSC listener binds to".to_string(),
                    requires_restart: true,
                },
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        if let Some((min, max)) = schema.playback.target_fps.valid_range {
            if !(min..=max).contains(&settings.target_fps) {
                errors.push(format!("target_fps must be between {} and {}", min, max));
            }
        }

        if let Some((min, max)) = schema.output.brightness.valid_range {
            if !(min..=max).contains(&settings.brightness) {
                errors.push(format!("brightness must be between {} and {}", min, max));
            }
        }

        if let Some((min, max)) = schema.output.start_universe.valid_range {
            if !(min..=max).contains(&settings.start_universe) {
                errors.push(format!("start_universe must be between {} and {}", min, max));
            }
        }

        if let Some((min, max)) = schema.output.blackout_channels.valid_range {
            if !(min..=max).contains(&settings.blackout_channels) {
                errors.push(format!(
                    "blackout_channels must be between {} and {}",
                    min, max
                ));
            }
        }

        if let Some((min, max)) = schema.output.artnet_port.valid_range {
            if !(min..=max).contains(&settings.artnet_port) {
                errors.push(format!("artnet_port must be between {} and {}", min, max));
            }
        }

        if let Some((min, max)) = schema.output.keepalive_interval_ms.valid_range {
            if !(min..=max).contains(&settings.keepalive_interval_ms) {
                errors.push(format!(
                    "keepalive_interval_ms must be between {} and {}",
                    min, max
                ));
            }
        }

        if let Some((min, max)) = schema.osc.osc_port.valid_range {
            if !(min..=max).contains(&settings.osc_port) {
                errors.push(format!("osc_port must be between {} and {}", min, max));
            }
        }

        if settings.artnet_source_ip.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "artnet_source_ip '{}' is not an IP address",
                settings.artnet_source_ip
            ));
        }

        if !settings.artnet_dest_ip.is_empty() && settings.artnet_dest_ip.parse::<IpAddr>().is_err()
        {
            errors.push(format!(
                "artnet_dest_ip '{}' is not an IP address",
                settings.artnet_dest_ip
            ));
        }

        if settings.osc_address.parse::<IpAddr>().is_err() {
            errors.push(format!(
                "osc_address '{}' is not an IP address",
                settings.osc_address
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset to default settings
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }

    fn read_created_at(&self) -> Option<String> {
        let content = fs::read_to_string(&self.config_path).ok()?;
        let existing: ConfigFile = serde_json::from_str(&content).ok()?;
        Some(existing.created_at)
    }
}
