//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Streaming, chunking and heavy-decode settings.
    pub loader: LoaderConfig,
    /// Detail tier construction and switching.
    pub lod: LodConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Loader configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Size of each slice when an embedded payload is merged into the scene.
    pub chunk_size_bytes: usize,
    /// Files strictly larger than this engage the heavy-decode phase.
    pub heavy_decode_threshold_bytes: u64,
    /// Interval between synthetic progress ticks while decoding, in milliseconds.
    pub decode_tick_ms: u64,
    /// Percentage points added by each synthetic tick.
    pub decode_tick_step: u8,
    /// Resource locations handed to the heavy decoder when it is engaged.
    pub heavy_decoder: HeavyDecoderConfig,
}

/// Resource locations for the heavy decoder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeavyDecoderConfig {
    /// Location of the decoder module wrapper.
    pub module_location: String,
    /// Location of the decoder binary.
    pub binary_location: String,
    /// Location of the fallback decoder used when the binary cannot be loaded.
    pub fallback_location: String,
}

/// Level-of-detail configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Reserved intermediate switch distance, in scene units.
    pub near_distance: f32,
    /// Distance at and beyond which the low-detail tier is shown.
    pub far_distance: f32,
    /// Target vertex ratio when simplifying freeform geometry.
    pub simplify_ratio: f32,
    /// Container formats keep every `container_stride`-th mesh in the low tier.
    pub container_stride: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: 512 * 512,
            heavy_decode_threshold_bytes: 100 * 1024 * 1024,
            decode_tick_ms: 100,
            decode_tick_step: 1,
            heavy_decoder: HeavyDecoderConfig::default(),
        }
    }
}

impl Default for HeavyDecoderConfig {
    fn default() -> Self {
        Self {
            module_location: "decoders/heavy_decoder_wrapper.js".to_string(),
            binary_location: "decoders/heavy_decoder.wasm".to_string(),
            fallback_location: "decoders/heavy_decoder_fallback.js".to_string(),
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            near_distance: 5.0,
            far_distance: 15.0,
            simplify_ratio: 0.5,
            container_stride: 3,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Validation ---

impl Config {
    /// Check every value the pipeline treats as a programmer error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.chunk_size_bytes == 0 {
            return Err(ConfigError::invalid(
                "loader.chunk_size_bytes",
                "must be greater than zero",
            ));
        }
        if self.loader.decode_tick_ms == 0 {
            return Err(ConfigError::invalid(
                "loader.decode_tick_ms",
                "must be greater than zero",
            ));
        }
        if self.lod.container_stride == 0 {
            return Err(ConfigError::invalid(
                "lod.container_stride",
                "must be greater than zero",
            ));
        }
        let ratio = self.lod.simplify_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::invalid(
                "lod.simplify_ratio",
                format!("{ratio} is outside (0, 1]"),
            ));
        }
        let (near, far) = (self.lod.near_distance, self.lod.far_distance);
        if !near.is_finite() || !far.is_finite() || near <= 0.0 || near >= far {
            return Err(ConfigError::invalid(
                "lod",
                format!("distances must satisfy 0 < near < far, got near={near} far={far}"),
            ));
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
