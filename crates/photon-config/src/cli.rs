//! Command-line argument parsing for the `photon` loader.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::Config;

/// Detail tier forced from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    /// Full-detail tier.
    High,
    /// Intermediate tier (currently renders the full-detail tier).
    Medium,
    /// Reduced tier.
    Low,
}

/// Photon command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "photon", about = "Stream a 3D asset into a scene with LOD and instancing")]
pub struct CliArgs {
    /// Asset file to load (.glb, .gltf, .obj, .stl).
    pub file: PathBuf,

    /// Chunk size in bytes used when merging embedded payloads.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// File size in bytes above which the heavy-decode phase is engaged.
    #[arg(long)]
    pub heavy_threshold: Option<u64>,

    /// Force a detail tier after loading.
    #[arg(long, value_enum)]
    pub tier: Option<TierArg>,

    /// Camera distance used to evaluate automatic LOD switching.
    #[arg(long)]
    pub camera_distance: Option<f32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(size) = args.chunk_size {
            self.loader.chunk_size_bytes = size;
        }
        if let Some(threshold) = args.heavy_threshold {
            self.loader.heavy_decode_threshold_bytes = threshold;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> CliArgs {
        CliArgs {
            file: PathBuf::from("model.glb"),
            chunk_size: None,
            heavy_threshold: None,
            tier: None,
            camera_distance: None,
            log_level: None,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            chunk_size: Some(1024),
            log_level: Some("debug".to_string()),
            ..bare_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.loader.chunk_size_bytes, 1024);
        assert_eq!(config.debug.log_level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(config.loader.heavy_decode_threshold_bytes, 100 * 1024 * 1024);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&bare_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = CliArgs::try_parse_from([
            "photon",
            "scene.gltf",
            "--tier",
            "low",
            "--camera-distance",
            "20",
        ])
        .unwrap();
        assert_eq!(args.file, PathBuf::from("scene.gltf"));
        assert_eq!(args.tier, Some(TierArg::Low));
        assert_eq!(args.camera_distance, Some(20.0));
    }
}
