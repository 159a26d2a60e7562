//! Configuration system for the Photon asset pipeline.
//!
//! Provides runtime-configurable loader and LOD settings that persist to disk
//! as RON files. Supports CLI overrides via clap, hot-reload detection,
//! forward/backward compatible serialization, and validation of the values
//! the pipeline cannot recover from.

mod cli;
mod config;
mod error;

pub use cli::{CliArgs, TierArg};
pub use config::{Config, DebugConfig, HeavyDecoderConfig, LoaderConfig, LodConfig};
pub use error::ConfigError;
