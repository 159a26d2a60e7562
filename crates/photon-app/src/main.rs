//! The `photon` binary: load one asset file and report what it became.

mod platform;

use std::process::ExitCode;

use clap::Parser;
use photon_assets::{AssetLoadController, LoadCallbacks, LoadOutcome, RawAsset};
use photon_config::{CliArgs, Config, TierArg};
use photon_lod::DetailTier;
use tracing::{error, info, warn};

use crate::platform::PlatformDirs;

fn tier_of(arg: TierArg) -> DetailTier {
    match arg {
        TierArg::High => DetailTier::High,
        TierArg::Medium => DetailTier::Medium,
        TierArg::Low => DetailTier::Low,
    }
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match &args.config {
        Some(dir) => Ok(PlatformDirs::from_config_override(dir)),
        None => PlatformDirs::resolve(),
    };
    let dirs = match dirs.and_then(|d| d.create_dirs().map(|()| d)) {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Failed to initialize platform directories: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    photon_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args, &config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &CliArgs, config: &Config) -> Result<(), String> {
    let controller = AssetLoadController::new(config).map_err(|e| e.to_string())?;
    let asset = RawAsset::from_path(&args.file)
        .map_err(|e| format!("cannot read {}: {e}", args.file.display()))?;

    let callbacks = LoadCallbacks::new()
        .on_progress(|percent| info!(percent, "progress"))
        .on_heavy_decode(|active| {
            if active {
                info!("heavy decode started");
            }
        })
        .on_load_end(|| info!("load finished"));

    let handle = controller.load(asset, callbacks).map_err(|e| e.to_string())?;
    let summary = match handle.outcome().await {
        LoadOutcome::Ready(summary) => summary,
        LoadOutcome::Failed(e) => return Err(format!("load failed: {e}")),
        LoadOutcome::Superseded => return Err("load was superseded".to_string()),
    };

    println!("Loaded {}", args.file.display());
    println!("  meshes:          {}", summary.meshes);
    println!("  instances:       {}", summary.instances);
    println!("  low-detail:      {}", summary.low_meshes);
    println!("  instance groups: {}", summary.instance_groups);
    if summary.skipped_groups > 0 {
        warn!(skipped = summary.skipped_groups, "duplicate groups left uninstanced");
    }
    println!(
        "  switch distances: near={} far={}",
        summary.asset.distances.near(),
        summary.asset.distances.far()
    );

    if let Some(tier) = args.tier {
        let tier = tier_of(tier);
        if controller.set_active_lod(tier) {
            println!("  tier: {tier:?} (forced)");
        }
    } else if let Some(distance) = args.camera_distance
        && let Some(tier) = controller.update_lod(distance)
    {
        println!("  tier at distance {distance}: {tier:?}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_mapping() {
        assert_eq!(tier_of(TierArg::High), DetailTier::High);
        assert_eq!(tier_of(TierArg::Medium), DetailTier::Medium);
        assert_eq!(tier_of(TierArg::Low), DetailTier::Low);
    }

    #[tokio::test]
    async fn test_run_loads_obj_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("quad.obj");
        std::fs::write(
            &file,
            "o quad\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )
        .unwrap();
        let args = CliArgs::parse_from(["photon", file.to_str().unwrap(), "--tier", "low"]);
        assert!(run(&args, &Config::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("model.fbx");
        std::fs::write(&file, b"binary").unwrap();
        let args = CliArgs::parse_from(["photon", file.to_str().unwrap()]);
        let err = run(&args, &Config::default()).await.unwrap_err();
        assert!(err.contains("fbx"));
    }
}
