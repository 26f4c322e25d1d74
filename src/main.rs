//! Granule - Headless falling-sand simulation
//!
//! Usage: `granule [CONFIG] [--ticks N] [--realtime] [--verbose] [--write-config]`
//!
//! Without a CONFIG path the config is read from the default location, falling
//! back to built-in defaults.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use granule_core::SimConfig;
use granule_ecs::Universe;
use granule_world::{build_universe, populate, DenseGrid, Material, Position, Species};

/// Fixed step used unless `--realtime` is given
const FRAME: Duration = Duration::from_millis(16);

// === Clap === //

#[derive(Debug, Clone, Parser)]
#[command(about = "headless falling-sand simulation", long_about = None)]
struct CliArgs {
    /// Path to a TOML config; defaults to the user config directory
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Measure tick deltas with the wall clock instead of a fixed step
    #[arg(long)]
    realtime: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Save the effective config to the default location
    #[arg(long)]
    write_config: bool,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting Granule...");

    let config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SimConfig::load_or_default(),
    };

    if args.write_config {
        let path = config.save().context("Failed to save config")?;
        info!("Wrote config to {}", path.display());
    }

    let mut universe = build_universe(&config).context("Failed to set up universe")?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    populate(&mut universe, &config, &mut rng);
    log_census(&universe);

    let started = Instant::now();
    for _ in 0..args.ticks {
        if args.realtime {
            universe.tick();
        } else {
            universe.advance(FRAME);
        }
    }
    let elapsed = started.elapsed();

    let per_tick = if args.ticks > 0 {
        elapsed.div_f64(args.ticks as f64)
    } else {
        Duration::ZERO
    };
    info!(
        "Ran {} ticks in {:.2?} ({:.2?} per tick)",
        universe.tick_count(),
        elapsed,
        per_tick
    );
    log_census(&universe);

    Ok(())
}

/// Log how many particles of each material sit in each quarter of the world height
fn log_census(universe: &Universe) {
    let Some(height) = universe
        .resource::<DenseGrid>()
        .map(|grid| grid.height().max(1) as f32)
    else {
        return;
    };

    for material in [Material::Sand, Material::Water] {
        let mut bands = [0usize; 4];
        for data in universe.entities().iter() {
            let entity = data.entity();
            let (Some(species), Some(pos)) = (entity.get::<Species>(), entity.get::<Position>()) else {
                continue;
            };
            if species.material != material {
                continue;
            }
            let band = ((pos.0.y / height) * 4.0).clamp(0.0, 3.0) as usize;
            bands[band] += 1;
        }
        let total: usize = bands.iter().sum();
        info!("{:?}: {} particles, by height quarter {:?}", material, total, bands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let args = CliArgs::try_parse_from(["granule"]).unwrap();
        assert_eq!(args.config, None);
        assert_eq!(args.ticks, 600);
        assert!(!args.realtime && !args.verbose && !args.write_config);
    }

    #[test]
    fn test_cli_all_options() {
        let args = CliArgs::try_parse_from([
            "granule",
            "sim.toml",
            "--ticks",
            "25",
            "--realtime",
            "-v",
            "--write-config",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("sim.toml")));
        assert_eq!(args.ticks, 25);
        assert!(args.realtime && args.verbose && args.write_config);
    }

    #[test]
    fn test_cli_rejects_bad_input() {
        assert!(CliArgs::try_parse_from(["granule", "--ticks", "many"]).is_err());
        assert!(CliArgs::try_parse_from(["granule", "--frobnicate"]).is_err());
    }
}
