#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates, inspects and resets Castaway islands.

mod config;
mod preview;
mod scene;

use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use castaway_core::{GenerationEvent, StageStatus};
use castaway_system_bootstrap::Bootstrap;
use castaway_world::persist::SaveFile;
use clap::{Parser, Subcommand};
use scene::GenmapScene;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pause between frames while the generator is throttled.
const FRAME: Duration = Duration::from_millis(16);

/// Widest preview printed by `inspect`.
const PREVIEW_COLUMNS: u32 = 80;

#[derive(Parser, Debug)]
#[command(name = "castaway", about = "Procedural island generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an island, or load the finished one already saved
    Generate {
        /// Random seed (random if not specified)
        #[arg(long)]
        seed: Option<u64>,

        /// Save file to read and write
        #[arg(long, default_value = "castaway.sav")]
        save: PathBuf,

        /// TOML file with generator tuning
        #[arg(long)]
        config: Option<PathBuf>,

        /// Screen size the map is scaled from, as WIDTHxHEIGHT
        #[arg(long, default_value = "1280x720", value_parser = parse_screen)]
        screen: (u32, u32),

        /// Override the minimum delay between generation steps
        #[arg(long)]
        step_delay_ms: Option<u64>,

        /// Stop after this many generation steps, leaving the island unfinished
        #[arg(long)]
        max_ticks: Option<u64>,
    },
    /// Describe the island stored in a save file
    Inspect {
        /// Save file to read
        #[arg(long, default_value = "castaway.sav")]
        save: PathBuf,
    },
    /// Delete a save file so the next run generates a new island
    Reset {
        /// Save file to delete
        #[arg(long, default_value = "castaway.sav")]
        save: PathBuf,
    },
}

fn parse_screen(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{value}`"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|error| format!("invalid screen dimension `{part}`: {error}"))
    };
    Ok((parse(width)?, parse(height)?))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Entry point for the Castaway command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            seed,
            save,
            config,
            screen,
            step_delay_ms,
            max_ticks,
        } => generate(seed, save, config, screen, step_delay_ms, max_ticks),
        Command::Inspect { save } => inspect(save),
        Command::Reset { save } => {
            let save = SaveFile::new(save);
            save.remove()
                .with_context(|| format!("failed to reset {}", save.path().display()))?;
            info!(path = %save.path().display(), "save_reset");
            Ok(())
        }
    }
}

fn generate(
    seed: Option<u64>,
    save: PathBuf,
    config: Option<PathBuf>,
    screen: (u32, u32),
    step_delay_ms: Option<u64>,
    max_ticks: Option<u64>,
) -> Result<()> {
    let bootstrap = Bootstrap;
    println!("{}", bootstrap.welcome_banner());

    let mut tuning = config::load_tuning(config.as_deref())?;
    if let Some(delay) = step_delay_ms {
        tuning.step_delay_ms = delay;
    }
    let seed = seed.unwrap_or_else(rand::random);
    let dimensions = bootstrap.map_dimensions(screen.0, screen.1);

    let mut scene = GenmapScene::open(SaveFile::new(save), dimensions, tuning, seed)?;
    let started = Instant::now();
    let mut events = Vec::new();
    let mut steps = 0_u64;

    loop {
        let status = scene.tick(started.elapsed(), &mut events);
        for event in events.drain(..) {
            report(&event);
        }

        match status {
            StageStatus::AllComplete => break,
            StageStatus::Throttled => thread::sleep(FRAME),
            StageStatus::InProgress | StageStatus::StageComplete => {
                steps += 1;
                if max_ticks.is_some_and(|limit| steps >= limit) {
                    info!(steps, stage = scene.generator().stage().label(), "generation_interrupted");
                    break;
                }
            }
        }
    }

    let outcome = scene.teardown()?;
    if outcome.completed {
        println!(
            "Island ready (seed {seed}, {} spawners).",
            outcome.spawners
        );
        if let Some(record) = outcome.player {
            println!(
                "Player starts at {}, {}.",
                record.position.column(),
                record.position.row()
            );
        }
    } else {
        println!("Island left unfinished after {steps} steps; it will be regenerated next run.");
    }
    Ok(())
}

fn report(event: &GenerationEvent) {
    match event {
        GenerationEvent::StageStarted { stage } => println!("> {}", stage.label()),
        GenerationEvent::TreesPlanted { planted, remaining } => {
            println!("  planted {planted} trees, {remaining} to go");
        }
        GenerationEvent::PlacementExhausted {
            stage,
            placed,
            requested,
        } => println!(
            "  {} gave up after placing {placed} of {requested}",
            stage.label()
        ),
        GenerationEvent::SpawnersPlaced { accepted, total } => {
            println!("  placed {accepted} spawners ({total} total)");
        }
        GenerationEvent::StageFinished { .. } | GenerationEvent::GenerationComplete => {}
    }
}

fn inspect(save: PathBuf) -> Result<()> {
    let save = SaveFile::new(save);
    let path = save.path().display().to_string();
    let map = save
        .load_map()
        .with_context(|| format!("failed to read map from {path}"))?
        .with_context(|| format!("{path} holds no map"))?;
    let spawners = save
        .load_spawners()
        .with_context(|| format!("failed to read spawners from {path}"))?
        .unwrap_or_default();
    let player = save
        .load_player()
        .with_context(|| format!("failed to read player from {path}"))?;
    let generated = save.is_generated()?;

    println!("{path}");
    println!("  size:      {}x{}", map.width(), map.height());
    println!("  land:      {:.1}%", preview::land_ratio(&map) * 100.0);
    println!("  spawners:  {}", spawners.len());
    match player {
        Some(record) => println!(
            "  player:    {}, {}",
            record.position.column(),
            record.position.row()
        ),
        None => println!("  player:    none"),
    }
    println!("  finished:  {}", if generated { "yes" } else { "no" });
    println!();
    print!("{}", preview::render(&map, PREVIEW_COLUMNS));
    Ok(())
}
