//! Shroom Sort headless driver
//!
//! Runs the simulation with a scripted player: sortable mushrooms are carried
//! to their area, evil ones are flicked away. Useful for balance passes and
//! for checking that a seed plays the same way twice.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use shroom_sort::audio::{AudioManager, LogSink};
use shroom_sort::consts::*;
use shroom_sort::persistence::{JsonFileStore, MemoryStore, ProgressStore};
use shroom_sort::sim::{
    EntityId, EntityKind, EntityState, GamePhase, GameState, Layout, PointerEvent, TickInput, tick,
};
use shroom_sort::{Settings, Tuning};

#[derive(Parser, Debug)]
#[command(name = "shroom-sort")]
#[command(about = "Play Shroom Sort headlessly with a scripted bot")]
struct Args {
    /// Run seed
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Stop after this many simulated seconds
    #[arg(long, default_value_t = 600.0)]
    max_seconds: f32,

    /// Stop once this level is reached
    #[arg(long, default_value_t = 10)]
    max_level: u32,

    /// Ticks the bot waits between actions (reaction time)
    #[arg(long, default_value_t = 20)]
    reaction_ticks: u32,

    /// Chance the bot drops a mushroom in the wrong area
    #[arg(long, default_value_t = 0.02)]
    mistake_rate: f32,

    /// Frame time fed to the accumulator (seconds)
    #[arg(long, default_value_t = 1.0 / 30.0)]
    frame_dt: f32,

    /// Balance overrides (JSON)
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Player preferences (JSON)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Progress file; kept in memory when omitted
    #[arg(long)]
    save: Option<PathBuf>,
}

/// What the bot does with the pointer on its next tick
#[derive(Debug, Clone, Copy)]
enum Plan {
    Idle,
    /// Holding an evil mushroom, throw it next tick
    Throw { from: Vec2 },
}

/// Scripted player
struct Bot {
    rng: Pcg32,
    reaction_ticks: u32,
    mistake_rate: f32,
    cooldown: u32,
    plan: Plan,
}

const BOT_POINTER: u32 = 0;

impl Bot {
    fn new(seed: u64, reaction_ticks: u32, mistake_rate: f32) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed ^ 0x5EED_B07),
            reaction_ticks,
            mistake_rate: mistake_rate.clamp(0.0, 1.0),
            cooldown: 0,
            plan: Plan::Idle,
        }
    }

    fn next_input(&mut self, state: &GameState) -> TickInput {
        let mut input = TickInput::default();

        if let Plan::Throw { from } = self.plan {
            // One unit in one tick is far above the flick threshold
            input.pointers.push(PointerEvent::Moved {
                pointer: BOT_POINTER,
                pos: from + Vec2::new(0.0, 1.0),
            });
            input.pointers.push(PointerEvent::Ended { pointer: BOT_POINTER });
            self.plan = Plan::Idle;
            return input;
        }

        if self.cooldown > 0 {
            self.cooldown -= 1;
            return input;
        }
        if state.phase != GamePhase::Playing {
            return input;
        }

        // Most urgent first
        let Some((id, kind, pos)) = state
            .entities
            .iter()
            .filter(|e| e.state() == EntityState::Wandering)
            .min_by(|a, b| a.life_remaining().total_cmp(&b.life_remaining()))
            .map(|e| (e.id, e.kind, e.pos))
        else {
            return input;
        };

        // Slow motion when something is about to expire
        let urgent = state.entity(id).is_some_and(|e| e.is_near_expiry());
        if urgent && !state.clock.slow_motion_active() {
            input.activate_slow_motion = true;
        }

        self.cooldown = self.reaction_ticks;
        input.pointers.push(PointerEvent::Began {
            pointer: BOT_POINTER,
            pos,
            hit: Some(id),
        });

        if kind == EntityKind::Evil {
            self.plan = Plan::Throw { from: pos };
            return input;
        }

        let target = self.pick_area(state, id, kind);
        input.pointers.push(PointerEvent::Moved {
            pointer: BOT_POINTER,
            pos: target,
        });
        input.pointers.push(PointerEvent::Ended { pointer: BOT_POINTER });
        input
    }

    fn pick_area(&mut self, state: &GameState, id: EntityId, kind: EntityKind) -> Vec2 {
        let wrong = self.rng.random::<f32>() < self.mistake_rate;
        let area = state
            .areas
            .iter()
            .find(|a| (a.accepted == kind) != wrong)
            .or_else(|| state.areas.first());
        match area {
            Some(a) => {
                if wrong {
                    log::debug!("Bot fumbles entity {id}");
                }
                a.region.center()
            }
            None => Vec2::ZERO,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let tuning = match &args.tuning {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Tuning::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => Tuning::default(),
    };
    let settings = match &args.settings {
        Some(path) => Settings::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Settings::default(),
    };
    let store: Box<dyn ProgressStore> = match &args.save {
        Some(path) => Box::new(JsonFileStore::new(path)),
        None => Box::new(MemoryStore::new()),
    };

    log::info!("Shroom Sort (headless) starting with seed {}", args.seed);
    let mut state = GameState::with_layout(args.seed, tuning, Layout::default(), store)?;
    let mut bot = Bot::new(args.seed, args.reaction_ticks, args.mistake_rate);
    let mut audio = AudioManager::from_settings(LogSink, &settings);

    let frame_dt = args.frame_dt.clamp(0.001, 0.1);
    let mut accumulator = 0.0f32;
    let mut elapsed = 0.0f32;

    while elapsed < args.max_seconds && !state.is_game_over() && state.level() < args.max_level {
        accumulator += frame_dt;
        elapsed += frame_dt;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = bot.next_input(&state);
            tick(&mut state, &input, SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }
        audio.handle_events(&state.drain_events());
    }

    let score = state.coordinator.score();
    println!("=== RUN SUMMARY ===");
    println!("  Seed:        {}", args.seed);
    println!("  Outcome:     {}", if state.is_game_over() { "game over" } else { "stopped" });
    println!("  Level:       {}", state.level());
    println!("  Score:       {}", score.total());
    println!("  Best score:  {}", state.coordinator.records().high_score());
    for kind in EntityKind::ALL {
        println!(
            "  {:<6} placed {:>4}, flicked {:>4}",
            kind.as_str(),
            score.placed(kind),
            score.flicked(kind)
        );
    }
    println!("  Mis-sorted:  {}", score.mis_sorted());
    println!("  Sim time:    {:.1}s ({} ticks)", state.clock.real_elapsed(), state.clock.ticks());

    Ok(())
}
