#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting enemy spawn commands.

use std::time::Duration;

use glam::Vec2;
use nova_defence_core::{
    Balancing, Command, EnemyTuning, EnemyVariant, Event, GamePhase, SpawnerTuning,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

const SPAWN_STREAM: u64 = 0x7370_6177_6e65_7200;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug)]
pub struct Config {
    spawner: SpawnerTuning,
    enemies: EnemyTuning,
    spawn_window: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration from explicit tuning values.
    #[must_use]
    pub fn new(
        spawner: SpawnerTuning,
        enemies: EnemyTuning,
        spawn_window: Duration,
        rng_seed: u64,
    ) -> Self {
        Self {
            spawner,
            enemies,
            spawn_window,
            rng_seed,
        }
    }

    /// Extracts the spawner configuration from session balancing data.
    #[must_use]
    pub fn from_balancing(balancing: &Balancing) -> Self {
        Self::new(
            balancing.spawner.clone(),
            balancing.enemies.clone(),
            balancing.phases.spawn_window(),
            balancing.rng_seed ^ SPAWN_STREAM,
        )
    }
}

/// Pure system that emits bursts of spawn commands during the wave phase and
/// grows the burst size after every cleared wave.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    rng: ChaCha8Rng,
    spawn_count: u32,
    strong_chance: f32,
    end_game: bool,
    mid_game: bool,
    wave_clock: Option<Duration>,
    next_burst: Duration,
    pending: u32,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            spawn_count: config.spawner.initial_spawn_count,
            strong_chance: config.spawner.strong_chance_initial.clamp(0.0, 1.0),
            end_game: false,
            mid_game: false,
            wave_clock: None,
            next_burst: Duration::ZERO,
            pending: 0,
            config,
        }
    }

    /// Enemies spawned per burst.
    #[must_use]
    pub const fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    /// Probability that a spawned enemy is strong once strong enemies apply.
    #[must_use]
    pub const fn strong_chance(&self) -> f32 {
        self.strong_chance
    }

    /// Reports whether the burst size reached its ceiling for good.
    #[must_use]
    pub const fn is_end_game(&self) -> bool {
        self.end_game
    }

    /// Spawns queued but not yet emitted.
    #[must_use]
    pub const fn pending(&self) -> u32 {
        self.pending
    }

    /// Reports whether the current wave may still produce enemies.
    #[must_use]
    pub fn is_spawning(&self) -> bool {
        self.pending > 0 || self.wave_clock.is_some_and(|clock| clock < self.config.spawn_window)
    }

    /// Consumes events to emit spawn commands.
    pub fn handle(&mut self, events: &[Event], phase: GamePhase, out: &mut Vec<Command>) {
        let mut accumulated = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => accumulated = accumulated.saturating_add(*dt),
                Event::PhaseChanged {
                    phase: GamePhase::Wave,
                } => self.start_wave(),
                Event::PhaseChanged { .. } => self.stop_wave(),
                Event::WaveCompleted { .. } => self.increase_spawn_rate(),
                Event::MidGameEntered => self.mid_game = true,
                _ => {}
            }
        }

        if phase != GamePhase::Wave {
            self.stop_wave();
            return;
        }

        self.advance_window(accumulated);
        self.drain(out);
    }

    /// Grows the burst size, or the strong-enemy probability once the burst
    /// size is capped.
    pub fn increase_spawn_rate(&mut self) {
        let tuning = &self.config.spawner;
        if self.spawn_count >= tuning.max_spawn_count {
            self.end_game = true;
            self.strong_chance = (self.strong_chance * tuning.strong_chance_growth).min(1.0);
            info!(strong_chance = self.strong_chance, "spawn rate capped");
            return;
        }

        let jitter = if tuning.increase_rate > 0.0 && tuning.increase_rate.is_finite() {
            self.rng.gen_range(0.0..tuning.increase_rate)
        } else {
            0.0
        };
        let grown = (self.spawn_count as f32 + tuning.spawn_increment * (1.0 + jitter)).round();
        self.spawn_count = if grown >= tuning.max_spawn_count as f32 {
            tuning.max_spawn_count
        } else {
            grown.max(0.0) as u32
        };
        info!(spawn_count = self.spawn_count, "spawn rate increased");
    }

    fn start_wave(&mut self) {
        self.wave_clock = Some(Duration::ZERO);
        self.next_burst = self.config.spawner.burst_interval();
        self.queue_burst();
    }

    fn stop_wave(&mut self) {
        self.wave_clock = None;
        self.pending = 0;
    }

    fn queue_burst(&mut self) {
        self.pending = self.pending.saturating_add(self.spawn_count);
        debug!(burst = self.spawn_count, pending = self.pending, "burst queued");
    }

    fn advance_window(&mut self, dt: Duration) {
        let Some(clock) = self.wave_clock else {
            return;
        };
        let interval = self.config.spawner.burst_interval();
        let window = self.config.spawn_window;
        let now = clock.saturating_add(dt);

        if !interval.is_zero() {
            while self.next_burst <= now && self.next_burst < window {
                self.queue_burst();
                self.next_burst = self.next_burst.saturating_add(interval);
            }
        }
        self.wave_clock = Some(now);
    }

    fn drain(&mut self, out: &mut Vec<Command>) {
        let batch = self.pending.min(self.config.spawner.max_spawns_per_tick);
        for _ in 0..batch {
            let command = self.spawn_enemy();
            out.push(command);
        }
        self.pending -= batch;
    }

    fn spawn_enemy(&mut self) -> Command {
        let position = self.spawn_point();
        let strong_applies = self.mid_game || self.end_game;
        let variant = if strong_applies && self.rng.gen::<f32>() < self.strong_chance {
            EnemyVariant::Strong
        } else {
            EnemyVariant::Normal
        };
        let profile = self.config.enemies.profile(variant);
        let speed = if profile.max_speed > profile.min_speed
            && (profile.max_speed - profile.min_speed).is_finite()
        {
            self.rng.gen_range(profile.min_speed..profile.max_speed)
        } else {
            profile.min_speed
        };

        Command::SpawnEnemy {
            position,
            variant,
            speed,
        }
    }

    /// Random point on the spawn rectangle, biased toward the left and right
    /// edges by `side_spawn_weight`.
    fn spawn_point(&mut self) -> Vec2 {
        let tuning = &self.config.spawner;
        let half_width = tuning.half_width.abs();
        let half_height = tuning.half_height.abs();
        let along: f32 = self.rng.gen();
        let near_side: bool = self.rng.gen();
        let on_side = self.rng.gen::<f32>() < tuning.side_spawn_weight;

        let vertical = -half_height + along * 2.0 * half_height;
        let horizontal = -half_width + along * 2.0 * half_width;
        match (near_side, on_side) {
            (true, true) => Vec2::new(-half_width, vertical),
            (true, false) => Vec2::new(horizontal, half_height),
            (false, true) => Vec2::new(half_width, vertical),
            (false, false) => Vec2::new(horizontal, -half_height),
        }
    }
}
