#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Phase scheduler that cycles the session through shop and wave phases.
//!
//! The scheduler is an explicit resumable state machine: every wait is a
//! stage holding its remaining time, advanced by the `TimeAdvanced` events of
//! each tick. It only ever emits commands; the world owns the phase value and
//! the scheduler halts for good once it observes the station's destruction.

use std::time::Duration;

use nova_defence_core::{Balancing, Command, Event, GamePhase, PhaseTuning};
use tracing::{debug, info};

/// Timings that drive the scheduler.
#[derive(Clone, Debug)]
pub struct Config {
    timeless: bool,
    startup_grace: Duration,
    shop: Duration,
    spawn_window: Duration,
    clear_poll: Duration,
    post_wave_pause: Duration,
    post_shop_pause: Duration,
    mid_game_wave: u32,
}

impl Config {
    /// Builds the configuration from phase tuning values.
    #[must_use]
    pub fn new(tuning: &PhaseTuning) -> Self {
        Self {
            timeless: tuning.timeless,
            startup_grace: tuning.startup_grace(),
            shop: tuning.shop(),
            spawn_window: tuning.spawn_window(),
            clear_poll: tuning.clear_poll(),
            post_wave_pause: tuning.post_wave_pause(),
            post_shop_pause: tuning.post_shop_pause(),
            mid_game_wave: tuning.mid_game_wave,
        }
    }

    /// Extracts the scheduler configuration from session balancing data.
    #[must_use]
    pub fn from_balancing(balancing: &Balancing) -> Self {
        Self::new(&balancing.phases)
    }
}

/// Population figures the scheduler polls before closing a wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldStatus {
    /// Enemies still approaching the station.
    pub active_enemies: usize,
    /// Spawns queued but not yet created.
    pub pending_spawns: u32,
}

impl FieldStatus {
    fn is_clear(&self) -> bool {
        self.active_enemies == 0 && self.pending_spawns == 0
    }
}

/// Observable stage of the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Grace delay before the first shop.
    Booting {
        /// Time left before the first shop opens.
        remaining: Duration,
    },
    /// Shop open. `None` waits for the ready signal.
    Shop {
        /// Time left before the shop closes on its own.
        remaining: Option<Duration>,
    },
    /// Pause between closing the shop and starting the wave.
    ShopClosing {
        /// Time left before the wave starts.
        remaining: Duration,
    },
    /// Spawn window of a wave.
    Spawning {
        /// Time left in the spawn window.
        remaining: Duration,
    },
    /// Spawn window over; polling until every enemy is gone.
    Clearing {
        /// Time left until the next poll.
        until_poll: Duration,
    },
    /// Pause between a cleared wave and the next shop.
    WaveCooldown {
        /// Time left before the shop opens.
        remaining: Duration,
    },
    /// The station was destroyed; no transition is ever issued again.
    Halted,
}

/// Top-level session scheduler.
#[derive(Debug)]
pub struct Phases {
    config: Config,
    stage: Stage,
    ready: bool,
    wave: u32,
    waves_completed: u32,
    wave_clock: Duration,
}

impl Phases {
    /// Creates a scheduler waiting out the startup grace delay.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            stage: Stage::Booting {
                remaining: config.startup_grace,
            },
            config,
            ready: false,
            wave: 0,
            waves_completed: 0,
            wave_clock: Duration::ZERO,
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Reports whether the scheduler stopped for good.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.stage == Stage::Halted
    }

    /// One-based number of the current or most recent wave.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Time spent in the current or most recent wave, for display.
    #[must_use]
    pub const fn wave_clock(&self) -> Duration {
        self.wave_clock
    }

    /// Reports whether a ready signal is latched for the open shop.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Consumes events and the field status to emit phase commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: GamePhase,
        field: FieldStatus,
        out: &mut Vec<Command>,
    ) {
        let mut dt = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt: step } => dt = dt.saturating_add(*step),
                Event::ReadyDeclared => self.latch_ready(),
                Event::StationDestroyed
                | Event::PhaseChanged {
                    phase: GamePhase::Dead,
                } => self.halt(),
                _ => {}
            }
        }

        if phase.is_terminal() {
            self.halt();
        }
        if self.is_halted() {
            return;
        }

        self.stage = self.advance(dt, field, out);
    }

    fn latch_ready(&mut self) {
        if matches!(self.stage, Stage::Shop { .. }) {
            self.ready = true;
        } else {
            debug!(stage = ?self.stage, "ready ignored outside the shop");
        }
    }

    fn halt(&mut self) {
        if !self.is_halted() {
            info!(wave = self.wave, "scheduler halted");
            self.stage = Stage::Halted;
        }
    }

    fn advance(&mut self, dt: Duration, field: FieldStatus, out: &mut Vec<Command>) -> Stage {
        match self.stage {
            Stage::Booting { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    return Stage::Booting { remaining };
                }
                info!("initial shop opened");
                out.push(Command::SetPhase {
                    phase: GamePhase::Shop,
                });
                self.ready = false;
                Stage::Shop { remaining: None }
            }
            Stage::Shop { remaining } => {
                let remaining = remaining.map(|left| left.saturating_sub(dt));
                if self.ready || remaining.is_some_and(|left| left.is_zero()) {
                    self.ready = false;
                    return Stage::ShopClosing {
                        remaining: self.config.post_shop_pause,
                    };
                }
                Stage::Shop { remaining }
            }
            Stage::ShopClosing { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    return Stage::ShopClosing { remaining };
                }
                self.wave = self.wave.saturating_add(1);
                self.wave_clock = Duration::ZERO;
                info!(wave = self.wave, "wave started");
                out.push(Command::SetPhase {
                    phase: GamePhase::Wave,
                });
                Stage::Spawning {
                    remaining: self.config.spawn_window,
                }
            }
            Stage::Spawning { remaining } => {
                self.wave_clock = self.wave_clock.saturating_add(dt);
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    Stage::Clearing {
                        until_poll: self.config.clear_poll,
                    }
                } else {
                    Stage::Spawning { remaining }
                }
            }
            Stage::Clearing { until_poll } => {
                self.wave_clock = self.wave_clock.saturating_add(dt);
                let until_poll = until_poll.saturating_sub(dt);
                if !until_poll.is_zero() {
                    return Stage::Clearing { until_poll };
                }
                if !field.is_clear() {
                    debug!(active = field.active_enemies, "wave not cleared yet");
                    return Stage::Clearing {
                        until_poll: self.config.clear_poll,
                    };
                }
                self.complete_wave(out);
                Stage::WaveCooldown {
                    remaining: self.config.post_wave_pause,
                }
            }
            Stage::WaveCooldown { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if !remaining.is_zero() {
                    return Stage::WaveCooldown { remaining };
                }
                self.open_shop(out)
            }
            Stage::Halted => Stage::Halted,
        }
    }

    fn complete_wave(&mut self, out: &mut Vec<Command>) {
        self.waves_completed = self.waves_completed.saturating_add(1);
        out.push(Command::CompleteWave);
        if self.waves_completed == self.config.mid_game_wave {
            out.push(Command::EnterMidGame);
        }
    }

    fn open_shop(&mut self, out: &mut Vec<Command>) -> Stage {
        self.ready = false;
        out.push(Command::SetPhase {
            phase: GamePhase::Shop,
        });
        out.push(Command::DepositWaveStipend);
        out.push(Command::RechargeShields);
        let remaining = (!self.config.timeless).then_some(self.config.shop);
        info!(timed = remaining.is_some(), "shop opened");
        Stage::Shop { remaining }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> PhaseTuning {
        PhaseTuning {
            timeless: false,
            startup_grace_secs: 1.0,
            shop_secs: 5.0,
            spawn_window_secs: 3.0,
            clear_poll_secs: 1.0,
            post_wave_pause_secs: 1.0,
            post_shop_pause_secs: 1.0,
            mid_game_wave: 2,
        }
    }

    fn step(phases: &mut Phases, seconds: u64, field: FieldStatus) -> Vec<Command> {
        let mut out = Vec::new();
        phases.handle(
            &[Event::TimeAdvanced {
                dt: Duration::from_secs(seconds),
            }],
            GamePhase::Shop,
            field,
            &mut out,
        );
        out
    }

    #[test]
    fn initial_shop_waits_for_ready() {
        let mut phases = Phases::new(Config::new(&tuning()));
        let opened = step(&mut phases, 1, FieldStatus::default());
        assert_eq!(
            opened,
            vec![Command::SetPhase {
                phase: GamePhase::Shop
            }]
        );

        for _ in 0..100 {
            assert!(step(&mut phases, 10, FieldStatus::default()).is_empty());
        }
        assert_eq!(phases.stage(), Stage::Shop { remaining: None });
    }

    #[test]
    fn ready_outside_the_shop_is_not_latched() {
        let mut phases = Phases::new(Config::new(&tuning()));
        let mut out = Vec::new();
        phases.handle(
            &[Event::ReadyDeclared],
            GamePhase::Shop,
            FieldStatus::default(),
            &mut out,
        );
        assert!(!phases.is_ready());
    }

    #[test]
    fn timed_shop_closes_on_its_own() {
        let mut phases = Phases::new(Config::new(&tuning()));
        phases.stage = Stage::WaveCooldown {
            remaining: Duration::from_secs(1),
        };
        let opened = step(&mut phases, 1, FieldStatus::default());
        assert_eq!(
            opened,
            vec![
                Command::SetPhase {
                    phase: GamePhase::Shop
                },
                Command::DepositWaveStipend,
                Command::RechargeShields,
            ]
        );

        for _ in 0..4 {
            let _ = step(&mut phases, 1, FieldStatus::default());
        }
        assert!(matches!(phases.stage(), Stage::Shop { .. }));
        let _ = step(&mut phases, 1, FieldStatus::default());
        assert!(matches!(phases.stage(), Stage::ShopClosing { .. }));
    }

    #[test]
    fn timeless_shops_never_expire() {
        let mut config = tuning();
        config.timeless = true;
        let mut phases = Phases::new(Config::new(&config));
        phases.stage = Stage::WaveCooldown {
            remaining: Duration::from_secs(1),
        };
        let _ = step(&mut phases, 1, FieldStatus::default());
        let _ = step(&mut phases, 1_000, FieldStatus::default());
        assert_eq!(phases.stage(), Stage::Shop { remaining: None });
    }

    #[test]
    fn wave_waits_for_the_field_to_clear() {
        let mut phases = Phases::new(Config::new(&tuning()));
        phases.stage = Stage::Spawning {
            remaining: Duration::from_secs(3),
        };
        let busy = FieldStatus {
            active_enemies: 4,
            pending_spawns: 0,
        };

        for _ in 0..3 {
            assert!(step(&mut phases, 1, busy).is_empty());
        }
        for _ in 0..10 {
            assert!(step(&mut phases, 1, busy).is_empty());
        }
        assert!(matches!(phases.stage(), Stage::Clearing { .. }));
        assert_eq!(phases.wave_clock(), Duration::from_secs(13));

        let cleared = step(&mut phases, 1, FieldStatus::default());
        assert_eq!(cleared, vec![Command::CompleteWave]);
    }

    #[test]
    fn mid_game_is_entered_once_at_the_configured_wave() {
        let mut phases = Phases::new(Config::new(&tuning()));
        let mut out = Vec::new();
        for _ in 0..3 {
            phases.complete_wave(&mut out);
        }
        let milestones = out
            .iter()
            .filter(|command| matches!(command, Command::EnterMidGame))
            .count();
        assert_eq!(milestones, 1);
    }

    #[test]
    fn dead_halts_the_scheduler() {
        let mut phases = Phases::new(Config::new(&tuning()));
        phases.stage = Stage::Shop {
            remaining: Some(Duration::from_secs(1)),
        };
        let mut out = Vec::new();
        phases.handle(
            &[
                Event::StationDestroyed,
                Event::TimeAdvanced {
                    dt: Duration::from_secs(10),
                },
            ],
            GamePhase::Dead,
            FieldStatus::default(),
            &mut out,
        );
        assert!(out.is_empty());
        assert!(phases.is_halted());

        let _ = step(&mut phases, 100, FieldStatus::default());
        assert!(phases.is_halted());
    }
}
