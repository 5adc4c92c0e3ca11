//! Station core, its two shields, and the terminal explosion sequence.

use std::{sync::Arc, time::Duration};

use nova_defence_core::{
    Credits, Event, ExplosionTuning, Health, LevelError, RepairError, RepairTuning, ShieldRing,
    ShieldStats, StationStats, Upgradable, UpgradableLevel, UpgradeTable,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Observable state of a shield.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShieldStatus {
    /// Never bought; enemies pass through.
    Unpurchased,
    /// Up and absorbing hits.
    Alive,
    /// Depleted; comes back after the level's cooldown.
    Recharging,
    /// Switched off for good by the station's destruction.
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShieldState {
    Unpurchased,
    Alive,
    Recharging { remaining: Duration },
    Down,
}

/// One concentric shield ring.
#[derive(Clone, Debug)]
pub(crate) struct Shield {
    ring: ShieldRing,
    health: Health,
    level: UpgradableLevel<ShieldStats>,
    state: ShieldState,
}

impl Shield {
    pub(crate) fn new(ring: ShieldRing, table: Arc<UpgradeTable<ShieldStats>>) -> Self {
        Self {
            ring,
            health: Health::default(),
            level: UpgradableLevel::new(table),
            state: ShieldState::Unpurchased,
        }
    }

    pub(crate) fn status(&self) -> ShieldStatus {
        match self.state {
            ShieldState::Unpurchased => ShieldStatus::Unpurchased,
            ShieldState::Alive => ShieldStatus::Alive,
            ShieldState::Recharging { .. } => ShieldStatus::Recharging,
            ShieldState::Down => ShieldStatus::Down,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state == ShieldState::Alive
    }

    pub(crate) const fn health(&self) -> Health {
        self.health
    }

    /// Absorbs a hit. A depleting hit starts the recharge cycle.
    pub(crate) fn take_damage(&mut self, amount: f32, out_events: &mut Vec<Event>) {
        if !self.is_alive() {
            return;
        }

        let remainder = self.health.damage(amount);
        if remainder > 0.0 {
            out_events.push(Event::ShieldHit {
                ring: self.ring,
                health: self.health.current(),
            });
            return;
        }

        self.health.deplete();
        let cooldown = self.level.stats().map_or(Duration::ZERO, ShieldStats::cooldown);
        self.state = ShieldState::Recharging {
            remaining: cooldown,
        };
        debug!(ring = ?self.ring, ?cooldown, "shield depleted");
        out_events.push(Event::ShieldDepleted { ring: self.ring });
    }

    /// Free between-wave top-up of a damaged but standing shield.
    pub(crate) fn manual_recharge(&mut self) -> bool {
        if !self.is_alive() || self.health.is_full() {
            return false;
        }
        self.health.refill();
        true
    }

    /// Advances a running recharge.
    pub(crate) fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let ShieldState::Recharging { remaining } = self.state else {
            return;
        };

        let remaining = remaining.saturating_sub(dt);
        if remaining.is_zero() {
            self.health.refill();
            self.state = ShieldState::Alive;
            out_events.push(Event::ShieldRestored { ring: self.ring });
        } else {
            self.state = ShieldState::Recharging { remaining };
        }
    }

    /// Cancels any recharge and switches the shield off permanently.
    pub(crate) fn station_down(&mut self) {
        if self.state != ShieldState::Unpurchased {
            self.state = ShieldState::Down;
        }
    }
}

impl Upgradable for Shield {
    fn current_level(&self) -> Option<u32> {
        self.level.level()
    }

    fn next_price(&self) -> Option<Credits> {
        self.level.next_price()
    }

    fn is_max_level(&self) -> bool {
        self.level.is_max_level()
    }

    fn increase_level(&mut self) -> Result<u32, LevelError> {
        if self.state == ShieldState::Down {
            return Err(LevelError::AlreadyMaxLevel);
        }
        let step = self.level.increase_level()?;
        let level = step.level;
        let max_health = step.stats.max_health;

        match self.state {
            ShieldState::Unpurchased => {
                self.health = Health::full(max_health);
                self.state = ShieldState::Alive;
            }
            ShieldState::Alive => self.health.raise_max(max_health),
            ShieldState::Recharging { .. } | ShieldState::Down => {
                self.health.set_max(max_health);
            }
        }
        Ok(level)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExplosionStep {
    Impulses { fired: u32, gap: Duration },
    Flash { remaining: Duration },
    Nova { remaining: Duration },
    Ended,
}

/// Outcome of advancing the explosion sequence by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ExplosionProgress {
    Waiting,
    Nova,
    Ended,
}

/// Core of the station with its repair economy and terminal sequence.
#[derive(Debug)]
pub(crate) struct Station {
    health: Health,
    level: UpgradableLevel<StationStats>,
    repair_elapsed: Duration,
    repair_price: Credits,
    repair: RepairTuning,
    explosion: Option<ExplosionStep>,
    nova: bool,
}

impl Station {
    pub(crate) fn new(table: Arc<UpgradeTable<StationStats>>, repair: RepairTuning) -> Self {
        Self {
            health: Health::default(),
            level: UpgradableLevel::new(table),
            repair_elapsed: Duration::ZERO,
            repair_price: repair.base_price,
            repair,
            explosion: None,
            nova: false,
        }
    }

    pub(crate) const fn health(&self) -> Health {
        self.health
    }

    pub(crate) fn is_exploding(&self) -> bool {
        self.explosion.is_some()
    }

    pub(crate) const fn is_nova(&self) -> bool {
        self.nova
    }

    pub(crate) fn has_ended(&self) -> bool {
        self.explosion == Some(ExplosionStep::Ended)
    }

    pub(crate) const fn repair_price(&self) -> Credits {
        self.repair_price
    }

    /// Applies collision damage. Returns `true` on the killing blow only.
    pub(crate) fn take_hit(
        &mut self,
        damage: f32,
        tuning: &ExplosionTuning,
        rng: &mut ChaCha8Rng,
        out_events: &mut Vec<Event>,
    ) -> bool {
        if self.is_exploding() {
            return false;
        }

        let _ = self.health.damage(damage);
        out_events.push(Event::StationDamaged {
            health: self.health.current(),
        });
        if self.health.is_alive() {
            return false;
        }

        info!("station destroyed");
        out_events.push(Event::StationDestroyed);
        self.explosion = Some(first_impulse(tuning, rng, out_events));
        true
    }

    /// Heals `repair_amount` every `repair_interval` of accumulated wave time.
    pub(crate) fn repair_over_time(&mut self, dt: Duration) {
        if self.is_exploding() {
            return;
        }
        let Some(stats) = self.level.stats().copied() else {
            return;
        };
        let interval = stats.repair_interval();
        if interval.is_zero() {
            return;
        }

        self.repair_elapsed = self.repair_elapsed.saturating_add(dt);
        while self.repair_elapsed >= interval {
            self.repair_elapsed -= interval;
            self.health.heal(stats.repair_amount);
        }
    }

    /// Price of a paid repair if one is possible; the caller debits the ledger.
    pub(crate) fn can_repair(&self) -> Result<Credits, RepairError> {
        if self.is_exploding() {
            return Err(RepairError::SessionOver);
        }
        if self.health.is_full() {
            return Err(RepairError::AlreadyFullHealth);
        }
        Ok(self.repair_price)
    }

    /// Heals the paid amount and escalates the next price.
    pub(crate) fn apply_repair(&mut self) {
        self.health.heal(self.repair.heal_amount);
        self.repair_price = self.repair_price.saturating_add(self.repair.price_increment);
    }

    /// Advances the destruction sequence.
    pub(crate) fn tick_explosion(
        &mut self,
        dt: Duration,
        tuning: &ExplosionTuning,
        rng: &mut ChaCha8Rng,
        out_events: &mut Vec<Event>,
    ) -> ExplosionProgress {
        let Some(step) = self.explosion else {
            return ExplosionProgress::Waiting;
        };

        let (next, progress) = match step {
            ExplosionStep::Impulses { fired, gap } => {
                let gap = gap.saturating_sub(dt);
                if !gap.is_zero() {
                    (ExplosionStep::Impulses { fired, gap }, ExplosionProgress::Waiting)
                } else if fired < tuning.impulse_count {
                    out_events.push(Event::CameraImpulse { index: fired });
                    let gap = sample_gap(tuning, rng);
                    (
                        ExplosionStep::Impulses {
                            fired: fired + 1,
                            gap,
                        },
                        ExplosionProgress::Waiting,
                    )
                } else {
                    (
                        ExplosionStep::Flash {
                            remaining: tuning.flash_timing(),
                        },
                        ExplosionProgress::Waiting,
                    )
                }
            }
            ExplosionStep::Flash { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    self.nova = true;
                    out_events.push(Event::NovaTriggered);
                    (
                        ExplosionStep::Nova {
                            remaining: tuning.nova(),
                        },
                        ExplosionProgress::Nova,
                    )
                } else {
                    (ExplosionStep::Flash { remaining }, ExplosionProgress::Waiting)
                }
            }
            ExplosionStep::Nova { remaining } => {
                let remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    info!("session ended");
                    out_events.push(Event::SessionEnded);
                    (ExplosionStep::Ended, ExplosionProgress::Ended)
                } else {
                    (ExplosionStep::Nova { remaining }, ExplosionProgress::Waiting)
                }
            }
            ExplosionStep::Ended => (ExplosionStep::Ended, ExplosionProgress::Waiting),
        };
        self.explosion = Some(next);
        progress
    }
}

fn first_impulse(
    tuning: &ExplosionTuning,
    rng: &mut ChaCha8Rng,
    out_events: &mut Vec<Event>,
) -> ExplosionStep {
    if tuning.impulse_count == 0 {
        return ExplosionStep::Flash {
            remaining: tuning.flash_timing(),
        };
    }
    out_events.push(Event::CameraImpulse { index: 0 });
    ExplosionStep::Impulses {
        fired: 1,
        gap: sample_gap(tuning, rng),
    }
}

fn sample_gap(tuning: &ExplosionTuning, rng: &mut ChaCha8Rng) -> Duration {
    let min = tuning.impulse_min_interval_secs;
    let max = tuning.impulse_max_interval_secs;
    let seconds = if max > min && (max - min).is_finite() {
        rng.gen_range(min..max)
    } else {
        min
    };
    tuning.gap(seconds)
}

impl Upgradable for Station {
    fn current_level(&self) -> Option<u32> {
        self.level.level()
    }

    fn next_price(&self) -> Option<Credits> {
        self.level.next_price()
    }

    fn is_max_level(&self) -> bool {
        self.level.is_max_level()
    }

    fn increase_level(&mut self) -> Result<u32, LevelError> {
        if self.is_exploding() {
            return Err(LevelError::AlreadyMaxLevel);
        }
        let step = self.level.increase_level()?;
        let level = step.level;
        let max_health = step.stats.max_health;
        self.health.raise_max(max_health);
        Ok(level)
    }
}
