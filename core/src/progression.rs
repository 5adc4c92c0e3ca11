//! Health pools and the generic levelling contract shared by weapons, shields
//! and the station.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Credits, UpgradeTable};

/// Health pool with a clamped current value.
///
/// `0 <= current <= max` holds after every operation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    /// Creates a full pool of `max` health.
    #[must_use]
    pub fn full(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    /// Current health.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    /// Reports whether any health is left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Reports whether the pool is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    /// Removes `amount` and returns the unclamped remainder.
    ///
    /// The remainder can be negative, which callers use to detect overkill.
    pub fn damage(&mut self, amount: f32) -> f32 {
        let remainder = self.current - amount.max(0.0);
        self.current = remainder.max(0.0);
        remainder
    }

    /// Adds `amount`, clamped at the maximum.
    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount.max(0.0)).min(self.max);
    }

    /// Restores the pool to its maximum.
    pub fn refill(&mut self) {
        self.current = self.max;
    }

    /// Empties the pool.
    pub fn deplete(&mut self) {
        self.current = 0.0;
    }

    /// Changes the maximum and heals by the increase.
    pub fn raise_max(&mut self, max: f32) {
        let max = max.max(0.0);
        let delta = (max - self.max).max(0.0);
        self.max = max;
        self.current = (self.current + delta).min(self.max);
    }

    /// Changes the maximum without healing.
    pub fn set_max(&mut self, max: f32) {
        self.max = max.max(0.0);
        self.current = self.current.min(self.max);
    }
}

/// Reasons a level increase may be refused.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum LevelError {
    /// The last level is already active.
    #[error("already at max level")]
    AlreadyMaxLevel,
    /// The level table is empty.
    #[error("no levels configured")]
    EmptyTable,
}

/// Result of a successful level increase.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelUp<'a, T> {
    /// Zero-based level that became active.
    pub level: u32,
    /// Stats of the new level.
    pub stats: &'a T,
    /// Price of the following level, if one exists and is priced.
    pub next_price: Option<Credits>,
}

/// Level progression over a shared, read-only table.
///
/// Starts unpurchased. Payment is never checked here; callers debit first.
#[derive(Clone, Debug)]
pub struct UpgradableLevel<T> {
    table: Arc<UpgradeTable<T>>,
    index: Option<usize>,
}

impl<T> UpgradableLevel<T> {
    /// Creates an unpurchased progression over `table`.
    #[must_use]
    pub fn new(table: Arc<UpgradeTable<T>>) -> Self {
        Self { table, index: None }
    }

    /// Zero-based active level, or `None` when nothing was bought.
    #[must_use]
    pub fn level(&self) -> Option<u32> {
        self.index.and_then(|index| u32::try_from(index).ok())
    }

    /// Stats of the active level.
    #[must_use]
    pub fn stats(&self) -> Option<&T> {
        self.index.and_then(|index| self.table.levels.get(index))
    }

    /// Reports whether the last level in the table is active.
    #[must_use]
    pub fn is_max_level(&self) -> bool {
        match self.index {
            Some(index) => index + 1 >= self.table.levels.len(),
            None => false,
        }
    }

    /// Price of the next level, if one exists and is priced.
    #[must_use]
    pub fn next_price(&self) -> Option<Credits> {
        if self.is_max_level() || self.table.levels.is_empty() {
            return None;
        }
        self.table.prices.get(self.next_index()).copied()
    }

    /// Advances one level.
    pub fn increase_level(&mut self) -> Result<LevelUp<'_, T>, LevelError> {
        if self.table.levels.is_empty() {
            return Err(LevelError::EmptyTable);
        }
        if self.is_max_level() {
            return Err(LevelError::AlreadyMaxLevel);
        }

        let index = self.next_index();
        self.index = Some(index);
        let next_price = self.next_price();
        let level = u32::try_from(index).unwrap_or(u32::MAX);
        Ok(LevelUp {
            level,
            stats: &self.table.levels[index],
            next_price,
        })
    }

    fn next_index(&self) -> usize {
        self.index.map_or(0, |index| index + 1)
    }
}

/// Shared capability of everything the shop sells levels for.
pub trait Upgradable {
    /// Zero-based active level, or `None` when nothing was bought.
    fn current_level(&self) -> Option<u32>;

    /// Price of the next level, if it can be bought.
    fn next_price(&self) -> Option<Credits>;

    /// Reports whether no further level exists.
    fn is_max_level(&self) -> bool;

    /// Applies the next level and returns the new level index.
    fn increase_level(&mut self) -> Result<u32, LevelError>;
}

/// Defense orb level stats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MultiShotStats {
    /// Seconds to wait after a charge before firing again.
    pub recharge_secs: f32,
    /// Number of lasers fired per charge.
    pub shots_per_charge: u32,
}

/// Complexity level stats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamStats {
    /// Seconds to wait after the beam fades before firing again.
    pub recharge_secs: f32,
    /// Seconds the beam stays lethal.
    pub beam_duration_secs: f32,
}

/// Pulsar level stats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PulseStats {
    /// Seconds to wait after a pulse before pulsing again.
    pub recharge_secs: f32,
    /// Radius of the blast circle.
    pub blast_radius: f32,
}

/// Shield level stats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShieldStats {
    /// Maximum health of the shield.
    pub max_health: f32,
    /// Seconds a depleted shield needs to come back.
    pub cooldown_secs: f32,
}

/// Station level stats.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StationStats {
    /// Maximum health of the station core.
    pub max_health: f32,
    /// Health restored on every automatic repair step.
    pub repair_amount: f32,
    /// Seconds between automatic repair steps.
    pub repair_interval_secs: f32,
}

macro_rules! recharge_duration {
    ($($stats:ty),*) => {
        $(
            impl $stats {
                /// Recharge time as a [`Duration`].
                #[must_use]
                pub fn recharge(&self) -> Duration {
                    secs(self.recharge_secs)
                }
            }
        )*
    };
}

recharge_duration!(MultiShotStats, BeamStats, PulseStats);

impl BeamStats {
    /// Beam lifetime as a [`Duration`].
    #[must_use]
    pub fn beam_duration(&self) -> Duration {
        secs(self.beam_duration_secs)
    }
}

impl ShieldStats {
    /// Recharge cooldown as a [`Duration`].
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        secs(self.cooldown_secs)
    }
}

impl StationStats {
    /// Repair cadence as a [`Duration`].
    #[must_use]
    pub fn repair_interval(&self) -> Duration {
        secs(self.repair_interval_secs)
    }
}

/// Converts configured seconds. Negative and NaN values become zero, values
/// too large for a [`Duration`] saturate.
pub(crate) fn secs(value: f32) -> Duration {
    if value > 0.0 {
        Duration::try_from_secs_f32(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(levels: usize, prices: &[u32]) -> Arc<UpgradeTable<ShieldStats>> {
        Arc::new(UpgradeTable {
            levels: (0..levels)
                .map(|level| ShieldStats {
                    max_health: 50.0 * (level as f32 + 1.0),
                    cooldown_secs: 3.0,
                })
                .collect(),
            prices: prices.iter().copied().map(Credits::new).collect(),
        })
    }

    #[test]
    fn level_index_never_passes_the_last_entry() {
        let mut progression = UpgradableLevel::new(table(3, &[10, 20, 30]));
        assert_eq!(progression.level(), None);
        assert_eq!(progression.next_price(), Some(Credits::new(10)));

        for expected in 0..3 {
            let step = progression.increase_level().expect("level available");
            assert_eq!(step.level, expected);
        }

        assert!(progression.is_max_level());
        assert_eq!(progression.next_price(), None);
        assert_eq!(
            progression.increase_level().map(|step| step.level),
            Err(LevelError::AlreadyMaxLevel)
        );
        assert_eq!(progression.level(), Some(2));
    }

    #[test]
    fn empty_table_leaves_level_unset() {
        let mut progression = UpgradableLevel::new(table(0, &[]));
        assert_eq!(
            progression.increase_level().map(|step| step.level),
            Err(LevelError::EmptyTable)
        );
        assert_eq!(progression.level(), None);
        assert!(!progression.is_max_level());
        assert_eq!(progression.next_price(), None);
    }

    #[test]
    fn missing_price_reports_unavailable_next_level() {
        let mut progression = UpgradableLevel::new(table(3, &[10]));
        let step = progression.increase_level().expect("first level");
        assert_eq!(step.next_price, None);
        assert!(!progression.is_max_level());
    }

    #[test]
    fn damage_clamps_at_zero_and_reports_overkill() {
        let mut health = Health::full(50.0);
        let remainder = health.damage(60.0);
        assert!(remainder < 0.0);
        assert_eq!(health.current(), 0.0);
        assert!(!health.is_alive());
    }

    #[test]
    fn heal_clamps_at_max() {
        let mut health = Health::full(40.0);
        let _ = health.damage(15.0);
        health.heal(100.0);
        assert_eq!(health.current(), 40.0);
        assert!(health.is_full());
    }

    #[test]
    fn secs_saturates_instead_of_panicking() {
        assert_eq!(secs(1e20), Duration::MAX);
        assert_eq!(secs(f32::INFINITY), Duration::MAX);
        assert_eq!(secs(f32::NAN), Duration::ZERO);
        assert_eq!(secs(-3.0), Duration::ZERO);
        assert_eq!(secs(0.5), Duration::from_millis(500));
    }

    #[test]
    fn raising_max_heals_by_the_delta() {
        let mut health = Health::full(100.0);
        let _ = health.damage(30.0);
        health.raise_max(150.0);
        assert_eq!(health.max(), 150.0);
        assert_eq!(health.current(), 120.0);
    }
}
