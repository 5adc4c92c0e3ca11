//! Balancing data loaded once at session start and read-only afterwards.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    progression::secs, BeamStats, Credits, EnemyVariant, MultiShotStats, PulseStats,
    ShieldStats, StationStats,
};

/// Aggregated tuning knobs controlling every adjustable aspect of a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Balancing {
    /// Seed for every random stream in the session.
    pub rng_seed: u64,
    /// Spendable credits at session start.
    pub starting_credits: Credits,
    /// Orb levels granted for free at session start.
    pub free_defense_orbs: u32,
    /// Per-wave deposits.
    pub economy: EconomyTuning,
    /// Defense orb levels and prices.
    pub defense_orb: UpgradeTable<MultiShotStats>,
    /// Complexity levels and prices.
    pub complexity: UpgradeTable<BeamStats>,
    /// Pulsar levels and prices.
    pub pulsar: UpgradeTable<PulseStats>,
    /// Small shield levels and prices.
    pub small_shield: UpgradeTable<ShieldStats>,
    /// Large shield levels and prices.
    pub large_shield: UpgradeTable<ShieldStats>,
    /// Station levels and prices. Level 0 is granted at start.
    pub station: UpgradeTable<StationStats>,
    /// Manual repair pricing.
    pub repair: RepairTuning,
    /// Weapon instance geometry.
    pub mounts: MountTuning,
    /// Weapon timings shared across levels.
    pub weapons: WeaponTuning,
    /// Collision ring distances.
    pub rings: RingTuning,
    /// Enemy variants and motion.
    pub enemies: EnemyTuning,
    /// Spawn cadence and difficulty curve.
    pub spawner: SpawnerTuning,
    /// Phase scheduler timings.
    pub phases: PhaseTuning,
    /// Station destruction sequence timings.
    pub explosion: ExplosionTuning,
}

impl Default for Balancing {
    fn default() -> Self {
        Self {
            rng_seed: 0x6e6f_7661_5f64_6566,
            starting_credits: Credits::new(100),
            free_defense_orbs: 1,
            economy: EconomyTuning::default(),
            defense_orb: UpgradeTable {
                levels: vec![
                    MultiShotStats {
                        recharge_secs: 2.0,
                        shots_per_charge: 1,
                    },
                    MultiShotStats {
                        recharge_secs: 1.6,
                        shots_per_charge: 2,
                    },
                    MultiShotStats {
                        recharge_secs: 1.2,
                        shots_per_charge: 3,
                    },
                    MultiShotStats {
                        recharge_secs: 0.8,
                        shots_per_charge: 4,
                    },
                ],
                prices: credits(&[60, 80, 140, 220]),
            },
            complexity: UpgradeTable {
                levels: vec![
                    BeamStats {
                        recharge_secs: 6.0,
                        beam_duration_secs: 1.0,
                    },
                    BeamStats {
                        recharge_secs: 5.0,
                        beam_duration_secs: 1.5,
                    },
                    BeamStats {
                        recharge_secs: 4.0,
                        beam_duration_secs: 2.0,
                    },
                ],
                prices: credits(&[150, 250, 400]),
            },
            pulsar: UpgradeTable {
                levels: vec![
                    PulseStats {
                        recharge_secs: 5.0,
                        blast_radius: 1.5,
                    },
                    PulseStats {
                        recharge_secs: 4.0,
                        blast_radius: 2.0,
                    },
                    PulseStats {
                        recharge_secs: 3.0,
                        blast_radius: 2.5,
                    },
                ],
                prices: credits(&[200, 320, 500]),
            },
            small_shield: UpgradeTable {
                levels: vec![
                    ShieldStats {
                        max_health: 50.0,
                        cooldown_secs: 8.0,
                    },
                    ShieldStats {
                        max_health: 80.0,
                        cooldown_secs: 6.0,
                    },
                    ShieldStats {
                        max_health: 120.0,
                        cooldown_secs: 4.0,
                    },
                ],
                prices: credits(&[80, 160, 260]),
            },
            large_shield: UpgradeTable {
                levels: vec![
                    ShieldStats {
                        max_health: 80.0,
                        cooldown_secs: 10.0,
                    },
                    ShieldStats {
                        max_health: 130.0,
                        cooldown_secs: 8.0,
                    },
                    ShieldStats {
                        max_health: 200.0,
                        cooldown_secs: 6.0,
                    },
                ],
                prices: credits(&[120, 220, 360]),
            },
            station: UpgradeTable {
                levels: vec![
                    StationStats {
                        max_health: 100.0,
                        repair_amount: 1.0,
                        repair_interval_secs: 2.0,
                    },
                    StationStats {
                        max_health: 150.0,
                        repair_amount: 2.0,
                        repair_interval_secs: 1.5,
                    },
                    StationStats {
                        max_health: 220.0,
                        repair_amount: 3.0,
                        repair_interval_secs: 1.0,
                    },
                ],
                prices: credits(&[0, 180, 300]),
            },
            repair: RepairTuning::default(),
            mounts: MountTuning::default(),
            weapons: WeaponTuning::default(),
            rings: RingTuning::default(),
            enemies: EnemyTuning::default(),
            spawner: SpawnerTuning::default(),
            phases: PhaseTuning::default(),
            explosion: ExplosionTuning::default(),
        }
    }
}

impl Balancing {
    /// Reports recoverable misconfigurations.
    ///
    /// None of the findings are fatal; affected upgrades become unavailable.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        check_table("defense_orb", &self.defense_orb, &mut issues);
        check_table("complexity", &self.complexity, &mut issues);
        check_table("pulsar", &self.pulsar, &mut issues);
        check_table("small_shield", &self.small_shield, &mut issues);
        check_table("large_shield", &self.large_shield, &mut issues);
        check_table("station", &self.station, &mut issues);

        for (name, profile) in [
            ("normal", &self.enemies.normal),
            ("strong", &self.enemies.strong),
        ] {
            if profile.min_speed > profile.max_speed {
                issues.push(ConfigIssue::InvertedSpeedRange { variant: name });
            }
        }

        if self.rings.small_shield >= self.rings.large_shield
            || self.rings.station >= self.rings.small_shield
        {
            issues.push(ConfigIssue::RingsOutOfOrder);
        }

        if self.spawner.max_spawns_per_tick == 0 {
            issues.push(ConfigIssue::ZeroSpawnCeiling);
        }

        if self.spawner.strong_chance_initial <= 0.0 || self.spawner.strong_chance_growth <= 1.0 {
            issues.push(ConfigIssue::StrongChanceNeverGrows);
        }

        issues.extend(
            self.scalars()
                .into_iter()
                .filter(|(_, value)| !value.is_finite())
                .map(|(field, _)| ConfigIssue::NonFiniteValue { field }),
        );

        issues
    }

    fn scalars(&self) -> [(&'static str, f32); 27] {
        let enemies = &self.enemies;
        let spawner = &self.spawner;
        let phases = &self.phases;
        let explosion = &self.explosion;
        [
            ("repair.heal_amount", self.repair.heal_amount),
            ("weapons.shot_delay_secs", self.weapons.shot_delay_secs),
            ("rings.large_shield", self.rings.large_shield),
            ("rings.small_shield", self.rings.small_shield),
            ("rings.station", self.rings.station),
            ("rings.collision_offset", self.rings.collision_offset),
            ("enemies.normal.min_speed", enemies.normal.min_speed),
            ("enemies.normal.max_speed", enemies.normal.max_speed),
            ("enemies.strong.min_speed", enemies.strong.min_speed),
            ("enemies.strong.max_speed", enemies.strong.max_speed),
            ("enemies.gravity_factor", enemies.gravity_factor),
            ("spawner.half_width", spawner.half_width),
            ("spawner.half_height", spawner.half_height),
            ("spawner.side_spawn_weight", spawner.side_spawn_weight),
            ("spawner.spawn_increment", spawner.spawn_increment),
            ("spawner.increase_rate", spawner.increase_rate),
            ("spawner.burst_interval_secs", spawner.burst_interval_secs),
            ("spawner.strong_chance_initial", spawner.strong_chance_initial),
            ("spawner.strong_chance_growth", spawner.strong_chance_growth),
            ("phases.startup_grace_secs", phases.startup_grace_secs),
            ("phases.shop_secs", phases.shop_secs),
            ("phases.spawn_window_secs", phases.spawn_window_secs),
            ("phases.clear_poll_secs", phases.clear_poll_secs),
            ("phases.post_wave_pause_secs", phases.post_wave_pause_secs),
            ("phases.post_shop_pause_secs", phases.post_shop_pause_secs),
            (
                "explosion.impulse_min_interval_secs",
                explosion.impulse_min_interval_secs,
            ),
            (
                "explosion.impulse_max_interval_secs",
                explosion.impulse_max_interval_secs,
            ),
        ]
    }
}

fn check_table<T>(name: &'static str, table: &UpgradeTable<T>, issues: &mut Vec<ConfigIssue>) {
    if table.levels.is_empty() {
        issues.push(ConfigIssue::EmptyLevelTable { table: name });
        return;
    }
    if table.prices.len() < table.levels.len() {
        issues.push(ConfigIssue::MissingPrice {
            table: name,
            level: table.prices.len(),
        });
    }
}

fn credits(values: &[u32]) -> Vec<Credits> {
    values.iter().copied().map(Credits::new).collect()
}

/// Recoverable misconfiguration found by [`Balancing::validate`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigIssue {
    /// A level table has no entries; the element can never be bought.
    #[error("level table `{table}` is empty")]
    EmptyLevelTable {
        /// Name of the table.
        table: &'static str,
    },
    /// A level has no matching price; it and later levels cannot be bought.
    #[error("level table `{table}` has no price for level {level}")]
    MissingPrice {
        /// Name of the table.
        table: &'static str,
        /// First unpriced level.
        level: usize,
    },
    /// An enemy variant's minimum speed exceeds its maximum.
    #[error("enemy variant `{variant}` has min_speed above max_speed")]
    InvertedSpeedRange {
        /// Name of the variant.
        variant: &'static str,
    },
    /// Ring thresholds are not strictly nested.
    #[error("ring thresholds must satisfy station < small_shield < large_shield")]
    RingsOutOfOrder,
    /// The spawner could never spawn anything.
    #[error("spawner max_spawns_per_tick is zero")]
    ZeroSpawnCeiling,
    /// The strong enemy probability starts at zero or is never multiplied up.
    #[error("strong_chance_initial must be positive and strong_chance_growth above 1")]
    StrongChanceNeverGrows,
    /// A numeric field is infinite or NaN.
    #[error("`{field}` is not a finite number")]
    NonFiniteValue {
        /// Dotted path of the field.
        field: &'static str,
    },
}

/// Ordered level stats paired with the price of each level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeTable<T> {
    /// Stats per level, index 0 first.
    pub levels: Vec<T>,
    /// Price of each level, index-aligned with `levels`.
    pub prices: Vec<Credits>,
}

impl<T> Default for UpgradeTable<T> {
    fn default() -> Self {
        Self {
            levels: Vec::new(),
            prices: Vec::new(),
        }
    }
}

/// Automatic per-wave deposits made when a shop opens.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyTuning {
    /// Credits added straight to the stored balance.
    pub wave_stored_stipend: Credits,
    /// Credits added to the spendable balance.
    pub wave_cash_bonus: Credits,
}

impl Default for EconomyTuning {
    fn default() -> Self {
        Self {
            wave_stored_stipend: Credits::new(25),
            wave_cash_bonus: Credits::new(50),
        }
    }
}

/// Manual repair pricing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairTuning {
    /// Price of the first repair.
    pub base_price: Credits,
    /// Amount added to the price after every repair.
    pub price_increment: Credits,
    /// Health restored per repair.
    pub heal_amount: f32,
}

impl Default for RepairTuning {
    fn default() -> Self {
        Self {
            base_price: Credits::new(40),
            price_increment: Credits::new(20),
            heal_amount: 25.0,
        }
    }
}

/// Fixed endpoints of a complexity beam.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeamMount {
    /// Fixed origin of the beam.
    pub origin: Vec2,
    /// Fixed far end of the beam.
    pub target: Vec2,
}

/// Geometry of every weapon instance. The number of entries decides how many
/// instances of each weapon exist.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MountTuning {
    /// Fire points of the defense orbs.
    pub defense_orbs: Vec<Vec2>,
    /// Endpoints of the complexity beams.
    pub complexities: Vec<BeamMount>,
    /// Centres of the pulsars.
    pub pulsars: Vec<Vec2>,
}

impl Default for MountTuning {
    fn default() -> Self {
        Self {
            defense_orbs: vec![
                Vec2::new(0.0, 1.2),
                Vec2::new(1.0, -0.6),
                Vec2::new(-1.0, -0.6),
            ],
            complexities: vec![
                BeamMount {
                    origin: Vec2::new(0.0, 0.0),
                    target: Vec2::new(9.0, 0.0),
                },
                BeamMount {
                    origin: Vec2::new(0.0, 0.0),
                    target: Vec2::new(-9.0, 0.0),
                },
            ],
            pulsars: vec![Vec2::new(0.0, 2.5), Vec2::new(0.0, -2.5)],
        }
    }
}

/// Weapon timings that do not change with level.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponTuning {
    /// Seconds between two lasers of the same orb charge.
    pub shot_delay_secs: f32,
}

impl WeaponTuning {
    /// Inter-shot delay as a [`Duration`].
    #[must_use]
    pub fn shot_delay(&self) -> Duration {
        secs(self.shot_delay_secs)
    }
}

impl Default for WeaponTuning {
    fn default() -> Self {
        Self {
            shot_delay_secs: 0.15,
        }
    }
}

/// Collision distances of the concentric rings, measured from the centre.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RingTuning {
    /// Outer shield threshold.
    pub large_shield: f32,
    /// Inner shield threshold.
    pub small_shield: f32,
    /// Station core threshold.
    pub station: f32,
    /// Depth of the detection band below each shield threshold.
    pub collision_offset: f32,
}

impl Default for RingTuning {
    fn default() -> Self {
        Self {
            large_shield: 4.0,
            small_shield: 2.8,
            station: 1.2,
            collision_offset: 0.3,
        }
    }
}

/// Per-variant enemy parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyProfile {
    /// Damage dealt to the ring the enemy collides with.
    pub damage: f32,
    /// Credits paid when a weapon kills the enemy.
    pub reward: Credits,
    /// Lower bound of the spawn speed.
    pub min_speed: f32,
    /// Upper bound of the spawn speed.
    pub max_speed: f32,
    /// Body radius used by region queries.
    pub radius: f32,
}

impl Default for EnemyProfile {
    fn default() -> Self {
        Self {
            damage: 5.0,
            reward: Credits::new(2),
            min_speed: 0.4,
            max_speed: 0.8,
            radius: 0.12,
        }
    }
}

/// Enemy variants and approach physics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    /// Standard enemy.
    pub normal: EnemyProfile,
    /// Tougher enemy.
    pub strong: EnemyProfile,
    /// Inverse-distance acceleration factor.
    pub gravity_factor: f32,
    /// Seconds an exploding enemy lingers before it is dropped.
    pub explosion_secs: f32,
}

impl EnemyTuning {
    /// Profile of the provided variant.
    #[must_use]
    pub fn profile(&self, variant: EnemyVariant) -> &EnemyProfile {
        match variant {
            EnemyVariant::Normal => &self.normal,
            EnemyVariant::Strong => &self.strong,
        }
    }

    /// Explosion lifetime as a [`Duration`].
    #[must_use]
    pub fn explosion(&self) -> Duration {
        secs(self.explosion_secs)
    }
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            normal: EnemyProfile::default(),
            strong: EnemyProfile {
                damage: 12.0,
                reward: Credits::new(6),
                min_speed: 0.5,
                max_speed: 1.0,
                radius: 0.18,
            },
            gravity_factor: 0.35,
            explosion_secs: 2.0,
        }
    }
}

/// Spawn cadence and the difficulty curve.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerTuning {
    /// Half extent of the spawn rectangle along x.
    pub half_width: f32,
    /// Half extent of the spawn rectangle along y.
    pub half_height: f32,
    /// Probability in `[0, 1)` of spawning on a left/right edge.
    pub side_spawn_weight: f32,
    /// Enemies per burst on the first wave.
    pub initial_spawn_count: u32,
    /// Ceiling on enemies per burst.
    pub max_spawn_count: u32,
    /// Base growth of the burst size per completed wave.
    pub spawn_increment: f32,
    /// Upper bound of the random jitter applied to the growth.
    pub increase_rate: f32,
    /// Seconds between bursts during the spawn window.
    pub burst_interval_secs: f32,
    /// Most enemies created in a single tick; the rest wait for later ticks.
    pub max_spawns_per_tick: u32,
    /// Strong enemy probability once it starts applying.
    pub strong_chance_initial: f32,
    /// Multiplier applied to the strong probability per end-game wave.
    pub strong_chance_growth: f32,
}

impl SpawnerTuning {
    /// Burst cadence as a [`Duration`].
    #[must_use]
    pub fn burst_interval(&self) -> Duration {
        secs(self.burst_interval_secs)
    }
}

impl Default for SpawnerTuning {
    fn default() -> Self {
        Self {
            half_width: 11.0,
            half_height: 6.5,
            side_spawn_weight: 0.7,
            initial_spawn_count: 6,
            max_spawn_count: 60,
            spawn_increment: 4.0,
            increase_rate: 0.5,
            burst_interval_secs: 4.0,
            max_spawns_per_tick: 100,
            strong_chance_initial: 0.05,
            strong_chance_growth: 1.25,
        }
    }
}

/// Phase scheduler timings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTuning {
    /// Shop phases wait for the ready signal instead of a timer.
    pub timeless: bool,
    /// Delay before the first shop opens.
    pub startup_grace_secs: f32,
    /// Length of a timed shop phase.
    pub shop_secs: f32,
    /// Length of the spawn window of a wave.
    pub spawn_window_secs: f32,
    /// Cadence of the "all enemies cleared" poll.
    pub clear_poll_secs: f32,
    /// Pause between a cleared wave and the next shop.
    pub post_wave_pause_secs: f32,
    /// Pause between closing the shop and the next wave.
    pub post_shop_pause_secs: f32,
    /// Completed waves after which stronger enemies are allowed.
    pub mid_game_wave: u32,
}

impl PhaseTuning {
    /// Startup grace as a [`Duration`].
    #[must_use]
    pub fn startup_grace(&self) -> Duration {
        secs(self.startup_grace_secs)
    }

    /// Timed shop length as a [`Duration`].
    #[must_use]
    pub fn shop(&self) -> Duration {
        secs(self.shop_secs)
    }

    /// Spawn window as a [`Duration`].
    #[must_use]
    pub fn spawn_window(&self) -> Duration {
        secs(self.spawn_window_secs)
    }

    /// Clear poll cadence as a [`Duration`].
    #[must_use]
    pub fn clear_poll(&self) -> Duration {
        secs(self.clear_poll_secs)
    }

    /// Post-wave pause as a [`Duration`].
    #[must_use]
    pub fn post_wave_pause(&self) -> Duration {
        secs(self.post_wave_pause_secs)
    }

    /// Post-shop pause as a [`Duration`].
    #[must_use]
    pub fn post_shop_pause(&self) -> Duration {
        secs(self.post_shop_pause_secs)
    }
}

impl Default for PhaseTuning {
    fn default() -> Self {
        Self {
            timeless: false,
            startup_grace_secs: 1.5,
            shop_secs: 20.0,
            spawn_window_secs: 12.0,
            clear_poll_secs: 1.0,
            post_wave_pause_secs: 1.0,
            post_shop_pause_secs: 1.0,
            mid_game_wave: 5,
        }
    }
}

/// Station destruction sequence timings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplosionTuning {
    /// Number of camera impulses before the nova.
    pub impulse_count: u32,
    /// Lower bound of the random gap after each impulse.
    pub impulse_min_interval_secs: f32,
    /// Upper bound of the random gap after each impulse.
    pub impulse_max_interval_secs: f32,
    /// Delay between the last impulse gap and the nova flash.
    pub flash_timing_secs: f32,
    /// Length of the nova before the session ends.
    pub nova_secs: f32,
}

impl ExplosionTuning {
    /// Flash delay as a [`Duration`].
    #[must_use]
    pub fn flash_timing(&self) -> Duration {
        secs(self.flash_timing_secs)
    }

    /// Nova length as a [`Duration`].
    #[must_use]
    pub fn nova(&self) -> Duration {
        secs(self.nova_secs)
    }

    /// Converts a sampled gap in seconds into a [`Duration`].
    #[must_use]
    pub fn gap(&self, seconds: f32) -> Duration {
        secs(seconds)
    }
}

impl Default for ExplosionTuning {
    fn default() -> Self {
        Self {
            impulse_count: 5,
            impulse_min_interval_secs: 0.2,
            impulse_max_interval_secs: 1.0,
            flash_timing_secs: 0.5,
            nova_secs: 2.0,
        }
    }
}
