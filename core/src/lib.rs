#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Nova Defence engine.
//!
//! This crate defines the message surface that connects the session, the
//! authoritative world, and pure systems. The session submits [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

mod balancing;
mod progression;

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use balancing::{
    Balancing, BeamMount, ConfigIssue, EconomyTuning, EnemyProfile, EnemyTuning,
    ExplosionTuning, MountTuning, PhaseTuning, RepairTuning, RingTuning, SpawnerTuning,
    UpgradeTable, WeaponTuning,
};
pub use progression::{
    BeamStats, Health, LevelError, LevelUp, MultiShotStats, PulseStats, ShieldStats,
    StationStats, Upgradable, UpgradableLevel,
};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Nova Defence.";

/// Top-level session phase owned by the phase scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// Between waves: upgrades, repairs and shield top-ups.
    Shop,
    /// Enemies spawn and weapons fire.
    Wave,
    /// The station was destroyed. Terminal.
    Dead,
}

impl GamePhase {
    /// Reports whether the phase can never be left again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Dead)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Registers a new enemy at the provided spawn point.
    SpawnEnemy {
        /// World-space spawn position, normally outside the visible area.
        position: Vec2,
        /// Variant that selects damage, reward and size.
        variant: EnemyVariant,
        /// Initial approach speed in world units per second.
        speed: f32,
    },
    /// Explodes an enemy on behalf of a weapon, crediting its kill reward.
    DestroyEnemy {
        /// Enemy targeted by the weapon.
        enemy: EnemyId,
    },
    /// Toggles debug-only overrides on a live enemy.
    SetEnemyDebug {
        /// Enemy receiving the overrides.
        enemy: EnemyId,
        /// Stops the enemy from moving.
        frozen: bool,
        /// Stops the enemy from colliding or being killed.
        invulnerable: bool,
    },
    /// Routes collision damage to a ring of the station.
    HandleCollision {
        /// Ring receiving the hit.
        element: StationElement,
        /// Damage carried by the colliding enemy.
        damage: f32,
    },
    /// Attempts to buy the next level of an upgradable element.
    PurchaseUpgrade {
        /// Element whose level should increase.
        target: UpgradeTarget,
    },
    /// Attempts to buy an instant station repair.
    RepairStation,
    /// Moves spendable credits into stored credits.
    StoreCredits {
        /// Amount to move; `None` moves the entire balance.
        amount: Option<Credits>,
    },
    /// Player signals that the current shop phase may end.
    DeclareReady,
    /// Requests that the world transition to the provided phase.
    SetPhase {
        /// Phase the world should activate.
        phase: GamePhase,
    },
    /// Deposits the per-wave stored stipend and cash bonus.
    DepositWaveStipend,
    /// Tops up both shields if they are damaged but alive.
    RechargeShields,
    /// Marks the current wave as cleared.
    CompleteWave,
    /// Enables stronger enemies ahead of the spawn cap.
    EnterMidGame,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that the session entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: GamePhase,
    },
    /// Confirms that an enemy joined the active registry.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Variant of the enemy.
        variant: EnemyVariant,
        /// Spawn position.
        position: Vec2,
    },
    /// Reports that an enemy crossed a ring threshold.
    EnemyCollided {
        /// Enemy that collided.
        enemy: EnemyId,
        /// Ring that absorbed the hit.
        element: StationElement,
        /// Damage delivered.
        damage: f32,
    },
    /// Reports that an enemy left the active registry and started exploding.
    EnemyExploding {
        /// Enemy that started exploding.
        enemy: EnemyId,
        /// What set the explosion off.
        cause: ExplosionCause,
    },
    /// Reports that an enemy finished exploding and was dropped.
    EnemyRemoved {
        /// Enemy that was dropped.
        enemy: EnemyId,
    },
    /// Announces the ledger balances after any mutation.
    CreditsChanged {
        /// Spendable credits.
        current: Credits,
        /// Banked credits.
        stored: Credits,
    },
    /// Confirms a paid upgrade.
    UpgradePurchased {
        /// Element that levelled up.
        target: UpgradeTarget,
        /// Zero-based level now active.
        level: u32,
        /// Price of the following level, if any.
        next_price: Option<Credits>,
    },
    /// Reports a rejected upgrade. No credits were spent.
    UpgradeRejected {
        /// Element targeted by the request.
        target: UpgradeTarget,
        /// Reason for the rejection.
        reason: UpgradeError,
    },
    /// Confirms a paid station repair.
    StationRepaired {
        /// Station health after the repair.
        health: f32,
        /// Price of the next repair.
        next_price: Credits,
    },
    /// Reports a rejected repair. No credits were spent.
    RepairRejected {
        /// Reason for the rejection.
        reason: RepairError,
    },
    /// A shield absorbed a hit and stayed up.
    ShieldHit {
        /// Shield that was hit.
        ring: ShieldRing,
        /// Remaining health.
        health: f32,
    },
    /// A shield ran out of health and started recharging.
    ShieldDepleted {
        /// Shield that went down.
        ring: ShieldRing,
    },
    /// A shield came back to full health.
    ShieldRestored {
        /// Shield that came back.
        ring: ShieldRing,
    },
    /// The station core took damage.
    StationDamaged {
        /// Remaining health, clamped at zero.
        health: f32,
    },
    /// The station core reached zero health. Emitted exactly once.
    StationDestroyed,
    /// Camera shake impulse during the station explosion.
    CameraImpulse {
        /// Zero-based index of the impulse in the sequence.
        index: u32,
    },
    /// The nova flash: every live enemy explodes.
    NovaTriggered,
    /// The explosion sequence finished; the session is over.
    SessionEnded,
    /// The player declared readiness during a shop phase.
    ReadyDeclared,
    /// The automatic per-wave deposit was paid.
    WaveStipendDeposited {
        /// Credits added to the stored balance.
        stored: Credits,
        /// Credits added to the spendable balance.
        bonus: Credits,
    },
    /// A wave was cleared.
    WaveCompleted {
        /// One-based number of the completed wave.
        wave: u32,
    },
    /// Stronger enemies are now allowed before the spawn cap.
    MidGameEntered,
    /// A phase change request arrived after the session died.
    PhaseChangeRejected {
        /// Phase that was requested.
        requested: GamePhase,
    },
}

/// Reason an enemy started exploding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExplosionCause {
    /// Crossed a ring threshold.
    Collision(StationElement),
    /// Killed by a weapon; the reward was credited.
    Weapon,
    /// Swept up by the station's nova.
    Nova,
}

/// Concentric layers an enemy can collide with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StationElement {
    /// Outer shield ring.
    LargeShield,
    /// Inner shield ring.
    SmallShield,
    /// Station core.
    StationHq,
}

/// Identifies one of the two shields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShieldRing {
    /// Inner shield.
    Small,
    /// Outer shield.
    Large,
}

impl ShieldRing {
    /// Collision element that corresponds to this shield.
    #[must_use]
    pub const fn element(self) -> StationElement {
        match self {
            Self::Small => StationElement::SmallShield,
            Self::Large => StationElement::LargeShield,
        }
    }
}

/// Weapon families available to the station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeaponKind {
    /// Multi-shot orb that fires at the oldest enemies.
    DefenseOrb,
    /// Beam weapon that sweeps a fixed line.
    Complexity,
    /// Pulse weapon that clears a circle around itself.
    Pulsar,
}

impl WeaponKind {
    /// Reports whether the weapon only fires during the wave phase.
    ///
    /// Orbs and pulsars stay online whenever they are active.
    #[must_use]
    pub const fn requires_wave_phase(self) -> bool {
        matches!(self, Self::Complexity)
    }
}

/// Identifies a single weapon instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponSlot {
    kind: WeaponKind,
    index: u32,
}

impl WeaponSlot {
    /// Creates a slot for the `index`-th instance of `kind`.
    #[must_use]
    pub const fn new(kind: WeaponKind, index: u32) -> Self {
        Self { kind, index }
    }

    /// Weapon family of the slot.
    #[must_use]
    pub const fn kind(&self) -> WeaponKind {
        self.kind
    }

    /// Zero-based instance index within the family.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }
}

/// Element a player can buy levels for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeTarget {
    /// The `n`-th defense orb.
    DefenseOrb(u32),
    /// The `n`-th complexity beam.
    Complexity(u32),
    /// The `n`-th pulsar.
    Pulsar(u32),
    /// Inner shield.
    SmallShield,
    /// Outer shield.
    LargeShield,
    /// Station core.
    Station,
}

impl UpgradeTarget {
    /// Weapon slot addressed by the target, if it is a weapon.
    #[must_use]
    pub const fn weapon(self) -> Option<WeaponSlot> {
        match self {
            Self::DefenseOrb(index) => Some(WeaponSlot::new(WeaponKind::DefenseOrb, index)),
            Self::Complexity(index) => Some(WeaponSlot::new(WeaponKind::Complexity, index)),
            Self::Pulsar(index) => Some(WeaponSlot::new(WeaponKind::Pulsar, index)),
            Self::SmallShield | Self::LargeShield | Self::Station => None,
        }
    }

    /// Shield addressed by the target, if it is a shield.
    #[must_use]
    pub const fn shield(self) -> Option<ShieldRing> {
        match self {
            Self::SmallShield => Some(ShieldRing::Small),
            Self::LargeShield => Some(ShieldRing::Large),
            _ => None,
        }
    }
}

impl From<WeaponSlot> for UpgradeTarget {
    fn from(slot: WeaponSlot) -> Self {
        match slot.kind() {
            WeaponKind::DefenseOrb => Self::DefenseOrb(slot.index()),
            WeaponKind::Complexity => Self::Complexity(slot.index()),
            WeaponKind::Pulsar => Self::Pulsar(slot.index()),
        }
    }
}

/// Reasons an upgrade purchase may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpgradeError {
    /// The ledger does not hold enough spendable credits.
    #[error("not enough credits for the upgrade")]
    InsufficientFunds,
    /// The element already reached its last level.
    #[error("element is already at max level")]
    AlreadyMaxLevel,
    /// The balancing data has no price or level for the next step.
    #[error("no price or level configured for the next upgrade")]
    PriceUnavailable,
    /// The target addresses a weapon instance that does not exist.
    #[error("no such element")]
    UnknownElement,
    /// The station is exploding; nothing can be bought anymore.
    #[error("the session is over")]
    SessionOver,
}

/// Reasons a station repair may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RepairError {
    /// The ledger does not hold enough spendable credits.
    #[error("not enough credits for the repair")]
    InsufficientFunds,
    /// The station has nothing to repair.
    #[error("station is already at full health")]
    AlreadyFullHealth,
    /// The station is exploding.
    #[error("the session is over")]
    SessionOver,
}

/// Whole-number currency amount.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Credits(u32);

impl Credits {
    /// No credits.
    pub const ZERO: Self = Self(0);

    /// Wraps a raw credit amount.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the raw credit amount.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Adds two amounts, saturating at the numeric limit.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts `other`, returning `None` when it exceeds `self`.
    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Reports whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Unique identifier assigned to an enemy. Allocation order is registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Enemy flavours produced by the spawner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyVariant {
    /// Standard enemy.
    Normal,
    /// Tougher enemy unlocked by the mid-game and end-game milestones.
    Strong,
}

/// Immutable representation of a single enemy used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Variant of the enemy.
    pub variant: EnemyVariant,
    /// Current world-space position.
    pub position: Vec2,
    /// Current approach speed.
    pub speed: f32,
    /// Collision radius used by region queries.
    pub radius: f32,
}

/// Read-only snapshot describing all enemies in the active registry.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of enemies captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no enemy was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Oldest registered enemy that is not in `exclude`.
    #[must_use]
    pub fn oldest_excluding(&self, exclude: &[EnemyId]) -> Option<EnemyId> {
        self.snapshots
            .iter()
            .map(|snapshot| snapshot.id)
            .find(|id| !exclude.contains(id))
    }
}

/// Region lookups against live enemy positions.
///
/// Both queries are read-only and return identifiers in registration order.
pub trait RegionQuery {
    /// Enemies whose body intersects the segment from `origin` to `target`.
    fn enemies_in_line(&self, origin: Vec2, target: Vec2) -> Vec<EnemyId>;

    /// Enemies whose body overlaps the circle at `center`.
    fn enemies_in_circle(&self, center: Vec2, radius: f32) -> Vec<EnemyId>;
}

impl RegionQuery for EnemyView {
    fn enemies_in_line(&self, origin: Vec2, target: Vec2) -> Vec<EnemyId> {
        self.snapshots
            .iter()
            .filter(|snapshot| {
                distance_to_segment(snapshot.position, origin, target) <= snapshot.radius
            })
            .map(|snapshot| snapshot.id)
            .collect()
    }

    fn enemies_in_circle(&self, center: Vec2, radius: f32) -> Vec<EnemyId> {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.position.distance(center) <= radius + snapshot.radius)
            .map(|snapshot| snapshot.id)
            .collect()
    }
}

fn distance_to_segment(point: Vec2, start: Vec2, end: Vec2) -> f32 {
    let segment = end - start;
    let length_sq = segment.length_squared();
    if length_sq <= f32::EPSILON {
        return point.distance(start);
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    point.distance(start + segment * t)
}

/// Fixed geometry of a weapon instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeaponMount {
    /// Orb fire point.
    Orb {
        /// Position the lasers originate from.
        position: Vec2,
    },
    /// Beam endpoints.
    Beam {
        /// Fixed origin of the beam.
        origin: Vec2,
        /// Fixed far end of the beam.
        target: Vec2,
    },
    /// Pulse centre.
    Pulse {
        /// Centre of the blast circle.
        center: Vec2,
    },
}

/// Stats of the level a weapon currently runs at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeaponProfile {
    /// Defense orb stats.
    MultiShot(MultiShotStats),
    /// Complexity stats.
    Beam(BeamStats),
    /// Pulsar stats.
    Pulse(PulseStats),
}

/// Immutable representation of a single weapon instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeaponSnapshot {
    /// Slot of the weapon.
    pub slot: WeaponSlot,
    /// Fixed geometry of the weapon.
    pub mount: WeaponMount,
    /// Current stats; `None` until the first level is bought.
    pub profile: Option<WeaponProfile>,
}

/// Read-only snapshot describing every weapon instance.
#[derive(Clone, Debug, Default)]
pub struct WeaponView {
    snapshots: Vec<WeaponSnapshot>,
}

impl WeaponView {
    /// Creates a new weapon view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<WeaponSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.slot);
        Self { snapshots }
    }

    /// Iterator over the captured weapon snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &WeaponSnapshot> {
        self.snapshots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn upgrade_target_round_trips_through_bincode() {
        assert_round_trip(&UpgradeTarget::Pulsar(1));
        assert_round_trip(&UpgradeTarget::Station);
    }

    #[test]
    fn weapon_targets_map_to_slots() {
        let slot = UpgradeTarget::Complexity(1).weapon().expect("weapon slot");
        assert_eq!(slot.kind(), WeaponKind::Complexity);
        assert_eq!(slot.index(), 1);
        assert_eq!(UpgradeTarget::from(slot), UpgradeTarget::Complexity(1));
        assert!(UpgradeTarget::Station.weapon().is_none());
        assert_eq!(UpgradeTarget::LargeShield.shield(), Some(ShieldRing::Large));
    }

    #[test]
    fn credits_checked_sub_refuses_overdraft() {
        let balance = Credits::new(20);
        assert_eq!(balance.checked_sub(Credits::new(50)), None);
        assert_eq!(balance.checked_sub(Credits::new(20)), Some(Credits::ZERO));
    }

    #[test]
    fn only_the_beam_waits_for_the_wave() {
        assert!(WeaponKind::Complexity.requires_wave_phase());
        assert!(!WeaponKind::Pulsar.requires_wave_phase());
        assert!(!WeaponKind::DefenseOrb.requires_wave_phase());
    }

    #[test]
    fn only_dead_is_terminal() {
        assert!(GamePhase::Dead.is_terminal());
        assert!(!GamePhase::Shop.is_terminal());
        assert!(!GamePhase::Wave.is_terminal());
    }

    fn enemy(id: u32, x: f32, y: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            variant: EnemyVariant::Normal,
            position: Vec2::new(x, y),
            speed: 1.0,
            radius: 0.5,
        }
    }

    #[test]
    fn view_orders_by_registration() {
        let view = EnemyView::from_snapshots(vec![enemy(9, 0.0, 0.0), enemy(3, 1.0, 1.0)]);
        assert_eq!(view.oldest_excluding(&[]), Some(EnemyId::new(3)));
        assert_eq!(
            view.oldest_excluding(&[EnemyId::new(3)]),
            Some(EnemyId::new(9))
        );
        assert_eq!(
            view.oldest_excluding(&[EnemyId::new(3), EnemyId::new(9)]),
            None
        );
    }

    #[test]
    fn line_query_hits_enemies_touching_the_segment() {
        let view = EnemyView::from_snapshots(vec![
            enemy(1, 5.0, 0.4),
            enemy(2, 5.0, 2.0),
            enemy(3, 12.0, 0.0),
        ]);
        let hits = view.enemies_in_line(Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(hits, vec![EnemyId::new(1)]);
    }

    #[test]
    fn circle_query_includes_enemy_radius() {
        let view = EnemyView::from_snapshots(vec![enemy(1, 3.4, 0.0), enemy(2, 3.6, 0.0)]);
        let hits = view.enemies_in_circle(Vec2::ZERO, 3.0);
        assert_eq!(hits, vec![EnemyId::new(1)]);
    }
}
