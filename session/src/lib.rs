#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session context that owns the world and every system and drives them in a
//! fixed order once per tick.
//!
//! Within a tick the world first moves enemies, resolves ring collisions and
//! advances shield, station and explosion timers. The armament system then
//! fires, the phase scheduler advances its waits, and the spawner emits the
//! enemies due for the tick. Every stage sees the events produced before it.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use nova_defence_core::{
    Balancing, Command, Credits, Event, GamePhase, Health, RepairError, ShieldRing,
    UpgradeError, UpgradeTarget,
};
use nova_defence_system_armament::Armament;
use nova_defence_system_phases::{self as phases, FieldStatus, Phases};
use nova_defence_system_spawning::{self as spawning, Spawning};
use nova_defence_world::{self as world, query, ShieldStatus, World};
use tracing::warn;

static LIVE_SESSIONS: AtomicUsize = AtomicUsize::new(0);

/// A single game session.
#[derive(Debug)]
pub struct Session {
    world: World,
    armament: Armament,
    phases: Phases,
    spawning: Spawning,
    pending_events: Vec<Event>,
    tick_events: Vec<Event>,
    scratch: Vec<Command>,
}

impl Session {
    /// Starts a session from balancing data.
    #[must_use]
    pub fn new(balancing: &Balancing) -> Self {
        let live = LIVE_SESSIONS.fetch_add(1, Ordering::SeqCst);
        if live > 0 {
            warn!(live = live + 1, "more than one session is alive");
        }

        Self {
            world: World::new(balancing),
            armament: Armament::new(balancing.weapons.shot_delay()),
            phases: Phases::new(phases::Config::from_balancing(balancing)),
            spawning: Spawning::new(spawning::Config::from_balancing(balancing)),
            pending_events: Vec::new(),
            tick_events: Vec::new(),
            scratch: Vec::new(),
        }
    }

    /// Advances the whole session by `dt` and returns the events of the tick.
    pub fn tick(&mut self, dt: Duration) -> &[Event] {
        self.tick_events.clear();
        self.tick_events.append(&mut self.pending_events);
        world::apply(&mut self.world, Command::Tick { dt }, &mut self.tick_events);

        let phase = query::phase(&self.world);
        self.armament.handle(
            &self.tick_events,
            phase,
            &query::weapon_view(&self.world),
            &query::enemy_view(&self.world),
            &mut self.scratch,
        );
        self.flush_commands();

        let field = FieldStatus {
            active_enemies: query::active_enemy_count(&self.world),
            pending_spawns: self.spawning.pending(),
        };
        self.phases.handle(
            &self.tick_events,
            query::phase(&self.world),
            field,
            &mut self.scratch,
        );
        self.flush_commands();

        self.spawning
            .handle(&self.tick_events, query::phase(&self.world), &mut self.scratch);
        self.flush_commands();

        &self.tick_events
    }

    fn flush_commands(&mut self) {
        for command in self.scratch.drain(..) {
            world::apply(&mut self.world, command, &mut self.tick_events);
        }
    }

    /// Applies a player or tooling command outside the tick. Its events are
    /// delivered to the systems on the next tick and returned here.
    pub fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut events);
        self.pending_events.extend(events.iter().cloned());
        events
    }

    /// Buys the next level of `target`. Returns `false` and spends nothing
    /// when the purchase is rejected.
    pub fn attempt_upgrade(&mut self, target: UpgradeTarget) -> bool {
        self.try_upgrade(target).is_ok()
    }

    /// Buys the next level of `target`, returning the new level or the reason
    /// for the rejection.
    pub fn try_upgrade(&mut self, target: UpgradeTarget) -> Result<u32, UpgradeError> {
        let events = self.submit(Command::PurchaseUpgrade { target });
        events
            .iter()
            .find_map(|event| match event {
                Event::UpgradePurchased { level, .. } => Some(Ok(*level)),
                Event::UpgradeRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(UpgradeError::UnknownElement))
    }

    /// Buys an instant station repair.
    pub fn attempt_station_repair(&mut self) -> bool {
        self.try_station_repair().is_ok()
    }

    /// Buys an instant station repair, returning the reason on rejection.
    pub fn try_station_repair(&mut self) -> Result<(), RepairError> {
        let events = self.submit(Command::RepairStation);
        events
            .iter()
            .find_map(|event| match event {
                Event::StationRepaired { .. } => Some(Ok(())),
                Event::RepairRejected { reason } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(RepairError::SessionOver))
    }

    /// Signals that the open shop may close.
    pub fn declare_ready(&mut self) {
        let _ = self.submit(Command::DeclareReady);
    }

    /// Moves spendable credits into storage. `None` moves everything.
    pub fn store_credits(&mut self, amount: Option<Credits>) -> bool {
        let events = self.submit(Command::StoreCredits { amount });
        amount.is_none()
            || events
                .iter()
                .any(|event| matches!(event, Event::CreditsChanged { .. }))
    }

    /// Spendable credits.
    #[must_use]
    pub fn current_credits(&self) -> Credits {
        query::current_credits(&self.world)
    }

    /// Banked credits, the end-of-session score.
    #[must_use]
    pub fn stored_credits(&self) -> Credits {
        query::stored_credits(&self.world)
    }

    /// Phase the session runs in.
    #[must_use]
    pub fn current_phase(&self) -> GamePhase {
        query::phase(&self.world)
    }

    /// Zero-based level of an element.
    #[must_use]
    pub fn level(&self, target: UpgradeTarget) -> Option<u32> {
        query::upgrade_level(&self.world, target)
    }

    /// Price of the next level of an element.
    #[must_use]
    pub fn next_price(&self, target: UpgradeTarget) -> Option<Credits> {
        query::next_price(&self.world, target)
    }

    /// Reports whether an element reached its last level.
    #[must_use]
    pub fn is_max_level(&self, target: UpgradeTarget) -> bool {
        query::is_max_level(&self.world, target)
    }

    /// Health of the station core.
    #[must_use]
    pub fn station_health(&self) -> Health {
        query::station_health(&self.world)
    }

    /// Price of the next paid repair.
    #[must_use]
    pub fn repair_price(&self) -> Credits {
        query::repair_price(&self.world)
    }

    /// Health of a shield.
    #[must_use]
    pub fn shield_health(&self, ring: ShieldRing) -> Health {
        query::shield_health(&self.world, ring)
    }

    /// State of a shield.
    #[must_use]
    pub fn shield_status(&self, ring: ShieldRing) -> ShieldStatus {
        query::shield_status(&self.world, ring)
    }

    /// One-based number of the current or most recent wave.
    #[must_use]
    pub fn wave(&self) -> u32 {
        self.phases.wave()
    }

    /// Display timer of the current or most recent wave.
    #[must_use]
    pub fn wave_clock(&self) -> Duration {
        self.phases.wave_clock()
    }

    /// Enemies spawned per burst.
    #[must_use]
    pub fn spawn_count(&self) -> u32 {
        self.spawning.spawn_count()
    }

    /// Reports whether the explosion sequence finished.
    #[must_use]
    pub fn is_over(&self) -> bool {
        query::session_ended(&self.world)
    }

    /// Read-only access to the world for detailed queries.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read-only access to the weapon system.
    #[must_use]
    pub fn armament(&self) -> &Armament {
        &self.armament
    }

    /// Read-only access to the phase scheduler.
    #[must_use]
    pub fn phases(&self) -> &Phases {
        &self.phases
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Balancing::default())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = LIVE_SESSIONS.fetch_sub(1, Ordering::SeqCst);
    }
}
