#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Nova Defence.

mod armoury;
mod enemies;
mod ledger;
mod station;

use nova_defence_core::{
    Balancing, Command, Credits, Event, ExplosionCause, GamePhase, RepairError, ShieldRing,
    StationElement, Upgradable, UpgradeError, UpgradeTarget, WeaponKind, WeaponSlot,
    WELCOME_BANNER,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use armoury::Armoury;
use enemies::EnemyRegistry;
use station::{ExplosionProgress, Shield, Station};

pub use ledger::EconomyLedger;
pub use station::ShieldStatus;

const WORLD_STREAM: u64 = 0x7374_6174_696f_6e00;

/// Represents the authoritative Nova Defence world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    balancing: Balancing,
    phase: GamePhase,
    ledger: EconomyLedger,
    enemies: EnemyRegistry,
    station: Station,
    small_shield: Shield,
    large_shield: Shield,
    armoury: Armoury,
    rng: ChaCha8Rng,
    waves_completed: u32,
    mid_game: bool,
    tick_index: u64,
}

impl World {
    /// Creates a world in the opening shop phase with the free loadout granted.
    #[must_use]
    pub fn new(balancing: &Balancing) -> Self {
        for issue in balancing.validate() {
            warn!(%issue, "balancing issue");
        }

        let mut world = Self {
            banner: WELCOME_BANNER,
            phase: GamePhase::Shop,
            ledger: EconomyLedger::new(balancing.starting_credits),
            enemies: EnemyRegistry::default(),
            station: Station::new(
                Arc::new(balancing.station.clone()),
                balancing.repair.clone(),
            ),
            small_shield: Shield::new(ShieldRing::Small, Arc::new(balancing.small_shield.clone())),
            large_shield: Shield::new(ShieldRing::Large, Arc::new(balancing.large_shield.clone())),
            armoury: Armoury::new(balancing),
            rng: ChaCha8Rng::seed_from_u64(balancing.rng_seed ^ WORLD_STREAM),
            waves_completed: 0,
            mid_game: false,
            tick_index: 0,
            balancing: balancing.clone(),
        };
        world.grant_starting_loadout();
        world
    }

    fn grant_starting_loadout(&mut self) {
        if let Err(error) = self.station.increase_level() {
            warn!(%error, "station has no starting level");
        }

        for index in 0..self.balancing.free_defense_orbs {
            let slot = WeaponSlot::new(WeaponKind::DefenseOrb, index);
            match self.armoury.get_mut(slot) {
                Some(orb) => {
                    if let Err(error) = orb.increase_level() {
                        warn!(%error, index, "free defense orb could not be granted");
                    }
                }
                None => warn!(index, "free defense orb has no mount"),
            }
        }
    }

    fn shield_mut(&mut self, ring: ShieldRing) -> &mut Shield {
        match ring {
            ShieldRing::Small => &mut self.small_shield,
            ShieldRing::Large => &mut self.large_shield,
        }
    }

    fn is_over(&self) -> bool {
        self.phase.is_terminal() || self.station.is_exploding()
    }

    fn emit_credits(&self, out_events: &mut Vec<Event>) {
        out_events.push(Event::CreditsChanged {
            current: self.ledger.current(),
            stored: self.ledger.stored(),
        });
    }

    fn advance(&mut self, dt: std::time::Duration, out_events: &mut Vec<Event>) {
        let seconds = dt.as_secs_f32();
        let gravity = self.balancing.enemies.gravity_factor;
        for enemy in self.enemies.iter_mut() {
            enemy.advance(seconds, gravity);
        }

        self.resolve_collisions(out_events);

        if self.phase == GamePhase::Wave {
            self.station.repair_over_time(dt);
        }
        self.small_shield.tick(dt, out_events);
        self.large_shield.tick(dt, out_events);

        let progress = self.station.tick_explosion(
            dt,
            &self.balancing.explosion,
            &mut self.rng,
            out_events,
        );
        if progress == ExplosionProgress::Nova {
            let linger = self.balancing.enemies.explosion();
            let swept = self.enemies.explode_all(linger);
            debug!(count = swept.len(), "nova swept enemies");
            out_events.extend(swept.into_iter().map(|enemy| Event::EnemyExploding {
                enemy,
                cause: ExplosionCause::Nova,
            }));
        }

        for enemy in self.enemies.tick_explosions(dt) {
            out_events.push(Event::EnemyRemoved { enemy });
        }
    }

    fn resolve_collisions(&mut self, out_events: &mut Vec<Event>) {
        let linger = self.balancing.enemies.explosion();
        for id in self.enemies.active_ids() {
            let large_alive = self.large_shield.is_alive();
            let small_alive = self.small_shield.is_alive();
            let Some(enemy) = self.enemies.get(id) else {
                continue;
            };
            let Some(element) = enemy.collision(&self.balancing.rings, large_alive, small_alive)
            else {
                continue;
            };

            let damage = enemy.damage;
            if self.enemies.explode(id, linger).is_none() {
                continue;
            }
            out_events.push(Event::EnemyCollided {
                enemy: id,
                element,
                damage,
            });
            out_events.push(Event::EnemyExploding {
                enemy: id,
                cause: ExplosionCause::Collision(element),
            });
            self.route_collision(element, damage, out_events);
        }
    }

    fn route_collision(&mut self, element: StationElement, damage: f32, out_events: &mut Vec<Event>) {
        match element {
            StationElement::LargeShield => self.large_shield.take_damage(damage, out_events),
            StationElement::SmallShield => self.small_shield.take_damage(damage, out_events),
            StationElement::StationHq => {
                let destroyed = self.station.take_hit(
                    damage,
                    &self.balancing.explosion,
                    &mut self.rng,
                    out_events,
                );
                if destroyed {
                    self.enter_dead(out_events);
                }
            }
        }
    }

    fn enter_dead(&mut self, out_events: &mut Vec<Event>) {
        self.small_shield.station_down();
        self.large_shield.station_down();
        if self.phase != GamePhase::Dead {
            self.phase = GamePhase::Dead;
            info!(waves = self.waves_completed, "phase changed to dead");
            out_events.push(Event::PhaseChanged {
                phase: GamePhase::Dead,
            });
        }
    }

    fn purchase(&mut self, target: UpgradeTarget) -> Result<(u32, Option<Credits>), UpgradeError> {
        if self.is_over() {
            return Err(UpgradeError::SessionOver);
        }

        let element = element_mut(
            &mut self.armoury,
            &mut self.station,
            &mut self.small_shield,
            &mut self.large_shield,
            target,
        )
        .ok_or(UpgradeError::UnknownElement)?;
        if element.is_max_level() {
            return Err(UpgradeError::AlreadyMaxLevel);
        }
        let price = element.next_price().ok_or(UpgradeError::PriceUnavailable)?;
        if !self.ledger.try_debit(price) {
            return Err(UpgradeError::InsufficientFunds);
        }

        match element.increase_level() {
            Ok(level) => Ok((level, element.next_price())),
            Err(error) => {
                warn!(%error, ?target, "level increase failed after payment, refunding");
                self.ledger.credit(price);
                Err(UpgradeError::PriceUnavailable)
            }
        }
    }

    fn repair(&mut self) -> Result<(), RepairError> {
        if self.phase.is_terminal() {
            return Err(RepairError::SessionOver);
        }
        let price = self.station.can_repair()?;
        if !self.ledger.try_debit(price) {
            return Err(RepairError::InsufficientFunds);
        }
        self.station.apply_repair();
        Ok(())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(&Balancing::default())
    }
}

fn element_mut<'a>(
    armoury: &'a mut Armoury,
    station: &'a mut Station,
    small_shield: &'a mut Shield,
    large_shield: &'a mut Shield,
    target: UpgradeTarget,
) -> Option<&'a mut dyn Upgradable> {
    match target {
        UpgradeTarget::DefenseOrb(_) | UpgradeTarget::Complexity(_) | UpgradeTarget::Pulsar(_) => {
            target.weapon().and_then(|slot| armoury.get_mut(slot))
        }
        UpgradeTarget::SmallShield => Some(small_shield),
        UpgradeTarget::LargeShield => Some(large_shield),
        UpgradeTarget::Station => Some(station),
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
            world.advance(dt, out_events);
        }
        Command::SpawnEnemy {
            position,
            variant,
            speed,
        } => {
            if world.is_over() || world.station.is_nova() {
                debug!(?variant, "spawn ignored after station destruction");
                return;
            }
            let profile = world.balancing.enemies.profile(variant).clone();
            let enemy = world.enemies.spawn(variant, position, speed, &profile);
            out_events.push(Event::EnemySpawned {
                enemy,
                variant,
                position,
            });
        }
        Command::DestroyEnemy { enemy } => {
            if world.enemies.get(enemy).map_or(true, |target| target.invulnerable) {
                return;
            }
            let linger = world.balancing.enemies.explosion();
            let Some(killed) = world.enemies.explode(enemy, linger) else {
                return;
            };
            world.enemies.count_kill();
            world.ledger.credit(killed.reward);
            debug!(enemy = enemy.get(), reward = killed.reward.get(), "enemy killed");
            out_events.push(Event::EnemyExploding {
                enemy,
                cause: ExplosionCause::Weapon,
            });
            world.emit_credits(out_events);
        }
        Command::SetEnemyDebug {
            enemy,
            frozen,
            invulnerable,
        } => {
            if let Some(target) = world.enemies.get_mut(enemy) {
                target.frozen = frozen;
                target.invulnerable = invulnerable;
            }
        }
        Command::HandleCollision { element, damage } => {
            world.route_collision(element, damage, out_events);
        }
        Command::PurchaseUpgrade { target } => match world.purchase(target) {
            Ok((level, next_price)) => {
                info!(?target, level, "upgrade purchased");
                out_events.push(Event::UpgradePurchased {
                    target,
                    level,
                    next_price,
                });
                world.emit_credits(out_events);
            }
            Err(reason) => {
                match reason {
                    UpgradeError::InsufficientFunds => debug!(?target, %reason, "upgrade rejected"),
                    _ => warn!(?target, %reason, "upgrade rejected"),
                }
                out_events.push(Event::UpgradeRejected { target, reason });
            }
        },
        Command::RepairStation => match world.repair() {
            Ok(()) => {
                out_events.push(Event::StationRepaired {
                    health: world.station.health().current(),
                    next_price: world.station.repair_price(),
                });
                world.emit_credits(out_events);
            }
            Err(reason) => {
                debug!(%reason, "repair rejected");
                out_events.push(Event::RepairRejected { reason });
            }
        },
        Command::StoreCredits { amount } => {
            let stored = match amount {
                None => {
                    let _ = world.ledger.store_all();
                    true
                }
                Some(amount) => world.ledger.store_amount(amount),
            };
            if stored {
                world.emit_credits(out_events);
            }
        }
        Command::DeclareReady => {
            if world.phase == GamePhase::Shop {
                out_events.push(Event::ReadyDeclared);
            } else {
                debug!(phase = ?world.phase, "ready ignored outside the shop");
            }
        }
        Command::SetPhase { phase } => {
            if world.phase.is_terminal() {
                if phase != world.phase {
                    warn!(?phase, "phase change rejected after station destruction");
                    out_events.push(Event::PhaseChangeRejected { requested: phase });
                }
                return;
            }
            if phase == world.phase {
                return;
            }
            if phase.is_terminal() {
                world.enter_dead(out_events);
                return;
            }
            world.phase = phase;
            info!(?phase, wave = world.waves_completed + 1, "phase changed");
            out_events.push(Event::PhaseChanged { phase });
        }
        Command::DepositWaveStipend => {
            if world.is_over() {
                return;
            }
            let stored = world.balancing.economy.wave_stored_stipend;
            let bonus = world.balancing.economy.wave_cash_bonus;
            world.ledger.store_fixed(stored);
            world.ledger.credit(bonus);
            out_events.push(Event::WaveStipendDeposited { stored, bonus });
            world.emit_credits(out_events);
        }
        Command::RechargeShields => {
            if world.phase != GamePhase::Shop {
                return;
            }
            for ring in [ShieldRing::Large, ShieldRing::Small] {
                if world.shield_mut(ring).manual_recharge() {
                    debug!(?ring, "shield topped up");
                }
            }
        }
        Command::CompleteWave => {
            if world.is_over() {
                return;
            }
            world.waves_completed = world.waves_completed.saturating_add(1);
            info!(wave = world.waves_completed, "wave completed");
            out_events.push(Event::WaveCompleted {
                wave: world.waves_completed,
            });
        }
        Command::EnterMidGame => {
            if !world.mid_game {
                world.mid_game = true;
                info!(wave = world.waves_completed, "mid-game reached");
                out_events.push(Event::MidGameEntered);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use nova_defence_core::{
        Credits, EnemyView, GamePhase, Health, ShieldRing, Upgradable, UpgradeTarget, WeaponView,
    };

    use super::{EconomyLedger, ShieldStatus, World};

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Phase the world currently runs in.
    #[must_use]
    pub fn phase(world: &World) -> GamePhase {
        world.phase
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Read-only access to both credit balances.
    #[must_use]
    pub fn ledger(world: &World) -> &EconomyLedger {
        &world.ledger
    }

    /// Spendable credits.
    #[must_use]
    pub fn current_credits(world: &World) -> Credits {
        world.ledger.current()
    }

    /// Banked credits.
    #[must_use]
    pub fn stored_credits(world: &World) -> Credits {
        world.ledger.stored()
    }

    /// Captures a read-only view of the enemies in the active registry.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(world.enemies.iter().map(|enemy| enemy.snapshot()).collect())
    }

    /// Number of enemies still approaching.
    #[must_use]
    pub fn active_enemy_count(world: &World) -> usize {
        world.enemies.active_len()
    }

    /// Number of enemies playing their explosion.
    #[must_use]
    pub fn exploding_enemy_count(world: &World) -> usize {
        world.enemies.exploding_len()
    }

    /// Total enemies spawned this session.
    #[must_use]
    pub fn enemies_spawned(world: &World) -> u32 {
        world.enemies.spawned_total()
    }

    /// Total weapon kills this session.
    #[must_use]
    pub fn kills(world: &World) -> u32 {
        world.enemies.killed_total()
    }

    /// Captures a read-only view of every weapon instance.
    #[must_use]
    pub fn weapon_view(world: &World) -> WeaponView {
        WeaponView::from_snapshots(world.armoury.snapshots())
    }

    fn element(world: &World, target: UpgradeTarget) -> Option<&dyn Upgradable> {
        match target {
            UpgradeTarget::DefenseOrb(_)
            | UpgradeTarget::Complexity(_)
            | UpgradeTarget::Pulsar(_) => target.weapon().and_then(|slot| world.armoury.get(slot)),
            UpgradeTarget::SmallShield => Some(&world.small_shield),
            UpgradeTarget::LargeShield => Some(&world.large_shield),
            UpgradeTarget::Station => Some(&world.station),
        }
    }

    /// Zero-based level of an element, `None` when unpurchased or unknown.
    #[must_use]
    pub fn upgrade_level(world: &World, target: UpgradeTarget) -> Option<u32> {
        element(world, target).and_then(Upgradable::current_level)
    }

    /// Price of the next level of an element, if it can be bought.
    #[must_use]
    pub fn next_price(world: &World, target: UpgradeTarget) -> Option<Credits> {
        element(world, target).and_then(Upgradable::next_price)
    }

    /// Reports whether an element reached its last level.
    #[must_use]
    pub fn is_max_level(world: &World, target: UpgradeTarget) -> bool {
        element(world, target).is_some_and(Upgradable::is_max_level)
    }

    /// State of a shield.
    #[must_use]
    pub fn shield_status(world: &World, ring: ShieldRing) -> ShieldStatus {
        match ring {
            ShieldRing::Small => world.small_shield.status(),
            ShieldRing::Large => world.large_shield.status(),
        }
    }

    /// Health of a shield.
    #[must_use]
    pub fn shield_health(world: &World, ring: ShieldRing) -> Health {
        match ring {
            ShieldRing::Small => world.small_shield.health(),
            ShieldRing::Large => world.large_shield.health(),
        }
    }

    /// Health of the station core.
    #[must_use]
    pub fn station_health(world: &World) -> Health {
        world.station.health()
    }

    /// Reports whether the station started its terminal sequence.
    #[must_use]
    pub fn is_station_exploding(world: &World) -> bool {
        world.station.is_exploding()
    }

    /// Reports whether the nova flash went off.
    #[must_use]
    pub fn is_nova(world: &World) -> bool {
        world.station.is_nova()
    }

    /// Reports whether the explosion sequence finished.
    #[must_use]
    pub fn session_ended(world: &World) -> bool {
        world.station.has_ended()
    }

    /// Price of the next paid station repair.
    #[must_use]
    pub fn repair_price(world: &World) -> Credits {
        world.station.repair_price()
    }

    /// Number of cleared waves.
    #[must_use]
    pub fn waves_completed(world: &World) -> u32 {
        world.waves_completed
    }

    /// Reports whether the mid-game milestone was reached.
    #[must_use]
    pub fn is_mid_game(world: &World) -> bool {
        world.mid_game
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use nova_defence_core::EnemyVariant;
    use std::time::Duration;

    fn spawn(world: &mut World, position: Vec2) -> nova_defence_core::EnemyId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                position,
                variant: EnemyVariant::Normal,
                speed: 0.5,
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::EnemySpawned { enemy, .. }] => *enemy,
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn new_world_grants_the_starting_loadout() {
        let world = World::default();
        assert_eq!(query::phase(&world), GamePhase::Shop);
        assert_eq!(query::upgrade_level(&world, UpgradeTarget::Station), Some(0));
        assert_eq!(
            query::upgrade_level(&world, UpgradeTarget::DefenseOrb(0)),
            Some(0)
        );
        assert_eq!(query::upgrade_level(&world, UpgradeTarget::DefenseOrb(1)), None);
        assert_eq!(query::current_credits(&world), Credits::new(100));
        assert!(query::station_health(&world).is_full());
    }

    #[test]
    fn weapon_kill_credits_the_reward_once() {
        let mut world = World::default();
        let enemy = spawn(&mut world, Vec2::new(8.0, 0.0));
        let reward = Balancing::default().enemies.normal.reward;
        let before = query::current_credits(&world);

        let mut events = Vec::new();
        apply(&mut world, Command::DestroyEnemy { enemy }, &mut events);
        apply(&mut world, Command::DestroyEnemy { enemy }, &mut events);

        assert_eq!(query::current_credits(&world), before.saturating_add(reward));
        assert_eq!(query::kills(&world), 1);
        assert_eq!(query::active_enemy_count(&world), 0);
        assert_eq!(query::exploding_enemy_count(&world), 1);
    }

    #[test]
    fn invulnerable_enemies_survive_weapon_kills() {
        let mut world = World::default();
        let enemy = spawn(&mut world, Vec2::new(8.0, 0.0));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetEnemyDebug {
                enemy,
                frozen: true,
                invulnerable: true,
            },
            &mut events,
        );
        apply(&mut world, Command::DestroyEnemy { enemy }, &mut events);
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );

        let view = query::enemy_view(&world);
        let snapshot = view.iter().next().expect("enemy still active");
        assert_eq!(snapshot.position, Vec2::new(8.0, 0.0));
    }

    #[test]
    fn collision_with_the_core_damages_the_station() {
        let mut world = World::default();
        let _ = spawn(&mut world, Vec2::new(0.5, 0.0));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(10),
            },
            &mut events,
        );

        assert!(events.iter().any(|event| matches!(
            event,
            Event::EnemyCollided {
                element: StationElement::StationHq,
                ..
            }
        )));
        assert!(!query::station_health(&world).is_full());
        assert_eq!(query::active_enemy_count(&world), 0);
    }

    #[test]
    fn rejected_purchase_spends_nothing() {
        let mut world = World::default();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PurchaseUpgrade {
                target: UpgradeTarget::Pulsar(0),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::UpgradeRejected {
                target: UpgradeTarget::Pulsar(0),
                reason: UpgradeError::InsufficientFunds,
            }]
        );
        assert_eq!(query::current_credits(&world), Credits::new(100));
    }

    #[test]
    fn unknown_weapon_slot_is_rejected() {
        let mut world = World::default();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PurchaseUpgrade {
                target: UpgradeTarget::Complexity(42),
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::UpgradeRejected {
                reason: UpgradeError::UnknownElement,
                ..
            }]
        ));
    }

    #[test]
    fn ready_is_only_reported_in_the_shop() {
        let mut world = World::default();
        let mut events = Vec::new();
        apply(&mut world, Command::DeclareReady, &mut events);
        apply(
            &mut world,
            Command::SetPhase {
                phase: GamePhase::Wave,
            },
            &mut events,
        );
        apply(&mut world, Command::DeclareReady, &mut events);

        let readies = events
            .iter()
            .filter(|event| matches!(event, Event::ReadyDeclared))
            .count();
        assert_eq!(readies, 1);
    }

    #[test]
    fn store_credits_moves_the_requested_amount() {
        let mut world = World::default();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::StoreCredits {
                amount: Some(Credits::new(500)),
            },
            &mut events,
        );
        assert!(events.is_empty());

        apply(
            &mut world,
            Command::StoreCredits {
                amount: Some(Credits::new(30)),
            },
            &mut events,
        );
        assert_eq!(query::current_credits(&world), Credits::new(70));
        assert_eq!(query::stored_credits(&world), Credits::new(30));

        apply(&mut world, Command::StoreCredits { amount: None }, &mut events);
        assert_eq!(query::current_credits(&world), Credits::ZERO);
        assert_eq!(query::stored_credits(&world), Credits::new(100));
    }
}
