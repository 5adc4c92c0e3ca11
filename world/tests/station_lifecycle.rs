use std::time::Duration;

use glam::Vec2;
use nova_defence_core::{
    Balancing, Command, Credits, EnemyVariant, Event, ExplosionCause, GamePhase, ShieldRing,
    StationElement, UpgradeError, UpgradeTarget,
};
use nova_defence_world::{self as world, query, ShieldStatus, World};

fn tick(world: &mut World, dt: Duration) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt }, &mut events);
    events
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

#[test]
fn purchase_debits_exactly_and_second_purchase_fails_cleanly() {
    let mut balancing = Balancing::default();
    balancing.free_defense_orbs = 0;
    balancing.defense_orb.prices = vec![Credits::new(80), Credits::new(50)];
    let mut world = World::new(&balancing);

    let events = run(
        &mut world,
        Command::PurchaseUpgrade {
            target: UpgradeTarget::DefenseOrb(0),
        },
    );
    assert!(matches!(
        events.first(),
        Some(Event::UpgradePurchased { level: 0, .. })
    ));
    assert_eq!(query::current_credits(&world), Credits::new(20));
    assert_eq!(
        query::upgrade_level(&world, UpgradeTarget::DefenseOrb(0)),
        Some(0)
    );

    let events = run(
        &mut world,
        Command::PurchaseUpgrade {
            target: UpgradeTarget::DefenseOrb(0),
        },
    );
    assert_eq!(
        events,
        vec![Event::UpgradeRejected {
            target: UpgradeTarget::DefenseOrb(0),
            reason: UpgradeError::InsufficientFunds,
        }]
    );
    assert_eq!(query::current_credits(&world), Credits::new(20));
    assert_eq!(
        query::upgrade_level(&world, UpgradeTarget::DefenseOrb(0)),
        Some(0)
    );
}

#[test]
fn depleted_shield_returns_after_its_cooldown() {
    let mut world = World::default();
    let _ = run(
        &mut world,
        Command::PurchaseUpgrade {
            target: UpgradeTarget::SmallShield,
        },
    );
    assert_eq!(
        query::shield_status(&world, ShieldRing::Small),
        ShieldStatus::Alive
    );
    assert_eq!(query::shield_health(&world, ShieldRing::Small).max(), 50.0);

    let events = run(
        &mut world,
        Command::HandleCollision {
            element: StationElement::SmallShield,
            damage: 60.0,
        },
    );
    assert_eq!(
        events,
        vec![Event::ShieldDepleted {
            ring: ShieldRing::Small
        }]
    );
    assert_eq!(query::shield_health(&world, ShieldRing::Small).current(), 0.0);
    assert_eq!(
        query::shield_status(&world, ShieldRing::Small),
        ShieldStatus::Recharging
    );

    let cooldown = Balancing::default().small_shield.levels[0].cooldown();
    let mut elapsed = Duration::ZERO;
    while elapsed < cooldown {
        let _ = tick(&mut world, Duration::from_millis(500));
        elapsed += Duration::from_millis(500);
    }

    assert_eq!(
        query::shield_status(&world, ShieldRing::Small),
        ShieldStatus::Alive
    );
    assert_eq!(query::shield_health(&world, ShieldRing::Small).current(), 50.0);
}

#[test]
fn station_destruction_is_terminal_and_ends_the_session() {
    let mut world = World::default();
    let far = run(
        &mut world,
        Command::SpawnEnemy {
            position: Vec2::new(10.0, 0.0),
            variant: EnemyVariant::Normal,
            speed: 0.1,
        },
    );
    assert_eq!(far.len(), 1);

    let events = run(
        &mut world,
        Command::HandleCollision {
            element: StationElement::StationHq,
            damage: 1_000.0,
        },
    );
    assert!(events.contains(&Event::StationDamaged { health: 0.0 }));
    assert!(events.contains(&Event::StationDestroyed));
    assert!(events.contains(&Event::PhaseChanged {
        phase: GamePhase::Dead
    }));
    assert!(query::is_station_exploding(&world));
    assert_eq!(query::phase(&world), GamePhase::Dead);

    let repeat = run(
        &mut world,
        Command::HandleCollision {
            element: StationElement::StationHq,
            damage: 10.0,
        },
    );
    assert!(repeat.is_empty());
    assert!(!query::station_health(&world).is_alive());

    let rejected = run(
        &mut world,
        Command::PurchaseUpgrade {
            target: UpgradeTarget::Station,
        },
    );
    assert!(matches!(
        rejected.as_slice(),
        [Event::UpgradeRejected {
            reason: UpgradeError::SessionOver,
            ..
        }]
    ));
    assert_eq!(
        run(
            &mut world,
            Command::SetPhase {
                phase: GamePhase::Shop
            }
        ),
        vec![Event::PhaseChangeRejected {
            requested: GamePhase::Shop
        }]
    );

    let mut all = Vec::new();
    for _ in 0..200 {
        all.extend(tick(&mut world, Duration::from_millis(50)));
        if query::session_ended(&world) {
            break;
        }
    }

    assert!(query::session_ended(&world));
    assert!(query::is_nova(&world));
    assert_eq!(query::active_enemy_count(&world), 0);
    assert!(all.contains(&Event::NovaTriggered));
    assert!(all.iter().any(|event| matches!(
        event,
        Event::EnemyExploding {
            cause: ExplosionCause::Nova,
            ..
        }
    )));
    let impulses = all
        .iter()
        .filter(|event| matches!(event, Event::CameraImpulse { .. }))
        .count();
    assert_eq!(
        impulses + 1,
        Balancing::default().explosion.impulse_count as usize
    );
    assert_eq!(query::phase(&world), GamePhase::Dead);
}

#[test]
fn shields_go_down_with_the_station() {
    let mut world = World::default();
    let _ = run(
        &mut world,
        Command::PurchaseUpgrade {
            target: UpgradeTarget::LargeShield,
        },
    );
    let _ = run(
        &mut world,
        Command::HandleCollision {
            element: StationElement::StationHq,
            damage: 1_000.0,
        },
    );
    assert_eq!(
        query::shield_status(&world, ShieldRing::Large),
        ShieldStatus::Down
    );
    assert_eq!(
        query::shield_status(&world, ShieldRing::Small),
        ShieldStatus::Unpurchased
    );
}

#[test]
fn repairs_cost_more_each_time() {
    let mut world = World::default();
    let full = run(&mut world, Command::RepairStation);
    assert!(matches!(
        full.as_slice(),
        [Event::RepairRejected { .. }]
    ));

    let _ = run(
        &mut world,
        Command::HandleCollision {
            element: StationElement::StationHq,
            damage: 60.0,
        },
    );
    let first_price = query::repair_price(&world);
    let events = run(&mut world, Command::RepairStation);
    assert!(matches!(events.first(), Some(Event::StationRepaired { .. })));
    assert!(query::repair_price(&world) > first_price);
    assert_eq!(
        query::current_credits(&world),
        Credits::new(100 - first_price.get())
    );
}

#[test]
fn shop_recharge_tops_up_damaged_shields() {
    let mut world = World::default();
    let _ = run(
        &mut world,
        Command::PurchaseUpgrade {
            target: UpgradeTarget::SmallShield,
        },
    );
    let _ = run(
        &mut world,
        Command::HandleCollision {
            element: StationElement::SmallShield,
            damage: 20.0,
        },
    );
    let _ = run(&mut world, Command::RechargeShields);
    assert!(query::shield_health(&world, ShieldRing::Small).is_full());
}
