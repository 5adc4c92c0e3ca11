#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that runs the fire cycle of every purchased weapon and emits
//! kill commands for the enemies it hits.

use std::{collections::BTreeMap, time::Duration};

use nova_defence_core::{
    BeamStats, Command, EnemyId, EnemyView, Event, GamePhase, MultiShotStats, RegionQuery,
    WeaponMount, WeaponProfile, WeaponSlot, WeaponView,
};
use tracing::debug;

/// Observable stage of a weapon's fire cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CycleState {
    /// Not purchased.
    Inactive,
    /// Ready to start a cycle.
    Idle,
    /// Mid-cycle: shots pending or beam lit.
    Firing,
    /// Waiting out the recharge.
    Recharging,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum FireCycle {
    Idle,
    MultiShot {
        shots_left: u32,
        delay: Duration,
        stats: MultiShotStats,
    },
    Beam {
        remaining: Duration,
        stats: BeamStats,
    },
    Recharging {
        remaining: Duration,
    },
}

impl FireCycle {
    fn state(&self) -> CycleState {
        match self {
            Self::Idle => CycleState::Idle,
            Self::MultiShot { .. } | Self::Beam { .. } => CycleState::Firing,
            Self::Recharging { .. } => CycleState::Recharging,
        }
    }
}

/// Weapon system that keeps one resumable fire cycle per weapon instance.
#[derive(Debug, Default)]
pub struct Armament {
    shot_delay: Duration,
    cycles: BTreeMap<WeaponSlot, FireCycle>,
    targeted: Vec<EnemyId>,
}

impl Armament {
    /// Creates the system with the delay between two lasers of one charge.
    #[must_use]
    pub fn new(shot_delay: Duration) -> Self {
        Self {
            shot_delay,
            ..Self::default()
        }
    }

    /// Current stage of the weapon in `slot`.
    #[must_use]
    pub fn state(&self, slot: WeaponSlot) -> CycleState {
        self.cycles
            .get(&slot)
            .map_or(CycleState::Inactive, FireCycle::state)
    }

    /// Advances every fire cycle and emits `Command::DestroyEnemy` for hits.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: GamePhase,
        weapons: &WeaponView,
        enemies: &EnemyView,
        out: &mut Vec<Command>,
    ) {
        if phase.is_terminal() {
            self.cycles.clear();
            return;
        }

        let dt = events
            .iter()
            .filter_map(|event| match event {
                Event::TimeAdvanced { dt } => Some(*dt),
                _ => None,
            })
            .fold(Duration::ZERO, Duration::saturating_add);
        if dt.is_zero() {
            return;
        }

        self.targeted.clear();
        for weapon in weapons.iter() {
            let Some(profile) = weapon.profile else {
                let _ = self.cycles.remove(&weapon.slot);
                continue;
            };
            let online = !weapon.slot.kind().requires_wave_phase() || phase == GamePhase::Wave;
            let cycle = self.cycles.entry(weapon.slot).or_insert(FireCycle::Idle);
            let next = advance(
                *cycle,
                Shot {
                    dt,
                    online,
                    shot_delay: self.shot_delay,
                    profile,
                    mount: weapon.mount,
                    enemies,
                },
                &mut self.targeted,
                out,
            );
            if next.state() == CycleState::Firing && cycle.state() != CycleState::Firing {
                debug!(slot = ?weapon.slot, "fire cycle started");
            }
            *cycle = next;
        }
    }
}

struct Shot<'a> {
    dt: Duration,
    online: bool,
    shot_delay: Duration,
    profile: WeaponProfile,
    mount: WeaponMount,
    enemies: &'a EnemyView,
}

fn advance(
    cycle: FireCycle,
    shot: Shot<'_>,
    targeted: &mut Vec<EnemyId>,
    out: &mut Vec<Command>,
) -> FireCycle {
    match cycle {
        FireCycle::Idle if !shot.online => FireCycle::Idle,
        FireCycle::Idle => start(&shot, targeted, out),
        FireCycle::MultiShot {
            shots_left,
            delay,
            stats,
        } => multi_shot(shots_left, delay.saturating_sub(shot.dt), stats, &shot, targeted, out),
        FireCycle::Beam { remaining, stats } => {
            let remaining = remaining.saturating_sub(shot.dt);
            if remaining.is_zero() {
                return FireCycle::Recharging {
                    remaining: stats.recharge(),
                };
            }
            if shot.online {
                sweep(&shot, targeted, out);
            }
            FireCycle::Beam { remaining, stats }
        }
        FireCycle::Recharging { remaining } => {
            let remaining = remaining.saturating_sub(shot.dt);
            if remaining.is_zero() {
                FireCycle::Idle
            } else {
                FireCycle::Recharging { remaining }
            }
        }
    }
}

fn start(shot: &Shot<'_>, targeted: &mut Vec<EnemyId>, out: &mut Vec<Command>) -> FireCycle {
    match shot.profile {
        WeaponProfile::MultiShot(stats) => multi_shot(
            stats.shots_per_charge,
            Duration::ZERO,
            stats,
            shot,
            targeted,
            out,
        ),
        WeaponProfile::Beam(stats) => {
            sweep(shot, targeted, out);
            FireCycle::Beam {
                remaining: stats.beam_duration(),
                stats,
            }
        }
        WeaponProfile::Pulse(stats) => {
            if let WeaponMount::Pulse { center } = shot.mount {
                let hits = shot.enemies.enemies_in_circle(center, stats.blast_radius);
                destroy_all(hits, targeted, out);
            }
            FireCycle::Recharging {
                remaining: stats.recharge(),
            }
        }
    }
}

/// Fires every shot whose delay has elapsed. A shot that finds no target
/// ends the charge early.
fn multi_shot(
    mut shots_left: u32,
    mut delay: Duration,
    stats: MultiShotStats,
    shot: &Shot<'_>,
    targeted: &mut Vec<EnemyId>,
    out: &mut Vec<Command>,
) -> FireCycle {
    while delay.is_zero() && shots_left > 0 {
        match shot.enemies.oldest_excluding(targeted) {
            Some(enemy) => {
                out.push(Command::DestroyEnemy { enemy });
                targeted.push(enemy);
                shots_left -= 1;
                delay = shot.shot_delay;
            }
            None => shots_left = 0,
        }
    }

    if shots_left == 0 && delay.is_zero() {
        FireCycle::Recharging {
            remaining: stats.recharge(),
        }
    } else {
        FireCycle::MultiShot {
            shots_left,
            delay,
            stats,
        }
    }
}

fn sweep(shot: &Shot<'_>, targeted: &mut Vec<EnemyId>, out: &mut Vec<Command>) {
    if let WeaponMount::Beam { origin, target } = shot.mount {
        let hits = shot.enemies.enemies_in_line(origin, target);
        destroy_all(hits, targeted, out);
    }
}

fn destroy_all(hits: Vec<EnemyId>, targeted: &mut Vec<EnemyId>, out: &mut Vec<Command>) {
    for enemy in hits {
        if targeted.contains(&enemy) {
            continue;
        }
        out.push(Command::DestroyEnemy { enemy });
        targeted.push(enemy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use nova_defence_core::{EnemySnapshot, EnemyVariant, PulseStats, WeaponKind, WeaponSnapshot};

    fn enemy(id: u32, position: Vec2) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            variant: EnemyVariant::Normal,
            position,
            speed: 1.0,
            radius: 0.2,
        }
    }

    fn tick(ms: u64) -> [Event; 1] {
        [Event::TimeAdvanced {
            dt: Duration::from_millis(ms),
        }]
    }

    fn orb(shots: u32) -> WeaponView {
        WeaponView::from_snapshots(vec![WeaponSnapshot {
            slot: WeaponSlot::new(WeaponKind::DefenseOrb, 0),
            mount: WeaponMount::Orb {
                position: Vec2::ZERO,
            },
            profile: Some(WeaponProfile::MultiShot(MultiShotStats {
                recharge_secs: 2.0,
                shots_per_charge: shots,
            })),
        }])
    }

    #[test]
    fn multi_shot_skips_missing_targets_then_recharges() {
        let slot = WeaponSlot::new(WeaponKind::DefenseOrb, 0);
        let mut system = Armament::new(Duration::from_millis(150));
        let weapons = orb(3);
        let lone = EnemyView::from_snapshots(vec![enemy(4, Vec2::new(5.0, 0.0))]);
        let mut out = Vec::new();

        system.handle(&tick(100), GamePhase::Wave, &weapons, &lone, &mut out);
        assert_eq!(
            out,
            vec![Command::DestroyEnemy {
                enemy: EnemyId::new(4)
            }]
        );
        assert_eq!(system.state(slot), CycleState::Firing);

        out.clear();
        let empty = EnemyView::default();
        system.handle(&tick(200), GamePhase::Wave, &weapons, &empty, &mut out);
        assert!(out.is_empty());
        assert_eq!(system.state(slot), CycleState::Recharging);

        system.handle(&tick(1_900), GamePhase::Wave, &weapons, &lone, &mut out);
        assert_eq!(system.state(slot), CycleState::Recharging);
        system.handle(&tick(100), GamePhase::Wave, &weapons, &lone, &mut out);
        assert_eq!(system.state(slot), CycleState::Idle);
        assert!(out.is_empty());

        system.handle(&tick(16), GamePhase::Wave, &weapons, &lone, &mut out);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn multi_shot_picks_distinct_oldest_targets() {
        let mut system = Armament::new(Duration::ZERO);
        let enemies = EnemyView::from_snapshots(vec![
            enemy(9, Vec2::new(3.0, 0.0)),
            enemy(2, Vec2::new(9.0, 0.0)),
            enemy(5, Vec2::new(6.0, 0.0)),
        ]);
        let mut out = Vec::new();
        system.handle(&tick(16), GamePhase::Shop, &orb(2), &enemies, &mut out);

        assert_eq!(
            out,
            vec![
                Command::DestroyEnemy {
                    enemy: EnemyId::new(2)
                },
                Command::DestroyEnemy {
                    enemy: EnemyId::new(5)
                },
            ]
        );
    }

    #[test]
    fn beam_only_fires_during_the_wave() {
        let slot = WeaponSlot::new(WeaponKind::Complexity, 0);
        let weapons = WeaponView::from_snapshots(vec![WeaponSnapshot {
            slot,
            mount: WeaponMount::Beam {
                origin: Vec2::ZERO,
                target: Vec2::new(10.0, 0.0),
            },
            profile: Some(WeaponProfile::Beam(BeamStats {
                recharge_secs: 3.0,
                beam_duration_secs: 1.0,
            })),
        }]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy(1, Vec2::new(4.0, 0.1)),
            enemy(2, Vec2::new(7.0, -0.1)),
            enemy(3, Vec2::new(5.0, 3.0)),
        ]);
        let mut out = Vec::new();

        system_idle_in_shop(&weapons, &enemies, slot);

        let mut system = Armament::new(Duration::ZERO);
        system.handle(&tick(16), GamePhase::Wave, &weapons, &enemies, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(system.state(slot), CycleState::Firing);

        system.handle(&tick(1_000), GamePhase::Wave, &weapons, &enemies, &mut out);
        assert_eq!(system.state(slot), CycleState::Recharging);
    }

    fn system_idle_in_shop(weapons: &WeaponView, enemies: &EnemyView, slot: WeaponSlot) {
        let mut system = Armament::new(Duration::ZERO);
        let mut out = Vec::new();
        system.handle(&tick(16), GamePhase::Shop, weapons, enemies, &mut out);
        assert!(out.is_empty());
        assert_eq!(system.state(slot), CycleState::Idle);
    }

    #[test]
    fn pulse_clears_its_circle_once_per_charge() {
        let slot = WeaponSlot::new(WeaponKind::Pulsar, 0);
        let weapons = WeaponView::from_snapshots(vec![WeaponSnapshot {
            slot,
            mount: WeaponMount::Pulse {
                center: Vec2::new(0.0, 2.0),
            },
            profile: Some(WeaponProfile::Pulse(PulseStats {
                recharge_secs: 4.0,
                blast_radius: 1.0,
            })),
        }]);
        let enemies = EnemyView::from_snapshots(vec![
            enemy(1, Vec2::new(0.0, 2.5)),
            enemy(2, Vec2::new(0.5, 1.5)),
            enemy(3, Vec2::new(0.0, -2.0)),
        ]);
        let mut system = Armament::new(Duration::ZERO);
        let mut out = Vec::new();

        system.handle(&tick(16), GamePhase::Wave, &weapons, &enemies, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(system.state(slot), CycleState::Recharging);

        out.clear();
        system.handle(&tick(16), GamePhase::Wave, &weapons, &enemies, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn pulse_keeps_cycling_outside_the_wave() {
        let slot = WeaponSlot::new(WeaponKind::Pulsar, 1);
        let weapons = WeaponView::from_snapshots(vec![WeaponSnapshot {
            slot,
            mount: WeaponMount::Pulse {
                center: Vec2::new(0.0, -2.5),
            },
            profile: Some(WeaponProfile::Pulse(PulseStats {
                recharge_secs: 2.0,
                blast_radius: 1.5,
            })),
        }]);
        let enemies = EnemyView::from_snapshots(vec![enemy(4, Vec2::new(0.3, -2.5))]);
        let mut system = Armament::new(Duration::ZERO);
        let mut out = Vec::new();

        system.handle(&tick(16), GamePhase::Shop, &weapons, &enemies, &mut out);
        assert_eq!(
            out,
            vec![Command::DestroyEnemy {
                enemy: EnemyId::new(4)
            }]
        );
        assert_eq!(system.state(slot), CycleState::Recharging);

        out.clear();
        system.handle(&tick(2_000), GamePhase::Shop, &weapons, &enemies, &mut out);
        assert_eq!(system.state(slot), CycleState::Idle);
    }

    #[test]
    fn in_flight_cycle_keeps_its_stats_after_an_upgrade() {
        let slot = WeaponSlot::new(WeaponKind::DefenseOrb, 0);
        let mut system = Armament::new(Duration::from_secs(1));
        let enemies = EnemyView::from_snapshots(vec![
            enemy(1, Vec2::new(5.0, 0.0)),
            enemy(2, Vec2::new(6.0, 0.0)),
            enemy(3, Vec2::new(7.0, 0.0)),
        ]);
        let mut out = Vec::new();
        system.handle(&tick(16), GamePhase::Wave, &orb(1), &enemies, &mut out);
        assert_eq!(out.len(), 1);

        out.clear();
        system.handle(&tick(1_000), GamePhase::Wave, &orb(3), &enemies, &mut out);
        assert!(out.is_empty());
        assert_eq!(system.state(slot), CycleState::Recharging);
    }

    #[test]
    fn dead_phase_silences_everything() {
        let mut system = Armament::new(Duration::ZERO);
        let enemies = EnemyView::from_snapshots(vec![enemy(1, Vec2::new(5.0, 0.0))]);
        let mut out = Vec::new();
        system.handle(&tick(16), GamePhase::Dead, &orb(3), &enemies, &mut out);
        assert!(out.is_empty());
        assert_eq!(
            system.state(WeaponSlot::new(WeaponKind::DefenseOrb, 0)),
            CycleState::Inactive
        );
    }
}
