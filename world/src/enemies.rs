//! Enemy agents and the active-enemy registry.

use std::time::Duration;

use glam::Vec2;
use nova_defence_core::{
    Credits, EnemyId, EnemyProfile, EnemySnapshot, EnemyVariant, RingTuning, StationElement,
};

/// Enemy approaching the station along a fixed heading.
#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    pub(crate) id: EnemyId,
    pub(crate) variant: EnemyVariant,
    pub(crate) position: Vec2,
    direction: Vec2,
    pub(crate) speed: f32,
    pub(crate) damage: f32,
    pub(crate) reward: Credits,
    radius: f32,
    pub(crate) frozen: bool,
    pub(crate) invulnerable: bool,
}

impl Enemy {
    fn new(
        id: EnemyId,
        variant: EnemyVariant,
        position: Vec2,
        speed: f32,
        profile: &EnemyProfile,
    ) -> Self {
        Self {
            id,
            variant,
            position,
            direction: (-position).normalize_or_zero(),
            speed: speed.max(0.0),
            damage: profile.damage,
            reward: profile.reward,
            radius: profile.radius,
            frozen: false,
            invulnerable: false,
        }
    }

    /// Distance to the station at the centre.
    pub(crate) fn distance(&self) -> f32 {
        self.position.length()
    }

    /// Accelerates with inverse distance, then moves along the spawn heading.
    pub(crate) fn advance(&mut self, dt: f32, gravity_factor: f32) {
        let distance = self.distance();
        if distance > f32::EPSILON {
            self.speed += gravity_factor.max(0.0) / distance * dt;
        }
        if !self.frozen {
            self.position += self.direction * self.speed * dt;
        }
    }

    /// Ring this enemy currently collides with, most exclusive ring first.
    pub(crate) fn collision(
        &self,
        rings: &RingTuning,
        large_alive: bool,
        small_alive: bool,
    ) -> Option<StationElement> {
        if self.invulnerable {
            return None;
        }

        let distance = self.distance();
        if large_alive && in_band(distance, rings.large_shield, rings.collision_offset) {
            return Some(StationElement::LargeShield);
        }
        if small_alive && in_band(distance, rings.small_shield, rings.collision_offset) {
            return Some(StationElement::SmallShield);
        }
        if distance < rings.station {
            return Some(StationElement::StationHq);
        }
        None
    }

    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            variant: self.variant,
            position: self.position,
            speed: self.speed,
            radius: self.radius,
        }
    }
}

/// Half-open band `[threshold - offset, threshold)` below a shield ring.
pub(crate) fn in_band(distance: f32, threshold: f32, offset: f32) -> bool {
    threshold - offset <= distance && distance < threshold
}

/// Enemy that left the registry and plays its explosion before being dropped.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Explosion {
    pub(crate) id: EnemyId,
    remaining: Duration,
}

/// Owns every enemy. Active enemies are kept in registration order.
#[derive(Debug, Default)]
pub(crate) struct EnemyRegistry {
    active: Vec<Enemy>,
    exploding: Vec<Explosion>,
    next_id: u32,
    spawned_total: u32,
    killed_total: u32,
}

impl EnemyRegistry {
    pub(crate) fn spawn(
        &mut self,
        variant: EnemyVariant,
        position: Vec2,
        speed: f32,
        profile: &EnemyProfile,
    ) -> EnemyId {
        let id = EnemyId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.spawned_total = self.spawned_total.saturating_add(1);
        self.active
            .push(Enemy::new(id, variant, position, speed, profile));
        id
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Enemy> {
        self.active.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.active.iter_mut()
    }

    pub(crate) fn get(&self, id: EnemyId) -> Option<&Enemy> {
        self.active.iter().find(|enemy| enemy.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.active.iter_mut().find(|enemy| enemy.id == id)
    }

    pub(crate) fn active_ids(&self) -> Vec<EnemyId> {
        self.active.iter().map(|enemy| enemy.id).collect()
    }

    pub(crate) fn active_len(&self) -> usize {
        self.active.len()
    }

    pub(crate) fn exploding_len(&self) -> usize {
        self.exploding.len()
    }

    pub(crate) const fn spawned_total(&self) -> u32 {
        self.spawned_total
    }

    pub(crate) const fn killed_total(&self) -> u32 {
        self.killed_total
    }

    /// Removes an enemy from the active registry and starts its explosion.
    ///
    /// Returns `None` when the enemy is already exploding or gone, which makes
    /// repeated kills in the same tick harmless.
    pub(crate) fn explode(&mut self, id: EnemyId, linger: Duration) -> Option<Enemy> {
        let index = self.active.iter().position(|enemy| enemy.id == id)?;
        let enemy = self.active.remove(index);
        self.exploding.push(Explosion {
            id,
            remaining: linger,
        });
        Some(enemy)
    }

    /// Records a weapon kill.
    pub(crate) fn count_kill(&mut self) {
        self.killed_total = self.killed_total.saturating_add(1);
    }

    /// Explodes every active enemy at once.
    pub(crate) fn explode_all(&mut self, linger: Duration) -> Vec<EnemyId> {
        let ids: Vec<EnemyId> = self.active.drain(..).map(|enemy| enemy.id).collect();
        self.exploding.extend(ids.iter().map(|&id| Explosion {
            id,
            remaining: linger,
        }));
        ids
    }

    /// Advances explosion timers and returns the enemies that finished.
    pub(crate) fn tick_explosions(&mut self, dt: Duration) -> Vec<EnemyId> {
        let mut finished = Vec::new();
        self.exploding.retain_mut(|explosion| {
            explosion.remaining = explosion.remaining.saturating_sub(dt);
            if explosion.remaining.is_zero() {
                finished.push(explosion.id);
                false
            } else {
                true
            }
        });
        finished
    }
}
