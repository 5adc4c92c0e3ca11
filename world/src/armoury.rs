//! Weapon instances owned by the station.

use std::sync::Arc;

use nova_defence_core::{
    Balancing, BeamStats, Credits, LevelError, MultiShotStats, PulseStats, Upgradable,
    UpgradableLevel, UpgradeTable, WeaponKind, WeaponMount, WeaponProfile, WeaponSlot,
    WeaponSnapshot,
};

/// Level stats that can describe a running weapon.
trait Profiled {
    fn profile(&self) -> WeaponProfile;
}

impl Profiled for MultiShotStats {
    fn profile(&self) -> WeaponProfile {
        WeaponProfile::MultiShot(*self)
    }
}

impl Profiled for BeamStats {
    fn profile(&self) -> WeaponProfile {
        WeaponProfile::Beam(*self)
    }
}

impl Profiled for PulseStats {
    fn profile(&self) -> WeaponProfile {
        WeaponProfile::Pulse(*self)
    }
}

/// A single weapon at a fixed mount. Inactive until its first level is bought.
#[derive(Clone, Debug)]
struct Weapon<S> {
    slot: WeaponSlot,
    mount: WeaponMount,
    level: UpgradableLevel<S>,
}

impl<S: Profiled> Weapon<S> {
    fn new(slot: WeaponSlot, mount: WeaponMount, table: Arc<UpgradeTable<S>>) -> Self {
        Self {
            slot,
            mount,
            level: UpgradableLevel::new(table),
        }
    }

    fn snapshot(&self) -> WeaponSnapshot {
        WeaponSnapshot {
            slot: self.slot,
            mount: self.mount,
            profile: self.level.stats().map(Profiled::profile),
        }
    }
}

impl<S> Upgradable for Weapon<S> {
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
        self.level.increase_level().map(|step| step.level)
    }
}

/// Every weapon instance, grouped by family in mount order.
#[derive(Debug)]
pub(crate) struct Armoury {
    orbs: Vec<Weapon<MultiShotStats>>,
    beams: Vec<Weapon<BeamStats>>,
    pulsars: Vec<Weapon<PulseStats>>,
}

impl Armoury {
    pub(crate) fn new(balancing: &Balancing) -> Self {
        let orb_table = Arc::new(balancing.defense_orb.clone());
        let beam_table = Arc::new(balancing.complexity.clone());
        let pulse_table = Arc::new(balancing.pulsar.clone());

        let orbs = (0u32..)
            .zip(&balancing.mounts.defense_orbs)
            .map(|(index, &position)| {
                Weapon::new(
                    WeaponSlot::new(WeaponKind::DefenseOrb, index),
                    WeaponMount::Orb { position },
                    Arc::clone(&orb_table),
                )
            })
            .collect();
        let beams = (0u32..)
            .zip(&balancing.mounts.complexities)
            .map(|(index, mount)| {
                Weapon::new(
                    WeaponSlot::new(WeaponKind::Complexity, index),
                    WeaponMount::Beam {
                        origin: mount.origin,
                        target: mount.target,
                    },
                    Arc::clone(&beam_table),
                )
            })
            .collect();
        let pulsars = (0u32..)
            .zip(&balancing.mounts.pulsars)
            .map(|(index, &center)| {
                Weapon::new(
                    WeaponSlot::new(WeaponKind::Pulsar, index),
                    WeaponMount::Pulse { center },
                    Arc::clone(&pulse_table),
                )
            })
            .collect();

        Self {
            orbs,
            beams,
            pulsars,
        }
    }

    /// Weapon addressed by `slot` as an upgradable element.
    pub(crate) fn get_mut(&mut self, slot: WeaponSlot) -> Option<&mut dyn Upgradable> {
        let index = usize::try_from(slot.index()).ok()?;
        match slot.kind() {
            WeaponKind::DefenseOrb => self
                .orbs
                .get_mut(index)
                .map(|weapon| weapon as &mut dyn Upgradable),
            WeaponKind::Complexity => self
                .beams
                .get_mut(index)
                .map(|weapon| weapon as &mut dyn Upgradable),
            WeaponKind::Pulsar => self
                .pulsars
                .get_mut(index)
                .map(|weapon| weapon as &mut dyn Upgradable),
        }
    }

    /// Read-only access to the weapon addressed by `slot`.
    pub(crate) fn get(&self, slot: WeaponSlot) -> Option<&dyn Upgradable> {
        let index = usize::try_from(slot.index()).ok()?;
        match slot.kind() {
            WeaponKind::DefenseOrb => self
                .orbs
                .get(index)
                .map(|weapon| weapon as &dyn Upgradable),
            WeaponKind::Complexity => self
                .beams
                .get(index)
                .map(|weapon| weapon as &dyn Upgradable),
            WeaponKind::Pulsar => self
                .pulsars
                .get(index)
                .map(|weapon| weapon as &dyn Upgradable),
        }
    }

    /// Snapshots of every weapon instance.
    pub(crate) fn snapshots(&self) -> Vec<WeaponSnapshot> {
        self.orbs
            .iter()
            .map(Weapon::snapshot)
            .chain(self.beams.iter().map(Weapon::snapshot))
            .chain(self.pulsars.iter().map(Weapon::snapshot))
            .collect()
    }
}
