use serde::{Deserialize, Serialize};

use super::device::{DeviceUnit, PlayerCount, Ps5Unit, SessionDuration};
use crate::error::{BookingError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ps5Selection {
    pub unit: Ps5Unit,
    pub players: PlayerCount,
    pub duration: SessionDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatorSelection {
    pub duration: SessionDuration,
    /// Start once the longest PS5 session in the same selection ends.
    #[serde(default)]
    pub after_ps5: bool,
}

/// The user's pending equipment choice. A value: every edit returns a new selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSelection {
    #[serde(default)]
    ps5: Vec<Ps5Selection>,
    #[serde(default)]
    simulator: Option<SimulatorSelection>,
}

impl EquipmentSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a selection from untrusted parts, rejecting repeated units.
    pub fn from_parts(
        ps5: Vec<Ps5Selection>,
        simulator: Option<SimulatorSelection>,
    ) -> EngineResult<Self> {
        let mut out = Self {
            ps5: Vec::with_capacity(ps5.len()),
            simulator,
        };
        for s in ps5 {
            if out.ps5_for(s.unit).is_some() {
                return Err(BookingError::DuplicateUnit(s.unit.number()));
            }
            out = out.with_ps5(s);
        }
        Ok(out)
    }

    pub fn ps5(&self) -> &[Ps5Selection] {
        &self.ps5
    }

    pub fn simulator(&self) -> Option<&SimulatorSelection> {
        self.simulator.as_ref()
    }

    pub fn ps5_for(&self, unit: Ps5Unit) -> Option<&Ps5Selection> {
        self.ps5.iter().find(|s| s.unit == unit)
    }

    /// Adds the unit, replacing any earlier choice for the same unit.
    pub fn with_ps5(&self, selection: Ps5Selection) -> Self {
        let mut ps5: Vec<Ps5Selection> = self
            .ps5
            .iter()
            .filter(|s| s.unit != selection.unit)
            .copied()
            .collect();
        ps5.push(selection);
        ps5.sort_by_key(|s| s.unit);
        Self {
            ps5,
            simulator: self.simulator,
        }
    }

    pub fn without_ps5(&self, unit: Ps5Unit) -> Self {
        Self {
            ps5: self.ps5.iter().filter(|s| s.unit != unit).copied().collect(),
            simulator: self.simulator,
        }
    }

    pub fn with_simulator(&self, simulator: SimulatorSelection) -> Self {
        Self {
            ps5: self.ps5.clone(),
            simulator: Some(simulator),
        }
    }

    pub fn without_simulator(&self) -> Self {
        Self {
            ps5: self.ps5.clone(),
            simulator: None,
        }
    }

    pub fn without(&self, device: DeviceUnit) -> Self {
        match device {
            DeviceUnit::Ps5 { unit } => self.without_ps5(unit),
            DeviceUnit::DrivingSimulator => self.without_simulator(),
        }
    }

    /// Keeps only the listed devices.
    pub fn retain(&self, devices: &[DeviceUnit]) -> Self {
        Self {
            ps5: self
                .ps5
                .iter()
                .filter(|s| devices.contains(&DeviceUnit::ps5(s.unit)))
                .copied()
                .collect(),
            simulator: self
                .simulator
                .filter(|_| devices.contains(&DeviceUnit::DrivingSimulator)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ps5.is_empty() && self.simulator.is_none()
    }

    pub fn contains(&self, device: DeviceUnit) -> bool {
        match device {
            DeviceUnit::Ps5 { unit } => self.ps5_for(unit).is_some(),
            DeviceUnit::DrivingSimulator => self.simulator.is_some(),
        }
    }

    /// Devices in composition order: PS5 units ascending, then the simulator.
    pub fn devices(&self) -> Vec<DeviceUnit> {
        let mut out: Vec<DeviceUnit> = self.ps5.iter().map(|s| DeviceUnit::ps5(s.unit)).collect();
        if self.simulator.is_some() {
            out.push(DeviceUnit::DrivingSimulator);
        }
        out
    }

    pub fn total_ps5_players(&self) -> u32 {
        self.ps5.iter().map(|s| s.players.get()).sum()
    }

    pub fn longest_ps5(&self) -> Option<SessionDuration> {
        self.ps5.iter().map(|s| s.duration).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ps5(unit: u8, players: u8, minutes: u32) -> Ps5Selection {
        Ps5Selection {
            unit: Ps5Unit::try_from(unit).unwrap(),
            players: PlayerCount::try_from(players).unwrap(),
            duration: SessionDuration::try_from(minutes).unwrap(),
        }
    }

    #[test]
    fn edits_return_new_values() {
        let empty = EquipmentSelection::new();
        let one = empty.with_ps5(ps5(2, 2, 60));
        let two = one.with_ps5(ps5(1, 1, 30));

        assert!(empty.is_empty());
        assert_eq!(one.ps5().len(), 1);
        assert_eq!(
            two.devices(),
            vec![
                DeviceUnit::ps5(Ps5Unit::try_from(1).unwrap()),
                DeviceUnit::ps5(Ps5Unit::try_from(2).unwrap()),
            ]
        );
        assert_eq!(two.total_ps5_players(), 3);
    }

    #[test]
    fn re_adding_a_unit_replaces_it() {
        let sel = EquipmentSelection::new()
            .with_ps5(ps5(1, 1, 30))
            .with_ps5(ps5(1, 4, 120));
        assert_eq!(sel.ps5().len(), 1);
        assert_eq!(sel.longest_ps5().map(|d| d.minutes()), Some(120));
    }

    #[test]
    fn from_parts_rejects_duplicates() {
        let err = EquipmentSelection::from_parts(vec![ps5(3, 1, 30), ps5(3, 2, 60)], None);
        assert_eq!(err, Err(BookingError::DuplicateUnit(3)));
    }

    #[test]
    fn retain_keeps_only_named_devices() {
        let sel = EquipmentSelection::new()
            .with_ps5(ps5(1, 1, 30))
            .with_ps5(ps5(2, 1, 30))
            .with_simulator(SimulatorSelection {
                duration: SessionDuration::MIN,
                after_ps5: false,
            });
        let kept = sel.retain(&[DeviceUnit::DrivingSimulator]);
        assert!(kept.ps5().is_empty());
        assert!(kept.simulator().is_some());
    }
}
