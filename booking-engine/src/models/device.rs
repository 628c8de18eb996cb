use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BookingError;

pub const PS5_UNITS: [Ps5Unit; 3] = [Ps5Unit(1), Ps5Unit(2), Ps5Unit(3)];

/// One of the three physical PS5 consoles. Units are not interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Ps5Unit(u8);

impl Ps5Unit {
    pub fn number(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Ps5Unit {
    type Error = BookingError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1..=3 => Ok(Ps5Unit(n)),
            _ => Err(BookingError::InvalidUnit(n)),
        }
    }
}

impl From<Ps5Unit> for u8 {
    fn from(u: Ps5Unit) -> u8 {
        u.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PlayerCount(u8);

impl PlayerCount {
    pub const MAX: u8 = 4;

    pub fn get(self) -> u32 {
        self.0 as u32
    }
}

impl TryFrom<u8> for PlayerCount {
    type Error = BookingError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        if (1..=Self::MAX).contains(&n) {
            Ok(PlayerCount(n))
        } else {
            Err(BookingError::InvalidPlayerCount(n))
        }
    }
}

impl From<PlayerCount> for u8 {
    fn from(p: PlayerCount) -> u8 {
        p.0
    }
}

/// Session length in minutes, restricted to the bookable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SessionDuration(u32);

impl SessionDuration {
    pub const MIN: SessionDuration = SessionDuration(30);
    pub const ALLOWED: [u32; 4] = [30, 60, 90, 120];

    pub fn minutes(self) -> u32 {
        self.0
    }

    /// Number of 30-minute blocks the session spans.
    pub fn blocks(self) -> u32 {
        self.0 / 30
    }
}

impl Default for SessionDuration {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u32> for SessionDuration {
    type Error = BookingError;

    fn try_from(m: u32) -> Result<Self, Self::Error> {
        if Self::ALLOWED.contains(&m) {
            Ok(SessionDuration(m))
        } else {
            Err(BookingError::InvalidDuration(m))
        }
    }
}

impl From<SessionDuration> for u32 {
    fn from(d: SessionDuration) -> u32 {
        d.0
    }
}

/// A physically distinct, independently schedulable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceUnit {
    Ps5 { unit: Ps5Unit },
    DrivingSimulator,
}

impl DeviceUnit {
    pub fn ps5(unit: Ps5Unit) -> Self {
        DeviceUnit::Ps5 { unit }
    }
}

impl fmt::Display for DeviceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceUnit::Ps5 { unit } => write!(f, "PS5 #{}", unit.number()),
            DeviceUnit::DrivingSimulator => f.write_str("Driving simulator"),
        }
    }
}
