use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::device::{DeviceUnit, PlayerCount, Ps5Unit, SessionDuration};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

pub fn minute_of_day(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Half-open interval `[start, end)` in minutes from the start of the booking date.
/// `end` may run past midnight; the date stays the booking date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u32,
    pub end: u32,
}

impl Window {
    pub fn new(start: NaiveTime, duration_minutes: u32) -> Self {
        let start = minute_of_day(start);
        Self {
            start,
            end: start + duration_minutes,
        }
    }

    pub fn overlaps(&self, other: &Window) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ps5Assignment {
    pub unit: Ps5Unit,
    pub player_count: PlayerCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceAssignment {
    Ps5 {
        unit: Ps5Unit,
        player_count: PlayerCount,
    },
    DrivingSimulator,
}

impl DeviceAssignment {
    pub fn device(&self) -> DeviceUnit {
        match self {
            DeviceAssignment::Ps5 { unit, .. } => DeviceUnit::ps5(*unit),
            DeviceAssignment::DrivingSimulator => DeviceUnit::DrivingSimulator,
        }
    }

    pub fn players(&self) -> u32 {
        match self {
            DeviceAssignment::Ps5 { player_count, .. } => player_count.get(),
            DeviceAssignment::DrivingSimulator => 0,
        }
    }
}

impl From<Ps5Assignment> for DeviceAssignment {
    fn from(a: Ps5Assignment) -> Self {
        DeviceAssignment::Ps5 {
            unit: a.unit,
            player_count: a.player_count,
        }
    }
}

/// A booking the store has accepted. Durations are kept as raw minutes since
/// redeemed bonus time can stretch a session past the bookable set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingBooking {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
    pub device_assignments: Vec<DeviceAssignment>,
}

impl ExistingBooking {
    pub fn window(&self) -> Window {
        Window::new(self.start_time, self.duration_minutes)
    }

    pub fn overlaps(&self, date: NaiveDate, window: &Window) -> bool {
        self.date == date && self.window().overlaps(window)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub phone: String,
}

/// A fully specified, not yet committed reservation for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub request_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration: SessionDuration,
    pub ps5_assignments: Vec<Ps5Assignment>,
    pub driving_sim: bool,
    /// Final price in whole rupees.
    pub price: i64,
    pub bonus_minutes: u32,
    pub promo_code_id: Option<String>,
    pub customer: CustomerInfo,
}

impl BookingRequest {
    pub fn window(&self) -> Window {
        Window::new(self.start_time, self.duration.minutes())
    }

    /// The device this request reserves. Requests are composed one per device.
    pub fn device(&self) -> DeviceUnit {
        match self.ps5_assignments.first() {
            Some(a) if !self.driving_sim => DeviceUnit::ps5(a.unit),
            _ => DeviceUnit::DrivingSimulator,
        }
    }

    pub fn assignments(&self) -> Vec<DeviceAssignment> {
        let mut out: Vec<DeviceAssignment> =
            self.ps5_assignments.iter().copied().map(Into::into).collect();
        if self.driving_sim {
            out.push(DeviceAssignment::DrivingSimulator);
        }
        out
    }
}
