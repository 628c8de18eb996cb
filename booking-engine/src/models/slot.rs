use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Partial,
    Full,
}

/// A point on the day's schedule. Derived per query, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: NaiveTime,
    pub status: SlotStatus,
    pub total_ps5_players_booked: u32,
}

impl TimeSlot {
    pub fn is_selectable(&self) -> bool {
        self.status != SlotStatus::Full
    }
}
