use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::{minute_of_day, SessionDuration};

pub const DEFAULT_MAX_PS5_PLAYERS: u32 = 10;

/// Prices in whole rupees per 30-minute block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateCard {
    pub ps5_per_player: u32,
    pub simulator: u32,
}

impl Default for RateCard {
    fn default() -> Self {
        Self {
            ps5_per_player: 100,
            simulator: 150,
        }
    }
}

/// The fixed grid of bookable start times for a day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotGrid {
    pub opening: NaiveTime,
    pub closing: NaiveTime,
    pub step_minutes: u32,
}

impl Default for SlotGrid {
    fn default() -> Self {
        Self {
            opening: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN),
            closing: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            step_minutes: 30,
        }
    }
}

impl SlotGrid {
    /// Every start time from opening that leaves room for a minimum-length session.
    pub fn points(&self) -> Vec<NaiveTime> {
        let open = minute_of_day(self.opening);
        let close = minute_of_day(self.closing);
        let step = self.step_minutes.max(1);
        let last_start = close.saturating_sub(SessionDuration::MIN.minutes());

        let mut out = Vec::new();
        let mut m = open;
        while close > open && m <= last_start {
            if let Some(t) = NaiveTime::from_hms_opt(m / 60, m % 60, 0) {
                out.push(t);
            }
            m += step;
        }
        out
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.points().contains(&time)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub rates: RateCard,
    pub grid: SlotGrid,
    pub max_ps5_players: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rates: RateCard::default(),
            grid: SlotGrid::default(),
            max_ps5_players: DEFAULT_MAX_PS5_PLAYERS,
        }
    }
}
