use chrono::NaiveTime;

use crate::models::DeviceUnit;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid PS5 unit: {0} (expected 1-3)")]
    InvalidUnit(u8),

    #[error("Invalid player count: {0} (expected 1-4)")]
    InvalidPlayerCount(u8),

    #[error("Invalid duration: {0} minutes (expected 30, 60, 90 or 120)")]
    InvalidDuration(u32),

    #[error("PS5 #{0} is selected more than once")]
    DuplicateUnit(u8),

    #[error("Slot {0} is fully booked")]
    SlotFull(NaiveTime),

    #[error("Slot {0} is not on the schedule")]
    UnknownSlot(NaiveTime),

    #[error("No device selected")]
    NoDeviceSelected,

    #[error("{device} is no longer free at {start} for {duration} minutes")]
    StaleAvailability {
        device: DeviceUnit,
        start: NaiveTime,
        duration: u32,
    },

    #[error("Capacity exceeded at {start}: {booked} players booked, {requested} requested, limit {limit}")]
    CapacityExceeded {
        start: NaiveTime,
        booked: u32,
        requested: u32,
        limit: u32,
    },

    #[error("Driving simulator would start at {0}, after closing of the booking day")]
    CrossesMidnight(NaiveTime),

    #[error("Invalid promo code: {0}")]
    InvalidPromoCode(String),

    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        action: &'static str,
    },

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("{0} has nothing to retry")]
    NothingToRetry(DeviceUnit),

    #[error("Booking store unavailable: {0}")]
    Transport(String),
}

impl BookingError {
    /// The device the error is about, if it names one.
    pub fn device(&self) -> Option<DeviceUnit> {
        match self {
            BookingError::StaleAvailability { device, .. } => Some(*device),
            BookingError::NothingToRetry(device) => Some(*device),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BookingError::StaleAvailability { .. } | BookingError::Transport(_)
        )
    }
}

/// Errors returned by a Booking Store implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Rejected by booking store: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport failure: {0}")]
    Transport(String),
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        BookingError::Transport(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, BookingError>;
pub type StoreResult<T> = Result<T, StoreError>;
