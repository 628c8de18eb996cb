//! Submission Transaction: commits composed requests concurrently.
//!
//! Every request is committed independently. A rejected device never rolls back
//! its siblings; the report names which devices made it and which did not.

use chrono::NaiveTime;
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{BookingError, StoreError};
use crate::models::{BookingRequest, DeviceUnit, SessionDuration};
use crate::store::BookingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Completed,
    PartiallyFailed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookedDevice {
    pub device: DeviceUnit,
    pub booking_id: String,
    pub request_id: Uuid,
    pub start_time: NaiveTime,
    pub duration: SessionDuration,
    pub price: i64,
    pub bonus_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDevice {
    pub device: DeviceUnit,
    pub start_time: NaiveTime,
    pub duration: SessionDuration,
    pub reason: String,
    pub retryable: bool,
    #[serde(skip)]
    pub error: BookingError,
    #[serde(skip)]
    pub request: BookingRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub outcome: SubmissionOutcome,
    pub booked: Vec<BookedDevice>,
    pub failed: Vec<FailedDevice>,
}

impl SubmissionReport {
    pub fn new(booked: Vec<BookedDevice>, failed: Vec<FailedDevice>) -> Self {
        let outcome = match (booked.is_empty(), failed.is_empty()) {
            (_, true) => SubmissionOutcome::Completed,
            (true, false) => SubmissionOutcome::Failed,
            (false, false) => SubmissionOutcome::PartiallyFailed,
        };
        Self {
            outcome,
            booked,
            failed,
        }
    }

    pub fn booking_ids(&self) -> Vec<&str> {
        self.booked.iter().map(|b| b.booking_id.as_str()).collect()
    }

    pub fn failed_for(&self, device: DeviceUnit) -> Option<&FailedDevice> {
        self.failed.iter().find(|f| f.device == device)
    }

    /// Folds a retry attempt into this report.
    pub fn merge(&self, retry: SubmissionReport) -> SubmissionReport {
        let retried: Vec<DeviceUnit> = retry
            .booked
            .iter()
            .map(|b| b.device)
            .chain(retry.failed.iter().map(|f| f.device))
            .collect();

        let mut booked = self.booked.clone();
        booked.extend(retry.booked);
        let mut failed: Vec<FailedDevice> = self
            .failed
            .iter()
            .filter(|f| !retried.contains(&f.device))
            .cloned()
            .collect();
        failed.extend(retry.failed);
        SubmissionReport::new(booked, failed)
    }
}

fn failure(request: BookingRequest, error: StoreError) -> FailedDevice {
    let device = request.device();
    let error = match error {
        StoreError::Rejected(_) => BookingError::StaleAvailability {
            device,
            start: request.start_time,
            duration: request.duration.minutes(),
        },
        other => BookingError::Transport(other.to_string()),
    };
    FailedDevice {
        device,
        start_time: request.start_time,
        duration: request.duration,
        reason: error.to_string(),
        retryable: error.is_retryable(),
        error,
        request,
    }
}

/// Issues one creation call per request, all at once, and waits for every one.
pub async fn submit_all<S: BookingStore + ?Sized>(
    store: &S,
    requests: Vec<BookingRequest>,
) -> SubmissionReport {
    let calls = requests.iter().map(|r| store.create_booking(r));
    let results = join_all(calls).await;

    let mut booked = Vec::new();
    let mut failed = Vec::new();
    for (request, result) in requests.into_iter().zip(results) {
        match result {
            Ok(booking_id) => {
                tracing::info!(
                    booking_id = %booking_id,
                    device = %request.device(),
                    start = %request.start_time,
                    "Booking committed"
                );
                booked.push(BookedDevice {
                    device: request.device(),
                    booking_id,
                    request_id: request.request_id,
                    start_time: request.start_time,
                    duration: request.duration,
                    price: request.price,
                    bonus_minutes: request.bonus_minutes,
                });
            }
            Err(e) => {
                tracing::warn!(device = %request.device(), error = %e, "Booking not committed");
                failed.push(failure(request, e));
            }
        }
    }

    SubmissionReport::new(booked, failed)
}
