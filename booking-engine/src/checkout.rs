//! Checkout flow as an explicit state machine.
//!
//! ```text
//! SelectingSchedule -> SelectingEquipment -> ReviewingOrder -> Submitting
//!                                                               |-> Completed
//!                                                               |-> PartiallyFailed -> (retry) Submitting
//!                                                               '-> Failed          -> (retry) Submitting
//! ```
//!
//! Transitions are synchronous and never touch the store. Anything that needs
//! fresh availability takes it as an argument; the guards below decide.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::availability::{DroppedDevice, ValidationReport};
use crate::error::{BookingError, EngineResult};
use crate::models::{CustomerInfo, DeviceUnit, EquipmentSelection, PromoCode, TimeSlot};
use crate::pricing::PriceBreakdown;
use crate::submission::{FailedDevice, SubmissionOutcome, SubmissionReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    SelectingSchedule,
    SelectingEquipment,
    ReviewingOrder,
    Submitting,
    Completed,
    PartiallyFailed,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::SelectingSchedule => "selecting a schedule",
            Phase::SelectingEquipment => "selecting equipment",
            Phase::ReviewingOrder => "reviewing the order",
            Phase::Submitting => "submitting",
            Phase::Completed => "completed",
            Phase::PartiallyFailed => "partially failed",
            Phase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Phase::Completed | Phase::PartiallyFailed | Phase::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schedule {
    pub date: NaiveDate,
    pub slot: TimeSlot,
}

/// Where a submission returns to if it is abandoned before reaching the store.
#[derive(Debug, Clone)]
pub enum Resume {
    Review(PriceBreakdown),
    Report(SubmissionReport),
}

#[derive(Debug, Clone)]
pub enum CheckoutState {
    SelectingSchedule,
    SelectingEquipment {
        schedule: Schedule,
        selection: EquipmentSelection,
    },
    ReviewingOrder {
        schedule: Schedule,
        selection: EquipmentSelection,
        quote: PriceBreakdown,
    },
    Submitting {
        schedule: Schedule,
        selection: EquipmentSelection,
        resume: Resume,
    },
    Finished {
        schedule: Schedule,
        selection: EquipmentSelection,
        report: SubmissionReport,
    },
}

/// Guard: a `full` slot is never selectable.
pub fn guard_slot_selectable(slot: &TimeSlot) -> EngineResult<()> {
    if slot.is_selectable() {
        Ok(())
    } else {
        Err(BookingError::SlotFull(slot.time))
    }
}

/// Guard: at least one device, and a fresh validation of exactly this
/// selection that dropped nothing.
pub fn guard_ready_for_review(
    selection: &EquipmentSelection,
    report: &ValidationReport,
) -> EngineResult<()> {
    if selection.is_empty() {
        return Err(BookingError::NoDeviceSelected);
    }
    if let Some(dropped) = report.dropped.first() {
        return Err(dropped.to_error());
    }
    if report.selection != *selection {
        return Err(BookingError::InvalidTransition {
            phase: Phase::SelectingEquipment.as_str(),
            action: "review an outdated selection",
        });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Checkout {
    id: Uuid,
    state: CheckoutState,
    notices: Vec<DroppedDevice>,
    promo: Option<PromoCode>,
    customer: Option<CustomerInfo>,
}

impl Default for Checkout {
    fn default() -> Self {
        Self::new()
    }
}

impl Checkout {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: CheckoutState::SelectingSchedule,
            notices: Vec::new(),
            promo: None,
            customer: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        match &self.state {
            CheckoutState::SelectingSchedule => Phase::SelectingSchedule,
            CheckoutState::SelectingEquipment { .. } => Phase::SelectingEquipment,
            CheckoutState::ReviewingOrder { .. } => Phase::ReviewingOrder,
            CheckoutState::Submitting { .. } => Phase::Submitting,
            CheckoutState::Finished { report, .. } => match report.outcome {
                SubmissionOutcome::Completed => Phase::Completed,
                SubmissionOutcome::PartiallyFailed => Phase::PartiallyFailed,
                SubmissionOutcome::Failed => Phase::Failed,
            },
        }
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        match &self.state {
            CheckoutState::SelectingSchedule => None,
            CheckoutState::SelectingEquipment { schedule, .. }
            | CheckoutState::ReviewingOrder { schedule, .. }
            | CheckoutState::Submitting { schedule, .. }
            | CheckoutState::Finished { schedule, .. } => Some(schedule),
        }
    }

    pub fn selection(&self) -> Option<&EquipmentSelection> {
        match &self.state {
            CheckoutState::SelectingSchedule => None,
            CheckoutState::SelectingEquipment { selection, .. }
            | CheckoutState::ReviewingOrder { selection, .. }
            | CheckoutState::Submitting { selection, .. }
            | CheckoutState::Finished { selection, .. } => Some(selection),
        }
    }

    pub fn quote(&self) -> Option<&PriceBreakdown> {
        match &self.state {
            CheckoutState::ReviewingOrder { quote, .. } => Some(quote),
            _ => None,
        }
    }

    pub fn report(&self) -> Option<&SubmissionReport> {
        match &self.state {
            CheckoutState::Finished { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Devices removed by the most recent re-resolution, with reasons.
    pub fn notices(&self) -> &[DroppedDevice] {
        &self.notices
    }

    pub fn promo(&self) -> Option<&PromoCode> {
        self.promo.as_ref()
    }

    pub fn customer(&self) -> Option<&CustomerInfo> {
        self.customer.as_ref()
    }

    pub fn set_customer(&mut self, customer: CustomerInfo) {
        self.customer = Some(customer);
    }

    pub fn set_promo(&mut self, promo: Option<PromoCode>) {
        self.promo = promo;
    }

    fn invalid(&self, action: &'static str) -> BookingError {
        BookingError::InvalidTransition {
            phase: self.phase().as_str(),
            action,
        }
    }

    /// SelectingSchedule -> SelectingEquipment. Picking another slot while
    /// selecting equipment starts the selection over.
    pub fn select_slot(&mut self, date: NaiveDate, slot: TimeSlot) -> EngineResult<()> {
        match self.state {
            CheckoutState::SelectingSchedule | CheckoutState::SelectingEquipment { .. } => {}
            _ => return Err(self.invalid("pick a slot")),
        }
        guard_slot_selectable(&slot)?;
        self.notices.clear();
        self.state = CheckoutState::SelectingEquipment {
            schedule: Schedule { date, slot },
            selection: EquipmentSelection::new(),
        };
        Ok(())
    }

    /// Records the outcome of re-resolving a selection edit.
    pub fn apply_equipment(&mut self, report: ValidationReport) -> EngineResult<()> {
        let CheckoutState::SelectingEquipment { schedule, .. } = &self.state else {
            return Err(self.invalid("change equipment"));
        };
        self.state = CheckoutState::SelectingEquipment {
            schedule: schedule.clone(),
            selection: report.selection,
        };
        self.notices = report.dropped;
        Ok(())
    }

    /// SelectingEquipment -> ReviewingOrder.
    pub fn review(&mut self, report: ValidationReport, quote: PriceBreakdown) -> EngineResult<()> {
        let CheckoutState::SelectingEquipment { schedule, selection } = &self.state else {
            return Err(self.invalid("review the order"));
        };
        if let Err(e) = guard_ready_for_review(selection, &report) {
            if !report.dropped.is_empty() {
                self.apply_equipment(report)?;
            }
            return Err(e);
        }
        self.state = CheckoutState::ReviewingOrder {
            schedule: schedule.clone(),
            selection: selection.clone(),
            quote,
        };
        self.notices.clear();
        Ok(())
    }

    /// Steps back one phase before submission.
    pub fn back(&mut self) -> EngineResult<()> {
        self.state = match &self.state {
            CheckoutState::ReviewingOrder {
                schedule, selection, ..
            } => CheckoutState::SelectingEquipment {
                schedule: schedule.clone(),
                selection: selection.clone(),
            },
            CheckoutState::SelectingEquipment { .. } => CheckoutState::SelectingSchedule,
            _ => return Err(self.invalid("go back")),
        };
        Ok(())
    }

    /// ReviewingOrder -> Submitting. While submitting, a second attempt is refused.
    pub fn begin_submit(&mut self) -> EngineResult<(Schedule, EquipmentSelection)> {
        match &self.state {
            CheckoutState::ReviewingOrder {
                schedule,
                selection,
                quote,
            } => {
                let out = (schedule.clone(), selection.clone());
                self.state = CheckoutState::Submitting {
                    schedule: schedule.clone(),
                    selection: selection.clone(),
                    resume: Resume::Review(quote.clone()),
                };
                Ok(out)
            }
            CheckoutState::Submitting { .. } => Err(BookingError::SubmissionInFlight),
            _ => Err(self.invalid("submit")),
        }
    }

    /// Finished (with a failure for `device`) -> Submitting, for that device only.
    pub fn begin_retry(&mut self, device: DeviceUnit) -> EngineResult<(Schedule, FailedDevice)> {
        match &self.state {
            CheckoutState::Finished {
                schedule,
                selection,
                report,
            } => {
                let failed = report
                    .failed_for(device)
                    .cloned()
                    .ok_or(BookingError::NothingToRetry(device))?;
                let schedule = schedule.clone();
                self.state = CheckoutState::Submitting {
                    schedule: schedule.clone(),
                    selection: selection.clone(),
                    resume: Resume::Report(report.clone()),
                };
                Ok((schedule, failed))
            }
            CheckoutState::Submitting { .. } => Err(BookingError::SubmissionInFlight),
            _ => Err(self.invalid("retry")),
        }
    }

    /// Abandons a submission that never reached the store.
    pub fn abort_submit(&mut self) -> EngineResult<()> {
        let CheckoutState::Submitting {
            schedule,
            selection,
            resume,
        } = &self.state
        else {
            return Err(self.invalid("abort a submission"));
        };
        self.state = match resume {
            Resume::Review(quote) => CheckoutState::ReviewingOrder {
                schedule: schedule.clone(),
                selection: selection.clone(),
                quote: quote.clone(),
            },
            Resume::Report(report) => CheckoutState::Finished {
                schedule: schedule.clone(),
                selection: selection.clone(),
                report: report.clone(),
            },
        };
        Ok(())
    }

    /// Submitting -> SelectingEquipment, after the last check before commit
    /// found devices that are no longer available.
    pub fn reopen_equipment(&mut self, report: ValidationReport) -> EngineResult<()> {
        let CheckoutState::Submitting {
            schedule,
            resume: Resume::Review(_),
            ..
        } = &self.state
        else {
            return Err(self.invalid("reopen equipment"));
        };
        self.state = CheckoutState::SelectingEquipment {
            schedule: schedule.clone(),
            selection: report.selection,
        };
        self.notices = report.dropped;
        Ok(())
    }

    /// Submitting -> Completed / PartiallyFailed / Failed.
    pub fn finish(&mut self, report: SubmissionReport) -> EngineResult<&SubmissionReport> {
        let CheckoutState::Submitting {
            schedule,
            selection,
            resume,
        } = &self.state
        else {
            return Err(self.invalid("finish a submission"));
        };
        let report = match resume {
            Resume::Report(previous) => previous.merge(report),
            Resume::Review(_) => report,
        };
        self.state = CheckoutState::Finished {
            schedule: schedule.clone(),
            selection: selection.clone(),
            report,
        };
        self.notices.clear();
        tracing::info!(checkout_id = %self.id, phase = self.phase().as_str(), "Checkout finished");
        match &self.state {
            CheckoutState::Finished { report, .. } => Ok(report),
            _ => Err(self.invalid("finish a submission")),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::availability::DropReason;
    use crate::models::{
        BookingRequest, PlayerCount, Ps5Assignment, Ps5Selection, Ps5Unit, SessionDuration,
        SlotStatus,
    };
    use crate::pricing::PricingEngine;
    use crate::submission::BookedDevice;

    fn slot(status: SlotStatus) -> TimeSlot {
        TimeSlot {
            time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            status,
            total_ps5_players_booked: 0,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 11, 2).unwrap()
    }

    fn unit(n: u8) -> Ps5Unit {
        Ps5Unit::try_from(n).unwrap()
    }

    fn selection() -> EquipmentSelection {
        EquipmentSelection::new().with_ps5(Ps5Selection {
            unit: unit(1),
            players: PlayerCount::try_from(2).unwrap(),
            duration: SessionDuration::try_from(60).unwrap(),
        })
    }

    fn clean(selection: &EquipmentSelection) -> ValidationReport {
        ValidationReport {
            selection: selection.clone(),
            dropped: Vec::new(),
            simulator_start: None,
        }
    }

    fn reviewing() -> Checkout {
        let mut c = Checkout::new();
        c.select_slot(date(), slot(SlotStatus::Partial)).unwrap();
        let sel = selection();
        c.apply_equipment(clean(&sel)).unwrap();
        let quote = PricingEngine::default().price(&sel, None, None);
        c.review(clean(&sel), quote).unwrap();
        c
    }

    fn report(outcome_failed: bool) -> SubmissionReport {
        let device = DeviceUnit::ps5(unit(1));
        let start = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
        let duration = SessionDuration::try_from(60).unwrap();
        if outcome_failed {
            let error = BookingError::StaleAvailability {
                device,
                start,
                duration: 60,
            };
            let request = BookingRequest {
                request_id: Uuid::new_v4(),
                date: date(),
                start_time: start,
                duration,
                ps5_assignments: vec![Ps5Assignment {
                    unit: unit(1),
                    player_count: PlayerCount::try_from(2).unwrap(),
                }],
                driving_sim: false,
                price: 400,
                bonus_minutes: 0,
                promo_code_id: None,
                customer: CustomerInfo {
                    name: "N".into(),
                    phone: "1".into(),
                },
            };
            SubmissionReport::new(
                Vec::new(),
                vec![FailedDevice {
                    device,
                    start_time: start,
                    duration,
                    reason: error.to_string(),
                    retryable: true,
                    error,
                    request,
                }],
            )
        } else {
            SubmissionReport::new(
                vec![BookedDevice {
                    device,
                    booking_id: "bk_1".into(),
                    request_id: Uuid::new_v4(),
                    start_time: start,
                    duration,
                    price: 400,
                    bonus_minutes: 0,
                }],
                Vec::new(),
            )
        }
    }

    #[test]
    fn full_slot_is_rejected_outright() {
        let mut c = Checkout::new();
        let err = c.select_slot(date(), slot(SlotStatus::Full)).unwrap_err();
        assert!(matches!(err, BookingError::SlotFull(_)));
        assert_eq!(c.phase(), Phase::SelectingSchedule);
    }

    #[test]
    fn review_requires_a_device() {
        let mut c = Checkout::new();
        c.select_slot(date(), slot(SlotStatus::Available)).unwrap();
        let empty = EquipmentSelection::new();
        let quote = PricingEngine::default().price(&empty, None, None);
        assert_eq!(
            c.review(clean(&empty), quote),
            Err(BookingError::NoDeviceSelected)
        );
        assert_eq!(c.phase(), Phase::SelectingEquipment);
    }

    #[test]
    fn review_with_dropped_device_stays_and_prunes() {
        let mut c = Checkout::new();
        c.select_slot(date(), slot(SlotStatus::Partial)).unwrap();
        let sel = selection();
        c.apply_equipment(clean(&sel)).unwrap();

        let stale = ValidationReport {
            selection: EquipmentSelection::new(),
            dropped: vec![DroppedDevice {
                device: DeviceUnit::ps5(unit(1)),
                start: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
                duration: SessionDuration::try_from(60).unwrap(),
                reason: DropReason::UnitBooked,
            }],
            simulator_start: None,
        };
        let quote = PricingEngine::default().price(&sel, None, None);
        let err = c.review(stale, quote).unwrap_err();

        assert!(matches!(err, BookingError::StaleAvailability { .. }));
        assert_eq!(c.phase(), Phase::SelectingEquipment);
        assert!(c.selection().unwrap().is_empty());
        assert_eq!(c.notices().len(), 1);
    }

    #[test]
    fn second_submit_is_refused_while_in_flight() {
        let mut c = reviewing();
        assert_eq!(c.phase(), Phase::ReviewingOrder);
        c.begin_submit().unwrap();
        assert_eq!(c.begin_submit().unwrap_err(), BookingError::SubmissionInFlight);
    }

    #[test]
    fn abort_returns_to_review() {
        let mut c = reviewing();
        c.begin_submit().unwrap();
        c.abort_submit().unwrap();
        assert_eq!(c.phase(), Phase::ReviewingOrder);
        assert!(c.quote().is_some());
    }

    #[test]
    fn finish_maps_outcome_to_phase() {
        let mut c = reviewing();
        c.begin_submit().unwrap();
        c.finish(report(false)).unwrap();
        assert_eq!(c.phase(), Phase::Completed);
        assert!(c.phase().is_terminal());

        let mut c = reviewing();
        c.begin_submit().unwrap();
        c.finish(report(true)).unwrap();
        assert_eq!(c.phase(), Phase::Failed);
    }

    #[test]
    fn retry_merges_into_previous_report() {
        let mut c = reviewing();
        c.begin_submit().unwrap();
        c.finish(report(true)).unwrap();

        let (_, failed) = c.begin_retry(DeviceUnit::ps5(unit(1))).unwrap();
        assert_eq!(failed.device, DeviceUnit::ps5(unit(1)));
        assert_eq!(c.phase(), Phase::Submitting);

        c.finish(report(false)).unwrap();
        assert_eq!(c.phase(), Phase::Completed);
        assert!(c.report().unwrap().failed.is_empty());
    }

    #[test]
    fn retry_of_unfailed_device_is_refused() {
        let mut c = reviewing();
        c.begin_submit().unwrap();
        c.finish(report(false)).unwrap();
        assert_eq!(
            c.begin_retry(DeviceUnit::DrivingSimulator).unwrap_err(),
            BookingError::NothingToRetry(DeviceUnit::DrivingSimulator)
        );
    }

    #[test]
    fn back_walks_to_schedule() {
        let mut c = reviewing();
        c.back().unwrap();
        assert_eq!(c.phase(), Phase::SelectingEquipment);
        assert_eq!(c.selection(), Some(&selection()));
        c.back().unwrap();
        assert_eq!(c.phase(), Phase::SelectingSchedule);
        assert!(c.back().is_err());
    }
}
