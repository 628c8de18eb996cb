//! Availability Resolver: answers "what is free, right now, for this window".

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, EngineResult};
use crate::models::{
    minute_of_day, DeviceAssignment, DeviceUnit, EquipmentSelection, ExistingBooking, Ps5Unit,
    SessionDuration, Window, MINUTES_PER_DAY, PS5_UNITS,
};
use crate::store::BookingStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub free_ps5_units: BTreeSet<Ps5Unit>,
    pub total_players_booked: u32,
    pub driving_sim_free: bool,
}

impl Availability {
    /// Folds every booking on `date` that overlaps `window`.
    pub fn from_bookings(bookings: &[ExistingBooking], date: NaiveDate, window: &Window) -> Self {
        let mut free_ps5_units: BTreeSet<Ps5Unit> = PS5_UNITS.into_iter().collect();
        let mut total_players_booked = 0;
        let mut driving_sim_free = true;

        for booking in bookings.iter().filter(|b| b.overlaps(date, window)) {
            for assignment in &booking.device_assignments {
                match assignment {
                    DeviceAssignment::Ps5 { unit, player_count } => {
                        free_ps5_units.remove(unit);
                        total_players_booked += player_count.get();
                    }
                    DeviceAssignment::DrivingSimulator => driving_sim_free = false,
                }
            }
        }

        Self {
            free_ps5_units,
            total_players_booked,
            driving_sim_free,
        }
    }

    pub fn is_free(&self, device: DeviceUnit) -> bool {
        match device {
            DeviceUnit::Ps5 { unit } => self.free_ps5_units.contains(&unit),
            DeviceUnit::DrivingSimulator => self.driving_sim_free,
        }
    }

    /// Whether `players` more can join without crossing `limit`.
    pub fn admits_players(&self, players: u32, limit: u32) -> bool {
        self.total_players_booked + players <= limit
    }
}

/// Start time of a simulator session sequenced after the PS5 sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedStart {
    pub time: NaiveTime,
    /// The start wrapped past midnight into the next date.
    pub next_day: bool,
}

pub fn sequenced_start(start: NaiveTime, after: Option<SessionDuration>) -> SequencedStart {
    let offset = after.map(|d| d.minutes()).unwrap_or(0);
    let total = minute_of_day(start) + offset;
    let wrapped = total % MINUTES_PER_DAY;
    SequencedStart {
        time: NaiveTime::from_hms_opt(wrapped / 60, wrapped % 60, 0).unwrap_or(NaiveTime::MIN),
        next_day: total >= MINUTES_PER_DAY,
    }
}

/// Effective simulator start for a selection made at `start`.
pub fn simulator_start(start: NaiveTime, selection: &EquipmentSelection) -> Option<SequencedStart> {
    let sim = selection.simulator()?;
    let after = if sim.after_ps5 {
        selection.longest_ps5()
    } else {
        None
    };
    Some(sequenced_start(start, after))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropReason {
    UnitBooked,
    SimulatorBooked,
    CapacityExceeded {
        booked: u32,
        requested: u32,
        limit: u32,
    },
    CrossesMidnight {
        start: NaiveTime,
    },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::UnitBooked => f.write_str("this console is already booked for that time"),
            DropReason::SimulatorBooked => {
                f.write_str("the driving simulator is already booked for that time")
            }
            DropReason::CapacityExceeded {
                booked,
                requested,
                limit,
            } => write!(
                f,
                "{booked} players are already booked; adding {requested} would exceed {limit}"
            ),
            DropReason::CrossesMidnight { start } => {
                write!(f, "the session would start at {start} on the next day")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedDevice {
    pub device: DeviceUnit,
    pub start: NaiveTime,
    pub duration: SessionDuration,
    pub reason: DropReason,
}

impl DroppedDevice {
    pub fn message(&self) -> String {
        format!(
            "{} at {} for {} minutes was removed: {}",
            self.device,
            self.start.format("%H:%M"),
            self.duration.minutes(),
            self.reason
        )
    }

    pub fn to_error(&self) -> BookingError {
        match self.reason {
            DropReason::CapacityExceeded {
                booked,
                requested,
                limit,
            } => BookingError::CapacityExceeded {
                start: self.start,
                booked,
                requested,
                limit,
            },
            DropReason::CrossesMidnight { start } => BookingError::CrossesMidnight(start),
            DropReason::UnitBooked | DropReason::SimulatorBooked => {
                BookingError::StaleAvailability {
                    device: self.device,
                    start: self.start,
                    duration: self.duration.minutes(),
                }
            }
        }
    }
}

/// Result of re-resolving a whole selection: what survived and what was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub selection: EquipmentSelection,
    pub dropped: Vec<DroppedDevice>,
    pub simulator_start: Option<NaiveTime>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }
}

/// Checks `selection` against a snapshot of the day's bookings.
///
/// Each PS5 unit is resolved over its own duration; units are admitted in
/// ascending order, so when the player ceiling is reached the higher units are
/// the ones dropped. The simulator is resolved at its sequenced start.
pub fn validate_against(
    bookings: &[ExistingBooking],
    date: NaiveDate,
    start: NaiveTime,
    selection: &EquipmentSelection,
    limit: u32,
) -> ValidationReport {
    let mut kept = selection.clone();
    let mut dropped = Vec::new();
    let mut pending_players = 0;

    for ps5 in selection.ps5() {
        let window = Window::new(start, ps5.duration.minutes());
        let availability = Availability::from_bookings(bookings, date, &window);
        let device = DeviceUnit::ps5(ps5.unit);
        let requested = pending_players + ps5.players.get();

        let reason = if !availability.is_free(device) {
            Some(DropReason::UnitBooked)
        } else if !availability.admits_players(requested, limit) {
            Some(DropReason::CapacityExceeded {
                booked: availability.total_players_booked,
                requested,
                limit,
            })
        } else {
            None
        };

        match reason {
            Some(reason) => {
                kept = kept.without_ps5(ps5.unit);
                dropped.push(DroppedDevice {
                    device,
                    start,
                    duration: ps5.duration,
                    reason,
                });
            }
            None => pending_players += ps5.players.get(),
        }
    }

    let mut sim_start = None;
    if let Some(sim) = selection.simulator() {
        // Sequence against the PS5 sessions that survived.
        let seq = simulator_start(start, &kept).unwrap_or(SequencedStart {
            time: start,
            next_day: false,
        });
        let reason = if seq.next_day {
            Some(DropReason::CrossesMidnight { start: seq.time })
        } else {
            let window = Window::new(seq.time, sim.duration.minutes());
            let availability = Availability::from_bookings(bookings, date, &window);
            (!availability.driving_sim_free).then_some(DropReason::SimulatorBooked)
        };

        match reason {
            Some(reason) => {
                kept = kept.without_simulator();
                dropped.push(DroppedDevice {
                    device: DeviceUnit::DrivingSimulator,
                    start: seq.time,
                    duration: sim.duration,
                    reason,
                });
            }
            None => sim_start = Some(seq.time),
        }
    }

    ValidationReport {
        selection: kept,
        dropped,
        simulator_start: sim_start,
    }
}

pub struct AvailabilityResolver<S> {
    store: S,
    max_ps5_players: u32,
}

impl<S: BookingStore> AvailabilityResolver<S> {
    pub fn new(store: S, max_ps5_players: u32) -> Self {
        Self {
            store,
            max_ps5_players,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn max_ps5_players(&self) -> u32 {
        self.max_ps5_players
    }

    pub async fn resolve(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        duration: SessionDuration,
    ) -> EngineResult<Availability> {
        let bookings = self.store.bookings_on(date).await?;
        let window = Window::new(start, duration.minutes());
        let availability = Availability::from_bookings(&bookings, date, &window);
        tracing::debug!(
            %date,
            %start,
            duration = duration.minutes(),
            free_units = availability.free_ps5_units.len(),
            players = availability.total_players_booked,
            sim_free = availability.driving_sim_free,
            "Resolved availability"
        );
        Ok(availability)
    }

    /// Re-resolves every device in `selection` from one fresh fetch.
    pub async fn validate_selection(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        selection: &EquipmentSelection,
    ) -> EngineResult<ValidationReport> {
        let bookings = self.store.bookings_on(date).await?;
        let report = validate_against(&bookings, date, start, selection, self.max_ps5_players);
        for d in &report.dropped {
            tracing::warn!(device = %d.device, reason = %d.reason, "Dropped device from selection");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerCount, Ps5Selection, SimulatorSelection};
    use crate::store::MemoryBookingStore;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn unit(n: u8) -> Ps5Unit {
        Ps5Unit::try_from(n).unwrap()
    }

    fn dur(m: u32) -> SessionDuration {
        SessionDuration::try_from(m).unwrap()
    }

    fn ps5_booking(id: &str, start: NaiveTime, minutes: u32, n: u8, players: u8) -> ExistingBooking {
        ExistingBooking {
            id: id.into(),
            date: day(),
            start_time: start,
            duration_minutes: minutes,
            device_assignments: vec![DeviceAssignment::Ps5 {
                unit: unit(n),
                player_count: PlayerCount::try_from(players).unwrap(),
            }],
        }
    }

    fn sim_booking(id: &str, start: NaiveTime, minutes: u32) -> ExistingBooking {
        ExistingBooking {
            id: id.into(),
            date: day(),
            start_time: start,
            duration_minutes: minutes,
            device_assignments: vec![DeviceAssignment::DrivingSimulator],
        }
    }

    fn ps5_sel(n: u8, players: u8, minutes: u32) -> Ps5Selection {
        Ps5Selection {
            unit: unit(n),
            players: PlayerCount::try_from(players).unwrap(),
            duration: dur(minutes),
        }
    }

    /// Nine players across units 1 and 2 during 14:00-15:00.
    fn nine_player_afternoon() -> Vec<ExistingBooking> {
        vec![
            ps5_booking("a", t(14, 0), 60, 1, 4),
            ps5_booking("b", t(14, 0), 30, 2, 3),
            ps5_booking("c", t(14, 30), 30, 2, 2),
        ]
    }

    #[test]
    fn free_units_exclude_only_overlapping_assignments() {
        let bookings = vec![
            ps5_booking("a", t(10, 0), 60, 1, 2),
            ps5_booking("b", t(11, 0), 60, 2, 2),
        ];
        let a = Availability::from_bookings(&bookings, day(), &Window::new(t(10, 30), 30));
        assert!(!a.free_ps5_units.contains(&unit(1)));
        assert!(a.free_ps5_units.contains(&unit(2)));
        assert!(a.free_ps5_units.contains(&unit(3)));
        assert_eq!(a.total_players_booked, 2);
        assert!(a.driving_sim_free);
    }

    #[test]
    fn bookings_on_other_dates_are_ignored() {
        let mut b = ps5_booking("a", t(10, 0), 60, 1, 4);
        b.date = day().succ_opt().unwrap();
        let a = Availability::from_bookings(&[b], day(), &Window::new(t(10, 0), 60));
        assert_eq!(a.free_ps5_units.len(), 3);
        assert_eq!(a.total_players_booked, 0);
    }

    #[test]
    fn reported_free_unit_never_matches_an_overlapping_booking() {
        let bookings = vec![
            ps5_booking("a", t(12, 0), 90, 1, 1),
            ps5_booking("b", t(13, 0), 30, 3, 4),
            sim_booking("c", t(12, 30), 60),
        ];
        for start in [t(11, 30), t(12, 0), t(12, 30), t(13, 0), t(13, 30)] {
            for minutes in SessionDuration::ALLOWED {
                let w = Window::new(start, minutes);
                let a = Availability::from_bookings(&bookings, day(), &w);
                for free in &a.free_ps5_units {
                    assert!(!bookings.iter().any(|b| b.overlaps(day(), &w)
                        && b.device_assignments
                            .iter()
                            .any(|x| x.device() == DeviceUnit::ps5(*free))));
                }
            }
        }
    }

    #[test]
    fn sequenced_simulator_starts_when_ps5_ends() {
        let seq = sequenced_start(t(10, 0), Some(dur(90)));
        assert_eq!(seq.time, t(11, 30));
        assert!(!seq.next_day);

        let sel = EquipmentSelection::new()
            .with_ps5(ps5_sel(1, 2, 60))
            .with_ps5(ps5_sel(2, 1, 90))
            .with_simulator(SimulatorSelection {
                duration: dur(30),
                after_ps5: true,
            });
        assert_eq!(simulator_start(t(10, 0), &sel).map(|s| s.time), Some(t(11, 30)));
    }

    #[test]
    fn sequenced_start_flags_midnight_wrap() {
        let seq = sequenced_start(t(23, 30), Some(dur(60)));
        assert_eq!(seq.time, t(0, 30));
        assert!(seq.next_day);
    }

    #[test]
    fn after_ps5_without_ps5_starts_at_slot() {
        let sel = EquipmentSelection::new().with_simulator(SimulatorSelection {
            duration: dur(60),
            after_ps5: true,
        });
        assert_eq!(simulator_start(t(15, 0), &sel).map(|s| s.time), Some(t(15, 0)));
    }

    #[test]
    fn capacity_ceiling_rejects_free_unit() {
        let bookings = nine_player_afternoon();
        let sel = EquipmentSelection::new().with_ps5(ps5_sel(3, 2, 60));
        let report = validate_against(&bookings, day(), t(14, 0), &sel, 10);

        assert!(report.selection.is_empty());
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(
            report.dropped[0].reason,
            DropReason::CapacityExceeded {
                booked: 9,
                requested: 2,
                limit: 10
            }
        );
        assert!(matches!(
            report.dropped[0].to_error(),
            BookingError::CapacityExceeded { booked: 9, requested: 2, .. }
        ));

        // One player still fits.
        let sel = EquipmentSelection::new().with_ps5(ps5_sel(3, 1, 60));
        assert!(validate_against(&bookings, day(), t(14, 0), &sel, 10).is_clean());
    }

    #[test]
    fn ceiling_counts_players_already_in_the_selection() {
        let bookings = vec![ps5_booking("a", t(18, 0), 60, 1, 4)];
        let sel = EquipmentSelection::new()
            .with_ps5(ps5_sel(2, 4, 60))
            .with_ps5(ps5_sel(3, 4, 60));
        let report = validate_against(&bookings, day(), t(18, 0), &sel, 10);

        assert_eq!(report.selection.devices(), vec![DeviceUnit::ps5(unit(2))]);
        assert_eq!(report.dropped[0].device, DeviceUnit::ps5(unit(3)));
    }

    #[test]
    fn longer_duration_drops_devices_booked_later_in_window() {
        let bookings = vec![
            ps5_booking("a", t(15, 0), 30, 3, 1),
            sim_booking("b", t(15, 0), 60),
        ];
        let sel = EquipmentSelection::new()
            .with_ps5(ps5_sel(3, 2, 60))
            .with_simulator(SimulatorSelection {
                duration: dur(60),
                after_ps5: false,
            });

        let short = validate_against(&bookings, day(), t(14, 0), &sel, 10);
        assert!(short.is_clean());

        let long_sel = sel.with_ps5(ps5_sel(3, 2, 120)).with_simulator(SimulatorSelection {
            duration: dur(120),
            after_ps5: false,
        });
        let long = validate_against(&bookings, day(), t(14, 0), &long_sel, 10);
        assert!(long.selection.is_empty());
        let reasons: Vec<_> = long.dropped.iter().map(|d| d.reason).collect();
        assert_eq!(reasons, vec![DropReason::UnitBooked, DropReason::SimulatorBooked]);
    }

    #[test]
    fn sequenced_simulator_checked_at_derived_start() {
        // Simulator free at 10:00 but booked from 11:30.
        let bookings = vec![sim_booking("a", t(11, 30), 30)];
        let sel = EquipmentSelection::new()
            .with_ps5(ps5_sel(1, 1, 90))
            .with_simulator(SimulatorSelection {
                duration: dur(30),
                after_ps5: true,
            });
        let report = validate_against(&bookings, day(), t(10, 0), &sel, 10);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].start, t(11, 30));

        let unsequenced = sel.with_simulator(SimulatorSelection {
            duration: dur(30),
            after_ps5: false,
        });
        let report = validate_against(&bookings, day(), t(10, 0), &unsequenced, 10);
        assert!(report.is_clean());
        assert_eq!(report.simulator_start, Some(t(10, 0)));
    }

    #[test]
    fn simulator_wrapping_past_midnight_is_dropped() {
        let sel = EquipmentSelection::new()
            .with_ps5(ps5_sel(1, 1, 120))
            .with_simulator(SimulatorSelection {
                duration: dur(30),
                after_ps5: true,
            });
        let report = validate_against(&[], day(), t(23, 0), &sel, 10);
        assert_eq!(
            report.dropped[0].reason,
            DropReason::CrossesMidnight { start: t(1, 0) }
        );
        assert_eq!(report.dropped[0].to_error(), BookingError::CrossesMidnight(t(1, 0)));
    }

    #[tokio::test]
    async fn resolver_reports_capacity_from_store() {
        let store = MemoryBookingStore::new().with_bookings(nine_player_afternoon());
        let resolver = AvailabilityResolver::new(store, 10);

        let a = resolver.resolve(day(), t(14, 0), dur(60)).await.unwrap();
        assert_eq!(a.total_players_booked, 9);
        assert_eq!(a.free_ps5_units.iter().copied().collect::<Vec<_>>(), vec![unit(3)]);
        assert!(!a.admits_players(2, resolver.max_ps5_players()));
    }

    #[tokio::test]
    async fn selection_stays_free_until_submitted() {
        let store = MemoryBookingStore::new().with_bookings(nine_player_afternoon());
        let resolver = AvailabilityResolver::new(store, 10);
        let sel = EquipmentSelection::new()
            .with_ps5(ps5_sel(3, 1, 30))
            .with_simulator(SimulatorSelection {
                duration: dur(60),
                after_ps5: true,
            });

        let first = resolver.validate_selection(day(), t(14, 0), &sel).await.unwrap();
        let again = resolver
            .validate_selection(day(), t(14, 0), &first.selection)
            .await
            .unwrap();
        assert!(first.is_clean());
        assert_eq!(again.selection, sel);
        assert_eq!(again.simulator_start, Some(t(14, 30)));
    }
}
