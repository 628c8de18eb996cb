//! Slot Calendar: labels every grid point of a day at the minimum session length.

use chrono::{NaiveDate, NaiveTime};

use crate::availability::Availability;
use crate::config::SlotGrid;
use crate::error::{BookingError, EngineResult};
use crate::models::{ExistingBooking, SessionDuration, SlotStatus, TimeSlot, Window, PS5_UNITS};
use crate::store::BookingStore;

/// `Full` once nothing more can be booked: no PS5 can take a player and the
/// simulator is taken. `Available` only when nothing at all is booked.
pub fn slot_status(availability: &Availability, max_ps5_players: u32) -> SlotStatus {
    let ps5_bookable = !availability.free_ps5_units.is_empty()
        && availability.admits_players(1, max_ps5_players);

    if !ps5_bookable && !availability.driving_sim_free {
        SlotStatus::Full
    } else if availability.free_ps5_units.len() == PS5_UNITS.len()
        && availability.driving_sim_free
        && availability.total_players_booked == 0
    {
        SlotStatus::Available
    } else {
        SlotStatus::Partial
    }
}

#[derive(Debug, Clone)]
pub struct SlotCalendar {
    grid: SlotGrid,
    max_ps5_players: u32,
}

impl SlotCalendar {
    pub fn new(grid: SlotGrid, max_ps5_players: u32) -> Self {
        Self {
            grid,
            max_ps5_players,
        }
    }

    pub fn grid(&self) -> &SlotGrid {
        &self.grid
    }

    pub fn slots_from(&self, bookings: &[ExistingBooking], date: NaiveDate) -> Vec<TimeSlot> {
        self.grid
            .points()
            .into_iter()
            .map(|time| {
                let window = Window::new(time, SessionDuration::MIN.minutes());
                let availability = Availability::from_bookings(bookings, date, &window);
                TimeSlot {
                    time,
                    status: slot_status(&availability, self.max_ps5_players),
                    total_ps5_players_booked: availability.total_players_booked,
                }
            })
            .collect()
    }

    /// One store fetch, then every grid point evaluated locally.
    pub async fn list_slots<S: BookingStore + ?Sized>(
        &self,
        store: &S,
        date: NaiveDate,
    ) -> EngineResult<Vec<TimeSlot>> {
        let bookings = store.bookings_on(date).await?;
        let slots = self.slots_from(&bookings, date);
        tracing::debug!(
            %date,
            slots = slots.len(),
            full = slots.iter().filter(|s| s.status == SlotStatus::Full).count(),
            "Listed slots"
        );
        Ok(slots)
    }

    /// Guard for leaving `SelectingSchedule`: the time must be on the grid and not full.
    pub fn selectable(slots: &[TimeSlot], time: NaiveTime) -> EngineResult<TimeSlot> {
        let slot = slots
            .iter()
            .find(|s| s.time == time)
            .ok_or(BookingError::UnknownSlot(time))?;
        if !slot.is_selectable() {
            return Err(BookingError::SlotFull(time));
        }
        Ok(slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeviceAssignment, PlayerCount, Ps5Unit};
    use crate::store::MemoryBookingStore;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 20).unwrap()
    }

    fn booking(start: NaiveTime, minutes: u32, assignments: Vec<DeviceAssignment>) -> ExistingBooking {
        ExistingBooking {
            id: format!("bk_{start}"),
            date: day(),
            start_time: start,
            duration_minutes: minutes,
            device_assignments: assignments,
        }
    }

    fn ps5(unit: u8, players: u8) -> DeviceAssignment {
        DeviceAssignment::Ps5 {
            unit: Ps5Unit::try_from(unit).unwrap(),
            player_count: PlayerCount::try_from(players).unwrap(),
        }
    }

    fn status_at(slots: &[TimeSlot], time: NaiveTime) -> SlotStatus {
        slots.iter().find(|s| s.time == time).unwrap().status
    }

    #[test]
    fn labels_follow_bookings() {
        let bookings = vec![
            booking(t(12, 0), 60, vec![ps5(1, 2)]),
            booking(
                t(18, 0),
                30,
                vec![ps5(1, 4), ps5(2, 4), ps5(3, 2), DeviceAssignment::DrivingSimulator],
            ),
        ];
        let calendar = SlotCalendar::new(SlotGrid::default(), 10);
        let slots = calendar.slots_from(&bookings, day());

        assert_eq!(status_at(&slots, t(11, 30)), SlotStatus::Available);
        assert_eq!(status_at(&slots, t(12, 0)), SlotStatus::Partial);
        assert_eq!(status_at(&slots, t(12, 30)), SlotStatus::Partial);
        assert_eq!(status_at(&slots, t(13, 0)), SlotStatus::Available);
        assert_eq!(status_at(&slots, t(18, 0)), SlotStatus::Full);
        assert_eq!(
            slots.iter().find(|s| s.time == t(18, 0)).unwrap().total_ps5_players_booked,
            10
        );
    }

    #[test]
    fn all_units_taken_with_sim_booked_is_full_below_ceiling() {
        let bookings = vec![booking(
            t(15, 0),
            30,
            vec![ps5(1, 1), ps5(2, 1), ps5(3, 1), DeviceAssignment::DrivingSimulator],
        )];
        let slots = SlotCalendar::new(SlotGrid::default(), 10).slots_from(&bookings, day());
        assert_eq!(status_at(&slots, t(15, 0)), SlotStatus::Full);
    }

    #[test]
    fn free_simulator_keeps_slot_partial() {
        let bookings = vec![booking(t(15, 0), 30, vec![ps5(1, 4), ps5(2, 4), ps5(3, 2)])];
        let slots = SlotCalendar::new(SlotGrid::default(), 10).slots_from(&bookings, day());
        assert_eq!(status_at(&slots, t(15, 0)), SlotStatus::Partial);
    }

    #[test]
    fn full_slot_cannot_be_selected() {
        let slots = vec![
            TimeSlot {
                time: t(10, 0),
                status: SlotStatus::Full,
                total_ps5_players_booked: 10,
            },
            TimeSlot {
                time: t(10, 30),
                status: SlotStatus::Partial,
                total_ps5_players_booked: 4,
            },
        ];
        assert_eq!(
            SlotCalendar::selectable(&slots, t(10, 0)),
            Err(BookingError::SlotFull(t(10, 0)))
        );
        assert_eq!(
            SlotCalendar::selectable(&slots, t(9, 0)),
            Err(BookingError::UnknownSlot(t(9, 0)))
        );
        assert!(SlotCalendar::selectable(&slots, t(10, 30)).is_ok());
    }

    #[tokio::test]
    async fn lists_whole_day_from_store() {
        let store = MemoryBookingStore::new().with_bookings(vec![booking(
            t(20, 0),
            120,
            vec![DeviceAssignment::DrivingSimulator],
        )]);
        let calendar = SlotCalendar::new(SlotGrid::default(), 10);
        let slots = calendar.list_slots(&store, day()).await.unwrap();

        assert_eq!(slots.len(), calendar.grid().points().len());
        assert!(slots.windows(2).all(|w| w[0].time < w[1].time));
        assert_eq!(status_at(&slots, t(21, 30)), SlotStatus::Partial);
        assert_eq!(status_at(&slots, t(19, 30)), SlotStatus::Available);
    }
}
