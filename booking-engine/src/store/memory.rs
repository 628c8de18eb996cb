use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::BookingStore;
use crate::availability::Availability;
use crate::config::DEFAULT_MAX_PS5_PLAYERS;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    BookingRequest, DeviceAssignment, ExistingBooking, Membership, PromoCode, PromoValidation,
};

#[derive(Default)]
struct Inner {
    bookings: Vec<ExistingBooking>,
    /// request id -> booking id, so a replayed creation returns the same booking.
    accepted: HashMap<Uuid, String>,
}

/// In-process Booking Store. Each creation is checked and applied under one
/// write lock, making it authoritative the same way the remote store is.
#[derive(Clone)]
pub struct MemoryBookingStore {
    inner: Arc<RwLock<Inner>>,
    promos: Arc<HashMap<String, PromoCode>>,
    memberships: Arc<HashMap<String, Membership>>,
    max_ps5_players: u32,
}

impl Default for MemoryBookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            promos: Arc::new(HashMap::new()),
            memberships: Arc::new(HashMap::new()),
            max_ps5_players: DEFAULT_MAX_PS5_PLAYERS,
        }
    }

    pub fn with_max_ps5_players(mut self, limit: u32) -> Self {
        self.max_ps5_players = limit;
        self
    }

    pub fn with_bookings(self, bookings: Vec<ExistingBooking>) -> Self {
        if let Ok(mut inner) = self.inner.try_write() {
            inner.bookings.extend(bookings);
        }
        self
    }

    pub fn with_promo(mut self, promo: PromoCode) -> Self {
        let mut promos = (*self.promos).clone();
        promos.insert(promo.code.to_uppercase(), promo);
        self.promos = Arc::new(promos);
        self
    }

    pub fn with_membership(mut self, phone: &str, membership: Membership) -> Self {
        let mut memberships = (*self.memberships).clone();
        memberships.insert(phone.to_string(), membership);
        self.memberships = Arc::new(memberships);
        self
    }

    /// Records a booking made elsewhere, bypassing conflict checks.
    pub async fn insert(&self, booking: ExistingBooking) {
        self.inner.write().await.bookings.push(booking);
    }

    pub async fn all_bookings(&self) -> Vec<ExistingBooking> {
        self.inner.read().await.bookings.clone()
    }

    fn check(&self, existing: &[ExistingBooking], request: &BookingRequest) -> StoreResult<()> {
        let availability = Availability::from_bookings(existing, request.date, &request.window());
        let mut players = 0;
        for assignment in request.assignments() {
            let device = assignment.device();
            if !availability.is_free(device) {
                return Err(StoreError::Rejected(format!(
                    "{device} is already booked at {}",
                    request.start_time
                )));
            }
            if let DeviceAssignment::Ps5 { player_count, .. } = assignment {
                players += player_count.get();
            }
        }
        if !availability.admits_players(players, self.max_ps5_players) {
            return Err(StoreError::Rejected(format!(
                "player capacity of {} exceeded at {}",
                self.max_ps5_players, request.start_time
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn bookings_on(&self, date: NaiveDate) -> StoreResult<Vec<ExistingBooking>> {
        let inner = self.inner.read().await;
        Ok(inner
            .bookings
            .iter()
            .filter(|b| b.date == date)
            .cloned()
            .collect())
    }

    async fn create_booking(&self, request: &BookingRequest) -> StoreResult<String> {
        let mut inner = self.inner.write().await;
        if let Some(id) = inner.accepted.get(&request.request_id) {
            return Ok(id.clone());
        }

        self.check(&inner.bookings, request)?;

        let id = format!("bk_{}", Uuid::new_v4().simple());
        inner.bookings.push(ExistingBooking {
            id: id.clone(),
            date: request.date,
            start_time: request.start_time,
            duration_minutes: request.duration.minutes(),
            device_assignments: request.assignments(),
        });
        inner.accepted.insert(request.request_id, id.clone());
        tracing::info!(booking_id = %id, device = %request.device(), "Booking accepted");
        Ok(id)
    }

    async fn validate_promo(&self, code: &str) -> StoreResult<PromoValidation> {
        Ok(match self.promos.get(&code.trim().to_uppercase()) {
            Some(p) => PromoValidation {
                valid: true,
                bonus_minutes: p.bonus_minutes,
                promo_code_id: Some(p.id.clone()),
            },
            None => PromoValidation {
                valid: false,
                bonus_minutes: 0,
                promo_code_id: None,
            },
        })
    }

    async fn membership_status(&self, phone: &str) -> StoreResult<Option<Membership>> {
        Ok(self.memberships.get(phone).cloned())
    }
}
