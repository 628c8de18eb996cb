use chrono::{NaiveDate, NaiveTime};

use crate::availability::{Availability, AvailabilityResolver, ValidationReport};
use crate::composer::{BookingComposer, ComposedOrder, Order};
use crate::config::EngineConfig;
use crate::error::{BookingError, EngineResult};
use crate::models::{
    BookingRequest, DeviceUnit, EquipmentSelection, Membership, PromoCode, SessionDuration,
    TimeSlot,
};
use crate::pricing::{PriceBreakdown, PricingEngine};
use crate::slots::SlotCalendar;
use crate::store::BookingStore;
use crate::submission::{submit_all, SubmissionReport};

/// Wires the components together over one Booking Store.
pub struct BookingEngine<S> {
    resolver: AvailabilityResolver<S>,
    calendar: SlotCalendar,
    composer: BookingComposer,
    config: EngineConfig,
}

impl<S: BookingStore> BookingEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            resolver: AvailabilityResolver::new(store, config.max_ps5_players),
            calendar: SlotCalendar::new(config.grid.clone(), config.max_ps5_players),
            composer: BookingComposer::new(PricingEngine::new(config.rates.clone())),
            config,
        }
    }

    pub fn store(&self) -> &S {
        self.resolver.store()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pricing(&self) -> &PricingEngine {
        self.composer.pricing()
    }

    pub async fn list_slots(&self, date: NaiveDate) -> EngineResult<Vec<TimeSlot>> {
        self.calendar.list_slots(self.store(), date).await
    }

    /// Resolves the slot at `time` on `date` and refuses it if full.
    pub async fn selectable_slot(&self, date: NaiveDate, time: NaiveTime) -> EngineResult<TimeSlot> {
        let slots = self.list_slots(date).await?;
        SlotCalendar::selectable(&slots, time)
    }

    pub async fn resolve(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        duration: SessionDuration,
    ) -> EngineResult<Availability> {
        self.resolver.resolve(date, start, duration).await
    }

    pub async fn validate_selection(
        &self,
        date: NaiveDate,
        start: NaiveTime,
        selection: &EquipmentSelection,
    ) -> EngineResult<ValidationReport> {
        self.resolver.validate_selection(date, start, selection).await
    }

    pub async fn validate_promo(&self, code: &str) -> EngineResult<PromoCode> {
        let code = code.trim();
        let validation = self.store().validate_promo(code).await?;
        validation
            .into_promo(code)
            .ok_or_else(|| BookingError::InvalidPromoCode(code.to_string()))
    }

    pub async fn membership_for(&self, phone: &str) -> EngineResult<Option<Membership>> {
        Ok(self.store().membership_status(phone).await?)
    }

    /// Prices a selection, looking up membership and promo concurrently.
    pub async fn quote(
        &self,
        selection: &EquipmentSelection,
        phone: Option<&str>,
        promo_code: Option<&str>,
    ) -> EngineResult<PriceBreakdown> {
        let membership = async {
            match phone {
                Some(p) => self.membership_for(p).await,
                None => Ok(None),
            }
        };
        let promo = async {
            match promo_code.filter(|c| !c.trim().is_empty()) {
                Some(c) => self.validate_promo(c).await.map(Some),
                None => Ok(None),
            }
        };
        let (membership, promo) = futures::join!(membership, promo);
        let (membership, promo) = (membership?, promo?);
        Ok(self
            .pricing()
            .price(selection, membership.as_ref(), promo.as_ref()))
    }

    pub fn compose(&self, order: &Order<'_>) -> EngineResult<ComposedOrder> {
        self.composer.compose(order)
    }

    /// Re-resolves the window of an already composed request before it is sent again.
    pub async fn recheck_request(&self, request: &BookingRequest) -> EngineResult<()> {
        let availability = self
            .resolve(request.date, request.start_time, request.duration)
            .await?;
        let device = request.device();
        if !availability.is_free(device) {
            return Err(BookingError::StaleAvailability {
                device,
                start: request.start_time,
                duration: request.duration.minutes(),
            });
        }
        if let DeviceUnit::Ps5 { .. } = device {
            let requested: u32 = request
                .ps5_assignments
                .iter()
                .map(|a| a.player_count.get())
                .sum();
            if !availability.admits_players(requested, self.config.max_ps5_players) {
                return Err(BookingError::CapacityExceeded {
                    start: request.start_time,
                    booked: availability.total_players_booked,
                    requested,
                    limit: self.config.max_ps5_players,
                });
            }
        }
        Ok(())
    }

    pub async fn submit(&self, requests: Vec<BookingRequest>) -> SubmissionReport {
        submit_all(self.store(), requests).await
    }
}
