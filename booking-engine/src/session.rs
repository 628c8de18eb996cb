//! A live checkout: the state machine behind a lock, driven against the store.
//!
//! Store calls never run while the lock is held. Equipment edits and reviews
//! are stamped with a ticket so a slow resolution cannot overwrite a newer one.

use chrono::{NaiveDate, NaiveTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::availability::ValidationReport;
use crate::checkout::{Checkout, Phase, Schedule};
use crate::composer::Order;
use crate::engine::BookingEngine;
use crate::error::{BookingError, EngineResult};
use crate::models::{BookingRequest, CustomerInfo, DeviceUnit, EquipmentSelection, PromoCode};
use crate::pricing::PriceBreakdown;
use crate::store::BookingStore;
use crate::submission::SubmissionReport;
use crate::supersede::ResolutionTracker;

type ResolutionKey = (NaiveDate, NaiveTime, EquipmentSelection);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentUpdate {
    Applied(ValidationReport),
    /// A newer edit was issued while this one resolved; its result was discarded.
    Superseded,
}

#[derive(Debug)]
pub struct CheckoutSession {
    id: Uuid,
    checkout: Mutex<Checkout>,
    tracker: ResolutionTracker<ResolutionKey>,
}

impl Default for CheckoutSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutSession {
    pub fn new() -> Self {
        let checkout = Checkout::new();
        Self {
            id: checkout.id(),
            checkout: Mutex::new(checkout),
            tracker: ResolutionTracker::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub async fn snapshot(&self) -> Checkout {
        self.checkout.lock().await.clone()
    }

    async fn schedule_for_edit(&self) -> EngineResult<Schedule> {
        let checkout = self.checkout.lock().await;
        match (checkout.phase(), checkout.schedule()) {
            (Phase::SelectingEquipment, Some(schedule)) => Ok(schedule.clone()),
            (phase, _) => Err(BookingError::InvalidTransition {
                phase: phase.as_str(),
                action: "change equipment",
            }),
        }
    }

    /// Picks a slot, refusing it if the store now reports it full.
    pub async fn select_slot<S: BookingStore>(
        &self,
        engine: &BookingEngine<S>,
        date: NaiveDate,
        time: NaiveTime,
    ) -> EngineResult<Checkout> {
        let slot = engine.selectable_slot(date, time).await?;
        self.tracker.invalidate().await;
        let mut checkout = self.checkout.lock().await;
        checkout.select_slot(date, slot)?;
        tracing::info!(checkout_id = %self.id, %date, %time, "Slot selected");
        Ok(checkout.clone())
    }

    /// Re-resolves `selection` and applies the pruned result, unless a newer
    /// edit was issued in the meantime.
    pub async fn update_equipment<S: BookingStore>(
        &self,
        engine: &BookingEngine<S>,
        selection: EquipmentSelection,
    ) -> EngineResult<EquipmentUpdate> {
        let schedule = self.schedule_for_edit().await?;
        let ticket = self
            .tracker
            .issue((schedule.date, schedule.slot.time, selection.clone()))
            .await;

        let report = engine
            .validate_selection(schedule.date, schedule.slot.time, &selection)
            .await?;

        let mut checkout = self.checkout.lock().await;
        if !self.tracker.is_current(&ticket).await {
            tracing::debug!(
                checkout_id = %self.id,
                generation = ticket.generation(),
                "Discarding superseded resolution"
            );
            return Ok(EquipmentUpdate::Superseded);
        }
        checkout.apply_equipment(report.clone())?;
        Ok(EquipmentUpdate::Applied(report))
    }

    /// SelectingEquipment -> ReviewingOrder after one last check of the current
    /// selection. The quote includes the member discount when `phone` is known.
    pub async fn review<S: BookingStore>(
        &self,
        engine: &BookingEngine<S>,
        phone: Option<&str>,
    ) -> EngineResult<PriceBreakdown> {
        let schedule = self.schedule_for_edit().await?;
        let selection = {
            let checkout = self.checkout.lock().await;
            checkout.selection().cloned().unwrap_or_default()
        };
        if selection.is_empty() {
            return Err(BookingError::NoDeviceSelected);
        }

        let ticket = self
            .tracker
            .issue((schedule.date, schedule.slot.time, selection.clone()))
            .await;
        let report = engine
            .validate_selection(schedule.date, schedule.slot.time, &selection)
            .await?;
        let quote = engine.quote(&selection, phone, None).await?;

        let mut checkout = self.checkout.lock().await;
        if !self.tracker.is_current(&ticket).await {
            return Err(BookingError::InvalidTransition {
                phase: checkout.phase().as_str(),
                action: "review an outdated selection",
            });
        }
        checkout.review(report, quote.clone())?;
        Ok(quote)
    }

    pub async fn back(&self) -> EngineResult<Checkout> {
        self.tracker.invalidate().await;
        let mut checkout = self.checkout.lock().await;
        checkout.back()?;
        Ok(checkout.clone())
    }

    /// Commits every device concurrently. Anything that fails before the
    /// first store write puts the checkout back where it was.
    pub async fn submit<S: BookingStore>(
        &self,
        engine: &BookingEngine<S>,
        customer: CustomerInfo,
        promo_code: Option<&str>,
    ) -> EngineResult<SubmissionReport> {
        let (schedule, selection, cached_promo) = {
            let mut checkout = self.checkout.lock().await;
            let (schedule, selection) = checkout.begin_submit()?;
            checkout.set_customer(customer.clone());
            (schedule, selection, checkout.promo().cloned())
        };

        let requests = match self
            .prepare(engine, &schedule, &selection, &customer, promo_code, cached_promo)
            .await
        {
            Ok(requests) => requests,
            Err(Prepared::Abort(e)) => {
                self.checkout.lock().await.abort_submit()?;
                return Err(e);
            }
            Err(Prepared::Reopen(report)) => {
                let error = report
                    .dropped
                    .first()
                    .map(|d| d.to_error())
                    .unwrap_or(BookingError::NoDeviceSelected);
                self.checkout.lock().await.reopen_equipment(report)?;
                return Err(error);
            }
        };

        tracing::info!(
            checkout_id = %self.id,
            devices = requests.len(),
            "Submitting bookings"
        );
        let report = engine.submit(requests).await;

        let mut checkout = self.checkout.lock().await;
        Ok(checkout.finish(report)?.clone())
    }

    async fn prepare<S: BookingStore>(
        &self,
        engine: &BookingEngine<S>,
        schedule: &Schedule,
        selection: &EquipmentSelection,
        customer: &CustomerInfo,
        promo_code: Option<&str>,
        cached_promo: Option<PromoCode>,
    ) -> Result<Vec<BookingRequest>, Prepared> {
        // The code is checked once per checkout; resubmitting the same one
        // reuses the earlier answer.
        let promo = match promo_code.map(str::trim).filter(|c| !c.is_empty()) {
            None => None,
            Some(code) => match cached_promo {
                Some(p) if p.code.eq_ignore_ascii_case(code) => Some(p),
                _ => Some(engine.validate_promo(code).await.map_err(Prepared::Abort)?),
            },
        };
        self.checkout.lock().await.set_promo(promo.clone());

        let membership = engine
            .membership_for(&customer.phone)
            .await
            .map_err(Prepared::Abort)?;

        let report = engine
            .validate_selection(schedule.date, schedule.slot.time, selection)
            .await
            .map_err(Prepared::Abort)?;
        if !report.is_clean() {
            return Err(Prepared::Reopen(report));
        }

        let composed = engine
            .compose(&Order {
                date: schedule.date,
                start: schedule.slot.time,
                selection,
                customer,
                membership: membership.as_ref(),
                promo: promo.as_ref(),
            })
            .map_err(Prepared::Abort)?;
        Ok(composed.requests)
    }

    /// Sends the failed request for `device` again. The request keeps its id
    /// so the store can recognise a duplicate.
    ///
    /// A rejected device is re-checked first. A transport failure is not: the
    /// store may have committed the booking before the reply was lost, and the
    /// check would then find the device taken by that very booking.
    pub async fn retry<S: BookingStore>(
        &self,
        engine: &BookingEngine<S>,
        device: DeviceUnit,
    ) -> EngineResult<SubmissionReport> {
        let (_, failed) = self.checkout.lock().await.begin_retry(device)?;

        if !matches!(failed.error, BookingError::Transport(_)) {
            if let Err(e) = engine.recheck_request(&failed.request).await {
                self.checkout.lock().await.abort_submit()?;
                return Err(e);
            }
        }

        tracing::info!(checkout_id = %self.id, %device, "Retrying booking");
        let report = engine.submit(vec![failed.request]).await;
        let mut checkout = self.checkout.lock().await;
        Ok(checkout.finish(report)?.clone())
    }

    /// Makes every in-flight resolution stale.
    pub async fn cancel(&self) {
        self.tracker.invalidate().await;
        tracing::info!(checkout_id = %self.id, "Checkout cancelled");
    }
}

enum Prepared {
    Abort(BookingError),
    Reopen(ValidationReport),
}
