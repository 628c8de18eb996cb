//! The external Booking Store: the single source of truth for accepted bookings
//! and the authoritative arbiter of conflicts. The engine only ever writes to it
//! optimistically and must tolerate rejection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::StoreResult;
use crate::models::{BookingRequest, ExistingBooking, Membership, PromoValidation};

pub mod memory;

pub use memory::MemoryBookingStore;

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// All accepted bookings on `date`.
    async fn bookings_on(&self, date: NaiveDate) -> StoreResult<Vec<ExistingBooking>>;

    /// Commits one device-level request, returning the store's booking id.
    /// A conflicting request is answered with `StoreError::Rejected`.
    async fn create_booking(&self, request: &BookingRequest) -> StoreResult<String>;

    async fn validate_promo(&self, code: &str) -> StoreResult<PromoValidation>;

    /// Active membership for the customer identified by `phone`, if any.
    async fn membership_status(&self, phone: &str) -> StoreResult<Option<Membership>>;

    async fn health_check(&self) -> bool {
        true
    }
}

#[async_trait]
impl<T: BookingStore + ?Sized> BookingStore for Arc<T> {
    async fn bookings_on(&self, date: NaiveDate) -> StoreResult<Vec<ExistingBooking>> {
        (**self).bookings_on(date).await
    }

    async fn create_booking(&self, request: &BookingRequest) -> StoreResult<String> {
        (**self).create_booking(request).await
    }

    async fn validate_promo(&self, code: &str) -> StoreResult<PromoValidation> {
        (**self).validate_promo(code).await
    }

    async fn membership_status(&self, phone: &str) -> StoreResult<Option<Membership>> {
        (**self).membership_status(phone).await
    }

    async fn health_check(&self) -> bool {
        (**self).health_check().await
    }
}
