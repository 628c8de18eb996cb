//! Reservation and pricing engine for a gaming lounge with three PS5 consoles
//! and one driving simulator.
//!
//! The engine never persists anything itself. Every answer about existing
//! bookings comes from a [`BookingStore`], which is also the only party that
//! decides whether a booking is accepted.

pub mod availability;
pub mod checkout;
pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pricing;
pub mod session;
pub mod slots;
pub mod store;
pub mod submission;
pub mod supersede;

pub use availability::{
    Availability, AvailabilityResolver, DropReason, DroppedDevice, SequencedStart,
    ValidationReport,
};
pub use checkout::{Checkout, CheckoutState, Phase, Schedule};
pub use composer::{BookingComposer, ComposedOrder, Order};
pub use config::{EngineConfig, RateCard, SlotGrid};
pub use engine::BookingEngine;
pub use error::{BookingError, EngineResult, StoreError, StoreResult};
pub use pricing::{DiscountInfo, LineItem, PriceBreakdown, PricingEngine};
pub use session::{CheckoutSession, EquipmentUpdate};
pub use slots::SlotCalendar;
pub use store::{BookingStore, MemoryBookingStore};
pub use submission::{BookedDevice, FailedDevice, SubmissionOutcome, SubmissionReport};
