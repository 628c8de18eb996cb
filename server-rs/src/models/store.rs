//! Wire shapes of the Booking Store API.

use booking_engine::models::{
    BookingRequest, DeviceAssignment, ExistingBooking, Membership, PlayerCount, PromoValidation,
    Ps5Unit,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::parse_time;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "device", rename_all = "snake_case")]
pub enum WireAssignment {
    Ps5 {
        unit: u8,
        #[serde(rename = "playerCount")]
        player_count: u8,
    },
    DrivingSim,
}

impl WireAssignment {
    fn into_assignment(self) -> Result<DeviceAssignment, String> {
        match self {
            WireAssignment::Ps5 { unit, player_count } => Ok(DeviceAssignment::Ps5 {
                unit: Ps5Unit::try_from(unit).map_err(|e| e.to_string())?,
                player_count: PlayerCount::try_from(player_count).map_err(|e| e.to_string())?,
            }),
            WireAssignment::DrivingSim => Ok(DeviceAssignment::DrivingSimulator),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBooking {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub device_assignments: Vec<WireAssignment>,
}

impl WireBooking {
    /// Fails if the record names a time or device the engine cannot represent.
    pub fn into_booking(self) -> Result<ExistingBooking, String> {
        let device_assignments = self
            .device_assignments
            .into_iter()
            .map(WireAssignment::into_assignment)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("booking {}: {e}", self.id))?;
        let start_time = parse_time(&self.start_time)
            .ok_or_else(|| format!("booking {}: bad start time {:?}", self.id, self.start_time))?;
        Ok(ExistingBooking {
            id: self.id,
            date: self.date,
            start_time,
            duration_minutes: self.duration_minutes,
            device_assignments,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BookingsEnvelope {
    #[serde(default)]
    pub bookings: Vec<WireBooking>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub request_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub duration_minutes: u32,
    pub device_assignments: Vec<WireAssignment>,
    pub driving_sim: bool,
    pub price: i64,
    pub bonus_minutes: u32,
    pub promo_code_id: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
}

impl From<&BookingRequest> for NewBooking {
    fn from(r: &BookingRequest) -> Self {
        let device_assignments = r
            .assignments()
            .into_iter()
            .map(|a| match a {
                DeviceAssignment::Ps5 { unit, player_count } => WireAssignment::Ps5 {
                    unit: unit.number(),
                    player_count: player_count.get() as u8,
                },
                DeviceAssignment::DrivingSimulator => WireAssignment::DrivingSim,
            })
            .collect();
        Self {
            request_id: r.request_id,
            date: r.date,
            start_time: r.start_time.format("%H:%M").to_string(),
            duration_minutes: r.duration.minutes(),
            device_assignments,
            driving_sim: r.driving_sim,
            price: r.price,
            bonus_minutes: r.bonus_minutes,
            promo_code_id: r.promo_code_id.clone(),
            customer_name: r.customer.name.clone(),
            customer_phone: r.customer.phone.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatedBooking {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePromo {
    pub valid: bool,
    #[serde(default)]
    pub bonus_minutes: u32,
    #[serde(default)]
    pub promo_code_id: Option<String>,
}

impl From<WirePromo> for PromoValidation {
    fn from(p: WirePromo) -> Self {
        PromoValidation {
            valid: p.valid,
            bonus_minutes: p.bonus_minutes,
            promo_code_id: p.promo_code_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMembership {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub plan_type: Option<String>,
    #[serde(default)]
    pub discount_percentage: u8,
}

impl WireMembership {
    pub fn into_membership(self) -> Option<Membership> {
        if !self.active {
            return None;
        }
        Some(Membership {
            plan_type: self.plan_type.unwrap_or_default(),
            discount_percentage: self.discount_percentage,
        })
    }
}
