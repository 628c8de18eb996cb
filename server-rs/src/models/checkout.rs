use booking_engine::models::{
    DeviceUnit, EquipmentSelection, PlayerCount, Ps5Selection, Ps5Unit, SessionDuration,
    SimulatorSelection,
};
use booking_engine::EngineResult;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub time: String,
    pub duration: u32,
}

#[derive(Debug, Deserialize)]
pub struct Ps5Body {
    pub unit: u8,
    pub players: u8,
    pub duration: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorBody {
    pub duration: u32,
    #[serde(default)]
    pub after_ps5: bool,
}

/// Equipment as sent by the front end, before any value is checked.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionBody {
    #[serde(default)]
    pub ps5: Vec<Ps5Body>,
    #[serde(default)]
    pub simulator: Option<SimulatorBody>,
}

impl SelectionBody {
    pub fn into_selection(self) -> EngineResult<EquipmentSelection> {
        let ps5 = self
            .ps5
            .into_iter()
            .map(|p| {
                Ok(Ps5Selection {
                    unit: Ps5Unit::try_from(p.unit)?,
                    players: PlayerCount::try_from(p.players)?,
                    duration: SessionDuration::try_from(p.duration)?,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;
        let simulator = self
            .simulator
            .map(|s| {
                Ok::<_, booking_engine::BookingError>(SimulatorSelection {
                    duration: SessionDuration::try_from(s.duration)?,
                    after_ps5: s.after_ps5,
                })
            })
            .transpose()?;
        EquipmentSelection::from_parts(ps5, simulator)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub selection: SelectionBody,
    pub phone: Option<String>,
    pub promo_code: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCheckoutRequest {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Deserialize)]
pub struct UpdateEquipmentRequest {
    pub selection: SelectionBody,
}

#[derive(Default, Deserialize)]
pub struct ReviewRequest {
    pub phone: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub name: String,
    pub phone: String,
    pub promo_code: Option<String>,
}

#[derive(Deserialize)]
pub struct RetryRequest {
    pub device: DeviceUnit,
}
