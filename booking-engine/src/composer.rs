//! Booking Composer: turns a validated selection into one request per device.

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::availability::simulator_start;
use crate::error::{BookingError, EngineResult};
use crate::models::{
    BookingRequest, CustomerInfo, DeviceUnit, EquipmentSelection, Membership, PromoCode,
    Ps5Assignment,
};
use crate::pricing::{PriceBreakdown, PricingEngine};

/// Everything needed to materialize requests for a checkout.
#[derive(Debug, Clone)]
pub struct Order<'a> {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub selection: &'a EquipmentSelection,
    pub customer: &'a CustomerInfo,
    pub membership: Option<&'a Membership>,
    pub promo: Option<&'a PromoCode>,
}

#[derive(Debug, Clone)]
pub struct ComposedOrder {
    pub requests: Vec<BookingRequest>,
    pub quote: PriceBreakdown,
}

#[derive(Debug, Clone, Default)]
pub struct BookingComposer {
    pricing: PricingEngine,
}

impl BookingComposer {
    pub fn new(pricing: PricingEngine) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// One request per PS5 unit, then one for the simulator. The promo code,
    /// if any, rides on the first request only.
    pub fn compose(&self, order: &Order<'_>) -> EngineResult<ComposedOrder> {
        if order.selection.is_empty() {
            return Err(BookingError::NoDeviceSelected);
        }

        let quote = self
            .pricing
            .price(order.selection, order.membership, order.promo);
        let price_of = |device: DeviceUnit| {
            quote
                .item_for(device)
                .map(|i| i.final_price)
                .unwrap_or_default()
        };

        let mut requests = Vec::with_capacity(order.selection.devices().len());

        for ps5 in order.selection.ps5() {
            requests.push(BookingRequest {
                request_id: Uuid::new_v4(),
                date: order.date,
                start_time: order.start,
                duration: ps5.duration,
                ps5_assignments: vec![Ps5Assignment {
                    unit: ps5.unit,
                    player_count: ps5.players,
                }],
                driving_sim: false,
                price: price_of(DeviceUnit::ps5(ps5.unit)),
                bonus_minutes: 0,
                promo_code_id: None,
                customer: order.customer.clone(),
            });
        }

        if let (Some(sim), Some(seq)) = (
            order.selection.simulator(),
            simulator_start(order.start, order.selection),
        ) {
            if seq.next_day {
                return Err(BookingError::CrossesMidnight(seq.time));
            }
            requests.push(BookingRequest {
                request_id: Uuid::new_v4(),
                date: order.date,
                start_time: seq.time,
                duration: sim.duration,
                ps5_assignments: Vec::new(),
                driving_sim: true,
                price: price_of(DeviceUnit::DrivingSimulator),
                bonus_minutes: 0,
                promo_code_id: None,
                customer: order.customer.clone(),
            });
        }

        if let (Some(promo), Some(first)) = (order.promo, requests.first_mut()) {
            first.bonus_minutes = promo.bonus_minutes;
            first.promo_code_id = Some(promo.id.clone());
        }

        Ok(ComposedOrder { requests, quote })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlayerCount, Ps5Selection, Ps5Unit, SessionDuration, SimulatorSelection};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn customer() -> CustomerInfo {
        CustomerInfo {
            name: "Ravi".into(),
            phone: "9876543210".into(),
        }
    }

    fn selection() -> EquipmentSelection {
        EquipmentSelection::new()
            .with_ps5(Ps5Selection {
                unit: Ps5Unit::try_from(2).unwrap(),
                players: PlayerCount::try_from(3).unwrap(),
                duration: SessionDuration::try_from(90).unwrap(),
            })
            .with_ps5(Ps5Selection {
                unit: Ps5Unit::try_from(1).unwrap(),
                players: PlayerCount::try_from(1).unwrap(),
                duration: SessionDuration::try_from(30).unwrap(),
            })
            .with_simulator(SimulatorSelection {
                duration: SessionDuration::try_from(60).unwrap(),
                after_ps5: true,
            })
    }

    fn order<'a>(
        selection: &'a EquipmentSelection,
        customer: &'a CustomerInfo,
        promo: Option<&'a PromoCode>,
        membership: Option<&'a Membership>,
    ) -> Order<'a> {
        Order {
            date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            start: t(10, 0),
            selection,
            customer,
            membership,
            promo,
        }
    }

    #[test]
    fn one_request_per_device_with_own_start() {
        let sel = selection();
        let cust = customer();
        let composed = BookingComposer::default()
            .compose(&order(&sel, &cust, None, None))
            .unwrap();

        let devices: Vec<DeviceUnit> = composed.requests.iter().map(|r| r.device()).collect();
        assert_eq!(
            devices,
            vec![
                DeviceUnit::ps5(Ps5Unit::try_from(1).unwrap()),
                DeviceUnit::ps5(Ps5Unit::try_from(2).unwrap()),
                DeviceUnit::DrivingSimulator,
            ]
        );
        assert_eq!(composed.requests[0].start_time, t(10, 0));
        assert_eq!(composed.requests[1].start_time, t(10, 0));
        assert_eq!(composed.requests[2].start_time, t(11, 30));
        assert!(composed.requests[2].driving_sim);
        assert!(composed.requests[2].ps5_assignments.is_empty());
    }

    #[test]
    fn request_prices_match_quote() {
        let sel = selection();
        let cust = customer();
        let gold = Membership {
            plan_type: "gold".into(),
            discount_percentage: 10,
        };
        let composed = BookingComposer::default()
            .compose(&order(&sel, &cust, None, Some(&gold)))
            .unwrap();

        let prices: Vec<i64> = composed.requests.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![90, 810, 270]);
        assert_eq!(prices.iter().sum::<i64>(), composed.quote.final_total);
    }

    #[test]
    fn promo_attaches_to_exactly_one_request() {
        let sel = selection();
        let cust = customer();
        let promo = PromoCode {
            code: "WEEKEND".into(),
            bonus_minutes: 30,
            id: "promo_9".into(),
        };
        let composed = BookingComposer::default()
            .compose(&order(&sel, &cust, Some(&promo), None))
            .unwrap();

        let carrying: Vec<_> = composed
            .requests
            .iter()
            .filter(|r| r.promo_code_id.is_some())
            .collect();
        assert_eq!(carrying.len(), 1);
        assert_eq!(carrying[0].bonus_minutes, 30);
        assert_eq!(composed.quote.bonus_minutes, 30);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let sel = EquipmentSelection::new();
        let cust = customer();
        let err = BookingComposer::default()
            .compose(&order(&sel, &cust, None, None))
            .unwrap_err();
        assert_eq!(err, BookingError::NoDeviceSelected);
    }

    #[test]
    fn simulator_past_midnight_is_rejected() {
        let sel = selection();
        let cust = customer();
        let mut late = order(&sel, &cust, None, None);
        late.start = t(23, 0);
        assert_eq!(
            BookingComposer::default().compose(&late).unwrap_err(),
            BookingError::CrossesMidnight(t(0, 30))
        );
    }
}
