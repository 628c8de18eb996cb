//! Pricing Engine. Pure: identical inputs always give identical totals.
//!
//! All amounts are whole rupees held in `i64`. Each line item is discounted and
//! rounded on its own before the totals are summed.

use serde::{Deserialize, Serialize};

use crate::config::RateCard;
use crate::models::{
    DeviceUnit, EquipmentSelection, Membership, PlayerCount, PromoCode, SessionDuration,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub device: DeviceUnit,
    pub duration: SessionDuration,
    pub players: Option<PlayerCount>,
    pub original: i64,
    pub discount: i64,
    pub final_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountInfo {
    pub percentage: u8,
    pub membership: Membership,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub line_items: Vec<LineItem>,
    pub original_total: i64,
    pub discount_amount: i64,
    pub final_total: i64,
    /// Free playtime from a promo code; never reflected in the totals.
    pub bonus_minutes: u32,
    /// Display only: the last discount applied.
    pub discount_info: Option<DiscountInfo>,
}

impl PriceBreakdown {
    pub fn item_for(&self, device: DeviceUnit) -> Option<&LineItem> {
        self.line_items.iter().find(|i| i.device == device)
    }
}

/// `original × (1 − pct/100)`, rounded half up to a whole rupee.
pub fn apply_discount(original: i64, percentage: u8) -> i64 {
    let pct = i64::from(percentage.min(100));
    (original * (100 - pct) + 50).div_euclid(100)
}

#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    rates: RateCard,
}

impl PricingEngine {
    pub fn new(rates: RateCard) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &RateCard {
        &self.rates
    }

    /// Undiscounted price of one device for one session.
    pub fn base_price(
        &self,
        device: DeviceUnit,
        players: Option<PlayerCount>,
        duration: SessionDuration,
    ) -> i64 {
        let blocks = i64::from(duration.blocks());
        match device {
            DeviceUnit::Ps5 { .. } => {
                let players = i64::from(players.map(|p| p.get()).unwrap_or(1));
                i64::from(self.rates.ps5_per_player) * players * blocks
            }
            DeviceUnit::DrivingSimulator => i64::from(self.rates.simulator) * blocks,
        }
    }

    pub fn line_item(
        &self,
        device: DeviceUnit,
        players: Option<PlayerCount>,
        duration: SessionDuration,
        membership: Option<&Membership>,
    ) -> LineItem {
        let original = self.base_price(device, players, duration);
        let final_price = match membership {
            Some(m) if m.discount() > 0 => apply_discount(original, m.discount()),
            _ => original,
        };
        LineItem {
            device,
            duration,
            players,
            original,
            discount: original - final_price,
            final_price,
        }
    }

    pub fn price(
        &self,
        selection: &EquipmentSelection,
        membership: Option<&Membership>,
        promo: Option<&PromoCode>,
    ) -> PriceBreakdown {
        let mut line_items: Vec<LineItem> = selection
            .ps5()
            .iter()
            .map(|s| self.line_item(DeviceUnit::ps5(s.unit), Some(s.players), s.duration, membership))
            .collect();
        if let Some(sim) = selection.simulator() {
            line_items.push(self.line_item(
                DeviceUnit::DrivingSimulator,
                None,
                sim.duration,
                membership,
            ));
        }

        let mut discount_info = None;
        for item in &line_items {
            if let (Some(m), true) = (membership, item.discount > 0) {
                discount_info = Some(DiscountInfo {
                    percentage: m.discount(),
                    membership: m.clone(),
                });
            }
        }

        let original_total = line_items.iter().map(|i| i.original).sum();
        let final_total = line_items.iter().map(|i| i.final_price).sum();

        PriceBreakdown {
            original_total,
            discount_amount: original_total - final_total,
            final_total,
            bonus_minutes: promo.map(|p| p.bonus_minutes).unwrap_or(0),
            discount_info,
            line_items,
        }
    }
}
