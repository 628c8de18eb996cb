use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub plan_type: String,
    /// Whole percent, 0 when the plan carries no discount.
    pub discount_percentage: u8,
}

impl Membership {
    pub fn discount(&self) -> u8 {
        self.discount_percentage.min(100)
    }
}

/// A promo code the store has validated for this checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub bonus_minutes: u32,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoValidation {
    pub valid: bool,
    #[serde(default)]
    pub bonus_minutes: u32,
    #[serde(default)]
    pub promo_code_id: Option<String>,
}

impl PromoValidation {
    pub fn into_promo(self, code: &str) -> Option<PromoCode> {
        match (self.valid, self.promo_code_id) {
            (true, Some(id)) => Some(PromoCode {
                code: code.to_string(),
                bonus_minutes: self.bonus_minutes,
                id,
            }),
            _ => None,
        }
    }
}
