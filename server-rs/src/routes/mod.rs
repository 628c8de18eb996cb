pub mod checkout;
pub mod health;
pub mod pricing;
pub mod slots;
