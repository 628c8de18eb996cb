pub mod checkout;
pub mod store;

pub use checkout::*;
pub use store::*;
