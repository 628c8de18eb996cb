pub mod checkout_manager;
pub mod store_client;

pub use checkout_manager::CheckoutManager;
pub use store_client::HttpBookingStore;
