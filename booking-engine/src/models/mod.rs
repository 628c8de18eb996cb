pub mod booking;
pub mod device;
pub mod membership;
pub mod selection;
pub mod slot;

pub use booking::*;
pub use device::*;
pub use membership::*;
pub use selection::*;
pub use slot::*;
