pub mod store;
pub mod rollover;

pub use store::SlotStore;
pub use rollover::{RolloverScheduler, RolloverConfig, RolloverReport};
