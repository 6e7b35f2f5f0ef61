pub mod conflict;
pub mod generator;
pub mod schedule;

pub use generator::{SlotGenerator, GenerationReport};
pub use schedule::ScheduleService;
