pub mod slot_finder;

pub use slot_finder::{BusyTimeline, find_slot};
