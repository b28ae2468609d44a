pub mod event_queue;
pub mod time;

pub use event_queue::{EventKey, Scheduler};
pub use time::SimTime;
