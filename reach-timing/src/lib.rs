mod format;
mod timer;

pub use format::format_elapsed;
pub use timer::{Clock, ManualClock, MonotonicClock};
