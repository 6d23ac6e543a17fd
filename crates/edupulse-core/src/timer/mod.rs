mod engine;

pub(crate) use engine::now_ms;
pub use engine::{format_clock, SessionPhase, SessionTimer, TimerMode, TimerSnapshot};
