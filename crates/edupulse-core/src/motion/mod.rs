//! Camera motion heuristic: frame differencing at a low fixed resolution.

mod detector;
mod monitor;
mod source;

pub use detector::{downscale, mean_delta, MotionDetector, MotionReading};
pub use monitor::CameraMonitor;
pub use source::{FrameSource, ImageDirSource};
