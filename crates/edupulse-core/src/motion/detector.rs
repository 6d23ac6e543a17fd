use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::error::ValidationError;
use crate::storage::CameraConfig;

/// Mean absolute per-channel (R, G, B) difference between two equally sized
/// RGBA frames, on a 0-255 scale. Alpha is ignored.
pub fn mean_delta(previous: &RgbaImage, current: &RgbaImage) -> Result<f64, ValidationError> {
    if previous.dimensions() != current.dimensions() {
        return Err(ValidationError::FrameSizeMismatch {
            left: previous.dimensions(),
            right: current.dimensions(),
        });
    }
    let pixels = previous.as_raw().len() / 4;
    if pixels == 0 {
        return Ok(0.0);
    }
    let total: u64 = previous
        .as_raw()
        .chunks_exact(4)
        .zip(current.as_raw().chunks_exact(4))
        .map(|(a, b)| {
            (0..3)
                .map(|c| u64::from(a[c].abs_diff(b[c])))
                .sum::<u64>()
        })
        .sum();
    Ok(total as f64 / (pixels * 3) as f64)
}

/// Stretch a frame to the sampling resolution.
pub fn downscale(frame: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(&frame.to_rgba8(), width, height, FilterType::Triangle)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReading {
    pub mean_delta: f64,
    pub motion: bool,
}

/// Frame-difference motion heuristic.
///
/// Keeps only the last sampled frame.
#[derive(Debug, Clone)]
pub struct MotionDetector {
    width: u32,
    height: u32,
    threshold: f64,
    previous: Option<RgbaImage>,
}

impl MotionDetector {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            threshold: config.motion_threshold,
            previous: None,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn has_reference(&self) -> bool {
        self.previous.is_some()
    }

    /// Compare against the previous sample and keep this one.
    ///
    /// The first frame after construction or [`clear`](Self::clear) only
    /// primes the buffer and yields `None`.
    pub fn sample(&mut self, frame: &DynamicImage) -> Option<MotionReading> {
        let current = downscale(frame, self.width, self.height);
        let reading = self.previous.as_ref().and_then(|prev| {
            // Both frames share our fixed resolution.
            mean_delta(prev, &current).ok().map(|mean_delta| MotionReading {
                mean_delta,
                motion: mean_delta > self.threshold,
            })
        });
        self.previous = Some(current);
        reading
    }

    pub fn clear(&mut self) {
        self.previous = None;
    }
}
