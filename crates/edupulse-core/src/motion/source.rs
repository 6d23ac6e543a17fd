//! Frame sources for the camera monitor.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::CameraError;

/// Something that yields video frames.
///
/// `open` acquires the device; dropping the source releases it.
pub trait FrameSource: Send + 'static {
    fn open(&mut self) -> Result<(), CameraError>;
    fn next_frame(&mut self) -> Result<DynamicImage, CameraError>;
}

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Replays image files from a directory in name order.
///
/// Stands in for a webcam on machines without one; a recorder that dumps a
/// frame per interval into a directory works as a live feed.
#[derive(Debug, Clone)]
pub struct ImageDirSource {
    dir: PathBuf,
    frames: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
}

impl ImageDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            frames: Vec::new(),
            cursor: 0,
            looping: false,
        }
    }

    /// Start over from the first frame instead of ending the stream.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

impl FrameSource for ImageDirSource {
    fn open(&mut self) -> Result<(), CameraError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            CameraError::AcquireFailed(format!("{}: {e}", self.dir.display()))
        })?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_frame(p))
            .collect();
        frames.sort();
        if frames.is_empty() {
            return Err(CameraError::AcquireFailed(format!(
                "no frames in {}",
                self.dir.display()
            )));
        }
        self.frames = frames;
        self.cursor = 0;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<DynamicImage, CameraError> {
        if self.cursor >= self.frames.len() {
            if !self.looping || self.frames.is_empty() {
                return Err(CameraError::StreamFailed("end of frames".into()));
            }
            self.cursor = 0;
        }
        let path = &self.frames[self.cursor];
        self.cursor += 1;
        Ok(image::open(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_frame(dir: &Path, name: &str, value: u8) {
        RgbaImage::from_pixel(8, 8, Rgba([value, value, value, 255]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn missing_directory_fails_to_acquire() {
        let mut source = ImageDirSource::new("/definitely/not/here");
        assert!(matches!(source.open(), Err(CameraError::AcquireFailed(_))));
    }

    #[test]
    fn empty_directory_fails_to_acquire() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();
        let mut source = ImageDirSource::new(dir.path());
        assert!(matches!(source.open(), Err(CameraError::AcquireFailed(_))));
    }

    #[test]
    fn frames_play_in_name_order_then_end() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "b.png", 200);
        write_frame(dir.path(), "a.png", 10);
        let mut source = ImageDirSource::new(dir.path());
        source.open().unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().to_rgba8();
        assert_eq!(first.get_pixel(0, 0)[0], 10);
        let second = source.next_frame().unwrap().to_rgba8();
        assert_eq!(second.get_pixel(0, 0)[0], 200);
        assert!(matches!(
            source.next_frame(),
            Err(CameraError::StreamFailed(_))
        ));
    }

    #[test]
    fn looping_source_wraps_around() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "only.png", 42);
        let mut source = ImageDirSource::new(dir.path()).looping(true);
        source.open().unwrap();
        for _ in 0..3 {
            assert!(source.next_frame().is_ok());
        }
    }
}
