//! Image sequence frame source

use super::FrameBuffer;
use crate::{LedToneError, Result};
use std::path::{Path, PathBuf};

/// File extensions picked up by [`ImageSequence::from_dir`]
pub const FRAME_EXTENSIONS: &[&str] = &["png", "bmp"];

/// Ordered image files decoded one frame at a time
///
/// Every file is checked for existence when the sequence is built, so a
/// missing frame fails the pass before anything is written to a link.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    width: usize,
    height: usize,
    next: usize,
}

impl ImageSequence {
    /// Build from explicit paths
    pub fn from_paths(paths: Vec<PathBuf>, width: usize, height: usize) -> Result<Self> {
        if paths.is_empty() {
            return Err(LedToneError::FrameError("no frames supplied".into()));
        }
        if let Some(missing) = paths.iter().find(|p| !p.is_file()) {
            return Err(LedToneError::FrameError(format!(
                "missing frame image {}",
                missing.display()
            )));
        }
        Ok(ImageSequence {
            paths,
            width,
            height,
            next: 0,
        })
    }

    /// Build from every frame image in `dir`, sorted by file name
    pub fn from_dir(dir: impl AsRef<Path>, width: usize, height: usize) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                paths.push(path);
            }
        }
        paths.sort();
        Self::from_paths(paths, width, height)
    }

    /// Number of frames
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the sequence has no frames
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Decode frame `index`
    pub fn load(&self, index: usize) -> Result<FrameBuffer> {
        let path = self.paths.get(index).ok_or_else(|| {
            LedToneError::FrameError(format!("frame {} out of range", index))
        })?;
        let img = image::open(path)?.to_rgb8();
        let frame = FrameBuffer::from_rgb_image(&img);
        if frame.width != self.width || frame.height != self.height {
            return Err(LedToneError::FrameError(format!(
                "{} is {}x{}, expected {}x{}",
                path.display(),
                frame.width,
                frame.height,
                self.width,
                self.height
            )));
        }
        Ok(frame)
    }
}

impl Iterator for ImageSequence {
    type Item = Result<FrameBuffer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.paths.len() {
            return None;
        }
        let frame = self.load(self.next);
        self.next += 1;
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, rgb: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        image::RgbImage::from_pixel(w, h, image::Rgb(rgb))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_missing_frame_fails_up_front() {
        let dir = TempDir::new().unwrap();
        let good = write_png(dir.path(), "0001.png", 2, 2, [0, 0, 0]);
        let result = ImageSequence::from_paths(vec![good, dir.path().join("0002.png")], 2, 2);
        assert!(matches!(result, Err(LedToneError::FrameError(_))));
    }

    #[test]
    fn test_from_dir_sorted_and_decoded() {
        let dir = TempDir::new().unwrap();
        write_png(dir.path(), "0002.png", 2, 2, [0, 0, 200]);
        write_png(dir.path(), "0001.png", 2, 2, [200, 0, 0]);
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let frames: Vec<FrameBuffer> = ImageSequence::from_dir(dir.path(), 2, 2)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].pixel(0, 0), [200, 0, 0]);
        assert_eq!(frames[1].pixel(1, 1), [0, 0, 200]);
    }

    #[test]
    fn test_wrong_dimensions_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_png(dir.path(), "big.png", 4, 4, [1, 2, 3]);
        let seq = ImageSequence::from_paths(vec![path], 2, 2).unwrap();
        assert!(matches!(seq.load(0), Err(LedToneError::FrameError(_))));
    }
}
