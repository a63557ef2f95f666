use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Replays a directory of still images as captured frames.
///
/// Files are taken in lexical order. The first image fixes the frame
/// size; later images of a different size are resized to it.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    width: u32,
    height: u32,
}

impl ImageSequenceSource {
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        paths.sort();

        let first = paths.first().ok_or_else(|| {
            CaptureError::Failed(format!("no images found in {}", dir.display()))
        })?;
        let (width, height) = image::image_dimensions(first)?;
        log::debug!(
            "Image sequence: {} files at {width}x{height} from {}",
            paths.len(),
            dir.display()
        );

        Ok(Self {
            paths,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture(&mut self, index: usize, timestamp: Duration) -> Result<Frame, CaptureError> {
        let path = self.paths.get(index).ok_or(CaptureError::Exhausted)?;
        let img = image::open(path)?.to_rgb8();

        let img = if img.dimensions() != (self.width, self.height) {
            log::debug!(
                "Resizing {} from {:?} to {}x{}",
                path.display(),
                img.dimensions(),
                self.width,
                self.height
            );
            image::imageops::resize(
                &img,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            )
        } else {
            img
        };

        Ok(Frame::new(
            img.into_raw(),
            self.width,
            self.height,
            3,
            index,
            timestamp,
        ))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
