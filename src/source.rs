use image::{DynamicImage, ImageReader};
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame source is exhausted")]
    Exhausted,
    #[error("failed to decode frame {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Yields camera frames, blocking until the next one is available
pub trait FrameSource {
    fn read(&mut self) -> Result<DynamicImage, FrameError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn read(&mut self) -> Result<DynamicImage, FrameError> {
        (**self).read()
    }
}

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Frames read from the image files of a directory, in file name order
pub struct ImageSequenceSource {
    frames: Vec<PathBuf>,
    next: usize,
    cycle: bool,
}

impl ImageSequenceSource {
    /// List the images in `dir`. With `cycle` the sequence restarts when it
    /// runs out instead of reporting exhaustion.
    pub fn open(dir: &Path, cycle: bool) -> anyhow::Result<Self> {
        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Failed to read frame directory {}: {}", dir.display(), e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        frames.sort();

        if frames.is_empty() {
            anyhow::bail!("No image frames found in {}", dir.display());
        }

        debug!("Frame sequence: {} images from {}", frames.len(), dir.display());
        Ok(Self {
            frames,
            next: 0,
            cycle,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<DynamicImage, FrameError> {
        if self.next >= self.frames.len() {
            if !self.cycle || self.frames.is_empty() {
                return Err(FrameError::Exhausted);
            }
            self.next = 0;
        }

        let path = &self.frames[self.next];
        self.next += 1;

        ImageReader::open(path)?
            .decode()
            .map_err(|e| FrameError::Decode {
                path: path.clone(),
                message: e.to_string(),
            })
    }
}

/// The same frame over and over
pub struct StaticFrameSource {
    frame: DynamicImage,
}

impl StaticFrameSource {
    pub fn new(frame: DynamicImage) -> Self {
        Self { frame }
    }

    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let frame = ImageReader::open(path)?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
        Ok(Self::new(frame))
    }
}

impl FrameSource for StaticFrameSource {
    fn read(&mut self) -> Result<DynamicImage, FrameError> {
        Ok(self.frame.clone())
    }
}
