use image::DynamicImage;
use log::debug;
use std::path::PathBuf;
use thiserror::Error;

/// Buffer showing the live frame with the countdown
pub const ORIGINAL: &str = "Original";
/// Buffer showing the detected outline, or the "not found" marker
pub const CONTOURED: &str = "Contoured";
/// Buffer showing the rectified surface
pub const TRANSFORMED: &str = "Transformed";

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What one acquisition tick hands to the display
#[derive(Debug, Clone)]
pub struct TickDisplay {
    pub countdown: DynamicImage,
    pub contoured: DynamicImage,
    /// Latest rectification, fresh or retained; `None` until one exists
    pub rectified: Option<DynamicImage>,
}

impl TickDisplay {
    /// Named buffers in presentation order
    pub fn buffers(&self) -> Vec<(&'static str, &DynamicImage)> {
        let mut buffers = vec![(ORIGINAL, &self.countdown), (CONTOURED, &self.contoured)];
        if let Some(rectified) = &self.rectified {
            buffers.push((TRANSFORMED, rectified));
        }
        buffers
    }
}

/// Presents named image buffers
pub trait DisplaySink {
    fn show(&mut self, name: &str, image: &DynamicImage) -> Result<(), DisplayError>;

    fn present(&mut self, display: &TickDisplay) -> Result<(), DisplayError> {
        for (name, image) in display.buffers() {
            self.show(name, image)?;
        }
        Ok(())
    }

    /// Release whatever the sink holds open
    fn close(&mut self) {}
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn show(&mut self, name: &str, image: &DynamicImage) -> Result<(), DisplayError> {
        (**self).show(name, image)
    }

    fn present(&mut self, display: &TickDisplay) -> Result<(), DisplayError> {
        (**self).present(display)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Discards everything
pub struct NullSink;

impl DisplaySink for NullSink {
    fn show(&mut self, _name: &str, _image: &DynamicImage) -> Result<(), DisplayError> {
        Ok(())
    }
}

/// Writes each buffer to `<dir>/<name>.png`, replacing the previous tick's.
///
/// With history enabled every tick is also kept as `<tick>_<name>.png`.
pub struct DirectorySink {
    output_dir: PathBuf,
    history: bool,
    tick: usize,
}

impl DirectorySink {
    pub fn new(output_dir: PathBuf) -> Result<Self, DisplayError> {
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            output_dir,
            history: false,
            tick: 0,
        })
    }

    pub fn with_history(mut self, history: bool) -> Self {
        self.history = history;
        self
    }

    pub fn ticks(&self) -> usize {
        self.tick
    }

    fn write(&self, file_name: String, image: &DynamicImage) -> Result<(), DisplayError> {
        let path = self.output_dir.join(file_name);
        image
            .save(&path)
            .map_err(|source| DisplayError::Write { path, source })
    }
}

impl DisplaySink for DirectorySink {
    fn show(&mut self, name: &str, image: &DynamicImage) -> Result<(), DisplayError> {
        let stem = name.to_lowercase().replace(' ', "_");
        self.write(format!("{}.png", stem), image)?;
        if self.history {
            self.write(format!("{:04}_{}.png", self.tick, stem), image)?;
        }
        Ok(())
    }

    fn present(&mut self, display: &TickDisplay) -> Result<(), DisplayError> {
        self.tick += 1;
        for (name, image) in display.buffers() {
            self.show(name, image)?;
        }
        Ok(())
    }

    fn close(&mut self) {
        debug!(
            "Display closed after {} ticks ({})",
            self.tick,
            self.output_dir.display()
        );
    }
}
