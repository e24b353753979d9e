use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Tunables for [`crate::detection::SurfaceDetector`]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorParams {
    /// Working height frames are resized to before edge extraction
    pub processing_height: u32,
    pub bilateral_window: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_spatial: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// How many of the largest contours are tried as the surface outline
    pub max_candidates: usize,
    /// Polygon approximation tolerance as a fraction of the contour perimeter
    pub poly_accuracy: f64,
    /// Minimum relative area for a surface to be accepted
    pub cutoff: f64,
    pub output_height: u32,
    /// Output width as a multiple of `output_height`
    pub aspect: f64,
    /// Write stage images for every detection into this directory
    pub debug_out: Option<PathBuf>,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            processing_height: 300,
            bilateral_window: 11,
            bilateral_sigma_color: 17.0,
            bilateral_sigma_spatial: 17.0,
            canny_low: 30.0,
            canny_high: 200.0,
            max_candidates: 5,
            poly_accuracy: 0.02,
            cutoff: 0.03,
            output_height: 800,
            aspect: 1.8,
            debug_out: None,
        }
    }
}

impl DetectorParams {
    /// Fixed rectified output size, `(width, height)`
    pub fn output_size(&self) -> (u32, u32) {
        let height = self.output_height;
        let width = (self.aspect * height as f64).round() as u32;
        (width, height)
    }
}

/// Tunables for [`crate::acquisition::AcquisitionLoop`]
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AcquisitionParams {
    /// Seconds to count down from
    pub countdown: u32,
    /// Height every displayed buffer is resized to
    pub display_height: u32,
}

impl Default for AcquisitionParams {
    fn default() -> Self {
        Self {
            countdown: 10,
            display_height: 300,
        }
    }
}

/// Top-level TOML configuration file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub detector: DetectorParams,
    pub acquisition: AcquisitionParams,
}

impl Config {
    /// Load from a TOML file; missing keys fall back to defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config {}: {}", path.display(), e)
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Invalid config: {}", e))
    }
}
