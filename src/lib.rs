pub mod acquisition;
pub mod config;
pub mod detection;
pub mod display;
pub mod geometry;
pub mod models;
pub mod overlay;
pub mod source;

pub use acquisition::{
    AcquisitionError, AcquisitionLoop, AcquisitionState, CancelFlag, Clock, Countdown,
    InteractionSource, NeverCancel, Phase, SessionError, SystemClock, TickReport,
};
pub use config::{AcquisitionParams, Config, DetectorParams};
pub use detection::{Detect, DetectionMiss, SurfaceDetector};
pub use display::{DirectorySink, DisplaySink, NullSink, TickDisplay};
pub use models::{ColumnRange, PlayingSurface, Point2D, Quadrilateral};
pub use source::{FrameError, FrameSource, ImageSequenceSource, StaticFrameSource};
