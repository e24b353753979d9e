//! Countdown-gated acquisition loop.
//!
//! Every tick reads one frame, runs detection on it, and hands the display a
//! countdown frame, an outline (or "not found") frame, and the most recent
//! rectification. The last good surface is kept across ticks where detection
//! fails and is returned when the countdown runs out or the user cancels.

use image::DynamicImage;
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::AcquisitionParams;
use crate::detection::Detect;
use crate::detection::preprocessing::resize_to_height;
use crate::display::{DisplayError, DisplaySink, TickDisplay};
use crate::models::PlayingSurface;
use crate::overlay;
use crate::source::{FrameError, FrameSource};

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("frame acquisition failed: {0}")]
    Frame(#[from] FrameError),
    #[error("display failed: {0}")]
    Display(#[from] DisplayError),
}

/// A session that ended on an error, with whatever surface it had already found
#[derive(Debug, Error)]
#[error("acquisition stopped: {source}")]
pub struct SessionError {
    #[source]
    pub source: AcquisitionError,
    pub held: Option<Box<PlayingSurface>>,
}

impl SessionError {
    /// Frames ran out before the countdown did
    pub fn is_exhausted(&self) -> bool {
        matches!(self.source, AcquisitionError::Frame(FrameError::Exhausted))
    }
}

/// Non-blocking check for a user cancel request
pub trait InteractionSource {
    fn cancel_requested(&mut self) -> bool;
}

pub struct NeverCancel;

impl InteractionSource for NeverCancel {
    fn cancel_requested(&mut self) -> bool {
        false
    }
}

/// Cancel switch that can be flipped from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl InteractionSource for CancelFlag {
    fn cancel_requested(&mut self) -> bool {
        self.is_cancelled()
    }
}

/// Monotonic time since some fixed origin
pub trait Clock {
    fn now(&mut self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&mut self) -> Duration {
        self.origin.elapsed()
    }
}

/// Coarse one-second countdown.
///
/// Starts one above the requested count and drops by one whenever at least
/// a second has passed since the last drop, so the first tick that is a
/// second late shows the requested value. Shorter gaps never decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    reference: Duration,
}

impl Countdown {
    const STEP: Duration = Duration::from_secs(1);

    pub fn new(requested: u32, now: Duration) -> Self {
        Self {
            remaining: requested.saturating_add(1),
            reference: now,
        }
    }

    /// Decrement if a full second has passed; returns whether it did
    pub fn update(&mut self, now: Duration) -> bool {
        if self.remaining > 0 && now.saturating_sub(self.reference) >= Self::STEP {
            self.remaining -= 1;
            self.reference = now;
            true
        } else {
            false
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing detected yet
    Searching,
    /// A surface is held and detection keeps running
    Tracking,
    /// The loop has exited
    Stopped,
}

/// State of one acquisition session
#[derive(Debug, Clone)]
pub struct AcquisitionState {
    pub countdown: Countdown,
    pub held: Option<PlayingSurface>,
    pub phase: Phase,
    pub ticks: usize,
}

impl AcquisitionState {
    pub fn new(requested: u32, now: Duration) -> Self {
        Self {
            countdown: Countdown::new(requested, now),
            held: None,
            phase: Phase::Searching,
            ticks: 0,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }

    /// Replace the held surface wholesale
    fn hold(&mut self, surface: PlayingSurface) {
        self.held = Some(surface);
        if self.phase == Phase::Searching {
            self.phase = Phase::Tracking;
        }
    }

    fn stop(&mut self) {
        self.phase = Phase::Stopped;
    }
}

/// Outcome of a single tick
#[derive(Debug, Clone)]
pub struct TickReport {
    /// 1-based tick number
    pub tick: usize,
    /// Countdown value drawn on this tick
    pub countdown: u32,
    /// Whether this tick's frame produced a surface
    pub detected: bool,
    pub display: TickDisplay,
}

/// Drives detection against a frame source until the countdown expires
pub struct AcquisitionLoop<F, D, S, I, C = SystemClock> {
    source: F,
    detector: D,
    sink: S,
    interaction: I,
    clock: C,
    params: AcquisitionParams,
}

impl<F, D, S, I> AcquisitionLoop<F, D, S, I, SystemClock>
where
    F: FrameSource,
    D: Detect,
    S: DisplaySink,
    I: InteractionSource,
{
    pub fn new(source: F, detector: D, sink: S, interaction: I) -> Self {
        Self {
            source,
            detector,
            sink,
            interaction,
            clock: SystemClock::new(),
            params: AcquisitionParams::default(),
        }
    }
}

impl<F, D, S, I, C> AcquisitionLoop<F, D, S, I, C>
where
    F: FrameSource,
    D: Detect,
    S: DisplaySink,
    I: InteractionSource,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> AcquisitionLoop<F, D, S, I, C2> {
        AcquisitionLoop {
            source: self.source,
            detector: self.detector,
            sink: self.sink,
            interaction: self.interaction,
            clock,
            params: self.params,
        }
    }

    pub fn with_params(mut self, params: AcquisitionParams) -> Self {
        self.params = params;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run a full session and return the last surface detected, if any.
    ///
    /// A failing tick ends the session; the surface held up to that point
    /// travels with the error.
    pub fn run(&mut self, requested: u32) -> Result<Option<PlayingSurface>, SessionError> {
        let mut state = self.start(requested);
        let outcome = self.run_session(&mut state);
        let held = self.finish(state);
        match outcome {
            Ok(()) => Ok(held),
            Err(source) => Err(SessionError {
                source,
                held: held.map(Box::new),
            }),
        }
    }

    fn run_session(&mut self, state: &mut AcquisitionState) -> Result<(), AcquisitionError> {
        while !state.is_stopped() {
            self.tick(state)?;
        }
        Ok(())
    }

    /// Begin a session counting down from `requested`
    pub fn start(&mut self, requested: u32) -> AcquisitionState {
        info!("Acquiring playing surface, countdown {}", requested);
        AcquisitionState::new(requested, self.clock.now())
    }

    /// Close the display and hand back the held surface
    pub fn finish(&mut self, mut state: AcquisitionState) -> Option<PlayingSurface> {
        state.stop();
        self.sink.close();
        match &state.held {
            Some(surface) => info!(
                "Acquisition finished after {} ticks with a surface (relative area {:.4})",
                state.ticks, surface.relative_area
            ),
            None => info!(
                "Acquisition finished after {} ticks without a surface",
                state.ticks
            ),
        }
        state.held
    }

    /// One iteration: read, detect, count down, display, poll for cancel
    pub fn tick(&mut self, state: &mut AcquisitionState) -> Result<TickReport, AcquisitionError> {
        let frame = self.source.read()?;
        let surface = self.detector.detect(&frame);

        let display_height = self.params.display_height;
        let live = resize_to_height(&frame, display_height).to_rgb8();

        state.countdown.update(self.clock.now());
        let count = state.countdown.remaining();
        let mut countdown_frame = live.clone();
        overlay::draw_countdown(&mut countdown_frame, count);
        let countdown = DynamicImage::ImageRgb8(countdown_frame);

        let detected = surface.is_some();
        let display = match surface {
            Some(surface) => {
                let display = TickDisplay {
                    countdown,
                    contoured: resize_to_height(&surface.annotated(), display_height),
                    rectified: Some(resize_to_height(&surface.rectified(), display_height)),
                };
                state.hold(surface);
                display
            }
            None => {
                let mut not_found = live;
                overlay::draw_not_found(&mut not_found);
                TickDisplay {
                    countdown,
                    contoured: DynamicImage::ImageRgb8(not_found),
                    rectified: state
                        .held
                        .as_ref()
                        .map(|held| resize_to_height(&held.rectified(), display_height)),
                }
            }
        };

        self.sink.present(&display)?;
        state.ticks += 1;
        debug!(
            "Tick {}: countdown={}, detected={}, holding={}",
            state.ticks,
            count,
            detected,
            state.held.is_some()
        );

        if state.countdown.is_finished() {
            state.stop();
        }
        if self.interaction.cancel_requested() {
            info!("Acquisition cancelled at countdown {}", count);
            state.stop();
        }

        Ok(TickReport {
            tick: state.ticks,
            countdown: count,
            detected,
            display,
        })
    }
}
