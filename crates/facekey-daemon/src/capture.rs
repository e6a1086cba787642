//! Motion-gated face capture and match loop
//!
//! While the session is locked the loop pulls frames from the camera, scores
//! motion against the previous frame, and only runs face detection when the
//! score clears the threshold. The first match unlocks, cools down, and ends
//! the loop.
//!
//! Cancellation is cooperative: [`CaptureControl::request_stop`] sets a flag
//! that the loop checks once per iteration. Stop latency is therefore one
//! frame read plus the inter-frame sleep (100 ms by default). Frame reads have
//! no timeout, so a stalled camera driver delays the stop until it returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use facekey_core::frame::downscale;
use facekey_core::{FaceEncoder, FaceMatcher, MotionDetector, MotionParams};

use crate::camera::{CameraFactory, FrameSource};
use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::events::{DaemonEvent, EventBus};
use crate::state::StateStore;
use crate::unlock::UnlockExecutor;

/// Timing and gating parameters for the capture loop
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub frame_interval: Duration,
    pub camera_backoff: Duration,
    pub match_cooldown: Duration,
    pub motion_threshold: u64,
    pub motion: MotionParams,
    pub downscale: f32,
}

impl From<&DaemonConfig> for CaptureSettings {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            frame_interval: config.frame_interval(),
            camera_backoff: config.camera_backoff(),
            match_cooldown: config.match_cooldown(),
            motion_threshold: config.motion_threshold,
            motion: config.motion_params(),
            downscale: config.downscale,
        }
    }
}

/// Running/stop flags shared between the monitor and the capture thread
#[derive(Debug, Default)]
pub struct CaptureControl {
    running: AtomicBool,
    stop: AtomicBool,
}

impl CaptureControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the single capture slot; false if a loop is already running
    pub fn try_start(&self) -> bool {
        let claimed = self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if claimed {
            self.stop.store(false, Ordering::Release);
        }
        claimed
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the running loop to exit at its next iteration
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Release the capture slot
    pub fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Why a capture run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Stop was requested (session unlocked)
    Stopped,
    /// A face matched and the unlock executor was invoked
    Matched,
    /// The camera could not be opened
    CameraUnavailable,
    /// A frame could not be read or processed
    Failed(String),
}

/// Result of a single loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// First frame or resolution change
    Baseline,
    /// Motion at or below threshold; detection skipped
    Still,
    /// Motion but no face in view
    NoFace,
    /// Faces seen, none enrolled
    NoMatch,
    /// An enrolled face matched
    Matched,
}

/// The capture/match pipeline
pub struct CaptureLoop {
    camera: Arc<dyn CameraFactory>,
    encoder: Arc<dyn FaceEncoder>,
    matcher: FaceMatcher,
    state: Arc<StateStore>,
    unlocker: Arc<UnlockExecutor>,
    events: EventBus,
    settings: CaptureSettings,
}

impl CaptureLoop {
    pub fn new(
        camera: Arc<dyn CameraFactory>,
        encoder: Arc<dyn FaceEncoder>,
        matcher: FaceMatcher,
        state: Arc<StateStore>,
        unlocker: Arc<UnlockExecutor>,
        events: EventBus,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            camera,
            encoder,
            matcher,
            state,
            unlocker,
            events,
            settings,
        }
    }

    /// Run until stopped, matched, or the camera fails (blocking)
    ///
    /// Never panics on camera or encoder errors; they end the run and are
    /// reported through the returned outcome.
    pub fn run(&self, control: &CaptureControl) -> CaptureOutcome {
        info!("Capture loop starting");
        self.events.publish(DaemonEvent::CaptureStarted);

        let outcome = match self.camera.open() {
            Ok(mut camera) => self.scan(camera.as_mut(), control),
            Err(e) => {
                warn!("Failed to open camera: {}", e);
                std::thread::sleep(self.settings.camera_backoff);
                CaptureOutcome::CameraUnavailable
            }
        };

        info!("Capture loop stopped: {:?}", outcome);
        self.events.publish(DaemonEvent::CaptureStopped);
        outcome
    }

    fn scan(&self, camera: &mut dyn FrameSource, control: &CaptureControl) -> CaptureOutcome {
        let mut motion = MotionDetector::new(self.settings.motion);

        while !control.stop_requested() {
            match self.iterate(camera, &mut motion) {
                Ok(Step::Matched) => {
                    if let Err(e) = self.unlocker.unlock() {
                        warn!("Face matched but unlock did not complete: {}", e);
                    }
                    // No further matching this lock session
                    std::thread::sleep(self.settings.match_cooldown);
                    return CaptureOutcome::Matched;
                }
                Ok(step) => debug!("Capture step: {:?}", step),
                Err(e) => {
                    error!("Capture iteration failed: {}", e);
                    return CaptureOutcome::Failed(e.to_string());
                }
            }

            std::thread::sleep(self.settings.frame_interval);
        }

        CaptureOutcome::Stopped
    }

    fn iterate(&self, camera: &mut dyn FrameSource, motion: &mut MotionDetector) -> Result<Step> {
        let frame = camera.read_frame()?;

        let Some(score) = motion.score(&frame) else {
            return Ok(Step::Baseline);
        };

        if score <= self.settings.motion_threshold {
            return Ok(Step::Still);
        }

        debug!("Motion detected (score {}), looking for faces", score);
        let small = downscale(&frame, self.settings.downscale);
        let encodings = self
            .encoder
            .encode(&small)
            .map_err(|e| DaemonError::Encoder(e.to_string()))?;

        if encodings.is_empty() {
            return Ok(Step::NoFace);
        }

        debug!("Found {} face(s), comparing", encodings.len());
        let known = self.state.enrollments();
        if encodings.iter().any(|e| self.matcher.is_match(e, &known)) {
            info!("Face recognized");
            self.events.publish(DaemonEvent::MatchSucceeded);
            return Ok(Step::Matched);
        }

        info!("Face not recognized");
        self.events.publish(DaemonEvent::MatchFailed);
        Ok(Step::NoMatch)
    }
}
