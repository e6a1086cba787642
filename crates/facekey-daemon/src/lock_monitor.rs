//! Session lock monitor
//!
//! Polls the OS for the session lock state and gates the capture loop: a
//! locked sample starts it (if not already running), an unlocked sample asks
//! it to stop. Query failures count as unlocked.

use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use facekey_core::LockState;

use crate::capture::{CaptureControl, CaptureLoop};
use crate::error::{DaemonError, Result};
use crate::events::{DaemonEvent, EventBus};

/// Source of the current session lock state
pub trait LockStateProbe: Send {
    fn is_locked(&self) -> Result<bool>;
}

/// Queries the running desktop session
pub struct SystemLockProbe;

impl LockStateProbe for SystemLockProbe {
    #[cfg(target_os = "macos")]
    fn is_locked(&self) -> Result<bool> {
        let output = Command::new("ioreg")
            .args(["-n", "Root", "-d1"])
            .output()
            .map_err(|e| DaemonError::LockQuery(e.to_string()))?;
        if !output.status.success() {
            return Err(DaemonError::LockQuery(format!("ioreg exited with {}", output.status)));
        }
        Ok(parse_ioreg_locked(&String::from_utf8_lossy(&output.stdout)))
    }

    #[cfg(target_os = "linux")]
    fn is_locked(&self) -> Result<bool> {
        let session = std::env::var("XDG_SESSION_ID").unwrap_or_else(|_| "auto".to_string());
        let output = Command::new("loginctl")
            .args(["show-session", &session, "-p", "LockedHint"])
            .output()
            .map_err(|e| DaemonError::LockQuery(e.to_string()))?;
        if !output.status.success() {
            return Err(DaemonError::LockQuery(format!(
                "loginctl exited with {}",
                output.status
            )));
        }
        parse_locked_hint(&String::from_utf8_lossy(&output.stdout))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    fn is_locked(&self) -> Result<bool> {
        Err(DaemonError::LockQuery(
            "lock state query not supported on this platform".to_string(),
        ))
    }
}

/// `"CGSSessionScreenIsLocked" = Yes` in the console session dictionary
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn parse_ioreg_locked(output: &str) -> bool {
    output.lines().any(|line| {
        line.contains("CGSSessionScreenIsLocked")
            && line
                .split_once('=')
                .map_or(false, |(_, value)| value.trim() == "Yes")
    })
}

/// `LockedHint=yes|no` from `loginctl show-session`
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_locked_hint(output: &str) -> Result<bool> {
    let value = output
        .lines()
        .find_map(|line| line.trim().strip_prefix("LockedHint="))
        .ok_or_else(|| DaemonError::LockQuery("LockedHint missing".to_string()))?;
    match value.trim() {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(DaemonError::LockQuery(format!(
            "unexpected LockedHint value {other:?}"
        ))),
    }
}

/// Polling state machine driving the capture loop
pub struct LockMonitor {
    probe: Box<dyn LockStateProbe>,
    capture: Option<Arc<CaptureLoop>>,
    control: Arc<CaptureControl>,
    events: EventBus,
    poll_interval: Duration,
    state: LockState,
    probe_failing: bool,
}

impl LockMonitor {
    /// `capture` is `None` when face unlock is unavailable; the monitor then
    /// only tracks and reports lock transitions.
    pub fn new(
        probe: Box<dyn LockStateProbe>,
        capture: Option<Arc<CaptureLoop>>,
        events: EventBus,
        poll_interval: Duration,
    ) -> Self {
        Self {
            probe,
            capture,
            control: Arc::new(CaptureControl::new()),
            events,
            poll_interval,
            state: LockState::Unlocked,
            probe_failing: false,
        }
    }

    /// Shared capture flags, for status reporting
    pub fn control(&self) -> Arc<CaptureControl> {
        Arc::clone(&self.control)
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// Poll until `shutdown` is set, then stop any running capture (blocking)
    pub fn run(&mut self, shutdown: &AtomicBool) {
        info!(
            "Lock monitor started (poll interval {:?})",
            self.poll_interval
        );

        while !shutdown.load(Ordering::Acquire) {
            self.tick();
            std::thread::sleep(self.poll_interval);
        }

        self.control.request_stop();
        info!("Lock monitor stopped");
    }

    /// One poll: sample, publish transitions, start or stop capture
    pub fn tick(&mut self) {
        let sampled = self.sample();

        if sampled != self.state {
            info!("Session {:?}", sampled);
            self.events.publish(match sampled {
                LockState::Locked => DaemonEvent::Locked,
                LockState::Unlocked => DaemonEvent::Unlocked,
            });
            self.state = sampled;
        }

        match sampled {
            LockState::Locked => self.start_capture(),
            LockState::Unlocked => {
                if self.control.is_running() && !self.control.stop_requested() {
                    debug!("Session unlocked, stopping capture");
                    self.control.request_stop();
                }
            }
        }
    }

    fn sample(&mut self) -> LockState {
        match self.probe.is_locked() {
            Ok(locked) => {
                if self.probe_failing {
                    info!("Lock state query recovered");
                    self.probe_failing = false;
                }
                LockState::from_locked(locked)
            }
            Err(e) => {
                if !self.probe_failing {
                    warn!("Lock state query failed, assuming unlocked: {}", e);
                    self.probe_failing = true;
                }
                LockState::Unlocked
            }
        }
    }

    fn start_capture(&self) {
        let Some(capture) = &self.capture else {
            return;
        };
        if !self.control.try_start() {
            return;
        }

        let capture = Arc::clone(capture);
        let control = Arc::clone(&self.control);
        let spawned = std::thread::Builder::new()
            .name("facekey-capture".to_string())
            .spawn(move || {
                let slot = CaptureSlot(control);
                capture.run(&slot.0);
            });

        if let Err(e) = spawned {
            error!("Failed to spawn capture thread: {}", e);
            self.control.finish();
        }
    }
}

/// Releases the capture slot when the capture thread ends, unwinding included
struct CaptureSlot(Arc<CaptureControl>);

impl Drop for CaptureSlot {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("Capture thread panicked; capture restarts on the next locked poll");
        }
        self.0.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::testing::ScriptedCamera;
    use crate::capture::testing::{bright, dark, fast_settings, CountingEncoder};
    use crate::state::StateStore;
    use crate::unlock::testing::RecordingInjector;
    use crate::unlock::UnlockExecutor;
    use facekey_core::{FaceEncoder, FaceEncoding, FaceMatcher};
    use image::RgbImage;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Instant;
    use tempfile::TempDir;

    /// Plays back a script of samples, then repeats the last one
    #[derive(Clone, Default)]
    struct ScriptedProbe {
        samples: Arc<Mutex<VecDeque<Option<bool>>>>,
        last: Arc<Mutex<Option<bool>>>,
    }

    impl ScriptedProbe {
        fn set(&self, sample: Option<bool>) {
            self.samples.lock().push_back(sample);
        }
    }

    impl LockStateProbe for ScriptedProbe {
        fn is_locked(&self) -> Result<bool> {
            let next = self.samples.lock().pop_front();
            let sample = match next {
                Some(sample) => {
                    *self.last.lock() = sample;
                    sample
                }
                None => *self.last.lock(),
            };
            sample.ok_or_else(|| DaemonError::LockQuery("scripted".to_string()))
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    fn monitor(
        probe: ScriptedProbe,
        camera: ScriptedCamera,
    ) -> (TempDir, LockMonitor, EventBus) {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(StateStore::open(dir.path().join("state.json")));
        let events = EventBus::new();
        let unlocker = Arc::new(UnlockExecutor::new(
            Arc::clone(&state),
            Box::new(RecordingInjector::default()),
            events.clone(),
        ));
        let capture = CaptureLoop::new(
            Arc::new(camera),
            Arc::new(CountingEncoder::default()),
            FaceMatcher::default(),
            state,
            unlocker,
            events.clone(),
            fast_settings(),
        );
        let monitor = LockMonitor::new(
            Box::new(probe),
            Some(Arc::new(capture)),
            events.clone(),
            Duration::from_millis(10),
        );
        (dir, monitor, events)
    }

    #[test]
    fn test_parse_ioreg_locked() {
        let locked = r#"    | {
    |   "IOConsoleUsers" = ({"CGSSessionScreenIsLocked"=Yes,"kCGSSessionOnConsoleKey"=Yes})
    |   "CGSSessionScreenIsLocked" = Yes
    | }"#;
        assert!(parse_ioreg_locked(locked));
        assert!(!parse_ioreg_locked(r#"  "CGSSessionScreenIsLocked" = No"#));
        assert!(!parse_ioreg_locked("nothing here"));
    }

    #[test]
    fn test_parse_locked_hint() {
        assert!(parse_locked_hint("LockedHint=yes\n").unwrap());
        assert!(!parse_locked_hint("LockedHint=no\n").unwrap());
        assert!(parse_locked_hint("Id=3\n").is_err());
        assert!(parse_locked_hint("LockedHint=maybe\n").is_err());
    }

    #[test]
    fn test_lock_starts_capture_once() {
        let probe = ScriptedProbe::default();
        let camera = ScriptedCamera::with_frames(vec![dark(16)]);
        let (_dir, mut monitor, _events) = monitor(probe.clone(), camera.clone());

        probe.set(Some(true));
        monitor.tick();
        monitor.tick();
        monitor.tick();

        let control = monitor.control();
        assert!(wait_until(|| camera.opens() == 1, Duration::from_secs(2)));
        assert!(control.is_running());
        assert_eq!(camera.opens(), 1);

        control.request_stop();
        assert!(wait_until(|| !control.is_running(), Duration::from_millis(500)));
    }

    #[test]
    fn test_unlock_stops_capture_then_relock_restarts() {
        let probe = ScriptedProbe::default();
        let camera = ScriptedCamera::with_frames(vec![dark(16)]);
        let (_dir, mut monitor, events) = monitor(probe.clone(), camera.clone());
        let mut rx = events.subscribe();
        let control = monitor.control();

        probe.set(Some(true));
        monitor.tick();
        assert!(wait_until(|| camera.reads() > 0, Duration::from_secs(2)));

        probe.set(Some(false));
        monitor.tick();
        // One frame read plus the inter-frame sleep, with slack for the scheduler
        assert!(wait_until(|| !control.is_running(), Duration::from_millis(500)));

        probe.set(Some(true));
        monitor.tick();
        assert!(wait_until(|| camera.opens() == 2, Duration::from_secs(2)));

        probe.set(Some(false));
        monitor.tick();
        assert!(wait_until(|| !control.is_running(), Duration::from_millis(500)));

        let mut transitions = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if matches!(event, DaemonEvent::Locked | DaemonEvent::Unlocked) {
                transitions.push(event);
            }
        }
        assert_eq!(
            transitions,
            vec![
                DaemonEvent::Locked,
                DaemonEvent::Unlocked,
                DaemonEvent::Locked,
                DaemonEvent::Unlocked
            ]
        );
    }

    /// Panics on every detection attempt, as a crashing native backend would
    struct PanickingEncoder;

    impl FaceEncoder for PanickingEncoder {
        fn encode(&self, _image: &RgbImage) -> facekey_core::Result<Vec<FaceEncoding>> {
            panic!("encoder crashed");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    #[test]
    fn test_capture_panic_releases_slot_for_next_poll() {
        let dir = TempDir::new().unwrap();
        let state = Arc::new(StateStore::open(dir.path().join("state.json")));
        let events = EventBus::new();
        let unlocker = Arc::new(UnlockExecutor::new(
            Arc::clone(&state),
            Box::new(RecordingInjector::default()),
            events.clone(),
        ));
        // Dark then bright: the second frame is motion and reaches the encoder
        let camera = ScriptedCamera::with_frames(vec![dark(32), bright(32)]);
        let capture = CaptureLoop::new(
            Arc::new(camera.clone()),
            Arc::new(PanickingEncoder),
            FaceMatcher::default(),
            state,
            unlocker,
            events.clone(),
            fast_settings(),
        );
        let probe = ScriptedProbe::default();
        let mut monitor = LockMonitor::new(
            Box::new(probe.clone()),
            Some(Arc::new(capture)),
            events,
            Duration::from_millis(10),
        );
        let control = monitor.control();

        probe.set(Some(true));
        monitor.tick();
        assert!(wait_until(|| camera.reads() >= 2, Duration::from_secs(2)));
        assert!(wait_until(|| !control.is_running(), Duration::from_secs(2)));

        monitor.tick();
        assert!(wait_until(|| camera.opens() == 2, Duration::from_secs(2)));
        assert!(control.is_running());

        control.request_stop();
        assert!(wait_until(|| !control.is_running(), Duration::from_millis(500)));
    }

    #[test]
    fn test_query_failure_counts_as_unlocked() {
        let probe = ScriptedProbe::default();
        let camera = ScriptedCamera::with_frames(vec![dark(16)]);
        let (_dir, mut monitor, _events) = monitor(probe.clone(), camera.clone());

        probe.set(None);
        monitor.tick();
        monitor.tick();

        assert_eq!(monitor.state(), LockState::Unlocked);
        assert_eq!(camera.opens(), 0);
    }

    #[test]
    fn test_without_capture_only_tracks_state() {
        let probe = ScriptedProbe::default();
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let mut monitor = LockMonitor::new(
            Box::new(probe.clone()),
            None,
            events,
            Duration::from_millis(10),
        );

        probe.set(Some(true));
        monitor.tick();

        assert_eq!(monitor.state(), LockState::Locked);
        assert!(!monitor.control().is_running());
        assert_eq!(rx.try_recv().unwrap(), DaemonEvent::Locked);
    }

    #[test]
    fn test_run_exits_on_shutdown() {
        let probe = ScriptedProbe::default();
        probe.set(Some(false));
        let (_dir, mut monitor, _events) = monitor(probe, ScriptedCamera::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || monitor.run(&shutdown))
        };
        std::thread::sleep(Duration::from_millis(30));
        shutdown.store(true, Ordering::Release);
        handle.join().unwrap();
    }
}
