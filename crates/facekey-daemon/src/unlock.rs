//! Unlock executor
//!
//! The only component that touches the OS automation channel. It wakes the
//! display and types the stored credential followed by return into the login
//! prompt. Everything else asks for an unlock through [`UnlockExecutor`].

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use zeroize::Zeroize;

use crate::error::{DaemonError, Result};
use crate::events::{DaemonEvent, EventBus};
use crate::state::StateStore;

/// Privileged keystroke injection into the OS login prompt
pub trait CredentialInjector: Send + Sync {
    /// Wake the display and type `credential` followed by a confirm key
    fn inject(&self, credential: &str) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Escape a string for embedding in an AppleScript string literal
pub fn escape_applescript(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// AppleScript that types the (already escaped) credential and presses return
pub fn applescript_unlock_script(escaped_credential: &str) -> String {
    format!(
        "tell application \"System Events\"\n\
         \tdelay 1.0\n\
         \tkeystroke \"{escaped_credential}\"\n\
         \tdelay 0.2\n\
         \tkeystroke return\n\
         end tell\n"
    )
}

/// macOS: `caffeinate` to wake, `osascript` (script on stdin) to type
pub struct AppleScriptInjector;

impl CredentialInjector for AppleScriptInjector {
    fn inject(&self, credential: &str) -> Result<()> {
        // Keep the display awake while typing; not waited on
        match Command::new("caffeinate").args(["-u", "-t", "5"]).spawn() {
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => warn!("Failed to wake display: {}", e),
        }

        let mut escaped = escape_applescript(credential);
        let mut script = applescript_unlock_script(&escaped);
        escaped.zeroize();

        let result = run_with_stdin(Command::new("osascript").arg("-"), script.as_bytes());
        script.zeroize();
        result
    }

    fn name(&self) -> &'static str {
        "applescript"
    }
}

/// X11: `xset` to wake, `xdotool` (credential on stdin) to type
pub struct XdotoolInjector;

impl CredentialInjector for XdotoolInjector {
    fn inject(&self, credential: &str) -> Result<()> {
        if let Err(e) = Command::new("xset").args(["dpms", "force", "on"]).status() {
            warn!("Failed to wake display: {}", e);
        }

        std::thread::sleep(std::time::Duration::from_millis(1000));

        run_with_stdin(
            Command::new("xdotool").args(["type", "--clearmodifiers", "--file", "-"]),
            credential.as_bytes(),
        )?;

        std::thread::sleep(std::time::Duration::from_millis(200));

        let status = Command::new("xdotool")
            .args(["key", "Return"])
            .status()
            .map_err(|e| DaemonError::AutomationInjection(e.to_string()))?;
        if !status.success() {
            return Err(DaemonError::AutomationInjection(format!(
                "xdotool key exited with {}",
                status
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "xdotool"
    }
}

/// Platforms without a supported automation channel
pub struct UnsupportedInjector;

impl CredentialInjector for UnsupportedInjector {
    fn inject(&self, _credential: &str) -> Result<()> {
        Err(DaemonError::AutomationInjection(
            "no credential injection support on this platform".to_string(),
        ))
    }

    fn name(&self) -> &'static str {
        "unsupported"
    }
}

/// Injector for the current platform
pub fn platform_injector() -> Box<dyn CredentialInjector> {
    #[cfg(target_os = "macos")]
    return Box::new(AppleScriptInjector);

    #[cfg(target_os = "linux")]
    return Box::new(XdotoolInjector);

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    return Box::new(UnsupportedInjector);
}

fn run_with_stdin(command: &mut Command, input: &[u8]) -> Result<()> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DaemonError::AutomationInjection(e.to_string()))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input)
            .map_err(|e| DaemonError::AutomationInjection(e.to_string()))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| DaemonError::AutomationInjection(e.to_string()))?;

    if !output.status.success() {
        return Err(DaemonError::AutomationInjection(format!(
            "{} ({})",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

/// Clears the in-flight flag when an unlock attempt ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Single entry point for performing an unlock
pub struct UnlockExecutor {
    state: Arc<StateStore>,
    injector: Box<dyn CredentialInjector>,
    events: EventBus,
    in_flight: AtomicBool,
}

impl UnlockExecutor {
    pub fn new(
        state: Arc<StateStore>,
        injector: Box<dyn CredentialInjector>,
        events: EventBus,
    ) -> Self {
        Self {
            state,
            injector,
            events,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Type the stored credential into the login prompt (blocking)
    ///
    /// Refuses when no password is stored, and fails fast with
    /// [`DaemonError::UnlockInProgress`] while another unlock is typing.
    pub fn unlock(&self) -> Result<()> {
        let Some(mut password) = self.state.password() else {
            warn!("Unlock refused: no password stored");
            self.events.publish(DaemonEvent::CredentialMissing);
            return Err(DaemonError::CredentialMissing);
        };

        if self.in_flight.swap(true, Ordering::AcqRel) {
            password.zeroize();
            debug!("Unlock already in progress");
            return Err(DaemonError::UnlockInProgress);
        }
        let _guard = InFlight(&self.in_flight);

        info!("Performing unlock via {}", self.injector.name());
        let result = self.injector.inject(&password);
        password.zeroize();

        match &result {
            Ok(()) => {
                info!("Unlock keystrokes delivered");
                self.events.publish(DaemonEvent::UnlockPerformed);
            }
            Err(e) => {
                error!("Unlock failed: {}", e);
                self.events.publish(DaemonEvent::UnlockFailed {
                    reason: e.to_string(),
                });
            }
        }

        result
    }
}
