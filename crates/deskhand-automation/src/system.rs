//! The real desktop: files through `std::fs`, applications through process
//! spawning, and input through `xdotool` where it is installed.
//!
//! Helper processes (`xdotool`, `pkill`, `taskkill`) run under a deadline
//! and are killed when they pass it, so a stuck helper cannot outlive its
//! action. File paths arrive already confined by the executor and are used
//! as given.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use deskhand_core::{MouseButton, ScrollDirection, WriteMode};
use tracing::{debug, info, warn};

use crate::driver::{DesktopDriver, DriverError, DriverResult};

/// Default cap on bytes read by `file_read`.
const DEFAULT_MAX_READ_BYTES: u64 = 52_428_800;
/// Default number of characters of file content put in the outcome detail.
const DEFAULT_READ_DISPLAY_CHARS: usize = 1000;
/// Default deadline for one helper process.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);
/// How often a running helper is checked.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Driver for the local machine.
pub struct SystemDriver {
    xdotool: Option<PathBuf>,
    max_read_bytes: u64,
    read_display_chars: usize,
    command_timeout: Duration,
    launched: Mutex<HashMap<String, Child>>,
}

impl SystemDriver {
    /// Create a driver, looking for `xdotool` on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        let xdotool = which::which("xdotool").ok();
        debug!(xdotool = ?xdotool, "Initialized system driver");
        Self {
            xdotool,
            max_read_bytes: DEFAULT_MAX_READ_BYTES,
            read_display_chars: DEFAULT_READ_DISPLAY_CHARS,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            launched: Mutex::new(HashMap::new()),
        }
    }

    /// Use an explicit `xdotool` binary, or none at all.
    #[must_use]
    pub fn with_xdotool(mut self, path: Option<PathBuf>) -> Self {
        self.xdotool = path;
        self
    }

    /// Limits for `file_read`: refuse files over `max_bytes`, and show at
    /// most `display_chars` of the content.
    #[must_use]
    pub fn with_read_limits(mut self, max_bytes: u64, display_chars: usize) -> Self {
        self.max_read_bytes = max_bytes;
        self.read_display_chars = display_chars;
        self
    }

    /// Kill helper processes still running after `timeout`. Keep it at or
    /// below the executor's action budget.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Whether input primitives are available.
    #[must_use]
    pub fn has_input_backend(&self) -> bool {
        self.xdotool.is_some()
    }

    fn xdotool<I, S>(&self, args: I) -> DriverResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let Some(bin) = &self.xdotool else {
            return Err(DriverError::Unsupported(
                "input automation needs xdotool, which was not found".to_string(),
            ));
        };
        let output = self.run_bounded(Command::new(bin).args(args), "xdotool")?;
        if output.status.success() {
            Ok(())
        } else {
            Err(DriverError::Other(format!(
                "xdotool exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    /// Run a helper to completion, killing it at the deadline.
    fn run_bounded(&self, command: &mut Command, what: &str) -> DriverResult<Output> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DriverError::from_io(&e, what))?;
        let started = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if started.elapsed() >= self.command_timeout => {
                    warn!(helper = what, pid = child.id(), "Helper overran its deadline; killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(DriverError::Timeout(format!(
                        "{what} did not finish within {:?} and was killed",
                        self.command_timeout
                    )));
                },
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(DriverError::from_io(&e, what)),
            }
        }
        child
            .wait_with_output()
            .map_err(|e| DriverError::from_io(&e, what))
    }

    fn lock_launched(&self) -> DriverResult<std::sync::MutexGuard<'_, HashMap<String, Child>>> {
        self.launched
            .lock()
            .map_err(|e| DriverError::Other(format!("process table poisoned: {e}")))
    }
}

impl Default for SystemDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemDriver")
            .field("xdotool", &self.xdotool)
            .field("max_read_bytes", &self.max_read_bytes)
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

/// Executable name to launch: `.exe` is dropped off Windows so that
/// `gedit.exe` and `gedit` mean the same program.
fn executable_name(app_name: &str) -> String {
    let name = app_name.trim();
    if cfg!(windows) {
        return name.to_string();
    }
    let lower = name.to_ascii_lowercase();
    match lower.strip_suffix(".exe") {
        Some(_) => name[..name.len().saturating_sub(4)].to_string(),
        None => name.to_string(),
    }
}

/// Translate a `+`-joined key combination into `xdotool key` syntax.
fn xdotool_keys(key: &str) -> String {
    key.split('+')
        .map(|part| {
            let part = part.trim();
            match part.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => "ctrl".to_string(),
                "alt" => "alt".to_string(),
                "shift" => "shift".to_string(),
                "win" | "cmd" | "super" | "meta" => "super".to_string(),
                "enter" | "return" => "Return".to_string(),
                "esc" | "escape" => "Escape".to_string(),
                "tab" => "Tab".to_string(),
                "space" => "space".to_string(),
                "backspace" => "BackSpace".to_string(),
                "delete" | "del" => "Delete".to_string(),
                "up" => "Up".to_string(),
                "down" => "Down".to_string(),
                "left" => "Left".to_string(),
                "right" => "Right".to_string(),
                "home" => "Home".to_string(),
                "end" => "End".to_string(),
                "pageup" => "Prior".to_string(),
                "pagedown" => "Next".to_string(),
                lower if lower.len() > 1 && lower.starts_with('f') && lower[1..].parse::<u8>().is_ok() => {
                    lower.to_uppercase()
                },
                _ => part.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("+")
}

fn button_number(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "1",
        MouseButton::Middle => "2",
        MouseButton::Right => "3",
    }
}

impl DesktopDriver for SystemDriver {
    fn click(&self, x: i32, y: i32, button: MouseButton, clicks: u32) -> DriverResult {
        self.xdotool([
            "mousemove".to_string(),
            x.to_string(),
            y.to_string(),
            "click".to_string(),
            "--repeat".to_string(),
            clicks.to_string(),
            button_number(button).to_string(),
        ])?;
        Ok(format!("Clicked {button} at ({x}, {y})"))
    }

    fn type_text(&self, text: &str) -> DriverResult {
        self.xdotool(["type", "--delay", "10", "--", text])?;
        Ok(format!("Typed {} characters", text.chars().count()))
    }

    fn key_press(&self, key: &str) -> DriverResult {
        self.xdotool(["key".to_string(), "--".to_string(), xdotool_keys(key)])?;
        Ok(format!("Pressed key: {key}"))
    }

    fn open_app(&self, app_name: &str) -> DriverResult {
        let program = executable_name(app_name);
        if program.contains(['/', '\\']) {
            return Err(DriverError::PermissionDenied(format!(
                "'{program}' is a path; only bare executable names are launched"
            )));
        }
        let child = Command::new(&program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DriverError::from_io(&e, format!("launch {program}")))?;
        let pid = child.id();
        info!(app = %program, pid, "Launched application");
        self.lock_launched()?.insert(program.to_lowercase(), child);
        Ok(format!("Launched {program} (pid {pid})"))
    }

    fn close_app(&self, app_name: &str) -> DriverResult {
        let program = executable_name(app_name);

        if let Some(mut child) = self.lock_launched()?.remove(&program.to_lowercase())
            && matches!(child.try_wait(), Ok(None))
        {
            child
                .kill()
                .map_err(|e| DriverError::from_io(&e, format!("stop {program}")))?;
            let _ = child.wait();
            info!(app = %program, pid = child.id(), "Closed launched application");
            return Ok(format!("Closed {program}"));
        }

        let (command, args): (&str, Vec<String>) = if cfg!(windows) {
            ("taskkill", vec!["/IM".to_string(), app_name.trim().to_string()])
        } else {
            ("pkill", vec!["-x".to_string(), program.clone()])
        };
        let output = self.run_bounded(Command::new(command).args(&args), command)?;
        if output.status.success() {
            info!(app = %program, "Closed application");
            Ok(format!("Closed {program}"))
        } else {
            Err(DriverError::NotFound(format!(
                "no running instances of {program}"
            )))
        }
    }

    fn read_file(&self, path: &Path) -> DriverResult {
        let context = || format!("read {}", path.display());
        let metadata = std::fs::metadata(path).map_err(|e| DriverError::from_io(&e, context()))?;
        if metadata.len() > self.max_read_bytes {
            return Err(DriverError::Other(format!(
                "{} is {} bytes, limit is {}",
                path.display(),
                metadata.len(),
                self.max_read_bytes
            )));
        }
        let bytes = std::fs::read(path).map_err(|e| DriverError::from_io(&e, context()))?;
        let content = String::from_utf8_lossy(&bytes);
        let shown: String = content.chars().take(self.read_display_chars).collect();
        let suffix = if content.chars().count() > self.read_display_chars {
            "... (truncated)"
        } else {
            ""
        };
        Ok(format!("File content:\n{shown}{suffix}"))
    }

    fn write_file(&self, path: &Path, content: &str, mode: WriteMode) -> DriverResult {
        let context = || format!("write {}", path.display());
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| DriverError::from_io(&e, context()))?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Overwrite => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let mut file = options
            .open(path)
            .map_err(|e| DriverError::from_io(&e, context()))?;
        file.write_all(content.as_bytes())
            .map_err(|e| DriverError::from_io(&e, context()))?;
        Ok(format!(
            "Wrote {} characters to {}",
            content.chars().count(),
            path.display()
        ))
    }

    fn mouse_move(&self, x: i32, y: i32, _duration: Duration) -> DriverResult {
        self.xdotool(["mousemove".to_string(), x.to_string(), y.to_string()])?;
        Ok(format!("Moved mouse to ({x}, {y})"))
    }

    fn scroll(&self, direction: ScrollDirection, clicks: u32) -> DriverResult {
        let button = match direction {
            ScrollDirection::Up => "4",
            ScrollDirection::Down => "5",
        };
        self.xdotool([
            "click".to_string(),
            "--repeat".to_string(),
            clicks.to_string(),
            button.to_string(),
        ])?;
        Ok(format!("Scrolled {direction} {clicks} clicks"))
    }
}
