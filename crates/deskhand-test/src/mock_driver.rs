//! Recording desktop driver for testing.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deskhand_automation::{DesktopDriver, DriverError, DriverResult};
use deskhand_core::{ActionKind, MouseButton, ScrollDirection, WriteMode};

/// A [`DesktopDriver`] that touches nothing and records every call.
///
/// Each call is logged as `"<kind> <argument>"`, e.g. `"open_app gedit"`.
/// Failures and delays can be scripted per action kind. Clones share the
/// same log.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    calls: Arc<Mutex<Vec<String>>>,
    failures: HashMap<ActionKind, DriverError>,
    delays: HashMap<ActionKind, Duration>,
    files: Arc<Mutex<HashMap<String, String>>>,
}

impl MockDriver {
    /// Create a driver where every call succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call of `kind` fail with `error`.
    #[must_use]
    pub fn failing(mut self, kind: ActionKind, error: DriverError) -> Self {
        self.failures.insert(kind, error);
        self
    }

    /// Make every call of `kind` block for `delay` first.
    #[must_use]
    pub fn slow(mut self, kind: ActionKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Content written to `path` through this driver.
    #[must_use]
    pub fn written(&self, path: impl AsRef<Path>) -> Option<String> {
        let key = path.as_ref().display().to_string();
        self.files.lock().ok().and_then(|f| f.get(&key).cloned())
    }

    fn record(&self, kind: ActionKind, argument: impl std::fmt::Display) -> DriverResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{kind} {argument}"));
        }
        if let Some(delay) = self.delays.get(&kind) {
            std::thread::sleep(*delay);
        }
        match self.failures.get(&kind) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl DesktopDriver for MockDriver {
    fn click(&self, x: i32, y: i32, button: MouseButton, clicks: u32) -> DriverResult {
        self.record(ActionKind::Click, format!("{x},{y}"))?;
        Ok(format!("Clicked {button} {clicks}x at ({x}, {y})"))
    }

    fn type_text(&self, text: &str) -> DriverResult {
        self.record(ActionKind::TypeText, text)?;
        Ok(format!("Typed {} characters", text.chars().count()))
    }

    fn key_press(&self, key: &str) -> DriverResult {
        self.record(ActionKind::KeyPress, key)?;
        Ok(format!("Pressed key: {key}"))
    }

    fn open_app(&self, app_name: &str) -> DriverResult {
        self.record(ActionKind::OpenApp, app_name)?;
        Ok(format!("Launched {app_name}"))
    }

    fn close_app(&self, app_name: &str) -> DriverResult {
        self.record(ActionKind::CloseApp, app_name)?;
        Ok(format!("Closed {app_name}"))
    }

    fn read_file(&self, path: &Path) -> DriverResult {
        self.record(ActionKind::FileRead, path.display())?;
        let content = self.written(path).unwrap_or_default();
        Ok(format!("File content:\n{content}"))
    }

    fn write_file(&self, path: &Path, content: &str, mode: WriteMode) -> DriverResult {
        self.record(ActionKind::FileWrite, path.display())?;
        if let Ok(mut files) = self.files.lock() {
            let entry = files.entry(path.display().to_string()).or_default();
            if mode == WriteMode::Overwrite {
                entry.clear();
            }
            entry.push_str(content);
        }
        Ok(format!("Wrote {} characters", content.chars().count()))
    }

    fn mouse_move(&self, x: i32, y: i32, _duration: Duration) -> DriverResult {
        self.record(ActionKind::MouseMove, format!("{x},{y}"))?;
        Ok(format!("Moved mouse to ({x}, {y})"))
    }

    fn scroll(&self, direction: ScrollDirection, clicks: u32) -> DriverResult {
        self.record(ActionKind::Scroll, direction)?;
        Ok(format!("Scrolled {direction} {clicks} clicks"))
    }

    fn wait(&self, duration: Duration) -> DriverResult {
        self.record(ActionKind::Wait, duration.as_secs_f64())?;
        Ok(format!("Waited {} seconds", duration.as_secs_f64()))
    }
}
