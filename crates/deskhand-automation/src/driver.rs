//! Platform automation primitives behind one trait.

use std::io;
use std::path::Path;
use std::time::Duration;

use deskhand_core::{Action, ExecutionError, MouseButton, ScrollDirection, WriteMode};

/// Typed failure of one platform primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// The target (file, application, window) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The OS refused the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The primitive gave up waiting.
    #[error("timed out: {0}")]
    Timeout(String),

    /// This platform has no way to perform the operation.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Other I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Classify an I/O error, prefixing `context`.
    #[must_use]
    pub fn from_io(err: &io::Error, context: impl std::fmt::Display) -> Self {
        let message = format!("{context}: {err}");
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(message),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(message),
            io::ErrorKind::TimedOut => Self::Timeout(message),
            _ => Self::Io(message),
        }
    }

    /// The outcome error kind this maps to.
    #[must_use]
    pub fn execution_error(&self) -> ExecutionError {
        match self {
            Self::NotFound(_) => ExecutionError::TargetNotFound,
            Self::PermissionDenied(_) => ExecutionError::PermissionDenied,
            Self::Timeout(_) => ExecutionError::Timeout,
            Self::Unsupported(_) | Self::Io(_) | Self::Other(_) => ExecutionError::Unknown,
        }
    }
}

/// Result type for driver calls. The success value is a human-readable
/// detail line.
pub type DriverResult<T = String> = Result<T, DriverError>;

/// One method per action kind.
///
/// Methods are synchronous and may block; the executor runs them on the
/// blocking pool with a timeout.
pub trait DesktopDriver: Send + Sync {
    /// Click at screen coordinates.
    fn click(&self, x: i32, y: i32, button: MouseButton, clicks: u32) -> DriverResult;

    /// Type text at the input focus.
    fn type_text(&self, text: &str) -> DriverResult;

    /// Press a key or `+`-joined combination.
    fn key_press(&self, key: &str) -> DriverResult;

    /// Launch an application.
    fn open_app(&self, app_name: &str) -> DriverResult;

    /// Close an application.
    fn close_app(&self, app_name: &str) -> DriverResult;

    /// Read a text file. Behind a guarded executor `path` is absolute
    /// with symlinks already resolved.
    fn read_file(&self, path: &Path) -> DriverResult;

    /// Write or append a text file.
    fn write_file(&self, path: &Path, content: &str, mode: WriteMode) -> DriverResult;

    /// Move the pointer.
    fn mouse_move(&self, x: i32, y: i32, duration: Duration) -> DriverResult;

    /// Scroll the view under the pointer.
    fn scroll(&self, direction: ScrollDirection, clicks: u32) -> DriverResult;

    /// Pause.
    fn wait(&self, duration: Duration) -> DriverResult {
        std::thread::sleep(duration);
        Ok(format!("Waited {} seconds", duration.as_secs_f64()))
    }
}

/// Route an action to the matching driver method.
///
/// # Errors
///
/// Whatever the driver method returns.
pub fn dispatch(driver: &dyn DesktopDriver, action: &Action) -> DriverResult {
    match action {
        Action::Click {
            x,
            y,
            button,
            clicks,
        } => driver.click(*x, *y, *button, *clicks),
        Action::TypeText { text } => driver.type_text(text),
        Action::KeyPress { key } => driver.key_press(key),
        Action::OpenApp { app_name } => driver.open_app(app_name),
        Action::CloseApp { app_name } => driver.close_app(app_name),
        Action::FileRead { file_path } => driver.read_file(file_path),
        Action::FileWrite {
            file_path,
            content,
            mode,
        } => driver.write_file(file_path, content, *mode),
        Action::MouseMove { x, y, duration_ms } => {
            driver.mouse_move(*x, *y, Duration::from_millis(*duration_ms))
        },
        Action::Scroll { direction, clicks } => driver.scroll(*direction, *clicks),
        Action::Wait { seconds } => driver.wait(seconds_to_duration(*seconds)),
    }
}

/// Non-finite or negative values become zero.
pub(crate) fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}
