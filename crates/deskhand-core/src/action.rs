//! The action model: one atomic desktop automation operation.
//!
//! [`Action`] is a closed set of ten kinds. The validator and executor match
//! on it exhaustively, so adding a kind is a compile error everywhere a
//! decision about it must be made.
//!
//! On the wire (language-model responses, audit summaries) an action is a
//! JSON object tagged by its `action` field:
//!
//! ```json
//! {"action": "file_write", "file_path": "notes.txt", "content": "hi"}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::utils::summarize;

/// Maximum characters of a text payload shown in a description.
const DESCRIBE_TEXT_CHARS: usize = 50;

/// A single desktop automation operation with its kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum Action {
    /// Click a mouse button at screen coordinates.
    Click {
        /// Horizontal screen coordinate in pixels.
        x: i32,
        /// Vertical screen coordinate in pixels.
        y: i32,
        /// Which button to press.
        #[serde(default)]
        button: MouseButton,
        /// Number of clicks (2 = double click).
        #[serde(default = "default_clicks")]
        clicks: u32,
    },
    /// Type a text payload at the current input focus.
    #[serde(alias = "type")]
    TypeText {
        /// The text to type.
        text: String,
    },
    /// Press a key or a `+`-joined key combination (e.g. `ctrl+s`).
    KeyPress {
        /// Key name or combination.
        key: String,
    },
    /// Launch an application.
    OpenApp {
        /// Executable identifier (e.g. `chrome.exe`, `gedit`).
        app_name: String,
    },
    /// Close a running application.
    CloseApp {
        /// Executable identifier of the application to close.
        app_name: String,
    },
    /// Read a text file.
    FileRead {
        /// Path of the file to read.
        file_path: PathBuf,
    },
    /// Write a text file.
    FileWrite {
        /// Path of the file to write.
        file_path: PathBuf,
        /// Content to write.
        content: String,
        /// Overwrite or append.
        #[serde(default)]
        mode: WriteMode,
    },
    /// Move the mouse pointer.
    MouseMove {
        /// Horizontal screen coordinate in pixels.
        x: i32,
        /// Vertical screen coordinate in pixels.
        y: i32,
        /// Duration of the movement in milliseconds.
        #[serde(default = "default_move_duration_ms")]
        duration_ms: u64,
    },
    /// Scroll the view under the pointer.
    Scroll {
        /// Scroll direction.
        direction: ScrollDirection,
        /// Number of wheel clicks.
        #[serde(default = "default_scroll_clicks")]
        clicks: u32,
    },
    /// Pause before the next action.
    Wait {
        /// Seconds to wait.
        seconds: f64,
    },
}

fn default_clicks() -> u32 {
    1
}

fn default_move_duration_ms() -> u64 {
    250
}

fn default_scroll_clicks() -> u32 {
    3
}

impl Action {
    /// The kind of this action.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Click { .. } => ActionKind::Click,
            Self::TypeText { .. } => ActionKind::TypeText,
            Self::KeyPress { .. } => ActionKind::KeyPress,
            Self::OpenApp { .. } => ActionKind::OpenApp,
            Self::CloseApp { .. } => ActionKind::CloseApp,
            Self::FileRead { .. } => ActionKind::FileRead,
            Self::FileWrite { .. } => ActionKind::FileWrite,
            Self::MouseMove { .. } => ActionKind::MouseMove,
            Self::Scroll { .. } => ActionKind::Scroll,
            Self::Wait { .. } => ActionKind::Wait,
        }
    }

    /// Application identifier for `open_app` / `close_app`.
    #[must_use]
    pub fn app_name(&self) -> Option<&str> {
        match self {
            Self::OpenApp { app_name } | Self::CloseApp { app_name } => Some(app_name),
            _ => None,
        }
    }

    /// Target path for file actions.
    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::FileRead { file_path } | Self::FileWrite { file_path, .. } => Some(file_path),
            _ => None,
        }
    }

    /// Free-text payload that is typed or written.
    #[must_use]
    pub fn text_payload(&self) -> Option<&str> {
        match self {
            Self::TypeText { text } => Some(text),
            Self::FileWrite { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Screen coordinates targeted by pointer actions.
    #[must_use]
    pub fn coordinates(&self) -> Option<(i32, i32)> {
        match self {
            Self::Click { x, y, .. } | Self::MouseMove { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }

    /// Check that the parameters are usable for this kind.
    ///
    /// The type system guarantees the required fields are present; this
    /// rejects values that are present but meaningless (empty identifiers,
    /// zero clicks, negative waits).
    ///
    /// # Errors
    ///
    /// Returns a [`ShapeError`] naming the offending field.
    pub fn check_shape(&self) -> Result<(), ShapeError> {
        let kind = self.kind();
        match self {
            Self::Click { clicks, .. } | Self::Scroll { clicks, .. } => {
                if *clicks == 0 {
                    return Err(ShapeError::invalid(kind, "clicks", "must be at least 1"));
                }
            },
            Self::TypeText { text } => {
                if text.is_empty() {
                    return Err(ShapeError::empty(kind, "text"));
                }
            },
            Self::KeyPress { key } => {
                if key.trim().is_empty() {
                    return Err(ShapeError::empty(kind, "key"));
                }
                if key.split('+').any(|part| part.trim().is_empty()) {
                    return Err(ShapeError::invalid(
                        kind,
                        "key",
                        format!("malformed key combination '{key}'"),
                    ));
                }
            },
            Self::OpenApp { app_name } | Self::CloseApp { app_name } => {
                if app_name.trim().is_empty() {
                    return Err(ShapeError::empty(kind, "app_name"));
                }
                if app_name.contains(['/', '\\']) {
                    return Err(ShapeError::invalid(
                        kind,
                        "app_name",
                        format!("'{app_name}' must be a bare executable name, not a path"),
                    ));
                }
            },
            Self::FileRead { file_path } | Self::FileWrite { file_path, .. } => {
                if file_path.as_os_str().is_empty() {
                    return Err(ShapeError::empty(kind, "file_path"));
                }
            },
            Self::MouseMove { .. } => {},
            Self::Wait { seconds } => {
                if !seconds.is_finite() || *seconds < 0.0 {
                    return Err(ShapeError::invalid(
                        kind,
                        "seconds",
                        format!("{seconds} is not a non-negative duration"),
                    ));
                }
            },
        }
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click {
                x,
                y,
                button,
                clicks,
            } => {
                if *clicks > 1 {
                    write!(f, "Click {button} x{clicks} at ({x}, {y})")
                } else {
                    write!(f, "Click {button} at ({x}, {y})")
                }
            },
            Self::TypeText { text } => {
                write!(f, "Type: '{}'", summarize(text, DESCRIBE_TEXT_CHARS))
            },
            Self::KeyPress { key } => write!(f, "Press key: {key}"),
            Self::OpenApp { app_name } => write!(f, "Open application: {app_name}"),
            Self::CloseApp { app_name } => write!(f, "Close application: {app_name}"),
            Self::FileRead { file_path } => write!(f, "Read file: {}", file_path.display()),
            Self::FileWrite {
                file_path,
                content,
                mode,
            } => write!(
                f,
                "{} {} bytes to file: {}",
                match mode {
                    WriteMode::Overwrite => "Write",
                    WriteMode::Append => "Append",
                },
                content.len(),
                file_path.display()
            ),
            Self::MouseMove { x, y, .. } => write!(f, "Move mouse to ({x}, {y})"),
            Self::Scroll { direction, clicks } => write!(f, "Scroll {direction} {clicks} clicks"),
            Self::Wait { seconds } => write!(f, "Wait {seconds} seconds"),
        }
    }
}

/// The kind of an [`Action`], without parameters.
///
/// Used in configuration (e.g. which kinds are critical) and in audit
/// summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// `click`
    Click,
    /// `type_text`
    TypeText,
    /// `key_press`
    KeyPress,
    /// `open_app`
    OpenApp,
    /// `close_app`
    CloseApp,
    /// `file_read`
    FileRead,
    /// `file_write`
    FileWrite,
    /// `mouse_move`
    MouseMove,
    /// `scroll`
    Scroll,
    /// `wait`
    Wait,
}

impl ActionKind {
    /// Every kind, in schema order.
    pub const ALL: [ActionKind; 10] = [
        Self::Click,
        Self::TypeText,
        Self::KeyPress,
        Self::OpenApp,
        Self::CloseApp,
        Self::FileRead,
        Self::FileWrite,
        Self::MouseMove,
        Self::Scroll,
        Self::Wait,
    ];

    /// Wire name of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::TypeText => "type_text",
            Self::KeyPress => "key_press",
            Self::OpenApp => "open_app",
            Self::CloseApp => "close_app",
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::MouseMove => "mouse_move",
            Self::Scroll => "scroll",
            Self::Wait => "wait",
        }
    }

    /// Whether this kind operates on a file path.
    #[must_use]
    pub fn is_file_action(self) -> bool {
        matches!(self, Self::FileRead | Self::FileWrite)
    }

    /// Whether this kind changes state outside the input focus (files, processes).
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::FileWrite | Self::CloseApp)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "type" {
            return Ok(Self::TypeText);
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown action kind '{s}'"))
    }
}

/// Mouse button for click actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Primary button.
    #[default]
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Middle => "middle",
        })
    }
}

/// Scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    /// Scroll towards the top.
    Up,
    /// Scroll towards the bottom.
    Down,
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// How `file_write` treats existing content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Replace the file content.
    #[default]
    Overwrite,
    /// Append to the end of the file.
    Append,
}

/// An action whose parameters are present but unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// A required field is empty.
    #[error("{kind}: field '{field}' must not be empty")]
    EmptyField {
        /// Action kind.
        kind: ActionKind,
        /// Field name.
        field: &'static str,
    },
    /// A field holds a value outside its domain.
    #[error("{kind}: field '{field}' is invalid: {message}")]
    InvalidValue {
        /// Action kind.
        kind: ActionKind,
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

impl ShapeError {
    fn empty(kind: ActionKind, field: &'static str) -> Self {
        Self::EmptyField { kind, field }
    }

    fn invalid(kind: ActionKind, field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            field,
            message: message.into(),
        }
    }
}
