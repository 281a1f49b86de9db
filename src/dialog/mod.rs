//! Modal text-entry dialog shown to the human.
//!
//! The dialog is drawn by the platform's own helper program (PowerShell
//! WinForms on Windows, `osascript` on macOS, `zenity` or `kdialog`
//! elsewhere). Callers only see [`InputDialog::prompt`], which blocks until
//! the window is confirmed or closed.

mod native;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use native::{build_command, interpret_exit, DialogCommand, NativeDialog};

/// Default window title.
pub const DEFAULT_TITLE: &str = "Please enter";

/// Default window width in pixels.
pub const DEFAULT_WIDTH: u32 = 400;

/// Default spacing around the window contents in pixels.
pub const DEFAULT_PADDING: u32 = 25;

/// What to ask and how the window is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogRequest {
    pub message: String,
    pub title: String,
    pub width: u32,
    pub padding: u32,
}

impl DialogRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: DEFAULT_TITLE.to_string(),
            width: DEFAULT_WIDTH,
            padding: DEFAULT_PADDING,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Width available to the wrapped message text.
    pub fn wrap_length(&self) -> u32 {
        self.width.saturating_sub(self.padding.saturating_mul(2))
    }
}

/// Something that can ask the human for a line of text.
#[async_trait]
pub trait InputDialog: Send + Sync {
    /// `Some(text)` when confirmed (possibly empty), `None` when cancelled.
    async fn prompt(&self, request: &DialogRequest) -> Result<Option<String>>;
}

/// Which helper program draws the dialog.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DialogBackend {
    /// Pick by platform and what is installed.
    #[default]
    Auto,
    Zenity,
    Kdialog,
    Osascript,
    Powershell,
}

impl DialogBackend {
    /// Turn `Auto` into a concrete backend.
    pub fn resolve(self) -> Result<Self> {
        if self != Self::Auto {
            return Ok(self);
        }
        if cfg!(windows) {
            return Ok(Self::Powershell);
        }
        if cfg!(target_os = "macos") {
            return Ok(Self::Osascript);
        }
        if find_in_path("zenity") {
            Ok(Self::Zenity)
        } else if find_in_path("kdialog") {
            Ok(Self::Kdialog)
        } else {
            Err(Error::DialogUnavailable(
                "neither zenity nor kdialog found in PATH".to_string(),
            ))
        }
    }

    /// Program spawned for this backend.
    pub fn program(self) -> &'static str {
        match self {
            Self::Auto => "",
            Self::Zenity => "zenity",
            Self::Kdialog => "kdialog",
            Self::Osascript => "osascript",
            Self::Powershell => "powershell.exe",
        }
    }
}

fn find_in_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = DialogRequest::new("What next?");
        assert_eq!(request.title, "Please enter");
        assert_eq!(request.width, 400);
        assert_eq!(request.padding, 25);
        assert_eq!(request.wrap_length(), 350);
    }

    #[test]
    fn test_request_builder() {
        let request = DialogRequest::new("Name?")
            .with_title("Login")
            .with_width(600)
            .with_padding(10);
        assert_eq!(request.title, "Login");
        assert_eq!(request.wrap_length(), 580);
    }

    #[test]
    fn test_wrap_length_saturates() {
        let request = DialogRequest::new("x").with_width(30).with_padding(25);
        assert_eq!(request.wrap_length(), 0);

        let huge = DialogRequest::new("x").with_padding(u32::MAX);
        assert_eq!(huge.wrap_length(), 0);
    }

    #[test]
    fn test_explicit_backend_resolves_to_itself() {
        assert_eq!(DialogBackend::Zenity.resolve().unwrap(), DialogBackend::Zenity);
        assert_eq!(
            DialogBackend::Powershell.resolve().unwrap(),
            DialogBackend::Powershell
        );
    }

    #[test]
    fn test_backend_serialization() {
        assert_eq!(
            serde_json::to_string(&DialogBackend::Osascript).unwrap(),
            "\"osascript\""
        );
        let parsed: DialogBackend = serde_json::from_str("\"kdialog\"").unwrap();
        assert_eq!(parsed, DialogBackend::Kdialog);
    }

    #[test]
    fn test_find_in_path_missing_program() {
        assert!(!find_in_path("definitely-not-a-real-dialog-helper"));
    }
}
