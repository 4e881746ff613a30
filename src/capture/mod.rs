use std::fmt;

pub mod browser;
pub mod context;
pub mod helper;

pub use browser::{clean_browser_title, is_browser, resolve_browser_url, validate_url, BrowserKind};
pub use context::{ContextResolver, ResolutionOutcome, WindowProbe};
pub use helper::{resolve_helper_path, HelperInvoker};

/// Ошибки получения контекста окна
#[derive(Debug)]
pub enum CaptureError {
    /// Helper could not be spawned or exited non-zero
    Process(String),
    /// Helper stdout was not the expected JSON object
    Parse(String),
    /// Resolution task panicked or was aborted
    Join(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Process(s) => write!(f, "Process: {}", s),
            CaptureError::Parse(s) => write!(f, "Parse: {}", s),
            CaptureError::Join(s) => write!(f, "Join: {}", s),
        }
    }
}

impl std::error::Error for CaptureError {}
