use super::CaptureError;
use crate::config::{CaptureConfig, HELPER_RELATIVE_PATH};
use crate::models::{CaptureRect, HelperResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs the native window-info helper once per call.
#[derive(Clone, Debug)]
pub struct HelperInvoker {
    path: PathBuf,
}

impl HelperInvoker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(resolve_helper_path(config))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn invoke(&self, rect: &CaptureRect) -> Result<HelperResult, CaptureError> {
        invoke(&self.path, rect).await
    }
}

/// Spawn `path x y width height`, wait for it and decode stdout.
/// No retries; the child is killed if this future is dropped before it exits.
pub async fn invoke(path: &Path, rect: &CaptureRect) -> Result<HelperResult, CaptureError> {
    debug!("[HELPER] Running {} with rect {:?}", path.display(), rect);

    let output = Command::new(path)
        .args(rect.to_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            CaptureError::Process(format!("Failed to spawn {}: {}", path.display(), e))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        return Err(CaptureError::Process(format!(
            "Helper exited with status {}: {}",
            code,
            stderr.trim()
        )));
    }

    parse_helper_output(&output.stdout)
}

pub fn parse_helper_output(stdout: &[u8]) -> Result<HelperResult, CaptureError> {
    let text = std::str::from_utf8(stdout)
        .map_err(|e| CaptureError::Parse(format!("Helper output is not UTF-8: {}", e)))?;
    serde_json::from_str::<HelperResult>(text.trim())
        .map_err(|e| CaptureError::Parse(format!("Failed to parse helper output: {}", e)))
}

/// Explicit path first, then the packaged resources dir, then the app dir.
pub fn resolve_helper_path(config: &CaptureConfig) -> PathBuf {
    if let Some(path) = &config.helper_path {
        return path.clone();
    }
    match &config.resource_dir {
        Some(resources) => resources.join(HELPER_RELATIVE_PATH),
        None => config.app_dir.join(HELPER_RELATIVE_PATH),
    }
}
