use once_cell::sync::Lazy;
use regex::Regex;

/// How the page URL of a browser window is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserKind {
    /// AppleScript `URL of active tab of front window`
    Chromium,
    /// AppleScript `URL of current tab of front window`
    Safari,
    /// OS automation cannot reach the URL bar from our process; the helper
    /// reads it through the Accessibility API and reports `browserUrl`.
    SelfReporting,
}

const CHROMIUM_BROWSERS: &[&str] = &[
    "Google Chrome",
    "Google Chrome Canary",
    "Chromium",
    "Brave Browser",
    "Microsoft Edge",
    "Arc",
    "Vivaldi",
    "Opera",
];

const SAFARI_BROWSERS: &[&str] = &["Safari", "Safari Technology Preview"];

const SELF_REPORTING_BROWSERS: &[&str] = &[
    "Firefox",
    "Firefox Developer Edition",
    "Firefox Nightly",
    "Zen",
    "Zen Browser",
    "Waterfox",
    "LibreWolf",
];

static BARE_DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]+\.[A-Za-z]{2,}(/.*)?$")
        .expect("bare domain pattern should compile")
});

static BROWSER_TITLE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*[—–\-|]\s*(?:Zen Browser|Zen|Firefox|Google Chrome|Chrome|Brave Browser|Microsoft Edge|Arc|Safari|Waterfox|LibreWolf)\s*$",
    )
    .expect("browser title suffix pattern should compile")
});

impl BrowserKind {
    pub fn for_app(app_name: &str) -> Option<Self> {
        let name = app_name.trim();
        let matches = |list: &[&str]| list.iter().any(|b| b.eq_ignore_ascii_case(name));
        if matches(CHROMIUM_BROWSERS) {
            Some(BrowserKind::Chromium)
        } else if matches(SAFARI_BROWSERS) {
            Some(BrowserKind::Safari)
        } else if matches(SELF_REPORTING_BROWSERS) {
            Some(BrowserKind::SelfReporting)
        } else {
            None
        }
    }

    fn url_script(&self, app_name: &str) -> Option<String> {
        match self {
            BrowserKind::Chromium => Some(format!(
                r#"tell application "{}" to get URL of active tab of front window"#,
                app_name
            )),
            BrowserKind::Safari => Some(format!(
                r#"tell application "{}" to get URL of current tab of front window"#,
                app_name
            )),
            BrowserKind::SelfReporting => None,
        }
    }
}

pub fn is_browser(app_name: &str) -> bool {
    BrowserKind::for_app(app_name).is_some()
}

/// Normalize a URL reported by the helper or by OS automation.
/// `scheme://...` passes verbatim, bare domains get `https://`, anything else is dropped.
pub fn validate_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://")
        || trimmed.starts_with("https://")
        || trimmed.starts_with("file://")
    {
        return Some(trimmed.to_string());
    }
    if BARE_DOMAIN_PATTERN.is_match(trimmed) {
        return Some(format!("https://{}", trimmed));
    }
    None
}

/// Strip a trailing "— Google Chrome" style suffix from a window title.
/// Returns `None` when nothing but the suffix was left.
pub fn clean_browser_title(title: &str) -> Option<String> {
    let cleaned = BROWSER_TITLE_SUFFIX.replace(title, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Ask the browser for its current URL through OS automation.
/// Self-reporting and unknown apps are never queried.
pub async fn resolve_browser_url(app_name: &str) -> Option<String> {
    let kind = BrowserKind::for_app(app_name)?;
    // The name is interpolated into AppleScript, so only known names get here.
    let script = kind.url_script(app_name.trim())?;
    run_url_script(&script).await
}

#[cfg(target_os = "macos")]
async fn run_url_script(script: &str) -> Option<String> {
    use std::process::Stdio;
    use tokio::process::Command;
    use tracing::{debug, warn};

    let output = match Command::new("osascript")
        .arg("-e")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            warn!("[BROWSER] Failed to execute AppleScript: {}", e);
            return None;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("[BROWSER] AppleScript error: {}", stderr.trim());
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let url = validate_url(&stdout);
    debug!("[BROWSER] AppleScript url present={}", url.is_some());
    url
}

#[cfg(not(target_os = "macos"))]
async fn run_url_script(_script: &str) -> Option<String> {
    // No OS automation bridge on other platforms
    None
}
