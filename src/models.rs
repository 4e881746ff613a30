use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribution attached to a capture record.
/// Either both fields come from one resolution or the value is `unknown()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceContext {
    pub source_app: Option<String>,
    pub source_url: Option<String>,
}

impl SourceContext {
    pub fn unknown() -> Self {
        Self {
            source_app: None,
            source_url: None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.source_app.is_none() && self.source_url.is_none()
    }
}

/// Decoded stdout of the native window-info helper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperResult {
    pub app_name: Option<String>,
    pub bundle_id: Option<String>,
    pub window_title: Option<String>,
    #[serde(default)]
    pub browser_url: Option<String>,
}

/// Pixel-space rectangle of the selected screen region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl CaptureRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Positional arguments for the helper: `x y width height`.
    pub fn to_args(&self) -> [String; 4] {
        [
            self.x.to_string(),
            self.y.to_string(),
            self.width.to_string(),
            self.height.to_string(),
        ]
    }
}

/// One persisted credential record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
    /// Epoch milliseconds, stored as a decimal string.
    Expiry,
}

impl TokenKind {
    pub const ALL: [TokenKind; 3] = [TokenKind::Access, TokenKind::Refresh, TokenKind::Expiry];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Expiry => "expiry",
        }
    }

    pub fn file_name(&self) -> String {
        format!("curate_{}_token.enc", self.as_str())
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token endpoint response body
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub expires_in: i64,
}

/// Tokens handed over by the sign-in exchange or a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds as declared by the server.
    pub expires_in: i64,
}

impl From<TokenResponse> for SessionTokens {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
        }
    }
}
