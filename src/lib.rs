use std::sync::Arc;
use tracing::info;

pub mod auth;
pub mod capture;
pub mod config;
pub mod logging;
pub mod models;

pub use crate::auth::{AuthError, RefreshCoordinator, TokenStore};
pub use crate::capture::{
    clean_browser_title, is_browser, validate_url, CaptureError, ContextResolver, HelperInvoker,
    ResolutionOutcome,
};
pub use crate::config::{AuthConfig, CaptureConfig};
pub use crate::models::{CaptureRect, HelperResult, SessionTokens, SourceContext, TokenKind};


/// Capture-support services owned by the desktop shell.
/// One resolver for capture events, one coordinator shared by every API request.
pub struct CaptureServices {
    pub resolver: ContextResolver,
    pub auth: RefreshCoordinator,
}

impl CaptureServices {
    pub fn new(
        capture_config: &CaptureConfig,
        auth_config: &AuthConfig,
    ) -> Result<Self, AuthError> {
        let store = Arc::new(TokenStore::from_config(auth_config));
        info!(
            "[SETUP] Token store at {} (encryption available={})",
            store.dir().display(),
            store.is_available()
        );
        let resolver = ContextResolver::from_config(capture_config);
        info!(
            "[SETUP] Window-info helper: {}",
            capture::resolve_helper_path(capture_config).display()
        );
        Ok(Self {
            resolver,
            auth: RefreshCoordinator::new(store, auth_config)?,
        })
    }

    /// Logging plus configuration from the environment.
    pub fn from_env() -> Result<Self, AuthError> {
        logging::init();
        Self::new(&CaptureConfig::from_env(), &AuthConfig::from_env())
    }

    /// Attribution for a new capture; `{null, null}` when unknown.
    pub async fn resolve_source_context(&self, rect: CaptureRect) -> SourceContext {
        self.resolver.resolve(rect).await
    }

    pub async fn access_token(&self) -> Option<String> {
        self.auth.access_token().await
    }
}
