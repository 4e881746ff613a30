use super::browser::{clean_browser_title, is_browser, resolve_browser_url, validate_url};
use super::helper::HelperInvoker;
use super::CaptureError;
use crate::config::CaptureConfig;
use crate::models::{CaptureRect, HelperResult, SourceContext};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Source of foreground-window information for a capture rectangle.
pub trait WindowProbe: Send + Sync + 'static {
    fn probe(
        &self,
        rect: CaptureRect,
    ) -> impl Future<Output = Result<HelperResult, CaptureError>> + Send;
}

impl WindowProbe for HelperInvoker {
    async fn probe(&self, rect: CaptureRect) -> Result<HelperResult, CaptureError> {
        self.invoke(&rect).await
    }
}

/// Terminal state of one resolution.
#[derive(Debug)]
pub enum ResolutionOutcome {
    /// Pipeline finished in time; may still be the unknown context
    Resolved(SourceContext),
    TimedOut,
    Failed(CaptureError),
}

impl ResolutionOutcome {
    /// Timeouts and failures are reported exactly like an unrecognized app.
    pub fn into_context(self) -> SourceContext {
        match self {
            ResolutionOutcome::Resolved(context) => context,
            ResolutionOutcome::TimedOut | ResolutionOutcome::Failed(_) => SourceContext::unknown(),
        }
    }
}

/// Резолвер контекста захвата: helper + fallback по браузеру + жёсткий дедлайн
pub struct ContextResolver<P: WindowProbe = HelperInvoker> {
    probe: Arc<P>,
    deadline: Duration,
}

impl ContextResolver<HelperInvoker> {
    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(HelperInvoker::from_config(config), config.deadline)
    }
}

impl<P: WindowProbe> ContextResolver<P> {
    pub fn new(probe: P, deadline: Duration) -> Self {
        Self {
            probe: Arc::new(probe),
            deadline,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Best-effort attribution for a capture. Never fails and never waits
    /// longer than the deadline.
    pub async fn resolve(&self, rect: CaptureRect) -> SourceContext {
        self.resolve_outcome(rect).await.into_context()
    }

    /// Race the pipeline against the deadline.
    /// A late pipeline keeps running in its own task and its result is dropped.
    pub async fn resolve_outcome(&self, rect: CaptureRect) -> ResolutionOutcome {
        let started = Instant::now();
        let probe = Arc::clone(&self.probe);
        let pipeline = tokio::spawn(async move { run_pipeline(probe.as_ref(), rect).await });

        let outcome = match tokio::time::timeout(self.deadline, pipeline).await {
            Ok(Ok(Ok(context))) => ResolutionOutcome::Resolved(context),
            Ok(Ok(Err(e))) => ResolutionOutcome::Failed(e),
            Ok(Err(join_err)) => ResolutionOutcome::Failed(CaptureError::Join(join_err.to_string())),
            Err(_) => ResolutionOutcome::TimedOut,
        };

        let elapsed_ms = started.elapsed().as_millis();
        match &outcome {
            ResolutionOutcome::Resolved(context) => info!(
                "[CAPTURE] Context resolved in {}ms: app present={}, url present={}",
                elapsed_ms,
                context.source_app.is_some(),
                context.source_url.is_some()
            ),
            ResolutionOutcome::TimedOut => warn!(
                "[CAPTURE] Context resolution exceeded {}ms deadline, saving without source",
                self.deadline.as_millis()
            ),
            ResolutionOutcome::Failed(e) => {
                warn!("[CAPTURE] Context resolution failed after {}ms: {}", elapsed_ms, e)
            }
        }

        outcome
    }
}

async fn run_pipeline<P: WindowProbe>(
    probe: &P,
    rect: CaptureRect,
) -> Result<SourceContext, CaptureError> {
    debug!("[CAPTURE] Selected rect: {:?}", rect);
    let info = probe.probe(rect).await?;

    let app_name = match info.app_name.filter(|name| !name.trim().is_empty()) {
        Some(name) => name,
        None => return Ok(SourceContext::unknown()),
    };

    let browser = is_browser(&app_name);

    let source_url = match info.browser_url.as_deref().filter(|u| !u.is_empty()) {
        Some(reported) => validate_url(reported),
        None if browser => resolve_browser_url(&app_name).await,
        None => None,
    };

    // Show the page title rather than "Chrome" for every browser capture
    let source_app = if browser {
        info.window_title
            .as_deref()
            .and_then(clean_browser_title)
            .unwrap_or(app_name)
    } else {
        app_name
    };

    Ok(SourceContext {
        source_app: Some(source_app),
        source_url,
    })
}
