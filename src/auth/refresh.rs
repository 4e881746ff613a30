use super::storage::TokenStore;
use super::AuthError;
use crate::config::AuthConfig;
use crate::models::{SessionTokens, TokenKind, TokenResponse};
use scopeguard::{guard, ScopeGuard};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

type InFlight = Arc<Mutex<Option<broadcast::Sender<Option<String>>>>>;

/// Координатор обновления токенов (refresh_token grant, public client)
/// Single-flight: concurrent callers share the result of the one outstanding attempt.
#[derive(Clone)]
pub struct RefreshCoordinator {
    store: Arc<TokenStore>,
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    expiry_skew: Duration,
    in_flight: InFlight,
}

enum Flight {
    Leader,
    Follower(broadcast::Receiver<Option<String>>),
}

fn lock_slot(slot: &InFlight) -> MutexGuard<'_, Option<broadcast::Sender<Option<String>>>> {
    // The slot only ever holds a sender, so a poisoned lock is still usable
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RefreshCoordinator {
    pub fn new(store: Arc<TokenStore>, config: &AuthConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AuthError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            store,
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            expiry_skew: config.expiry_skew,
            in_flight: Arc::new(Mutex::new(None)),
        })
    }

    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Rotate the access token. `None` means the caller must re-authenticate.
    pub async fn refresh(&self) -> Option<String> {
        let flight = {
            let mut slot = lock_slot(&self.in_flight);
            match slot.as_ref() {
                Some(sender) => Flight::Follower(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    *slot = Some(sender);
                    Flight::Leader
                }
            }
        };

        match flight {
            Flight::Follower(mut receiver) => {
                debug!("[AUTH] Refresh already in flight, waiting for its result");
                // Closed means the leading caller was dropped mid-refresh
                receiver.recv().await.unwrap_or(None)
            }
            Flight::Leader => {
                let release = guard(Arc::clone(&self.in_flight), |slot| {
                    lock_slot(&slot).take();
                });
                let result = self.refresh_once().await;
                // Disarm before the slot opens up: once our sender is taken,
                // the slot may belong to the next leader.
                let slot = ScopeGuard::into_inner(release);
                let sender = lock_slot(&slot).take();
                if let Some(sender) = sender {
                    // No receivers is fine: nobody else was waiting
                    let _ = sender.send(result.clone());
                }
                result
            }
        }
    }

    async fn refresh_once(&self) -> Option<String> {
        let Some(refresh_token) = self.store.load(TokenKind::Refresh) else {
            debug!("[AUTH] No refresh token stored, skipping refresh");
            return None;
        };

        match self.request_refresh(&refresh_token).await {
            Ok(response) => {
                let tokens = SessionTokens::from(response);
                info!(
                    "[AUTH] Token refreshed: expires_in={}s, refresh token rotated={}",
                    tokens.expires_in,
                    tokens.refresh_token.is_some()
                );
                self.store.persist_session(&tokens);
                Some(tokens.access_token)
            }
            Err(e @ AuthError::RefreshRejected { .. }) => {
                warn!("[AUTH] Token refresh failed: {}", e);
                None
            }
            Err(e) => {
                error!("[AUTH] Token refresh error: {}", e);
                None
            }
        }
    }

    async fn request_refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::Transport(format!("Network error during token refresh: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::Transport(format!("Failed to parse refresh response: {}", e)))
    }

    /// A usable access token: the stored one while it is not about to expire,
    /// otherwise a freshly refreshed one.
    pub async fn access_token(&self) -> Option<String> {
        if let Some(token) = self.store.load(TokenKind::Access) {
            match self.store.load_expiry() {
                Some(expiry_ms) if !self.expires_soon(expiry_ms) => return Some(token),
                // Unknown expiry: let the server decide with a 401
                None => return Some(token),
                Some(_) => debug!("[AUTH] Access token expires soon, refreshing"),
            }
        }
        self.refresh().await
    }

    fn expires_soon(&self, expiry_ms: i64) -> bool {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let skew_ms = i64::try_from(self.expiry_skew.as_millis()).unwrap_or(i64::MAX);
        expiry_ms.saturating_sub(now_ms) <= skew_ms
    }

    pub async fn authorization_header(&self) -> Option<String> {
        self.access_token()
            .await
            .map(|token| format!("Bearer {}", token))
    }

    /// Called by the API client after a 401. A failed refresh signs the
    /// session out instead of leaving it half-authenticated.
    pub async fn handle_unauthorized(&self) -> Option<String> {
        match self.refresh().await {
            Some(token) => Some(token),
            None => {
                warn!("[AUTH] Refresh after 401 failed, signing out");
                self.sign_out();
                None
            }
        }
    }

    /// Store the result of the sign-in exchange.
    pub fn sign_in(&self, tokens: &SessionTokens) {
        info!(
            "[AUTH] Signed in: access token length={}, refresh token present={}",
            tokens.access_token.len(),
            tokens.refresh_token.is_some()
        );
        self.store.persist_session(tokens);
    }

    pub fn sign_out(&self) {
        info!("[AUTH] Signing out, clearing stored tokens");
        self.store.clear();
    }

    pub fn is_signed_in(&self) -> bool {
        self.store.load(TokenKind::Access).is_some()
    }
}
