use std::fmt;

pub mod refresh;
pub mod storage;

pub use refresh::RefreshCoordinator;
pub use storage::{KeyProvider, KeyringKeyProvider, StaticKeyProvider, TokenEncryption, TokenStore};

/// Ошибки хранилища и обновления токенов
#[derive(Debug)]
pub enum AuthError {
    /// Platform key store inaccessible
    EncryptionUnavailable(String),
    /// Corrupt or invalidated ciphertext
    DecryptionFailure(String),
    /// Token endpoint answered non-2xx
    RefreshRejected { status: u16, body: String },
    /// Network or decode failure during refresh
    Transport(String),
    Io(String),
    /// Rejected configuration value or client setup failure
    Config(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::EncryptionUnavailable(s) => write!(f, "Encryption unavailable: {}", s),
            AuthError::DecryptionFailure(s) => write!(f, "Decryption failure: {}", s),
            AuthError::RefreshRejected { status, body } => {
                write!(f, "Refresh rejected with HTTP {}: {}", status, body)
            }
            AuthError::Transport(s) => write!(f, "Transport: {}", s),
            AuthError::Io(s) => write!(f, "IO: {}", s),
            AuthError::Config(s) => write!(f, "Config: {}", s),
        }
    }
}

impl std::error::Error for AuthError {}
