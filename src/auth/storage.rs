use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};

use super::AuthError;
use crate::config::{AuthConfig, APP_IDENTIFIER};
use crate::models::{SessionTokens, TokenKind};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const NONCE_LEN: usize = 12;
const KEYRING_ACCOUNT: &str = "token-encryption-key";

/// Supplies the 256-bit key protecting the token blobs.
pub trait KeyProvider {
    fn encryption_key(&self) -> Result<[u8; 32], AuthError>;
}

/// Key held by the OS credential store (Keychain, Credential Manager, kernel keyring).
/// Generated on first use.
pub struct KeyringKeyProvider {
    service: String,
    account: String,
}

impl Default for KeyringKeyProvider {
    fn default() -> Self {
        Self::new(APP_IDENTIFIER, KEYRING_ACCOUNT)
    }
}

impl KeyringKeyProvider {
    pub fn new(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }
}

impl KeyProvider for KeyringKeyProvider {
    fn encryption_key(&self) -> Result<[u8; 32], AuthError> {
        let entry = keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| AuthError::EncryptionUnavailable(format!("Keyring entry: {}", e)))?;

        match entry.get_password() {
            Ok(stored) => decode_key(&stored).map_err(AuthError::EncryptionUnavailable),
            Err(keyring::Error::NoEntry) => {
                info!("[TOKENS] No encryption key in keyring, generating a new one");
                let key = Aes256Gcm::generate_key(OsRng);
                entry.set_password(&hex::encode(key.as_slice())).map_err(|e| {
                    AuthError::EncryptionUnavailable(format!("Failed to store key: {}", e))
                })?;
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(key.as_slice());
                Ok(bytes)
            }
            Err(e) => Err(AuthError::EncryptionUnavailable(format!(
                "Keyring access failed: {}",
                e
            ))),
        }
    }
}

/// Fixed key, from `CURATE_ENCRYPTION_KEY` or tests.
pub struct StaticKeyProvider {
    key: [u8; 32],
}

impl StaticKeyProvider {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, AuthError> {
        decode_key(hex_key).map(Self::new).map_err(AuthError::Config)
    }
}

impl KeyProvider for StaticKeyProvider {
    fn encryption_key(&self) -> Result<[u8; 32], AuthError> {
        Ok(self.key)
    }
}

fn decode_key(hex_key: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(hex_key.trim())
        .map_err(|e| format!("Encryption key is not valid hex: {}", e))?;
    bytes
        .try_into()
        .map_err(|_| "Encryption key must be 32 bytes".to_string())
}

/// AES-256-GCM, stored as base64(nonce || ciphertext)
pub struct TokenEncryption {
    cipher: Aes256Gcm,
}

impl TokenEncryption {
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    pub fn encrypt(&self, token: &str) -> Result<String, AuthError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, token.as_bytes())
            .map_err(|e| AuthError::EncryptionUnavailable(format!("Encryption failed: {}", e)))?;

        let mut result = nonce.to_vec();
        result.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(&result))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String, AuthError> {
        let data = general_purpose::STANDARD
            .decode(encrypted.trim())
            .map_err(|e| AuthError::DecryptionFailure(format!("Base64 decode failed: {}", e)))?;

        if data.len() < NONCE_LEN {
            return Err(AuthError::DecryptionFailure(
                "Invalid encrypted data length".into(),
            ));
        }

        let nonce = Nonce::from_slice(&data[..NONCE_LEN]);
        let plaintext = self
            .cipher
            .decrypt(nonce, &data[NONCE_LEN..])
            .map_err(|e| AuthError::DecryptionFailure(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AuthError::DecryptionFailure(format!("UTF-8 decode failed: {}", e)))
    }
}

/// Encrypted-at-rest token files, one per `TokenKind`.
///
/// Every operation is best-effort: nothing here returns an error to the caller.
/// A blob that cannot be read back wipes all three kinds, so the store is
/// never left half-readable.
pub struct TokenStore {
    dir: PathBuf,
    encryption: Option<TokenEncryption>,
}

impl TokenStore {
    /// Check key availability once; an unavailable key turns every write into
    /// a logged no-op and every read into `None`.
    pub fn open(dir: impl Into<PathBuf>, keys: &dyn KeyProvider) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("[TOKENS] Failed to create token dir {}: {}", dir.display(), e);
        }
        let encryption = match keys.encryption_key() {
            Ok(key) => Some(TokenEncryption::new(key)),
            Err(e) => {
                warn!("[TOKENS] {}. Tokens will not be persisted", e);
                None
            }
        };
        Self { dir, encryption }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        match config.encryption_key_hex.as_deref() {
            Some(hex_key) => match StaticKeyProvider::from_hex(hex_key) {
                Ok(provider) => Self::open(&config.data_dir, &provider),
                Err(e) => {
                    warn!("[TOKENS] CURATE_ENCRYPTION_KEY rejected: {}", e);
                    Self::unavailable(&config.data_dir)
                }
            },
            None => Self::open(&config.data_dir, &KeyringKeyProvider::default()),
        }
    }

    /// A store without key material.
    pub fn unavailable(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            encryption: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.encryption.is_some()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn token_path(&self, kind: TokenKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    pub fn persist(&self, kind: TokenKind, value: &str) {
        let Some(encryption) = self.encryption.as_ref() else {
            warn!("[TOKENS] Encryption unavailable, skipping persist of {} token", kind);
            return;
        };
        if let Err(e) = self.write_encrypted(encryption, kind, value) {
            error!("[TOKENS] Failed to persist {} token: {}", kind, e);
        }
    }

    fn write_encrypted(
        &self,
        encryption: &TokenEncryption,
        kind: TokenKind,
        value: &str,
    ) -> Result<(), AuthError> {
        let encoded = encryption.encrypt(value)?;
        let path = self.token_path(kind);
        // Each writer gets its own temp file; concurrent writers of one kind
        // then race only on the rename, never on the content.
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}.", kind.file_name()))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| AuthError::Io(format!("create temp file in {}: {}", self.dir.display(), e)))?;
        tmp.write_all(encoded.as_bytes())
            .map_err(|e| AuthError::Io(format!("write {}: {}", tmp.path().display(), e)))?;
        // Dropping the temp file on failure removes it
        tmp.persist(&path)
            .map_err(|e| AuthError::Io(format!("rename to {}: {}", path.display(), e.error)))?;
        debug!("[TOKENS] Persisted {} token", kind);
        Ok(())
    }

    /// `None` means signed out: no key, no blob, or a blob we could not read
    /// (in which case every kind has just been erased).
    pub fn load(&self, kind: TokenKind) -> Option<String> {
        let encryption = self.encryption.as_ref()?;
        match self.read_decrypted(encryption, kind) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "[TOKENS] Failed to read {} token ({}), treating as signed out and wiping tokens",
                    kind, e
                );
                self.clear();
                None
            }
        }
    }

    fn read_decrypted(
        &self,
        encryption: &TokenEncryption,
        kind: TokenKind,
    ) -> Result<Option<String>, AuthError> {
        let path = self.token_path(kind);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Io(format!("read {}: {}", path.display(), e))),
        };
        encryption.decrypt(&raw).map(Some)
    }

    /// Remove every token kind; each delete is independent.
    pub fn clear(&self) {
        for kind in TokenKind::ALL {
            let path = self.token_path(kind);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("[TOKENS] Removed {} token", kind),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => debug!("[TOKENS] Failed to remove {} token: {}", kind, e),
            }
        }
    }

    /// Persist a sign-in or refresh result as one unit.
    /// The stored refresh token is only replaced when a new one was issued.
    pub fn persist_session(&self, tokens: &SessionTokens) {
        self.persist(TokenKind::Access, &tokens.access_token);
        if let Some(refresh) = tokens.refresh_token.as_deref() {
            self.persist(TokenKind::Refresh, refresh);
        }
        let expiry = expiry_from_now(tokens.expires_in);
        self.persist(TokenKind::Expiry, &expiry.to_string());
    }

    /// Stored expiry as epoch milliseconds.
    pub fn load_expiry(&self) -> Option<i64> {
        let raw = self.load(TokenKind::Expiry)?;
        match raw.trim().parse::<i64>() {
            Ok(ms) => Some(ms),
            Err(e) => {
                warn!("[TOKENS] Stored expiry is not a timestamp: {}", e);
                None
            }
        }
    }
}

/// Absolute expiry in epoch milliseconds for a lifetime in seconds.
pub(crate) fn expiry_from_now(expires_in_secs: i64) -> i64 {
    chrono::Utc::now()
        .timestamp_millis()
        .saturating_add(expires_in_secs.saturating_mul(1000))
}
