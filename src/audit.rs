//! Encrypted, append-only audit log of scanned URLs.
//!
//! Every analyzed URL and its final status is recorded for later inspection.
//! URLs are encrypted at rest (AES-256-GCM) so the audit database never
//! contains scanned links in the clear; the key is loaded from the
//! environment or persisted once to an owner-only key file so records stay
//! readable across restarts.
//!
//! The sink is fire-and-forget: the scan path dispatches a write and moves
//! on. Failures are logged here and never reach the caller; audit trouble
//! must not take down message processing.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use log::{error, info};
use sqlx::SqlitePool;

use crate::config::AUDIT_KEY_ENV;
use crate::error_handling::{AuditError, DatabaseError};
use crate::verdict::{mask_url, VerdictStatus};

/// Nonce length of AES-GCM, prepended to each ciphertext.
const NONCE_LEN: usize = 12;

/// Destination for audit records.
///
/// Injected into the scanner so tests can substitute [`MemoryAuditLog`];
/// implementations swallow their own failures.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Records one scanned URL and its final status.
    async fn record(&self, url: &str, status: VerdictStatus);
}

/// Production sink: encrypted rows in an append-only SQLite table.
pub struct SqliteAuditLog {
    pool: Arc<SqlitePool>,
    cipher: Aes256Gcm,
}

impl SqliteAuditLog {
    /// Opens (creating if needed) the audit database and loads the
    /// encryption key.
    ///
    /// Key precedence: base64 key from the `LINK_VERDICT_AUDIT_KEY`
    /// environment variable, then the key file, else a fresh key is
    /// generated and persisted to the key file with owner-only permissions.
    pub async fn open(db_path: &Path, key_file: &Path) -> Result<Self, AuditError> {
        let key = load_or_generate_key(key_file)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| AuditError::KeyError(e.to_string()))?;

        let db_path_str = db_path.to_string_lossy().to_string();
        match OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&db_path_str)
        {
            Ok(_) => info!("Audit database file created."),
            Err(ref e) if e.kind() == ErrorKind::AlreadyExists => {
                info!("Audit database file already exists.")
            }
            Err(e) => {
                return Err(DatabaseError::FileCreationError(e.to_string()).into());
            }
        }
        restrict_permissions(db_path)?;

        let pool = SqlitePool::connect(&format!("sqlite:{}", db_path_str))
            .await
            .map_err(DatabaseError::SqlError)?;

        // WAL mode for concurrent writers from many scan tasks
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await
            .map_err(DatabaseError::SqlError)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS scan_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                status TEXT NOT NULL,
                recorded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(DatabaseError::SqlError)?;

        Ok(SqliteAuditLog {
            pool: Arc::new(pool),
            cipher,
        })
    }

    /// Encrypts a URL into the stored envelope: `base64(nonce ‖ ciphertext)`.
    pub fn encrypt_url(&self, url: &str) -> Result<String, AuditError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, url.as_bytes())
            .map_err(|e| AuditError::CipherError(e.to_string()))?;
        let mut envelope = nonce.to_vec();
        envelope.extend_from_slice(&ciphertext);
        Ok(BASE64_STANDARD.encode(envelope))
    }

    /// Decrypts a stored envelope back to the URL. Used by audit tooling
    /// only; nothing in the scan path reads records back.
    pub fn decrypt_url(&self, envelope: &str) -> Result<String, AuditError> {
        let blob = BASE64_STANDARD
            .decode(envelope)
            .map_err(|e| AuditError::CipherError(e.to_string()))?;
        if blob.len() < NONCE_LEN {
            return Err(AuditError::CipherError("envelope too short".to_string()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| AuditError::CipherError(e.to_string()))?;
        String::from_utf8(plaintext).map_err(|e| AuditError::CipherError(e.to_string()))
    }

    async fn append(&self, url: &str, status: VerdictStatus) -> Result<(), AuditError> {
        let encrypted = self.encrypt_url(url)?;
        sqlx::query("INSERT INTO scan_history (url, status) VALUES (?1, ?2)")
            .bind(encrypted)
            .bind(status.label())
            .execute(self.pool.as_ref())
            .await
            .map_err(DatabaseError::SqlError)?;
        Ok(())
    }
}

#[async_trait]
impl AuditSink for SqliteAuditLog {
    async fn record(&self, url: &str, status: VerdictStatus) {
        match self.append(url, status).await {
            Ok(()) => info!("[audit] {} => {}", mask_url(url), status),
            Err(e) => error!("Failed to record audit entry for {}: {e}", mask_url(url)),
        }
    }
}

/// In-memory sink for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryAuditLog {
    records: std::sync::Mutex<Vec<(String, VerdictStatus)>>,
}

impl MemoryAuditLog {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<(String, VerdictStatus)> {
        self.records.lock().expect("audit lock poisoned").clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, url: &str, status: VerdictStatus) {
        self.records
            .lock()
            .expect("audit lock poisoned")
            .push((url.to_string(), status));
    }
}

/// Loads the audit key from the environment or the key file, generating and
/// persisting a fresh one when neither exists.
fn load_or_generate_key(key_file: &Path) -> Result<Vec<u8>, AuditError> {
    if let Ok(encoded) = std::env::var(AUDIT_KEY_ENV) {
        let key = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| AuditError::KeyError(format!("invalid {AUDIT_KEY_ENV}: {e}")))?;
        if key.len() != 32 {
            return Err(AuditError::KeyError(format!(
                "{AUDIT_KEY_ENV} must decode to 32 bytes, got {}",
                key.len()
            )));
        }
        return Ok(key);
    }

    if key_file.exists() {
        let encoded = std::fs::read_to_string(key_file)?;
        let key = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| AuditError::KeyError(format!("corrupt key file: {e}")))?;
        if key.len() != 32 {
            return Err(AuditError::KeyError("corrupt key file length".to_string()));
        }
        info!("Audit encryption key loaded from {}", key_file.display());
        return Ok(key);
    }

    let key = Aes256Gcm::generate_key(&mut OsRng);
    std::fs::write(key_file, BASE64_STANDARD.encode(key))?;
    restrict_permissions(key_file)?;
    info!("New audit encryption key written to {}", key_file.display());
    Ok(key.to_vec())
}

/// Restricts a file to owner read/write on Unix; no-op elsewhere.
fn restrict_permissions(path: &Path) -> Result<(), AuditError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
