//! Credential file loading and password verification.
//!
//! The credential file is a flat YAML mapping of username to an Argon2 PHC
//! string:
//!
//! ```yaml
//! admin: "$argon2id$v=19$m=19456,t=2,p=1$...$..."
//! ```
//!
//! It is re-read on every authentication attempt, so edits take effect without
//! a restart and nothing is cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path { &self.path }

    /// Parse the credential file. A missing or malformed file is a `Config` error.
    pub fn load(&self) -> AppResult<HashMap<String, String>> {
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| AppError::config(format!("cannot read credential file {}: {}", self.path.display(), e)))?;
        serde_yaml::from_str::<HashMap<String, String>>(&raw)
            .map_err(|e| AppError::config(format!("malformed credential file {}: {}", self.path.display(), e)))
    }

    /// True only when `username` is known and `password` verifies against its hash.
    pub fn authenticate(&self, username: &str, password: &str) -> AppResult<bool> {
        let credentials = self.load()?;
        let Some(hash) = credentials.get(username) else {
            info!(target: "flatcms::auth", "sign-in rejected: unknown user '{}'", username);
            return Ok(false);
        };
        let ok = verify_password(hash, password);
        if !ok {
            info!(target: "flatcms::auth", "sign-in rejected: bad password for '{}'", username);
        }
        Ok(ok)
    }
}

/// Hash a password into an Argon2 PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Verify `password` against a PHC string. Unparseable hashes never verify.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            debug!(target: "flatcms::auth", "stored hash is not a valid PHC string: {}", e);
            false
        }
    }
}
