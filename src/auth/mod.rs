//! Password gate for fingerprint uploads.
//!
//! The password file is JSON `{ "key": "<argon2 PHC string>" }`. A missing
//! file leaves the gate open so a fresh deployment can be seeded before a
//! password is set.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::utils::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct PasswordFile {
    key: String,
}

/// Verifies upload passwords against a stored Argon2 hash.
#[derive(Debug, Clone, Default)]
pub struct PasswordGate {
    hash: Option<String>,
}

impl PasswordGate {
    /// A gate that admits every password.
    pub fn open() -> Self {
        Self { hash: None }
    }

    /// Build a gate from an already computed PHC hash string.
    pub fn from_hash(hash: impl Into<String>) -> Result<Self> {
        let hash = hash.into();
        PasswordHash::new(&hash)
            .map_err(|e| Error::AuthError(format!("invalid password hash: {}", e)))?;
        Ok(Self { hash: Some(hash) })
    }

    /// Load the gate from a password file. Missing file => open gate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            | Ok(c) => c,
            | Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Password file {:?} not found, uploads are not password protected", path);
                return Ok(Self::open());
            }
            | Err(e) => {
                return Err(Error::AuthError(format!("Failed to read {:?}: {}", path, e)));
            }
        };
        let file: PasswordFile = serde_json::from_str(&content)
            .map_err(|e| Error::AuthError(format!("Malformed password file {:?}: {}", path, e)))?;
        info!("Loaded upload password from {:?}", path);
        Self::from_hash(file.key)
    }

    pub fn is_open(&self) -> bool {
        self.hash.is_none()
    }

    /// `Ok(())` when the password matches (or the gate is open),
    /// [`Error::Unauthorized`] otherwise.
    pub fn verify(&self, password: &str) -> Result<()> {
        let Some(hash) = &self.hash else {
            return Ok(());
        };
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::AuthError(format!("invalid password hash: {}", e)))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            | Ok(()) => Ok(()),
            | Err(password_hash::Error::Password) => Err(Error::Unauthorized),
            | Err(e) => Err(Error::AuthError(e.to_string())),
        }
    }
}

/// Hash `plain` into an Argon2id PHC string with a random salt.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::AuthError(format!("hashing failed: {}", e)))
}

/// Hash `plain` and write it as a password file, creating parent dirs.
/// A single trailing newline (as read from a terminal) is not part of the password.
pub fn write_password_file<P: AsRef<Path>>(path: P, plain: &str) -> Result<()> {
    let plain = plain.strip_suffix('\n').unwrap_or(plain);
    let plain = plain.strip_suffix('\r').unwrap_or(plain);
    if plain.is_empty() {
        return Err(Error::InvalidArgument("password must not be empty".to_string()));
    }
    let path = path.as_ref();
    let file = PasswordFile { key: hash_password(plain)? };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string(&file)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_opens_gate() {
        let dir = tempdir().unwrap();
        let gate = PasswordGate::load(dir.path().join("password.json")).unwrap();
        assert!(gate.is_open());
        assert!(gate.verify("anything").is_ok());
    }

    #[test]
    fn test_written_password_verifies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("core").join("password.json");
        write_password_file(&path, "s3cret\n").unwrap();

        let gate = PasswordGate::load(&path).unwrap();
        assert!(!gate.is_open());
        assert!(gate.verify("s3cret").is_ok());
        assert_matches!(gate.verify("s3cret\n"), Err(Error::Unauthorized));
        assert_matches!(gate.verify("wrong"), Err(Error::Unauthorized));
    }

    #[test]
    fn test_malformed_file_is_auth_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("password.json");
        fs::write(&path, "{ not json").unwrap();
        assert_matches!(PasswordGate::load(&path), Err(Error::AuthError(_)));

        fs::write(&path, r#"{"key":"plaintext"}"#).unwrap();
        assert_matches!(PasswordGate::load(&path), Err(Error::AuthError(_)));
    }

    #[test]
    fn test_empty_password_rejected() {
        let dir = tempdir().unwrap();
        let res = write_password_file(dir.path().join("p.json"), "\n");
        assert_matches!(res, Err(Error::InvalidArgument(_)));
    }
}
