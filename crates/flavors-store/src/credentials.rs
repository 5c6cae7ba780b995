//! Username / password-digest storage in a flat JSON file.
//!
//! The file maps usernames to records:
//!
//! ```json
//! {
//!   "alice": { "name": "Alice", "password_hash": "9f2c…", "salt": "0a1b…", "rounds": 10000 }
//! }
//! ```
//!
//! It is read fully and rewritten fully on every mutation.  Records written
//! by earlier releases (a bare unsalted SHA-256 hex string, or an object with
//! only `password_hash`) are still accepted and are rewritten in the salted
//! form after the first successful login.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use flavors_shared::constants::PASSWORD_HASH_ROUNDS;
use flavors_shared::error::require;
use flavors_shared::password::{legacy_matches, PasswordDigest};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// A salted credential record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    /// Display name.
    pub name: String,
    #[serde(flatten)]
    pub digest: PasswordDigest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
enum StoredCredential {
    Salted(Credential),
    Unsalted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        password_hash: String,
    },
    Bare(String),
}

type CredentialMap = BTreeMap<String, StoredCredential>;

/// File-backed credential store.
///
/// Read-modify-write cycles are serialized by an internal lock, so
/// concurrent registrations of one username through the same store cannot
/// both succeed.  The file is replaced atomically (uniquely named temp file +
/// rename).  The lock is per process: other writers to the same file, such
/// as the `add-user` tool, must not run alongside the server.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    rounds: u32,
    lock: Mutex<()>,
    /// Checked against for unknown usernames so every failed login pays for
    /// one derivation.
    decoy: PasswordDigest,
}

impl CredentialStore {
    /// Use the file at `path`; it is created on the first registration.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_rounds(path, PASSWORD_HASH_ROUNDS)
    }

    /// Like [`open`](Self::open) with a custom number of digest rounds for
    /// new records.
    pub fn with_rounds(path: impl Into<PathBuf>, rounds: u32) -> Self {
        Self {
            path: path.into(),
            rounds: rounds.max(1),
            lock: Mutex::new(()),
            decoy: PasswordDigest::new("", rounds.max(1)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register `username`. Returns `false`, without touching the file, if
    /// the username is taken.  A blank display name defaults to the
    /// username.
    pub fn register(&self, username: &str, name: &str, password: &str) -> Result<bool> {
        require("username", username)?;
        require("password", password)?;

        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut users = self.load()?;

        if users.contains_key(username) {
            tracing::debug!(username, "registration rejected: username taken");
            return Ok(false);
        }

        let display = if name.trim().is_empty() { username } else { name.trim() };
        users.insert(
            username.to_string(),
            StoredCredential::Salted(Credential {
                name: display.to_string(),
                digest: PasswordDigest::new(password, self.rounds),
            }),
        );
        self.persist(&users)?;

        tracing::info!(username, "user registered");
        Ok(true)
    }

    /// Check a login attempt.  Unknown users and wrong passwords both yield
    /// `false`.
    pub fn verify(&self, username: &str, password: &str) -> Result<bool> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut users = self.load()?;

        let (valid, legacy_name) = match users.get(username) {
            None => {
                std::hint::black_box(self.decoy.matches(password));
                (false, None)
            }
            Some(StoredCredential::Salted(c)) => (c.digest.matches(password), None),
            Some(StoredCredential::Unsalted {
                name,
                password_hash,
            }) => (
                legacy_matches(password_hash, password),
                Some(name.clone().unwrap_or_else(|| username.to_string())),
            ),
            Some(StoredCredential::Bare(hash)) => {
                (legacy_matches(hash, password), Some(username.to_string()))
            }
        };

        if let (true, Some(name)) = (valid, legacy_name) {
            users.insert(
                username.to_string(),
                StoredCredential::Salted(Credential {
                    name,
                    digest: PasswordDigest::new(password, self.rounds),
                }),
            );
            match self.persist(&users) {
                Ok(()) => tracing::info!(username, "upgraded legacy password digest"),
                Err(e) => tracing::warn!(username, error = %e, "could not upgrade legacy digest"),
            }
        }

        Ok(valid)
    }

    /// Display name for `username`, if registered.
    pub fn display_name(&self, username: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let users = self.load()?;

        Ok(users.get(username).map(|stored| match stored {
            StoredCredential::Salted(c) => c.name.clone(),
            StoredCredential::Unsalted { name, .. } => {
                name.clone().unwrap_or_else(|| username.to_string())
            }
            StoredCredential::Bare(_) => username.to_string(),
        }))
    }

    /// All registered usernames, sorted.
    pub fn usernames(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(self.load()?.into_keys().collect())
    }

    pub fn len(&self) -> Result<usize> {
        let _guard = self.lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    // missing or blank file = no users
    fn load(&self) -> Result<CredentialMap> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CredentialMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.trim().is_empty() {
            return Ok(CredentialMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn persist(&self, users: &CredentialMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, users)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
