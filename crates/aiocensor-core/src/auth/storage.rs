//! Durable backends for the single named session slot.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;

/// Session file name in cache directory
const SESSION_FILE: &str = "auth.json";

/// Keychain service name for the keyring backend
const SERVICE_NAME: &str = "aiocensor";

/// Keychain entry holding the serialized session
const SESSION_KEY: &str = "auth";

/// One named slot holding the serialized session.
///
/// Writes replace the whole slot; readers never see a partial write.
pub trait SessionSlot: Send + Sync {
    /// Raw slot contents, `None` when the slot is empty.
    fn read(&self) -> Result<Option<String>>;

    fn write(&self, contents: &str) -> Result<()>;

    /// Remove the slot. Removing an empty slot is not an error.
    fn remove(&self) -> Result<()>;
}

// ============================================================================
// File
// ============================================================================

/// Slot backed by a JSON file in the cache directory.
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

impl SessionSlot for FileSlot {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file {}", self.path.display()))?;
        Ok(Some(contents))
    }

    fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        // Rename is atomic on the same filesystem, so readers see old or new, never half.
        let tmp = self.temp_path();
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &self.path).context("Failed to replace session file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

// ============================================================================
// Keyring
// ============================================================================

/// Slot backed by the OS keychain.
pub struct KeyringSlot {
    entry: Entry,
}

impl KeyringSlot {
    pub fn new() -> Result<Self> {
        Self::for_user(SESSION_KEY)
    }

    fn for_user(user: &str) -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, user).context("Failed to create keyring entry")?;
        Ok(Self { entry })
    }
}

impl SessionSlot for KeyringSlot {
    fn read(&self) -> Result<Option<String>> {
        match self.entry.get_password() {
            Ok(contents) => Ok(Some(contents)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        self.entry
            .set_password(contents)
            .context("Failed to store session in keychain")
    }

    fn remove(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Process-local slot. Clones share the same contents, which lets two stores
/// observe each other's writes.
#[derive(Clone, Default)]
pub struct MemorySlot {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: &str) -> Self {
        Self {
            contents: Arc::new(Mutex::new(Some(contents.to_string()))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl SessionSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self
            .contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
