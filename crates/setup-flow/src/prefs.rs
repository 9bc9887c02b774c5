//! One-time guards that persist across sessions.
//!
//! The coordinator only needs a handful of boolean flags ("has the SIM
//! advisory been shown", "has the external account page auto-launched"). They
//! live behind the [`Preferences`] trait so hosts can back them with whatever
//! store they like.
//!
//! Two implementations are provided:
//!
//! - [`MemoryPreferences`]: process-local, for tests and hosts that do not
//!   persist anything
//! - [`JsonPreferences`]: a flat JSON object on disk, rewritten atomically on
//!   every change
//!
//! # Example
//!
//! ```no_run
//! use setup_flow::prefs::{JsonPreferences, Preferences, keys};
//!
//! let prefs = JsonPreferences::open_default()?;
//! if !prefs.flag(keys::SIM_MISSING_SHOWN) {
//!     prefs.set_bool(keys::SIM_MISSING_SHOWN, true)?;
//! }
//! # Ok::<(), setup_flow::FlowError>(())
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use parking_lot::RwLock;
use setup_flow_core::logging::targets;

use crate::error::{FlowError, FlowResult};

/// Preference keys used by the coordinator.
pub mod keys {
    /// The SIM-missing advisory was already shown this session.
    pub const SIM_MISSING_SHOWN: &str = "sim-missing-shown";
    /// The external account page already auto-launched the integration.
    pub const EXTERNAL_ACCOUNT_SHOWN: &str = "external-account-shown";
}

/// File name used by [`JsonPreferences::default_path`].
pub const DEFAULT_FILE_NAME: &str = "preferences.json";

/// Boolean key/value store.
pub trait Preferences: Send + Sync {
    /// Get a stored value.
    fn get_bool(&self, key: &str) -> Option<bool>;

    /// Store a value.
    fn set_bool(&self, key: &str, value: bool) -> FlowResult<()>;

    /// Get a flag, treating a missing value as `false`.
    fn flag(&self, key: &str) -> bool {
        self.get_bool(key).unwrap_or(false)
    }
}

// ============================================================================
// MemoryPreferences
// ============================================================================

/// In-memory preferences.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    data: RwLock<BTreeMap<String, bool>>,
}

impl MemoryPreferences {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.read().get(key).copied()
    }

    fn set_bool(&self, key: &str, value: bool) -> FlowResult<()> {
        self.data.write().insert(key.to_string(), value);
        Ok(())
    }
}

// ============================================================================
// JsonPreferences
// ============================================================================

/// Preferences stored as a JSON object in a single file.
#[derive(Debug)]
pub struct JsonPreferences {
    path: PathBuf,
    data: RwLock<BTreeMap<String, bool>>,
}

impl JsonPreferences {
    /// Open the store at `path`.
    ///
    /// A missing file is an empty store; it is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> FlowResult<Self> {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| FlowError::Preferences {
                    path: path.clone(),
                    message: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(FlowError::io(&path, e)),
        };
        tracing::debug!(target: targets::PREFS, path = %path.display(), "preferences opened");
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Open the store at [`default_path`](Self::default_path).
    pub fn open_default() -> FlowResult<Self> {
        let path = Self::default_path().ok_or_else(|| FlowError::Preferences {
            path: PathBuf::from(DEFAULT_FILE_NAME),
            message: "could not determine the preference directory".to_string(),
        })?;
        Self::open(path)
    }

    /// Platform preference directory for this crate, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "setup-flow", "setup-flow")
            .map(|dirs| dirs.preference_dir().join(DEFAULT_FILE_NAME))
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole map through a temporary file and rename it into place.
    fn persist(&self, data: &BTreeMap<String, bool>) -> FlowResult<()> {
        let json = serde_json::to_string_pretty(data).map_err(|e| FlowError::Preferences {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| FlowError::io(&dir, e))?;

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(|e| FlowError::io(&dir, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| FlowError::io(file.path(), e))?;
        file.as_file()
            .sync_all()
            .map_err(|e| FlowError::io(file.path(), e))?;
        file.persist(&self.path)
            .map_err(|e| FlowError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl Preferences for JsonPreferences {
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.read().get(key).copied()
    }

    fn set_bool(&self, key: &str, value: bool) -> FlowResult<()> {
        let mut data = self.data.write();
        if data.get(key) == Some(&value) {
            return Ok(());
        }
        // Memory only changes once the file does.
        let mut updated = data.clone();
        updated.insert(key.to_string(), value);
        self.persist(&updated)?;
        *data = updated;
        tracing::trace!(target: targets::PREFS, key, value, "preference written");
        Ok(())
    }
}

static_assertions::assert_impl_all!(MemoryPreferences: Send, Sync);
static_assertions::assert_impl_all!(JsonPreferences: Send, Sync);
