//! Platform capabilities consumed by the coordinator.
//!
//! The flow never talks to the host system directly. Everything it needs
//! (environment queries, the external account integration, and the
//! completion side effects) is injected through the traits below and bundled
//! in a [`Platform`].
//!
//! # Example
//!
//! ```ignore
//! let platform = Platform {
//!     account_setup: Arc::new(MyAccounts::new()),
//!     environment: Arc::new(DeviceEnvironment),
//!     provisioning: Arc::new(SettingsStore),
//!     chrome: Arc::new(StatusBar),
//!     components: Arc::new(PackageComponents),
//!     home: Arc::new(Launcher),
//!     connectivity: Arc::new(WifiManager),
//!     advisory: Arc::new(Dialogs),
//! };
//! ```

use std::fmt;
use std::sync::Arc;

// ============================================================================
// Error Types
// ============================================================================

/// Error reported by a platform capability.
///
/// Side-effect failures are logged and do not stop the flow.
#[derive(Debug, Clone)]
pub struct PlatformError {
    kind: PlatformErrorKind,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlatformErrorKind {
    /// The host refused or failed the operation.
    Failed,
    /// The host does not support the operation.
    Unsupported,
}

impl PlatformError {
    /// Create an error for a failed operation.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: PlatformErrorKind::Failed,
            message: message.into(),
        }
    }

    /// Create an error for an operation the host does not support.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self {
            kind: PlatformErrorKind::Unsupported,
            message: message.into(),
        }
    }

    /// Returns true if this error indicates the operation is not supported.
    pub fn is_unsupported(&self) -> bool {
        self.kind == PlatformErrorKind::Unsupported
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PlatformErrorKind::Failed => write!(f, "platform operation failed: {}", self.message),
            PlatformErrorKind::Unsupported => write!(f, "unsupported platform: {}", self.message),
        }
    }
}

impl std::error::Error for PlatformError {}

/// Result type for platform calls.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

// ============================================================================
// Account Setup
// ============================================================================

/// Options passed to the external account integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSetupOptions {
    /// Account type to add.
    pub account_type: String,
    /// The integration runs as part of first-run setup.
    pub first_run: bool,
    /// The user may skip account creation.
    pub allow_skip: bool,
}

impl AccountSetupOptions {
    /// Options used during first-run setup.
    pub fn first_run(account_type: impl Into<String>) -> Self {
        Self {
            account_type: account_type.into(),
            first_run: true,
            allow_skip: true,
        }
    }
}

/// How the external account integration ended.
///
/// The coordinator treats every outcome the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSetupOutcome {
    Success,
    Failure,
    Skipped,
}

/// Completion callback for [`AccountSetup::add_account`].
///
/// May be invoked from any thread, at most once.
pub type AccountSetupCallback = Box<dyn FnOnce(AccountSetupOutcome) + Send>;

/// External account-setup integration.
pub trait AccountSetup: Send + Sync {
    /// Start adding an account. Returns immediately; `callback` fires later.
    fn add_account(&self, options: AccountSetupOptions, callback: AccountSetupCallback);
}

// ============================================================================
// Environment
// ============================================================================

/// Boolean queries against the host.
pub trait Environment: Send + Sync {
    /// Is the external account service installed and usable.
    fn external_account_service_available(&self) -> bool;

    /// Does an account of `account_type` already exist.
    fn account_exists(&self, account_type: &str) -> bool;

    /// Is the radio a GSM device.
    fn is_gsm_radio(&self) -> bool;

    /// Is the SIM card missing.
    fn is_sim_missing(&self) -> bool;

    /// Is any network connected.
    fn is_network_connected(&self) -> bool;
}

// ============================================================================
// Side Effects
// ============================================================================

/// Records that the device finished first-run setup.
pub trait ProvisioningStore: Send + Sync {
    fn mark_provisioned(&self) -> PlatformResult<()>;
}

/// System UI surrounding the wizard.
pub trait ChromeController: Send + Sync {
    /// Hide system chrome while setup runs.
    fn hide(&self) -> PlatformResult<()>;

    /// Restore normal chrome visibility.
    fn restore(&self) -> PlatformResult<()>;
}

/// Enables and disables launchable components.
pub trait ComponentRegistry: Send + Sync {
    /// Disable this wizard and any setup wizard shipped by `alternate_package`.
    fn disable_alternate_entry_points(&self, alternate_package: &str) -> PlatformResult<()>;
}

/// Leaves the wizard for the home surface.
pub trait HomeNavigator: Send + Sync {
    fn navigate_home(&self) -> PlatformResult<()>;
}

/// Radio control.
pub trait Connectivity: Send + Sync {
    /// Try to turn Wi-Fi on.
    fn try_enable_wifi(&self) -> PlatformResult<()>;
}

/// Presents advisory dialogs.
pub trait AdvisoryPresenter: Send + Sync {
    /// Tell the user no SIM card was detected.
    fn show_sim_missing(&self);
}

// ============================================================================
// Platform
// ============================================================================

/// All capabilities the coordinator needs.
#[derive(Clone)]
pub struct Platform {
    pub account_setup: Arc<dyn AccountSetup>,
    pub environment: Arc<dyn Environment>,
    pub provisioning: Arc<dyn ProvisioningStore>,
    pub chrome: Arc<dyn ChromeController>,
    pub components: Arc<dyn ComponentRegistry>,
    pub home: Arc<dyn HomeNavigator>,
    pub connectivity: Arc<dyn Connectivity>,
    pub advisory: Arc<dyn AdvisoryPresenter>,
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(Platform: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_run_options() {
        let options = AccountSetupOptions::first_run("com.example.account");
        assert_eq!(options.account_type, "com.example.account");
        assert!(options.first_run);
        assert!(options.allow_skip);
    }

    #[test]
    fn test_platform_error_display() {
        let err = PlatformError::failed("settings write denied");
        assert_eq!(
            err.to_string(),
            "platform operation failed: settings write denied"
        );
        assert!(!err.is_unsupported());
        assert!(PlatformError::unsupported("no radio").is_unsupported());
    }
}
