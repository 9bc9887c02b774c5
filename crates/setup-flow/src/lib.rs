//! First-run setup wizard flow controller.
//!
//! This crate drives an ordered sequence of setup pages, some required and
//! some optional, that can appear and disappear at runtime. It decides how
//! far the user may navigate, keeps a paged view in sync with that decision,
//! survives teardown through serializable snapshots, and runs the one-time
//! completion work when the user leaves the last page.
//!
//! # Components
//!
//! - [`Page`] / [`PageList`]: pages and their ordering
//! - [`SetupFlowState`]: the controller; owns the list, tracks the current
//!   index and the cut-off, notifies [`FlowListener`]s
//! - [`FlowView`]: paged presentation adapter and navigation chrome
//! - [`NavigationCoordinator`]: queues navigation, runs page side effects and
//!   flow completion against injected [`Platform`] capabilities
//! - [`Snapshot`]: JSON-serializable capture of a flow
//! - [`FlowConfig`]: page catalogue and knobs, loadable from TOML
//! - [`prefs`]: persistent one-time guards
//!
//! # Example
//!
//! ```
//! use setup_flow::{AdvanceOutcome, Page, SetupFlowState};
//!
//! let mut state = SetupFlowState::from_pages([
//!     Page::new("intro", "page_intro"),
//!     Page::new("account", "page_account").required().ephemeral(),
//!     Page::new("finish", "page_finish").terminal(),
//! ])?;
//!
//! state.complete_page("account");
//! assert_eq!(state.page_list().size(), 2);
//!
//! assert!(matches!(state.advance(), AdvanceOutcome::Moved { to: 1, .. }));
//! assert_eq!(state.advance(), AdvanceOutcome::ReachedTerminal);
//! # Ok::<(), setup_flow::FlowError>(())
//! ```
//!
//! # Logging
//!
//! All events use the targets in [`setup_flow_core::logging::targets`].

pub mod config;
pub mod coordinator;
mod error;
pub mod page;
pub mod page_list;
pub mod platform;
pub mod prefs;
pub mod snapshot;
pub mod state;
pub mod view;

pub use config::{FlowConfig, PageSpec};
pub use coordinator::{NavigationCoordinator, NavigationIntent, Phase};
pub use error::{FlowError, FlowResult};
pub use page::{DEFAULT_NEXT_LABEL, Page, PageId, ViewFactory};
pub use page_list::PageList;
pub use platform::{
    AccountSetup, AccountSetupCallback, AccountSetupOptions, AccountSetupOutcome,
    AdvisoryPresenter, ChromeController, ComponentRegistry, Connectivity, Environment,
    HomeNavigator, Platform, PlatformError, PlatformResult, ProvisioningStore,
};
pub use prefs::{JsonPreferences, MemoryPreferences, Preferences};
pub use snapshot::{PageRecord, SNAPSHOT_VERSION, Snapshot};
pub use state::{AdvanceOutcome, FlowEvent, FlowListener, ListenerId, SetupFlowState};
pub use view::{FlowView, NavigationChrome};
