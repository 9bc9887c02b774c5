//! Logging facilities for setup-flow.
//!
//! setup-flow uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the host installs a subscriber:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("setup_flow=debug,setup_flow_core=info")
//!     .init();
//! ```
//!
//! Every event is emitted under one of the [`targets`] below so hosts can
//! raise or silence a single subsystem.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core primitives target.
    pub const CORE: &str = "setup_flow_core";
    /// Signal/slot fan-out target.
    pub const SIGNAL: &str = "setup_flow_core::signal";
    /// Deferred task queue target.
    pub const TASK: &str = "setup_flow_core::task";
    /// Timer system target.
    pub const TIMER: &str = "setup_flow_core::timer";
    /// Cross-thread mailbox target.
    pub const MAILBOX: &str = "setup_flow_core::mailbox";

    /// Wizard crate target.
    pub const FLOW: &str = "setup_flow";
    /// Page list and cut-off bookkeeping.
    pub const STATE: &str = "setup_flow::state";
    /// Navigation requests and lifecycle transitions.
    pub const NAVIGATION: &str = "setup_flow::navigation";
    /// Snapshot save/load.
    pub const SNAPSHOT: &str = "setup_flow::snapshot";
    /// Preference persistence.
    pub const PREFS: &str = "setup_flow::prefs";
    /// Configuration loading.
    pub const CONFIG: &str = "setup_flow::config";
}

/// Span names used for tracing.
///
/// These constants can be used to filter traces for specific operations.
pub mod span_names {
    /// One pass of the coordinator's pending-work loop.
    pub const PROCESS_PENDING: &str = "setup_flow::process_pending";
    /// Flow completion side effects.
    pub const FINISH_SETUP: &str = "setup_flow::finish_setup";
}

#[cfg(test)]
mod tests {
    use super::targets;

    #[test]
    fn test_targets_are_namespaced() {
        for target in [targets::SIGNAL, targets::TASK, targets::TIMER, targets::MAILBOX] {
            assert!(target.starts_with(targets::CORE));
        }
        for target in [
            targets::STATE,
            targets::NAVIGATION,
            targets::SNAPSHOT,
            targets::PREFS,
            targets::CONFIG,
        ] {
            assert!(target.starts_with(targets::FLOW));
        }
    }
}
