//! Wizard pages.
//!
//! A [`Page`] is one step of the setup flow. Its identity (`id`, `key`) and
//! its behaviour flags (`required`, `ephemeral`, `terminal`) are fixed when it
//! is built; only the `completed` flag changes afterwards, and only the flow
//! controller changes it.
//!
//! # Example
//!
//! ```
//! use setup_flow::{Page, PageId};
//!
//! let account = Page::new("external_account", "page_external_account")
//!     .required()
//!     .ephemeral()
//!     .with_next_label("skip");
//!
//! assert_eq!(account.id(), &PageId::new("external_account"));
//! assert!(account.is_required());
//! assert!(account.is_ephemeral());
//! assert!(!account.is_completed());
//! ```

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default caption for the advance action.
pub const DEFAULT_NEXT_LABEL: &str = "next";

// ============================================================================
// PageId
// ============================================================================

/// Stable symbolic identifier of a page.
///
/// Ids survive list mutation; never use a positional index to refer to a
/// page across operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Create a page id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for PageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for PageId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PageId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ============================================================================
// ViewFactory
// ============================================================================

/// Produces the renderable view for a page.
///
/// Implemented by the rendering layer. The flow controller never inspects
/// the views it gets back; it only decides which pages may be rendered.
pub trait ViewFactory {
    /// The opaque renderable handle.
    type View;

    /// Build the view for `page`.
    fn create_view(&self, page: &Page) -> Self::View;
}

// ============================================================================
// Page
// ============================================================================

/// One step of the setup wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Stable symbolic identifier.
    id: PageId,
    /// Secondary lookup key.
    key: String,
    /// The flow may not advance past this page until it is completed.
    required: bool,
    /// Removed from the flow as soon as it completes.
    ephemeral: bool,
    /// The "setup complete" page; advancing from it finishes the flow.
    terminal: bool,
    /// Set by the controller on explicit completion events.
    completed: bool,
    /// Caption hint for the advance action, forwarded untouched.
    next_label: String,
}

impl Page {
    /// Create an optional, non-ephemeral page.
    pub fn new(id: impl Into<PageId>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            required: false,
            ephemeral: false,
            terminal: false,
            completed: false,
            next_label: DEFAULT_NEXT_LABEL.to_string(),
        }
    }

    // =========================================================================
    // Builder Pattern Methods
    // =========================================================================

    /// Mark the page required using builder pattern.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set whether the page is required using builder pattern.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required || self.terminal;
        self
    }

    /// Mark the page as removed-on-completion using builder pattern.
    ///
    /// Ignored on terminal pages.
    pub fn ephemeral(self) -> Self {
        self.with_ephemeral(true)
    }

    /// Set whether the page is removed on completion using builder pattern.
    pub fn with_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral && !self.terminal;
        self
    }

    /// Mark the page as the terminal "setup complete" page.
    ///
    /// Terminal pages are always required and never ephemeral.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self.required = true;
        self.ephemeral = false;
        self
    }

    /// Set the advance caption using builder pattern.
    pub fn with_next_label(mut self, label: impl Into<String>) -> Self {
        self.next_label = label.into();
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the page id.
    pub fn id(&self) -> &PageId {
        &self.id
    }

    /// Get the page key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Check if the page must be completed before the user may pass it.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Check if the page leaves the flow once completed.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Check if this is the terminal page.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Terminal pages can never be removed.
    pub fn is_removable(&self) -> bool {
        !self.terminal
    }

    /// Check if the page has been completed.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Check if this page currently blocks forward navigation.
    pub fn blocks_navigation(&self) -> bool {
        self.required && !self.completed
    }

    /// Get the advance caption hint.
    pub fn next_label(&self) -> &str {
        &self.next_label
    }

    /// Set the completed flag.
    ///
    /// Returns `true` if the value changed; repeated sets are no-ops.
    pub(crate) fn set_completed(&mut self, completed: bool) -> bool {
        if self.completed == completed {
            return false;
        }
        self.completed = completed;
        true
    }

    /// Produce the renderable view for this page.
    pub fn create_view<F: ViewFactory + ?Sized>(&self, factory: &F) -> F::View {
        factory.create_view(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TitleFactory;

    impl ViewFactory for TitleFactory {
        type View = String;

        fn create_view(&self, page: &Page) -> String {
            format!("<{}>", page.key())
        }
    }

    #[test]
    fn test_page_defaults() {
        let page = Page::new("welcome", "page_welcome");

        assert_eq!(page.id().as_str(), "welcome");
        assert_eq!(page.key(), "page_welcome");
        assert!(!page.is_required());
        assert!(!page.is_ephemeral());
        assert!(!page.is_terminal());
        assert!(!page.is_completed());
        assert!(page.is_removable());
        assert_eq!(page.next_label(), DEFAULT_NEXT_LABEL);
    }

    #[test]
    fn test_terminal_page_is_required_and_fixed() {
        let page = Page::new("finish", "page_finish")
            .terminal()
            .with_required(false);

        assert!(page.is_terminal());
        assert!(page.is_required());
        assert!(!page.is_removable());
    }

    #[test]
    fn test_terminal_page_is_never_ephemeral() {
        let before = Page::new("finish", "page_finish").ephemeral().terminal();
        let after = Page::new("finish", "page_finish").terminal().ephemeral();
        let flagged = Page::new("finish", "page_finish")
            .terminal()
            .with_ephemeral(true);

        assert!(!before.is_ephemeral());
        assert!(!after.is_ephemeral());
        assert!(!flagged.is_ephemeral());
        assert!(Page::new("sim", "page_sim").ephemeral().is_ephemeral());
    }

    #[test]
    fn test_set_completed_is_idempotent() {
        let mut page = Page::new("wifi", "page_wifi").required();

        assert!(page.blocks_navigation());
        assert!(page.set_completed(true));
        assert!(!page.set_completed(true));
        assert!(page.is_completed());
        assert!(!page.blocks_navigation());
    }

    #[test]
    fn test_create_view_delegates() {
        let page = Page::new("location", "page_location");
        assert_eq!(page.create_view(&TitleFactory), "<page_location>");
    }

    #[test]
    fn test_page_id_comparisons() {
        let id = PageId::from("finish");
        assert_eq!(id, "finish");
        assert_eq!(id.to_string(), "finish");
        assert_eq!(PageId::from(String::from("finish")), id);
    }
}
