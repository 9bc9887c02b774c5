//! The flow controller.
//!
//! [`SetupFlowState`] owns the [`PageList`], tracks where the user is, and
//! derives how far they may go. The cut-off index is the position of the
//! first required page that is not completed (or the page count when there is
//! none); it is rescanned from scratch after every membership or completion
//! change because completions and removals arrive in any order relative to the
//! current position.
//!
//! # Notifications
//!
//! Listeners registered with [`SetupFlowState::register_listener`] are called
//! synchronously on the control thread:
//!
//! - `on_page_list_changed`: a page was added, removed, or the whole list
//!   was replaced by a snapshot
//! - `on_navigability_changed`: the cut-off index changed value
//! - `on_current_page_changed`: a different page now sits at the current
//!   index
//!
//! Listeners must not call back into the state while being notified; the
//! coordinator buffers events and handles them after the mutation returns.
//!
//! # Example
//!
//! ```
//! use setup_flow::{Page, SetupFlowState};
//!
//! let mut state = SetupFlowState::from_pages([
//!     Page::new("welcome", "page_welcome"),
//!     Page::new("wifi", "page_wifi").required(),
//!     Page::new("finish", "page_finish").terminal(),
//! ])?;
//!
//! assert_eq!(state.cut_off_index(), 1);
//! state.advance();
//! assert_eq!(state.current_index(), 1);
//!
//! // Blocked on the incomplete required page.
//! assert!(!state.can_advance());
//! state.complete_page("wifi");
//! assert_eq!(state.cut_off_index(), 2);
//! # Ok::<(), setup_flow::FlowError>(())
//! ```

use std::sync::Arc;

use setup_flow_core::logging::targets;
use setup_flow_core::{ConnectionId, Signal};

use crate::error::FlowResult;
use crate::page::{Page, PageId};
use crate::page_list::PageList;
use crate::snapshot::Snapshot;

/// Identifies a registered listener.
pub type ListenerId = ConnectionId;

// ============================================================================
// Events and listeners
// ============================================================================

/// A change notification emitted by [`SetupFlowState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    /// Page membership or order changed.
    PageListChanged { page_count: usize },
    /// The cut-off index changed value.
    NavigabilityChanged { cut_off_index: usize },
    /// A different page is now at the current index.
    CurrentPageChanged { index: usize, page: PageId },
}

impl FlowEvent {
    /// Route this event to the matching listener callback.
    pub fn dispatch(&self, listener: &dyn FlowListener) {
        match self {
            Self::PageListChanged { page_count } => listener.on_page_list_changed(*page_count),
            Self::NavigabilityChanged { cut_off_index } => {
                listener.on_navigability_changed(*cut_off_index)
            }
            Self::CurrentPageChanged { index, page } => {
                listener.on_current_page_changed(*index, page)
            }
        }
    }
}

/// Receives [`SetupFlowState`] change notifications.
///
/// All callbacks default to no-ops.
pub trait FlowListener: Send + Sync {
    /// Page membership or order changed; re-derive cached counts and positions.
    fn on_page_list_changed(&self, _page_count: usize) {}

    /// The cut-off index changed; re-enable or disable forward navigation.
    fn on_navigability_changed(&self, _cut_off_index: usize) {}

    /// The page at the current index changed.
    fn on_current_page_changed(&self, _index: usize, _page: &PageId) {}
}

/// Result of an [`advance`](SetupFlowState::advance) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Moved one page forward.
    Moved { from: usize, to: usize },
    /// The current page is the first unmet required step.
    Blocked { cut_off_index: usize },
    /// Already on the last page and it is not terminal.
    AtEnd,
    /// The current page is terminal; the flow should finish.
    ReachedTerminal,
    /// There are no pages.
    Empty,
}

// ============================================================================
// SetupFlowState
// ============================================================================

/// Owns the page list and derives navigation boundaries from it.
pub struct SetupFlowState {
    pages: PageList,
    /// Pages removed during this session, oldest first.
    removed: Vec<Page>,
    current_index: usize,
    cut_off_index: usize,
    events: Signal<FlowEvent>,
}

impl SetupFlowState {
    /// Create a flow over an existing page list, positioned on the first page.
    pub fn new(pages: PageList) -> Self {
        let cut_off_index = pages.first_blocking_index();
        Self {
            pages,
            removed: Vec::new(),
            current_index: 0,
            cut_off_index,
            events: Signal::new(),
        }
    }

    /// Create a flow from pages in navigation order.
    pub fn from_pages(pages: impl IntoIterator<Item = Page>) -> FlowResult<Self> {
        Ok(Self::new(PageList::from_pages(pages)?))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the current, authoritative page ordering.
    pub fn page_list(&self) -> &PageList {
        &self.pages
    }

    /// Get the user's current position.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Get the page at the current position.
    pub fn current_page(&self) -> Option<&Page> {
        self.pages.try_get(self.current_index)
    }

    /// Get the index of the first unmet required page, or the page count.
    pub fn cut_off_index(&self) -> usize {
        self.cut_off_index
    }

    /// Get pages removed during this session.
    pub fn removed_pages(&self) -> &[Page] {
        &self.removed
    }

    /// Check if the current page is the terminal page.
    pub fn is_on_terminal(&self) -> bool {
        self.current_page().is_some_and(Page::is_terminal)
    }

    /// Check if [`advance`](Self::advance) would move or finish the flow.
    pub fn can_advance(&self) -> bool {
        if self.is_on_terminal() {
            return true;
        }
        self.current_index < self.cut_off_index && self.current_index + 1 < self.pages.size()
    }

    /// Check if [`retreat`](Self::retreat) would move.
    pub fn can_retreat(&self) -> bool {
        self.current_index > 0
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a listener for change notifications.
    pub fn register_listener(&self, listener: Arc<dyn FlowListener>) -> ListenerId {
        self.events.connect(move |event| event.dispatch(listener.as_ref()))
    }

    /// Unregister a listener. Unknown or already removed ids are ignored.
    pub fn unregister_listener(&self, id: ListenerId) -> bool {
        self.events.disconnect(id)
    }

    /// Get the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.events.connection_count()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Move one page forward.
    ///
    /// Never moves past the cut-off index or the last page. On the terminal
    /// page nothing moves and [`AdvanceOutcome::ReachedTerminal`] tells the
    /// caller to finish the flow.
    pub fn advance(&mut self) -> AdvanceOutcome {
        let Some(page) = self.current_page() else {
            return AdvanceOutcome::Empty;
        };
        if page.is_terminal() {
            return AdvanceOutcome::ReachedTerminal;
        }
        if self.current_index >= self.cut_off_index {
            tracing::debug!(
                target: targets::STATE,
                current = self.current_index,
                cut_off = self.cut_off_index,
                "advance blocked by incomplete required page"
            );
            return AdvanceOutcome::Blocked {
                cut_off_index: self.cut_off_index,
            };
        }
        if self.current_index + 1 >= self.pages.size() {
            return AdvanceOutcome::AtEnd;
        }

        let from = self.current_index;
        self.current_index += 1;
        self.emit_current_page();
        AdvanceOutcome::Moved {
            from,
            to: self.current_index,
        }
    }

    /// Move one page back. No-op on the first page.
    ///
    /// Returns `true` if the position changed.
    pub fn retreat(&mut self) -> bool {
        if self.current_index == 0 {
            return false;
        }
        self.current_index -= 1;
        self.emit_current_page();
        true
    }

    /// Jump to `index`, e.g. when the user swipes the view directly.
    ///
    /// Refuses indices past the cut-off or the end of the list. Returns
    /// `true` if the position changed.
    pub fn set_current_index(&mut self, index: usize) -> bool {
        if index >= self.pages.size() || index > self.cut_off_index || index == self.current_index
        {
            return false;
        }
        self.current_index = index;
        self.emit_current_page();
        true
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append a page at the end of the flow.
    pub fn add_page(&mut self, page: Page) -> FlowResult<()> {
        let (id, key) = (page.id().clone(), page.key().to_string());
        self.pages.append(page)?;
        self.forget_removed(&id, &key);
        self.after_membership_change();
        Ok(())
    }

    /// Insert a page just before the terminal page (or at the end if there
    /// is none).
    ///
    /// Inserting at or before the current position shifts the current index
    /// so the user stays on the same page.
    pub fn insert_page(&mut self, page: Page) -> FlowResult<()> {
        let index = self
            .pages
            .iter()
            .position(Page::is_terminal)
            .unwrap_or(self.pages.size());
        let had_pages = !self.pages.is_empty();
        let (id, key) = (page.id().clone(), page.key().to_string());
        self.pages.insert(index, page)?;
        self.forget_removed(&id, &key);
        if had_pages && index <= self.current_index {
            self.current_index += 1;
        }
        self.after_membership_change();
        Ok(())
    }

    /// Mark a page completed.
    ///
    /// Ephemeral pages leave the flow in the same operation. Completing a
    /// page that is absent or already completed does nothing. Returns `true`
    /// if anything changed.
    pub fn complete_page(&mut self, id: &str) -> bool {
        let Some(page) = self.pages.find_by_id_mut(id) else {
            tracing::debug!(target: targets::STATE, id, "complete_page: page not in flow");
            return false;
        };
        if !page.set_completed(true) {
            return false;
        }
        let ephemeral = page.is_ephemeral();
        tracing::debug!(target: targets::STATE, id, ephemeral, "page completed");

        if !(ephemeral && self.remove_page(id)) {
            self.recalculate_cut_off();
        }
        true
    }

    /// Remove a page from the flow.
    ///
    /// The current index is adjusted so it still points at the page the user
    /// was viewing or, if that page was the one removed, at its successor
    /// (the new last page when it was last). Absent pages and the terminal
    /// page are ignored. Returns `true` if a page was removed.
    pub fn remove_page(&mut self, id: &str) -> bool {
        let viewed = self.current_page().map(|p| p.id().clone());
        let Some((index, page)) = self.pages.remove(id) else {
            tracing::debug!(target: targets::STATE, id, "remove_page: nothing removed");
            return false;
        };

        if index < self.current_index {
            self.current_index -= 1;
        }
        self.current_index = self.current_index.min(self.pages.size().saturating_sub(1));
        tracing::debug!(
            target: targets::STATE,
            id,
            index,
            current = self.current_index,
            "page removed"
        );
        self.removed.push(page);

        self.after_membership_change();
        let now_viewed = self.current_page().map(|p| p.id().clone());
        if now_viewed.is_some() && now_viewed != viewed {
            self.emit_current_page();
        }
        true
    }

    /// A page back in the flow is no longer a removed page.
    fn forget_removed(&mut self, id: &PageId, key: &str) {
        self.removed.retain(|p| p.id() != id && p.key() != key);
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Capture the flow for persistence across teardown.
    pub fn save(&self) -> Snapshot {
        Snapshot::capture(&self.pages, &self.removed, self.current_index)
    }

    /// Replace the entire flow with the contents of `snapshot`.
    ///
    /// On error the current state is left untouched.
    pub fn load(&mut self, snapshot: &Snapshot) -> FlowResult<()> {
        let restored = snapshot.restore().inspect_err(|e| {
            tracing::warn!(target: targets::SNAPSHOT, error = %e, "rejected snapshot");
        })?;
        let viewed = self.current_page().map(|p| p.id().clone());

        self.pages = restored.pages;
        self.removed = restored.removed;
        self.current_index = restored.current_index;
        tracing::debug!(
            target: targets::SNAPSHOT,
            pages = self.pages.size(),
            removed = self.removed.len(),
            current = self.current_index,
            "snapshot loaded"
        );

        self.after_membership_change();
        let now_viewed = self.current_page().map(|p| p.id().clone());
        if now_viewed.is_some() && now_viewed != viewed {
            self.emit_current_page();
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn after_membership_change(&mut self) {
        self.events.emit(FlowEvent::PageListChanged {
            page_count: self.pages.size(),
        });
        self.recalculate_cut_off();
    }

    /// Rescan for the cut-off index, notifying only on change.
    fn recalculate_cut_off(&mut self) -> bool {
        let cut_off_index = self.pages.first_blocking_index();
        if cut_off_index == self.cut_off_index {
            return false;
        }
        tracing::debug!(
            target: targets::STATE,
            from = self.cut_off_index,
            to = cut_off_index,
            "cut-off changed"
        );
        self.cut_off_index = cut_off_index;
        self.events.emit(FlowEvent::NavigabilityChanged { cut_off_index });
        true
    }

    fn emit_current_page(&self) {
        if let Some(page) = self.current_page() {
            self.events.emit(FlowEvent::CurrentPageChanged {
                index: self.current_index,
                page: page.id().clone(),
            });
        }
    }
}

impl std::fmt::Debug for SetupFlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupFlowState")
            .field("pages", &self.pages.ids())
            .field("removed", &self.removed.len())
            .field("current_index", &self.current_index)
            .field("cut_off_index", &self.cut_off_index)
            .field("listeners", &self.events.connection_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(SetupFlowState: Send, Sync);
