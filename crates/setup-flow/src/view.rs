//! Paginated presentation adapter.
//!
//! [`FlowView`] mirrors the parts of [`SetupFlowState`] a pager needs: how
//! many pages may be shown and what the navigation buttons should look like.
//! Its cache only moves when [`invalidate`](FlowView::invalidate) is called,
//! which the host does after every page-list, navigability or current-page
//! notification.
//!
//! The visible window is the enforcement point for required steps: pages past
//! the cut-off are never rendered, so the user cannot swipe beyond the first
//! unmet required page.

use crate::page::{DEFAULT_NEXT_LABEL, ViewFactory};
use crate::state::SetupFlowState;

/// Button state derived from the flow position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationChrome {
    /// Whether the advance action is enabled.
    pub next_enabled: bool,
    /// Whether the back action is shown.
    pub previous_visible: bool,
    /// Caption hint for the advance action.
    pub next_label: String,
}

impl Default for NavigationChrome {
    fn default() -> Self {
        Self {
            next_enabled: false,
            previous_visible: false,
            next_label: DEFAULT_NEXT_LABEL.to_string(),
        }
    }
}

/// Paged view over a flow.
pub struct FlowView<F: ViewFactory> {
    factory: F,
    page_count: usize,
    cut_off_index: usize,
    current_index: usize,
    chrome: NavigationChrome,
    invalidations: u64,
}

impl<F: ViewFactory> FlowView<F> {
    /// Create an empty view. Call [`invalidate`](Self::invalidate) to sync.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            page_count: 0,
            cut_off_index: 0,
            current_index: 0,
            chrome: NavigationChrome::default(),
            invalidations: 0,
        }
    }

    /// Get the view factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Re-read counts, boundaries and the current page from `state`.
    pub fn invalidate(&mut self, state: &SetupFlowState) {
        self.page_count = state.page_list().size();
        self.cut_off_index = state.cut_off_index();
        self.current_index = state.current_index();

        let current = state.current_page();
        let on_terminal = current.is_some_and(|p| p.is_terminal());
        self.chrome = NavigationChrome {
            next_enabled: current.is_some()
                && (on_terminal || self.current_index != self.cut_off_index),
            previous_visible: self.current_index > 0,
            next_label: current
                .map_or(DEFAULT_NEXT_LABEL, |p| p.next_label())
                .to_string(),
        };
        self.invalidations += 1;
    }

    /// Number of pages the pager may show.
    ///
    /// Everything up to and including the first unmet required page. This is
    /// one more than the classic `min(cut_off, size)` pager window on purpose,
    /// so the blocking page and the always-required terminal page stay reachable.
    pub fn visible_count(&self) -> usize {
        (self.cut_off_index + 1).min(self.page_count)
    }

    /// Current position as of the last invalidation.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Render the page at `index`, or `None` if it lies outside the visible
    /// window.
    pub fn render_at(&self, state: &SetupFlowState, index: usize) -> Option<F::View> {
        if index >= self.visible_count() {
            return None;
        }
        state
            .page_list()
            .try_get(index)
            .map(|page| page.create_view(&self.factory))
    }

    /// Navigation button state as of the last invalidation.
    pub fn chrome(&self) -> &NavigationChrome {
        &self.chrome
    }

    /// Number of times the view has been invalidated.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations
    }
}

impl<F: ViewFactory> std::fmt::Debug for FlowView<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowView")
            .field("page_count", &self.page_count)
            .field("cut_off_index", &self.cut_off_index)
            .field("current_index", &self.current_index)
            .field("chrome", &self.chrome)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;

    struct KeyFactory;

    impl ViewFactory for KeyFactory {
        type View = String;

        fn create_view(&self, page: &Page) -> String {
            page.key().to_string()
        }
    }

    fn flow() -> SetupFlowState {
        SetupFlowState::from_pages([
            Page::new("welcome", "page_welcome").with_next_label("start"),
            Page::new("wifi", "page_wifi").required(),
            Page::new("location", "page_location"),
            Page::new("finish", "page_finish").terminal().with_next_label("done"),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_until_invalidated() {
        let view = FlowView::new(KeyFactory);
        assert_eq!(view.visible_count(), 0);
        assert_eq!(view.chrome(), &NavigationChrome::default());
    }

    #[test]
    fn test_window_stops_at_first_unmet_required_page() {
        let state = flow();
        let mut view = FlowView::new(KeyFactory);
        view.invalidate(&state);

        assert_eq!(view.visible_count(), 2);
        assert_eq!(view.render_at(&state, 1).as_deref(), Some("page_wifi"));
        assert_eq!(view.render_at(&state, 2), None);
    }

    #[test]
    fn test_window_grows_after_completion() {
        let mut state = flow();
        let mut view = FlowView::new(KeyFactory);
        state.complete_page("wifi");
        view.invalidate(&state);

        // The terminal page is required, so it bounds the window.
        assert_eq!(state.cut_off_index(), 3);
        assert_eq!(view.visible_count(), 4);
        assert_eq!(view.render_at(&state, 3).as_deref(), Some("page_finish"));
        assert_eq!(view.render_at(&state, 4), None);
    }

    #[test]
    fn test_chrome_follows_position() {
        let mut state = flow();
        let mut view = FlowView::new(KeyFactory);
        view.invalidate(&state);

        assert_eq!(
            view.chrome(),
            &NavigationChrome {
                next_enabled: true,
                previous_visible: false,
                next_label: "start".to_string(),
            }
        );

        state.advance();
        view.invalidate(&state);
        assert!(!view.chrome().next_enabled);
        assert!(view.chrome().previous_visible);
        assert_eq!(view.chrome().next_label, DEFAULT_NEXT_LABEL);
    }

    #[test]
    fn test_next_enabled_on_terminal_page() {
        let mut state = flow();
        let mut view = FlowView::new(KeyFactory);
        state.complete_page("wifi");
        while state.advance() != crate::state::AdvanceOutcome::ReachedTerminal {}
        view.invalidate(&state);

        assert_eq!(view.current_index(), state.cut_off_index());
        assert!(view.chrome().next_enabled);
        assert_eq!(view.chrome().next_label, "done");
    }

    #[test]
    fn test_cache_is_stale_until_invalidated() {
        let mut state = flow();
        let mut view = FlowView::new(KeyFactory);
        view.invalidate(&state);
        state.complete_page("wifi");

        assert_eq!(view.visible_count(), 2);
        view.invalidate(&state);
        assert_eq!(view.visible_count(), 4);
        assert_eq!(view.invalidation_count(), 2);
    }
}
