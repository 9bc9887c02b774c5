//! Navigation coordinator.
//!
//! [`NavigationCoordinator`] sits between the host and [`SetupFlowState`]. It
//! turns user intents (next / previous / back) and page completions into
//! controller operations, runs the per-page side effects, and performs the
//! one-time completion work when the user leaves the terminal page.
//!
//! # Scheduling
//!
//! Nothing happens inline. Intents are posted to a [`TaskQueue`] and applied
//! by [`process_pending`](NavigationCoordinator::process_pending), which the
//! host calls from its control loop. One pass:
//!
//! 1. applies results handed back by off-thread integrations (mailbox)
//! 2. fires expired timers
//! 3. runs queued navigation requests in order, including ones posted while
//!    the pass is running
//!
//! State notifications are buffered on a channel and handled after each step,
//! so a request issued while a page-list mutation is in flight only runs once
//! that mutation and its notifications have settled.
//!
//! # Lifecycle
//!
//! ```text
//! InProgress --advance on terminal page--> Completing --side effects--> Finished
//! ```
//!
//! `Finished` has no outgoing transitions; requests made after it are
//! rejected.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use setup_flow_core::logging::{span_names, targets};
use setup_flow_core::{Mailbox, TaskId, TaskQueue, TimerId, TimerManager, mailbox};

use crate::config::FlowConfig;
use crate::error::FlowResult;
use crate::page::{PageId, ViewFactory};
use crate::platform::{AccountSetupOptions, AccountSetupOutcome, Platform, PlatformResult};
use crate::prefs::{Preferences, keys};
use crate::snapshot::Snapshot;
use crate::state::{AdvanceOutcome, FlowEvent, FlowListener, ListenerId, SetupFlowState};
use crate::view::FlowView;

// ============================================================================
// Public types
// ============================================================================

/// Lifecycle phase of the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The user is moving through pages.
    InProgress,
    /// Completion side effects are running.
    Completing,
    /// Setup is done. No further navigation is accepted.
    Finished,
}

/// A navigation request from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationIntent {
    /// Advance one page, or finish on the terminal page.
    Next,
    /// Go back one page.
    Previous,
    /// The host's back action. Same as [`Previous`](Self::Previous).
    Back,
}

/// Work queued for the next [`process_pending`](NavigationCoordinator::process_pending).
#[derive(Debug, Clone, PartialEq, Eq)]
enum NavigationRequest {
    Navigate(NavigationIntent),
    Select(usize),
    PageFinished(Option<PageId>),
}

/// Results marshalled back from other threads.
#[derive(Debug)]
enum CoordinatorMessage {
    AccountSetupFinished {
        page: PageId,
        outcome: AccountSetupOutcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    SimAdvisory,
}

/// Forwards state notifications onto a channel drained between tasks.
struct QueuedListener {
    tx: Sender<FlowEvent>,
}

impl QueuedListener {
    fn forward(&self, event: FlowEvent) {
        // The receiver lives as long as the coordinator.
        let _ = self.tx.send(event);
    }
}

impl FlowListener for QueuedListener {
    fn on_page_list_changed(&self, page_count: usize) {
        self.forward(FlowEvent::PageListChanged { page_count });
    }

    fn on_navigability_changed(&self, cut_off_index: usize) {
        self.forward(FlowEvent::NavigabilityChanged { cut_off_index });
    }

    fn on_current_page_changed(&self, index: usize, page: &PageId) {
        self.forward(FlowEvent::CurrentPageChanged {
            index,
            page: page.clone(),
        });
    }
}

// ============================================================================
// NavigationCoordinator
// ============================================================================

/// Drives a setup flow on the host's control thread.
pub struct NavigationCoordinator<F: ViewFactory> {
    state: SetupFlowState,
    view: FlowView<F>,
    config: FlowConfig,
    platform: Platform,
    prefs: Arc<dyn Preferences>,
    phase: Phase,
    tasks: TaskQueue<NavigationRequest>,
    timers: TimerManager<Deferred>,
    advisory_timer: Option<TimerId>,
    events: Receiver<FlowEvent>,
    listener: Option<ListenerId>,
    mailbox: Mailbox<CoordinatorMessage>,
    disposed: bool,
}

impl<F: ViewFactory> NavigationCoordinator<F> {
    /// Create a coordinator over the pages described by `config`.
    pub fn new(
        config: FlowConfig,
        platform: Platform,
        prefs: Arc<dyn Preferences>,
        factory: F,
    ) -> FlowResult<Self> {
        let state = SetupFlowState::new(config.build_pages()?);
        Ok(Self::with_state(state, config, platform, prefs, factory))
    }

    /// Create a coordinator over an existing flow.
    pub fn with_state(
        state: SetupFlowState,
        config: FlowConfig,
        platform: Platform,
        prefs: Arc<dyn Preferences>,
        factory: F,
    ) -> Self {
        let (tx, events) = crossbeam_channel::unbounded();
        let listener = state.register_listener(Arc::new(QueuedListener { tx }));
        let (_, mailbox) = mailbox();
        let mut view = FlowView::new(factory);
        view.invalidate(&state);

        Self {
            state,
            view,
            config,
            platform,
            prefs,
            phase: Phase::InProgress,
            tasks: TaskQueue::new(),
            timers: TimerManager::new(),
            advisory_timer: None,
            events,
            listener: Some(listener),
            mailbox,
            disposed: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Get the flow state.
    pub fn state(&self) -> &SetupFlowState {
        &self.state
    }

    /// Get the presentation adapter.
    pub fn view(&self) -> &FlowView<F> {
        &self.view
    }

    /// Get the configuration.
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Check if [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of queued navigation requests.
    pub fn pending_requests(&self) -> usize {
        self.tasks.pending_count()
    }

    /// Check if the SIM advisory is scheduled.
    pub fn is_advisory_scheduled(&self) -> bool {
        self.advisory_timer
            .is_some_and(|id| self.timers.is_active(id))
    }

    /// Time until the next scheduled timer fires, if any.
    pub fn time_until_next_timer(&mut self, now: Instant) -> Option<Duration> {
        self.timers.time_until_next(now)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start (or restart) the flow.
    ///
    /// Hides system chrome, restores `saved` if given (otherwise resets the
    /// SIM advisory guard for a fresh session), and drops pages the
    /// environment makes unnecessary.
    ///
    /// A corrupt snapshot is returned as an error and leaves the flow as it
    /// was; the caller decides whether to start fresh.
    pub fn on_create(&mut self, saved: Option<&Snapshot>) -> FlowResult<()> {
        tracing::debug!(target: targets::NAVIGATION, restoring = saved.is_some(), "on_create");
        warn_on_error("hide chrome", self.platform.chrome.hide());

        match saved {
            Some(snapshot) => self.state.load(snapshot)?,
            None => {
                if let Err(e) = self.prefs.set_bool(keys::SIM_MISSING_SHOWN, false) {
                    tracing::warn!(
                        target: targets::PREFS,
                        error = %e,
                        "could not reset sim advisory"
                    );
                }
            }
        }
        self.drain_events(Instant::now());
        self.remove_unneeded_pages();
        self.view.invalidate(&self.state);
        Ok(())
    }

    /// Refresh after the host returns to the foreground.
    ///
    /// Tries to bring Wi-Fi up when no network is connected.
    pub fn on_resume(&mut self) {
        self.view.invalidate(&self.state);
        if !self.platform.environment.is_network_connected() {
            tracing::debug!(target: targets::NAVIGATION, "offline on resume, enabling wifi");
            warn_on_error("enable wifi", self.platform.connectivity.try_enable_wifi());
        }
    }

    /// Capture the flow for persistence before teardown.
    pub fn save_instance_state(&self) -> Snapshot {
        self.state.save()
    }

    /// Tear down.
    ///
    /// Unregisters from the flow state, cancels the pending advisory, drops
    /// queued work, and makes late account-setup callbacks no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(id) = self.listener.take() {
            self.state.unregister_listener(id);
        }
        let dropped_messages = self.mailbox.dispose();
        let dropped_timers = self.timers.clear();
        let dropped_tasks = self.tasks.clear();
        self.advisory_timer = None;
        tracing::debug!(
            target: targets::NAVIGATION,
            dropped_messages,
            dropped_timers,
            dropped_tasks,
            "coordinator disposed"
        );
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Queue a navigation intent.
    ///
    /// Returns `None` once the flow has finished or the coordinator was
    /// disposed.
    pub fn request(&mut self, intent: NavigationIntent) -> Option<TaskId> {
        self.post(NavigationRequest::Navigate(intent))
    }

    /// Queue a "next" request.
    pub fn next(&mut self) -> Option<TaskId> {
        self.request(NavigationIntent::Next)
    }

    /// Queue a "previous" request.
    pub fn previous(&mut self) -> Option<TaskId> {
        self.request(NavigationIntent::Previous)
    }

    /// Queue a "back" request.
    pub fn back(&mut self) -> Option<TaskId> {
        self.request(NavigationIntent::Back)
    }

    /// Queue a jump to `index`, e.g. after the user swiped the pager.
    pub fn select_page(&mut self, index: usize) -> Option<TaskId> {
        self.post(NavigationRequest::Select(index))
    }

    /// A page reported that it is done.
    ///
    /// `None` means "the current page wants to move on" and is handled like
    /// [`next`](Self::next).
    pub fn page_finished(&mut self, page: Option<&str>) -> Option<TaskId> {
        self.post(NavigationRequest::PageFinished(page.map(PageId::from)))
    }

    /// Cancel a queued request.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.tasks.cancel(id).is_some()
    }

    fn post(&mut self, request: NavigationRequest) -> Option<TaskId> {
        if self.disposed || self.phase != Phase::InProgress {
            tracing::debug!(
                target: targets::NAVIGATION,
                ?request,
                phase = ?self.phase,
                disposed = self.disposed,
                "request rejected"
            );
            return None;
        }
        Some(self.tasks.post(request))
    }

    // =========================================================================
    // Processing
    // =========================================================================

    /// Run all pending work using the current time.
    pub fn process_pending(&mut self) -> usize {
        self.process_pending_at(Instant::now())
    }

    /// Run all pending work as of `now`.
    ///
    /// Returns the number of messages, timers and requests handled.
    pub fn process_pending_at(&mut self, now: Instant) -> usize {
        if self.disposed {
            return 0;
        }
        let _span = tracing::trace_span!(target: targets::NAVIGATION, span_names::PROCESS_PENDING)
            .entered();
        let mut handled = 0;
        self.drain_events(now);

        for message in self.mailbox.drain() {
            self.handle_message(message);
            self.drain_events(now);
            handled += 1;
        }

        for (id, deferred) in self.timers.process_expired(now) {
            self.handle_timer(id, deferred);
            handled += 1;
        }

        while let Some((id, request)) = self.tasks.pop() {
            if self.phase != Phase::InProgress {
                tracing::debug!(target: targets::NAVIGATION, task = id.as_u64(), "dropping request after finish");
                continue;
            }
            self.handle_request(request);
            self.drain_events(now);
            handled += 1;
        }
        handled
    }

    fn drain_events(&mut self, now: Instant) {
        while let Ok(event) = self.events.try_recv() {
            self.view.invalidate(&self.state);
            if let FlowEvent::CurrentPageChanged { page, .. } = event {
                self.on_page_loaded(&page, now);
            }
        }
    }

    #[tracing::instrument(skip(self), target = "setup_flow::navigation", level = "trace")]
    fn handle_request(&mut self, request: NavigationRequest) {
        match request {
            NavigationRequest::Navigate(NavigationIntent::Next) => match self.state.advance() {
                AdvanceOutcome::ReachedTerminal => self.finish_setup(),
                AdvanceOutcome::Moved { .. } => {}
                outcome => {
                    tracing::debug!(target: targets::NAVIGATION, ?outcome, "next ignored");
                }
            },
            NavigationRequest::Navigate(NavigationIntent::Previous | NavigationIntent::Back) => {
                self.state.retreat();
            }
            NavigationRequest::Select(index) => {
                if !self.state.set_current_index(index) {
                    tracing::debug!(target: targets::NAVIGATION, index, "selection refused");
                }
            }
            NavigationRequest::PageFinished(None) => {
                self.tasks.post(NavigationRequest::Navigate(NavigationIntent::Next));
            }
            NavigationRequest::PageFinished(Some(page)) => {
                self.state.complete_page(page.as_str());
            }
        }
    }

    fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::AccountSetupFinished { page, outcome } => {
                tracing::debug!(target: targets::NAVIGATION, %page, ?outcome, "account setup returned");
                if self.state.page_list().find_by_id(page.as_str()).is_some() {
                    self.post(NavigationRequest::PageFinished(Some(page)));
                }
            }
        }
    }

    fn handle_timer(&mut self, id: TimerId, deferred: Deferred) {
        match deferred {
            Deferred::SimAdvisory => {
                if self.advisory_timer == Some(id) {
                    self.advisory_timer = None;
                }
                self.platform.advisory.show_sim_missing();
            }
        }
    }

    // =========================================================================
    // Page side effects
    // =========================================================================

    fn on_page_loaded(&mut self, page: &PageId, now: Instant) {
        if page.as_str() != self.config.external_account_page {
            return;
        }
        if self.prefs.flag(keys::EXTERNAL_ACCOUNT_SHOWN) {
            return;
        }
        if let Err(e) = self.prefs.set_bool(keys::EXTERNAL_ACCOUNT_SHOWN, true) {
            tracing::warn!(target: targets::PREFS, error = %e, "could not record account launch");
        }
        self.sim_check(now);
        self.launch_account_setup(page.clone());
    }

    /// Schedule the SIM advisory once per session on GSM devices without a
    /// SIM.
    fn sim_check(&mut self, now: Instant) {
        if self.prefs.flag(keys::SIM_MISSING_SHOWN) {
            return;
        }
        let environment = &self.platform.environment;
        if environment.is_gsm_radio() && environment.is_sim_missing() {
            let delay = self.config.advisory_delay();
            self.advisory_timer = Some(self.timers.start_one_shot(now, delay, Deferred::SimAdvisory));
            tracing::debug!(target: targets::NAVIGATION, ?delay, "sim advisory scheduled");
        }
        if let Err(e) = self.prefs.set_bool(keys::SIM_MISSING_SHOWN, true) {
            tracing::warn!(target: targets::PREFS, error = %e, "could not record sim advisory");
        }
    }

    fn launch_account_setup(&mut self, page: PageId) {
        let sender = self.mailbox.sender();
        let options = AccountSetupOptions::first_run(self.config.account_type.as_str());
        tracing::info!(target: targets::NAVIGATION, %page, account_type = %options.account_type, "launching account setup");

        self.platform.account_setup.add_account(
            options,
            Box::new(move |outcome| {
                if sender.is_disposed() {
                    tracing::debug!(target: targets::NAVIGATION, ?outcome, "account setup returned after dispose");
                    return;
                }
                if sender
                    .post(CoordinatorMessage::AccountSetupFinished { page, outcome })
                    .is_err()
                {
                    tracing::debug!(target: targets::NAVIGATION, ?outcome, "account setup result discarded");
                }
            }),
        );
    }

    fn remove_unneeded_pages(&mut self) {
        let id = self.config.external_account_page.clone();
        if self.state.page_list().find_by_id(&id).is_none() {
            return;
        }
        let environment = &self.platform.environment;
        let unneeded = !environment.external_account_service_available()
            || environment.account_exists(&self.config.account_type);
        if unneeded && self.state.remove_page(&id) {
            tracing::debug!(target: targets::NAVIGATION, page = %id, "removed unneeded page");
            self.drain_events(Instant::now());
        }
    }

    // =========================================================================
    // Completion
    // =========================================================================

    fn finish_setup(&mut self) {
        if self.phase != Phase::InProgress {
            return;
        }
        self.phase = Phase::Completing;
        let _span = tracing::info_span!(target: targets::NAVIGATION, span_names::FINISH_SETUP)
            .entered();
        tracing::info!(target: targets::NAVIGATION, "finishing setup");

        warn_on_error("mark provisioned", self.platform.provisioning.mark_provisioned());
        warn_on_error("restore chrome", self.platform.chrome.restore());
        warn_on_error(
            "disable alternate entry points",
            self.platform
                .components
                .disable_alternate_entry_points(&self.config.alternate_setup_package),
        );
        warn_on_error("navigate home", self.platform.home.navigate_home());

        self.phase = Phase::Finished;
        let dropped = self.tasks.clear();
        self.timers.clear();
        self.advisory_timer = None;
        tracing::info!(target: targets::NAVIGATION, dropped, "setup finished");
    }
}

impl<F: ViewFactory> Drop for NavigationCoordinator<F> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<F: ViewFactory> std::fmt::Debug for NavigationCoordinator<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavigationCoordinator")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("pending", &self.tasks.pending_count())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

fn warn_on_error(operation: &str, result: PlatformResult<()>) {
    if let Err(error) = result {
        tracing::warn!(target: targets::NAVIGATION, operation, %error, "platform call failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSpec;
    use crate::platform::{
        AccountSetup, AccountSetupCallback, AdvisoryPresenter, ChromeController,
        ComponentRegistry, Connectivity, Environment, HomeNavigator, PlatformError,
        ProvisioningStore,
    };
    use crate::prefs::MemoryPreferences;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Host {
        calls: Mutex<Vec<String>>,
        pending_account: Mutex<Option<AccountSetupCallback>>,
    }

    impl Host {
        fn record(&self, call: &str) {
            self.calls.lock().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn count(&self, call: &str) -> usize {
            self.calls.lock().iter().filter(|c| *c == call).count()
        }
    }

    impl AccountSetup for Host {
        fn add_account(&self, _options: AccountSetupOptions, callback: AccountSetupCallback) {
            self.record("add_account");
            *self.pending_account.lock() = Some(callback);
        }
    }

    impl Environment for Host {
        fn external_account_service_available(&self) -> bool {
            true
        }
        fn account_exists(&self, _account_type: &str) -> bool {
            false
        }
        fn is_gsm_radio(&self) -> bool {
            true
        }
        fn is_sim_missing(&self) -> bool {
            true
        }
        fn is_network_connected(&self) -> bool {
            true
        }
    }

    impl ProvisioningStore for Host {
        fn mark_provisioned(&self) -> PlatformResult<()> {
            self.record("mark_provisioned");
            Ok(())
        }
    }

    impl ChromeController for Host {
        fn hide(&self) -> PlatformResult<()> {
            self.record("hide_chrome");
            Ok(())
        }
        fn restore(&self) -> PlatformResult<()> {
            self.record("restore_chrome");
            Err(PlatformError::failed("status bar unavailable"))
        }
    }

    impl ComponentRegistry for Host {
        fn disable_alternate_entry_points(&self, _alternate_package: &str) -> PlatformResult<()> {
            self.record("disable_entry_points");
            Ok(())
        }
    }

    impl HomeNavigator for Host {
        fn navigate_home(&self) -> PlatformResult<()> {
            self.record("navigate_home");
            Ok(())
        }
    }

    impl Connectivity for Host {
        fn try_enable_wifi(&self) -> PlatformResult<()> {
            self.record("enable_wifi");
            Ok(())
        }
    }

    impl AdvisoryPresenter for Host {
        fn show_sim_missing(&self) {
            self.record("sim_advisory");
        }
    }

    struct NoViews;

    impl ViewFactory for NoViews {
        type View = ();

        fn create_view(&self, _page: &crate::page::Page) {}
    }

    fn platform(host: &Arc<Host>) -> Platform {
        Platform {
            account_setup: host.clone(),
            environment: host.clone(),
            provisioning: host.clone(),
            chrome: host.clone(),
            components: host.clone(),
            home: host.clone(),
            connectivity: host.clone(),
            advisory: host.clone(),
        }
    }

    fn coordinator(host: &Arc<Host>) -> NavigationCoordinator<NoViews> {
        let config = FlowConfig::default().with_pages([
            PageSpec::new("intro", "page_intro"),
            PageSpec {
                required: true,
                ephemeral: true,
                ..PageSpec::new("external_account", "page_external_account")
            },
            PageSpec {
                terminal: true,
                ..PageSpec::new("finish", "page_finish")
            },
        ]);
        let mut coordinator = NavigationCoordinator::new(
            config,
            platform(host),
            Arc::new(MemoryPreferences::new()),
            NoViews,
        )
        .unwrap();
        coordinator.on_create(None).unwrap();
        coordinator
    }

    #[test]
    fn test_requests_are_deferred() {
        let host = Arc::new(Host::default());
        let mut coordinator = coordinator(&host);

        coordinator.next();
        assert_eq!(coordinator.state().current_index(), 0);
        assert_eq!(coordinator.pending_requests(), 1);

        assert_eq!(coordinator.process_pending(), 1);
        assert_eq!(coordinator.state().current_index(), 1);
    }

    #[test]
    fn test_cancelled_request_never_runs() {
        let host = Arc::new(Host::default());
        let mut coordinator = coordinator(&host);

        let id = coordinator.next().unwrap();
        assert!(coordinator.cancel(id));
        coordinator.process_pending();
        assert_eq!(coordinator.state().current_index(), 0);
    }

    #[test]
    fn test_account_page_launches_once_and_schedules_advisory() {
        let host = Arc::new(Host::default());
        let mut coordinator = coordinator(&host);
        let start = Instant::now();

        coordinator.next();
        coordinator.process_pending_at(start);
        assert_eq!(host.count("add_account"), 1);
        assert!(coordinator.is_advisory_scheduled());

        coordinator.previous();
        coordinator.next();
        coordinator.process_pending_at(start);
        assert_eq!(host.count("add_account"), 1);

        coordinator.process_pending_at(start + Duration::from_millis(500));
        assert_eq!(host.count("sim_advisory"), 1);
        assert!(!coordinator.is_advisory_scheduled());
    }

    #[test]
    fn test_finish_tolerates_failed_side_effect() {
        let host = Arc::new(Host::default());
        let mut coordinator = coordinator(&host);

        coordinator.page_finished(Some("external_account"));
        coordinator.process_pending();
        coordinator.next();
        coordinator.next();
        coordinator.process_pending();

        assert_eq!(coordinator.phase(), Phase::Finished);
        let calls = host.calls();
        let finish: Vec<_> = calls
            .iter()
            .skip_while(|c| *c != "mark_provisioned")
            .map(String::as_str)
            .collect();
        assert_eq!(
            finish,
            vec![
                "mark_provisioned",
                "restore_chrome",
                "disable_entry_points",
                "navigate_home"
            ]
        );
    }

    #[test]
    fn test_dispose_cancels_advisory() {
        let host = Arc::new(Host::default());
        let mut coordinator = coordinator(&host);
        let start = Instant::now();

        coordinator.next();
        coordinator.process_pending_at(start);
        assert!(coordinator.is_advisory_scheduled());

        coordinator.dispose();
        assert_eq!(coordinator.state().listener_count(), 0);
        assert_eq!(coordinator.process_pending_at(start + Duration::from_secs(5)), 0);
        assert_eq!(host.count("sim_advisory"), 0);
        assert!(coordinator.next().is_none());
    }
}
