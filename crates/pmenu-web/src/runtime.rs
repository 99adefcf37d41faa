#![forbid(unsafe_code)]

//! The menu runtime: initialization, mode dispatch, discovery ticks,
//! self-heal and the public control surface.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized -> AwaitingDocument -> Resolving -> Discovering -> Mounted
//!                                                \-> Mounted | Idle
//! Mounted -(host or target removed)-> Unmounted -> Discovering -> Mounted
//! any -(cleanup)-> Unmounted
//! ```
//!
//! The runtime never blocks. The host calls [`MenuRuntime::document_ready`]
//! once the page has parsed, [`MenuRuntime::advance_time`] or
//! [`MenuRuntime::set_time`] when a wakeup from
//! [`MenuRuntime::next_wakeup`] is due, and
//! [`MenuRuntime::handle_mutations`] for each observer delivery.

use core::fmt;
use core::time::Duration;
use std::cell::RefCell;
use std::rc::Rc;

use pmenu_core::{HostRuleSet, MenuMode, MenuOverrides, ResolvedConfig, SidebarConfig};

use crate::document::{HostDocument, ObserverId, ReadyState};
use crate::locator::{Discovery, LocateStep, LocatorConfig};
use crate::mount::{MountManager, MountOutcome, MountRequest, MountState};
use crate::styles;
use crate::watcher::{Watcher, check_mount};
use crate::widget::{MenuControl, WidgetMounter};
use crate::{DeterministicClock, HOST_CONTAINER_ID};

/// Where the runtime is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Uninitialized,
    /// Waiting for the document to finish parsing.
    AwaitingDocument,
    Resolving,
    /// Polling for the attach target.
    Discovering,
    Mounted,
    /// Initialized with nothing mounted (skip-render, or another mount owns
    /// the page).
    Idle,
    Unmounted,
}

impl LifecyclePhase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::AwaitingDocument => "awaiting_document",
            Self::Resolving => "resolving",
            Self::Discovering => "discovering",
            Self::Mounted => "mounted",
            Self::Idle => "idle",
            Self::Unmounted => "unmounted",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Started,
    /// Start deferred until [`MenuRuntime::document_ready`].
    AwaitingDocument,
    AlreadyInitialized,
}

/// Counters over the runtime's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub mounts: u32,
    pub cleanups: u32,
    pub heals: u32,
    pub discovery_timeouts: u32,
    /// Discovery ticks, including the final timed-out tick.
    pub polls: u32,
}

/// Control handle that follows whatever widget is currently mounted.
///
/// Stays valid across cleanup and self-heal; calls are no-ops while
/// nothing is mounted.
#[derive(Clone, Default)]
pub struct MenuControls {
    current: Rc<RefCell<Option<Rc<dyn MenuControl>>>>,
}

impl fmt::Debug for MenuControls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuControls")
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl MenuControls {
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.current.borrow().is_some()
    }

    fn bind(&self, control: Option<Rc<dyn MenuControl>>) {
        *self.current.borrow_mut() = control;
    }

    fn current(&self) -> Option<Rc<dyn MenuControl>> {
        self.current.borrow().clone()
    }
}

impl MenuControl for MenuControls {
    fn open(&self) {
        if let Some(control) = self.current() {
            control.open();
        }
    }

    fn close(&self) {
        if let Some(control) = self.current() {
            control.close();
        }
    }

    fn toggle(&self) {
        if let Some(control) = self.current() {
            control.toggle();
        }
    }

    fn is_open(&self) -> bool {
        self.current().is_some_and(|control| control.is_open())
    }
}

/// Process-wide menu state over a host document.
pub struct MenuRuntime<D: HostDocument, W> {
    doc: D,
    widget: W,
    rules: HostRuleSet,
    overrides: MenuOverrides,
    locator: LocatorConfig,
    config: Option<ResolvedConfig>,
    phase: LifecyclePhase,
    initialized: bool,
    clock: DeterministicClock,
    discovery: Option<Discovery>,
    mounts: MountManager<D::Node>,
    watcher: Watcher,
    controls: MenuControls,
    stats: LifecycleStats,
}

impl<D: HostDocument, W> fmt::Debug for MenuRuntime<D, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuRuntime")
            .field("phase", &self.phase)
            .field("initialized", &self.initialized)
            .field("now", &self.clock.now())
            .field("discovery", &self.discovery)
            .field("mounted", &self.mounts.is_mounted())
            .field("watching", &self.watcher.selector())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<D: HostDocument, W: WidgetMounter<D>> MenuRuntime<D, W> {
    /// Runtime over `doc` using the builtin host rules and no overrides.
    #[must_use]
    pub fn new(doc: D, widget: W) -> Self {
        Self {
            doc,
            widget,
            rules: HostRuleSet::builtin().clone(),
            overrides: MenuOverrides::default(),
            locator: LocatorConfig::default(),
            config: None,
            phase: LifecyclePhase::Uninitialized,
            initialized: false,
            clock: DeterministicClock::new(),
            discovery: None,
            mounts: MountManager::new(),
            watcher: Watcher::new(),
            controls: MenuControls::default(),
            stats: LifecycleStats::default(),
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: HostRuleSet) -> Self {
        self.rules = rules;
        self.config = None;
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: MenuOverrides) -> Self {
        self.set_overrides(overrides);
        self
    }

    #[must_use]
    pub fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator.validated();
        self
    }

    /// Replace the pre-init overrides; applies from the next resolution.
    pub fn set_overrides(&mut self, overrides: MenuOverrides) {
        self.overrides = overrides;
        self.config = None;
    }

    /// Start the menu once. Later calls are no-ops.
    pub fn initialize(&mut self) -> InitOutcome {
        if self.initialized {
            tracing::debug!("already initialized");
            return InitOutcome::AlreadyInitialized;
        }
        self.initialized = true;
        if self.doc.ready_state() == ReadyState::Loading {
            self.phase = LifecyclePhase::AwaitingDocument;
            tracing::debug!("document still loading, deferring start");
            return InitOutcome::AwaitingDocument;
        }
        self.start();
        InitOutcome::Started
    }

    /// The document finished parsing. Returns whether a deferred start ran.
    pub fn document_ready(&mut self) -> bool {
        if self.phase != LifecyclePhase::AwaitingDocument {
            return false;
        }
        self.start();
        true
    }

    fn start(&mut self) {
        self.phase = LifecyclePhase::Resolving;
        let config = self.resolve_config();

        if self.doc.element_by_id(HOST_CONTAINER_ID).is_some() {
            tracing::debug!("host container already on the page, not starting");
            self.phase = LifecyclePhase::Idle;
            return;
        }

        if let Err(err) =
            styles::inject_host_styles(&mut self.doc, &config.hostname, &config.host_page_css)
        {
            tracing::warn!(%err, "failed to inject host page styles");
        }

        match config.menu_mode {
            MenuMode::Attached => match config.attach_selector.clone() {
                Some(selector) => self.begin_discovery(selector, config.attach_ancestor_steps),
                None => {
                    tracing::warn!("attached mode without an attach selector, using floating button");
                    self.mount(MountRequest::from_config(&config, MenuMode::Floating, None));
                }
            },
            MenuMode::Floating if config.skip_render => {
                tracing::info!("skip render requested, waiting for an explicit render");
                self.phase = LifecyclePhase::Idle;
            }
            mode => {
                self.mount(MountRequest::from_config(&config, mode, None));
            }
        }
    }

    fn resolve_config(&mut self) -> ResolvedConfig {
        let hostname = self.doc.hostname();
        let config = ResolvedConfig::resolve(&self.rules, &hostname, &self.overrides);
        tracing::debug!(
            hostname = %config.hostname,
            mode = %config.menu_mode,
            display = %config.display_style,
            size = %config.menu_size,
            selector = config.attach_selector.as_deref().unwrap_or(""),
            "configuration resolved"
        );
        self.config = Some(config.clone());
        config
    }

    fn resolved(&mut self) -> ResolvedConfig {
        match &self.config {
            Some(config) => config.clone(),
            None => self.resolve_config(),
        }
    }

    /// Mount directly. No-op while a mount exists.
    ///
    /// `mode` defaults to `attached` when a target is given and `floating`
    /// otherwise; `sidebar` replaces the resolved sidebar layout.
    pub fn render(
        &mut self,
        target: Option<D::Node>,
        mode: Option<MenuMode>,
        sidebar: Option<SidebarConfig>,
    ) -> bool {
        self.release_stale_mount();
        if self.mounts.is_mounted() {
            tracing::debug!("render ignored, already mounted");
            return false;
        }
        let mode = mode.unwrap_or(if target.is_some() {
            MenuMode::Attached
        } else {
            MenuMode::Floating
        });
        let config = self.resolved();
        let mut request = MountRequest::from_config(&config, mode, target);
        if let Some(sidebar) = sidebar {
            request = request.with_sidebar(sidebar.layout());
        }
        self.mount(request)
    }

    /// Discover `selector`, mount on it and watch it.
    pub fn attach(&mut self, selector: &str) {
        let steps = self.resolved().attach_ancestor_steps;
        self.begin_discovery(selector.to_owned(), steps);
    }

    /// Unmount, stop watching and cancel any in-flight discovery.
    pub fn cleanup(&mut self) -> bool {
        if let Some(discovery) = self.discovery.take() {
            tracing::debug!(selector = discovery.selector(), "discovery cancelled");
        }
        self.watcher.disarm(&mut self.doc);
        let removed = self.teardown();
        self.phase = LifecyclePhase::Unmounted;
        removed
    }

    pub fn open(&self) {
        self.controls.open();
    }

    pub fn close(&self) {
        self.controls.close();
    }

    pub fn toggle(&self) {
        self.controls.toggle();
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.controls.is_open()
    }

    /// A control handle that survives remounts.
    #[must_use]
    pub fn controls(&self) -> MenuControls {
        self.controls.clone()
    }

    /// Deliver one mutation-observer callback.
    ///
    /// If the mount lost its host container or attach target, tear it down
    /// and rediscover the watched selector, first poll immediately.
    pub fn handle_mutations(&mut self, observer: ObserverId) {
        if !self.watcher.owns(observer) {
            tracing::debug!(%observer, "ignoring delivery for a stale observer");
            return;
        }
        let Some(state) = self.mounts.state() else {
            return;
        };
        let health = check_mount(&self.doc, state);
        if health.is_healthy() {
            return;
        }
        let Some(selector) = self.watcher.disarm(&mut self.doc) else {
            return;
        };
        tracing::info!(health = health.as_str(), selector = %selector, "mount lost, re-attaching");
        self.teardown();
        self.phase = LifecyclePhase::Unmounted;
        self.stats.heals += 1;
        let steps = self.resolved().attach_ancestor_steps;
        self.begin_discovery(selector, steps);
    }

    /// When the runtime next needs [`Self::set_time`] or
    /// [`Self::advance_time`].
    #[must_use]
    pub fn next_wakeup(&self) -> Option<Duration> {
        self.discovery.as_ref().map(Discovery::next_poll_at)
    }

    /// Jump the clock to `now` and run whatever is due.
    pub fn set_time(&mut self, now: Duration) {
        self.clock.set(now);
        self.run_due();
    }

    /// Advance the clock by `dt`, running every wakeup on the way at its
    /// own deadline.
    pub fn advance_time(&mut self, dt: Duration) {
        let target = self.clock.now().saturating_add(dt);
        while let Some(at) = self.next_wakeup().filter(|&at| at <= target) {
            self.clock.set(at.max(self.clock.now()));
            self.run_due();
        }
        self.clock.set(target);
    }

    /// Run every discovery tick due at the current time.
    pub fn run_due(&mut self) {
        let now = self.clock.now();
        while self.discovery.as_ref().is_some_and(|d| d.is_due(now)) {
            self.poll_discovery(now);
        }
    }

    fn begin_discovery(&mut self, selector: String, ancestor_steps: u32) {
        tracing::debug!(selector = %selector, ancestor_steps, "discovering attach target");
        self.discovery = Some(Discovery::new(
            selector,
            ancestor_steps,
            self.locator,
            self.clock.now(),
        ));
        self.phase = LifecyclePhase::Discovering;
        self.run_due();
    }

    fn poll_discovery(&mut self, now: Duration) {
        let Some(discovery) = self.discovery.as_mut() else {
            return;
        };
        self.stats.polls += 1;
        match discovery.poll(&self.doc, now) {
            LocateStep::Pending { .. } => {}
            LocateStep::Found(target) => {
                let selector = discovery.selector().to_owned();
                self.discovery = None;
                let config = self.resolved();
                let request = MountRequest::from_config(&config, MenuMode::Attached, Some(target));
                if self.mount(request) {
                    self.arm_watcher(&selector);
                }
            }
            LocateStep::TimedOut { attempts } => {
                let selector = discovery.selector().to_owned();
                self.discovery = None;
                self.stats.discovery_timeouts += 1;
                tracing::warn!(
                    selector = %selector,
                    attempts,
                    "Could not find element \"{selector}\" after {}ms, using floating button",
                    self.locator.timeout.as_millis()
                );
                let config = self.resolved();
                self.mount(MountRequest::from_config(&config, MenuMode::Floating, None));
            }
            LocateStep::AlreadyMounted => {
                self.discovery = None;
                tracing::debug!("already mounted, discovery dropped");
                self.phase = if self.mounts.is_mounted() {
                    LifecyclePhase::Mounted
                } else {
                    LifecyclePhase::Idle
                };
            }
        }
    }

    fn mount(&mut self, request: MountRequest<D::Node>) -> bool {
        self.release_stale_mount();
        match self.mounts.mount(&mut self.doc, &self.widget, request) {
            Ok(MountOutcome::Mounted) => {
                self.controls.bind(self.mounts.control());
                self.stats.mounts += 1;
                self.phase = LifecyclePhase::Mounted;
                true
            }
            Ok(MountOutcome::AlreadyMounted) => false,
            Err(err) => {
                tracing::error!(%err, "failed to mount panda menu");
                if !self.mounts.is_mounted() {
                    self.phase = LifecyclePhase::Idle;
                }
                false
            }
        }
    }

    fn arm_watcher(&mut self, selector: &str) {
        if let Err(err) = self.watcher.arm(&mut self.doc, selector) {
            tracing::warn!(%err, selector, "failed to watch mount, self-heal disabled");
        }
    }

    /// Drop a mount whose host the page removed while nothing watched it.
    fn release_stale_mount(&mut self) {
        if self.mounts.release_stale(&mut self.doc) {
            self.stats.cleanups += 1;
            self.controls.bind(None);
        }
    }

    fn teardown(&mut self) -> bool {
        let removed = self.mounts.cleanup(&mut self.doc);
        if removed {
            self.stats.cleanups += 1;
        }
        self.controls.bind(None);
        removed
    }

    #[must_use]
    pub fn document(&self) -> &D {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.doc
    }

    #[must_use]
    pub const fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The last resolved configuration.
    #[must_use]
    pub fn config(&self) -> Option<&ResolvedConfig> {
        self.config.as_ref()
    }

    #[must_use]
    pub const fn stats(&self) -> LifecycleStats {
        self.stats
    }

    #[must_use]
    pub fn mount_state(&self) -> Option<&MountState<D::Node>> {
        self.mounts.state()
    }

    #[must_use]
    pub fn discovery(&self) -> Option<&Discovery> {
        self.discovery.as_ref()
    }

    /// Selector the self-heal watcher is armed for.
    #[must_use]
    pub fn watched_selector(&self) -> Option<&str> {
        self.watcher.selector()
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use crate::widget::MenuWidget;

    #[test]
    fn controls_are_inert_until_mounted() {
        let runtime = MenuRuntime::new(MemoryDocument::new("example.com"), MenuWidget);
        let controls = runtime.controls();
        controls.toggle();
        assert!(!controls.is_open());
        assert!(!controls.is_bound());
    }

    #[test]
    fn loading_document_defers_start() {
        let doc = MemoryDocument::new("example.com").with_ready_state(ReadyState::Loading);
        let mut runtime = MenuRuntime::new(doc, MenuWidget);
        assert_eq!(runtime.initialize(), InitOutcome::AwaitingDocument);
        assert_eq!(runtime.phase(), LifecyclePhase::AwaitingDocument);
        assert!(runtime.mount_state().is_none());

        runtime.document_mut().set_ready_state(ReadyState::Interactive);
        assert!(runtime.document_ready());
        assert!(!runtime.document_ready());
        assert_eq!(runtime.phase(), LifecyclePhase::Mounted);
    }

    #[test]
    fn skip_render_leaves_floating_page_idle() {
        let overrides = MenuOverrides::default().with_skip_render(true);
        let mut runtime = MenuRuntime::new(MemoryDocument::new("example.com"), MenuWidget)
            .with_overrides(overrides);
        runtime.initialize();
        assert_eq!(runtime.phase(), LifecyclePhase::Idle);
        assert!(runtime.render(None, None, None));
        assert_eq!(runtime.mount_state().map(|s| s.mode), Some(MenuMode::Floating));
    }

    #[test]
    fn phase_names_are_snake_case() {
        assert_eq!(LifecyclePhase::AwaitingDocument.to_string(), "awaiting_document");
    }
}
