#![forbid(unsafe_code)]

//! `pmenu-web` drives the panda menu's mount lifecycle on a host page.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment pushes readiness, timer
//!   ticks and mutation deliveries in; nothing here calls into JavaScript.
//! - **Deterministic time**: element discovery polls against a clock the host
//!   sets or advances explicitly.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! The DOM is reached only through [`HostDocument`]. `pmenu-wasm` implements
//! it over `web-sys`; [`memory::MemoryDocument`] implements it in memory so
//! the whole lifecycle (discovery, timeout fallback, self-heal) runs in
//! native tests.

pub mod document;
pub mod keyboard;
pub mod locator;
pub mod memory;
pub mod mount;
pub mod runtime;
pub mod styles;
pub mod watcher;
pub mod widget;

use core::time::Duration;

pub use document::{
    DomError, DomEvent, EventCallback, EventDisposition, EventKind, HostDocument, ListenerId,
    ListenerTarget, ObserverId, ReadyState,
};
pub use locator::{Discovery, LocateStep, LocatorConfig};
pub use mount::{MountManager, MountOutcome, MountRequest, MountState};
pub use runtime::{InitOutcome, LifecyclePhase, LifecycleStats, MenuControls, MenuRuntime};
pub use widget::{MenuControl, MenuWidget, MountedWidget, SharedMenu, WidgetMounter, WidgetProps};

/// Id of the light-DOM element hosting the widget's isolated root.
///
/// Its presence in the document is the single-mount guard.
pub const HOST_CONTAINER_ID: &str = "panda-menu-root";

/// Id of the `<style>` element carrying host page CSS.
pub const HOST_STYLES_ID: &str = "panda-menu-host-styles";

/// Id of the widget container inside the isolated root.
pub const WIDGET_CONTAINER_ID: &str = "panda-menu-container";

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time.
    pub fn set(&mut self, now: Duration) {
        self.now = now;
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }
}
