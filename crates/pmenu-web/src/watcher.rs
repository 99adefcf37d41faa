#![forbid(unsafe_code)]

//! Self-healing: detect when the host page drops the mount.

use crate::document::{DomError, HostDocument, ObserverId};
use crate::mount::MountState;

/// Whether the mount is still wired into the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountHealth {
    Healthy,
    /// The host container left the document.
    HostDetached,
    /// The attach target left the document.
    TargetDetached,
}

impl MountHealth {
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::HostDetached => "host_detached",
            Self::TargetDetached => "target_detached",
        }
    }
}

#[must_use]
pub fn check_mount<D: HostDocument>(doc: &D, state: &MountState<D::Node>) -> MountHealth {
    if !doc.contains(&state.host) {
        return MountHealth::HostDetached;
    }
    match &state.attach_target {
        Some(target) if !doc.contains(target) => MountHealth::TargetDetached,
        _ => MountHealth::Healthy,
    }
}

/// The armed observer and the selector to rediscover with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Armed {
    selector: String,
    observer: ObserverId,
}

/// At most one armed body observer.
#[derive(Debug, Default)]
pub struct Watcher {
    armed: Option<Armed>,
}

impl Watcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the body for `selector`'s mount, replacing any previous
    /// observer.
    pub fn arm<D: HostDocument>(
        &mut self,
        doc: &mut D,
        selector: &str,
    ) -> Result<ObserverId, DomError> {
        self.disarm(doc);
        let observer = doc.observe_mutations()?;
        tracing::debug!(selector, %observer, "mount watcher armed");
        self.armed = Some(Armed {
            selector: selector.to_owned(),
            observer,
        });
        Ok(observer)
    }

    /// Disconnect the observer, returning the selector it watched for.
    pub fn disarm<D: HostDocument>(&mut self, doc: &mut D) -> Option<String> {
        let armed = self.armed.take()?;
        doc.disconnect_observer(armed.observer);
        Some(armed.selector)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Whether `observer` is the currently armed one.
    #[must_use]
    pub fn owns(&self, observer: ObserverId) -> bool {
        self.armed.as_ref().is_some_and(|armed| armed.observer == observer)
    }

    #[must_use]
    pub fn selector(&self) -> Option<&str> {
        self.armed.as_ref().map(|armed| armed.selector.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use crate::mount::{MountManager, MountRequest};
    use crate::widget::MenuWidget;
    use pmenu_core::{MenuMode, MenuOverrides, ResolvedConfig};

    #[test]
    fn rearming_replaces_the_observer() {
        let mut doc = MemoryDocument::new("example.com");
        let mut watcher = Watcher::new();
        let first = watcher.arm(&mut doc, "#logo").unwrap();
        let second = watcher.arm(&mut doc, "#logo").unwrap();
        assert_ne!(first, second);
        assert!(!watcher.owns(first));
        assert!(watcher.owns(second));
        assert_eq!(doc.active_observers(), 1);

        assert_eq!(watcher.disarm(&mut doc).as_deref(), Some("#logo"));
        assert_eq!(doc.active_observers(), 0);
        assert!(!watcher.is_armed());
    }

    #[test]
    fn health_tracks_host_and_target() {
        let mut doc = MemoryDocument::new("example.com");
        let body = doc.body();
        let nav = doc.element(body, "nav", &[]);
        let logo = doc.element(nav, "div", &[]);
        let config = ResolvedConfig::for_host("example.com", &MenuOverrides::default());
        let mut mounts = MountManager::new();
        mounts
            .mount(
                &mut doc,
                &MenuWidget,
                MountRequest::from_config(&config, MenuMode::Attached, Some(logo)),
            )
            .unwrap();
        let state = mounts.state().unwrap();
        assert_eq!(check_mount(&doc, state), MountHealth::Healthy);

        doc.remove(&logo);
        assert_eq!(check_mount(&doc, state), MountHealth::TargetDetached);

        doc.remove(&nav);
        assert_eq!(check_mount(&doc, state), MountHealth::HostDetached);
    }
}
