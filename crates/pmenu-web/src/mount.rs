#![forbid(unsafe_code)]

//! Mounting the widget into an isolated root on the host page.
//!
//! At most one [`MountState`] exists at a time; the host container id in the
//! document doubles as the guard against a second mount.

use std::rc::Rc;

use pmenu_core::{
    ColorMode, DisplayStyle, MenuMode, MenuSize, ResolvedConfig, SidebarLayout,
};

use crate::document::{
    DomError, EventDisposition, EventKind, HostDocument, ListenerId, ListenerTarget,
};
use crate::styles::{BASE_STYLESHEET, widget_style_text};
use crate::widget::{MenuControl, MountedWidget, WidgetMounter, WidgetProps};
use crate::{HOST_CONTAINER_ID, WIDGET_CONTAINER_ID};

/// Everything needed for one mount.
#[derive(Debug, Clone, PartialEq)]
pub struct MountRequest<N> {
    pub attach_target: Option<N>,
    pub mode: MenuMode,
    pub sidebar: SidebarLayout,
    pub display_style: DisplayStyle,
    pub menu_size: MenuSize,
    pub color_mode: ColorMode,
    /// Widget CSS block from the host rules; empty for none.
    pub widget_css: String,
}

impl<N> MountRequest<N> {
    /// Request carrying the resolved presentation, for `mode`.
    #[must_use]
    pub fn from_config(config: &ResolvedConfig, mode: MenuMode, attach_target: Option<N>) -> Self {
        Self {
            attach_target,
            mode,
            sidebar: config.sidebar_layout(),
            display_style: config.display_style,
            menu_size: config.menu_size,
            color_mode: config.color_mode,
            widget_css: config.widget_css.clone(),
        }
    }

    #[must_use]
    pub fn with_sidebar(mut self, sidebar: SidebarLayout) -> Self {
        self.sidebar = sidebar;
        self
    }
}

/// The live mount.
#[derive(Debug)]
pub struct MountState<N> {
    pub host: N,
    pub isolated_root: N,
    pub widget: MountedWidget<N>,
    pub attach_target: Option<N>,
    /// Click pass-through on the attach target.
    pub click_listener: Option<ListenerId>,
    pub mode: MenuMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Mounted,
    /// A host container was already present; nothing changed.
    AlreadyMounted,
}

/// Owner of the single [`MountState`].
#[derive(Debug)]
pub struct MountManager<N> {
    state: Option<MountState<N>>,
}

impl<N> Default for MountManager<N> {
    fn default() -> Self {
        Self { state: None }
    }
}

impl<N: Clone + PartialEq + core::fmt::Debug> MountManager<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> Option<&MountState<N>> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.state.is_some()
    }

    /// Control handle of the mounted widget.
    #[must_use]
    pub fn control(&self) -> Option<Rc<dyn MenuControl>> {
        self.state.as_ref().map(|state| Rc::clone(&state.widget.control))
    }

    /// Mount the widget.
    ///
    /// `attached` without a target degrades to `floating`. On error the
    /// partially built host container is removed again.
    pub fn mount<D, W>(
        &mut self,
        doc: &mut D,
        widget: &W,
        request: MountRequest<N>,
    ) -> Result<MountOutcome, DomError>
    where
        D: HostDocument<Node = N>,
        W: WidgetMounter<D>,
    {
        self.release_stale(doc);
        if doc.element_by_id(HOST_CONTAINER_ID).is_some() {
            tracing::debug!("host container already present, skipping mount");
            return Ok(MountOutcome::AlreadyMounted);
        }

        let mode = if request.mode.needs_attach_target() && request.attach_target.is_none() {
            MenuMode::Floating
        } else {
            request.mode
        };
        let attach_target = request
            .attach_target
            .clone()
            .filter(|_| mode.needs_attach_target());

        let host = doc.create_element("div")?;
        doc.set_attribute(&host, "id", HOST_CONTAINER_ID)?;
        match attach_target.as_ref() {
            Some(target) => {
                for (property, value) in [
                    ("position", "relative"),
                    ("display", "inline-block"),
                    ("width", "0"),
                    ("height", "0"),
                ] {
                    doc.set_style(&host, property, value)?;
                }
                if let Err(err) = doc.insert_before(&host, target) {
                    tracing::debug!(%err, "attach target has no parent, appending to body");
                    doc.append_to_body(&host)?;
                }
            }
            None => doc.append_to_body(&host)?,
        }

        match self.build(doc, widget, &host, &request, mode, attach_target) {
            Ok(state) => {
                tracing::info!(mode = %state.mode, attached = state.attach_target.is_some(), "panda menu mounted");
                self.state = Some(state);
                Ok(MountOutcome::Mounted)
            }
            Err(err) => {
                doc.remove(&host);
                Err(err)
            }
        }
    }

    fn build<D, W>(
        &self,
        doc: &mut D,
        widget: &W,
        host: &N,
        request: &MountRequest<N>,
        mode: MenuMode,
        attach_target: Option<N>,
    ) -> Result<MountState<N>, DomError>
    where
        D: HostDocument<Node = N>,
        W: WidgetMounter<D>,
    {
        let isolated_root = doc.attach_isolated_root(host)?;

        let base = doc.create_element("style")?;
        doc.set_text(&base, BASE_STYLESHEET)?;
        doc.append_child(&isolated_root, &base)?;
        if !request.widget_css.is_empty() {
            let host_specific = doc.create_element("style")?;
            doc.set_text(&host_specific, &widget_style_text(&request.widget_css))?;
            doc.append_child(&isolated_root, &host_specific)?;
        }

        let container = doc.create_element("div")?;
        doc.set_attribute(&container, "id", WIDGET_CONTAINER_ID)?;
        doc.append_child(&isolated_root, &container)?;

        let props = WidgetProps {
            mode,
            attach_target_height: attach_target.as_ref().map(|target| doc.offset_height(target)),
            sidebar: request.sidebar,
            display_style: request.display_style,
            menu_size: request.menu_size,
            color_mode: request.color_mode,
        };
        let mounted = widget.mount(doc, &container, &props)?;

        let click_listener = match attach_target.as_ref() {
            Some(target) => {
                doc.set_style(target, "cursor", "pointer")?;
                let control = Rc::clone(&mounted.control);
                let registered = doc.add_listener(
                    ListenerTarget::Element(target.clone()),
                    EventKind::Click,
                    Rc::new(move |_| {
                        control.toggle();
                        EventDisposition::CONSUME
                    }),
                );
                match registered {
                    Ok(id) => Some(id),
                    Err(err) => {
                        release_listeners(doc, &mounted.listeners);
                        return Err(err);
                    }
                }
            }
            None => None,
        };

        Ok(MountState {
            host: host.clone(),
            isolated_root,
            widget: mounted,
            attach_target,
            click_listener,
            mode,
        })
    }

    /// Tear down a mount whose host container the page has removed.
    ///
    /// Returns whether a stale mount was released.
    pub fn release_stale<D>(&mut self, doc: &mut D) -> bool
    where
        D: HostDocument<Node = N>,
    {
        match &self.state {
            Some(state) if !doc.contains(&state.host) => {
                tracing::debug!(mode = %state.mode, "host container removed by the page");
                self.cleanup(doc)
            }
            _ => false,
        }
    }

    /// Tear the mount down. Returns whether anything was mounted.
    pub fn cleanup<D>(&mut self, doc: &mut D) -> bool
    where
        D: HostDocument<Node = N>,
    {
        let Some(state) = self.state.take() else {
            return false;
        };
        if let Some(id) = state.click_listener {
            doc.remove_listener(id);
        }
        release_listeners(doc, &state.widget.listeners);
        doc.clear_children(&state.isolated_root);
        doc.remove(&state.host);
        tracing::info!(mode = %state.mode, "panda menu unmounted");
        true
    }
}

fn release_listeners<D: HostDocument>(doc: &mut D, listeners: &[ListenerId]) {
    for &id in listeners {
        doc.remove_listener(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, NodeId};
    use crate::widget::MenuWidget;
    use pmenu_core::MenuOverrides;
    use pretty_assertions::assert_eq;

    fn request(mode: MenuMode, target: Option<NodeId>) -> MountRequest<NodeId> {
        let config = ResolvedConfig::for_host("example.com", &MenuOverrides::default());
        MountRequest::from_config(&config, mode, target)
    }

    #[test]
    fn floating_mount_appends_host_to_body() {
        let mut doc = MemoryDocument::new("example.com");
        let mut mounts = MountManager::new();
        let outcome = mounts
            .mount(&mut doc, &MenuWidget, request(MenuMode::Floating, None))
            .unwrap();
        assert_eq!(outcome, MountOutcome::Mounted);

        let host = doc.element_by_id(HOST_CONTAINER_ID).unwrap();
        assert_eq!(doc.parent_element(&host), Some(doc.body()));
        let root = doc.shadow_root(host).unwrap();
        assert!(doc.find_in(root, WIDGET_CONTAINER_ID).is_some());
        // Base stylesheet only: the example.com rules carry no widget CSS.
        assert_eq!(doc.children(root).len(), 2);
        assert_eq!(doc.text(doc.children(root)[0]), BASE_STYLESHEET);
    }

    #[test]
    fn attached_mount_precedes_target_and_passes_clicks_through() {
        let mut doc = MemoryDocument::new("example.com");
        let body = doc.body();
        let nav = doc.element(body, "nav", &[]);
        let logo = doc.element(nav, "div", &[("class", "logo")]);
        doc.set_offset_height(logo, 32.0);

        let mut mounts = MountManager::new();
        mounts
            .mount(&mut doc, &MenuWidget, request(MenuMode::Attached, Some(logo)))
            .unwrap();
        let state = mounts.state().unwrap();
        assert_eq!(doc.children(nav), &[state.host, logo]);
        assert_eq!(doc.style(state.host, "display"), Some("inline-block"));
        assert_eq!(doc.style(logo, "cursor"), Some("pointer"));

        let disposition = doc.click(logo);
        assert_eq!(disposition, EventDisposition::CONSUME);
        assert!(mounts.control().unwrap().is_open());
    }

    #[test]
    fn attached_without_target_degrades_to_floating() {
        let mut doc = MemoryDocument::new("example.com");
        let mut mounts = MountManager::new();
        mounts
            .mount(&mut doc, &MenuWidget, request(MenuMode::Attached, None))
            .unwrap();
        assert_eq!(mounts.state().unwrap().mode, MenuMode::Floating);
    }

    #[test]
    fn second_mount_is_a_noop() {
        let mut doc = MemoryDocument::new("example.com");
        let mut mounts = MountManager::new();
        mounts
            .mount(&mut doc, &MenuWidget, request(MenuMode::Floating, None))
            .unwrap();
        let outcome = mounts
            .mount(&mut doc, &MenuWidget, request(MenuMode::Hidden, None))
            .unwrap();
        assert_eq!(outcome, MountOutcome::AlreadyMounted);
        assert_eq!(doc.count_by_id(HOST_CONTAINER_ID), 1);
    }

    #[test]
    fn remount_after_host_removal_releases_the_old_mount() {
        let mut doc = MemoryDocument::new("example.com");
        let body = doc.body();
        let footer = doc.element(body, "footer", &[]);
        let mut mounts = MountManager::new();
        mounts
            .mount(&mut doc, &MenuWidget, request(MenuMode::Floating, None))
            .unwrap();
        assert!(!mounts.release_stale(&mut doc));

        let stale = mounts.state().unwrap().host;
        doc.remove(&stale);
        let outcome = mounts
            .mount(&mut doc, &MenuWidget, request(MenuMode::Attached, Some(footer)))
            .unwrap();
        assert_eq!(outcome, MountOutcome::Mounted);
        assert_eq!(doc.total_listeners(), 2);
        assert_eq!(doc.count_by_id(HOST_CONTAINER_ID), 1);
        assert_ne!(mounts.state().unwrap().host, stale);
    }

    #[test]
    fn cleanup_removes_everything_and_is_idempotent() {
        let mut doc = MemoryDocument::new("example.com");
        let body = doc.body();
        let logo = doc.element(body, "div", &[]);
        let mut mounts = MountManager::new();
        mounts
            .mount(&mut doc, &MenuWidget, request(MenuMode::Attached, Some(logo)))
            .unwrap();
        assert_eq!(doc.listener_count(&ListenerTarget::Element(logo), EventKind::Click), 1);

        assert!(mounts.cleanup(&mut doc));
        assert!(!mounts.cleanup(&mut doc));
        assert_eq!(doc.count_by_id(HOST_CONTAINER_ID), 0);
        assert_eq!(doc.listener_count(&ListenerTarget::Element(logo), EventKind::Click), 0);
        assert_eq!(doc.total_listeners(), 0);
    }

    #[test]
    fn widget_css_gets_its_own_style_element() {
        let mut doc = MemoryDocument::new("tracoor.x.ethpandaops.io");
        let config =
            ResolvedConfig::for_host("tracoor.x.ethpandaops.io", &MenuOverrides::default());
        let mut mounts = MountManager::new();
        mounts
            .mount(
                &mut doc,
                &MenuWidget,
                MountRequest::from_config(&config, MenuMode::Floating, None),
            )
            .unwrap();
        let root = mounts.state().unwrap().isolated_root;
        let host_specific = doc.children(root)[1];
        assert!(doc.text(host_specific).starts_with("/* Host-specific menu styles */\n"));
    }
}
