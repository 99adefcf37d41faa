#![forbid(unsafe_code)]

//! The widget boundary.
//!
//! The lifecycle only needs three things from the menu UI: mount it into a
//! container with [`WidgetProps`], drive it through [`MenuControl`], and
//! remove its listeners on teardown. [`MenuWidget`] is the default
//! document-generic implementation: trigger, panel shell and keyboard
//! shortcuts. The panel's network contents are rendered elsewhere.

use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use pmenu_core::{ColorMode, DisplayStyle, MenuMode, MenuSize, SidebarLayout, SidebarPosition};

use crate::document::{
    DomError, EventDisposition, EventKind, HostDocument, ListenerId, ListenerTarget,
};
use crate::keyboard;

/// Gap between an attach target's bottom edge and the dropdown.
pub const ATTACHED_PANEL_GAP_PX: f64 = 4.0;

/// Distance of the sidebar strip from the ends of its edge when not centered.
const SIDEBAR_EDGE_INSET_PX: u16 = 32;

/// Length of the collapsed sidebar strip along its edge.
const SIDEBAR_STRIP_LENGTH_PX: u16 = 96;

/// Imperative handle to a mounted menu.
pub trait MenuControl {
    fn open(&self);
    fn close(&self);
    fn is_open(&self) -> bool;

    fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }
}

#[derive(Debug, Default)]
struct MenuState {
    open: bool,
    transitions: u32,
}

type ChangeHook = Rc<dyn Fn(bool)>;

/// Open/closed state shared between the widget's listeners and its handle.
#[derive(Clone, Default)]
pub struct SharedMenu {
    state: Rc<RefCell<MenuState>>,
    hooks: Rc<RefCell<Vec<ChangeHook>>>,
}

impl fmt::Debug for SharedMenu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SharedMenu")
            .field("open", &state.open)
            .field("transitions", &state.transitions)
            .field("hooks", &self.hooks.borrow().len())
            .finish()
    }
}

impl SharedMenu {
    /// Run `hook` with the new state after every open/close transition.
    pub fn on_change(&self, hook: impl Fn(bool) + 'static) {
        self.hooks.borrow_mut().push(Rc::new(hook));
    }

    /// Number of open/close transitions so far.
    #[must_use]
    pub fn transitions(&self) -> u32 {
        self.state.borrow().transitions
    }

    fn set_open(&self, open: bool) {
        {
            let mut state = self.state.borrow_mut();
            if state.open == open {
                return;
            }
            state.open = open;
            state.transitions += 1;
        }
        // Hooks may register further hooks.
        let hooks: Vec<ChangeHook> = self.hooks.borrow().clone();
        for hook in hooks {
            hook(open);
        }
    }
}

impl MenuControl for SharedMenu {
    fn open(&self) {
        self.set_open(true);
    }

    fn close(&self) {
        self.set_open(false);
    }

    fn is_open(&self) -> bool {
        self.state.borrow().open
    }
}

/// Presentation inputs for one mount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetProps {
    pub mode: MenuMode,
    /// Height of the attach target, attached mode only.
    pub attach_target_height: Option<f64>,
    pub sidebar: SidebarLayout,
    pub display_style: DisplayStyle,
    pub menu_size: MenuSize,
    pub color_mode: ColorMode,
}

impl WidgetProps {
    #[must_use]
    pub fn new(mode: MenuMode) -> Self {
        Self {
            mode,
            attach_target_height: None,
            sidebar: SidebarLayout::default(),
            display_style: DisplayStyle::default(),
            menu_size: MenuSize::default(),
            color_mode: ColorMode::default(),
        }
    }
}

/// A widget mounted into a container.
pub struct MountedWidget<N> {
    pub root: N,
    pub control: Rc<dyn MenuControl>,
    /// Registrations removed on unmount.
    pub listeners: Vec<ListenerId>,
}

impl<N: fmt::Debug> fmt::Debug for MountedWidget<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountedWidget")
            .field("root", &self.root)
            .field("open", &self.control.is_open())
            .field("listeners", &self.listeners)
            .finish()
    }
}

/// Renders the menu UI into a container element.
pub trait WidgetMounter<D: HostDocument> {
    fn mount(
        &self,
        doc: &mut D,
        container: &D::Node,
        props: &WidgetProps,
    ) -> Result<MountedWidget<D::Node>, DomError>;
}

/// Default widget shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuWidget;

impl MenuWidget {
    /// Mount and also return the [`SharedMenu`] so callers can observe it.
    pub fn mount_shared<D: HostDocument>(
        &self,
        doc: &mut D,
        container: &D::Node,
        props: &WidgetProps,
    ) -> Result<(MountedWidget<D::Node>, SharedMenu), DomError> {
        let menu = SharedMenu::default();
        let control: Rc<dyn MenuControl> = Rc::new(menu.clone());
        let mut listeners = Vec::new();

        let root = doc.create_element("div")?;
        let class = match props.color_mode {
            ColorMode::Light => "panda-menu theme-light",
            ColorMode::Dark | ColorMode::Unset => "panda-menu",
        };
        doc.set_attribute(&root, "class", class)?;
        doc.set_attribute(&root, "data-mode", props.mode.as_str())?;
        doc.set_attribute(&root, "data-display-style", props.display_style.as_str())?;
        doc.set_attribute(&root, "data-size", props.menu_size.as_str())?;
        doc.set_attribute(&root, "data-open", "false")?;
        doc.set_style(
            &root,
            "--panda-menu-width",
            &format!("{}px", props.menu_size.width_px()),
        )?;

        let trigger = match props.mode {
            MenuMode::Sidebar => Some(sidebar_strip(doc, &props.sidebar)?),
            mode if mode.has_own_trigger() => Some(floating_button(doc)?),
            _ => None,
        };
        if let Some(trigger) = trigger {
            doc.append_child(&root, &trigger)?;
            let toggle = Rc::clone(&control);
            listeners.push(doc.add_listener(
                ListenerTarget::Element(trigger),
                EventKind::Click,
                Rc::new(move |_| {
                    toggle.toggle();
                    EventDisposition::PASS
                }),
            )?);
        }

        if props.display_style == DisplayStyle::Modal {
            let overlay = doc.create_element("div")?;
            doc.set_attribute(&overlay, "class", "panda-menu-overlay")?;
            doc.set_attribute(&overlay, "aria-hidden", "true")?;
            doc.append_child(&root, &overlay)?;
            let close = Rc::clone(&control);
            listeners.push(doc.add_listener(
                ListenerTarget::Element(overlay),
                EventKind::Click,
                Rc::new(move |_| {
                    close.close();
                    EventDisposition::PASS
                }),
            )?);
        }

        let panel = doc.create_element("div")?;
        doc.set_attribute(&panel, "class", "panda-menu-panel")?;
        doc.set_attribute(&panel, "role", "menu")?;
        for (property, value) in panel_placement(props) {
            doc.set_style(&panel, property, &value)?;
        }
        doc.append_child(&root, &panel)?;
        doc.append_child(container, &root)?;

        listeners.push(keyboard::install(doc, Rc::clone(&control))?);

        Ok((
            MountedWidget {
                root,
                control,
                listeners,
            },
            menu,
        ))
    }
}

impl<D: HostDocument> WidgetMounter<D> for MenuWidget {
    fn mount(
        &self,
        doc: &mut D,
        container: &D::Node,
        props: &WidgetProps,
    ) -> Result<MountedWidget<D::Node>, DomError> {
        self.mount_shared(doc, container, props)
            .map(|(mounted, _)| mounted)
    }
}

fn floating_button<D: HostDocument>(doc: &mut D) -> Result<D::Node, DomError> {
    let button = doc.create_element("button")?;
    doc.set_attribute(&button, "type", "button")?;
    doc.set_attribute(&button, "class", "panda-menu-button")?;
    doc.set_attribute(&button, "aria-label", "Open ethPandaOps menu")?;
    doc.set_text(&button, "\u{1F43C}")?;
    Ok(button)
}

fn sidebar_strip<D: HostDocument>(
    doc: &mut D,
    layout: &SidebarLayout,
) -> Result<D::Node, DomError> {
    let strip = doc.create_element("div")?;
    doc.set_attribute(&strip, "class", "panda-menu-sidebar")?;
    doc.set_attribute(&strip, "role", "button")?;
    doc.set_attribute(&strip, "aria-label", "Open ethPandaOps menu")?;
    doc.set_attribute(&strip, "data-side", layout.side.as_str())?;
    doc.set_attribute(&strip, "data-position", layout.position.as_str())?;

    let thickness = format!("{}px", layout.collapsed_size);
    let length = format!("{SIDEBAR_STRIP_LENGTH_PX}px");
    let (across, along) = if layout.side.is_horizontal() {
        ("height", "width")
    } else {
        ("width", "height")
    };
    doc.set_style(&strip, layout.side.as_str(), "0")?;
    doc.set_style(&strip, across, &thickness)?;
    doc.set_style(&strip, along, &length)?;
    for (property, value) in along_edge(layout, SIDEBAR_STRIP_LENGTH_PX) {
        doc.set_style(&strip, property, &value)?;
    }
    Ok(strip)
}

/// Offsets placing an element of `length` px along the sidebar's edge.
fn along_edge(layout: &SidebarLayout, length: u16) -> Vec<(&'static str, String)> {
    let inset = format!("{SIDEBAR_EDGE_INSET_PX}px");
    let half = format!("-{}px", length / 2);
    match (layout.side.is_horizontal(), layout.position) {
        (false, SidebarPosition::Top) => vec![("top", inset)],
        (false, SidebarPosition::Bottom) => vec![("bottom", inset)],
        (false, _) => vec![("top", "50%".into()), ("margin-top", half)],
        (true, SidebarPosition::Left) => vec![("left", inset)],
        (true, SidebarPosition::Right) => vec![("right", inset)],
        (true, _) => vec![("left", "50%".into()), ("margin-left", half)],
    }
}

/// Inline placement of the dropdown panel.
#[must_use]
pub fn panel_placement(props: &WidgetProps) -> Vec<(&'static str, String)> {
    if props.display_style == DisplayStyle::Modal {
        return vec![
            ("position", "fixed".into()),
            ("top", "50%".into()),
            ("left", "50%".into()),
            ("transform", "translate(-50%, -50%)".into()),
        ];
    }
    match props.mode {
        MenuMode::Attached => {
            let top = props.attach_target_height.unwrap_or(0.0) + ATTACHED_PANEL_GAP_PX;
            vec![
                ("position", "absolute".into()),
                ("left", "0".into()),
                ("top", format!("{top}px")),
            ]
        }
        MenuMode::Sidebar => {
            let layout = props.sidebar;
            let mut placement = vec![
                ("position", "fixed".into()),
                (layout.side.as_str(), format!("{}px", layout.collapsed_size)),
            ];
            placement.extend(
                along_edge(&layout, 0)
                    .into_iter()
                    .filter(|(property, _)| !property.starts_with("margin")),
            );
            placement
        }
        MenuMode::Floating => vec![
            ("position", "fixed".into()),
            ("left", "16px".into()),
            ("top", "72px".into()),
        ],
        MenuMode::Hidden => vec![
            ("position", "fixed".into()),
            ("left", "16px".into()),
            ("top", "16px".into()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, NodeId};
    use pmenu_core::{SidebarConfig, SidebarSide};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn mount(doc: &mut MemoryDocument, props: &WidgetProps) -> (MountedWidget<NodeId>, SharedMenu) {
        let body = doc.body();
        MenuWidget.mount_shared(doc, &body, props).unwrap()
    }

    #[test]
    fn shared_menu_notifies_only_on_transitions() {
        let menu = SharedMenu::default();
        let seen = Rc::new(Cell::new(0_u32));
        let counter = Rc::clone(&seen);
        menu.on_change(move |_| counter.set(counter.get() + 1));

        menu.open();
        menu.open();
        menu.toggle();
        assert!(!menu.is_open());
        assert_eq!(menu.transitions(), 2);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn floating_widget_has_a_toggling_button() {
        let mut doc = MemoryDocument::new("example.com");
        let (mounted, menu) = mount(&mut doc, &WidgetProps::new(MenuMode::Floating));
        let button = doc.find_by_class(mounted.root, "panda-menu-button").unwrap();
        doc.click(button);
        assert!(menu.is_open());
        assert_eq!(mounted.listeners.len(), 2);
        assert_eq!(doc.style(mounted.root, "--panda-menu-width"), Some("420px"));
    }

    #[test]
    fn attached_and_hidden_modes_render_no_trigger() {
        for mode in [MenuMode::Attached, MenuMode::Hidden] {
            let mut doc = MemoryDocument::new("example.com");
            let (mounted, _) = mount(&mut doc, &WidgetProps::new(mode));
            assert_eq!(doc.find_by_class(mounted.root, "panda-menu-button"), None);
            assert_eq!(doc.find_by_class(mounted.root, "panda-menu-sidebar"), None);
            assert_eq!(mounted.listeners.len(), 1, "{mode}");
        }
    }

    #[test]
    fn attached_panel_sits_below_target() {
        let props = WidgetProps {
            attach_target_height: Some(40.0),
            ..WidgetProps::new(MenuMode::Attached)
        };
        assert_eq!(
            panel_placement(&props),
            vec![
                ("position", "absolute".to_owned()),
                ("left", "0".to_owned()),
                ("top", "44px".to_owned()),
            ]
        );
    }

    #[test]
    fn sidebar_strip_follows_layout() {
        let mut doc = MemoryDocument::new("example.com");
        let props = WidgetProps {
            sidebar: SidebarConfig::on_side(SidebarSide::Right)
                .with_position(SidebarPosition::Bottom)
                .with_collapsed_size(20)
                .layout(),
            ..WidgetProps::new(MenuMode::Sidebar)
        };
        let (mounted, menu) = mount(&mut doc, &props);
        let strip = doc.find_by_class(mounted.root, "panda-menu-sidebar").unwrap();
        assert_eq!(doc.attribute(strip, "data-side"), Some("right"));
        assert_eq!(doc.style(strip, "right"), Some("0"));
        assert_eq!(doc.style(strip, "width"), Some("20px"));
        assert_eq!(doc.style(strip, "bottom"), Some("32px"));
        doc.click(strip);
        assert!(menu.is_open());
    }

    #[test]
    fn modal_overlay_click_closes() {
        let mut doc = MemoryDocument::new("example.com");
        let props = WidgetProps {
            display_style: DisplayStyle::Modal,
            color_mode: ColorMode::Light,
            ..WidgetProps::new(MenuMode::Hidden)
        };
        let (mounted, menu) = mount(&mut doc, &props);
        assert_eq!(
            doc.attribute(mounted.root, "class"),
            Some("panda-menu theme-light")
        );
        menu.open();
        let overlay = doc.find_by_class(mounted.root, "panda-menu-overlay").unwrap();
        doc.click(overlay);
        assert!(!menu.is_open());
    }
}
