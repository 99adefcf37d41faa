#![forbid(unsafe_code)]

//! Presentation enums shared by host rules, overrides, and the widget.
//!
//! Every enum has a canonical lowercase wire name (the same strings host
//! pages pass through `window.PandaMenuConfig` or `PandaMenu.render`).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

macro_rules! wire_names {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Canonical wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(ConfigError::UnknownValue {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Color scheme a host forces on the widget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// No preference; theme detection decides.
    #[default]
    #[serde(rename = "")]
    Unset,
    Light,
    Dark,
}

wire_names!(ColorMode, "color mode", {
    Unset => "",
    Light => "light",
    Dark => "dark",
});

/// How the menu trigger is presented on the host page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuMode {
    /// Fixed button in the top-left corner.
    #[default]
    Floating,
    /// Collapsible strip along one edge of the viewport.
    Sidebar,
    /// No trigger of its own; an existing host element toggles the menu.
    Attached,
    /// No visible trigger; keyboard shortcut and programmatic control only.
    Hidden,
}

wire_names!(MenuMode, "menu mode", {
    Floating => "floating",
    Sidebar => "sidebar",
    Attached => "attached",
    Hidden => "hidden",
});

impl MenuMode {
    /// Whether this mode anchors to a pre-existing host element.
    #[must_use]
    pub const fn needs_attach_target(self) -> bool {
        matches!(self, Self::Attached)
    }

    /// Whether the widget renders its own clickable trigger.
    #[must_use]
    pub const fn has_own_trigger(self) -> bool {
        matches!(self, Self::Floating | Self::Sidebar)
    }
}

/// Where the opened menu panel appears relative to its trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStyle {
    /// Next to the trigger.
    #[default]
    Adjacent,
    /// Centered over a dimming overlay.
    Modal,
}

wire_names!(DisplayStyle, "display style", {
    Adjacent => "adjacent",
    Modal => "modal",
});

/// Menu panel size preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuSize {
    Compact,
    #[default]
    Normal,
    Large,
    #[serde(rename = "xlarge")]
    XLarge,
}

wire_names!(MenuSize, "menu size", {
    Compact => "compact",
    Normal => "normal",
    Large => "large",
    XLarge => "xlarge",
});

impl MenuSize {
    /// Panel width in CSS pixels.
    #[must_use]
    pub const fn width_px(self) -> u16 {
        match self {
            Self::Compact => 356,
            Self::Normal => 420,
            Self::Large => 484,
            Self::XLarge => 548,
        }
    }
}

/// Viewport edge a sidebar is docked to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarSide {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

wire_names!(SidebarSide, "sidebar side", {
    Left => "left",
    Right => "right",
    Top => "top",
    Bottom => "bottom",
});

impl SidebarSide {
    /// Top and bottom sidebars run horizontally.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Top | Self::Bottom)
    }
}

/// Position of the sidebar strip along its edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarPosition {
    Top,
    #[default]
    Center,
    Bottom,
    Left,
    Right,
}

wire_names!(SidebarPosition, "sidebar position", {
    Top => "top",
    Center => "center",
    Bottom => "bottom",
    Left => "left",
    Right => "right",
});

/// Partial sidebar configuration as written in host rules and overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<SidebarPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<SidebarSide>,
    /// Thickness of the collapsed strip in CSS pixels.
    #[serde(default, alias = "collapsedWidth", skip_serializing_if = "Option::is_none")]
    pub collapsed_size: Option<u16>,
}

impl SidebarConfig {
    /// Config with only the side set.
    #[must_use]
    pub const fn on_side(side: SidebarSide) -> Self {
        Self {
            position: None,
            side: Some(side),
            collapsed_size: None,
        }
    }

    /// Set the position along the edge.
    #[must_use]
    pub const fn with_position(mut self, position: SidebarPosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the collapsed strip thickness.
    #[must_use]
    pub const fn with_collapsed_size(mut self, px: u16) -> Self {
        self.collapsed_size = Some(px);
        self
    }

    /// True when no field is set (the `{}` default).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position.is_none() && self.side.is_none() && self.collapsed_size.is_none()
    }

    /// Fill in defaults and normalize the position for the chosen side.
    #[must_use]
    pub fn layout(&self) -> SidebarLayout {
        let side = self.side.unwrap_or_default();
        let requested = self.position.unwrap_or_default();
        let position = match (side.is_horizontal(), requested) {
            (true, SidebarPosition::Left | SidebarPosition::Right) => requested,
            (false, SidebarPosition::Top | SidebarPosition::Bottom) => requested,
            _ => SidebarPosition::Center,
        };
        SidebarLayout {
            side,
            position,
            collapsed_size: self
                .collapsed_size
                .unwrap_or(SidebarLayout::DEFAULT_COLLAPSED_SIZE),
        }
    }
}

/// Fully defaulted sidebar geometry handed to the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarLayout {
    pub side: SidebarSide,
    pub position: SidebarPosition,
    pub collapsed_size: u16,
}

impl SidebarLayout {
    pub const DEFAULT_COLLAPSED_SIZE: u16 = 16;
}

impl Default for SidebarLayout {
    fn default() -> Self {
        SidebarConfig::default().layout()
    }
}
