#![forbid(unsafe_code)]

//! Runtime overrides and the resolved per-page configuration.
//!
//! Integrators may set a configuration object before the menu script runs.
//! Every field they set wins over the host rules, property by property.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mode::{
    ColorMode, DisplayStyle, MenuMode, MenuSize, SidebarConfig, SidebarLayout,
};
use crate::resolve::StyleBlock;
use crate::rules::HostRuleSet;

/// Pre-init configuration supplied by the host page.
///
/// Wire format is camelCase JSON:
/// `{"attachSelector", "skipRender", "menuMode", "displayStyle", "menuSize", "sidebarConfig"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MenuOverrides {
    /// Selector to attach to. An empty string clears any rule selector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attach_selector: Option<String>,
    /// Do not render the floating trigger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_render: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_mode: Option<MenuMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_style: Option<DisplayStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu_size: Option<MenuSize>,
    /// Replaces the rule's sidebar config as a whole.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidebar_config: Option<SidebarConfig>,
}

impl MenuOverrides {
    /// Parse the JSON form of the configuration object.
    ///
    /// `null` and blank input mean "no overrides".
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let trimmed = json.trim();
        if trimmed.is_empty() || trimmed == "null" {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(trimmed)?)
    }

    #[must_use]
    pub fn with_attach_selector(mut self, selector: impl Into<String>) -> Self {
        self.attach_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_skip_render(mut self, skip: bool) -> Self {
        self.skip_render = Some(skip);
        self
    }

    #[must_use]
    pub fn with_menu_mode(mut self, mode: MenuMode) -> Self {
        self.menu_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_display_style(mut self, style: DisplayStyle) -> Self {
        self.display_style = Some(style);
        self
    }

    #[must_use]
    pub fn with_menu_size(mut self, size: MenuSize) -> Self {
        self.menu_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_sidebar_config(mut self, config: SidebarConfig) -> Self {
        self.sidebar_config = Some(config);
        self
    }

    /// Fill every unset field from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            attach_selector: self.attach_selector.or(fallback.attach_selector),
            skip_render: self.skip_render.or(fallback.skip_render),
            menu_mode: self.menu_mode.or(fallback.menu_mode),
            display_style: self.display_style.or(fallback.display_style),
            menu_size: self.menu_size.or(fallback.menu_size),
            sidebar_config: self.sidebar_config.or(fallback.sidebar_config),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Display parameters for one page load, after rules and overrides merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub hostname: String,
    pub color_mode: ColorMode,
    pub menu_mode: MenuMode,
    pub display_style: DisplayStyle,
    pub menu_size: MenuSize,
    pub sidebar: SidebarConfig,
    pub attach_selector: Option<String>,
    pub attach_ancestor_steps: u32,
    pub host_page_css: String,
    pub widget_css: String,
    pub skip_render: bool,
}

impl ResolvedConfig {
    /// Resolve `hostname` against `rules`, then apply `overrides`.
    ///
    /// An override selector without an override mode implies `attached`,
    /// mirroring the legacy inference applied to rules.
    #[must_use]
    pub fn resolve(rules: &HostRuleSet, hostname: &str, overrides: &MenuOverrides) -> Self {
        let host = rules.resolve(hostname);

        let attach_selector = match overrides.attach_selector.as_deref() {
            Some("") => None,
            Some(selector) => Some(selector.to_owned()),
            None => host.attach_selector().map(str::to_owned),
        };
        let override_selects = overrides
            .attach_selector
            .as_deref()
            .is_some_and(|selector| !selector.is_empty());
        let menu_mode = match overrides.menu_mode {
            Some(mode) => mode,
            None if override_selects => MenuMode::Attached,
            None => host.menu_mode(),
        };

        Self {
            hostname: hostname.to_owned(),
            color_mode: host.color_mode(),
            menu_mode,
            display_style: overrides
                .display_style
                .unwrap_or_else(|| host.display_style()),
            menu_size: overrides.menu_size.unwrap_or_else(|| host.menu_size()),
            sidebar: overrides
                .sidebar_config
                .unwrap_or_else(|| host.sidebar_config()),
            attach_selector,
            attach_ancestor_steps: host.attach_ancestor_steps(),
            host_page_css: host.style_block(StyleBlock::HostPage),
            widget_css: host.style_block(StyleBlock::Widget),
            skip_render: overrides.skip_render.unwrap_or(false),
        }
    }

    /// Resolve against the builtin rule table.
    #[must_use]
    pub fn for_host(hostname: &str, overrides: &MenuOverrides) -> Self {
        Self::resolve(HostRuleSet::builtin(), hostname, overrides)
    }

    #[must_use]
    pub const fn menu_width_px(&self) -> u16 {
        self.menu_size.width_px()
    }

    #[must_use]
    pub fn sidebar_layout(&self) -> SidebarLayout {
        self.sidebar.layout()
    }
}
