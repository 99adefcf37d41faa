#![forbid(unsafe_code)]

//! Decoding of page-supplied configuration and `PandaMenu.*` arguments.
//!
//! Inputs arrive as JSON text (the glue runs `JSON.stringify` on the JS
//! values). Anything malformed is logged and treated as absent.

use pmenu_core::{MenuMode, MenuOverrides, SidebarConfig};

/// Global carrying the control surface.
pub const GLOBAL_NAME: &str = "PandaMenu";

/// Global a page sets before the script loads to override host rules.
pub const CONFIG_GLOBAL_NAME: &str = "PandaMenuConfig";

/// Overrides from `window.PandaMenuConfig`, falling back per field to keys
/// set on a pre-existing `window.PandaMenu`.
#[must_use]
pub fn merge_overrides(config_json: Option<&str>, legacy_json: Option<&str>) -> MenuOverrides {
    let config = parse_overrides(CONFIG_GLOBAL_NAME, config_json);
    let legacy = parse_overrides(GLOBAL_NAME, legacy_json);
    config.or(legacy)
}

fn parse_overrides(source: &'static str, json: Option<&str>) -> MenuOverrides {
    let Some(json) = json else {
        return MenuOverrides::default();
    };
    match MenuOverrides::from_json(json) {
        Ok(overrides) => overrides,
        Err(err) => {
            tracing::warn!(source, %err, "ignoring malformed menu overrides");
            MenuOverrides::default()
        }
    }
}

/// The `mode` argument of `render`. Blank means "use the default".
#[must_use]
pub fn parse_mode(mode: Option<&str>) -> Option<MenuMode> {
    let mode = mode.map(str::trim).filter(|mode| !mode.is_empty())?;
    match mode.parse() {
        Ok(mode) => Some(mode),
        Err(err) => {
            tracing::warn!(%err, "ignoring render mode");
            None
        }
    }
}

/// The `sidebarConfig` argument of `render`.
#[must_use]
pub fn parse_sidebar(json: Option<&str>) -> Option<SidebarConfig> {
    let json = json.map(str::trim).filter(|json| !json.is_empty())?;
    match serde_json::from_str::<Option<SidebarConfig>>(json) {
        Ok(sidebar) => sidebar,
        Err(err) => {
            tracing::warn!(%err, "ignoring sidebar config");
            None
        }
    }
}

/// The `attach` selector argument.
#[must_use]
pub fn parse_selector(selector: Option<String>) -> Option<String> {
    selector.filter(|selector| !selector.trim().is_empty())
}
