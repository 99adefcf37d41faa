#![forbid(unsafe_code)]

//! Declarative per-hostname rules.
//!
//! A [`HostRule`] is plain data plus a compiled hostname pattern. Rules are
//! grouped in an ordered [`HostRuleSet`]; declaration order matters because
//! single-valued properties resolve to the first matching rule that defines
//! them (see [`crate::resolve`]).

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::builtin;
use crate::error::RuleError;
use crate::mode::{ColorMode, DisplayStyle, MenuMode, MenuSize, SidebarConfig};
use crate::resolve::HostMatch;

/// One entry of the host rule table.
///
/// The pattern is a case-sensitive regular expression tested against the
/// literal hostname; it is only anchored if the pattern itself says so.
#[derive(Debug, Clone)]
pub struct HostRule {
    pattern: Regex,
    host_page_css: Option<String>,
    widget_css: Option<String>,
    default_color_mode: Option<ColorMode>,
    menu_mode: Option<MenuMode>,
    attach_selector: Option<String>,
    attach_ancestor_steps: Option<u32>,
    sidebar_config: Option<SidebarConfig>,
    display_style: Option<DisplayStyle>,
    menu_size: Option<MenuSize>,
}

impl HostRule {
    /// Compile a rule with no properties set.
    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let pattern = Regex::new(pattern).map_err(|source| RuleError::InvalidPattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self {
            pattern,
            host_page_css: None,
            widget_css: None,
            default_color_mode: None,
            menu_mode: None,
            attach_selector: None,
            attach_ancestor_steps: None,
            sidebar_config: None,
            display_style: None,
            menu_size: None,
        })
    }

    /// CSS injected into the host page's `<head>`.
    #[must_use]
    pub fn host_page_css(mut self, css: impl Into<String>) -> Self {
        self.host_page_css = Some(css.into());
        self
    }

    /// CSS injected inside the widget's isolated root.
    #[must_use]
    pub fn widget_css(mut self, css: impl Into<String>) -> Self {
        self.widget_css = Some(css.into());
        self
    }

    #[must_use]
    pub fn color_mode(mut self, mode: ColorMode) -> Self {
        self.default_color_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn menu_mode(mut self, mode: MenuMode) -> Self {
        self.menu_mode = Some(mode);
        self
    }

    /// Anchor the menu to the first element matching `selector`.
    ///
    /// An empty selector leaves the property unset.
    #[must_use]
    pub fn attach_to(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        self.attach_selector = (!selector.is_empty()).then_some(selector);
        self
    }

    /// Walk this many parent links up from the matched element.
    #[must_use]
    pub fn attach_ancestor_steps(mut self, steps: u32) -> Self {
        self.attach_ancestor_steps = Some(steps);
        self
    }

    #[must_use]
    pub fn sidebar(mut self, config: SidebarConfig) -> Self {
        self.sidebar_config = Some(config);
        self
    }

    #[must_use]
    pub fn display_style(mut self, style: DisplayStyle) -> Self {
        self.display_style = Some(style);
        self
    }

    #[must_use]
    pub fn menu_size(mut self, size: MenuSize) -> Self {
        self.menu_size = Some(size);
        self
    }

    /// Source text of the hostname pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn matches(&self, hostname: &str) -> bool {
        self.pattern.is_match(hostname)
    }

    #[must_use]
    pub fn host_page_css_block(&self) -> Option<&str> {
        self.host_page_css.as_deref()
    }

    #[must_use]
    pub fn widget_css_block(&self) -> Option<&str> {
        self.widget_css.as_deref()
    }

    #[must_use]
    pub const fn default_color_mode(&self) -> Option<ColorMode> {
        self.default_color_mode
    }

    #[must_use]
    pub const fn explicit_menu_mode(&self) -> Option<MenuMode> {
        self.menu_mode
    }

    #[must_use]
    pub fn attach_selector(&self) -> Option<&str> {
        self.attach_selector.as_deref()
    }

    #[must_use]
    pub const fn ancestor_steps(&self) -> Option<u32> {
        self.attach_ancestor_steps
    }

    #[must_use]
    pub const fn sidebar_config(&self) -> Option<SidebarConfig> {
        self.sidebar_config
    }

    #[must_use]
    pub const fn explicit_display_style(&self) -> Option<DisplayStyle> {
        self.display_style
    }

    #[must_use]
    pub const fn explicit_menu_size(&self) -> Option<MenuSize> {
        self.menu_size
    }
}

/// Ordered, immutable list of host rules.
#[derive(Debug, Clone, Default)]
pub struct HostRuleSet {
    rules: Vec<HostRule>,
}

impl HostRuleSet {
    #[must_use]
    pub fn new(rules: Vec<HostRule>) -> Self {
        Self { rules }
    }

    /// The rule table shipped with the menu, compiled once per process.
    ///
    /// If the table ever fails to compile the error is logged and an empty
    /// set is used, which resolves every property to its default.
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<HostRuleSet> = OnceLock::new();
        BUILTIN.get_or_init(|| match builtin::rules() {
            Ok(rules) => Self::new(rules),
            Err(err) => {
                tracing::error!(%err, "builtin host rules failed to compile");
                Self::default()
            }
        })
    }

    #[must_use]
    pub fn rules(&self) -> &[HostRule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// All rules matching `hostname`, in declaration order.
    #[must_use]
    pub fn resolve<'a>(&'a self, hostname: &str) -> HostMatch<'a> {
        let matched = self
            .rules
            .iter()
            .filter(|rule| rule.matches(hostname))
            .collect();
        HostMatch::new(hostname, matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_pattern_is_reported() {
        let err = HostRule::new("(unclosed").unwrap_err();
        assert!(err.to_string().contains("(unclosed"), "{err}");
    }

    #[test]
    fn matching_is_case_sensitive_and_unanchored() {
        let rule = HostRule::new(r"\.example\.org$").unwrap();
        assert!(rule.matches("a.example.org"));
        assert!(!rule.matches("a.EXAMPLE.org"));
        assert!(!rule.matches("a.example.org.evil"));
    }

    #[test]
    fn empty_attach_selector_stays_unset() {
        let rule = HostRule::new("x").unwrap().attach_to("");
        assert_eq!(rule.attach_selector(), None);
    }

    #[test]
    fn builtin_table_compiles_every_rule() {
        assert_eq!(HostRuleSet::builtin().len(), builtin::rules().unwrap().len());
        assert!(!HostRuleSet::builtin().is_empty());
    }

    #[test]
    fn resolve_keeps_declaration_order() {
        let set = HostRuleSet::new(vec![
            HostRule::new("b").unwrap(),
            HostRule::new("nomatch").unwrap(),
            HostRule::new("a").unwrap(),
        ]);
        let matched = set.resolve("ab");
        let patterns: Vec<&str> = matched.rules().iter().map(|r| r.pattern()).collect();
        assert_eq!(patterns, vec!["b", "a"]);
    }
}
