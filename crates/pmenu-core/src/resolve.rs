#![forbid(unsafe_code)]

//! First-match-wins-per-property resolution over matching host rules.
//!
//! Each property is resolved independently: the value comes from the earliest
//! matching rule that defines *that* property, so two properties may come
//! from two different rules. Style blocks are the exception: every matching
//! rule contributes, in match order.

use crate::mode::{ColorMode, DisplayStyle, MenuMode, MenuSize, SidebarConfig};
use crate::rules::HostRule;

/// Which style block to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleBlock {
    /// Injected into the host page's `<head>`.
    HostPage,
    /// Injected inside the widget's isolated root.
    Widget,
}

/// The ordered rules matching one hostname.
#[derive(Debug, Clone)]
pub struct HostMatch<'a> {
    hostname: String,
    rules: Vec<&'a HostRule>,
}

impl<'a> HostMatch<'a> {
    pub(crate) fn new(hostname: &str, rules: Vec<&'a HostRule>) -> Self {
        Self {
            hostname: hostname.to_owned(),
            rules,
        }
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[must_use]
    pub fn rules(&self) -> &[&'a HostRule] {
        &self.rules
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First defined value of a property across the matching rules.
    pub fn property<T>(&self, pick: impl Fn(&'a HostRule) -> Option<T>) -> Option<T> {
        self.rules.iter().copied().find_map(pick)
    }

    #[must_use]
    pub fn color_mode(&self) -> ColorMode {
        self.property(HostRule::default_color_mode)
            .unwrap_or_default()
    }

    /// Menu mode, with legacy inference.
    ///
    /// A rule that sets an attach selector but no explicit mode counts as
    /// `attached`. The scan stops at the first rule that settles the mode
    /// either way.
    #[must_use]
    pub fn menu_mode(&self) -> MenuMode {
        for rule in &self.rules {
            if let Some(mode) = rule.explicit_menu_mode() {
                return mode;
            }
            if rule.attach_selector().is_some() {
                return MenuMode::Attached;
            }
        }
        MenuMode::default()
    }

    #[must_use]
    pub fn display_style(&self) -> DisplayStyle {
        self.property(HostRule::explicit_display_style)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn menu_size(&self) -> MenuSize {
        self.property(HostRule::explicit_menu_size)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn sidebar_config(&self) -> SidebarConfig {
        self.property(HostRule::sidebar_config).unwrap_or_default()
    }

    #[must_use]
    pub fn attach_selector(&self) -> Option<&'a str> {
        self.property(HostRule::attach_selector)
    }

    #[must_use]
    pub fn attach_ancestor_steps(&self) -> u32 {
        self.property(HostRule::ancestor_steps).unwrap_or(0)
    }

    /// Every non-empty block of `kind`, newline-joined in match order.
    #[must_use]
    pub fn style_block(&self, kind: StyleBlock) -> String {
        self.rules
            .iter()
            .filter_map(|rule| match kind {
                StyleBlock::HostPage => rule.host_page_css_block(),
                StyleBlock::Widget => rule.widget_css_block(),
            })
            .filter(|css| !css.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::SidebarSide;
    use crate::rules::HostRuleSet;
    use pretty_assertions::assert_eq;

    fn rule(pattern: &str) -> HostRule {
        HostRule::new(pattern).expect("test pattern compiles")
    }

    #[test]
    fn no_match_yields_defaults() {
        let set = HostRuleSet::new(vec![rule("^only\\.here$").menu_mode(MenuMode::Hidden)]);
        let host = set.resolve("elsewhere.example");
        assert!(host.is_empty());
        assert_eq!(host.color_mode(), ColorMode::Unset);
        assert_eq!(host.menu_mode(), MenuMode::Floating);
        assert_eq!(host.display_style(), DisplayStyle::Adjacent);
        assert_eq!(host.menu_size(), MenuSize::Normal);
        assert_eq!(host.sidebar_config(), SidebarConfig::default());
        assert_eq!(host.attach_selector(), None);
        assert_eq!(host.attach_ancestor_steps(), 0);
        assert_eq!(host.style_block(StyleBlock::HostPage), "");
    }

    #[test]
    fn properties_resolve_independently() {
        let set = HostRuleSet::new(vec![
            rule("host").menu_size(MenuSize::Large),
            rule("host")
                .menu_size(MenuSize::Compact)
                .display_style(DisplayStyle::Modal),
            rule("host").sidebar(SidebarConfig::on_side(SidebarSide::Top)),
        ]);
        let host = set.resolve("host");
        assert_eq!(host.menu_size(), MenuSize::Large);
        assert_eq!(host.display_style(), DisplayStyle::Modal);
        assert_eq!(host.sidebar_config().side, Some(SidebarSide::Top));
    }

    #[test]
    fn legacy_attach_selector_implies_attached() {
        let set = HostRuleSet::new(vec![
            rule("host").attach_to("#logo"),
            rule("host").menu_mode(MenuMode::Sidebar),
        ]);
        assert_eq!(set.resolve("host").menu_mode(), MenuMode::Attached);
    }

    #[test]
    fn explicit_mode_beats_later_legacy_selector() {
        let set = HostRuleSet::new(vec![
            rule("host").menu_mode(MenuMode::Hidden),
            rule("host").attach_to("#logo"),
        ]);
        let host = set.resolve("host");
        assert_eq!(host.menu_mode(), MenuMode::Hidden);
        assert_eq!(host.attach_selector(), Some("#logo"));
    }

    #[test]
    fn style_blocks_concatenate_all_matches() {
        let set = HostRuleSet::new(vec![
            rule("host").host_page_css("a{}").widget_css("w1{}"),
            rule("host"),
            rule("nomatch").host_page_css("skip{}"),
            rule("host").host_page_css("b{}").widget_css(""),
        ]);
        let host = set.resolve("host");
        assert_eq!(host.style_block(StyleBlock::HostPage), "a{}\nb{}");
        assert_eq!(host.style_block(StyleBlock::Widget), "w1{}");
    }
}
