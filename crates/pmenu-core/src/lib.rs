#![forbid(unsafe_code)]

//! Core: host rules, runtime overrides, and display configuration.
//!
//! # Role in the panda menu
//! `pmenu-core` is the pure data layer. It knows nothing about the DOM or
//! JavaScript; it answers one question: given a hostname and the integrator's
//! pre-init overrides, how should the menu be displayed on this page?
//!
//! # Primary responsibilities
//! - **Menu enums**: [`MenuMode`], [`DisplayStyle`], [`MenuSize`], [`ColorMode`]
//!   and the sidebar layout types.
//! - **Host rules**: an ordered [`HostRuleSet`] of regex-matched [`HostRule`]s,
//!   including the builtin table for the ethPandaOps properties.
//! - **Resolution**: first-match-wins-per-property lookup over the matching
//!   rules ([`HostMatch`]), merged with [`MenuOverrides`] into a
//!   [`ResolvedConfig`].
//!
//! # How it fits in the system
//! `pmenu-web` consumes [`ResolvedConfig`] to decide where and how to mount the
//! widget; `pmenu-wasm` feeds it the page hostname and the overrides read from
//! `window.PandaMenuConfig`.

mod builtin;
pub mod config;
pub mod error;
pub mod mode;
pub mod resolve;
pub mod rules;

pub use config::{MenuOverrides, ResolvedConfig};
pub use error::{ConfigError, RuleError};
pub use mode::{
    ColorMode, DisplayStyle, MenuMode, MenuSize, SidebarConfig, SidebarLayout, SidebarPosition,
    SidebarSide,
};
pub use resolve::{HostMatch, StyleBlock};
pub use rules::{HostRule, HostRuleSet};
