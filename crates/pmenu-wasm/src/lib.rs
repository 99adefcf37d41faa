#![forbid(unsafe_code)]

//! Browser bootstrap for the panda menu.
//!
//! On load the module reads `window.PandaMenuConfig` (and any keys a page
//! set on `window.PandaMenu` before the script ran), starts a
//! [`pmenu_web::MenuRuntime`] over the live document and publishes the
//! control surface as `window.PandaMenu`:
//!
//! ```text
//! PandaMenu.initialized
//! PandaMenu.render(target?, mode?, sidebarConfig?)
//! PandaMenu.attach(selector)
//! PandaMenu.cleanup()
//! PandaMenu.open() / close() / toggle()
//! ```
//!
//! Argument decoding and console logging are plain Rust and tested
//! natively; the `web-sys` glue only compiles for `wasm32`.

pub mod bootstrap;
pub mod console;

#[cfg(target_arch = "wasm32")]
pub mod dom;
#[cfg(target_arch = "wasm32")]
mod wasm;
