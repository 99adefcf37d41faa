#![forbid(unsafe_code)]

//! Stylesheets: the widget's own CSS inside the isolated root, and the
//! per-host CSS injected into the page `<head>`.

use crate::HOST_STYLES_ID;
use crate::document::{DomError, HostDocument};

/// Base widget stylesheet; `:host { all: initial }` cuts off inherited page
/// styles at the shadow boundary.
pub const BASE_STYLESHEET: &str = r#":host {
  all: initial;
}

.panda-menu {
  --panda-menu-bg: #111827;
  --panda-menu-fg: #f9fafb;
  --panda-menu-border: rgba(255, 255, 255, 0.12);
  font-family: system-ui, -apple-system, "Segoe UI", sans-serif;
  font-size: 14px;
  line-height: 1.4;
  color: var(--panda-menu-fg);
}

.panda-menu.theme-light {
  --panda-menu-bg: #ffffff;
  --panda-menu-fg: #111827;
  --panda-menu-border: rgba(17, 24, 39, 0.12);
}

.panda-menu-button {
  position: fixed;
  top: 12px;
  left: 12px;
  z-index: 2147483000;
  width: 36px;
  height: 36px;
  border: 1px solid var(--panda-menu-border);
  border-radius: 8px;
  background: var(--panda-menu-bg);
  color: var(--panda-menu-fg);
  cursor: pointer;
}

.panda-menu-sidebar {
  position: fixed;
  z-index: 2147483000;
  border: 1px solid var(--panda-menu-border);
  background: var(--panda-menu-bg);
  cursor: pointer;
}

.panda-menu-panel {
  z-index: 2147483001;
  width: var(--panda-menu-width);
  max-height: 80vh;
  overflow-y: auto;
  border: 1px solid var(--panda-menu-border);
  border-radius: 12px;
  background: var(--panda-menu-bg);
  box-shadow: 0 12px 32px rgba(0, 0, 0, 0.35);
}

.panda-menu-overlay {
  position: fixed;
  inset: 0;
  z-index: 2147483000;
  background: rgba(0, 0, 0, 0.5);
}

.panda-menu[data-open="false"] .panda-menu-panel,
.panda-menu[data-open="false"] .panda-menu-overlay {
  display: none;
}
"#;

/// Style text for the host rule's widget CSS block.
#[must_use]
pub fn widget_style_text(widget_css: &str) -> String {
    format!("/* Host-specific menu styles */\n{widget_css}")
}

/// Style text for the host page `<head>` block.
#[must_use]
pub fn host_style_text(hostname: &str, host_page_css: &str) -> String {
    format!("\n/* Panda Menu Host Styles - injected for {hostname} */\n{host_page_css}\n")
}

/// Append the host page stylesheet to `<head>` unless it is already there.
///
/// Returns whether a new element was injected.
pub fn inject_host_styles<D: HostDocument>(
    doc: &mut D,
    hostname: &str,
    host_page_css: &str,
) -> Result<bool, DomError> {
    if doc.element_by_id(HOST_STYLES_ID).is_some() {
        return Ok(false);
    }
    let style = doc.create_element("style")?;
    doc.set_attribute(&style, "id", HOST_STYLES_ID)?;
    doc.set_text(&style, &host_style_text(hostname, host_page_css))?;
    doc.append_to_head(&style)?;
    tracing::debug!(hostname, bytes = host_page_css.len(), "host page styles injected");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;
    use pretty_assertions::assert_eq;

    #[test]
    fn host_styles_are_injected_once() {
        let mut doc = MemoryDocument::new("dora.x.ethpandaops.io");
        assert!(inject_host_styles(&mut doc, "dora.x.ethpandaops.io", "nav{}").unwrap());
        assert!(!inject_host_styles(&mut doc, "dora.x.ethpandaops.io", "nav{}").unwrap());
        assert_eq!(doc.count_by_id(HOST_STYLES_ID), 1);

        let style = doc.element_by_id(HOST_STYLES_ID).unwrap();
        assert_eq!(doc.parent_element(&style), Some(doc.head()));
        assert_eq!(
            doc.text(style),
            "\n/* Panda Menu Host Styles - injected for dora.x.ethpandaops.io */\nnav{}\n"
        );
    }

    #[test]
    fn widget_block_is_labelled() {
        assert_eq!(
            widget_style_text(".b{}"),
            "/* Host-specific menu styles */\n.b{}"
        );
    }
}
