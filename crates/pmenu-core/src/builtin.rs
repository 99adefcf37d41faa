#![forbid(unsafe_code)]

//! Builtin host rule table for the ethPandaOps properties.

use crate::error::RuleError;
use crate::mode::ColorMode;
use crate::rules::HostRule;

const HOMEPAGE_HOST_CSS: &str = "
  #panda-menu-root {
    height: 60px !important;
  }
";

const DORA_FAMILY_HOST_CSS: &str = "
  @media (max-width: 576px) {
    .navbar-brand > svg {
      display: none;
    }
    .navbar-brand {
      padding-left: 60px;
    }
  }
  @media (min-width: 577px) {
    nav.navbar {
      padding-left: 60px;
      padding-right: 60px;
    }
  }
";

const ASSERTOOR_HOST_CSS: &str = "
  .navbar-brand {
    padding-left: 70px !important;
  }
";

const TRACOOR_HOST_CSS: &str = "
  header {
    padding-left: 50px !important;
  }
";

const SYNCOOR_HOST_CSS: &str = "
  header {
    padding-left: 70px !important;
  }
  @media (max-width: 576px) {
    header a > img {
      display: none;
    }
  }
  @media (min-width: 577px) {
    header {
      padding-right: 70px !important;
    }
  }
";

const CHECKPOINTZ_HOST_CSS: &str = "
  header {
    padding-left: 50px !important;
  }
  @media (min-width: 577px) {
    header {
      padding-right: 50px !important;
    }
  }
";

const FORKY_HOST_CSS: &str = "
  header nav {
    padding-left: 70px;
  }
";

const CATCH_ALL_HOST_CSS: &str = "
  /* Generic panda-menu spacing - override if needed */
";

const ABSOLUTE_BUTTON_WIDGET_CSS: &str = "
  .panda-menu-button {
    position: absolute !important;
  }
";

const RAISED_BUTTON_WIDGET_CSS: &str = "
  .panda-menu-button {
    z-index: 20 !important;
  }
";

pub(crate) fn rules() -> Result<Vec<HostRule>, RuleError> {
    Ok(vec![
        // Homepage: the logo opens the menu.
        HostRule::new(r"^(www.)?ethpandaops\.io$")?
            .attach_to("nav div.navbar__logo")
            .host_page_css(HOMEPAGE_HOST_CSS),
        // Lab: the logo image sits inside a link; anchor to the link.
        HostRule::new(r"^(www.)?lab\.ethpandaops\.io$")?
            .attach_to(r#"a > img[alt="Lab Logo"]"#)
            .attach_ancestor_steps(1),
        HostRule::new(r"^(dora|spamoor|beacon)\..*\.ethpandaops\.io$")?
            .host_page_css(DORA_FAMILY_HOST_CSS),
        HostRule::new(r"^assertoor\..*\.ethpandaops\.io$")?.host_page_css(ASSERTOOR_HOST_CSS),
        HostRule::new(r"^tracoor\..*\.ethpandaops\.io$")?
            .color_mode(ColorMode::Light)
            .host_page_css(TRACOOR_HOST_CSS)
            .widget_css(ABSOLUTE_BUTTON_WIDGET_CSS),
        HostRule::new(r"^syncoor\..*\.ethpandaops\.io$")?.host_page_css(SYNCOOR_HOST_CSS),
        HostRule::new(r"^ethstats\..*\.ethpandaops\.io$")?.color_mode(ColorMode::Dark),
        HostRule::new(r"^checkpoint-sync\..*\.ethpandaops\.io$")?
            .color_mode(ColorMode::Light)
            .host_page_css(CHECKPOINTZ_HOST_CSS)
            .widget_css(ABSOLUTE_BUTTON_WIDGET_CSS),
        HostRule::new(r"^forky\..*\.ethpandaops\.io$")?
            .color_mode(ColorMode::Light)
            .host_page_css(FORKY_HOST_CSS)
            .widget_css(RAISED_BUTTON_WIDGET_CSS),
        HostRule::new(r"\.ethpandaops\.io$")?.host_page_css(CATCH_ALL_HOST_CSS),
    ])
}
