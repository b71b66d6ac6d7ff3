//! The overlay holding the embedded surface.

use crate::error::LinkError;
use crate::host::DocumentHost;
use crate::style::{read_link_style, LinkStyle};

pub const STYLES_ID: &str = "mesh-link-popup__styles";
pub const POPUP_ID: &str = "mesh-link-popup";
pub const BACKDROP_ID: &str = "mesh-link-popup__backdrop";
pub const CONTENT_ID: &str = "mesh-link-popup__popup-content";
pub const IFRAME_ID: &str = "mesh-link-popup__iframe";

pub const IFRAME_ALLOW: &str = "clipboard-read *; clipboard-write *";

/// Element tree appended to `<body>`: root > (backdrop, content > iframe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupElements {
    pub root_id: &'static str,
    pub backdrop_id: &'static str,
    pub content_id: &'static str,
    pub iframe_id: &'static str,
    pub iframe_src: String,
    pub iframe_allow: &'static str,
}

impl PopupElements {
    pub fn new(iframe_src: impl Into<String>) -> Self {
        Self {
            root_id: POPUP_ID,
            backdrop_id: BACKDROP_ID,
            content_id: CONTENT_ID,
            iframe_id: IFRAME_ID,
            iframe_src: iframe_src.into(),
            iframe_allow: IFRAME_ALLOW,
        }
    }
}

/// Creates and removes the popup. At most one exists: `show` replaces.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopupManager;

impl PopupManager {
    pub fn show<D: DocumentHost + ?Sized>(&self, doc: &D, link: &str) -> Result<(), LinkError> {
        self.hide(doc)?;

        let style = read_link_style(link).style();
        doc.append_stylesheet(STYLES_ID, &stylesheet(&style))?;
        doc.append_popup(&PopupElements::new(link))?;
        tracing::debug!(%link, "Link popup shown");
        Ok(())
    }

    /// No-op when nothing is shown.
    pub fn hide<D: DocumentHost + ?Sized>(&self, doc: &D) -> Result<(), LinkError> {
        let removed_popup = doc.remove_element(POPUP_ID)?;
        let removed_styles = doc.remove_element(STYLES_ID)?;
        if removed_popup || removed_styles {
            tracing::debug!("Link popup removed");
        }
        Ok(())
    }

    pub fn is_shown<D: DocumentHost + ?Sized>(&self, doc: &D) -> bool {
        doc.has_element(POPUP_ID)
    }
}

pub fn stylesheet(style: &LinkStyle) -> String {
    let radius = style.radius();
    let opacity = style.backdrop_opacity();
    format!(
        r#"
  body {{
    position: fixed;
    left: 0;
    top: 0;
    bottom: 0;
    right: 0;
    overflow: hidden;
  }}

  #{POPUP_ID} {{
    all: unset;
    position: fixed;
    left: 0;
    top: 0;
    bottom: 0;
    right: 0;
    display: flex;
    flex-direction: column;
    align-items: center;
    justify-content: center;
    z-index: 10000;
  }}

  #{BACKDROP_ID} {{
    position: absolute;
    left: 0;
    top: 0;
    bottom: 0;
    right: 0;
    z-index: 10000;
    background: black;
    opacity: {opacity};
  }}

  #{CONTENT_ID} {{
    position: absolute;
    height: 80%;
    max-height: 710px;
    min-height: 685px;
    margin: auto;
    z-index: 10001;
    width: 30%;
    max-width: 430px;
    min-width: 380px;
    display: flex;
    flex-direction: column;
    border-radius: {radius}px;
    flex-grow: 1;
  }}

  #{CONTENT_ID} iframe {{
    border: none;
    width: 100%;
    flex-grow: 1;
    border-radius: {radius}px;
  }}

  @media only screen and (max-width: 768px) {{
    #{CONTENT_ID} {{
      height: 100vh;
      width: 100vw;
      max-width: 100%;
      min-width: 100%;
      max-height: 100%;
      min-height: 100%;
      border-radius: 0px;
    }}

    #{CONTENT_ID} iframe {{
      border-radius: 0px;
    }}
  }}

  @media only screen and (max-height: 710px) {{
    #{CONTENT_ID} {{
      max-height: 100%;
      min-height: 100%;
    }}
  }}
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryHost;

    const LINK: &str = "http://localhost/1";

    #[test]
    fn show_builds_tree() {
        let host = MemoryHost::new("http://localhost");
        PopupManager.show(&host, LINK).unwrap();

        assert!(PopupManager.is_shown(&host));
        assert_eq!(host.attribute(IFRAME_ID, "src").as_deref(), Some(LINK));
        assert_eq!(host.attribute(IFRAME_ID, "allow").as_deref(), Some(IFRAME_ALLOW));
        assert_eq!(host.parent_of(IFRAME_ID).as_deref(), Some(CONTENT_ID));
        assert_eq!(host.parent_of(BACKDROP_ID).as_deref(), Some(POPUP_ID));
        assert!(host.stylesheet(STYLES_ID).is_some());
    }

    #[test]
    fn show_replaces_existing_popup() {
        let host = MemoryHost::new("http://localhost");
        PopupManager.show(&host, LINK).unwrap();
        PopupManager.show(&host, "http://localhost/2").unwrap();

        assert_eq!(host.count_with_id(POPUP_ID), 1);
        assert_eq!(host.count_with_id(STYLES_ID), 1);
        assert_eq!(
            host.attribute(IFRAME_ID, "src").as_deref(),
            Some("http://localhost/2")
        );
    }

    #[test]
    fn hide_removes_everything_and_is_idempotent() {
        let host = MemoryHost::new("http://localhost");
        PopupManager.show(&host, LINK).unwrap();
        PopupManager.hide(&host).unwrap();

        assert!(!PopupManager.is_shown(&host));
        assert!(!host.has_element(IFRAME_ID));
        assert!(host.stylesheet(STYLES_ID).is_none());
        assert!(PopupManager.hide(&host).is_ok());
    }

    #[test]
    fn stylesheet_uses_overrides_and_defaults() {
        let css = stylesheet(&LinkStyle::default());
        assert!(css.contains("opacity: 0.6;"));
        assert!(css.contains("border-radius: 24px;"));

        let css = stylesheet(&LinkStyle {
            ir: Some(12.0),
            io: Some(0.1),
        });
        assert!(css.contains("opacity: 0.1;"));
        assert!(css.contains("border-radius: 12px;"));
    }

    #[test]
    fn show_reads_style_from_link() {
        let host = MemoryHost::new("http://localhost");
        // {"ir":8}
        PopupManager
            .show(&host, "http://localhost/1?link_style=eyJpciI6OH0=")
            .unwrap();
        let css = host.stylesheet(STYLES_ID).unwrap();
        assert!(css.contains("border-radius: 8px;"));
    }
}
