//! Page wiring for the mobile menu.

use crate::controller::{BackdropPolicy, OverlayController};
use crate::document::{Document, OverlayError};

/// Selectors and names the menu markup uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuConfig {
    /// Control that opens the panel
    pub toggle_selector: String,

    /// The navigation panel
    pub panel_selector: String,

    /// Control inside the panel that closes it
    pub close_selector: String,

    /// Class marking the panel as open
    pub open_class: String,

    /// Class giving the backdrop its styling
    pub backdrop_class: String,

    /// Id shared by the open and close wiring to find the backdrop
    pub backdrop_id: String,

    pub policy: BackdropPolicy,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            toggle_selector: ".mob-menu-toggle".to_string(),
            panel_selector: "#mobile-menu".to_string(),
            close_selector: "#mobile-menu-close".to_string(),
            open_class: "opened".to_string(),
            backdrop_class: "mobile-menu-backdrop".to_string(),
            backdrop_id: "mobile-menu-backdrop".to_string(),
            policy: BackdropPolicy::default(),
        }
    }
}

/// A mounted mobile menu: toggle and close controls bound to a controller.
pub struct MobileMenu<D: Document> {
    controller: OverlayController<D>,
    toggle: D::Element,
    close: D::Element,
}

impl<D: Document> MobileMenu<D> {
    /// Locate the menu elements and attach click listeners.
    ///
    /// Fails if any of the toggle, panel or close elements is missing; nothing
    /// is wired in that case.
    pub fn init(document: D, config: &MenuConfig) -> Result<Self, OverlayError> {
        let find = |selector: &str| {
            document
                .query(selector)
                .ok_or_else(|| OverlayError::MissingElement {
                    selector: selector.to_string(),
                })
        };

        let toggle = find(&config.toggle_selector)?;
        let panel = find(&config.panel_selector)?;
        let close = find(&config.close_selector)?;

        let controller = OverlayController::new(
            document.clone(),
            panel,
            &config.open_class,
            &config.backdrop_class,
        )
        .with_policy(config.policy);

        let on_toggle = controller.clone();
        let tag = config.backdrop_id.clone();
        document.on_click(
            &toggle,
            Box::new(move || {
                if let Err(e) = on_toggle.open(&tag) {
                    tracing::error!("Failed to open menu: {}", e);
                }
            }),
        )?;

        let on_close = controller.clone();
        let tag = config.backdrop_id.clone();
        document.on_click(
            &close,
            Box::new(move || {
                if let Err(e) = on_close.close(&tag) {
                    tracing::error!("Failed to close menu: {}", e);
                }
            }),
        )?;

        tracing::debug!("Mobile menu mounted on {}", config.panel_selector);

        Ok(Self {
            controller,
            toggle,
            close,
        })
    }

    pub fn controller(&self) -> &OverlayController<D> {
        &self.controller
    }

    pub fn toggle_element(&self) -> &D::Element {
        &self.toggle
    }

    pub fn close_element(&self) -> &D::Element {
        &self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PanelState;
    use crate::memory::MemoryDocument;
    use pretty_assertions::assert_eq;

    fn page() -> MemoryDocument {
        let doc = MemoryDocument::new();
        doc.insert("button", None, &["mob-menu-toggle"]);
        doc.insert("nav", Some("mobile-menu"), &[]);
        doc.insert("button", Some("mobile-menu-close"), &[]);
        doc
    }

    #[test]
    fn toggle_and_close_controls_drive_the_panel() {
        let doc = page();
        let menu = MobileMenu::init(doc.clone(), &MenuConfig::default()).unwrap();

        doc.click(*menu.toggle_element());
        assert_eq!(menu.controller().state(), PanelState::Open);
        assert_eq!(doc.count_by_id("mobile-menu-backdrop"), 1);

        doc.click(*menu.close_element());
        assert_eq!(menu.controller().state(), PanelState::Closed);
        assert_eq!(doc.count_by_id("mobile-menu-backdrop"), 0);
    }

    #[test]
    fn backdrop_click_closes_menu() {
        let doc = page();
        let menu = MobileMenu::init(doc.clone(), &MenuConfig::default()).unwrap();

        doc.click(*menu.toggle_element());
        let backdrop = doc.element_by_id("mobile-menu-backdrop").unwrap();
        doc.click(backdrop);

        assert_eq!(menu.controller().state(), PanelState::Closed);
        assert!(doc.element_by_id("mobile-menu-backdrop").is_none());
    }

    #[test]
    fn close_control_on_closed_menu_does_not_panic() {
        let doc = page();
        let menu = MobileMenu::init(doc.clone(), &MenuConfig::default()).unwrap();

        doc.click(*menu.close_element());

        assert_eq!(menu.controller().state(), PanelState::Closed);
    }

    #[test]
    fn missing_panel_fails_init() {
        let doc = MemoryDocument::new();
        doc.insert("button", None, &["mob-menu-toggle"]);
        doc.insert("button", Some("mobile-menu-close"), &[]);

        let err = MobileMenu::init(doc, &MenuConfig::default()).err().unwrap();

        assert_eq!(
            err,
            OverlayError::MissingElement {
                selector: "#mobile-menu".to_string()
            }
        );
    }

    #[test]
    fn missing_toggle_leaves_no_listeners() {
        let doc = MemoryDocument::new();
        let panel = doc.insert("nav", Some("mobile-menu"), &[]);
        let close = doc.insert("button", Some("mobile-menu-close"), &[]);

        assert!(MobileMenu::init(doc.clone(), &MenuConfig::default()).is_err());

        doc.click(close);
        assert!(doc.classes(panel).is_empty());
        assert_eq!(doc.body_children().len(), 2);
    }

    #[test]
    fn single_policy_from_config() {
        let doc = page();
        let config = MenuConfig {
            policy: BackdropPolicy::Single,
            ..Default::default()
        };
        let menu = MobileMenu::init(doc.clone(), &config).unwrap();

        doc.click(*menu.toggle_element());
        doc.click(*menu.toggle_element());

        assert_eq!(doc.count_by_id("mobile-menu-backdrop"), 1);
    }
}
