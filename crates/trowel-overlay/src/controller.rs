//! Panel/backdrop state machine.

use std::cell::Cell;
use std::rc::Rc;

use crate::document::{Document, OverlayError};

/// Visible state of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    Open,
}

/// What `open` does when a backdrop is already on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackdropPolicy {
    /// Append a new backdrop on every `open`, even if the panel is already
    /// open. Repeated opens stack backdrops.
    #[default]
    Duplicate,

    /// Keep at most one backdrop; `open` skips creation while one is live.
    Single,
}

/// Toggles a panel and keeps a dismissing backdrop in step with it.
///
/// Cloning yields another handle onto the same panel and backdrop count,
/// which is how backdrop click handlers reach back into the controller.
pub struct OverlayController<D: Document> {
    document: D,
    panel: D::Element,
    open_class: Rc<str>,
    backdrop_class: Rc<str>,
    policy: BackdropPolicy,
    live_backdrops: Rc<Cell<usize>>,
}

impl<D: Document> Clone for OverlayController<D> {
    fn clone(&self) -> Self {
        Self {
            document: self.document.clone(),
            panel: self.panel.clone(),
            open_class: Rc::clone(&self.open_class),
            backdrop_class: Rc::clone(&self.backdrop_class),
            policy: self.policy,
            live_backdrops: Rc::clone(&self.live_backdrops),
        }
    }
}

impl<D: Document> OverlayController<D> {
    /// Create a controller for `panel`.
    pub fn new(document: D, panel: D::Element, open_class: &str, backdrop_class: &str) -> Self {
        Self {
            document,
            panel,
            open_class: Rc::from(open_class),
            backdrop_class: Rc::from(backdrop_class),
            policy: BackdropPolicy::default(),
            live_backdrops: Rc::new(Cell::new(0)),
        }
    }

    /// Set the backdrop policy.
    pub fn with_policy(mut self, policy: BackdropPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> BackdropPolicy {
        self.policy
    }

    /// Current panel state, read from the open class.
    pub fn state(&self) -> PanelState {
        if self.document.has_class(&self.panel, &self.open_class) {
            PanelState::Open
        } else {
            PanelState::Closed
        }
    }

    /// Number of backdrops this controller created that are still attached.
    pub fn live_backdrops(&self) -> usize {
        self.live_backdrops.get()
    }

    /// Open the panel and append a backdrop identified by `tag`.
    ///
    /// Clicking the backdrop closes the panel and removes that backdrop.
    pub fn open(&self, tag: &str) -> Result<(), OverlayError> {
        self.mark_open()?;

        if self.policy == BackdropPolicy::Single && self.live_backdrops.get() > 0 {
            tracing::debug!("Backdrop already present, not adding another");
            return Ok(());
        }

        let backdrop = self.document.create_element("div")?;
        self.document.add_class(&backdrop, &self.backdrop_class)?;
        self.document.set_id(&backdrop, tag);

        let controller = self.clone();
        let target = backdrop.clone();
        self.document.on_click(
            &backdrop,
            Box::new(move || {
                if let Err(e) = controller.dismiss(&target) {
                    tracing::error!("Failed to dismiss overlay: {}", e);
                }
            }),
        )?;

        self.document.append_to_body(&backdrop)?;
        self.live_backdrops.set(self.live_backdrops.get() + 1);

        tracing::debug!("Opened panel with backdrop #{}", tag);
        Ok(())
    }

    /// Close the panel and remove the backdrop identified by `tag`.
    ///
    /// Returns whether a backdrop was removed. A missing backdrop is logged
    /// and otherwise ignored.
    pub fn close(&self, tag: &str) -> Result<bool, OverlayError> {
        self.mark_closed()?;

        match self.document.element_by_id(tag) {
            Some(backdrop) => {
                self.detach(&backdrop);
                tracing::debug!("Closed panel and removed backdrop #{}", tag);
                Ok(true)
            }
            None => {
                tracing::warn!("No backdrop #{} to remove on close", tag);
                Ok(false)
            }
        }
    }

    /// Backdrop click path: close the panel and remove this exact backdrop.
    fn dismiss(&self, backdrop: &D::Element) -> Result<(), OverlayError> {
        self.mark_closed()?;
        self.detach(backdrop);
        Ok(())
    }

    fn mark_open(&self) -> Result<(), OverlayError> {
        if !self.document.has_class(&self.panel, &self.open_class) {
            self.document.add_class(&self.panel, &self.open_class)?;
        }
        Ok(())
    }

    fn mark_closed(&self) -> Result<(), OverlayError> {
        if self.document.has_class(&self.panel, &self.open_class) {
            self.document.remove_class(&self.panel, &self.open_class)?;
        }
        Ok(())
    }

    fn detach(&self, backdrop: &D::Element) {
        self.document.remove(backdrop);
        self.live_backdrops
            .set(self.live_backdrops.get().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryDocument;

    fn setup(policy: BackdropPolicy) -> (MemoryDocument, OverlayController<MemoryDocument>) {
        let doc = MemoryDocument::new();
        let panel = doc.insert("nav", Some("mobile-menu"), &[]);
        let controller =
            OverlayController::new(doc.clone(), panel, "opened", "mobile-menu-backdrop")
                .with_policy(policy);
        (doc, controller)
    }

    #[test]
    fn starts_closed() {
        let (_, controller) = setup(BackdropPolicy::Duplicate);
        assert_eq!(controller.state(), PanelState::Closed);
        assert_eq!(controller.live_backdrops(), 0);
    }

    #[test]
    fn open_then_close_removes_backdrop() {
        let (doc, controller) = setup(BackdropPolicy::Duplicate);

        controller.open("tag1").unwrap();
        assert_eq!(controller.state(), PanelState::Open);
        assert_eq!(doc.count_by_id("tag1"), 1);

        let backdrop = doc.element_by_id("tag1").unwrap();
        assert!(doc.has_class(&backdrop, "mobile-menu-backdrop"));

        assert!(controller.close("tag1").unwrap());
        assert_eq!(controller.state(), PanelState::Closed);
        assert!(doc.element_by_id("tag1").is_none());
        assert_eq!(controller.live_backdrops(), 0);
    }

    #[test]
    fn open_is_idempotent_on_panel_class() {
        let (doc, controller) = setup(BackdropPolicy::Duplicate);
        let panel = doc.query("#mobile-menu").unwrap();

        for _ in 0..3 {
            controller.open("tag1").unwrap();
            assert_eq!(controller.state(), PanelState::Open);
        }

        assert_eq!(doc.classes(panel), vec!["opened".to_string()]);
    }

    #[test]
    fn duplicate_policy_stacks_backdrops() {
        let (doc, controller) = setup(BackdropPolicy::Duplicate);

        controller.open("tag1").unwrap();
        controller.open("tag1").unwrap();

        assert_eq!(controller.state(), PanelState::Open);
        assert_eq!(doc.count_by_id("tag1"), 2);
        assert_eq!(controller.live_backdrops(), 2);
    }

    #[test]
    fn single_policy_keeps_one_backdrop() {
        let (doc, controller) = setup(BackdropPolicy::Single);

        controller.open("tag1").unwrap();
        controller.open("tag1").unwrap();

        assert_eq!(doc.count_by_id("tag1"), 1);
        assert_eq!(controller.live_backdrops(), 1);
    }

    #[test]
    fn long_sessions_do_not_grow_the_document() {
        let (doc, controller) = setup(BackdropPolicy::Duplicate);

        for _ in 0..50 {
            controller.open("tag1").unwrap();
            let backdrop = doc.element_by_id("tag1").unwrap();
            doc.click(backdrop);
        }

        // The panel plus one recycled backdrop slot.
        assert_eq!(doc.capacity(), 2);
        assert_eq!(doc.body_children().len(), 1);
    }

    #[test]
    fn backdrop_click_matches_explicit_close() {
        let (doc, controller) = setup(BackdropPolicy::Duplicate);

        controller.open("tag1").unwrap();
        let backdrop = doc.element_by_id("tag1").unwrap();
        doc.click(backdrop);

        assert_eq!(controller.state(), PanelState::Closed);
        assert!(doc.element_by_id("tag1").is_none());
        assert_eq!(controller.live_backdrops(), 0);
    }

    #[test]
    fn close_without_backdrop_is_a_noop() {
        let (doc, controller) = setup(BackdropPolicy::Duplicate);

        assert!(!controller.close("tag1").unwrap());
        assert_eq!(controller.state(), PanelState::Closed);
        assert!(doc.element_by_id("tag1").is_none());
    }

    #[test]
    fn close_removes_one_of_stacked_backdrops() {
        let (doc, controller) = setup(BackdropPolicy::Duplicate);

        controller.open("tag1").unwrap();
        controller.open("tag1").unwrap();
        controller.close("tag1").unwrap();

        assert_eq!(controller.state(), PanelState::Closed);
        assert_eq!(doc.count_by_id("tag1"), 1);

        // The remaining backdrop still dismisses itself.
        let leftover = doc.element_by_id("tag1").unwrap();
        doc.click(leftover);
        assert_eq!(doc.count_by_id("tag1"), 0);
        assert_eq!(controller.live_backdrops(), 0);
    }

    #[test]
    fn reopen_after_backdrop_dismissal() {
        let (doc, controller) = setup(BackdropPolicy::Single);

        controller.open("tag1").unwrap();
        doc.click(doc.element_by_id("tag1").unwrap());
        controller.open("tag1").unwrap();

        assert_eq!(controller.state(), PanelState::Open);
        assert_eq!(doc.count_by_id("tag1"), 1);
    }
}
