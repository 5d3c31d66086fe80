//! Host document abstraction.

/// Callback invoked when an element is clicked.
pub type ClickHandler = Box<dyn FnMut()>;

/// Errors raised by the overlay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverlayError {
    #[error("Required element not found: {selector}")]
    MissingElement { selector: String },

    #[error("Document has no body")]
    MissingBody,

    #[error("Host error: {0}")]
    Host(String),
}

/// The subset of a DOM the overlay needs.
///
/// Element handles are cheap clones that refer to the same underlying node.
pub trait Document: Clone + 'static {
    /// Handle to an element in this document.
    type Element: Clone + 'static;

    /// Find the first attached element matching a simple selector
    /// (`#id`, `.class` or a tag name).
    fn query(&self, selector: &str) -> Option<Self::Element>;

    /// Find an attached element by its id.
    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// Create a detached element.
    fn create_element(&self, tag: &str) -> Result<Self::Element, OverlayError>;

    fn has_class(&self, element: &Self::Element, class: &str) -> bool;

    fn add_class(&self, element: &Self::Element, class: &str) -> Result<(), OverlayError>;

    fn remove_class(&self, element: &Self::Element, class: &str) -> Result<(), OverlayError>;

    fn set_id(&self, element: &Self::Element, id: &str);

    /// Append an element as the last child of the body.
    fn append_to_body(&self, element: &Self::Element) -> Result<(), OverlayError>;

    /// Detach an element from the document.
    fn remove(&self, element: &Self::Element);

    /// Register a click listener for the lifetime of the element.
    fn on_click(&self, element: &Self::Element, handler: ClickHandler)
        -> Result<(), OverlayError>;
}
