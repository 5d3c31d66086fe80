//! Browser host backed by `web-sys`.

use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::document::{ClickHandler, Document, OverlayError};
use crate::listeners::Listeners;
use crate::menu::{MenuConfig, MobileMenu};

/// The page's `document`.
///
/// Click closures are owned here and dropped when their element is removed,
/// so backdrops created on every open do not accumulate listeners.
#[derive(Clone)]
pub struct WebDocument {
    document: web_sys::Document,
    listeners: Rc<Listeners<web_sys::Element, Closure<dyn FnMut()>>>,
}

impl WebDocument {
    /// Wrap the current window's document.
    pub fn from_window() -> Result<Self, OverlayError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| OverlayError::Host("No window document".to_string()))?;
        Ok(Self {
            document,
            listeners: Rc::new(Listeners::new()),
        })
    }
}

fn host_error(err: JsValue) -> OverlayError {
    OverlayError::Host(format!("{:?}", err))
}

impl Document for WebDocument {
    type Element = web_sys::Element;

    fn query(&self, selector: &str) -> Option<web_sys::Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    fn element_by_id(&self, id: &str) -> Option<web_sys::Element> {
        self.document.get_element_by_id(id)
    }

    fn create_element(&self, tag: &str) -> Result<web_sys::Element, OverlayError> {
        self.document.create_element(tag).map_err(host_error)
    }

    fn has_class(&self, element: &web_sys::Element, class: &str) -> bool {
        element.class_list().contains(class)
    }

    fn add_class(&self, element: &web_sys::Element, class: &str) -> Result<(), OverlayError> {
        element.class_list().add_1(class).map_err(host_error)
    }

    fn remove_class(&self, element: &web_sys::Element, class: &str) -> Result<(), OverlayError> {
        element.class_list().remove_1(class).map_err(host_error)
    }

    fn set_id(&self, element: &web_sys::Element, id: &str) {
        element.set_id(id);
    }

    fn append_to_body(&self, element: &web_sys::Element) -> Result<(), OverlayError> {
        let body = self.document.body().ok_or(OverlayError::MissingBody)?;
        body.append_child(element).map(|_| ()).map_err(host_error)
    }

    fn remove(&self, element: &web_sys::Element) {
        element.remove();
        // wasm-bindgen defers freeing a closure that is still running, so a
        // backdrop may release its own listener from inside it.
        self.listeners.release(element);
    }

    fn on_click(
        &self,
        element: &web_sys::Element,
        handler: ClickHandler,
    ) -> Result<(), OverlayError> {
        let closure = Closure::<dyn FnMut()>::wrap(handler);
        element
            .add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())
            .map_err(host_error)?;
        self.listeners.hold(element.clone(), closure);
        Ok(())
    }
}

fn mount_now(document: WebDocument) -> Result<(), OverlayError> {
    let menu = MobileMenu::init(document, &MenuConfig::default())?;
    // The toggle and close listeners belong to the page, not to a backdrop.
    std::mem::forget(menu);
    Ok(())
}

/// Mount the mobile menu once the document has been parsed.
#[wasm_bindgen]
pub fn mount() -> Result<(), JsValue> {
    let document = WebDocument::from_window().map_err(|e| JsValue::from_str(&e.to_string()))?;

    if document.document.ready_state() != "loading" {
        return mount_now(document).map_err(|e| JsValue::from_str(&e.to_string()));
    }

    let target = document.document.clone();
    let on_ready = Closure::<dyn FnMut()>::wrap(Box::new(move || {
        if let Err(e) = mount_now(document.clone()) {
            web_sys::console::error_1(&JsValue::from_str(&e.to_string()));
        }
    }));
    target
        .add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())?;
    on_ready.forget();

    Ok(())
}
