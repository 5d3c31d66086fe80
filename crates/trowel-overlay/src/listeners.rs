//! Ownership of event listeners tied to a single element.

use std::cell::RefCell;

/// Keeps listeners alive while their element is on the page.
///
/// `L` is whatever must stay alive for the listener to fire, such as a
/// `wasm_bindgen` closure. Releasing an element drops its listeners.
pub(crate) struct Listeners<E, L> {
    entries: RefCell<Vec<(E, L)>>,
}

impl<E: PartialEq, L> Listeners<E, L> {
    pub(crate) fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn hold(&self, element: E, listener: L) {
        self.entries.borrow_mut().push((element, listener));
    }

    /// Drop every listener held for `element`, returning how many there were.
    pub(crate) fn release(&self, element: &E) -> usize {
        let released: Vec<(E, L)> = {
            let mut entries = self.entries.borrow_mut();
            let (released, kept) = entries.drain(..).partition(|(e, _)| e == element);
            *entries = kept;
            released
        };
        // Dropped outside the borrow: a listener may own a handle back to us.
        released.len()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn release_drops_only_that_elements_listeners() {
        let listeners = Listeners::new();
        let backdrop = Rc::new(());
        let toggle = Rc::new(());

        listeners.hold(1, Rc::clone(&backdrop));
        listeners.hold(2, Rc::clone(&toggle));
        listeners.hold(1, Rc::clone(&backdrop));

        assert_eq!(listeners.release(&1), 2);
        assert_eq!(Rc::strong_count(&backdrop), 1);
        assert_eq!(Rc::strong_count(&toggle), 2);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn repeated_opens_stay_bounded() {
        let listeners = Listeners::new();

        for element in 0..100 {
            listeners.hold(element, Box::new(()));
            listeners.release(&element);
        }

        assert_eq!(listeners.len(), 0);
        assert_eq!(listeners.release(&7), 0);
    }
}
