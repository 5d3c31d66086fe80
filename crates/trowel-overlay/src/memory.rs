//! In-memory document used for headless runs and tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::document::{ClickHandler, Document, OverlayError};

/// Handle to a node in a [`MemoryDocument`].
///
/// Slots of removed nodes are reused; the generation keeps an old handle from
/// reaching the node that took its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

type SharedHandler = Rc<RefCell<ClickHandler>>;

struct Node {
    generation: u32,
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attached: bool,
    handlers: Vec<SharedHandler>,
}

#[derive(Default)]
struct Tree {
    nodes: Vec<Node>,
    /// Slots whose node was removed.
    free: Vec<usize>,
    /// Attached children of the body, in document order.
    body: Vec<NodeId>,
}

impl Tree {
    fn alloc(&mut self, tag: &str, id: Option<&str>, classes: Vec<String>, attached: bool) -> NodeId {
        let fresh = |generation| Node {
            generation,
            tag: tag.to_string(),
            id: id.map(str::to_string),
            classes,
            attached,
            handlers: Vec::new(),
        };

        match self.free.pop() {
            Some(index) => {
                let generation = self.nodes[index].generation;
                self.nodes[index] = fresh(generation);
                NodeId { index, generation }
            }
            None => {
                self.nodes.push(fresh(0));
                NodeId {
                    index: self.nodes.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    fn get(&self, node: NodeId) -> Option<&Node> {
        self.nodes
            .get(node.index)
            .filter(|n| n.generation == node.generation)
    }

    fn get_mut(&mut self, node: NodeId) -> Option<&mut Node> {
        self.nodes
            .get_mut(node.index)
            .filter(|n| n.generation == node.generation)
    }

    fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.index]
    }
}

/// A flat, body-only DOM.
///
/// Clones share the same tree.
#[derive(Clone, Default)]
pub struct MemoryDocument {
    tree: Rc<RefCell<Tree>>,
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element straight into the body, as page markup would.
    pub fn insert(&self, tag: &str, id: Option<&str>, classes: &[&str]) -> NodeId {
        let mut tree = self.tree.borrow_mut();
        let classes = classes.iter().map(|c| c.to_string()).collect();
        let node = tree.alloc(tag, id, classes, true);
        tree.body.push(node);
        node
    }

    /// Dispatch a click to every listener on `node`.
    pub fn click(&self, node: NodeId) {
        // Listeners mutate the tree, so release the borrow before calling them.
        let handlers: Vec<SharedHandler> = {
            let tree = self.tree.borrow();
            match tree.get(node) {
                Some(n) if n.attached => n.handlers.clone(),
                _ => return,
            }
        };

        for handler in handlers {
            (handler.borrow_mut())();
        }
    }

    /// Count attached elements carrying `id`.
    pub fn count_by_id(&self, id: &str) -> usize {
        let tree = self.tree.borrow();
        tree.body
            .iter()
            .filter(|n| tree.node(**n).id.as_deref() == Some(id))
            .count()
    }

    /// Class list of `node`, in insertion order.
    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.tree
            .borrow()
            .get(node)
            .map(|n| n.classes.clone())
            .unwrap_or_default()
    }

    /// Attached body children.
    pub fn body_children(&self) -> Vec<NodeId> {
        self.tree.borrow().body.clone()
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        self.tree.borrow().get(node).is_some_and(|n| n.attached)
    }

    /// Number of node slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.tree.borrow().nodes.len()
    }

    fn with_node<R>(&self, node: NodeId, f: impl FnOnce(&mut Node) -> R) -> Result<R, OverlayError> {
        let mut tree = self.tree.borrow_mut();
        tree.get_mut(node)
            .map(f)
            .ok_or_else(|| OverlayError::Host(format!("Unknown node {}", node.index)))
    }
}

fn matches(node: &Node, selector: &str) -> bool {
    if let Some(id) = selector.strip_prefix('#') {
        node.id.as_deref() == Some(id)
    } else if let Some(class) = selector.strip_prefix('.') {
        node.classes.iter().any(|c| c == class)
    } else {
        node.tag.eq_ignore_ascii_case(selector)
    }
}

impl Document for MemoryDocument {
    type Element = NodeId;

    fn query(&self, selector: &str) -> Option<NodeId> {
        let tree = self.tree.borrow();
        tree.body
            .iter()
            .copied()
            .find(|n| matches(tree.node(*n), selector))
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let tree = self.tree.borrow();
        tree.body
            .iter()
            .copied()
            .find(|n| tree.node(*n).id.as_deref() == Some(id))
    }

    fn create_element(&self, tag: &str) -> Result<NodeId, OverlayError> {
        Ok(self.tree.borrow_mut().alloc(tag, None, Vec::new(), false))
    }

    fn has_class(&self, element: &NodeId, class: &str) -> bool {
        self.tree
            .borrow()
            .get(*element)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn add_class(&self, element: &NodeId, class: &str) -> Result<(), OverlayError> {
        self.with_node(*element, |n| {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_string());
            }
        })
    }

    fn remove_class(&self, element: &NodeId, class: &str) -> Result<(), OverlayError> {
        self.with_node(*element, |n| n.classes.retain(|c| c != class))
    }

    fn set_id(&self, element: &NodeId, id: &str) {
        let _ = self.with_node(*element, |n| n.id = Some(id.to_string()));
    }

    fn append_to_body(&self, element: &NodeId) -> Result<(), OverlayError> {
        let was_attached = self.with_node(*element, |n| std::mem::replace(&mut n.attached, true))?;

        let mut tree = self.tree.borrow_mut();
        if was_attached {
            tree.body.retain(|n| n != element);
        }
        tree.body.push(*element);
        Ok(())
    }

    fn remove(&self, element: &NodeId) {
        // Handlers may hold clones of this document; drop them after the
        // borrow is released.
        let handlers = {
            let mut tree = self.tree.borrow_mut();
            let Some(node) = tree.get_mut(*element) else {
                return;
            };
            // Bumping the generation now retires every outstanding handle.
            node.generation = node.generation.wrapping_add(1);
            node.attached = false;
            node.id = None;
            node.classes.clear();
            let handlers = std::mem::take(&mut node.handlers);
            tree.free.push(element.index);
            tree.body.retain(|n| n != element);
            handlers
        };
        drop(handlers);
    }

    fn on_click(&self, element: &NodeId, handler: ClickHandler) -> Result<(), OverlayError> {
        self.with_node(*element, |n| n.handlers.push(Rc::new(RefCell::new(handler))))
    }
}
