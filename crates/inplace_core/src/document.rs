//! In-memory document tree the engine renders into.
//!
//! The engine never talks to a real DOM. Hosts mirror this arena into whatever
//! surface they draw on and feed geometry back through [`Document::set_rect`]
//! and [`Document::set_viewport`].

use serde::Serialize;
use std::collections::BTreeMap;

/// Handle to a node in a [`Document`].
///
/// Arena slots are reused once a node is removed; the generation keeps a
/// handle to the removed node from reaching the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    /// Raw arena index, mostly useful for logging.
    pub fn index(self) -> usize {
        self.index
    }
}

/// Axis-aligned box in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Visible window size plus current scroll offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

/// Leaf content of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Content {
    #[default]
    Empty,
    /// Plain text; hosts must escape it when rendering.
    Text(String),
    /// Markup the engine has already sanitized.
    Markup(String),
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    content: Content,
    value: String,
    checked: bool,
    hidden: bool,
    rect: Rect,
    position: Option<(f64, f64)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    alive: bool,
    generation: u32,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            content: Content::Empty,
            value: String::new(),
            checked: false,
            hidden: false,
            rect: Rect::default(),
            position: None,
            parent: None,
            children: Vec::new(),
            alive: true,
            generation: 0,
        }
    }

    /// Stand-in read and written through handles to removed nodes.
    fn retired() -> Self {
        Self {
            alive: false,
            ..Self::new("")
        }
    }
}

/// Arena-backed document with a single `body` root.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    free: Vec<usize>,
    retired: Node,
    body: NodeId,
    focused: Option<NodeId>,
    viewport: Viewport,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only `body`.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("body")],
            free: Vec::new(),
            retired: Node::retired(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
            focused: None,
            viewport: Viewport::default(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn owns(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.index)
            .is_some_and(|node| node.generation == id.generation)
    }

    fn node(&self, id: NodeId) -> &Node {
        if self.owns(id) {
            &self.nodes[id.index]
        } else {
            &self.retired
        }
    }

    // Writes through a stale handle land in a scratch node and are lost.
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        if self.owns(id) {
            &mut self.nodes[id.index]
        } else {
            self.retired = Node::retired();
            &mut self.retired
        }
    }

    /// Allocate a detached element, reusing a removed node's slot if any.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let mut node = Node::new(tag);
        match self.free.pop() {
            Some(index) => {
                node.generation = self.nodes[index].generation.wrapping_add(1);
                let generation = node.generation;
                self.nodes[index] = node;
                NodeId { index, generation }
            }
            None => {
                self.nodes.push(node);
                NodeId {
                    index: self.nodes.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Whether `id` has not been retired by [`Document::remove`].
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.owns(id) && self.nodes[id.index].alive
    }

    /// Number of arena slots, live or free.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes not yet removed.
    pub fn live_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Whether `id` is reachable from `body`.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.body {
                return true;
            }
            current = self.node(node).parent;
        }
        false
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node(child).parent {
            self.node_mut(parent).children.retain(|c| *c != child);
        }
        self.node_mut(child).parent = None;
    }

    /// Append `child` as the last child of `parent`, moving it if needed.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.is_alive(parent) || !self.is_alive(child) {
            return;
        }
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Insert `node` as the next sibling of `reference`.
    ///
    /// # Returns
    /// `false` when `reference` has no parent to insert into.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> bool {
        if !self.is_alive(node) {
            return false;
        }
        let Some(parent) = self.node(reference).parent else {
            return false;
        };
        self.detach(node);
        let siblings = &mut self.node_mut(parent).children;
        let index = siblings
            .iter()
            .position(|c| *c == reference)
            .map(|i| i + 1)
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.node_mut(node).parent = Some(parent);
        true
    }

    /// Insert `node` as the previous sibling of `reference` inside `parent`.
    pub fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: NodeId) {
        if !self.is_alive(parent) || !self.is_alive(node) {
            return;
        }
        self.detach(node);
        let siblings = &mut self.node_mut(parent).children;
        let index = siblings
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.node_mut(node).parent = Some(parent);
    }

    /// Detach `id` and retire it together with its whole subtree.
    pub fn remove(&mut self, id: NodeId) {
        if !self.is_alive(id) || id == self.body {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.focused == Some(current) {
                self.focused = None;
            }
            let node = self.node_mut(current);
            node.alive = false;
            node.parent = None;
            stack.extend(node.children.drain(..));
            self.free.push(current.index);
        }
    }

    /// Retire every child of `id`, keeping `id` itself.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = self.node(id).children.clone();
        for child in children {
            self.remove(child);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        self.node_mut(id)
            .attributes
            .insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .attributes
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        self.node_mut(id)
            .attributes
            .remove(&name.to_ascii_lowercase());
    }

    /// All `(name, value)` attribute pairs, in name order.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.node(id)
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        let classes = &mut self.node_mut(id).classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        self.node_mut(id).classes.retain(|c| c != class);
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.node(id).classes.iter().any(|c| c == class)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.node_mut(id).content = Content::Text(text.into());
    }

    pub fn set_markup(&mut self, id: NodeId, markup: impl Into<String>) {
        self.node_mut(id).content = Content::Markup(markup.into());
    }

    pub fn clear_content(&mut self, id: NodeId) {
        self.node_mut(id).content = Content::Empty;
    }

    pub fn content(&self, id: NodeId) -> &Content {
        &self.node(id).content
    }

    /// Concatenated text of `id` and its descendants, markup stripped.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).content {
            Content::Empty => {}
            Content::Text(text) => out.push_str(text),
            Content::Markup(markup) => out.push_str(&crate::sanitize::markup_text(markup)),
        }
        for child in &self.node(id).children {
            self.collect_text(*child, out);
        }
    }

    /// Leaf content as markup: sanitized markup verbatim, text escaped.
    pub fn inner_markup(&self, id: NodeId) -> String {
        match &self.node(id).content {
            Content::Empty => String::new(),
            Content::Text(text) => crate::sanitize::escape_text(text),
            Content::Markup(markup) => markup.clone(),
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        self.node_mut(id).value = value.into();
    }

    pub fn value(&self, id: NodeId) -> &str {
        &self.node(id).value
    }

    pub fn set_checked(&mut self, id: NodeId, checked: bool) {
        self.node_mut(id).checked = checked;
    }

    pub fn checked(&self, id: NodeId) -> bool {
        self.node(id).checked
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        self.node_mut(id).hidden = hidden;
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.node(id).hidden
    }

    /// Attached, and neither the node nor any ancestor is hidden.
    pub fn is_visible(&self, id: NodeId) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if self.node(node).hidden {
                return false;
            }
            current = self.node(node).parent;
        }
        true
    }

    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        self.node_mut(id).rect = rect;
    }

    pub fn rect(&self, id: NodeId) -> Rect {
        self.node(id).rect
    }

    /// Record an absolute `(top, left)` page position.
    pub fn set_position(&mut self, id: NodeId, top: f64, left: f64) {
        self.node_mut(id).position = Some((top, left));
    }

    pub fn position(&self, id: NodeId) -> Option<(f64, f64)> {
        self.node(id).position
    }

    /// Move focus to `id`; retired nodes cannot take focus.
    pub fn focus(&mut self, id: NodeId) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        self.focused = Some(id);
        true
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// First descendant of `root` (inclusive) carrying `class`.
    pub fn find_by_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        if self.has_class(root, class) {
            return Some(root);
        }
        self.node(root)
            .children
            .iter()
            .find_map(|child| self.find_by_class(*child, class))
    }

    /// Every descendant of `root` (inclusive) with tag `tag`, in document order.
    pub fn find_all_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk_tag(root, tag, &mut found);
        found
    }

    fn walk_tag(&self, id: NodeId, tag: &str, found: &mut Vec<NodeId>) {
        if self.node(id).tag == tag {
            found.push(id);
        }
        for child in &self.node(id).children {
            self.walk_tag(*child, tag, found);
        }
    }
}
