//! Presentation strategies: floating panel or inline swap.

use crate::config::{Mode, Placement};
use crate::document::{Document, NodeId, Rect, Viewport};
use crate::error::EditError;
use crate::listeners::{Disposer, Effect, ListenerRegistry, Trigger};
use crate::models::FieldId;

/// Page coordinates for a floating panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelPosition {
    pub top: f64,
    pub left: f64,
    /// Side the arrow class is derived from.
    pub placement: Placement,
}

/// Place a panel of `panel` size next to `anchor`.
///
/// The preferred side is always used; both axes are then clamped so the panel
/// stays inside the viewport, and scroll offsets are added last.
///
/// # Arguments
/// - `anchor`: Anchor box in viewport coordinates.
/// - `panel`: Panel box; only its size is read.
/// - `placement`: Preferred side.
/// - `viewport`: Visible area and scroll offsets.
///
/// # Returns
/// Absolute page coordinates for the panel's top-left corner.
pub fn compute_position(
    anchor: Rect,
    panel: Rect,
    placement: Placement,
    viewport: Viewport,
) -> PanelPosition {
    let centered_left = anchor.left() + anchor.width / 2.0 - panel.width / 2.0;
    let centered_top = anchor.top() + anchor.height / 2.0 - panel.height / 2.0;
    let (top, left) = match placement {
        Placement::Top => (anchor.top() - panel.height, centered_left),
        Placement::Bottom => (anchor.bottom(), centered_left),
        Placement::Left => (centered_top, anchor.left() - panel.width),
        Placement::Right => (centered_top, anchor.right()),
    };
    let left = left.min(viewport.width - panel.width).max(0.0);
    let top = top.min(viewport.height - panel.height).max(0.0);
    PanelPosition {
        top: top + viewport.scroll_y,
        left: left + viewport.scroll_x,
        placement,
    }
}

const PLACEMENT_CLASSES: [&str; 4] = [
    "editable-popover-top",
    "editable-popover-bottom",
    "editable-popover-left",
    "editable-popover-right",
];

#[derive(Debug)]
enum Strategy {
    Floating {
        placement: Placement,
        arrow: NodeId,
        body: NodeId,
    },
    Inline,
}

/// Presentation surface hosting a field's form.
#[derive(Debug)]
pub struct Container {
    anchor: NodeId,
    root: NodeId,
    loading: NodeId,
    content: Option<NodeId>,
    strategy: Strategy,
    disposers: Vec<Disposer>,
}

impl Container {
    /// Build the container for `mode`, hidden.
    ///
    /// # Errors
    /// Returns [`EditError::DetachedAnchor`] when an inline container has no
    /// parent to be inserted into.
    pub fn create(
        doc: &mut Document,
        anchor: NodeId,
        mode: Mode,
        placement: Placement,
        title: Option<&str>,
    ) -> Result<Self, EditError> {
        match mode {
            Mode::Floating => Ok(Self::floating(doc, anchor, placement, title)),
            Mode::Inline => Self::inline(doc, anchor),
        }
    }

    fn floating(
        doc: &mut Document,
        anchor: NodeId,
        placement: Placement,
        title: Option<&str>,
    ) -> Self {
        let root = doc.create_element("div");
        doc.add_class(root, "editable-popover");
        doc.set_attribute(root, "role", "dialog");
        let arrow = doc.create_element("div");
        doc.add_class(arrow, "editable-arrow");
        doc.append_child(root, arrow);
        if let Some(title) = title {
            let header = doc.create_element("h3");
            doc.add_class(header, "editable-popover-header");
            doc.set_text(header, title);
            doc.append_child(root, header);
        }
        let body = doc.create_element("div");
        doc.add_class(body, "editable-popover-body");
        doc.append_child(root, body);
        let loading = loading_indicator(doc);
        doc.append_child(body, loading);
        doc.set_hidden(root, true);
        let page = doc.body();
        doc.append_child(page, root);
        Self {
            anchor,
            root,
            loading,
            content: None,
            strategy: Strategy::Floating {
                placement,
                arrow,
                body,
            },
            disposers: Vec::new(),
        }
    }

    fn inline(doc: &mut Document, anchor: NodeId) -> Result<Self, EditError> {
        let root = doc.create_element("span");
        doc.add_class(root, "editable-inline");
        let loading = loading_indicator(doc);
        doc.append_child(root, loading);
        doc.set_hidden(root, true);
        if !doc.insert_after(anchor, root) {
            doc.remove(root);
            return Err(EditError::DetachedAnchor);
        }
        Ok(Self {
            anchor,
            root,
            loading,
            content: None,
            strategy: Strategy::Inline,
            disposers: Vec::new(),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.strategy, Strategy::Inline)
    }

    /// Make the container visible and install its document listeners.
    pub fn show(&mut self, doc: &mut Document, listeners: &mut ListenerRegistry, owner: FieldId) {
        doc.set_hidden(self.root, false);
        match self.strategy {
            Strategy::Floating { .. } => {
                doc.add_class(self.root, "show");
                self.reposition(doc);
            }
            Strategy::Inline => doc.set_hidden(self.anchor, true),
        }
        listeners.dispose_all(&mut self.disposers);
        self.disposers = vec![
            listeners.register(owner, Trigger::OutsidePointer, Effect::OutsideInteraction),
            listeners.register(owner, Trigger::EscapeKey, Effect::Cancel),
            listeners.register(owner, Trigger::EnterKey, Effect::Submit),
        ];
    }

    /// Hide the container and drop its document listeners.
    pub fn hide(&mut self, doc: &mut Document, listeners: &mut ListenerRegistry) {
        listeners.dispose_all(&mut self.disposers);
        if !doc.is_alive(self.root) {
            return;
        }
        doc.set_hidden(self.root, true);
        match self.strategy {
            Strategy::Floating { .. } => doc.remove_class(self.root, "show"),
            Strategy::Inline => {
                if doc.is_alive(self.anchor) {
                    doc.set_hidden(self.anchor, false);
                }
            }
        }
    }

    /// Replace the hosted content with `node`.
    pub fn set_content(&mut self, doc: &mut Document, node: NodeId) {
        if let Some(previous) = self.content.take() {
            if previous != node {
                doc.remove(previous);
            }
        }
        let host = match self.strategy {
            Strategy::Floating { body, .. } => body,
            Strategy::Inline => self.root,
        };
        doc.append_child(host, node);
        self.content = Some(node);
        if self.is_visible(doc) {
            self.reposition(doc);
        }
    }

    /// Remove the hosted content, if any.
    pub fn clear_content(&mut self, doc: &mut Document) {
        if let Some(previous) = self.content.take() {
            doc.remove(previous);
        }
    }

    pub fn show_loading(&mut self, doc: &mut Document) {
        doc.set_hidden(self.loading, false);
        if let Some(content) = self.content {
            doc.set_hidden(content, true);
        }
    }

    pub fn hide_loading(&mut self, doc: &mut Document) {
        doc.set_hidden(self.loading, true);
        if let Some(content) = self.content {
            doc.set_hidden(content, false);
        }
    }

    pub fn is_loading(&self, doc: &Document) -> bool {
        doc.is_alive(self.loading) && !doc.is_hidden(self.loading)
    }

    /// Tear down the container and everything it hosts.
    pub fn destroy(&mut self, doc: &mut Document, listeners: &mut ListenerRegistry) {
        self.hide(doc, listeners);
        self.content = None;
        doc.remove(self.root);
    }

    pub fn is_visible(&self, doc: &Document) -> bool {
        doc.is_visible(self.root)
    }

    /// Whether `node` lies inside the container.
    pub fn contains(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_alive(self.root) && doc.contains(self.root, node)
    }

    /// Recompute the floating panel position from current geometry.
    pub fn reposition(&mut self, doc: &mut Document) {
        let Strategy::Floating {
            placement, arrow, ..
        } = self.strategy
        else {
            return;
        };
        let position = compute_position(
            doc.rect(self.anchor),
            doc.rect(self.root),
            placement,
            doc.viewport(),
        );
        doc.set_position(self.root, position.top, position.left);
        for class in PLACEMENT_CLASSES {
            doc.remove_class(self.root, class);
        }
        let class = format!("editable-popover-{}", position.placement.as_str());
        doc.add_class(self.root, &class);
        doc.set_attribute(arrow, "data-placement", position.placement.as_str());
    }
}

fn loading_indicator(doc: &mut Document) -> NodeId {
    let loading = doc.create_element("div");
    doc.add_class(loading, "editable-loading");
    doc.set_attribute(loading, "aria-busy", "true");
    doc.set_hidden(loading, true);
    loading
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport {
            width: 1000.0,
            height: 800.0,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    #[test]
    fn top_placement_centres_above_the_anchor() {
        let anchor = Rect::new(400.0, 300.0, 100.0, 20.0);
        let panel = Rect::new(0.0, 0.0, 200.0, 100.0);
        let position = compute_position(anchor, panel, Placement::Top, viewport());
        assert_eq!(position.top, 200.0);
        assert_eq!(position.left, 350.0);
    }

    #[test]
    fn panels_are_clamped_into_the_viewport() {
        let anchor = Rect::new(950.0, 10.0, 40.0, 20.0);
        let panel = Rect::new(0.0, 0.0, 200.0, 100.0);
        let position = compute_position(anchor, panel, Placement::Top, viewport());
        assert_eq!(position.top, 0.0);
        assert_eq!(position.left, 800.0);
        assert_eq!(position.placement, Placement::Top);

        let left = compute_position(
            Rect::new(5.0, 300.0, 40.0, 20.0),
            panel,
            Placement::Left,
            viewport(),
        );
        assert_eq!(left.left, 0.0);
        assert_eq!(left.top, 260.0);
    }

    #[test]
    fn scroll_offsets_are_added_after_clamping() {
        let mut scrolled = viewport();
        scrolled.scroll_x = 10.0;
        scrolled.scroll_y = 500.0;
        let anchor = Rect::new(400.0, 300.0, 100.0, 20.0);
        let panel = Rect::new(0.0, 0.0, 200.0, 100.0);
        let position = compute_position(anchor, panel, Placement::Bottom, scrolled);
        assert_eq!(position.top, 820.0);
        assert_eq!(position.left, 360.0);
    }

    #[test]
    fn inline_container_swaps_with_the_anchor() {
        let mut doc = Document::new();
        let body = doc.body();
        let anchor = doc.create_element("span");
        doc.append_child(body, anchor);
        let mut listeners = ListenerRegistry::new();
        let mut container =
            Container::create(&mut doc, anchor, Mode::Inline, Placement::Top, None).unwrap();
        container.show(&mut doc, &mut listeners, FieldId(1));
        assert!(doc.is_hidden(anchor));
        assert!(container.is_visible(&doc));
        assert_eq!(listeners.count_for(FieldId(1)), 3);
        container.hide(&mut doc, &mut listeners);
        assert!(!doc.is_hidden(anchor));
        assert!(listeners.is_empty());
    }

    #[test]
    fn inline_container_requires_an_attached_anchor() {
        let mut doc = Document::new();
        let anchor = doc.create_element("span");
        let result = Container::create(&mut doc, anchor, Mode::Inline, Placement::Top, None);
        assert!(matches!(result, Err(EditError::DetachedAnchor)));
    }

    #[test]
    fn floating_container_positions_and_tags_placement() {
        let mut doc = Document::new();
        let body = doc.body();
        let anchor = doc.create_element("span");
        doc.append_child(body, anchor);
        doc.set_rect(anchor, Rect::new(400.0, 300.0, 100.0, 20.0));
        let mut listeners = ListenerRegistry::new();
        let mut container =
            Container::create(&mut doc, anchor, Mode::Floating, Placement::Bottom, Some("Edit"))
                .unwrap();
        let root = container.root();
        doc.set_rect(root, Rect::new(0.0, 0.0, 200.0, 100.0));
        container.show(&mut doc, &mut listeners, FieldId(1));
        assert_eq!(doc.position(root), Some((320.0, 350.0)));
        assert!(doc.has_class(root, "editable-popover-bottom"));
        container.destroy(&mut doc, &mut listeners);
        assert!(!doc.is_alive(root));
        assert!(listeners.is_empty());
    }
}
