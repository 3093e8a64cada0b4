//! Form wrapper around an input: buttons and the error slot.

use crate::document::{Document, NodeId};
use crate::input::Input;
use crate::listeners::{Disposer, Effect, ListenerRegistry, Trigger};
use crate::models::FieldId;

/// Rendered form for one open session.
#[derive(Debug)]
pub struct Form {
    root: NodeId,
    error_slot: NodeId,
    submit_button: Option<NodeId>,
    cancel_button: Option<NodeId>,
    is_submitting: bool,
    disposers: Vec<Disposer>,
}

impl Form {
    /// Render `input` into a new, detached form.
    ///
    /// # Arguments
    /// - `show_buttons`: Add submit and cancel buttons with click listeners.
    pub fn render(
        doc: &mut Document,
        listeners: &mut ListenerRegistry,
        owner: FieldId,
        input: &mut Input,
        show_buttons: bool,
    ) -> Self {
        let root = doc.create_element("form");
        doc.add_class(root, "editable-form");
        doc.set_attribute(root, "novalidate", "true");
        let controls = doc.create_element("div");
        doc.add_class(controls, "editable-controls");
        doc.append_child(root, controls);
        let input_root = input.render(doc);
        doc.append_child(controls, input_root);

        let mut form = Self {
            root,
            error_slot: root,
            submit_button: None,
            cancel_button: None,
            is_submitting: false,
            disposers: Vec::new(),
        };
        if show_buttons {
            let buttons = doc.create_element("div");
            doc.add_class(buttons, "editable-buttons");
            let submit = button(doc, "submit", "editable-submit", "\u{2713}", "Save");
            let cancel = button(doc, "button", "editable-cancel", "\u{2717}", "Cancel");
            doc.append_child(buttons, submit);
            doc.append_child(buttons, cancel);
            doc.append_child(controls, buttons);
            form.disposers.push(listeners.register(
                owner,
                Trigger::Click { node: submit },
                Effect::Submit,
            ));
            form.disposers.push(listeners.register(
                owner,
                Trigger::Click { node: cancel },
                Effect::Cancel,
            ));
            form.submit_button = Some(submit);
            form.cancel_button = Some(cancel);
        }
        let error_slot = doc.create_element("div");
        doc.add_class(error_slot, "editable-error-block");
        doc.set_attribute(error_slot, "role", "alert");
        doc.set_hidden(error_slot, true);
        doc.append_child(root, error_slot);
        form.error_slot = error_slot;
        form
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn submit_button(&self) -> Option<NodeId> {
        self.submit_button
    }

    pub fn cancel_button(&self) -> Option<NodeId> {
        self.cancel_button
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// Toggle the busy flag and disable the buttons while a save is in flight.
    pub fn set_submitting(&mut self, doc: &mut Document, submitting: bool) {
        self.is_submitting = submitting;
        for node in [self.submit_button, self.cancel_button].into_iter().flatten() {
            if submitting {
                doc.set_attribute(node, "disabled", "disabled");
            } else {
                doc.remove_attribute(node, "disabled");
            }
        }
    }

    pub fn show_error(&mut self, doc: &mut Document, message: &str) {
        doc.set_text(self.error_slot, message);
        doc.set_hidden(self.error_slot, false);
        doc.add_class(self.root, "has-error");
    }

    pub fn clear_error(&mut self, doc: &mut Document) {
        doc.clear_content(self.error_slot);
        doc.set_hidden(self.error_slot, true);
        doc.remove_class(self.root, "has-error");
    }

    /// Message currently shown, if the slot is visible.
    pub fn error_message(&self, doc: &Document) -> Option<String> {
        if !doc.is_alive(self.error_slot) || doc.is_hidden(self.error_slot) {
            return None;
        }
        Some(doc.text_content(self.error_slot))
    }

    pub fn contains(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_alive(self.root) && doc.contains(self.root, node)
    }

    /// Drop the button listeners.
    pub fn dispose(&mut self, listeners: &mut ListenerRegistry) {
        listeners.dispose_all(&mut self.disposers);
    }
}

fn button(doc: &mut Document, kind: &str, class: &str, glyph: &str, label: &str) -> NodeId {
    let node = doc.create_element("button");
    doc.set_attribute(node, "type", kind);
    doc.set_attribute(node, "aria-label", label);
    doc.add_class(node, "btn");
    doc.add_class(node, class);
    doc.set_text(node, glyph);
    node
}
