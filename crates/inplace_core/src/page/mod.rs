//! Field registry and engine entry point.
//!
//! A [`Page`] owns the document, every attached field, the listener registry
//! and the scheduler. Host code drives it with [`Page::dispatch`] and
//! [`Page::tick`], moves queued saves through a [`Transport`] and reads back
//! emitted [`FieldEvent`]s.

mod dispatch;

pub use dispatch::{Key, Modifiers, UiEvent};

use std::collections::{BTreeMap, HashMap};

use crate::config::{FieldConfig, Mode};
use crate::document::{Document, NodeId};
use crate::error::{EditError, TransportError};
use crate::field::{
    Completion, EditableField, Env, FieldState, PendingSubmission, SubmitOutcome, SubmitTicket,
};
use crate::form::Form;
use crate::input::source::normalize_options;
use crate::input::ControlHandles;
use crate::listeners::ListenerRegistry;
use crate::models::{FieldEvent, FieldId, FieldValue, SubmissionContext};
use crate::notify::{Notifier, TracingNotifier};
use crate::schedule::{Scheduler, Task};
use crate::transport::{Transport, TransportResponse};

pub struct Page {
    document: Document,
    fields: BTreeMap<FieldId, EditableField>,
    anchors: HashMap<NodeId, FieldId>,
    open_floating: Option<FieldId>,
    listeners: ListenerRegistry,
    scheduler: Scheduler,
    events: Vec<FieldEvent>,
    outbox: Vec<PendingSubmission>,
    context: SubmissionContext,
    notifier: Box<dyn Notifier>,
    next_id: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self::with_notifier(TracingNotifier)
    }

    pub fn with_notifier(notifier: impl Notifier + 'static) -> Self {
        Self {
            document: Document::new(),
            fields: BTreeMap::new(),
            anchors: HashMap::new(),
            open_floating: None,
            listeners: ListenerRegistry::new(),
            scheduler: Scheduler::default(),
            events: Vec::new(),
            outbox: Vec::new(),
            context: SubmissionContext::default(),
            notifier: Box::new(notifier),
            next_id: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Context merged into every payload built from now on.
    pub fn set_submission_context(&mut self, context: SubmissionContext) {
        self.context = context;
    }

    pub fn submission_context(&self) -> &SubmissionContext {
        &self.context
    }

    fn parts(&mut self, id: FieldId) -> Result<(&mut EditableField, Env<'_>), EditError> {
        let field = self
            .fields
            .get_mut(&id)
            .ok_or(EditError::FieldNotFound(id.get()))?;
        let env = Env {
            doc: &mut self.document,
            listeners: &mut self.listeners,
            scheduler: &mut self.scheduler,
            events: &mut self.events,
            notifier: self.notifier.as_ref(),
        };
        Ok((field, env))
    }

    fn field(&self, id: FieldId) -> Result<&EditableField, EditError> {
        self.fields
            .get(&id)
            .ok_or(EditError::FieldNotFound(id.get()))
    }

    /// Forget the open floating field once it has closed.
    fn sync_open_floating(&mut self) {
        if let Some(open) = self.open_floating {
            let still_open = self
                .fields
                .get(&open)
                .map(|field| field.state().is_open())
                .unwrap_or(false);
            if !still_open {
                self.open_floating = None;
            }
        }
    }

    /// Make `anchor` editable.
    ///
    /// An anchor that already has a field gets a fresh one; the old field is
    /// destroyed first.
    ///
    /// # Arguments
    /// - `anchor`: Element to bind.
    /// - `config`: Field options.
    ///
    /// # Returns
    /// The new field's id.
    ///
    /// # Errors
    /// Returns [`EditError::DetachedAnchor`] if `anchor` is not in the document.
    pub fn attach(&mut self, anchor: NodeId, config: FieldConfig) -> Result<FieldId, EditError> {
        if !self.document.is_attached(anchor) {
            return Err(EditError::DetachedAnchor);
        }
        if let Some(previous) = self.anchors.get(&anchor).copied() {
            tracing::debug!("Re-attaching node {}; destroying {}", anchor.index(), previous);
            self.destroy(previous)?;
        }
        self.next_id += 1;
        let id = FieldId(self.next_id);
        let mut env = Env {
            doc: &mut self.document,
            listeners: &mut self.listeners,
            scheduler: &mut self.scheduler,
            events: &mut self.events,
            notifier: self.notifier.as_ref(),
        };
        let field = EditableField::attach(id, anchor, config, &mut env);
        self.fields.insert(id, field);
        self.anchors.insert(anchor, id);
        Ok(id)
    }

    /// Attach using the anchor's own attributes as configuration.
    ///
    /// # Errors
    /// Returns [`EditError::DetachedAnchor`] if `anchor` is not in the document.
    pub fn attach_from_attributes(&mut self, anchor: NodeId) -> Result<FieldId, EditError> {
        let attributes: Vec<(String, String)> = self
            .document
            .attributes(anchor)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let config = FieldConfig::from_attributes(
            attributes
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
        self.attach(anchor, config)
    }

    pub fn field_for_anchor(&self, anchor: NodeId) -> Option<FieldId> {
        self.anchors.get(&anchor).copied()
    }

    /// Field currently open in floating mode, if any.
    pub fn open_floating(&self) -> Option<FieldId> {
        self.open_floating
    }

    /// Closed to Open.
    ///
    /// A floating field first closes whichever floating field is open.
    ///
    /// # Errors
    /// - [`EditError::FieldNotFound`] for unknown ids.
    /// - [`EditError::Disabled`] for disabled fields.
    /// - [`EditError::DetachedAnchor`] when an inline anchor lost its parent.
    pub fn open(&mut self, id: FieldId) -> Result<(), EditError> {
        let field = self.field(id)?;
        if field.state().is_open() {
            return Ok(());
        }
        if field.is_disabled() {
            return Err(EditError::Disabled);
        }
        let floating = field.mode() == Mode::Floating;
        if floating {
            if let Some(other) = self.open_floating.filter(|other| *other != id) {
                tracing::debug!("Closing {} before opening {}", other, id);
                self.hide(other)?;
            }
        }
        let (field, mut env) = self.parts(id)?;
        field.open(&mut env)?;
        if floating {
            self.open_floating = Some(id);
        }
        Ok(())
    }

    /// Discard the edit (`cancel`, then `hidden`).
    ///
    /// # Errors
    /// Returns [`EditError::FieldNotFound`] for unknown ids.
    pub fn cancel(&mut self, id: FieldId) -> Result<(), EditError> {
        let (field, mut env) = self.parts(id)?;
        field.cancel(&mut env);
        self.sync_open_floating();
        Ok(())
    }

    /// Close without a `cancel` event.
    ///
    /// # Errors
    /// Returns [`EditError::FieldNotFound`] for unknown ids.
    pub fn hide(&mut self, id: FieldId) -> Result<(), EditError> {
        let (field, mut env) = self.parts(id)?;
        field.close(&mut env);
        self.sync_open_floating();
        Ok(())
    }

    /// Open a closed field, hide an open one.
    ///
    /// # Errors
    /// Same as [`Page::open`].
    pub fn toggle(&mut self, id: FieldId) -> Result<(), EditError> {
        if self.field(id)?.state().is_open() {
            self.hide(id)
        } else {
            self.open(id)
        }
    }

    /// Commit the current control value.
    ///
    /// With a URL configured the request is queued; hand it to a transport
    /// with [`Page::flush`] or drive it manually with [`Page::take_pending`]
    /// and [`Page::complete`].
    ///
    /// # Errors
    /// - [`EditError::FieldNotFound`], [`EditError::Destroyed`],
    ///   [`EditError::NotOpen`].
    /// - [`EditError::Validation`] when the validator rejects the value.
    pub fn submit(&mut self, id: FieldId) -> Result<SubmitOutcome, EditError> {
        let context = self.context.clone();
        let (field, mut env) = self.parts(id)?;
        let (outcome, pending) = field.submit(&mut env, &context)?;
        if let Some(pending) = pending {
            self.outbox.push(pending);
        }
        self.sync_open_floating();
        Ok(outcome)
    }

    /// Drain the queued requests.
    pub fn take_pending(&mut self) -> Vec<PendingSubmission> {
        std::mem::take(&mut self.outbox)
    }

    /// Apply a transport outcome to the save identified by `ticket`.
    ///
    /// Responses for destroyed fields, closed fields, or earlier sessions are
    /// discarded.
    pub fn complete(
        &mut self,
        ticket: SubmitTicket,
        outcome: Result<TransportResponse, TransportError>,
    ) -> Completion {
        let Ok((field, mut env)) = self.parts(ticket.field) else {
            tracing::warn!("Discarding save response for unknown {}", ticket.field);
            return Completion::Discarded;
        };
        let completion = field.complete(&mut env, ticket, outcome);
        self.sync_open_floating();
        completion
    }

    /// Send every queued request through `transport` and apply the results.
    ///
    /// # Returns
    /// The number of requests sent.
    pub async fn flush<T: Transport>(&mut self, transport: &T) -> usize {
        let mut sent = 0;
        loop {
            let pending = self.take_pending();
            if pending.is_empty() {
                return sent;
            }
            for request in pending {
                let outcome = transport
                    .post_json(&request.url, &request.payload.to_json())
                    .await;
                sent += 1;
                self.complete(request.ticket, outcome);
            }
        }
    }

    /// Fetch URL option sources for every field still waiting on one.
    ///
    /// Failed loads resolve to an empty option list.
    ///
    /// # Returns
    /// The number of sources fetched.
    pub async fn load_sources<T: Transport>(&mut self, transport: &T) -> usize {
        let waiting: Vec<(FieldId, String)> = self
            .fields
            .iter()
            .filter_map(|(id, field)| field.pending_source().map(|url| (*id, url.to_string())))
            .collect();
        let count = waiting.len();
        for (id, url) in waiting {
            let options = match transport.get_json(&url).await {
                Ok(response) if (200..300).contains(&response.status) => {
                    match serde_json::from_str::<serde_json::Value>(&response.body) {
                        Ok(raw) => normalize_options(&raw),
                        Err(err) => {
                            tracing::warn!("Option source {} is not valid JSON: {}", url, err);
                            Vec::new()
                        }
                    }
                }
                Ok(response) => {
                    tracing::warn!("Option source {} returned status {}", url, response.status);
                    Vec::new()
                }
                Err(err) => {
                    tracing::warn!("Option source {} failed to load: {}", url, err);
                    Vec::new()
                }
            };
            if let Ok((field, mut env)) = self.parts(id) {
                field.set_options(&mut env, options);
            }
        }
        count
    }

    /// Replace the committed value and refresh the display.
    ///
    /// # Errors
    /// Returns [`EditError::FieldNotFound`] for unknown ids.
    pub fn set_value(&mut self, id: FieldId, value: impl Into<FieldValue>) -> Result<(), EditError> {
        let (field, mut env) = self.parts(id)?;
        field.set_value(&mut env, value.into());
        Ok(())
    }

    pub fn value(&self, id: FieldId) -> Option<&FieldValue> {
        self.fields.get(&id).map(EditableField::value)
    }

    pub fn state(&self, id: FieldId) -> Option<&FieldState> {
        self.fields.get(&id).map(EditableField::state)
    }

    pub fn name(&self, id: FieldId) -> Option<&str> {
        self.fields.get(&id).map(EditableField::name)
    }

    pub fn is_disabled(&self, id: FieldId) -> Option<bool> {
        self.fields.get(&id).map(EditableField::is_disabled)
    }

    /// Message shown in the field's form, if any.
    pub fn error_message(&self, id: FieldId) -> Option<String> {
        self.fields
            .get(&id)
            .and_then(EditableField::form)
            .and_then(|form| form.error_message(&self.document))
    }

    /// Rendered control of an open field.
    pub fn control(&self, id: FieldId) -> Option<&ControlHandles> {
        self.fields.get(&id).and_then(|field| field.input().handles())
    }

    /// Rendered form of an open field.
    pub fn form(&self, id: FieldId) -> Option<&Form> {
        self.fields.get(&id).and_then(EditableField::form)
    }

    /// Root node of the field's container, if one exists.
    pub fn container_root(&self, id: FieldId) -> Option<NodeId> {
        self.fields
            .get(&id)
            .and_then(EditableField::container)
            .map(|container| container.root())
    }

    /// # Errors
    /// Returns [`EditError::FieldNotFound`] for unknown ids.
    pub fn enable(&mut self, id: FieldId) -> Result<(), EditError> {
        let (field, mut env) = self.parts(id)?;
        field.set_disabled(&mut env, false);
        Ok(())
    }

    /// Disable the field, closing it if open.
    ///
    /// # Errors
    /// Returns [`EditError::FieldNotFound`] for unknown ids.
    pub fn disable(&mut self, id: FieldId) -> Result<(), EditError> {
        let (field, mut env) = self.parts(id)?;
        field.set_disabled(&mut env, true);
        self.sync_open_floating();
        Ok(())
    }

    /// # Errors
    /// Returns [`EditError::FieldNotFound`] for unknown ids.
    pub fn toggle_disabled(&mut self, id: FieldId) -> Result<(), EditError> {
        if self.field(id)?.is_disabled() {
            self.enable(id)
        } else {
            self.disable(id)
        }
    }

    /// Unbind the field permanently and drop it from the registry.
    ///
    /// # Errors
    /// Returns [`EditError::FieldNotFound`] for unknown ids.
    pub fn destroy(&mut self, id: FieldId) -> Result<(), EditError> {
        let (field, mut env) = self.parts(id)?;
        field.destroy(&mut env);
        let anchor = field.anchor();
        self.fields.remove(&id);
        if self.anchors.get(&anchor) == Some(&id) {
            self.anchors.remove(&anchor);
        }
        if self.open_floating == Some(id) {
            self.open_floating = None;
        }
        self.outbox.retain(|pending| pending.ticket.field != id);
        Ok(())
    }

    /// Advance the scheduler one tick and run what is due.
    pub fn tick(&mut self) {
        for task in self.scheduler.advance() {
            let field_id = match task {
                Task::Activate { field, .. } | Task::BlurSubmit { field, .. } => field,
            };
            let Ok((field, mut env)) = self.parts(field_id) else {
                continue;
            };
            if field.run_task(&mut env, task) {
                if let Err(err) = self.submit(field_id) {
                    tracing::debug!("Blur submit for {} did not go through: {}", field_id, err);
                }
            }
        }
    }

    /// Reposition visible floating panels after geometry changes.
    pub fn relayout(&mut self) {
        for field in self.fields.values_mut() {
            if let Some(container) = field.container_mut() {
                if container.is_visible(&self.document) {
                    container.reposition(&mut self.document);
                }
            }
        }
    }

    /// Take every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<FieldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Total listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn field_ids(&self) -> Vec<FieldId> {
        self.fields.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests;
