//! Per-field controller: the open/submit/close state machine.

use crate::config::{FieldConfig, Mode, OnBlur, SuccessVerdict, Toggle};
use crate::constants::{ACTIVATE_DELAY_TICKS, DEFAULT_SAVE_MESSAGE};
use crate::container::Container;
use crate::document::{Document, NodeId};
use crate::error::{EditError, SubmitFailure, TransportError};
use crate::form::Form;
use crate::input::{DisplayContent, Input, InputKind, SourceOption};
use crate::listeners::{Disposer, Effect, ListenerRegistry, Trigger};
use crate::models::{FieldEvent, FieldEventKind, FieldId, FieldValue, SubmissionContext, SubmissionPayload};
use crate::notify::{NoticeLevel, Notifier};
use crate::schedule::{Scheduler, Task};
use crate::submit::{build_payload, encode_envelope, interpret_response};
use crate::transport::TransportResponse;

/// Lifecycle state of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    Closed,
    /// Editing; `error` is the message shown in the form, if any.
    Open { error: Option<String> },
    /// Open with a save in flight.
    Submitting,
}

impl FieldState {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Identifies one save attempt.
///
/// A response is applied only while its field is still submitting in the same
/// open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmitTicket {
    pub field: FieldId,
    pub generation: u64,
}

/// Request waiting for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub ticket: SubmitTicket,
    pub url: String,
    pub payload: SubmissionPayload,
}

/// Result of a submit call.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Request queued for the transport.
    Queued(SubmitTicket),
    /// No URL configured; committed locally.
    Committed,
    /// Value unchanged; closed with `nochange`.
    Unchanged,
    /// A save is already in flight; nothing happened.
    AlreadySubmitting,
}

/// What a transport response did to its field.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Committed,
    /// The success hook kept the form open; nothing was committed.
    KeptOpen,
    /// Field stays open with the failure shown.
    Failed(SubmitFailure),
    /// The field moved on; the response was dropped.
    Discarded,
}

/// Borrowed page services a field operates through.
pub(crate) struct Env<'a> {
    pub doc: &'a mut Document,
    pub listeners: &'a mut ListenerRegistry,
    pub scheduler: &'a mut Scheduler,
    pub events: &'a mut Vec<FieldEvent>,
    pub notifier: &'a dyn Notifier,
}

#[derive(Debug)]
struct InFlight {
    old_value: FieldValue,
    new_value: FieldValue,
    wire_value: String,
}

pub(crate) struct EditableField {
    id: FieldId,
    anchor: NodeId,
    name: String,
    config: FieldConfig,
    value: FieldValue,
    state: FieldState,
    input: Input,
    form: Option<Form>,
    container: Option<Container>,
    generation: u64,
    destroyed: bool,
    disabled: bool,
    in_flight: Option<InFlight>,
    pending_source: Option<String>,
    anchor_disposers: Vec<Disposer>,
}

impl EditableField {
    /// Bind `config` to `anchor` and render the initial display.
    pub(crate) fn attach(id: FieldId, anchor: NodeId, config: FieldConfig, env: &mut Env<'_>) -> Self {
        let mut input = Input::new(&config);
        let mut pending_source = None;
        if let Some(source) = &config.source {
            match source.resolve_local() {
                Some(options) => input.set_options(env.doc, options, &FieldValue::Null),
                None => {
                    if let crate::input::OptionSource::Url(url) = source {
                        pending_source = Some(url.clone());
                    }
                }
            }
        }
        let name = config
            .name
            .clone()
            .or_else(|| env.doc.attribute(anchor, "id").map(str::to_string))
            .unwrap_or_default();
        let value = match &config.value {
            Some(value) => input.canonicalize(value),
            None => {
                let raw = if config.kind == InputKind::RichText {
                    env.doc.inner_markup(anchor)
                } else {
                    env.doc.text_content(anchor).trim().to_string()
                };
                input.parse(&raw)
            }
        };

        env.doc.add_class(anchor, "editable");
        let mut anchor_disposers = Vec::new();
        match config.toggle {
            Toggle::Click => {
                env.doc.add_class(anchor, "editable-click");
                anchor_disposers.push(env.listeners.register(
                    id,
                    Trigger::Click { node: anchor },
                    Effect::Toggle,
                ));
            }
            Toggle::Hover => anchor_disposers.push(env.listeners.register(
                id,
                Trigger::PointerEnter { node: anchor },
                Effect::Open,
            )),
            Toggle::Manual => {}
        }

        let disabled = config.disabled;
        let field = Self {
            id,
            anchor,
            name,
            config,
            value,
            state: FieldState::Closed,
            input,
            form: None,
            container: None,
            generation: 0,
            destroyed: false,
            disabled,
            in_flight: None,
            pending_source,
            anchor_disposers,
        };
        if disabled {
            env.doc.add_class(anchor, "editable-disabled");
        }
        field.render_display(env.doc);
        tracing::debug!("Attached {} ({}) to node {}", id, field.name, anchor.index());
        field
    }

    pub(crate) fn anchor(&self) -> NodeId {
        self.anchor
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn value(&self) -> &FieldValue {
        &self.value
    }

    pub(crate) fn state(&self) -> &FieldState {
        &self.state
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn mode(&self) -> Mode {
        self.config.mode
    }

    pub(crate) fn on_blur(&self) -> OnBlur {
        self.config.on_blur
    }

    pub(crate) fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub(crate) fn input(&self) -> &Input {
        &self.input
    }

    pub(crate) fn form(&self) -> Option<&Form> {
        self.form.as_ref()
    }

    pub(crate) fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub(crate) fn container_mut(&mut self) -> Option<&mut Container> {
        self.container.as_mut()
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(crate) fn pending_source(&self) -> Option<&str> {
        self.pending_source.as_deref()
    }

    fn emit(&self, env: &mut Env<'_>, kind: FieldEventKind) {
        if self.destroyed {
            return;
        }
        tracing::debug!("{} emitted {}", self.id, kind.name());
        env.events.push(FieldEvent {
            field: self.id,
            anchor: self.anchor,
            kind,
        });
    }

    /// Write the display form of the committed value into the anchor.
    pub(crate) fn render_display(&self, doc: &mut Document) {
        if !doc.is_alive(self.anchor) {
            return;
        }
        let shown = match &self.config.display {
            Some(hook) => DisplayContent::Text(hook(&self.value)),
            None => self.input.to_display(&self.value),
        };
        doc.clear_children(self.anchor);
        if shown.is_empty() {
            doc.add_class(self.anchor, "editable-empty");
            if self.disabled {
                doc.clear_content(self.anchor);
            } else {
                doc.set_text(self.anchor, self.config.empty_text.as_str());
            }
            return;
        }
        doc.remove_class(self.anchor, "editable-empty");
        match shown {
            DisplayContent::Text(text) => doc.set_text(self.anchor, text),
            DisplayContent::Markup(markup) => doc.set_markup(self.anchor, markup),
        }
    }

    /// Closed to Open: build the form, show the container, queue focus.
    ///
    /// # Errors
    /// - [`EditError::Destroyed`] or [`EditError::Disabled`] when not editable.
    /// - [`EditError::DetachedAnchor`] when an inline container cannot be placed.
    pub(crate) fn open(&mut self, env: &mut Env<'_>) -> Result<(), EditError> {
        if self.destroyed {
            return Err(EditError::Destroyed);
        }
        if self.disabled {
            return Err(EditError::Disabled);
        }
        if self.state.is_open() {
            return Ok(());
        }
        if self.container.is_none() {
            self.container = Some(Container::create(
                env.doc,
                self.anchor,
                self.config.mode,
                self.config.placement,
                self.config.title.as_deref(),
            )?);
        }
        self.generation += 1;

        let mut form = Form::render(
            env.doc,
            env.listeners,
            self.id,
            &mut self.input,
            self.config.show_buttons,
        );
        self.input.wire(
            env.listeners,
            self.id,
            self.config.auto_submit && !self.config.show_buttons,
            self.config.on_blur == OnBlur::Submit,
        );
        self.input.to_control(env.doc, &self.value);
        form.clear_error(env.doc);
        let form_root = form.root();
        self.form = Some(form);

        if let Some(container) = self.container.as_mut() {
            container.set_content(env.doc, form_root);
            if self.pending_source.is_some() {
                container.show_loading(env.doc);
            } else {
                container.hide_loading(env.doc);
            }
            container.show(env.doc, env.listeners, self.id);
        }
        self.state = FieldState::Open { error: None };
        env.scheduler.schedule(
            ACTIVATE_DELAY_TICKS,
            Task::Activate {
                field: self.id,
                generation: self.generation,
            },
        );
        self.emit(env, FieldEventKind::Shown);
        Ok(())
    }

    /// Tear down the open session and emit `hidden`.
    ///
    /// Floating containers are destroyed; inline containers are kept hidden
    /// for the next session.
    pub(crate) fn close(&mut self, env: &mut Env<'_>) {
        if !self.state.is_open() {
            return;
        }
        self.teardown_session(env);
        self.state = FieldState::Closed;
        self.emit(env, FieldEventKind::Hidden);
    }

    fn teardown_session(&mut self, env: &mut Env<'_>) {
        if let Some(mut form) = self.form.take() {
            form.dispose(env.listeners);
        }
        self.input.unmount(env.listeners);
        env.scheduler.cancel_field(self.id);
        self.in_flight = None;
        match self.container.as_mut() {
            Some(container) if container.is_inline() => {
                container.hide(env.doc, env.listeners);
                container.clear_content(env.doc);
            }
            Some(container) => {
                container.destroy(env.doc, env.listeners);
                self.container = None;
            }
            None => {}
        }
    }

    /// Discard the edit: emits `cancel` then `hidden`.
    pub(crate) fn cancel(&mut self, env: &mut Env<'_>) {
        if !self.state.is_open() {
            return;
        }
        self.emit(env, FieldEventKind::Cancel);
        self.close(env);
    }

    /// Read, validate, and either commit locally or queue a request.
    ///
    /// # Errors
    /// - [`EditError::Destroyed`] after `destroy`.
    /// - [`EditError::NotOpen`] when the field is closed.
    /// - [`EditError::Validation`] when the validator rejects the value; the
    ///   message is also shown in the form.
    pub(crate) fn submit(
        &mut self,
        env: &mut Env<'_>,
        context: &SubmissionContext,
    ) -> Result<(SubmitOutcome, Option<PendingSubmission>), EditError> {
        if self.destroyed {
            return Err(EditError::Destroyed);
        }
        match self.state {
            FieldState::Closed => return Err(EditError::NotOpen),
            FieldState::Submitting => {
                tracing::debug!("{} ignored submit while a save is in flight", self.id);
                return Ok((SubmitOutcome::AlreadySubmitting, None));
            }
            FieldState::Open { .. } => {}
        }

        let new_value = self.input.from_control(env.doc);
        let rejection = self
            .config
            .validate
            .as_ref()
            .and_then(|validate| validate(&new_value))
            .filter(|message| !message.trim().is_empty());
        if let Some(message) = rejection {
            self.show_failure(env, &message);
            return Err(EditError::Validation(message));
        }

        if !self.config.save_nochange && new_value == self.value {
            self.emit(env, FieldEventKind::NoChange);
            self.close(env);
            return Ok((SubmitOutcome::Unchanged, None));
        }

        let mut wire_value = self.input.to_wire(&new_value);
        if self.config.kind == InputKind::RichText && self.config.html_envelope {
            wire_value = encode_envelope(&wire_value, context.csrf_token.as_deref());
        }

        let Some(url) = self.config.url.clone() else {
            let old_value = self.value.clone();
            self.commit(env, old_value, new_value, wire_value, None);
            return Ok((SubmitOutcome::Committed, None));
        };

        let payload = build_payload(
            &self.name,
            wire_value.clone(),
            &self.config.pk,
            &self.config.params,
            context,
        );
        let ticket = SubmitTicket {
            field: self.id,
            generation: self.generation,
        };
        self.in_flight = Some(InFlight {
            old_value: self.value.clone(),
            new_value,
            wire_value,
        });
        self.state = FieldState::Submitting;
        if let Some(form) = self.form.as_mut() {
            form.clear_error(env.doc);
            form.set_submitting(env.doc, true);
        }
        if let Some(container) = self.container.as_mut() {
            container.show_loading(env.doc);
        }
        tracing::debug!("{} queued save to {}", self.id, url);
        Ok((
            SubmitOutcome::Queued(ticket),
            Some(PendingSubmission {
                ticket,
                url,
                payload,
            }),
        ))
    }

    /// Apply a transport outcome to the save identified by `ticket`.
    pub(crate) fn complete(
        &mut self,
        env: &mut Env<'_>,
        ticket: SubmitTicket,
        outcome: Result<TransportResponse, TransportError>,
    ) -> Completion {
        if self.destroyed
            || ticket.generation != self.generation
            || self.state != FieldState::Submitting
        {
            tracing::warn!("Discarding stale save response for {}", self.id);
            return Completion::Discarded;
        }
        let Some(in_flight) = self.in_flight.take() else {
            tracing::warn!("Discarding save response for {} with no request on record", self.id);
            return Completion::Discarded;
        };
        if let Some(form) = self.form.as_mut() {
            form.set_submitting(env.doc, false);
        }
        if let Some(container) = self.container.as_mut() {
            container.hide_loading(env.doc);
        }

        let (response, raw) = match interpret_response(outcome) {
            Ok(parsed) => parsed,
            Err(failure) => {
                let message = self
                    .config
                    .error
                    .as_ref()
                    .and_then(|hook| hook(&failure))
                    .unwrap_or_else(|| failure.user_message());
                self.state = FieldState::Open { error: None };
                self.show_failure(env, &message);
                return Completion::Failed(failure);
            }
        };

        let prefer_content = self.config.kind == InputKind::RichText;
        let mut committed = response
            .authoritative_value(prefer_content)
            .map(|echoed| self.input.parse(&echoed))
            .unwrap_or(in_flight.new_value);
        let verdict = self
            .config
            .success
            .as_ref()
            .map(|hook| hook(&response, &committed))
            .unwrap_or(SuccessVerdict::Accept);
        match verdict {
            SuccessVerdict::Accept => {}
            SuccessVerdict::KeepOpen => {
                tracing::debug!("{} kept open by its success hook", self.id);
                self.state = FieldState::Open { error: None };
                return Completion::KeptOpen;
            }
            SuccessVerdict::Replace(value) => committed = value,
            SuccessVerdict::Reject(message) => {
                let failure = SubmitFailure::Application {
                    title: "Error".to_string(),
                    message: message.clone(),
                };
                self.state = FieldState::Open { error: None };
                self.show_failure(env, &message);
                return Completion::Failed(failure);
            }
        }
        self.commit(
            env,
            in_flight.old_value,
            committed,
            in_flight.wire_value,
            Some(raw),
        );
        env.notifier.notify(
            NoticeLevel::Success,
            response.title.as_deref().unwrap_or("Success"),
            response.message.as_deref().unwrap_or(DEFAULT_SAVE_MESSAGE),
        );
        Completion::Committed
    }

    /// Adopt `new_value`: emits `update`, then `hidden`, then `save`.
    fn commit(
        &mut self,
        env: &mut Env<'_>,
        old_value: FieldValue,
        new_value: FieldValue,
        wire_value: String,
        response: Option<serde_json::Value>,
    ) {
        self.value = new_value.clone();
        self.render_display(env.doc);
        self.emit(
            env,
            FieldEventKind::Update {
                value: new_value.clone(),
            },
        );
        self.close(env);
        self.emit(
            env,
            FieldEventKind::Save {
                old_value,
                new_value,
                wire_value,
                response,
            },
        );
    }

    /// Show `message` in the form, or through the notifier when no form is
    /// rendered.
    fn show_failure(&mut self, env: &mut Env<'_>, message: &str) {
        if let FieldState::Open { error } = &mut self.state {
            *error = Some(message.to_string());
        }
        match self.form.as_mut() {
            Some(form) if env.doc.is_alive(form.root()) => form.show_error(env.doc, message),
            _ => env.notifier.notify(NoticeLevel::Error, "Error", message),
        }
    }

    /// Replace the committed value without a save.
    pub(crate) fn set_value(&mut self, env: &mut Env<'_>, value: FieldValue) {
        self.value = self.input.canonicalize(&value);
        self.render_display(env.doc);
        if self.state.is_open() {
            self.input.to_control(env.doc, &self.value);
        }
    }

    /// Install loaded options and refresh both the control and the display.
    pub(crate) fn set_options(&mut self, env: &mut Env<'_>, options: Vec<SourceOption>) {
        self.pending_source = None;
        let current = self.value.clone();
        self.input.set_options(env.doc, options, &current);
        if let Some(container) = self.container.as_mut() {
            container.hide_loading(env.doc);
        }
        self.render_display(env.doc);
    }

    pub(crate) fn set_disabled(&mut self, env: &mut Env<'_>, disabled: bool) {
        if disabled {
            if self.state.is_open() {
                self.close(env);
            }
            env.doc.add_class(self.anchor, "editable-disabled");
        } else {
            env.doc.remove_class(self.anchor, "editable-disabled");
        }
        self.disabled = disabled;
        self.render_display(env.doc);
    }

    /// Run one scheduled task if it still belongs to the current session.
    pub(crate) fn run_task(&mut self, env: &mut Env<'_>, task: Task) -> bool {
        match task {
            Task::Activate { generation, .. } => {
                if generation == self.generation && self.state.is_open() {
                    self.input.activate(env.doc);
                }
                false
            }
            Task::BlurSubmit { generation, .. } => {
                let focus_inside = match (env.doc.focused(), self.container.as_ref()) {
                    (Some(focused), Some(container)) => container.contains(env.doc, focused),
                    _ => false,
                };
                generation == self.generation
                    && matches!(self.state, FieldState::Open { .. })
                    && !focus_inside
            }
        }
    }

    /// Permanently unbind the field.
    pub(crate) fn destroy(&mut self, env: &mut Env<'_>) {
        if self.destroyed {
            return;
        }
        self.teardown_session(env);
        if let Some(mut container) = self.container.take() {
            container.destroy(env.doc, env.listeners);
        }
        env.listeners.dispose_all(&mut self.anchor_disposers);
        env.listeners.dispose_owner(self.id);
        self.state = FieldState::Closed;
        self.destroyed = true;
        if env.doc.is_alive(self.anchor) {
            env.doc.set_hidden(self.anchor, false);
            for class in ["editable", "editable-click", "editable-empty", "editable-disabled"] {
                env.doc.remove_class(self.anchor, class);
            }
        }
        tracing::debug!("Destroyed {}", self.id);
    }
}
