//! Host event routing.

use super::Page;
use crate::config::OnBlur;
use crate::constants::BLUR_SUBMIT_DEBOUNCE_TICKS;
use crate::document::NodeId;
use crate::field::FieldState;
use crate::input::render::{mirror_range, sync_clear};
use crate::listeners::{Effect, KeyChord, Listener, Trigger};
use crate::models::FieldId;
use crate::schedule::Task;

/// Keys the engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        !(self.ctrl || self.meta || self.shift || self.alt)
    }

    fn matches(&self, chord: KeyChord) -> bool {
        match chord {
            KeyChord::Enter => self.is_empty(),
            KeyChord::ModifierEnter => self.ctrl || self.meta,
        }
    }
}

/// Input delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    PointerDown { target: NodeId },
    PointerEnter { target: NodeId },
    Click { target: NodeId },
    KeyDown { key: Key, modifiers: Modifiers, target: NodeId },
    KeyUp { key: Key, modifiers: Modifiers, target: NodeId },
    /// The control's value changed; rich regions report markup.
    Input { target: NodeId, value: String },
    /// A checkbox was toggled.
    Check { target: NodeId, checked: bool },
    Change { target: NodeId },
    Focus { target: NodeId },
    Blur { target: NodeId },
}

impl Page {
    /// Route one host event to the listeners it triggers.
    ///
    /// Matched listeners become `(field, effect)` actions, de-duplicated per
    /// field and applied in registration order.
    pub fn dispatch(&mut self, event: UiEvent) {
        let actions = self.resolve(&event);
        let mut seen: Vec<(FieldId, Effect)> = Vec::with_capacity(actions.len());
        for action in actions {
            if !seen.contains(&action) {
                seen.push(action);
            }
        }
        for (field, effect) in seen {
            self.apply(field, effect);
        }
    }

    fn resolve(&mut self, event: &UiEvent) -> Vec<(FieldId, Effect)> {
        let doc = &self.document;
        let pick = |listeners: Vec<Listener>| -> Vec<(FieldId, Effect)> {
            listeners
                .into_iter()
                .map(|listener| (listener.owner, listener.effect))
                .collect()
        };
        match event {
            UiEvent::PointerDown { target } => {
                let target = *target;
                let candidates = self
                    .listeners
                    .matching(|trigger| matches!(trigger, Trigger::OutsidePointer));
                candidates
                    .into_iter()
                    .filter(|listener| {
                        self.fields.get(&listener.owner).is_some_and(|field| {
                            let inside_container = field.container().is_some_and(|container| {
                                !container.is_visible(doc) || container.contains(doc, target)
                            });
                            let on_anchor =
                                doc.is_alive(field.anchor()) && doc.contains(field.anchor(), target);
                            !inside_container && !on_anchor
                        })
                    })
                    .map(|listener| (listener.owner, listener.effect))
                    .collect()
            }
            UiEvent::PointerEnter { target } => pick(self.listeners.matching(|trigger| {
                matches!(trigger, Trigger::PointerEnter { node } if doc.contains(*node, *target))
            })),
            UiEvent::Click { target } => pick(self.listeners.matching(|trigger| {
                matches!(trigger, Trigger::Click { node } if doc.contains(*node, *target))
            })),
            UiEvent::KeyDown {
                key: Key::Enter,
                modifiers,
                target,
            } => {
                let target = *target;
                let mut actions = pick(self.listeners.matching(|trigger| {
                    matches!(trigger, Trigger::ControlKey { node, chord }
                        if doc.contains(*node, target) && modifiers.matches(*chord))
                }));
                if modifiers.is_empty() {
                    let enter = self
                        .listeners
                        .matching(|trigger| matches!(trigger, Trigger::EnterKey));
                    actions.extend(
                        enter
                            .into_iter()
                            .filter(|listener| {
                                self.fields.get(&listener.owner).is_some_and(|field| {
                                    field.config().enable_enter
                                        && field.form().is_some_and(|form| form.contains(doc, target))
                                        && !field.input().is_multiline_target(doc, target)
                                })
                            })
                            .map(|listener| (listener.owner, listener.effect)),
                    );
                }
                actions
            }
            UiEvent::KeyUp {
                key: Key::Escape, ..
            } => {
                let escape = self
                    .listeners
                    .matching(|trigger| matches!(trigger, Trigger::EscapeKey));
                escape
                    .into_iter()
                    .filter(|listener| {
                        self.fields
                            .get(&listener.owner)
                            .is_some_and(|field| field.config().enable_escape)
                    })
                    .map(|listener| (listener.owner, listener.effect))
                    .collect()
            }
            UiEvent::KeyDown { .. } | UiEvent::KeyUp { .. } => Vec::new(),
            UiEvent::Input { target, value } => {
                let target = *target;
                let listeners = self.listeners.matching(
                    |trigger| matches!(trigger, Trigger::ControlInput { node } if *node == target),
                );
                let sanitizer = listeners
                    .iter()
                    .find(|listener| listener.effect == Effect::SanitizeMarkup)
                    .and_then(|listener| self.fields.get(&listener.owner))
                    .map(|field| field.input().sanitizer().clone());
                match sanitizer {
                    Some(sanitizer) => {
                        let clean = sanitizer.sanitize(value);
                        self.document.set_markup(target, clean);
                    }
                    None => self.document.set_value(target, value.as_str()),
                }
                listeners
                    .into_iter()
                    .filter(|listener| listener.effect != Effect::SanitizeMarkup)
                    .map(|listener| (listener.owner, listener.effect))
                    .collect()
            }
            UiEvent::Check { target, checked } => {
                self.document.set_checked(*target, *checked);
                Vec::new()
            }
            UiEvent::Change { target } => pick(self.listeners.matching(|trigger| {
                matches!(trigger, Trigger::ControlChange { node } if doc.contains(*node, *target))
            })),
            UiEvent::Focus { target } => {
                self.document.focus(*target);
                Vec::new()
            }
            UiEvent::Blur { target } => {
                let target = *target;
                if self.document.focused() == Some(target) {
                    self.document.blur();
                }
                pick(self.listeners.matching(
                    |trigger| matches!(trigger, Trigger::ControlBlur { node } if *node == target),
                ))
            }
        }
    }

    fn apply(&mut self, id: FieldId, effect: Effect) {
        let Some(field) = self.fields.get(&id) else {
            return;
        };
        let state = field.state().clone();
        let result = match effect {
            Effect::Submit => match state {
                FieldState::Open { .. } => self.submit(id).map(|_| ()),
                _ => Ok(()),
            },
            Effect::Cancel => match state {
                FieldState::Open { .. } => self.cancel(id),
                _ => Ok(()),
            },
            Effect::OutsideInteraction => match (state, field.on_blur()) {
                (FieldState::Open { .. }, OnBlur::Cancel) => self.cancel(id),
                (FieldState::Open { .. }, OnBlur::Submit) => self.submit(id).map(|_| ()),
                (FieldState::Submitting, _) => {
                    tracing::debug!("Dropping outside interaction for {} while submitting", id);
                    Ok(())
                }
                _ => Ok(()),
            },
            Effect::ScheduleBlurSubmit => {
                if matches!(state, FieldState::Open { .. }) {
                    let generation = field.generation();
                    self.scheduler.schedule(
                        BLUR_SUBMIT_DEBOUNCE_TICKS,
                        Task::BlurSubmit {
                            field: id,
                            generation,
                        },
                    );
                }
                Ok(())
            }
            Effect::Toggle => {
                if field.is_disabled() {
                    Ok(())
                } else {
                    self.toggle(id)
                }
            }
            Effect::Open => {
                if field.is_disabled() || state.is_open() {
                    Ok(())
                } else {
                    self.open(id)
                }
            }
            Effect::MirrorRange { output } => {
                if let Some(control) = field.input().handles().map(|handles| handles.control) {
                    mirror_range(&mut self.document, control, output);
                }
                Ok(())
            }
            Effect::SyncClear { clear } => {
                if let Some(control) = field.input().handles().map(|handles| handles.control) {
                    sync_clear(&mut self.document, control, clear);
                }
                Ok(())
            }
            Effect::ClearControl { control, clear } => {
                self.document.set_value(control, "");
                self.document.set_hidden(clear, true);
                self.document.focus(control);
                Ok(())
            }
            Effect::SanitizeMarkup => Ok(()),
        };
        if let Err(err) = result {
            tracing::debug!("{} did not apply {:?}: {}", id, effect, err);
        }
    }
}
