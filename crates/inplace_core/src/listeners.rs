//! Listener registry with explicit disposers.
//!
//! Every listener the engine installs is recorded here with the field that
//! owns it. Components keep the returned [`Disposer`]s and hand them back on
//! teardown, so listener counts stay bounded across open/close cycles.

use crate::document::NodeId;
use crate::models::FieldId;

/// Key chord a control listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyChord {
    /// Enter without modifiers.
    Enter,
    /// Enter with Ctrl or Meta held.
    ModifierEnter,
}

/// What a listener reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Pointer press anywhere in the document.
    OutsidePointer,
    /// Escape released anywhere in the document.
    EscapeKey,
    /// Enter pressed anywhere in the document.
    EnterKey,
    ControlKey { node: NodeId, chord: KeyChord },
    ControlChange { node: NodeId },
    ControlInput { node: NodeId },
    ControlBlur { node: NodeId },
    /// Click on `node` or anything inside it.
    Click { node: NodeId },
    /// Pointer entering `node` or anything inside it.
    PointerEnter { node: NodeId },
}

/// What a matched listener asks the owning field to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Submit,
    Cancel,
    /// Anchor activation under the click toggle policy.
    Toggle,
    /// Anchor activation under the hover toggle policy.
    Open,
    /// Resolved through the field's on-blur policy.
    OutsideInteraction,
    ScheduleBlurSubmit,
    MirrorRange { output: NodeId },
    SyncClear { clear: NodeId },
    ClearControl { control: NodeId, clear: NodeId },
    SanitizeMarkup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listener {
    pub owner: FieldId,
    pub trigger: Trigger,
    pub effect: Effect,
}

/// Handle that removes one registered listener.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a disposer leaks its listener"]
pub struct Disposer(u64);

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, owner: FieldId, trigger: Trigger, effect: Effect) -> Disposer {
        self.next_id += 1;
        self.entries.push((
            self.next_id,
            Listener {
                owner,
                trigger,
                effect,
            },
        ));
        Disposer(self.next_id)
    }

    /// Remove one listener. Disposing twice is a no-op.
    ///
    /// # Returns
    /// `true` when a listener was removed.
    pub fn dispose(&mut self, disposer: Disposer) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != disposer.0);
        before != self.entries.len()
    }

    pub fn dispose_all(&mut self, disposers: &mut Vec<Disposer>) {
        for disposer in disposers.drain(..) {
            self.dispose(disposer);
        }
    }

    /// Remove everything `owner` still has registered.
    pub fn dispose_owner(&mut self, owner: FieldId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, listener)| listener.owner != owner);
        before - self.entries.len()
    }

    /// Listeners whose trigger satisfies `matches`, in registration order.
    pub fn matching(&self, matches: impl Fn(&Trigger) -> bool) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(_, listener)| matches(&listener.trigger))
            .map(|(_, listener)| *listener)
            .collect()
    }

    pub fn count_for(&self, owner: FieldId) -> usize {
        self.entries
            .iter()
            .filter(|(_, listener)| listener.owner == owner)
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
