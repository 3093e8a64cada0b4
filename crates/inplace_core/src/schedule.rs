//! Tick-based scheduler for deferred field work.

use crate::models::FieldId;

/// Deferred work, tagged with the session generation it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Focus the control once it is in the document.
    Activate { field: FieldId, generation: u64 },
    /// Submit after the blur debounce unless focus came back.
    BlurSubmit { field: FieldId, generation: u64 },
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: u64,
    queue: Vec<(u64, Task)>,
}

impl Scheduler {
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Queue `task` to run `delay` ticks from now; a zero delay still waits
    /// for the next tick.
    pub fn schedule(&mut self, delay: u64, task: Task) {
        let due = self.now + delay.max(1);
        self.queue.push((due, task));
    }

    /// Drop queued work for `field`.
    pub fn cancel_field(&mut self, field: FieldId) {
        self.queue.retain(|(_, task)| match task {
            Task::Activate { field: f, .. } | Task::BlurSubmit { field: f, .. } => *f != field,
        });
    }

    /// Advance one tick and hand back everything now due, in queue order.
    pub fn advance(&mut self) -> Vec<Task> {
        self.now += 1;
        let now = self.now;
        let mut due = Vec::new();
        self.queue.retain(|(at, task)| {
            if *at <= now {
                due.push(*task);
                false
            } else {
                true
            }
        });
        due
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
