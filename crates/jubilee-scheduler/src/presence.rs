//! Round-robin presence rotation.

use jubilee_core::Presence;

/// Fixed ordered status set cycled by the presence job. The index lives
/// here, owned by the scheduler — no counter hanging off the task.
#[derive(Debug, Clone)]
pub struct PresenceCycle {
    states: Vec<Presence>,
    index: usize,
}

impl PresenceCycle {
    /// The bot's standard rotation: available, idle, busy.
    pub fn standard() -> Self {
        Self::new(vec![Presence::Online, Presence::Idle, Presence::Dnd])
    }

    /// `states` must be non-empty.
    pub fn new(states: Vec<Presence>) -> Self {
        debug_assert!(!states.is_empty());
        Self { states, index: 0 }
    }

    /// Status for the current tick; advances the cursor, wrapping modulo
    /// the set size.
    pub fn advance(&mut self) -> Presence {
        let status = self.states[self.index % self.states.len()];
        self.index = (self.index + 1) % self.states.len();
        status
    }

    /// Status the cycle would show on tick `k`, counting from zero.
    pub fn state_at(&self, k: usize) -> Presence {
        self.states[k % self.states.len()]
    }
}

impl Default for PresenceCycle {
    fn default() -> Self {
        Self::standard()
    }
}
