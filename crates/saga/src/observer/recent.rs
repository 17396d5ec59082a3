use std::collections::{HashSet, VecDeque};

use ledger::StateRef;

/// Bounded set of recently dispatched state versions, oldest evicted first.
pub(crate) struct RecentSet {
    seen: HashSet<StateRef>,
    order: VecDeque<StateRef>,
    capacity: usize,
}

impl RecentSet {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Records `state_ref`. Returns false if it was already present.
    pub(crate) fn insert(&mut self, state_ref: StateRef) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if !self.seen.insert(state_ref) {
            return false;
        }
        self.order.push_back(state_ref);
        if self.order.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        true
    }
}
