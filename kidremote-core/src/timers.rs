use std::{collections::BTreeMap, time::Instant};

/// One pending deadline per concern.  Setting a slot replaces its previous
/// deadline, so a recurring callback can never be scheduled twice.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum TimerSlot {
    Hold,
    Toast,
    TimerFrame,
    FireworksBurst,
    FireworksEnd,
    PinClear,
    SpeechStatus,
}

#[derive(Default)]
pub struct Timers {
    deadlines: BTreeMap<TimerSlot, Instant>,
}

impl Timers {
    pub fn set(&mut self, slot: TimerSlot, deadline: Instant) {
        self.deadlines.insert(slot, deadline);
    }

    pub fn clear(&mut self, slot: TimerSlot) {
        self.deadlines.remove(&slot);
    }

    pub fn is_set(&self, slot: TimerSlot) -> bool {
        self.deadlines.contains_key(&slot)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Removes and returns every slot due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerSlot> {
        let mut due: Vec<(Instant, TimerSlot)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(slot, deadline)| (*deadline, *slot))
            .collect();
        due.sort();
        for (_, slot) in &due {
            self.deadlines.remove(slot);
        }
        due.into_iter().map(|(_, slot)| slot).collect()
    }
}
