/// Where an inbound batch falls relative to the last one applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    Next,
    /// Already applied, or older.
    Duplicate,
    /// At least one batch went missing.
    Gap { expected: u64 },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTracker {
    last_applied: u64,
}

impl SequenceTracker {
    pub fn new(last_applied: u64) -> Self {
        Self { last_applied }
    }

    pub fn last_applied(&self) -> u64 {
        self.last_applied
    }

    pub fn check(&self, sequence: u64) -> Sequence {
        let expected = self.last_applied + 1;
        match sequence {
            sequence if sequence == expected => Sequence::Next,
            sequence if sequence < expected => Sequence::Duplicate,
            _ => Sequence::Gap { expected },
        }
    }

    pub fn applied(&mut self, sequence: u64) {
        self.last_applied = self.last_applied.max(sequence);
    }

    /// Restarts tracking from a wholesale state replacement.
    pub fn reset(&mut self, last_applied: u64) {
        self.last_applied = last_applied;
    }
}
