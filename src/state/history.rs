use core::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::event::BattleEvent;

/// Append-only event history shared between snapshots.
///
/// Every snapshot points at the newest entry of a persistent list, so
/// appending to a derived snapshot never copies or disturbs the history
/// of the snapshot it came from.
#[derive(Clone, Default)]
pub struct EventLog {
    head: Option<Arc<Entry>>,
    len: usize,
}

struct Entry {
    event: BattleEvent,
    prev: Option<Arc<Entry>>,
}

impl EventLog {
    pub fn push(&mut self, event: BattleEvent) {
        let prev = self.head.take();
        self.head = Some(Arc::new(Entry { event, prev }));
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last(&self) -> Option<&BattleEvent> {
        self.head.as_deref().map(|entry| &entry.event)
    }

    /// Events in the order they were applied.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &BattleEvent> + ExactSizeIterator {
        let mut events = Vec::with_capacity(self.len);
        let mut cursor = self.head.as_deref();
        while let Some(entry) = cursor {
            events.push(&entry.event);
            cursor = entry.prev.as_deref();
        }
        events.reverse();
        events.into_iter()
    }

    pub fn to_vec(&self) -> Vec<BattleEvent> {
        self.iter().cloned().collect()
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        // unlink iteratively so long histories do not recurse on drop
        let mut head = self.head.take();
        while let Some(entry) = head {
            match Arc::try_unwrap(entry) {
                Ok(mut entry) => head = entry.prev.take(),
                Err(..) => break,
            }
        }
    }
}

impl FromIterator<BattleEvent> for EventLog {
    fn from_iter<I: IntoIterator<Item = BattleEvent>>(iter: I) -> Self {
        let mut log = Self::default();
        for event in iter {
            log.push(event);
        }
        log
    }
}

impl PartialEq for EventLog {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for EventLog {}

impl Debug for EventLog {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl Serialize for EventLog {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for EventLog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<BattleEvent>::deserialize(deserializer).map(|events| events.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::EventLog;
    use crate::event::BattleEvent;

    #[test]
    fn derived_logs_share_history() {
        let mut base = EventLog::default();
        base.push(BattleEvent::TurnStart);

        let mut derived = base.clone();
        derived.push(BattleEvent::TurnEnd);

        assert_eq!(base.len(), 1);
        assert_eq!(derived.len(), 2);
        assert_eq!(derived.to_vec(), vec![BattleEvent::TurnStart, BattleEvent::TurnEnd]);
        assert_eq!(derived.last(), Some(&BattleEvent::TurnEnd));

        drop(base);
        assert_eq!(derived.iter().next(), Some(&BattleEvent::TurnStart));
    }

    #[test]
    fn long_logs_drop() {
        let log: EventLog = (0..200_000).map(|_| BattleEvent::TurnStart).collect();
        assert_eq!(log.len(), 200_000);
    }
}
