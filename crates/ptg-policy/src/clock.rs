//! Inter-arrival bookkeeping for the edge that feeds the policy service.
//!
//! The service consumes deltas, not timestamps. An [`ArrivalClock`] sits in
//! front of it, remembers when each sender was last seen and turns receive
//! timestamps into deltas.

use std::collections::HashMap;

/// One observed arrival.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arrival {
    /// Seconds since the sender's previous message (0.0 on first sighting).
    pub delta: f64,
    /// 1-based sequence number of this message for the sender.
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy)]
struct LastSeen {
    at: f64,
    count: u64,
}

/// Per-sender last-arrival table.
#[derive(Debug, Default)]
pub struct ArrivalClock {
    senders: HashMap<String, LastSeen>,
}

impl ArrivalClock {
    /// Create an empty clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message from `identifier` received at `received_at` seconds.
    ///
    /// The first message from a sender yields a delta of `0.0`, which the
    /// regularity test treats as a failed sample. Timestamps that go backwards
    /// also yield `0.0` and do not move the sender's clock back.
    pub fn observe(&mut self, identifier: &str, received_at: f64) -> Arrival {
        if let Some(last) = self.senders.get_mut(identifier) {
            let delta = (received_at - last.at).max(0.0);
            last.at = last.at.max(received_at);
            last.count += 1;
            Arrival {
                delta,
                sequence: last.count,
            }
        } else {
            self.senders.insert(
                identifier.to_string(),
                LastSeen {
                    at: received_at,
                    count: 1,
                },
            );
            Arrival {
                delta: 0.0,
                sequence: 1,
            }
        }
    }

    /// Messages seen from `identifier`.
    #[must_use]
    pub fn message_count(&self, identifier: &str) -> u64 {
        self.senders.get(identifier).map_or(0, |last| last.count)
    }

    /// Number of distinct senders.
    #[must_use]
    pub fn senders(&self) -> usize {
        self.senders.len()
    }

    /// Forget every sender.
    pub fn clear(&mut self) {
        self.senders.clear();
    }
}
