//! Session state: per-examinee rolling history, cooldown table, and
//! append-only violation log.

use crate::fusion::{Violation, ViolationKind};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use uuid::Uuid;

/// A per-frame record written into the session's rolling history.
/// Ordered by `seq`; never mutated once appended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionSample {
    pub seq: u64,
    pub t: Instant,
    pub hands_visible: bool,
    pub hands_typing: bool,
    pub screen_typing: bool,
    pub hand_count: usize,
    pub typing_confidence: f64,
}

/// Stable per-examinee identity.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub student_id: String,
    pub exam_id: String,
    pub session_id: Uuid,
}

/// Per-session counters, rolling history, cooldown table, and violation
/// log. Owned exclusively by one logical actor at a time — in this
/// crate, the Tokio task the session manager spawns per connection.
#[derive(Debug)]
pub struct Session {
    pub identity: SessionIdentity,
    pub history: VecDeque<DetectionSample>,
    history_capacity: usize,
    next_seq: u64,
    cooldowns: HashMap<ViolationKind, Instant>,
    pub violation_log: Vec<Violation>,

    pub frames_camera: u64,
    pub frames_screen: u64,

    pub start_time: Instant,
    pub last_inbound: Instant,
    pub last_fusion_eval: Option<Instant>,
}

impl Session {
    pub fn new(identity: SessionIdentity, history_capacity: usize) -> Self {
        let now = Instant::now();
        Self {
            identity,
            history: VecDeque::with_capacity(history_capacity),
            history_capacity,
            next_seq: 0,
            cooldowns: HashMap::new(),
            violation_log: Vec::new(),
            frames_camera: 0,
            frames_screen: 0,
            start_time: now,
            last_inbound: now,
            last_fusion_eval: None,
        }
    }

    /// Append a new sample, evicting the oldest when at capacity.
    /// Assigns and returns the new sample's sequence number.
    pub fn append(
        &mut self,
        hands_visible: bool,
        hands_typing: bool,
        screen_typing: bool,
        hand_count: usize,
        typing_confidence: f64,
    ) -> u64 {
        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.history.push_back(DetectionSample {
            seq,
            t: Instant::now(),
            hands_visible,
            hands_typing,
            screen_typing,
            hand_count,
            typing_confidence,
        });
        seq
    }

    /// A view of the last `n` samples (n <= history capacity), oldest
    /// first. Returns fewer than `n` if the history is under-filled.
    pub fn recent(&self, n: usize) -> Vec<DetectionSample> {
        let len = self.history.len();
        let skip = len.saturating_sub(n);
        self.history.iter().skip(skip).copied().collect()
    }

    pub fn cooldown_elapsed(&self, kind: ViolationKind, now: Instant, delta: std::time::Duration) -> bool {
        match self.cooldowns.get(&kind) {
            Some(&last) => now.duration_since(last) >= delta,
            None => true,
        }
    }

    /// Update the cooldown table for `kind` and append `violation` to
    /// the log.
    pub fn note_emit(&mut self, kind: ViolationKind, now: Instant, violation: Violation) {
        self.cooldowns.insert(kind, now);
        self.violation_log.push(violation);
    }

    pub fn violation_count(&self, kind: ViolationKind) -> usize {
        self.violation_log.iter().filter(|v| v.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session(capacity: usize) -> Session {
        Session::new(
            SessionIdentity {
                student_id: "s1".into(),
                exam_id: "e1".into(),
                session_id: Uuid::new_v4(),
            },
            capacity,
        )
    }

    #[test]
    fn test_history_capped_at_h() {
        let mut session = sample_session(40);
        for _ in 0..100 {
            session.append(true, true, true, 1, 0.5);
        }
        assert!(session.history.len() <= 40);
    }

    #[test]
    fn test_sequence_numbers_strictly_increasing() {
        let mut session = sample_session(5);
        for _ in 0..20 {
            session.append(true, false, false, 0, 0.0);
        }
        let seqs: Vec<u64> = session.history.iter().map(|s| s.seq).collect();
        for w in seqs.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn test_recent_under_fill() {
        let mut session = sample_session(40);
        session.append(true, true, true, 1, 0.9);
        session.append(true, true, true, 1, 0.9);
        let recent = session.recent(20);
        assert_eq!(recent.len(), 2);
    }
}
