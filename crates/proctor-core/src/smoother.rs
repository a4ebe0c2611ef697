//! Temporal smoother: converts noisy per-frame booleans into stable
//! signals via a rolling, sample-keyed (not wall-time-keyed) window and
//! a ratio threshold.

use std::collections::VecDeque;

/// One rolling window over a single boolean signal.
#[derive(Debug, Clone)]
pub struct BoolSmoother {
    window: VecDeque<bool>,
    capacity: usize,
    ratio: f64,
}

impl BoolSmoother {
    pub fn new(capacity: usize, ratio: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            ratio,
        }
    }

    /// Push a new per-frame sample, evicting the oldest when full.
    pub fn push(&mut self, sample: bool) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
    }

    /// The derived stable boolean: `true` iff the window is full and the
    /// count of `true` samples meets `ceil(ratio * capacity)`. An
    /// under-filled window is always `false`.
    pub fn stable(&self) -> bool {
        if self.window.len() < self.capacity {
            return false;
        }
        let threshold = (self.ratio * self.capacity as f64).ceil() as usize;
        let count = self.window.iter().filter(|&&v| v).count();
        count >= threshold
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Groups the three tracked booleans (`handsVisible`, `handsTyping`,
/// `screenTyping`) into one smoother, each with its own independent
/// window.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    pub hands_visible: BoolSmoother,
    pub hands_typing: BoolSmoother,
    pub screen_typing: BoolSmoother,
}

impl TemporalSmoother {
    pub fn new(window: usize, ratio: f64) -> Self {
        Self {
            hands_visible: BoolSmoother::new(window, ratio),
            hands_typing: BoolSmoother::new(window, ratio),
            screen_typing: BoolSmoother::new(window, ratio),
        }
    }
}
