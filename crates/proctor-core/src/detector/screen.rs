//! Screen adapter: distinguishes keyboard-driven text entry from
//! scrolling, cursor blink, window switching, and mouse motion.

use crate::detector::ScreenOutput;
use crate::frame::Frame;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// The multi-level pixel-change statistics a screen-diff primitive
/// produces for one frame pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenChangeStats {
    pub low_ratio: f64,
    pub med_ratio: f64,
    pub high_ratio: f64,
    pub quadrant_pixels: [usize; 4],
    pub low_pixels: usize,
}

/// The vision primitive contract for the screen substream:
/// `detectScreenFrame(pixels, prevPixels) -> rawChangeStats`. May hold a
/// small buffer of previous frames internally; returns `None` on the
/// first frame of a session (no previous frame to diff against).
pub trait ScreenVision: Send {
    fn diff(&mut self, frame: &Frame) -> Option<ScreenChangeStats>;
}

/// Luminance-diff implementation of `ScreenVision`, restricted to a
/// centred sub-rectangle approximating the editor area, thresholded at
/// three levels.
pub struct DefaultScreenVision {
    prev_region: Option<(Vec<u8>, usize, usize)>,
    editor_fraction: (f64, f64, f64, f64), // top, bottom, left, right
    thresh_low: u8,
    thresh_med: u8,
    thresh_high: u8,
}

impl Default for DefaultScreenVision {
    fn default() -> Self {
        Self {
            prev_region: None,
            editor_fraction: (0.25, 0.80, 0.15, 0.85),
            thresh_low: 20,
            thresh_med: 35,
            thresh_high: 50,
        }
    }
}

impl DefaultScreenVision {
    fn editor_region(&self, frame: &Frame) -> (Vec<u8>, usize, usize) {
        let (ft, fb, fl, fr) = self.editor_fraction;
        let top = (frame.height as f64 * ft) as usize;
        let bottom = (frame.height as f64 * fb) as usize;
        let left = (frame.width as f64 * fl) as usize;
        let right = (frame.width as f64 * fr) as usize;

        let w = right.saturating_sub(left).max(1);
        let h = bottom.saturating_sub(top).max(1);
        let mut region = Vec::with_capacity(w * h);
        for y in top..top + h {
            for x in left..left + w {
                region.push(frame.luminance_at(x, y));
            }
        }
        (region, w, h)
    }
}

impl ScreenVision for DefaultScreenVision {
    fn diff(&mut self, frame: &Frame) -> Option<ScreenChangeStats> {
        let (region, w, h) = self.editor_region(frame);

        let Some((prev, pw, ph)) = self.prev_region.take() else {
            self.prev_region = Some((region, w, h));
            return None;
        };

        if pw != w || ph != h {
            // Frame geometry changed mid-session; restart the baseline.
            self.prev_region = Some((region, w, h));
            return None;
        }

        let total = w * h;
        let mut low_mask = vec![false; total];
        let mut low_pixels = 0usize;
        let mut med_pixels = 0usize;
        let mut high_pixels = 0usize;

        for i in 0..total {
            let d = (region[i] as i32 - prev[i] as i32).unsigned_abs() as u8;
            if d > self.thresh_low {
                low_mask[i] = true;
                low_pixels += 1;
            }
            if d > self.thresh_med {
                med_pixels += 1;
            }
            if d > self.thresh_high {
                high_pixels += 1;
            }
        }

        let mid_h = h / 2;
        let mid_w = w / 2;
        let mut quadrant_pixels = [0usize; 4];
        for y in 0..h {
            let row_half = if y < mid_h { 0 } else { 2 };
            for x in 0..w {
                if low_mask[y * w + x] {
                    let col_half = if x < mid_w { 0 } else { 1 };
                    quadrant_pixels[row_half + col_half] += 1;
                }
            }
        }

        self.prev_region = Some((region, w, h));

        Some(ScreenChangeStats {
            low_ratio: low_pixels as f64 / total as f64,
            med_ratio: med_pixels as f64 / total as f64,
            high_ratio: high_pixels as f64 / total as f64,
            quadrant_pixels,
            low_pixels,
        })
    }
}

struct ChangeSample {
    med: f64,
    at: Instant,
}

/// The screen adapter: applies the signature/exclusion/localisation/
/// rhythm tests and the consecutive-frame confirmation counter over a
/// `ScreenVision` primitive's raw change stats.
pub struct ScreenAdapter {
    vision: Box<dyn ScreenVision>,
    change_history: VecDeque<ChangeSample>,
    consecutive_activity: u32,
}

impl ScreenAdapter {
    pub fn new(vision: Box<dyn ScreenVision>) -> Self {
        Self {
            vision,
            change_history: VecDeque::new(),
            consecutive_activity: 0,
        }
    }

    pub fn process(&mut self, frame: &Frame) -> ScreenOutput {
        let Some(stats) = self.vision.diff(frame) else {
            self.consecutive_activity = 0;
            return ScreenOutput { screen_typing: false };
        };

        let signature_small_change =
            stats.low_ratio > 0.003 && stats.low_ratio < 0.04 && stats.med_ratio < 0.02;
        let signature_typing_flow =
            stats.med_ratio > 0.005 && stats.med_ratio < 0.06 && stats.high_ratio < 0.03;
        let signature = signature_small_change || signature_typing_flow;

        let too_large = stats.low_ratio > 0.12 || stats.med_ratio > 0.08;
        let too_small = stats.low_ratio < 0.002;

        let is_localized = if stats.low_pixels > 100 {
            let max_quad = *stats.quadrant_pixels.iter().max().unwrap();
            let min_quad = *stats.quadrant_pixels.iter().min().unwrap();
            if min_quad > 0 {
                max_quad > 3 * min_quad
            } else {
                true
            }
        } else {
            false
        };

        let now = Instant::now();
        self.change_history.push_back(ChangeSample { med: stats.med_ratio, at: now });
        while let Some(front) = self.change_history.front() {
            if now.duration_since(front.at) > Duration::from_secs(2) {
                self.change_history.pop_front();
            } else {
                break;
            }
        }

        let has_typing_rhythm = if self.change_history.len() >= 8 {
            let values: Vec<f64> = self.change_history.iter().map(|c| c.med).collect();
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let variance =
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            variance > 0.00002 && variance < 0.002 && mean > 0.003 && mean < 0.06
        } else {
            false
        };

        let is_typing = signature
            && !too_large
            && !too_small
            && is_localized
            && (has_typing_rhythm || self.consecutive_activity >= 2);

        if is_typing {
            self.consecutive_activity += 1;
        } else {
            self.consecutive_activity = self.consecutive_activity.saturating_sub(1);
        }

        let confirmed = is_typing && self.consecutive_activity >= 3;
        ScreenOutput { screen_typing: confirmed }
    }
}
