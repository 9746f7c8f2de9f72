// ============================================================
// Layer 5 - Loss Plateau Schedule
// ============================================================
// Drives the learning rate and the stopping decision from the
// validation-loss curve instead of a fixed epoch count.
//
// After each epoch (once the curve has at least two points):
//
//   lookback = floor(n * lookback_fraction) + 2
//   ratio    = val[n-1] / val[n-lookback]
//
//   ratio > decay_threshold  →  lr /= decay_factor
//
// With the default fraction of 0.2 the ratio compares the latest loss
// with the loss from roughly 20% of the run ago.
//
// Training continues while the curve is too short to judge, or while
// the loss is still falling faster than stop_threshold AND the learning
// rate is above its floor.

use serde::{Deserialize, Serialize};

/// Tunable constants of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateauConfig {
    /// Learning rate floor; training stops once lr drops to it
    pub min_lr:            f64,
    /// lr is divided by this on a plateau
    pub decay_factor:      f64,
    /// A ratio above this counts as a plateau
    pub decay_threshold:   f64,
    /// A ratio at or above this stops training
    pub stop_threshold:    f64,
    /// Share of the curve the lookback window spans
    pub lookback_fraction: f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self {
            min_lr:            1e-6,
            decay_factor:      1.5,
            decay_threshold:   0.996,
            stop_threshold:    0.998,
            lookback_fraction: 0.2,
        }
    }
}

/// Outcome of one end-of-epoch adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    /// latest loss / loss `lookback` points ago
    pub ratio:    f64,
    /// whether lr was divided this time
    pub reduced:  bool,
    /// lr after the adjustment
    pub lr:       f64,
    pub lookback: usize,
}

impl Adjustment {
    /// Relative loss reduction over the lookback window, in percent.
    pub fn improvement_pct(&self) -> f64 {
        (1.0 - self.ratio) * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct PlateauSchedule {
    config:   PlateauConfig,
    lr:       f64,
    lookback: usize,
}

impl PlateauSchedule {
    pub fn new(config: PlateauConfig, lr: f64) -> Self {
        Self { config, lr, lookback: 1 }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    fn ratio(val_curve: &[f64], lookback: usize) -> f64 {
        let n = val_curve.len();
        val_curve[n - 1] / val_curve[n - lookback]
    }

    /// Whether another epoch should run.
    pub fn should_continue(&self, val_curve: &[f64]) -> bool {
        if val_curve.len() < 2 {
            return true;
        }
        let lookback = self.lookback.clamp(1, val_curve.len());
        Self::ratio(val_curve, lookback) < self.config.stop_threshold && self.lr > self.config.min_lr
    }

    /// Recompute the lookback window and decay lr on a plateau.
    /// Returns `None` while the curve has fewer than two points.
    pub fn adjust(&mut self, val_curve: &[f64]) -> Option<Adjustment> {
        let n = val_curve.len();
        if n < 2 {
            return None;
        }

        self.lookback = ((n as f64 * self.config.lookback_fraction) as usize + 2).min(n);
        let ratio     = Self::ratio(val_curve, self.lookback);

        let reduced = ratio > self.config.decay_threshold;
        if reduced {
            self.lr /= self.config.decay_factor;
        }

        Some(Adjustment { ratio, reduced, lr: self.lr, lookback: self.lookback })
    }
}
