//! dB/dt computation over a station's trailing window.
//!
//! For consecutive samples the rate of change is
//!
//! ```text
//! dbdt(i) = |B(i) - B(i-1)| / (t(i) - t(i-1))      [nT/min]
//! ```
//!
//! where `|.|` is the Euclidean norm of the component difference. A station's
//! result is the maximum over all valid pairs. Pairs further apart than the
//! gap tolerance are a data gap, not a spike, and are skipped.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::sample::Sample;

/// Why a station has no usable dB/dt this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "message", rename_all = "snake_case")]
pub enum Unavailable {
    /// Network, timeout or service error talking to the source
    SourceUnavailable(String),
    /// No partition exists for the window
    NotFound,
    /// Fewer than two samples, or every pair exceeded the gap tolerance
    InsufficientData,
}

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unavailable::SourceUnavailable(message) => write!(f, "source unavailable: {}", message),
            Unavailable::NotFound => write!(f, "no data found"),
            Unavailable::InsufficientData => write!(f, "insufficient data"),
        }
    }
}

/// Peak rate of change found in a station's window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationPeak {
    /// Maximum dB/dt in nT/min
    pub max_dbdt: f64,
    /// Timestamp of the later sample of the peak pair
    pub peak_time: DateTime<Utc>,
    pub pairs_used: usize,
    pub gaps_skipped: usize,
    pub samples: usize,
}

/// Per-station derivative outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum DerivativeResult {
    Available(StationPeak),
    Unavailable(Unavailable),
}

impl DerivativeResult {
    /// The usable dB/dt value, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            DerivativeResult::Available(peak) => Some(peak.max_dbdt),
            DerivativeResult::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, DerivativeResult::Available(_))
    }
}

/// Rate of change between two samples in nT/min, or `None` when the second
/// sample is not strictly later.
pub fn pair_dbdt(prev: &Sample, next: &Sample) -> Option<f64> {
    let dt_ms = (next.timestamp - prev.timestamp).num_milliseconds();
    if dt_ms <= 0 {
        return None;
    }
    let dt_min = dt_ms as f64 / 60_000.0;
    Some(next.distance(prev) / dt_min)
}

/// Computes station peaks with a fixed gap tolerance.
#[derive(Debug, Clone, Copy)]
pub struct DerivativeEngine {
    gap_tolerance: Duration,
}

impl DerivativeEngine {
    pub fn new(gap_tolerance: Duration) -> Self {
        Self { gap_tolerance }
    }

    pub fn gap_tolerance(&self) -> Duration {
        self.gap_tolerance
    }

    /// Peak dB/dt over `samples`.
    ///
    /// Samples are expected in timestamp order; unsorted input is sorted
    /// into a copy first, so sorting beforehand never changes the result.
    pub fn compute(&self, samples: &[Sample]) -> DerivativeResult {
        if samples.len() < 2 {
            return DerivativeResult::Unavailable(Unavailable::InsufficientData);
        }

        let sorted;
        let samples = if samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp) {
            samples
        } else {
            let mut copy = samples.to_vec();
            copy.sort_by_key(|s| s.timestamp);
            sorted = copy;
            &sorted[..]
        };

        let mut peak: Option<(f64, DateTime<Utc>)> = None;
        let mut pairs_used = 0;
        let mut gaps_skipped = 0;

        for pair in samples.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.timestamp - prev.timestamp > self.gap_tolerance {
                gaps_skipped += 1;
                continue;
            }
            let Some(rate) = pair_dbdt(prev, next) else {
                continue;
            };
            pairs_used += 1;
            if peak.map_or(true, |(max, _)| rate > max) {
                peak = Some((rate, next.timestamp));
            }
        }

        match peak {
            Some((max_dbdt, peak_time)) => DerivativeResult::Available(StationPeak {
                max_dbdt,
                peak_time,
                pairs_used,
                gaps_skipped,
                samples: samples.len(),
            }),
            None => DerivativeResult::Unavailable(Unavailable::InsufficientData),
        }
    }
}

impl Default for DerivativeEngine {
    fn default() -> Self {
        Self::new(Duration::seconds(180))
    }
}
