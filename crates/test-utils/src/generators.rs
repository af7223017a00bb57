//! Test data generators for creating synthetic magnetometer series.
//!
//! These generators create predictable, verifiable field traces so tests
//! can assert exact dB/dt values.

use std::io::Write;

use chrono::{DateTime, Duration, Utc};
use flate2::{write::GzEncoder, Compression};

/// One generated reading: timestamp and (x, y, z) in nT.
pub type Reading = (DateTime<Utc>, [f64; 3]);

/// Creates a flat field trace: every reading equals `base`.
///
/// # Example
///
/// ```
/// use test_utils::{reference_time, steady_series};
///
/// let series = steady_series(reference_time(), 3, 60, [100.0, 0.0, 0.0]);
/// assert_eq!(series.len(), 3);
/// assert_eq!(series[2].0 - series[0].0, chrono::Duration::seconds(120));
/// ```
pub fn steady_series(start: DateTime<Utc>, count: usize, step_secs: i64, base: [f64; 3]) -> Vec<Reading> {
    ramp_series(start, count, step_secs, base, [0.0; 3])
}

/// Creates a linear trace where each component drifts by `per_minute` nT/min.
///
/// The resulting dB/dt between any two consecutive readings is the
/// Euclidean norm of `per_minute`, whatever the step.
pub fn ramp_series(
    start: DateTime<Utc>,
    count: usize,
    step_secs: i64,
    base: [f64; 3],
    per_minute: [f64; 3],
) -> Vec<Reading> {
    (0..count)
        .map(|i| {
            let elapsed_min = (i as i64 * step_secs) as f64 / 60.0;
            let value = [
                base[0] + per_minute[0] * elapsed_min,
                base[1] + per_minute[1] * elapsed_min,
                base[2] + per_minute[2] * elapsed_min,
            ];
            (start + Duration::seconds(i as i64 * step_secs), value)
        })
        .collect()
}

/// Adds `delta` to every reading from `index` onwards, producing a single
/// step of `|delta|` between readings `index - 1` and `index`.
pub fn with_step(mut series: Vec<Reading>, index: usize, delta: [f64; 3]) -> Vec<Reading> {
    for (_, value) in series.iter_mut().skip(index) {
        value[0] += delta[0];
        value[1] += delta[1];
        value[2] += delta[2];
    }
    series
}

/// Renders readings as a CSV partition with a `timestamp,x,y,z` header.
pub fn to_csv(series: &[Reading]) -> String {
    let mut out = String::from("timestamp,x,y,z\n");
    for (t, [x, y, z]) in series {
        out.push_str(&format!("{},{},{},{}\n", t.to_rfc3339(), x, y, z));
    }
    out
}

/// Gzip-compresses a partition body.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .expect("writing to an in-memory gzip encoder cannot fail");
    encoder
        .finish()
        .expect("finishing an in-memory gzip encoder cannot fail")
}
