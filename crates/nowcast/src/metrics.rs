//! Run metrics, reported through the `metrics` facade.
//!
//! Without an installed recorder these calls are no-ops; the `nowcaster`
//! binary installs a Prometheus recorder.

use metrics::{counter, gauge};

use crate::aggregator::RegionStatus;
use crate::parser::ParseReport;

pub fn record_station_failure(station: &str, kind: &'static str) {
    counter!(
        "nowcast_station_fetch_failures_total",
        "station" => station.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_undecodable_object(station: &str) {
    counter!("nowcast_undecodable_objects_total", "station" => station.to_string()).increment(1);
}

pub fn record_rows(station: &str, report: &ParseReport) {
    counter!("nowcast_rows_accepted_total", "station" => station.to_string())
        .increment(report.accepted as u64);
    counter!("nowcast_rows_rejected_total", "station" => station.to_string())
        .increment(report.dropped() as u64);
}

pub fn record_region(status: &RegionStatus) {
    let region = status.region().to_string();
    match status.max_dbdt() {
        Some(value) => gauge!("nowcast_region_max_dbdt", "region" => region.clone()).set(value),
        None => counter!("nowcast_region_no_data_total", "region" => region.clone()).increment(1),
    }
    gauge!("nowcast_region_level", "region" => region).set(status.level().map_or(-1.0, f64::from));
}

pub fn record_run(successful_stations: usize, total_stations: usize, duration_secs: f64) {
    gauge!("nowcast_stations_successful").set(successful_stations as f64);
    gauge!("nowcast_stations_total").set(total_stations as f64);
    gauge!("nowcast_run_duration_seconds").set(duration_secs);
}
