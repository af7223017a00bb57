//! Status snapshot assembly and output.
//!
//! The snapshot is the single document handed to the presentation layer.
//! Every configured region appears in it on every run, including regions
//! with no data, so consumers can always render a known state.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, instrument};
use uuid::Uuid;

use geomag_common::{BaseThresholds, StationRegistry, TimeWindow};

use crate::aggregator::{round2, RegionStatus, RegionalAggregator};
use crate::derivative::DerivativeResult;
use crate::error::{NowcastError, Result};
use crate::metrics;
use crate::pipeline::{StationPipeline, StationReport};

/// Where the values in a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// At least one station produced a value
    Geonet,
    /// Every station was unavailable
    Unavailable,
}

/// Per-station detail for debugging the classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSummary {
    pub name: String,
    /// "ok" or "unavailable"
    pub status: String,
    pub dbdt: Option<f64>,
    pub peak_time: Option<DateTime<Utc>>,
    pub data_points: usize,
    pub gaps_skipped: usize,
    pub rejected_rows: usize,
    pub error: Option<String>,
}

impl From<&StationReport> for StationSummary {
    fn from(report: &StationReport) -> Self {
        let rejected_rows = report.parse.dropped();
        match &report.result {
            DerivativeResult::Available(peak) => Self {
                name: report.name.clone(),
                status: "ok".to_string(),
                dbdt: Some(round2(peak.max_dbdt)),
                peak_time: Some(peak.peak_time),
                data_points: peak.samples,
                gaps_skipped: peak.gaps_skipped,
                rejected_rows,
                error: None,
            },
            DerivativeResult::Unavailable(reason) => Self {
                name: report.name.clone(),
                status: "unavailable".to_string(),
                dbdt: None,
                peak_time: None,
                data_points: report.parse.accepted,
                gaps_skipped: 0,
                rejected_rows,
                error: Some(reason.to_string()),
            },
        }
    }
}

/// Timing information about the run that produced a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationInfo {
    pub generated_at_ms: i64,
    pub process_duration_seconds: f64,
}

/// The output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub last_updated: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
    pub run_id: Uuid,
    pub regions: BTreeMap<String, RegionStatus>,
    pub stations: BTreeMap<String, StationSummary>,
    pub thresholds: BaseThresholds,
    pub successful_stations: usize,
    pub total_stations: usize,
    pub data_source: DataSource,
    pub generation_info: GenerationInfo,
}

impl StatusSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| NowcastError::Common(e.into()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| NowcastError::Common(e.into()))
    }

    /// One line per region: `<region>: <status> (dB/dt: <value> nT/min)`.
    ///
    /// The value is the published two-decimal peak, so the line always
    /// matches the level next to it.
    pub fn summary_lines(&self) -> Vec<String> {
        self.regions
            .iter()
            .map(|(name, status)| match status.max_dbdt() {
                Some(value) => format!(
                    "{}: {} (dB/dt: {:.2} nT/min)",
                    name,
                    status.state().label(),
                    value
                ),
                None => format!("{}: {} (no contributing stations)", name, status.state().label()),
            })
            .collect()
    }
}

/// Settings the builder needs beyond the registry.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotSettings {
    pub window: Duration,
    pub update_interval: Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            window: Duration::minutes(15),
            update_interval: Duration::minutes(15),
            max_concurrent_fetches: 4,
        }
    }
}

/// Builds a snapshot for every configured region.
pub struct SnapshotBuilder<'a> {
    registry: &'a StationRegistry,
    pipeline: &'a StationPipeline,
    settings: SnapshotSettings,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(registry: &'a StationRegistry, pipeline: &'a StationPipeline, settings: SnapshotSettings) -> Self {
        Self {
            registry,
            pipeline,
            settings,
        }
    }

    /// Run the whole pipeline with `now` as the end of the trailing window.
    ///
    /// Stations shared between regions are processed once. Station fetches
    /// run concurrently; aggregation happens after all of them finished.
    #[instrument(skip(self), fields(regions = self.registry.regions.len()))]
    pub async fn build(&self, now: DateTime<Utc>) -> StatusSnapshot {
        let started = Instant::now();
        let window = TimeWindow::trailing(now, self.settings.window);
        let stations = self.registry.contributing_stations();

        info!(
            stations = stations.len(),
            window_start = %window.start,
            window_end = %window.end,
            "Starting nowcast run"
        );

        let reports: HashMap<String, StationReport> = stream::iter(stations)
            .map(|station| {
                let pipeline = self.pipeline;
                async move { pipeline.run(station, &window).await }
            })
            .buffer_unordered(self.settings.max_concurrent_fetches.max(1))
            .map(|report| (report.station_id.clone(), report))
            .collect()
            .await;

        let aggregator = RegionalAggregator::new(self.registry);
        let regions: BTreeMap<String, RegionStatus> = self
            .registry
            .regions
            .iter()
            .map(|region| (region.id.clone(), aggregator.aggregate(region, &reports)))
            .collect();

        self.assemble(now, regions, &reports, started)
    }

    fn assemble(
        &self,
        now: DateTime<Utc>,
        regions: BTreeMap<String, RegionStatus>,
        reports: &HashMap<String, StationReport>,
        started: Instant,
    ) -> StatusSnapshot {
        let stations: BTreeMap<String, StationSummary> = reports
            .iter()
            .map(|(id, report)| (id.clone(), StationSummary::from(report)))
            .collect();
        let successful_stations = reports.values().filter(|r| r.result.is_available()).count();
        let total_stations = reports.len();
        let duration = started.elapsed().as_secs_f64();

        metrics::record_run(successful_stations, total_stations, duration);
        info!(
            successful = successful_stations,
            total = total_stations,
            duration_secs = duration,
            "Nowcast run complete"
        );

        StatusSnapshot {
            last_updated: now,
            next_update: now + self.settings.update_interval,
            run_id: Uuid::new_v4(),
            regions,
            stations,
            thresholds: self.registry.thresholds,
            successful_stations,
            total_stations,
            data_source: if successful_stations > 0 {
                DataSource::Geonet
            } else {
                DataSource::Unavailable
            },
            generation_info: GenerationInfo {
                generated_at_ms: now.timestamp_millis(),
                process_duration_seconds: (duration * 1000.0).round() / 1000.0,
            },
        }
    }
}

/// Write the snapshot to `path` atomically.
///
/// The document is written to a temp file in the same directory and renamed
/// over `path`, so readers see either the previous document or the new one.
pub fn write_snapshot(snapshot: &StatusSnapshot, path: &Path) -> Result<()> {
    let failure = |message: String| NowcastError::OutputWriteFailure {
        path: path.to_path_buf(),
        message,
    };

    let json = snapshot.to_json()?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| failure(format!("create {}: {}", dir.display(), e)))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| failure(e.to_string()))?;
    tmp.write_all(json.as_bytes()).map_err(|e| failure(e.to_string()))?;
    tmp.write_all(b"\n").map_err(|e| failure(e.to_string()))?;
    tmp.as_file().sync_all().map_err(|e| failure(e.to_string()))?;
    tmp.persist(path).map_err(|e| failure(e.error.to_string()))?;

    info!(path = %path.display(), bytes = json.len(), "Status document written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use test_utils::{reference_time, single_region_registry, two_region_registry};

    use crate::derivative::DerivativeEngine;
    use crate::fetcher::SampleFetcher;
    use crate::sample::RawRecord;

    /// Every station gets the same two rows 60 s apart, `delta` nT apart.
    struct PairFetcher {
        delta: f64,
        fail: Vec<&'static str>,
    }

    #[async_trait]
    impl SampleFetcher for PairFetcher {
        async fn fetch(&self, station: &str, window: &TimeWindow) -> Result<Vec<RawRecord>> {
            if self.fail.iter().any(|f| *f == station) {
                return Err(NowcastError::SourceUnavailable {
                    station: station.to_string(),
                    message: "connection refused".to_string(),
                });
            }
            let t1 = window.end - Duration::seconds(60);
            Ok(vec![
                RawRecord::new("mem", 2, &t1.to_rfc3339(), ["0", "0", "0"]),
                RawRecord::new("mem", 3, &window.end.to_rfc3339(), [&self.delta.to_string(), "0", "0"]),
            ])
        }
    }

    fn pipeline(fetcher: PairFetcher) -> StationPipeline {
        StationPipeline::new(
            Arc::new(fetcher),
            DerivativeEngine::default(),
            std::time::Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_timestamps() {
        let registry = single_region_registry(1.0, &["EY2M"]);
        let pipeline = pipeline(PairFetcher { delta: 5.0, fail: vec![] });
        let snapshot = SnapshotBuilder::new(&registry, &pipeline, SnapshotSettings::default())
            .build(reference_time())
            .await;

        assert_eq!(snapshot.last_updated, reference_time());
        assert_eq!(snapshot.next_update, reference_time() + Duration::minutes(15));
        assert_eq!(snapshot.generation_info.generated_at_ms, reference_time().timestamp_millis());
    }

    #[tokio::test]
    async fn test_failed_region_still_present() {
        let registry = two_region_registry();
        let pipeline = pipeline(PairFetcher {
            delta: 45.0,
            fail: vec!["NTH1"],
        });
        let snapshot = SnapshotBuilder::new(&registry, &pipeline, SnapshotSettings::default())
            .build(reference_time())
            .await;

        assert_eq!(snapshot.regions.len(), 2);
        let north = &snapshot.regions["North"];
        assert_eq!(north.level(), None);
        assert!(north.contributing_stations().is_empty());

        let south = &snapshot.regions["South"];
        assert_eq!(south.level(), Some(1));
        assert_eq!(south.contributing_stations().len(), 2);

        assert_eq!(snapshot.successful_stations, 2);
        assert_eq!(snapshot.total_stations, 3);
        assert_eq!(snapshot.data_source, DataSource::Geonet);
        assert_eq!(snapshot.stations["NTH1"].status, "unavailable");
        assert!(snapshot.stations["NTH1"].error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_all_down_is_unavailable_source() {
        let registry = two_region_registry();
        let pipeline = pipeline(PairFetcher {
            delta: 1.0,
            fail: vec!["NTH1", "STH1", "STH2"],
        });
        let snapshot = SnapshotBuilder::new(&registry, &pipeline, SnapshotSettings::default())
            .build(reference_time())
            .await;

        assert_eq!(snapshot.data_source, DataSource::Unavailable);
        assert!(snapshot.regions.values().all(|r| r.level().is_none()));
    }

    #[tokio::test]
    async fn test_write_creates_directory() {
        let registry = single_region_registry(1.0, &["EY2M"]);
        let pipeline = pipeline(PairFetcher { delta: 5.0, fail: vec![] });
        let snapshot = SnapshotBuilder::new(&registry, &pipeline, SnapshotSettings::default())
            .build(reference_time())
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs").join("status.json");
        write_snapshot(&snapshot, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(StatusSnapshot::from_json(&written).unwrap().run_id, snapshot.run_id);
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_no_partial_file() {
        let registry = single_region_registry(1.0, &["EY2M"]);
        let pipeline = pipeline(PairFetcher { delta: 5.0, fail: vec![] });
        let snapshot = SnapshotBuilder::new(&registry, &pipeline, SnapshotSettings::default())
            .build(reference_time())
            .await;

        // A non-empty directory in the target's place makes the rename fail.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "previous").unwrap();

        let err = write_snapshot(&snapshot, &path).unwrap_err();
        assert!(matches!(err, NowcastError::OutputWriteFailure { .. }));

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(std::fs::read_to_string(path.join("keep")).unwrap(), "previous");
    }

    #[tokio::test]
    async fn test_summary_lines() {
        let registry = two_region_registry();
        let pipeline = pipeline(PairFetcher {
            delta: 10.0,
            fail: vec!["NTH1"],
        });
        let snapshot = SnapshotBuilder::new(&registry, &pipeline, SnapshotSettings::default())
            .build(reference_time())
            .await;

        let lines = snapshot.summary_lines();
        assert_eq!(lines[0], "North: No Data (no contributing stations)");
        assert_eq!(lines[1], "South: No Activity (dB/dt: 10.00 nT/min)");
    }

    #[tokio::test]
    async fn test_summary_uses_published_value() {
        // 29.996 nT/min rounds to the 30.00 boundary of a 1.5 region
        let registry = single_region_registry(1.5, &["EY2M"]);
        let pipeline = pipeline(PairFetcher { delta: 29.996, fail: vec![] });
        let snapshot = SnapshotBuilder::new(&registry, &pipeline, SnapshotSettings::default())
            .build(reference_time())
            .await;

        let canterbury = &snapshot.regions["Canterbury"];
        assert_eq!(canterbury.max_dbdt(), Some(30.0));
        assert_eq!(
            snapshot.summary_lines(),
            vec!["Canterbury: Possible Aurora (dB/dt: 30.00 nT/min)".to_string()]
        );

        let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["regions"]["Canterbury"]["dbdt_value"], 30.0);
        assert_eq!(json["regions"]["Canterbury"]["level"], 1);
    }
}
