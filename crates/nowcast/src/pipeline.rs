//! Per-station processing: fetch, parse, differentiate.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use geomag_common::{Station, TimeWindow};

use crate::derivative::{DerivativeEngine, DerivativeResult, Unavailable};
use crate::error::NowcastError;
use crate::fetcher::SampleFetcher;
use crate::metrics;
use crate::parser::{parse_records, ParseReport};

/// Everything learned about one station during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StationReport {
    pub station_id: String,
    pub name: String,
    pub result: DerivativeResult,
    /// Zeroed when the fetch itself failed
    pub parse: ParseReport,
}

impl StationReport {
    fn unavailable(station: &Station, reason: Unavailable) -> Self {
        Self {
            station_id: station.id.clone(),
            name: station.name.clone(),
            result: DerivativeResult::Unavailable(reason),
            parse: ParseReport::default(),
        }
    }
}

/// Runs fetch → parse → derivative for single stations.
///
/// Never fails: every problem becomes an `Unavailable` result so one
/// station cannot take down a region or a run.
#[derive(Clone)]
pub struct StationPipeline {
    fetcher: Arc<dyn SampleFetcher>,
    engine: DerivativeEngine,
    fetch_timeout: Duration,
}

impl StationPipeline {
    pub fn new(fetcher: Arc<dyn SampleFetcher>, engine: DerivativeEngine, fetch_timeout: Duration) -> Self {
        Self {
            fetcher,
            engine,
            fetch_timeout,
        }
    }

    /// Process one station over `window`.
    #[instrument(skip(self, station, window), fields(station = %station.id))]
    pub async fn run(&self, station: &Station, window: &TimeWindow) -> StationReport {
        let fetched = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(&station.id, window)).await;

        let records = match fetched {
            Ok(Ok(records)) => records,
            Ok(Err(NowcastError::NotFound(_))) => {
                warn!("No data partitions found for window");
                metrics::record_station_failure(&station.id, "not_found");
                return StationReport::unavailable(station, Unavailable::NotFound);
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Station fetch failed");
                metrics::record_station_failure(&station.id, "source_unavailable");
                return StationReport::unavailable(station, Unavailable::SourceUnavailable(e.to_string()));
            }
            Err(_) => {
                warn!(timeout_secs = self.fetch_timeout.as_secs(), "Station fetch timed out");
                metrics::record_station_failure(&station.id, "timeout");
                return StationReport::unavailable(
                    station,
                    Unavailable::SourceUnavailable(format!(
                        "timed out after {}s",
                        self.fetch_timeout.as_secs()
                    )),
                );
            }
        };

        let parsed = parse_records(&records, window);
        metrics::record_rows(&station.id, &parsed.report);

        let result = self.engine.compute(&parsed.samples);
        match &result {
            DerivativeResult::Available(peak) => info!(
                dbdt = peak.max_dbdt,
                samples = peak.samples,
                gaps = peak.gaps_skipped,
                "Station dB/dt computed"
            ),
            DerivativeResult::Unavailable(reason) => {
                warn!(reason = %reason, rows = records.len(), "No usable dB/dt for station");
                metrics::record_station_failure(&station.id, "insufficient_data");
            }
        }

        StationReport {
            station_id: station.id.clone(),
            name: station.name.clone(),
            result,
            parse: parsed.report,
        }
    }
}
