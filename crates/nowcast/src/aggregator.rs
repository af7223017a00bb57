//! Regional aggregation and activity classification.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use geomag_common::{EffectiveThresholds, Region, StationRegistry};

use crate::derivative::DerivativeResult;
use crate::error::{NowcastError, Result};
use crate::metrics;
use crate::pipeline::StationReport;

/// Discrete aurora-visibility level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActivityLevel {
    NoActivity,
    PossibleAurora,
    StrongActivity,
}

impl ActivityLevel {
    /// Classify a peak dB/dt against effective thresholds.
    ///
    /// Checked from the top down: `>= possible` is strong, `>= no_activity`
    /// is possible, anything lower is quiet.
    pub fn classify(max_dbdt: f64, thresholds: &EffectiveThresholds) -> Self {
        if max_dbdt >= thresholds.possible {
            ActivityLevel::StrongActivity
        } else if max_dbdt >= thresholds.no_activity {
            ActivityLevel::PossibleAurora
        } else {
            ActivityLevel::NoActivity
        }
    }

    /// Numeric level used by the presentation layer.
    pub fn level(&self) -> u8 {
        match self {
            ActivityLevel::NoActivity => 0,
            ActivityLevel::PossibleAurora => 1,
            ActivityLevel::StrongActivity => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityLevel::NoActivity => "No Activity",
            ActivityLevel::PossibleAurora => "Possible Aurora",
            ActivityLevel::StrongActivity => "Strong Activity",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ActivityLevel::NoActivity => "#6b7280",
            ActivityLevel::PossibleAurora => "#f59e0b",
            ActivityLevel::StrongActivity => "#dc2626",
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(ActivityLevel::NoActivity),
            1 => Some(ActivityLevel::PossibleAurora),
            2 => Some(ActivityLevel::StrongActivity),
            _ => None,
        }
    }
}

/// Region state: a classification, or an explicit lack of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// No contributing station produced a usable value
    NoData,
    Classified(ActivityLevel),
}

impl RegionState {
    pub const NO_DATA_LABEL: &'static str = "No Data";
    pub const NO_DATA_COLOR: &'static str = "#9ca3af";

    pub fn label(&self) -> &'static str {
        match self {
            RegionState::NoData => Self::NO_DATA_LABEL,
            RegionState::Classified(level) => level.label(),
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RegionState::NoData => Self::NO_DATA_COLOR,
            RegionState::Classified(level) => level.color(),
        }
    }

    pub fn level(&self) -> Option<u8> {
        match self {
            RegionState::NoData => None,
            RegionState::Classified(level) => Some(level.level()),
        }
    }
}

/// Classification of one region for one run.
///
/// Fields are private: the state is only ever derived from the peak value
/// and the thresholds, never set on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RegionEntry", try_from = "RegionEntry")]
pub struct RegionStatus {
    region: String,
    display_name: String,
    max_dbdt: Option<f64>,
    state: RegionState,
    thresholds: EffectiveThresholds,
    contributing_stations: Vec<String>,
}

impl RegionStatus {
    /// Classify a region from per-station results.
    ///
    /// `results` is consulted in the region's configured station order;
    /// stations missing from it count as unavailable. The peak and the
    /// thresholds are rounded to two decimals before classifying, so the
    /// published value always agrees with the published level.
    pub fn from_results(
        region: &Region,
        thresholds: EffectiveThresholds,
        results: &HashMap<String, DerivativeResult>,
    ) -> Self {
        let usable: Vec<(&String, f64)> = region
            .stations
            .iter()
            .filter_map(|id| results.get(id).and_then(DerivativeResult::value).map(|v| (id, v)))
            .collect();

        let thresholds = EffectiveThresholds {
            no_activity: round2(thresholds.no_activity),
            possible: round2(thresholds.possible),
        };
        let (max_dbdt, state) = match max_usable(&region.id, usable.iter().map(|(_, v)| *v)) {
            Ok(raw) => {
                let max = round2(raw);
                (Some(max), RegionState::Classified(ActivityLevel::classify(max, &thresholds)))
            }
            Err(e) => {
                warn!(region = %region.id, error = %e, "Region has no usable station data");
                (None, RegionState::NoData)
            }
        };

        Self {
            region: region.id.clone(),
            display_name: region.display_name.clone(),
            max_dbdt,
            state,
            thresholds,
            contributing_stations: usable.into_iter().map(|(id, _)| id.clone()).collect(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn max_dbdt(&self) -> Option<f64> {
        self.max_dbdt
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    pub fn level(&self) -> Option<u8> {
        self.state.level()
    }

    pub fn thresholds(&self) -> &EffectiveThresholds {
        &self.thresholds
    }

    pub fn contributing_stations(&self) -> &[String] {
        &self.contributing_stations
    }
}

/// Maximum of the usable values, or `NoContributingData` when there are none.
pub fn max_usable(region: &str, values: impl IntoIterator<Item = f64>) -> Result<f64> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
        .ok_or_else(|| NowcastError::NoContributingData(region.to_string()))
}

/// Round for display: two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Wire form of a region in the status document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    #[serde(default)]
    pub region: String,
    pub display_name: String,
    pub level: Option<u8>,
    pub status: String,
    pub color: String,
    pub dbdt_value: Option<f64>,
    pub threshold_no_activity: f64,
    pub threshold_possible: f64,
    pub contributing_stations: Vec<String>,
}

impl From<RegionStatus> for RegionEntry {
    fn from(status: RegionStatus) -> Self {
        Self {
            region: status.region,
            display_name: status.display_name,
            level: status.state.level(),
            status: status.state.label().to_string(),
            color: status.state.color().to_string(),
            dbdt_value: status.max_dbdt,
            threshold_no_activity: status.thresholds.no_activity,
            threshold_possible: status.thresholds.possible,
            contributing_stations: status.contributing_stations,
        }
    }
}

impl TryFrom<RegionEntry> for RegionStatus {
    type Error = String;

    /// Accepts only entries whose level, label, value and thresholds agree.
    fn try_from(entry: RegionEntry) -> std::result::Result<Self, Self::Error> {
        let state = match entry.level {
            None => RegionState::NoData,
            Some(level) => RegionState::Classified(
                ActivityLevel::from_level(level).ok_or_else(|| format!("unknown level {}", level))?,
            ),
        };
        if state.label() != entry.status {
            return Err(format!(
                "status {:?} does not match level {:?}",
                entry.status, entry.level
            ));
        }
        if entry.dbdt_value.is_some() == (state == RegionState::NoData) {
            return Err("dbdt_value must be present exactly when data is available".to_string());
        }
        let thresholds = EffectiveThresholds {
            no_activity: entry.threshold_no_activity,
            possible: entry.threshold_possible,
        };
        if let (Some(dbdt), RegionState::Classified(level)) = (entry.dbdt_value, state) {
            let expected = ActivityLevel::classify(dbdt, &thresholds);
            if expected != level {
                return Err(format!(
                    "dbdt_value {} classifies as {:?}, not {:?}",
                    dbdt,
                    expected.label(),
                    entry.status
                ));
            }
        }

        Ok(Self {
            region: entry.region,
            display_name: entry.display_name,
            max_dbdt: entry.dbdt_value,
            state,
            thresholds,
            contributing_stations: entry.contributing_stations,
        })
    }
}

/// Classifies regions from the station reports of one run.
pub struct RegionalAggregator<'a> {
    registry: &'a StationRegistry,
}

impl<'a> RegionalAggregator<'a> {
    pub fn new(registry: &'a StationRegistry) -> Self {
        Self { registry }
    }

    /// Classify a region from already-computed station reports.
    pub fn aggregate(&self, region: &Region, reports: &HashMap<String, StationReport>) -> RegionStatus {
        let results: HashMap<String, DerivativeResult> = region
            .stations
            .iter()
            .filter_map(|id| reports.get(id).map(|r| (id.clone(), r.result.clone())))
            .collect();

        let status = RegionStatus::from_results(region, self.registry.thresholds_for(region), &results);
        metrics::record_region(&status);

        info!(
            region = %status.region(),
            state = %status.state().label(),
            dbdt = ?status.max_dbdt(),
            contributing = status.contributing_stations().len(),
            configured = region.stations.len(),
            "Region classified"
        );
        status
    }
}
