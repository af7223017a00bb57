//! Station and region registry.
//!
//! The registry is static configuration: it is built once at process start,
//! validated, and then only read. Every pipeline component receives it by
//! reference.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GeomagError, GeomagResult};

/// Station identifier (e.g., "EY2M").
pub type StationId = String;

/// Region identifier (e.g., "Canterbury").
pub type RegionId = String;

/// A fixed ground magnetometer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Region the station physically sits in. Informational; a station may
    /// contribute to regions other than its home region.
    pub region: String,
}

/// A geographic grouping sharing a visibility-threshold policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub display_name: String,
    /// Scales the base thresholds. Regions further from the auroral oval
    /// need a stronger disturbance before anything is visible.
    pub multiplier: f64,
    /// Stations whose dB/dt feeds this region's maximum.
    pub stations: Vec<StationId>,
}

/// Base activity thresholds in nT/min.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseThresholds {
    pub no_activity: f64,
    pub possible: f64,
}

impl Default for BaseThresholds {
    fn default() -> Self {
        Self {
            no_activity: 20.0,
            possible: 50.0,
        }
    }
}

impl BaseThresholds {
    /// Thresholds after applying a region multiplier.
    pub fn scaled(&self, multiplier: f64) -> EffectiveThresholds {
        EffectiveThresholds {
            no_activity: self.no_activity * multiplier,
            possible: self.possible * multiplier,
        }
    }
}

/// Region-specific thresholds: always `base × multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveThresholds {
    pub no_activity: f64,
    pub possible: f64,
}

/// Immutable set of stations, regions and base thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationRegistry {
    #[serde(default)]
    pub thresholds: BaseThresholds,
    pub stations: Vec<Station>,
    pub regions: Vec<Region>,
}

impl StationRegistry {
    /// Build a registry and validate it.
    pub fn new(
        thresholds: BaseThresholds,
        stations: Vec<Station>,
        regions: Vec<Region>,
    ) -> GeomagResult<Self> {
        let registry = Self {
            thresholds,
            stations,
            regions,
        };
        registry.validate()?;
        Ok(registry)
    }

    /// The GeoNet observatories and New Zealand regions.
    pub fn new_zealand() -> Self {
        let station = |id: &str, name: &str, latitude: f64, longitude: f64, region: &str| Station {
            id: id.to_string(),
            name: name.to_string(),
            latitude,
            longitude,
            region: region.to_string(),
        };
        let region = |id: &str, multiplier: f64, stations: &[&str]| Region {
            id: id.to_string(),
            display_name: id.to_string(),
            multiplier,
            stations: stations.iter().map(|s| s.to_string()).collect(),
        };

        Self {
            thresholds: BaseThresholds::default(),
            stations: vec![
                station("AHAM", "Ahaura Magnetic Observatory", -42.75, 171.50, "Canterbury"),
                station("APIM", "API Magnetic Observatory", -36.88, 174.75, "Auckland"),
                station("EY2M", "Eyrewell Magnetic Observatory", -43.42, 172.35, "Canterbury"),
                station("EYWM", "Eyrewell West Magnetic Observatory", -43.42, 172.25, "Canterbury"),
                station("SMHS", "Scott Base Magnetic Observatory", -77.85, 166.76, "Antarctica"),
            ],
            regions: vec![
                region("Auckland", 2.0, &["APIM"]),
                region("Canterbury", 1.5, &["AHAM", "EY2M", "EYWM"]),
                // No southern observatories: borrow the nearest South Island
                // stations, plus Scott Base for the far south.
                region("Otago", 1.2, &["EY2M", "EYWM", "AHAM"]),
                region("Southland", 1.0, &["EY2M", "EYWM", "SMHS"]),
                region("Stewart Island", 0.8, &["EY2M", "EYWM", "SMHS"]),
            ],
        }
    }

    /// Check every configuration-time invariant.
    pub fn validate(&self) -> GeomagResult<()> {
        let base = &self.thresholds;
        if !base.no_activity.is_finite() || !base.possible.is_finite() || base.no_activity < 0.0 {
            return Err(GeomagError::InvalidConfig(format!(
                "base thresholds must be finite and non-negative: {:?}",
                base
            )));
        }

        let mut station_ids = HashSet::new();
        for station in &self.stations {
            if station.id.trim().is_empty() {
                return Err(GeomagError::InvalidConfig("empty station id".to_string()));
            }
            if !station_ids.insert(station.id.as_str()) {
                return Err(GeomagError::InvalidConfig(format!(
                    "duplicate station id: {}",
                    station.id
                )));
            }
        }

        let mut region_ids = HashSet::new();
        for region in &self.regions {
            if !region_ids.insert(region.id.as_str()) {
                return Err(GeomagError::InvalidConfig(format!(
                    "duplicate region id: {}",
                    region.id
                )));
            }
            if !region.multiplier.is_finite() || region.multiplier <= 0.0 {
                return Err(GeomagError::InvalidConfig(format!(
                    "region {} multiplier must be positive, got {}",
                    region.id, region.multiplier
                )));
            }

            let effective = base.scaled(region.multiplier);
            if effective.possible <= effective.no_activity {
                return Err(GeomagError::InvalidConfig(format!(
                    "region {}: possible threshold {} must exceed no-activity threshold {}",
                    region.id, effective.possible, effective.no_activity
                )));
            }

            for id in &region.stations {
                if !station_ids.contains(id.as_str()) {
                    return Err(GeomagError::UnknownStation(format!(
                        "{} (referenced by region {})",
                        id, region.id
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn station(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Effective thresholds for a region.
    pub fn thresholds_for(&self, region: &Region) -> EffectiveThresholds {
        self.thresholds.scaled(region.multiplier)
    }

    /// Stations referenced by at least one region, in first-reference order.
    pub fn contributing_stations(&self) -> Vec<&Station> {
        let mut seen = HashSet::new();
        self.regions
            .iter()
            .flat_map(|r| r.stations.iter())
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.station(id))
            .collect()
    }

    /// A copy restricted to one region. Stations are left untouched.
    pub fn only_region(&self, id: &str) -> GeomagResult<Self> {
        let region = self
            .region(id)
            .ok_or_else(|| GeomagError::UnknownRegion(id.to_string()))?;
        Ok(Self {
            thresholds: self.thresholds,
            stations: self.stations.clone(),
            regions: vec![region.clone()],
        })
    }
}

impl Default for StationRegistry {
    fn default() -> Self {
        Self::new_zealand()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_is_valid() {
        let registry = StationRegistry::new_zealand();
        registry.validate().unwrap();
        assert_eq!(registry.stations.len(), 5);
        assert_eq!(registry.regions.len(), 5);
    }

    #[test]
    fn test_scaled_thresholds() {
        let t = BaseThresholds::default().scaled(1.5);
        assert_eq!(t.no_activity, 30.0);
        assert_eq!(t.possible, 75.0);
    }

    #[test]
    fn test_contributing_stations_deduplicated() {
        let registry = StationRegistry::new_zealand();
        let ids: Vec<_> = registry
            .contributing_stations()
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["APIM", "AHAM", "EY2M", "EYWM", "SMHS"]);
    }

    #[test]
    fn test_only_region() {
        let registry = StationRegistry::new_zealand();
        let only = registry.only_region("Otago").unwrap();
        assert_eq!(only.regions.len(), 1);
        assert!(registry.only_region("Fiordland").is_err());
    }
}
