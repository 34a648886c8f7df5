//! Extraction configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::category::MeasurementCategory;
use crate::codec::layouts::{MAX_CLUSTERS, NUM_PIXELS};
use crate::error::{L1cError, L1cResult};
use crate::window::WindowSpec;

/// What to extract from a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Measurement category to stream.
    pub category: MeasurementCategory,

    /// Pixel, wavelength or cluster selection.
    pub window: WindowSpec,

    /// Minimum integration time of output readouts in seconds. Readouts
    /// are co-added up to at least this long.
    pub min_integration_time: Option<f64>,

    /// Attach PMD samples to readouts.
    pub include_pmd: bool,

    /// Solar references kept decoded per session.
    pub solar_cache_capacity: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            category: MeasurementCategory::Nadir,
            window: WindowSpec::Pixels {
                start: 0,
                end: NUM_PIXELS as u16,
            },
            min_integration_time: None,
            include_pmd: false,
            solar_cache_capacity: 4,
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from environment variables over the defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `L1C_*` environment variables on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("L1C_CATEGORY") {
            match val.parse() {
                Ok(category) => self.category = category,
                Err(e) => warn!(value = %val, error = %e, "Ignoring L1C_CATEGORY"),
            }
        }

        if let Ok(val) = std::env::var("L1C_MIN_INTEGRATION_TIME") {
            match val.parse::<f64>() {
                Ok(t) => self.min_integration_time = Some(t),
                Err(_) => warn!(value = %val, "Ignoring L1C_MIN_INTEGRATION_TIME"),
            }
        }

        if let Ok(val) = std::env::var("L1C_INCLUDE_PMD") {
            self.include_pmd = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = std::env::var("L1C_SOLAR_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                self.solar_cache_capacity = capacity;
            }
        }

        self
    }

    pub fn from_yaml_str(text: &str) -> L1cResult<Self> {
        serde_yaml::from_str(text).map_err(|e| L1cError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> L1cResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml(&self) -> L1cResult<String> {
        serde_yaml::to_string(self).map_err(|e| L1cError::Config(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> L1cResult<()> {
        if let Some(t) = self.min_integration_time {
            if !t.is_finite() || t <= 0.0 {
                return Err(L1cError::Config(format!(
                    "min_integration_time must be a positive number of seconds, got {}",
                    t
                )));
            }
        }

        if self.solar_cache_capacity == 0 {
            return Err(L1cError::Config("solar_cache_capacity must be > 0".to_string()));
        }

        match &self.window {
            WindowSpec::Pixels { start, end } => {
                if start >= end || *end as usize > NUM_PIXELS {
                    return Err(L1cError::Config(format!(
                        "pixel window [{}, {}) must be non-empty and within {} pixels",
                        start, end, NUM_PIXELS
                    )));
                }
            }
            WindowSpec::Clusters(ids) => {
                if ids.is_empty() {
                    return Err(L1cError::Config("cluster list is empty".to_string()));
                }
                if let Some(id) = ids.iter().find(|&&id| id as usize >= MAX_CLUSTERS) {
                    return Err(L1cError::Config(format!("cluster id {} must be < {}", id, MAX_CLUSTERS)));
                }
            }
            WindowSpec::Wavelengths(list) => {
                if list.len() > MAX_CLUSTERS {
                    return Err(L1cError::Config(format!(
                        "{} wavelength windows exceed the limit of {}",
                        list.len(),
                        MAX_CLUSTERS
                    )));
                }
                if let Some(w) = list.iter().find(|w| !(w.lambda_min <= w.lambda_max)) {
                    return Err(L1cError::Config(format!(
                        "wavelength window [{}, {}] is inverted",
                        w.lambda_min, w.lambda_max
                    )));
                }
            }
        }

        Ok(())
    }
}
