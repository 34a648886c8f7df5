//! Output readouts.

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::category::MeasurementCategory;
use crate::geolocation::Geolocation;
use crate::time::Mjd;

/// Where a readout came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub product: String,
    pub software_version: String,
    pub abs_orbit: i64,
    pub l1b_product: String,
}

/// One co-added readout over every selected pixel of a state.
///
/// Per-pixel vectors are aligned: element `i` of `signal` belongs to
/// pixel `pixel_ids[i]` of cluster `cluster_ids[i]`. Pixels are ordered
/// by cluster start pixel, then by pixel id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readout {
    pub category: MeasurementCategory,
    pub state_index: usize,
    pub state_id: u16,
    /// Position of the readout within its state.
    pub index: usize,
    pub time: Mjd,
    /// Integration time in seconds.
    pub integration_time: f64,
    pub pixel_ids: Vec<u16>,
    pub wavelength: Vec<f32>,
    pub wavelength_error: Vec<f32>,
    pub signal: Vec<f32>,
    pub signal_error: Vec<f32>,
    pub cluster_ids: Vec<u8>,
    pub channels: Vec<u8>,
    pub coadd_factors: Vec<u16>,
    pub geolocation: Geolocation,
    /// PMD samples in the readout interval, seven values each.
    pub pmd: Option<Vec<f32>>,
    pub provenance: Provenance,
}

impl Readout {
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.time.to_datetime()
    }

    /// Positions of a cluster's pixels in the per-pixel vectors.
    pub fn cluster_range(&self, cluster_id: u8) -> Option<Range<usize>> {
        let start = self.cluster_ids.iter().position(|&c| c == cluster_id)?;
        let len = self.cluster_ids[start..]
            .iter()
            .take_while(|&&c| c == cluster_id)
            .count();
        Some(start..start + len)
    }

    /// Pixels of the readout that carry a finite signal.
    pub fn valid_pixels(&self) -> usize {
        self.signal.iter().filter(|s| s.is_finite()).count()
    }
}
