//! Calibration options dataset.

use serde::Serialize;

use crate::category::MeasurementCategory;
use crate::codec::layouts::{CAL_OPTIONS, MAX_CLUSTERS};
use crate::error::L1cResult;
use crate::geolocation::Coord;
use crate::time::Mjd;

/// Calibration steps applied when the product was generated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CalibrationSteps {
    pub slit_function: bool,
    pub sun_mean_ref: bool,
    pub leakage_current: bool,
    pub spectral_cal: bool,
    pub pol_sens: bool,
    pub rad_sens: bool,
    pub ppg_etalon: bool,
}

/// Processing options recorded in the product, including which clusters
/// of each category were written.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationOptions {
    pub l1b_product_name: String,
    pub geo_filter: bool,
    pub start_coord: Coord,
    pub stop_coord: Coord,
    pub time_filter: bool,
    pub start_time: Mjd,
    pub stop_time: Mjd,
    pub category_filter: bool,
    pub categories: Vec<u16>,
    /// Whether each category's measurement dataset was written, indexed
    /// like [`MeasurementCategory::ALL`].
    pub mds_written: [bool; 4],
    pub pmd_written: bool,
    pub frac_pol_written: bool,
    pub steps: CalibrationSteps,
    /// Enabled-cluster bitmaps; bit 0 is cluster 0.
    pub cluster_masks: [u64; 4],
}

impl CalibrationOptions {
    pub fn decode(raw: &mut [u8]) -> L1cResult<Self> {
        let view = CAL_OPTIONS.decode(raw)?;
        let flag = |name: &str| view.u8(name) != 0;
        let coord = |name: &str| {
            let c = view.nested(name, 0);
            Coord::new(c.i32("lat"), c.i32("lon"))
        };
        Ok(Self {
            l1b_product_name: view.ascii("l1b_product_name"),
            geo_filter: flag("geo_filter"),
            start_coord: coord("start_coord"),
            stop_coord: coord("stop_coord"),
            time_filter: flag("time_filter"),
            start_time: view.mjd("start_time"),
            stop_time: view.mjd("stop_time"),
            category_filter: flag("category_filter"),
            categories: (0..10)
                .map(|i| view.u16_at("categories", i))
                .filter(|&c| c != 0)
                .collect(),
            mds_written: [
                flag("nadir_mds"),
                flag("limb_mds"),
                flag("occ_mds"),
                flag("moni_mds"),
            ],
            pmd_written: flag("pmd_mds"),
            frac_pol_written: flag("frac_pol_mds"),
            steps: CalibrationSteps {
                slit_function: flag("slit_function"),
                sun_mean_ref: flag("sun_mean_ref"),
                leakage_current: flag("leakage_current"),
                spectral_cal: flag("spectral_cal"),
                pol_sens: flag("pol_sens"),
                rad_sens: flag("rad_sens"),
                ppg_etalon: flag("ppg_etalon"),
            },
            cluster_masks: [
                view.u64("nadir_clusters"),
                view.u64("limb_clusters"),
                view.u64("occ_clusters"),
                view.u64("moni_clusters"),
            ],
        })
    }

    /// Options for a product without a calibration dataset: everything enabled.
    pub fn all_enabled() -> Self {
        Self {
            l1b_product_name: String::new(),
            geo_filter: false,
            start_coord: Coord::default(),
            stop_coord: Coord::default(),
            time_filter: false,
            start_time: Mjd::default(),
            stop_time: Mjd::default(),
            category_filter: false,
            categories: Vec::new(),
            mds_written: [true; 4],
            pmd_written: true,
            frac_pol_written: true,
            steps: CalibrationSteps::default(),
            cluster_masks: [u64::MAX; 4],
        }
    }

    pub fn is_enabled(&self, category: MeasurementCategory, cluster_id: u8) -> bool {
        (cluster_id as usize) < MAX_CLUSTERS && (self.cluster_masks[category.index()] >> cluster_id) & 1 == 1
    }

    /// Enabled cluster ids of a category, ascending.
    pub fn enabled_clusters(&self, category: MeasurementCategory) -> Vec<u8> {
        (0..MAX_CLUSTERS as u8)
            .filter(|&id| self.is_enabled(category, id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_bytes() -> Vec<u8> {
        let mut raw = vec![0u8; CAL_OPTIONS.size];
        raw[..10].copy_from_slice(b"SCI_NL__1P");
        raw[105..107].copy_from_slice(&1u16.to_be_bytes());
        raw[125] = 1;
        raw[126] = 1;
        raw[131] = 1;
        raw[138..146].copy_from_slice(&0b1010_0001u64.to_be_bytes());
        raw[146..154].copy_from_slice(&u64::MAX.to_be_bytes());
        raw
    }

    #[test]
    fn test_decode_bitmaps() {
        let mut raw = options_bytes();
        let opts = CalibrationOptions::decode(&mut raw).unwrap();
        assert_eq!(opts.l1b_product_name, "SCI_NL__1P");
        assert_eq!(opts.categories, vec![1]);
        assert_eq!(opts.mds_written, [true, true, false, false]);
        assert!(opts.steps.slit_function);
        assert!(!opts.steps.rad_sens);
        assert_eq!(opts.enabled_clusters(MeasurementCategory::Nadir), vec![0, 5, 7]);
        assert_eq!(opts.enabled_clusters(MeasurementCategory::Limb).len(), 64);
        assert!(opts.enabled_clusters(MeasurementCategory::Occultation).is_empty());
        assert!(!opts.is_enabled(MeasurementCategory::Nadir, 64));
    }

    #[test]
    fn test_all_enabled_fallback() {
        let opts = CalibrationOptions::all_enabled();
        for cat in MeasurementCategory::ALL {
            assert_eq!(opts.enabled_clusters(cat).len(), MAX_CLUSTERS);
        }
    }
}
