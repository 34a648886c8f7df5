//! Measurement categories and their per-category behaviour.
//!
//! Each category differs in three ways: the shape of its geolocation
//! records, how the declared state duration maps to usable integration
//! time, and which co-add factors have a validated geolocation rule.
//! [`CategoryProfile`] captures those differences with one
//! implementation per category.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coadd::{
    CoaddRule, LIMB_RULES, MONITORING_RULES, NADIR_RULES, OCCULTATION_RULES,
};
use crate::geolocation::GeometryKind;

/// Duration of one limb elevation step, in seconds.
pub const LIMB_STEP_SECONDS: f64 = 1.5;

/// Mirror repositioning time between two limb elevation steps, in seconds.
pub const LIMB_STEP_OVERHEAD_SECONDS: f64 = 0.0625;

/// Measurement category of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementCategory {
    Nadir,
    Limb,
    Occultation,
    Monitoring,
}

impl MeasurementCategory {
    pub const ALL: [MeasurementCategory; 4] = [
        MeasurementCategory::Nadir,
        MeasurementCategory::Limb,
        MeasurementCategory::Occultation,
        MeasurementCategory::Monitoring,
    ];

    /// Map the state record's MDS type code (1-4).
    pub fn from_mds_type(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Nadir),
            2 => Some(Self::Limb),
            3 => Some(Self::Occultation),
            4 => Some(Self::Monitoring),
            _ => None,
        }
    }

    pub fn mds_type(&self) -> u8 {
        self.index() as u8 + 1
    }

    /// Position in [`MeasurementCategory::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Self::Nadir => 0,
            Self::Limb => 1,
            Self::Occultation => 2,
            Self::Monitoring => 3,
        }
    }

    /// Name of the primary measurement dataset.
    pub fn dataset_name(&self) -> &'static str {
        match self {
            Self::Nadir => "NADIR",
            Self::Limb => "LIMB",
            Self::Occultation => "OCCULTATION",
            Self::Monitoring => "MONITORING",
        }
    }

    pub fn profile(&self) -> &'static dyn CategoryProfile {
        match self {
            Self::Nadir => &NadirProfile,
            Self::Limb => &LimbProfile,
            Self::Occultation => &OccultationProfile,
            Self::Monitoring => &MonitoringProfile,
        }
    }
}

impl fmt::Display for MeasurementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Nadir => "nadir",
            Self::Limb => "limb",
            Self::Occultation => "occultation",
            Self::Monitoring => "monitoring",
        };
        f.write_str(name)
    }
}

impl FromStr for MeasurementCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nadir" => Ok(Self::Nadir),
            "limb" => Ok(Self::Limb),
            "occultation" | "occ" => Ok(Self::Occultation),
            "monitoring" | "moni" => Ok(Self::Monitoring),
            other => Err(format!("unknown measurement category: {}", other)),
        }
    }
}

/// Category-specific reading rules.
pub trait CategoryProfile: Sync {
    fn category(&self) -> MeasurementCategory;

    /// Shape of the per-readout geolocation record.
    fn geometry(&self) -> GeometryKind;

    /// Integration time actually available in a state of the declared duration.
    fn effective_duration(&self, declared_seconds: f64) -> f64 {
        declared_seconds
    }

    /// Time to add to a readout that starts `elapsed` seconds of
    /// integration into the state, accounting for scan overhead.
    fn scan_offset(&self, _elapsed: f64) -> f64 {
        0.0
    }

    /// Validated geolocation combination rules, keyed by co-add factor.
    fn coadd_rules(&self) -> &'static [CoaddRule];
}

struct NadirProfile;
struct LimbProfile;
struct OccultationProfile;
struct MonitoringProfile;

impl CategoryProfile for NadirProfile {
    fn category(&self) -> MeasurementCategory {
        MeasurementCategory::Nadir
    }

    fn geometry(&self) -> GeometryKind {
        GeometryKind::Nadir
    }

    fn coadd_rules(&self) -> &'static [CoaddRule] {
        NADIR_RULES
    }
}

impl CategoryProfile for LimbProfile {
    fn category(&self) -> MeasurementCategory {
        MeasurementCategory::Limb
    }

    fn geometry(&self) -> GeometryKind {
        GeometryKind::Limb
    }

    // The declared duration includes one repositioning per elevation step.
    fn effective_duration(&self, declared_seconds: f64) -> f64 {
        declared_seconds * LIMB_STEP_SECONDS / (LIMB_STEP_SECONDS + LIMB_STEP_OVERHEAD_SECONDS)
    }

    fn scan_offset(&self, elapsed: f64) -> f64 {
        let completed_steps = (elapsed / LIMB_STEP_SECONDS + 1e-9).floor();
        completed_steps * LIMB_STEP_OVERHEAD_SECONDS
    }

    fn coadd_rules(&self) -> &'static [CoaddRule] {
        LIMB_RULES
    }
}

impl CategoryProfile for OccultationProfile {
    fn category(&self) -> MeasurementCategory {
        MeasurementCategory::Occultation
    }

    fn geometry(&self) -> GeometryKind {
        GeometryKind::Limb
    }

    fn coadd_rules(&self) -> &'static [CoaddRule] {
        OCCULTATION_RULES
    }
}

impl CategoryProfile for MonitoringProfile {
    fn category(&self) -> MeasurementCategory {
        MeasurementCategory::Monitoring
    }

    fn geometry(&self) -> GeometryKind {
        GeometryKind::Calibration
    }

    fn coadd_rules(&self) -> &'static [CoaddRule] {
        MONITORING_RULES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mds_type_round_trip() {
        for cat in MeasurementCategory::ALL {
            assert_eq!(MeasurementCategory::from_mds_type(cat.mds_type()), Some(cat));
            assert_eq!(cat.profile().category(), cat);
        }
        assert_eq!(MeasurementCategory::from_mds_type(0), None);
        assert_eq!(MeasurementCategory::from_mds_type(5), None);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Limb".parse::<MeasurementCategory>(), Ok(MeasurementCategory::Limb));
        assert_eq!(" occ ".parse::<MeasurementCategory>(), Ok(MeasurementCategory::Occultation));
        assert!("sideways".parse::<MeasurementCategory>().is_err());
    }

    #[test]
    fn test_limb_duration_excludes_repositioning() {
        // four elevation steps of 1.5 s, each followed by 1/16 s repositioning
        let declared = 4.0 * (LIMB_STEP_SECONDS + LIMB_STEP_OVERHEAD_SECONDS);
        let effective = MeasurementCategory::Limb.profile().effective_duration(declared);
        assert!((effective - 6.0).abs() < 1e-12);
        assert_eq!(MeasurementCategory::Nadir.profile().effective_duration(declared), declared);
    }

    #[test]
    fn test_limb_scan_offset_counts_completed_steps() {
        let limb = MeasurementCategory::Limb.profile();
        assert_eq!(limb.scan_offset(0.0), 0.0);
        assert_eq!(limb.scan_offset(1.4), 0.0);
        assert_eq!(limb.scan_offset(1.5), LIMB_STEP_OVERHEAD_SECONDS);
        assert_eq!(limb.scan_offset(4.6), 3.0 * LIMB_STEP_OVERHEAD_SECONDS);
        assert_eq!(MeasurementCategory::Occultation.profile().scan_offset(4.6), 0.0);
    }
}
