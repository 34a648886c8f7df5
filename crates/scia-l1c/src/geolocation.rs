//! Per-readout geolocation records.
//!
//! Nadir, limb/occultation and monitoring records have different shapes;
//! [`GeometryKind`] selects the field table and [`Geolocation`] holds the
//! decoded record.

use serde::Serialize;

use crate::codec::layouts::{GEO_CAL, GEO_LIMB, GEO_NADIR};
use crate::codec::{Layout, NativeView};
use crate::error::{L1cError, L1cResult};

/// Latitude/longitude pair in micro-degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Coord {
    pub lat: i32,
    pub lon: i32,
}

impl Coord {
    pub fn new(lat: i32, lon: i32) -> Self {
        Self { lat, lon }
    }

    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat: (lat * 1e6).round() as i32,
            lon: (lon * 1e6).round() as i32,
        }
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat as f64 * 1e-6
    }

    pub fn lon_deg(&self) -> f64 {
        self.lon as f64 * 1e-6
    }

    pub(crate) fn from_view(view: NativeView<'_>) -> Self {
        Self {
            lat: view.i32("lat"),
            lon: view.i32("lon"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoNadir {
    pub pos_esm: f32,
    pub sat_h: f32,
    pub earth_rad: f32,
    pub sun_zen: [f32; 3],
    pub sun_azi: [f32; 3],
    pub los_zen: [f32; 3],
    pub los_azi: [f32; 3],
    pub sub_sat: Coord,
    pub corners: [Coord; 4],
    pub center: Coord,
}

/// Limb and occultation geolocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoLimb {
    pub pos_esm: f32,
    pub pos_asm: f32,
    pub sun_zen: [f32; 3],
    pub sun_azi: [f32; 3],
    pub los_zen: [f32; 3],
    pub los_azi: [f32; 3],
    pub sat_h: f32,
    pub earth_rad: f32,
    pub sub_sat: Coord,
    pub tangent_ground: [Coord; 3],
    pub tangent_height: [f32; 3],
    pub doppler: f32,
}

/// Monitoring (calibration) geolocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoCal {
    pub pos_esm: f32,
    pub pos_asm: f32,
    pub sun_zen: f32,
    pub sub_sat: Coord,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "geometry", rename_all = "lowercase")]
pub enum Geolocation {
    Nadir(GeoNadir),
    Limb(GeoLimb),
    Calibration(GeoCal),
}

impl Geolocation {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Nadir(_) => GeometryKind::Nadir,
            Self::Limb(_) => GeometryKind::Limb,
            Self::Calibration(_) => GeometryKind::Calibration,
        }
    }

    /// Sub-satellite point, present in every geometry.
    pub fn sub_satellite(&self) -> Coord {
        match self {
            Self::Nadir(g) => g.sub_sat,
            Self::Limb(g) => g.sub_sat,
            Self::Calibration(g) => g.sub_sat,
        }
    }
}

/// Shape of a geolocation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Nadir,
    Limb,
    Calibration,
}

impl GeometryKind {
    pub fn layout(&self) -> &'static Layout {
        match self {
            Self::Nadir => &GEO_NADIR,
            Self::Limb => &GEO_LIMB,
            Self::Calibration => &GEO_CAL,
        }
    }

    /// On-disk size of one record.
    pub fn record_size(&self) -> usize {
        self.layout().size
    }

    /// Decode one big-endian record in place.
    pub fn decode(&self, raw: &mut [u8]) -> L1cResult<Geolocation> {
        let view = self.layout().decode(raw)?;
        Ok(match self {
            Self::Nadir => Geolocation::Nadir(GeoNadir {
                pos_esm: view.f32("pos_esm"),
                sat_h: view.f32("sat_h"),
                earth_rad: view.f32("earth_rad"),
                sun_zen: view.f32_array("sun_zen"),
                sun_azi: view.f32_array("sun_azi"),
                los_zen: view.f32_array("los_zen"),
                los_azi: view.f32_array("los_azi"),
                sub_sat: Coord::from_view(view.nested("sub_sat", 0)),
                corners: std::array::from_fn(|i| Coord::from_view(view.nested("corners", i))),
                center: Coord::from_view(view.nested("center", 0)),
            }),
            Self::Limb => Geolocation::Limb(GeoLimb {
                pos_esm: view.f32("pos_esm"),
                pos_asm: view.f32("pos_asm"),
                sun_zen: view.f32_array("sun_zen"),
                sun_azi: view.f32_array("sun_azi"),
                los_zen: view.f32_array("los_zen"),
                los_azi: view.f32_array("los_azi"),
                sat_h: view.f32("sat_h"),
                earth_rad: view.f32("earth_rad"),
                sub_sat: Coord::from_view(view.nested("sub_sat", 0)),
                tangent_ground: std::array::from_fn(|i| {
                    Coord::from_view(view.nested("tangent_ground", i))
                }),
                tangent_height: view.f32_array("tangent_height"),
                doppler: view.f32("doppler"),
            }),
            Self::Calibration => Geolocation::Calibration(GeoCal {
                pos_esm: view.f32("pos_esm"),
                pos_asm: view.f32("pos_asm"),
                sun_zen: view.f32("sun_zen"),
                sub_sat: Coord::from_view(view.nested("sub_sat", 0)),
            }),
        })
    }

    /// Decode `count` consecutive records.
    pub fn decode_many(&self, raw: &mut [u8], count: usize) -> L1cResult<Vec<Geolocation>> {
        let size = self.record_size();
        let needed = size * count;
        if raw.len() < needed {
            return Err(L1cError::TruncatedRecord {
                aggregate: self.layout().name,
                expected: needed,
                available: raw.len(),
            });
        }
        raw[..needed]
            .chunks_exact_mut(size)
            .map(|chunk| self.decode(chunk))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_f32(raw: &mut [u8], at: usize, v: f32) {
        raw[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    fn put_i32(raw: &mut [u8], at: usize, v: i32) {
        raw[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }

    #[test]
    fn test_decode_nadir_record() {
        let mut raw = vec![0u8; GEO_NADIR.size];
        put_f32(&mut raw, 4, 799.5);
        put_f32(&mut raw, 16, 42.25);
        put_i32(&mut raw, 60, 10_000_000);
        put_i32(&mut raw, 64, -170_500_000);
        put_i32(&mut raw, 92, -1);
        put_i32(&mut raw, 104, 123);
        let Geolocation::Nadir(g) = GeometryKind::Nadir.decode(&mut raw).unwrap() else {
            panic!("wrong geometry");
        };
        assert_eq!(g.sat_h, 799.5);
        assert_eq!(g.sun_zen[1], 42.25);
        assert_eq!(g.sub_sat, Coord::new(10_000_000, -170_500_000));
        assert_eq!(g.corners[3].lat, -1);
        assert_eq!(g.center.lon, 123);
        assert!((g.sub_sat.lon_deg() + 170.5).abs() < 1e-9);
    }

    #[test]
    fn test_decode_many_limb_records() {
        let size = GEO_LIMB.size;
        let mut raw = vec![0u8; size * 2];
        put_f32(&mut raw, 108, 0.5);
        put_f32(&mut raw, size + 108, 1.5);
        put_f32(&mut raw, size + 100, 35.0);
        let geo = GeometryKind::Limb.decode_many(&mut raw, 2).unwrap();
        match (&geo[0], &geo[1]) {
            (Geolocation::Limb(a), Geolocation::Limb(b)) => {
                assert_eq!(a.doppler, 0.5);
                assert_eq!(b.doppler, 1.5);
                assert_eq!(b.tangent_height[1], 35.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_many_short_buffer() {
        let mut raw = vec![0u8; GEO_CAL.size + 3];
        assert!(matches!(
            GeometryKind::Calibration.decode_many(&mut raw, 2),
            Err(L1cError::TruncatedRecord { expected: 40, .. })
        ));
    }
}
