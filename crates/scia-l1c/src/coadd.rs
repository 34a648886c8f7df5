//! Co-adding of native readouts.
//!
//! Signals are averaged, errors combined in quadrature, and geolocation
//! records merged field by field: start-of-readout fields come from the
//! first native readout, end-of-readout fields from the last, centre
//! fields from the rule's mid-point and the rest are plain averages.
//! Only factors listed in the category's rule table are accepted.

use crate::category::MeasurementCategory;
use crate::error::{L1cError, L1cResult};
use crate::geolocation::{Coord, GeoCal, GeoLimb, GeoNadir, Geolocation};

/// Which native readout(s) stand for the centre of a co-added readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidPoint {
    Single(usize),
    /// Average of two adjacent readouts (even factors).
    Pair(usize, usize),
}

/// Geolocation combination rule for one co-add factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoaddRule {
    pub factor: u16,
    pub mid: MidPoint,
}

const fn odd(factor: u16) -> CoaddRule {
    CoaddRule {
        factor,
        mid: MidPoint::Single(((factor - 1) / 2) as usize),
    }
}

const fn even(factor: u16) -> CoaddRule {
    CoaddRule {
        factor,
        mid: MidPoint::Pair((factor / 2 - 1) as usize, (factor / 2) as usize),
    }
}

pub static NADIR_RULES: &[CoaddRule] = &[
    odd(1),
    even(2),
    odd(3),
    even(4),
    even(6),
    even(8),
    even(12),
    even(16),
    even(24),
    even(32),
    even(48),
    even(64),
];

pub static LIMB_RULES: &[CoaddRule] = &[
    odd(1),
    even(2),
    odd(3),
    even(4),
    even(6),
    even(8),
    even(12),
    even(16),
    even(24),
];

pub static OCCULTATION_RULES: &[CoaddRule] = &[odd(1), even(2), even(4), even(8), even(16), even(32)];

pub static MONITORING_RULES: &[CoaddRule] = &[
    odd(1),
    even(2),
    even(4),
    even(8),
    even(16),
    even(32),
    even(64),
];

/// Ratio between a cluster's target and native integration times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoaddFactor {
    Whole(u16),
    Fractional(f64),
}

impl CoaddFactor {
    /// Classify a ratio, accepting integers within 1e-6.
    pub fn from_ratio(ratio: f64) -> Self {
        let rounded = ratio.round();
        if (ratio - rounded).abs() < 1e-6 && rounded >= 1.0 && rounded <= u16::MAX as f64 {
            Self::Whole(rounded as u16)
        } else {
            Self::Fractional(ratio)
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            Self::Whole(n) => *n as f64,
            Self::Fractional(r) => *r,
        }
    }

    pub fn whole(&self) -> Option<usize> {
        match self {
            Self::Whole(n) => Some(*n as usize),
            Self::Fractional(_) => None,
        }
    }
}

/// Combines native readouts of one category.
#[derive(Debug, Clone, Copy)]
pub struct CoaddEngine {
    category: MeasurementCategory,
    rules: &'static [CoaddRule],
}

impl CoaddEngine {
    pub fn new(category: MeasurementCategory) -> Self {
        Self {
            category,
            rules: category.profile().coadd_rules(),
        }
    }

    pub fn category(&self) -> MeasurementCategory {
        self.category
    }

    /// Look up the rule for a cluster's factor.
    pub fn rule(&self, factor: CoaddFactor, cluster_id: u8, state_id: u16) -> L1cResult<&'static CoaddRule> {
        let rules = self.rules;
        factor
            .whole()
            .and_then(|f| rules.iter().find(|r| r.factor as usize == f))
            .ok_or(L1cError::UnsupportedCoaddFactor {
                cluster_id,
                state_id,
                category: self.category,
                factor: factor.value(),
            })
    }

    /// Co-add the selected pixels of readouts `first..first + factor`.
    ///
    /// `signal` and `error` hold `num_pixels` values per native readout.
    /// Results are appended to the output vectors.
    #[allow(clippy::too_many_arguments)]
    pub fn combine_pixels(
        &self,
        rule: &CoaddRule,
        signal: &[f32],
        error: &[f32],
        num_pixels: usize,
        first: usize,
        pixels: &[usize],
        out_signal: &mut Vec<f32>,
        out_error: &mut Vec<f32>,
    ) {
        let factor = rule.factor as usize;
        let n = factor as f64;
        for &p in pixels {
            let mut sum = 0.0f64;
            let mut sum_sq = 0.0f64;
            for obs in first..first + factor {
                let at = obs * num_pixels + p;
                sum += signal[at] as f64;
                let e = error[at] as f64;
                sum_sq += e * e;
            }
            out_signal.push((sum / n) as f32);
            out_error.push((sum_sq.sqrt() / n) as f32);
        }
    }

    /// Merge `rule.factor` native geolocation records into one.
    pub fn combine_geolocation(&self, rule: &CoaddRule, records: &[Geolocation]) -> L1cResult<Geolocation> {
        if records.len() != rule.factor as usize {
            return Err(L1cError::invalid_operation(format!(
                "co-add by {} given {} geolocation records",
                rule.factor,
                records.len()
            )));
        }
        match &records[0] {
            Geolocation::Nadir(_) => {
                let geo = collect(records, |g| match g {
                    Geolocation::Nadir(n) => Some(*n),
                    _ => None,
                })?;
                Ok(Geolocation::Nadir(combine_nadir(rule, &geo)))
            }
            Geolocation::Limb(_) => {
                let geo = collect(records, |g| match g {
                    Geolocation::Limb(l) => Some(*l),
                    _ => None,
                })?;
                Ok(Geolocation::Limb(combine_limb(rule, &geo)))
            }
            Geolocation::Calibration(_) => {
                let geo = collect(records, |g| match g {
                    Geolocation::Calibration(c) => Some(*c),
                    _ => None,
                })?;
                Ok(Geolocation::Calibration(combine_cal(rule, &geo)))
            }
        }
    }
}

fn collect<T>(records: &[Geolocation], pick: impl Fn(&Geolocation) -> Option<T>) -> L1cResult<Vec<T>> {
    records
        .iter()
        .map(|g| pick(g).ok_or_else(|| L1cError::invalid_operation("mixed geolocation geometries")))
        .collect()
}

fn mean_f32<T>(items: &[T], get: impl Fn(&T) -> f32) -> f32 {
    let sum: f64 = items.iter().map(|i| get(i) as f64).sum();
    (sum / items.len() as f64) as f32
}

fn mid_f32<T>(rule: &CoaddRule, items: &[T], get: impl Fn(&T) -> f32) -> f32 {
    match rule.mid {
        MidPoint::Single(i) => get(&items[i]),
        MidPoint::Pair(a, b) => ((get(&items[a]) as f64 + get(&items[b]) as f64) / 2.0) as f32,
    }
}

fn mid_coord<T>(rule: &CoaddRule, items: &[T], get: impl Fn(&T) -> Coord) -> Coord {
    match rule.mid {
        MidPoint::Single(i) => get(&items[i]),
        MidPoint::Pair(a, b) => mean_coord(&[get(&items[a]), get(&items[b])]),
    }
}

const FULL_TURN: i64 = 360_000_000;
const HALF_TURN: i64 = 180_000_000;

/// Average of coordinates, treating longitudes across the date line
/// as contiguous.
pub fn mean_coord(coords: &[Coord]) -> Coord {
    let n = coords.len() as i64;
    let lat: i64 = coords.iter().map(|c| c.lat as i64).sum();
    let min_lon = coords.iter().map(|c| c.lon as i64).min().unwrap_or(0);
    let max_lon = coords.iter().map(|c| c.lon as i64).max().unwrap_or(0);
    let wraps = max_lon - min_lon > HALF_TURN;
    let lon: i64 = coords
        .iter()
        .map(|c| {
            let l = c.lon as i64;
            if wraps && l < 0 {
                l + FULL_TURN
            } else {
                l
            }
        })
        .sum();
    let mut lon = div_round(lon, n);
    if lon > HALF_TURN {
        lon -= FULL_TURN;
    }
    Coord::new(div_round(lat, n) as i32, lon as i32)
}

fn div_round(sum: i64, n: i64) -> i64 {
    (sum as f64 / n as f64).round() as i64
}

// First/mid/last for the three-point angle arrays.
fn spread<T>(rule: &CoaddRule, items: &[T], get: impl Fn(&T) -> [f32; 3]) -> [f32; 3] {
    let last = items.len() - 1;
    [
        get(&items[0])[0],
        mid_f32(rule, items, |i| get(i)[1]),
        get(&items[last])[2],
    ]
}

fn combine_nadir(rule: &CoaddRule, geo: &[GeoNadir]) -> GeoNadir {
    let first = &geo[0];
    let last = &geo[geo.len() - 1];
    GeoNadir {
        pos_esm: mid_f32(rule, geo, |g| g.pos_esm),
        sat_h: mean_f32(geo, |g| g.sat_h),
        earth_rad: mean_f32(geo, |g| g.earth_rad),
        sun_zen: spread(rule, geo, |g| g.sun_zen),
        sun_azi: spread(rule, geo, |g| g.sun_azi),
        los_zen: spread(rule, geo, |g| g.los_zen),
        los_azi: spread(rule, geo, |g| g.los_azi),
        sub_sat: mid_coord(rule, geo, |g| g.sub_sat),
        corners: [first.corners[0], first.corners[1], last.corners[2], last.corners[3]],
        center: mid_coord(rule, geo, |g| g.center),
    }
}

fn combine_limb(rule: &CoaddRule, geo: &[GeoLimb]) -> GeoLimb {
    let first = &geo[0];
    let last = &geo[geo.len() - 1];
    GeoLimb {
        pos_esm: mid_f32(rule, geo, |g| g.pos_esm),
        pos_asm: mid_f32(rule, geo, |g| g.pos_asm),
        sun_zen: spread(rule, geo, |g| g.sun_zen),
        sun_azi: spread(rule, geo, |g| g.sun_azi),
        los_zen: spread(rule, geo, |g| g.los_zen),
        los_azi: spread(rule, geo, |g| g.los_azi),
        sat_h: mean_f32(geo, |g| g.sat_h),
        earth_rad: mean_f32(geo, |g| g.earth_rad),
        sub_sat: mid_coord(rule, geo, |g| g.sub_sat),
        tangent_ground: [
            first.tangent_ground[0],
            mid_coord(rule, geo, |g| g.tangent_ground[1]),
            last.tangent_ground[2],
        ],
        tangent_height: spread(rule, geo, |g| g.tangent_height),
        doppler: mean_f32(geo, |g| g.doppler),
    }
}

fn combine_cal(rule: &CoaddRule, geo: &[GeoCal]) -> GeoCal {
    GeoCal {
        pos_esm: mid_f32(rule, geo, |g| g.pos_esm),
        pos_asm: mid_f32(rule, geo, |g| g.pos_asm),
        sun_zen: mid_f32(rule, geo, |g| g.sun_zen),
        sub_sat: mid_coord(rule, geo, |g| g.sub_sat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nadir(seed: f32, lon: i32) -> GeoNadir {
        GeoNadir {
            pos_esm: seed,
            sat_h: 800.0 + seed,
            earth_rad: 6370.0,
            sun_zen: [seed, seed + 1.0, seed + 2.0],
            sun_azi: [10.0; 3],
            los_zen: [20.0; 3],
            los_azi: [30.0; 3],
            sub_sat: Coord::new(1_000_000, lon),
            corners: [Coord::new(seed as i32, lon); 4],
            center: Coord::new(2_000_000, lon),
        }
    }

    #[test]
    fn test_rule_tables_cover_factor_one() {
        for cat in MeasurementCategory::ALL {
            let rules = cat.profile().coadd_rules();
            assert_eq!(rules[0], CoaddRule { factor: 1, mid: MidPoint::Single(0) });
            for r in rules {
                match r.mid {
                    MidPoint::Single(i) => assert!(i < r.factor as usize),
                    MidPoint::Pair(a, b) => assert!(b == a + 1 && (b as u16) < r.factor),
                }
            }
        }
    }

    #[test]
    fn test_factor_classification() {
        assert_eq!(CoaddFactor::from_ratio(4.0000004), CoaddFactor::Whole(4));
        assert_eq!(CoaddFactor::from_ratio(2.5), CoaddFactor::Fractional(2.5));
        assert_eq!(CoaddFactor::from_ratio(0.5), CoaddFactor::Fractional(0.5));
    }

    #[test]
    fn test_unsupported_factor_is_rejected() {
        let engine = CoaddEngine::new(MeasurementCategory::Nadir);
        assert!(engine.rule(CoaddFactor::Whole(8), 3, 1).is_ok());
        match engine.rule(CoaddFactor::Whole(5), 3, 1) {
            Err(L1cError::UnsupportedCoaddFactor { cluster_id, factor, .. }) => {
                assert_eq!(cluster_id, 3);
                assert_eq!(factor, 5.0);
            }
            other => panic!("expected UnsupportedCoaddFactor, got {:?}", other),
        }
        assert!(engine.rule(CoaddFactor::Fractional(1.5), 3, 1).is_err());
        let occ = CoaddEngine::new(MeasurementCategory::Occultation);
        assert!(occ.rule(CoaddFactor::Whole(3), 0, 1).is_err());
    }

    #[test]
    fn test_signal_mean_and_quadrature_error() {
        let engine = CoaddEngine::new(MeasurementCategory::Nadir);
        let rule = engine.rule(CoaddFactor::Whole(4), 0, 0).unwrap();
        // two pixels, four readouts
        let signal = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0];
        let error = [2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0];
        let (mut s, mut e) = (Vec::new(), Vec::new());
        engine.combine_pixels(rule, &signal, &error, 2, 0, &[0, 1], &mut s, &mut e);
        assert_eq!(s, vec![2.5, 25.0]);
        assert_eq!(e, vec![1.0, 0.5]);
    }

    #[test]
    fn test_combine_pixels_respects_offset() {
        let engine = CoaddEngine::new(MeasurementCategory::Limb);
        let rule = engine.rule(CoaddFactor::Whole(2), 0, 0).unwrap();
        let signal = [1.0, 2.0, 3.0, 5.0];
        let error = [0.0; 4];
        let (mut s, mut e) = (Vec::new(), Vec::new());
        engine.combine_pixels(rule, &signal, &error, 1, 2, &[0], &mut s, &mut e);
        assert_eq!(s, vec![4.0]);
        assert_eq!(e, vec![0.0]);
    }

    #[test]
    fn test_identical_geolocation_is_fixed_point() {
        let engine = CoaddEngine::new(MeasurementCategory::Nadir);
        let g = Geolocation::Nadir(nadir(3.3, 179_900_000));
        for f in [1u16, 2, 3, 4, 16] {
            let rule = engine.rule(CoaddFactor::Whole(f), 0, 0).unwrap();
            let records = vec![g; f as usize];
            assert_eq!(engine.combine_geolocation(rule, &records).unwrap(), g);
        }
    }

    #[test]
    fn test_nadir_edges_and_middle() {
        let engine = CoaddEngine::new(MeasurementCategory::Nadir);
        let rule = engine.rule(CoaddFactor::Whole(3), 0, 0).unwrap();
        let records: Vec<_> = [0.0, 1.0, 2.0]
            .iter()
            .map(|&s| Geolocation::Nadir(nadir(s, 0)))
            .collect();
        let Geolocation::Nadir(out) = engine.combine_geolocation(rule, &records).unwrap() else {
            panic!("wrong geometry");
        };
        assert_eq!(out.sun_zen, [0.0, 2.0, 4.0]);
        assert_eq!(out.pos_esm, 1.0);
        assert_eq!(out.sat_h, 801.0);
        assert_eq!(out.corners[0].lat, 0);
        assert_eq!(out.corners[3].lat, 2);
    }

    #[test]
    fn test_even_factor_averages_central_pair() {
        let engine = CoaddEngine::new(MeasurementCategory::Monitoring);
        let rule = engine.rule(CoaddFactor::Whole(2), 0, 0).unwrap();
        let cal = |z: f32| {
            Geolocation::Calibration(GeoCal {
                pos_esm: 0.0,
                pos_asm: 0.0,
                sun_zen: z,
                sub_sat: Coord::default(),
            })
        };
        let Geolocation::Calibration(out) = engine.combine_geolocation(rule, &[cal(10.0), cal(11.0)]).unwrap() else {
            panic!("wrong geometry");
        };
        assert_eq!(out.sun_zen, 10.5);
    }

    #[test]
    fn test_longitude_mean_wraps_date_line() {
        let c = mean_coord(&[Coord::new(0, 179_000_000), Coord::new(0, -179_000_000)]);
        assert_eq!(c.lon, 180_000_000);
        let c = mean_coord(&[Coord::new(0, 178_000_000), Coord::new(0, -179_000_000)]);
        assert_eq!(c.lon, 179_500_000);
        let c = mean_coord(&[Coord::new(0, 179_000_000), Coord::new(0, -177_000_000)]);
        assert_eq!(c.lon, -179_000_000);
        let c = mean_coord(&[Coord::new(10, -10), Coord::new(20, 30)]);
        assert_eq!(c, Coord::new(15, 10));
    }

    #[test]
    fn test_geolocation_count_must_match_factor() {
        let engine = CoaddEngine::new(MeasurementCategory::Nadir);
        let rule = engine.rule(CoaddFactor::Whole(4), 0, 0).unwrap();
        let g = Geolocation::Nadir(nadir(0.0, 0));
        assert!(engine.combine_geolocation(rule, &[g, g]).is_err());
    }
}
