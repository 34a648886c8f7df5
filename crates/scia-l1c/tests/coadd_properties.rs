//! Property tests for geolocation co-adding.

use proptest::prelude::*;

use scia_l1c::{
    CoaddEngine, CoaddFactor, Coord, GeoCal, GeoLimb, GeoNadir, Geolocation, GeometryKind, L1cError,
    MeasurementCategory,
};

fn coord() -> impl Strategy<Value = Coord> {
    (-90_000_000..=90_000_000_i32, -180_000_000..=180_000_000_i32).prop_map(|(lat, lon)| Coord::new(lat, lon))
}

fn angle() -> impl Strategy<Value = f32> {
    -360.0_f32..360.0
}

fn triple() -> impl Strategy<Value = [f32; 3]> {
    [angle(), angle(), angle()]
}

fn nadir() -> impl Strategy<Value = Geolocation> {
    (
        (angle(), 780.0_f32..820.0, 6350.0_f32..6390.0),
        (triple(), triple(), triple(), triple()),
        (coord(), [coord(), coord(), coord(), coord()], coord()),
    )
        .prop_map(|((pos_esm, sat_h, earth_rad), (sun_zen, sun_azi, los_zen, los_azi), (sub_sat, corners, center))| {
            Geolocation::Nadir(GeoNadir {
                pos_esm,
                sat_h,
                earth_rad,
                sun_zen,
                sun_azi,
                los_zen,
                los_azi,
                sub_sat,
                corners,
                center,
            })
        })
}

fn limb() -> impl Strategy<Value = Geolocation> {
    (
        (angle(), angle(), 780.0_f32..820.0, 6350.0_f32..6390.0, -1e-4_f32..1e-4),
        (triple(), triple(), triple(), triple(), [0.0_f32..100.0, 0.0_f32..100.0, 0.0_f32..100.0]),
        (coord(), [coord(), coord(), coord()]),
    )
        .prop_map(
            |((pos_esm, pos_asm, sat_h, earth_rad, doppler), (sun_zen, sun_azi, los_zen, los_azi, tangent_height), (sub_sat, tangent_ground))| {
                Geolocation::Limb(GeoLimb {
                    pos_esm,
                    pos_asm,
                    sun_zen,
                    sun_azi,
                    los_zen,
                    los_azi,
                    sat_h,
                    earth_rad,
                    sub_sat,
                    tangent_ground,
                    tangent_height,
                    doppler,
                })
            },
        )
}

fn calibration() -> impl Strategy<Value = Geolocation> {
    (angle(), angle(), angle(), coord()).prop_map(|(pos_esm, pos_asm, sun_zen, sub_sat)| {
        Geolocation::Calibration(GeoCal {
            pos_esm,
            pos_asm,
            sun_zen,
            sub_sat,
        })
    })
}

fn category_and_geolocation() -> impl Strategy<Value = (MeasurementCategory, Geolocation)> {
    prop::sample::select(MeasurementCategory::ALL.to_vec()).prop_flat_map(|category| {
        let geo = match category.profile().geometry() {
            GeometryKind::Nadir => nadir().boxed(),
            GeometryKind::Limb => limb().boxed(),
            GeometryKind::Calibration => calibration().boxed(),
        };
        (Just(category), geo)
    })
}

proptest! {
    #[test]
    fn test_identical_readouts_coadd_to_themselves((category, geo) in category_and_geolocation()) {
        let engine = CoaddEngine::new(category);
        for rule in category.profile().coadd_rules() {
            let records = vec![geo; rule.factor as usize];
            let combined = engine.combine_geolocation(rule, &records).unwrap();
            prop_assert_eq!(combined, geo, "factor {}", rule.factor);
        }
    }

    #[test]
    fn test_unlisted_factors_are_rejected(category in prop::sample::select(MeasurementCategory::ALL.to_vec()), factor in 1u16..200) {
        let engine = CoaddEngine::new(category);
        let listed = category.profile().coadd_rules().iter().any(|r| r.factor == factor);
        match engine.rule(CoaddFactor::Whole(factor), 2, 9) {
            Ok(rule) => prop_assert!(listed && rule.factor == factor),
            Err(L1cError::UnsupportedCoaddFactor { cluster_id, state_id, .. }) => {
                prop_assert!(!listed);
                prop_assert_eq!((cluster_id, state_id), (2, 9));
            }
            Err(e) => prop_assert!(false, "unexpected error {:?}", e),
        }
    }

    #[test]
    fn test_sub_satellite_stays_on_the_globe(a in coord(), b in coord()) {
        let engine = CoaddEngine::new(MeasurementCategory::Monitoring);
        let rule = engine.rule(CoaddFactor::Whole(2), 0, 0).unwrap();
        let cal = |sub_sat| Geolocation::Calibration(GeoCal { pos_esm: 0.0, pos_asm: 0.0, sun_zen: 0.0, sub_sat });
        let mid = engine.combine_geolocation(rule, &[cal(a), cal(b)]).unwrap().sub_satellite();
        prop_assert!((-90_000_000..=90_000_000).contains(&mid.lat));
        prop_assert!((-180_000_000..=180_000_000).contains(&mid.lon));
    }
}
