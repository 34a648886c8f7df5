//! Integration tests for opening products and indexing their headers.
//!
//! Products are generated with the test-utils builder, so these tests
//! need no external data.

use std::io::Write;

use scia_l1c::{DescriptorKind, L1cError, MeasurementCategory, Mjd, Product};
use test_utils::{
    linear_wavelength_grid, ClusterRecord, ClusterSpec, L1cProductBuilder, Stamp, StateSpec, LIMB,
    MPH_SIZE, NADIR,
};

fn t0() -> Stamp {
    Stamp::new(1462, 34_761, 0)
}

fn nadir_state(start: Stamp, state_id: u16) -> StateSpec {
    StateSpec::new(start, NADIR, state_id, 32, 16).cluster(ClusterSpec::new(0, 1, 0, 4, 1))
}

fn two_category_builder() -> L1cProductBuilder {
    let grid = linear_wavelength_grid(240.0, 0.1);
    let nadir = nadir_state(t0(), 7);
    let limb = StateSpec::new(t0().plus_seconds(60.0), LIMB, 28, 100, 24)
        .cluster(ClusterSpec::new(3, 2, 1024, 8, 1));
    let detached = nadir_state(t0().plus_seconds(120.0), 8).detached();
    L1cProductBuilder::new()
        .record(ClusterRecord::synthetic(&nadir, &nadir.clusters[0], 2, &grid, |o, _| o as f32))
        .record(ClusterRecord::synthetic(&limb, &limb.clusters[0], 4, &grid, |o, _| o as f32))
        .state(nadir)
        .state(limb)
        .state(detached)
}

#[test]
fn test_open_missing_file_is_not_openable() {
    let err = Product::open("/nonexistent/SCI_NLC_1P.N1").unwrap_err();
    assert!(matches!(err, L1cError::NotOpenable { .. }), "got {:?}", err);
    assert!(err.is_fatal());
}

#[test]
fn test_open_other_product_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("SCI_NL__1P.N1");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"PRODUCT=\"SCI_NL__1PNPDE20040102\"\n").unwrap();
    file.write_all(&[b' '; 2000]).unwrap();
    drop(file);

    let err = Product::open(&path).unwrap_err();
    match err {
        L1cError::NotThisProductType { found } => assert!(found.starts_with("PRODUCT=\"SCI_NL__1P")),
        other => panic!("expected NotThisProductType, got {:?}", other),
    }
}

#[test]
fn test_state_table_inconsistent() {
    let product = L1cProductBuilder::new()
        .state(nadir_state(t0(), 7))
        .extra_geolocations(1)
        .write_temp();
    let err = Product::open(product.path()).unwrap_err();
    assert!(matches!(
        err,
        L1cError::StateTableInconsistent {
            states: 1,
            geolocations: 2
        }
    ));
}

#[test]
fn test_missing_state_table() {
    let product = L1cProductBuilder::new().write_temp();
    let err = Product::open(product.path()).unwrap_err();
    assert!(matches!(err, L1cError::MissingDataset(ref name) if name == "STATES"));
}

#[test]
fn test_main_header_fields() {
    let product = two_category_builder().write_temp();
    let opened = Product::open(product.path()).unwrap();
    let mph = opened.mph();
    assert_eq!(mph.product, test_utils::DEFAULT_PRODUCT);
    assert_eq!(mph.software_ver, "SCIA/6.03");
    assert_eq!(mph.abs_orbit, 9804);
    assert_eq!(mph.num_dsd, 12);
    assert_eq!(mph.dsd_size, 280);
    assert_eq!(
        mph.sensing_start.map(|t| t.to_header_time()),
        Some("02-JAN-2004 09:39:21.000000".to_string())
    );
    assert_eq!(opened.file_name(), test_utils::DEFAULT_PRODUCT);
}

#[test]
fn test_main_header_reencodes_exactly() {
    let product = two_category_builder().write_temp();
    let bytes = std::fs::read(product.path()).unwrap();
    let opened = Product::open(product.path()).unwrap();
    assert_eq!(opened.mph().encode(), bytes[..MPH_SIZE].to_vec());
}

#[test]
fn test_descriptor_table() {
    let product = two_category_builder().write_temp();
    let opened = Product::open(product.path()).unwrap();

    // the trailing spare descriptor is skipped
    assert_eq!(opened.descriptors().len(), 11);
    assert!(opened.descriptor(DescriptorKind::StateTable).is_some());
    assert!(opened.descriptor(DescriptorKind::Primary(MeasurementCategory::Nadir)).is_some());
    assert!(opened.descriptor(DescriptorKind::Primary(MeasurementCategory::Limb)).is_some());
    assert!(opened.descriptor(DescriptorKind::Primary(MeasurementCategory::Occultation)).is_none());
    assert!(opened.descriptor(DescriptorKind::SolarReference).is_none());

    let nadir = opened
        .descriptor(DescriptorKind::Primary(MeasurementCategory::Nadir))
        .unwrap();
    assert_eq!(nadir.ds_type, "M");
    assert_eq!(nadir.num_dsr, 1);
    assert_eq!(nadir.dsr_size, -1);
}

#[test]
fn test_states_are_bucketed_and_detached_dropped() {
    let product = two_category_builder().write_temp();
    let opened = Product::open(product.path()).unwrap();

    assert_eq!(opened.states().len(), 2);
    assert_eq!(opened.state_indices(MeasurementCategory::Nadir), &[0]);
    assert_eq!(opened.state_indices(MeasurementCategory::Limb), &[1]);
    assert!(opened.state_indices(MeasurementCategory::Monitoring).is_empty());
    assert!(matches!(
        opened.require_states(MeasurementCategory::Monitoring),
        Err(L1cError::NoStatesForCategory(MeasurementCategory::Monitoring))
    ));

    let limb = &opened.states()[1];
    assert_eq!(limb.state_id, 28);
    assert_eq!(limb.category, MeasurementCategory::Limb);
    assert_eq!(limb.start, Mjd::new(1462, 34_821, 0));
    assert_eq!(limb.duration_seconds(), 6.25);
    assert_eq!(limb.longest_int_seconds(), 1.5);
    let cluster = limb.cluster(3).unwrap();
    assert_eq!((cluster.channel, cluster.start_pixel, cluster.end_pixel()), (2, 1024, 1032));
}

#[test]
fn test_calibration_options_masks() {
    let product = two_category_builder()
        .cluster_masks([0b101, 0b1000, 0, 0])
        .write_temp();
    let opened = Product::open(product.path()).unwrap();
    assert_eq!(opened.enabled_clusters(MeasurementCategory::Nadir), vec![0, 2]);
    assert_eq!(opened.enabled_clusters(MeasurementCategory::Limb), vec![3]);
    assert!(opened.enabled_clusters(MeasurementCategory::Occultation).is_empty());
    assert!(opened.calibration_options().l1b_product_name.starts_with("SCI_NL__1P"));
}

#[test]
fn test_missing_calibration_options_enables_everything() {
    let product = two_category_builder().without_calibration_options().write_temp();
    let opened = Product::open(product.path()).unwrap();
    assert!(opened.descriptor(DescriptorKind::CalibrationOptions).is_none());
    assert_eq!(opened.enabled_clusters(MeasurementCategory::Nadir).len(), 64);
}

#[test]
fn test_wavelength_grid_from_solar_reference() {
    let product = two_category_builder()
        .solar_reference("D0", linear_wavelength_grid(200.0, 0.25))
        .write_temp();
    let mut opened = Product::open(product.path()).unwrap();
    assert_eq!(opened.wavelength_grid().wavelength(4), Some(201.0));

    let reference = opened.read_solar_reference("D0").unwrap();
    assert_eq!(reference.id, "D0");
    assert_eq!(reference.mean_ref_spec[10], 1010.0);
    assert!(matches!(
        opened.read_solar_reference("Q9"),
        Err(L1cError::MissingDataset(_))
    ));
}

#[test]
fn test_detached_state_with_invalid_layout_is_dropped() {
    let garbage = StateSpec::new(t0().plus_seconds(30.0), 9, 99, 32, 16)
        .cluster(ClusterSpec::new(0, 1, 0, 600, 1))
        .cluster(ClusterSpec::new(1, 1, 552, 472, 1))
        .detached();
    let product = L1cProductBuilder::new()
        .state(nadir_state(t0(), 7))
        .state(garbage)
        .write_temp();

    let opened = Product::open(product.path()).unwrap();
    assert_eq!(opened.states().len(), 1);
    assert_eq!(opened.states()[0].state_id, 7);
}
