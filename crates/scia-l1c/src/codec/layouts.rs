//! Field tables of every Level-1C binary aggregate.
//!
//! Offsets are in bytes from the start of the aggregate; all multi-byte
//! scalars are stored big-endian.

use super::FieldKind::*;
use super::{array, field, Layout};

/// Maximum number of clusters a state can declare.
pub const MAX_CLUSTERS: usize = 64;

/// Number of detector pixels over all eight channels.
pub const NUM_PIXELS: usize = 8192;

/// Number of PMD (polarisation measurement device) channels.
pub const NUM_PMD: usize = 7;

pub static MJD: Layout = Layout {
    name: "mjd",
    size: 12,
    fields: &[
        field("days", 0, I32),
        field("seconds", 4, U32),
        field("microseconds", 8, U32),
    ],
};

pub static COORD: Layout = Layout {
    name: "coord",
    size: 8,
    fields: &[field("lat", 0, I32), field("lon", 4, I32)],
};

pub static CLUSTER_CONFIG: Layout = Layout {
    name: "cluster_config",
    size: 17,
    fields: &[
        field("id", 0, U8),
        field("channel", 1, U8),
        field("start_pixel", 2, U16),
        field("length", 4, U16),
        field("pet", 6, F32),
        field("int_time", 10, U16),
        field("coadd", 12, U16),
        field("n_read", 14, U16),
        field("data_type", 16, U8),
    ],
};

pub static STATE: Layout = Layout {
    name: "state",
    size: 1387,
    fields: &[
        field("mjd", 0, Nested(&MJD)),
        field("attached", 12, U8),
        field("reason_code", 13, U8),
        field("orbit_phase", 14, F32),
        field("category", 18, U16),
        field("state_id", 20, U16),
        field("duration", 22, U16),
        field("longest_int_time", 24, U16),
        field("num_clusters", 26, U16),
        array("clusters", 28, Nested(&CLUSTER_CONFIG), MAX_CLUSTERS),
        field("mds_type", 1116, U8),
        field("num_aux", 1117, U16),
        field("num_pmd", 1119, U16),
        field("num_int", 1121, U16),
        array("int_times", 1123, U16, 64),
        array("num_polar", 1251, U16, 64),
        field("total_polar", 1379, U16),
        field("num_dsr", 1381, U16),
        field("length_dsr", 1383, U32),
    ],
};

pub static STATE_GEOLOCATION: Layout = Layout {
    name: "state_geolocation",
    size: 45,
    fields: &[
        field("mjd", 0, Nested(&MJD)),
        field("attached", 12, U8),
        array("corners", 13, Nested(&COORD), 4),
    ],
};

pub static CAL_OPTIONS: Layout = Layout {
    name: "cal_options",
    size: 170,
    fields: &[
        array("l1b_product_name", 0, Ascii, 62),
        field("geo_filter", 62, U8),
        field("start_coord", 63, Nested(&COORD)),
        field("stop_coord", 71, Nested(&COORD)),
        field("time_filter", 79, U8),
        field("start_time", 80, Nested(&MJD)),
        field("stop_time", 92, Nested(&MJD)),
        field("category_filter", 104, U8),
        array("categories", 105, U16, 10),
        field("nadir_mds", 125, U8),
        field("limb_mds", 126, U8),
        field("occ_mds", 127, U8),
        field("moni_mds", 128, U8),
        field("pmd_mds", 129, U8),
        field("frac_pol_mds", 130, U8),
        field("slit_function", 131, U8),
        field("sun_mean_ref", 132, U8),
        field("leakage_current", 133, U8),
        field("spectral_cal", 134, U8),
        field("pol_sens", 135, U8),
        field("rad_sens", 136, U8),
        field("ppg_etalon", 137, U8),
        field("nadir_clusters", 138, U64),
        field("limb_clusters", 146, U64),
        field("occ_clusters", 154, U64),
        field("moni_clusters", 162, U64),
    ],
};

pub static SUN_REFERENCE: Layout = Layout {
    name: "sun_reference",
    size: 163_942,
    fields: &[
        array("id", 0, Ascii, 2),
        array("wavelength", 2, F32, NUM_PIXELS),
        array("mean_ref_spec", 32_770, F32, NUM_PIXELS),
        array("precision", 65_538, F32, NUM_PIXELS),
        array("accuracy", 98_306, F32, NUM_PIXELS),
        array("etalon", 131_074, F32, NUM_PIXELS),
        field("avg_azi", 163_842, F32),
        field("avg_ele", 163_846, F32),
        field("avg_sun_ele", 163_850, F32),
        array("mean_pmd", 163_854, F32, NUM_PMD),
        array("pmd_nd_out", 163_882, F32, NUM_PMD),
        array("pmd_nd_in", 163_910, F32, NUM_PMD),
        field("doppler", 163_938, F32),
    ],
};

pub static MDS_HEADER: Layout = Layout {
    name: "mds_header",
    size: 28,
    fields: &[
        field("mjd", 0, Nested(&MJD)),
        field("quality", 12, I8),
        field("orbit_phase", 13, F32),
        field("category", 17, U16),
        field("state_id", 19, U16),
        field("cluster_id", 21, U16),
        field("num_obs", 23, U16),
        field("num_pixels", 25, U16),
        field("unit_flag", 27, U8),
    ],
};

pub static PMD_HEADER: Layout = Layout {
    name: "pmd_header",
    size: 28,
    fields: &[
        field("mjd", 0, Nested(&MJD)),
        field("quality", 12, I8),
        field("orbit_phase", 13, F32),
        field("category", 17, U16),
        field("state_id", 19, U16),
        field("duration", 21, U16),
        field("num_pmd", 23, U16),
        field("num_geo", 25, U16),
        field("spare", 27, U8),
    ],
};

pub static GEO_NADIR: Layout = Layout {
    name: "geo_nadir",
    size: 108,
    fields: &[
        field("pos_esm", 0, F32),
        field("sat_h", 4, F32),
        field("earth_rad", 8, F32),
        array("sun_zen", 12, F32, 3),
        array("sun_azi", 24, F32, 3),
        array("los_zen", 36, F32, 3),
        array("los_azi", 48, F32, 3),
        field("sub_sat", 60, Nested(&COORD)),
        array("corners", 68, Nested(&COORD), 4),
        field("center", 100, Nested(&COORD)),
    ],
};

pub static GEO_LIMB: Layout = Layout {
    name: "geo_limb",
    size: 112,
    fields: &[
        field("pos_esm", 0, F32),
        field("pos_asm", 4, F32),
        array("sun_zen", 8, F32, 3),
        array("sun_azi", 20, F32, 3),
        array("los_zen", 32, F32, 3),
        array("los_azi", 44, F32, 3),
        field("sat_h", 56, F32),
        field("earth_rad", 60, F32),
        field("sub_sat", 64, Nested(&COORD)),
        array("tangent_ground", 72, Nested(&COORD), 3),
        array("tangent_height", 96, F32, 3),
        field("doppler", 108, F32),
    ],
};

pub static GEO_CAL: Layout = Layout {
    name: "geo_cal",
    size: 20,
    fields: &[
        field("pos_esm", 0, F32),
        field("pos_asm", 4, F32),
        field("sun_zen", 8, F32),
        field("sub_sat", 12, Nested(&COORD)),
    ],
};

/// Every declared aggregate, for table-wide checks.
pub static ALL: &[&Layout] = &[
    &MJD,
    &COORD,
    &CLUSTER_CONFIG,
    &STATE,
    &STATE_GEOLOCATION,
    &CAL_OPTIONS,
    &SUN_REFERENCE,
    &MDS_HEADER,
    &PMD_HEADER,
    &GEO_NADIR,
    &GEO_LIMB,
    &GEO_CAL,
];
