//! Level-1C product builder.
//!
//! Writes minimal synthetic SCIAMACHY Level-1C products: the ASCII main
//! and specific product headers, the descriptor table and big-endian
//! binary datasets. The generated files have valid structure but only
//! the datasets a test asks for.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

pub const MPH_SIZE: usize = 1247;
pub const DSD_SIZE: usize = 280;
pub const STATE_SIZE: usize = 1387;
pub const STATE_GEO_SIZE: usize = 45;
pub const CAL_OPTIONS_SIZE: usize = 170;
pub const SUN_REFERENCE_SIZE: usize = 163_942;
pub const RECORD_HEADER_SIZE: usize = 28;
pub const MAX_CLUSTERS: usize = 64;
pub const NUM_PMD: usize = 7;

/// MDS type codes used in state records.
pub const NADIR: u8 = 1;
pub const LIMB: u8 = 2;
pub const OCCULTATION: u8 = 3;
pub const MONITORING: u8 = 4;

const DATASET_NAMES: [&str; 11] = [
    "STATES",
    "GEOLOCATION",
    "CAL_OPTIONS",
    "SUN_REFERENCE",
    "NADIR",
    "LIMB",
    "OCCULTATION",
    "MONITORING",
    "NADIR_PMD",
    "LIMB_PMD",
    "OCCULTATION_PMD",
];

/// Default product name; also used as the file name.
pub const DEFAULT_PRODUCT: &str = "SCI_NLC_1PNPDE20040102_093921_000060632023_00165_09804_0000.N1";

/// MJD 2000 time stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stamp {
    pub days: i32,
    pub seconds: u32,
    pub microseconds: u32,
}

impl Stamp {
    pub fn new(days: i32, seconds: u32, microseconds: u32) -> Self {
        Self {
            days,
            seconds,
            microseconds,
        }
    }

    /// Stamp `seconds` later, rounded to the microsecond.
    pub fn plus_seconds(&self, seconds: f64) -> Self {
        let total = self.days as i64 * 86_400_000_000
            + self.seconds as i64 * 1_000_000
            + self.microseconds as i64
            + (seconds * 1e6).round() as i64;
        let days = total.div_euclid(86_400_000_000);
        let rest = total.rem_euclid(86_400_000_000);
        Self {
            days: days as i32,
            seconds: (rest / 1_000_000) as u32,
            microseconds: (rest % 1_000_000) as u32,
        }
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_i32(self.days);
        buf.put_u32(self.seconds);
        buf.put_u32(self.microseconds);
    }
}

/// Cluster definition inside a state record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSpec {
    pub id: u8,
    pub channel: u8,
    pub start_pixel: u16,
    pub length: u16,
    pub int_time: u16,
    pub coadd: u16,
    pub n_read: u16,
}

impl ClusterSpec {
    pub fn new(id: u8, channel: u8, start_pixel: u16, length: u16, n_read: u16) -> Self {
        Self {
            id,
            channel,
            start_pixel,
            length,
            int_time: 16,
            coadd: 1,
            n_read,
        }
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u8(self.id);
        buf.put_u8(self.channel);
        buf.put_u16(self.start_pixel);
        buf.put_u16(self.length);
        buf.put_f32(0.03125);
        buf.put_u16(self.int_time);
        buf.put_u16(self.coadd);
        buf.put_u16(self.n_read);
        buf.put_u8(1);
    }
}

/// State table entry. Durations are in 1/16 s ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSpec {
    pub start: Stamp,
    pub mds_type: u8,
    pub state_id: u16,
    pub duration: u16,
    pub longest_int_time: u16,
    pub clusters: Vec<ClusterSpec>,
    pub attached: bool,
    pub corners: [(i32, i32); 4],
}

impl StateSpec {
    pub fn new(start: Stamp, mds_type: u8, state_id: u16, duration: u16, longest_int_time: u16) -> Self {
        Self {
            start,
            mds_type,
            state_id,
            duration,
            longest_int_time,
            clusters: Vec::new(),
            attached: true,
            corners: [(0, 0); 4],
        }
    }

    pub fn cluster(mut self, cluster: ClusterSpec) -> Self {
        self.clusters.push(cluster);
        self
    }

    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }

    fn put(&self, buf: &mut BytesMut) {
        let start = buf.len();
        self.start.put(buf);
        buf.put_u8(if self.attached { 0 } else { 1 });
        buf.put_u8(0);
        buf.put_f32(0.5);
        buf.put_u16(self.mds_type as u16);
        buf.put_u16(self.state_id);
        buf.put_u16(self.duration);
        buf.put_u16(self.longest_int_time);
        buf.put_u16(self.clusters.len() as u16);
        for c in &self.clusters {
            c.put(buf);
        }
        buf.put_bytes(0, (MAX_CLUSTERS - self.clusters.len()) * 17);
        buf.put_u8(self.mds_type);
        // num_aux, num_pmd, num_int, int_times, num_polar, total_polar
        buf.put_bytes(0, 2 + 2 + 2 + 128 + 128 + 2);
        buf.put_u16(1);
        buf.put_u32(0);
        debug_assert_eq!(buf.len() - start, STATE_SIZE);
    }

    fn put_geolocation(&self, buf: &mut BytesMut) {
        self.start.put(buf);
        buf.put_u8(if self.attached { 0 } else { 1 });
        for (lat, lon) in self.corners {
            buf.put_i32(lat);
            buf.put_i32(lon);
        }
    }
}

/// Geometry of a measurement record's geolocation entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
    Nadir,
    Limb,
    Calibration,
}

impl Geometry {
    pub fn for_mds_type(mds_type: u8) -> Self {
        match mds_type {
            NADIR => Self::Nadir,
            LIMB | OCCULTATION => Self::Limb,
            _ => Self::Calibration,
        }
    }

    pub fn record_size(&self) -> usize {
        match self {
            Self::Nadir => 108,
            Self::Limb => 112,
            Self::Calibration => 20,
        }
    }
}

/// One geolocation entry. The coordinate goes to the sub-satellite point
/// and to the footprint fields of the geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoSpec {
    pub pos_esm: f32,
    pub lat: i32,
    pub lon: i32,
}

impl GeoSpec {
    pub fn new(pos_esm: f32, lat: i32, lon: i32) -> Self {
        Self { pos_esm, lat, lon }
    }

    fn put(&self, geometry: Geometry, buf: &mut BytesMut) {
        let coord = |buf: &mut BytesMut| {
            buf.put_i32(self.lat);
            buf.put_i32(self.lon);
        };
        match geometry {
            Geometry::Nadir => {
                buf.put_f32(self.pos_esm);
                buf.put_f32(800.0);
                buf.put_f32(6371.0);
                buf.put_bytes(0, 12 * 4);
                coord(buf);
                for _ in 0..5 {
                    coord(buf);
                }
            }
            Geometry::Limb => {
                buf.put_f32(self.pos_esm);
                buf.put_f32(0.0);
                buf.put_bytes(0, 12 * 4);
                buf.put_f32(800.0);
                buf.put_f32(6371.0);
                for _ in 0..4 {
                    coord(buf);
                }
                buf.put_bytes(0, 3 * 4);
                buf.put_f32(0.0);
            }
            Geometry::Calibration => {
                buf.put_f32(self.pos_esm);
                buf.put_f32(0.0);
                buf.put_f32(0.0);
                coord(buf);
            }
        }
    }
}

/// Geolocation entries along a track, one per readout.
pub fn geo_track(track: &[(i32, i32)]) -> Vec<GeoSpec> {
    track
        .iter()
        .enumerate()
        .map(|(i, &(lat, lon))| GeoSpec::new(i as f32, lat, lon))
        .collect()
}

/// One cluster record of a measurement dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRecord {
    pub time: Stamp,
    pub mds_type: u8,
    pub state_id: u16,
    pub cluster_id: u16,
    pub pixel_ids: Vec<u16>,
    pub wavelength: Vec<f32>,
    pub wavelength_error: Vec<f32>,
    /// `num_obs * pixels`, readout-major.
    pub signal: Vec<f32>,
    pub signal_error: Vec<f32>,
    /// One entry per readout.
    pub geolocation: Vec<GeoSpec>,
}

impl ClusterRecord {
    /// Record for `cluster` of `state` with `num_obs` readouts.
    ///
    /// Pixel ids follow the cluster span, wavelengths are taken from
    /// `grid` and signals are filled by `signal(obs, pixel)` with a unit
    /// error. Geolocation entries sit on the equator, one micro-degree
    /// apart.
    pub fn synthetic(
        state: &StateSpec,
        cluster: &ClusterSpec,
        num_obs: usize,
        grid: &[f32],
        signal: impl Fn(usize, usize) -> f32,
    ) -> Self {
        let pixel_ids: Vec<u16> = (cluster.start_pixel..cluster.start_pixel + cluster.length).collect();
        let n = pixel_ids.len();
        let mut values = Vec::with_capacity(num_obs * n);
        for obs in 0..num_obs {
            for pix in 0..n {
                values.push(signal(obs, pix));
            }
        }
        Self {
            time: state.start,
            mds_type: state.mds_type,
            state_id: state.state_id,
            cluster_id: cluster.id as u16,
            wavelength: pixel_ids.iter().map(|&p| grid[p as usize]).collect(),
            wavelength_error: vec![0.01; n],
            pixel_ids,
            signal: values,
            signal_error: vec![1.0; num_obs * n],
            geolocation: (0..num_obs)
                .map(|i| GeoSpec::new(i as f32, 0, i as i32 * 1_000))
                .collect(),
        }
    }

    pub fn with_geolocation(mut self, geolocation: Vec<GeoSpec>) -> Self {
        self.geolocation = geolocation;
        self
    }

    pub fn num_obs(&self) -> usize {
        self.geolocation.len()
    }

    fn put(&self, buf: &mut BytesMut) {
        let geometry = Geometry::for_mds_type(self.mds_type);
        self.time.put(buf);
        buf.put_i8(0);
        buf.put_f32(0.5);
        buf.put_u16(self.mds_type as u16);
        buf.put_u16(self.state_id);
        buf.put_u16(self.cluster_id);
        buf.put_u16(self.num_obs() as u16);
        buf.put_u16(self.pixel_ids.len() as u16);
        buf.put_u8(0);
        for &p in &self.pixel_ids {
            buf.put_u16(p);
        }
        for v in self
            .wavelength
            .iter()
            .chain(&self.wavelength_error)
            .chain(&self.signal)
            .chain(&self.signal_error)
        {
            buf.put_f32(*v);
        }
        for g in &self.geolocation {
            g.put(geometry, buf);
        }
    }
}

/// One PMD record: `values.len() / 7` samples over the state.
#[derive(Debug, Clone, PartialEq)]
pub struct PmdRecordSpec {
    pub time: Stamp,
    pub mds_type: u8,
    pub state_id: u16,
    pub duration: u16,
    pub values: Vec<f32>,
    pub geolocation: Vec<GeoSpec>,
}

impl PmdRecordSpec {
    /// Record for `state` with `samples` samples; sample `s` carries the
    /// value `s` on every PMD channel.
    pub fn synthetic(state: &StateSpec, samples: usize) -> Self {
        Self {
            time: state.start,
            mds_type: state.mds_type,
            state_id: state.state_id,
            duration: state.duration,
            values: (0..samples)
                .flat_map(|s| std::iter::repeat(s as f32).take(NUM_PMD))
                .collect(),
            geolocation: vec![GeoSpec::default(); samples],
        }
    }

    fn put(&self, buf: &mut BytesMut) {
        let geometry = Geometry::for_mds_type(self.mds_type);
        self.time.put(buf);
        buf.put_i8(0);
        buf.put_f32(0.5);
        buf.put_u16(self.mds_type as u16);
        buf.put_u16(self.state_id);
        buf.put_u16(self.duration);
        buf.put_u16(self.values.len() as u16);
        buf.put_u16(self.geolocation.len() as u16);
        buf.put_u8(0);
        for v in &self.values {
            buf.put_f32(*v);
        }
        for g in &self.geolocation {
            g.put(geometry, buf);
        }
    }
}

struct Dataset {
    bytes: BytesMut,
    num_dsr: usize,
    dsr_size: i64,
}

impl Dataset {
    fn empty() -> Self {
        Self {
            bytes: BytesMut::new(),
            num_dsr: 0,
            dsr_size: 0,
        }
    }
}

/// Build a minimal Level-1C product.
///
/// # Example
///
/// ```ignore
/// let state = StateSpec::new(Stamp::new(1462, 34_761, 0), NADIR, 1, 64, 16)
///     .cluster(ClusterSpec::new(0, 1, 0, 8, 1));
/// let product = L1cProductBuilder::new().state(state).write_temp();
/// ```
pub struct L1cProductBuilder {
    product: String,
    software_ver: String,
    abs_orbit: i64,
    l1b_product: String,
    states: Vec<StateSpec>,
    extra_geolocations: usize,
    cluster_masks: Option<[u64; 4]>,
    solar: Vec<(String, Vec<f32>)>,
    records: [Vec<ClusterRecord>; 4],
    pmd: [Vec<PmdRecordSpec>; 3],
}

impl Default for L1cProductBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl L1cProductBuilder {
    pub fn new() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            software_ver: "SCIA/6.03".to_string(),
            abs_orbit: 9804,
            l1b_product: "SCI_NL__1PNPDE20040102_093921_000060632023_00165_09804_0000.N1".to_string(),
            states: Vec::new(),
            extra_geolocations: 0,
            cluster_masks: Some([u64::MAX; 4]),
            solar: Vec::new(),
            records: Default::default(),
            pmd: Default::default(),
        }
    }

    /// Product name; must keep the `SCI_NLC_1P` prefix to be recognised.
    pub fn product_name(mut self, name: &str) -> Self {
        self.product = name.to_string();
        self
    }

    pub fn state(mut self, state: StateSpec) -> Self {
        self.states.push(state);
        self
    }

    pub fn record(mut self, record: ClusterRecord) -> Self {
        let slot = (record.mds_type as usize).saturating_sub(1).min(3);
        self.records[slot].push(record);
        self
    }

    pub fn pmd_record(mut self, record: PmdRecordSpec) -> Self {
        let slot = (record.mds_type as usize).saturating_sub(1).min(2);
        self.pmd[slot].push(record);
        self
    }

    /// Enabled-cluster bitmaps for nadir, limb, occultation, monitoring.
    pub fn cluster_masks(mut self, masks: [u64; 4]) -> Self {
        self.cluster_masks = Some(masks);
        self
    }

    /// Leave out the calibration options dataset.
    pub fn without_calibration_options(mut self) -> Self {
        self.cluster_masks = None;
        self
    }

    /// Write `count` more state geolocation records than states.
    pub fn extra_geolocations(mut self, count: usize) -> Self {
        self.extra_geolocations = count;
        self
    }

    pub fn solar_reference(mut self, id: &str, wavelength: Vec<f32>) -> Self {
        self.solar.push((id.to_string(), wavelength));
        self
    }

    fn states_dataset(&self) -> Dataset {
        let mut bytes = BytesMut::with_capacity(self.states.len() * STATE_SIZE);
        for s in &self.states {
            s.put(&mut bytes);
        }
        Dataset {
            bytes,
            num_dsr: self.states.len(),
            dsr_size: STATE_SIZE as i64,
        }
    }

    fn geolocation_dataset(&self) -> Dataset {
        let count = self.states.len() + self.extra_geolocations;
        let mut bytes = BytesMut::with_capacity(count * STATE_GEO_SIZE);
        for s in &self.states {
            s.put_geolocation(&mut bytes);
        }
        for _ in 0..self.extra_geolocations {
            bytes.put_bytes(0, STATE_GEO_SIZE);
        }
        Dataset {
            bytes,
            num_dsr: count,
            dsr_size: STATE_GEO_SIZE as i64,
        }
    }

    fn calibration_dataset(&self) -> Dataset {
        let Some(masks) = self.cluster_masks else {
            return Dataset::empty();
        };
        let mut bytes = BytesMut::with_capacity(CAL_OPTIONS_SIZE);
        let mut name = self.l1b_product.clone().into_bytes();
        name.resize(62, b' ');
        bytes.put_slice(&name);
        bytes.put_u8(0);
        bytes.put_bytes(0, 16);
        bytes.put_u8(0);
        bytes.put_bytes(0, 24);
        bytes.put_u8(0);
        bytes.put_bytes(0, 20);
        // nadir, limb, occultation, monitoring, pmd, frac_pol
        for _ in 0..6 {
            bytes.put_u8(1);
        }
        // calibration steps
        for _ in 0..7 {
            bytes.put_u8(1);
        }
        for mask in masks {
            bytes.put_u64(mask);
        }
        Dataset {
            bytes,
            num_dsr: 1,
            dsr_size: CAL_OPTIONS_SIZE as i64,
        }
    }

    fn solar_dataset(&self) -> Dataset {
        if self.solar.is_empty() {
            return Dataset::empty();
        }
        let mut bytes = BytesMut::with_capacity(self.solar.len() * SUN_REFERENCE_SIZE);
        for (id, wavelength) in &self.solar {
            let mut raw_id = id.clone().into_bytes();
            raw_id.resize(2, b' ');
            bytes.put_slice(&raw_id[..2]);
            for p in 0..8192 {
                bytes.put_f32(wavelength.get(p).copied().unwrap_or(0.0));
            }
            for p in 0..8192 {
                bytes.put_f32(1000.0 + p as f32);
            }
            // precision, accuracy, etalon
            bytes.put_bytes(0, 3 * 8192 * 4);
            bytes.put_bytes(0, 3 * 4 + 3 * NUM_PMD * 4 + 4);
        }
        Dataset {
            bytes,
            num_dsr: self.solar.len(),
            dsr_size: SUN_REFERENCE_SIZE as i64,
        }
    }

    fn measurement_dataset(records: &[ClusterRecord]) -> Dataset {
        let mut bytes = BytesMut::new();
        for r in records {
            r.put(&mut bytes);
        }
        Dataset {
            num_dsr: if bytes.is_empty() { 0 } else { records.len() },
            bytes,
            dsr_size: -1,
        }
    }

    fn pmd_dataset(records: &[PmdRecordSpec]) -> Dataset {
        let mut bytes = BytesMut::new();
        for r in records {
            r.put(&mut bytes);
        }
        Dataset {
            num_dsr: records.len(),
            bytes,
            dsr_size: -1,
        }
    }

    /// Encode the whole product.
    pub fn build(&self) -> Vec<u8> {
        let datasets = [
            self.states_dataset(),
            self.geolocation_dataset(),
            self.calibration_dataset(),
            self.solar_dataset(),
            Self::measurement_dataset(&self.records[0]),
            Self::measurement_dataset(&self.records[1]),
            Self::measurement_dataset(&self.records[2]),
            Self::measurement_dataset(&self.records[3]),
            Self::pmd_dataset(&self.pmd[0]),
            Self::pmd_dataset(&self.pmd[1]),
            Self::pmd_dataset(&self.pmd[2]),
        ];
        let num_dsd = datasets.len() + 1;

        let sph_fixed = sph_fixed_part(&self.states);
        let sph_size = sph_fixed.len() + num_dsd * DSD_SIZE;

        let mut offset = (MPH_SIZE + sph_size) as u64;
        let mut dsds = Vec::with_capacity(num_dsd * DSD_SIZE);
        for (name, ds) in DATASET_NAMES.iter().zip(&datasets) {
            let size = ds.bytes.len() as u64;
            let at = if size > 0 { offset } else { 0 };
            dsds.extend(descriptor(name, at, size, ds.num_dsr, ds.dsr_size));
            offset += size;
        }
        dsds.extend(pad_block(String::new(), DSD_SIZE));

        let mph = self.mph(offset, sph_size, num_dsd);
        let mut out = Vec::with_capacity(offset as usize);
        out.extend(mph);
        out.extend(sph_fixed);
        out.extend(dsds);
        for ds in &datasets {
            out.extend_from_slice(&ds.bytes);
        }
        out
    }

    fn mph(&self, total: u64, sph_size: usize, num_dsd: usize) -> Vec<u8> {
        let mut text = String::new();
        text.push_str(&format!("PRODUCT=\"{:<62}\"\n", self.product));
        text.push_str("PROC_STAGE=N\n");
        text.push_str("REF_DOC=\"PO-RS-MDA-GS-2009_15_3I\"\n");
        text.push_str("PROC_CENTER=\"PDHS-E\"\n");
        text.push_str("PROC_TIME=\"12-MAR-2004 09:51:37.000000\"\n");
        text.push_str(&format!("SOFTWARE_VER=\"{:<14}\"\n", self.software_ver));
        text.push_str("SENSING_START=\"02-JAN-2004 09:39:21.000000\"\n");
        text.push_str("SENSING_STOP=\"02-JAN-2004 11:19:05.000000\"\n");
        text.push_str("PHASE=2\n");
        text.push_str("CYCLE=+023\n");
        text.push_str("REL_ORBIT=+00165\n");
        text.push_str(&format!("ABS_ORBIT={:+06}\n", self.abs_orbit));
        text.push_str(&format!("TOT_SIZE={:+021}<bytes>\n", total));
        text.push_str(&format!("SPH_SIZE={:+011}<bytes>\n", sph_size));
        text.push_str(&format!("NUM_DSD={:+011}\n", num_dsd));
        text.push_str(&format!("DSD_SIZE={:+011}<bytes>\n", DSD_SIZE));
        text.push_str(&format!("NUM_DATA_SETS={:+011}\n", num_dsd - 1));
        pad_block(text, MPH_SIZE)
    }

    /// Write the product as `<product name>` inside `dir`.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(&self.product);
        let mut file = std::fs::File::create(&path)?;
        file.write_all(&self.build())?;
        Ok(path)
    }

    /// Write the product into a fresh temporary directory.
    pub fn write_temp(&self) -> TempProduct {
        let dir = tempfile::tempdir().expect("Failed to create temporary product directory");
        let path = self.write_to(dir.path()).expect("Failed to write product");
        TempProduct { dir, path }
    }
}

/// A product file that is removed when dropped.
pub struct TempProduct {
    pub dir: tempfile::TempDir,
    pub path: PathBuf,
}

impl TempProduct {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sph_fixed_part(states: &[StateSpec]) -> Vec<u8> {
    let (start, stop) = match (states.first(), states.last()) {
        (Some(a), Some(b)) => (a.corners[0], b.corners[3]),
        _ => ((0, 0), (0, 0)),
    };
    let mut text = String::new();
    text.push_str("SPH_DESCRIPTOR=\"SCI_NLC_1P SPECIFIC HEADER \"\n");
    text.push_str(&format!("START_LAT={:+011}<10-6degN>\n", start.0));
    text.push_str(&format!("START_LONG={:+011}<10-6degE>\n", start.1));
    text.push_str(&format!("STOP_LAT={:+011}<10-6degN>\n", stop.0));
    text.push_str(&format!("STOP_LONG={:+011}<10-6degE>\n", stop.1));
    text.into_bytes()
}

fn descriptor(name: &str, offset: u64, size: u64, num_dsr: usize, dsr_size: i64) -> Vec<u8> {
    let ds_type = match name {
        "STATES" | "GEOLOCATION" | "CAL_OPTIONS" | "SUN_REFERENCE" => "G",
        _ => "M",
    };
    let mut text = String::new();
    text.push_str(&format!("DS_NAME=\"{:<28}\"\n", name));
    text.push_str(&format!("DS_TYPE={}\n", ds_type));
    text.push_str(&format!("FILENAME=\"{:<62}\"\n", ""));
    text.push_str(&format!("DS_OFFSET={:+021}<bytes>\n", offset));
    text.push_str(&format!("DS_SIZE={:+021}<bytes>\n", size));
    text.push_str(&format!("NUM_DSR={:+011}\n", if size > 0 { num_dsr } else { 0 }));
    text.push_str(&format!("DSR_SIZE={:+011}<bytes>\n", if size > 0 { dsr_size } else { 0 }));
    pad_block(text, DSD_SIZE)
}

// Pad with a trailing blank line so the block is exactly `width` bytes.
fn pad_block(text: String, width: usize) -> Vec<u8> {
    let mut bytes = text.into_bytes();
    assert!(bytes.len() < width, "header block longer than {} bytes", width);
    bytes.resize(width - 1, b' ');
    bytes.push(b'\n');
    bytes
}
