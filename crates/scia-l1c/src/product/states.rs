//! State table and state geolocation.

use serde::Serialize;

use crate::category::MeasurementCategory;
use crate::codec::layouts::{MAX_CLUSTERS, NUM_PIXELS, STATE, STATE_GEOLOCATION};
use crate::codec::NativeView;
use crate::error::{L1cError, L1cResult};
use crate::geolocation::Coord;
use crate::time::Mjd;

/// State durations and integration times are counted in 1/16 s.
pub const TICK_SECONDS: f64 = 1.0 / 16.0;

/// Readout configuration of one cluster within a state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterDefinition {
    pub id: u8,
    pub channel: u8,
    /// First absolute pixel (0..8192).
    pub start_pixel: u16,
    pub length: u16,
    pub pet: f32,
    pub int_time: u16,
    pub coadd: u16,
    /// Native readouts per longest integration time.
    pub n_read: u16,
    pub data_type: u8,
}

impl ClusterDefinition {
    fn from_view(view: NativeView<'_>) -> Self {
        Self {
            id: view.u8("id"),
            channel: view.u8("channel"),
            start_pixel: view.u16("start_pixel"),
            length: view.u16("length"),
            pet: view.f32("pet"),
            int_time: view.u16("int_time"),
            coadd: view.u16("coadd"),
            n_read: view.u16("n_read"),
            data_type: view.u8("data_type"),
        }
    }

    /// One past the last absolute pixel.
    pub fn end_pixel(&self) -> u16 {
        self.start_pixel.saturating_add(self.length)
    }
}

/// One entry of the state table, joined with its geolocation.
#[derive(Debug, Clone, Serialize)]
pub struct State {
    /// Position in the on-disk state table.
    pub index: usize,
    pub start: Mjd,
    pub reason_code: u8,
    pub orbit_phase: f32,
    pub category: MeasurementCategory,
    pub category_code: u16,
    pub state_id: u16,
    /// Declared duration in 1/16 s.
    pub duration: u16,
    /// Longest integration time in 1/16 s.
    pub longest_int_time: u16,
    pub clusters: Vec<ClusterDefinition>,
    pub num_dsr: u16,
    pub length_dsr: u32,
    pub corners: [Coord; 4],
}

impl State {
    pub fn duration_seconds(&self) -> f64 {
        self.duration as f64 * TICK_SECONDS
    }

    pub fn longest_int_seconds(&self) -> f64 {
        self.longest_int_time as f64 * TICK_SECONDS
    }

    pub fn cluster(&self, id: u8) -> Option<&ClusterDefinition> {
        self.clusters.iter().find(|c| c.id == id)
    }
}

/// Decode one state record. Detached states (not delivered in this
/// product) yield `None` without validating the rest of the record.
pub(crate) fn decode_state(index: usize, raw: &mut [u8]) -> L1cResult<Option<State>> {
    let view = STATE.decode(raw)?;
    // 0 marks an attached state
    if view.u8("attached") != 0 {
        return Ok(None);
    }

    let mds_type = view.u8("mds_type");
    let category = MeasurementCategory::from_mds_type(mds_type).ok_or_else(|| {
        L1cError::header("STATES", format!("state #{}: unknown MDS type {}", index, mds_type))
    })?;

    let num_clusters = view.u16("num_clusters") as usize;
    if num_clusters > MAX_CLUSTERS {
        return Err(L1cError::header(
            "STATES",
            format!("state #{} declares {} clusters (max {})", index, num_clusters, MAX_CLUSTERS),
        ));
    }
    let clusters: Vec<_> = (0..num_clusters)
        .map(|i| ClusterDefinition::from_view(view.nested("clusters", i)))
        .collect();
    check_cluster_spans(index, &clusters)?;

    Ok(Some(State {
        index,
        start: view.mjd("mjd"),
        reason_code: view.u8("reason_code"),
        orbit_phase: view.f32("orbit_phase"),
        category,
        category_code: view.u16("category"),
        state_id: view.u16("state_id"),
        duration: view.u16("duration"),
        longest_int_time: view.u16("longest_int_time"),
        clusters,
        num_dsr: view.u16("num_dsr"),
        length_dsr: view.u32("length_dsr"),
        corners: [Coord::default(); 4],
    }))
}

fn check_cluster_spans(index: usize, clusters: &[ClusterDefinition]) -> L1cResult<()> {
    let mut spans: Vec<_> = clusters.iter().map(|c| (c.start_pixel, c.end_pixel(), c.id)).collect();
    spans.sort_unstable();
    for (start, end, id) in &spans {
        if *end as usize > NUM_PIXELS || start > end {
            return Err(L1cError::header(
                "STATES",
                format!("state #{}: cluster {} spans {}..{}", index, id, start, end),
            ));
        }
    }
    for pair in spans.windows(2) {
        if pair[1].0 < pair[0].1 {
            return Err(L1cError::header(
                "STATES",
                format!("state #{}: clusters {} and {} overlap", index, pair[0].2, pair[1].2),
            ));
        }
    }
    Ok(())
}

/// Geolocation corners of a state.
pub(crate) struct StateGeolocation {
    pub start: Mjd,
    pub corners: [Coord; 4],
}

pub(crate) fn decode_state_geolocation(raw: &mut [u8]) -> L1cResult<StateGeolocation> {
    let view = STATE_GEOLOCATION.decode(raw)?;
    Ok(StateGeolocation {
        start: view.mjd("mjd"),
        corners: std::array::from_fn(|i| Coord::from_view(view.nested("corners", i))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::layouts::CLUSTER_CONFIG;

    fn state_bytes(mds_type: u8, attached: u8, clusters: &[(u8, u16, u16)]) -> Vec<u8> {
        let mut raw = vec![0u8; STATE.size];
        raw[0..4].copy_from_slice(&1500i32.to_be_bytes());
        raw[12] = attached;
        raw[20..22].copy_from_slice(&8u16.to_be_bytes());
        raw[22..24].copy_from_slice(&16u16.to_be_bytes());
        raw[26..28].copy_from_slice(&(clusters.len() as u16).to_be_bytes());
        for (i, (channel, start, len)) in clusters.iter().enumerate() {
            let at = 28 + i * CLUSTER_CONFIG.size;
            raw[at] = i as u8;
            raw[at + 1] = *channel;
            raw[at + 2..at + 4].copy_from_slice(&start.to_be_bytes());
            raw[at + 4..at + 6].copy_from_slice(&len.to_be_bytes());
        }
        raw[1116] = mds_type;
        raw
    }

    #[test]
    fn test_decode_attached_nadir_state() {
        let mut raw = state_bytes(1, 0, &[(1, 0, 552), (1, 552, 472)]);
        let s = decode_state(3, &mut raw).unwrap().expect("attached state");
        assert_eq!(s.index, 3);
        assert_eq!(s.category, MeasurementCategory::Nadir);
        assert_eq!(s.state_id, 8);
        assert_eq!(s.duration_seconds(), 1.0);
        assert_eq!(s.start, Mjd::new(1500, 0, 0));
        assert_eq!(s.clusters.len(), 2);
        assert_eq!(s.cluster(1).unwrap().end_pixel(), 1024);
    }

    #[test]
    fn test_detached_flag() {
        let mut raw = state_bytes(2, 1, &[]);
        assert!(decode_state(0, &mut raw).unwrap().is_none());
    }

    #[test]
    fn test_detached_state_is_not_validated() {
        // unknown MDS type and overlapping clusters
        let mut raw = state_bytes(9, 1, &[(1, 0, 600), (1, 552, 472)]);
        assert!(decode_state(0, &mut raw).unwrap().is_none());
    }

    #[test]
    fn test_overlapping_clusters_rejected() {
        let mut raw = state_bytes(1, 0, &[(1, 0, 600), (1, 552, 472)]);
        assert!(matches!(
            decode_state(0, &mut raw),
            Err(L1cError::HeaderParseError { section: "STATES", .. })
        ));
    }

    #[test]
    fn test_unknown_mds_type_rejected() {
        let mut raw = state_bytes(9, 0, &[]);
        assert!(decode_state(0, &mut raw).is_err());
    }
}
