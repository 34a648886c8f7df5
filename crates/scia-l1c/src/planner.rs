//! Per-state cluster and integration-time planning.
//!
//! For each state the planner picks the clusters whose pixels intersect
//! the active windows, orders them by start pixel, and fixes a common
//! target integration time. Each cluster is co-added by the ratio of the
//! target to its own native integration time.

use std::ops::Range;

use serde::Serialize;
use tracing::{debug, warn};

use crate::category::MeasurementCategory;
use crate::coadd::CoaddFactor;
use crate::error::{L1cError, L1cResult};
use crate::product::{ClusterDefinition, State};
use crate::window::ResolvedWindows;

/// How one cluster contributes to the readouts of a state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterPlan {
    pub cluster_id: u8,
    pub channel: u8,
    pub start_pixel: u16,
    pub length: u16,
    /// Selected absolute pixel ranges, ascending and disjoint.
    pub pixel_ranges: Vec<Range<usize>>,
    /// Native integration time in seconds.
    pub native_time: f64,
    #[serde(skip)]
    pub factor: CoaddFactor,
}

impl ClusterPlan {
    pub fn pixel_count(&self) -> usize {
        self.pixel_ranges.iter().map(|r| r.len()).sum()
    }

    pub fn contains_pixel(&self, pixel: usize) -> bool {
        self.pixel_ranges.iter().any(|r| r.contains(&pixel))
    }
}

/// Readout plan for one state.
#[derive(Debug, Clone, Serialize)]
pub struct StatePlan {
    pub state_index: usize,
    pub state_id: u16,
    pub category: MeasurementCategory,
    /// Used clusters, ascending by start pixel.
    pub clusters: Vec<ClusterPlan>,
    /// Index into `clusters` of the reference cluster.
    pub reference: usize,
    /// Integration time of every output readout, seconds.
    pub target_time: f64,
    /// Number of output readouts the state yields.
    pub readouts: usize,
}

impl StatePlan {
    pub fn reference_cluster(&self) -> &ClusterPlan {
        &self.clusters[self.reference]
    }

    pub fn pixel_count(&self) -> usize {
        self.clusters.iter().map(ClusterPlan::pixel_count).sum()
    }
}

/// Inputs the planner needs besides the state.
#[derive(Debug, Clone, Copy)]
pub struct PlanRequest<'a> {
    pub enabled: &'a [u8],
    pub windows: &'a ResolvedWindows,
    pub min_integration_time: Option<f64>,
}

/// Build the plan for `state`.
///
/// Returns [`L1cError::ClusterWindowMismatch`] when no enabled cluster of
/// the state intersects the windows. Clusters whose factor has no
/// whole-number value stay in the plan; the co-add engine rejects them
/// when the first readout is combined.
pub fn plan_state(state: &State, request: &PlanRequest<'_>) -> L1cResult<StatePlan> {
    let profile = state.category.profile();
    let longest = state.longest_int_seconds();

    let mut used: Vec<(&ClusterDefinition, Vec<Range<usize>>)> = state
        .clusters
        .iter()
        .filter(|c| request.enabled.contains(&c.id))
        .filter(|c| match &request.windows.clusters {
            Some(ids) => ids.contains(&c.id),
            None => true,
        })
        .filter(|c| c.n_read > 0 && c.length > 0)
        .filter_map(|c| {
            let span = (c.start_pixel as usize, c.end_pixel() as usize);
            let ranges = match &request.windows.windows {
                None => vec![span.0..span.1],
                Some(windows) => merge(
                    windows
                        .iter()
                        .filter(|w| w.channel.map_or(true, |ch| ch == c.channel))
                        .filter_map(|w| w.intersect(span.0, span.1))
                        .map(|(s, e)| s..e)
                        .collect(),
                ),
            };
            (!ranges.is_empty()).then_some((c, ranges))
        })
        .collect();

    if used.is_empty() {
        return Err(L1cError::ClusterWindowMismatch {
            state_index: state.index,
            state_id: state.state_id,
        });
    }
    used.sort_by_key(|(c, _)| c.start_pixel);

    let native: Vec<f64> = used.iter().map(|(c, _)| longest / c.n_read as f64).collect();
    let mut reference = 0;
    for (i, t) in native.iter().enumerate() {
        if *t > native[reference] {
            reference = i;
        }
    }
    let reference_native = native[reference];
    let target_time = match request.min_integration_time {
        Some(min) if min > reference_native => min,
        _ => reference_native,
    };

    let clusters: Vec<ClusterPlan> = used
        .into_iter()
        .zip(&native)
        .map(|((c, ranges), &t)| ClusterPlan {
            cluster_id: c.id,
            channel: c.channel,
            start_pixel: c.start_pixel,
            length: c.length,
            pixel_ranges: ranges,
            native_time: t,
            factor: CoaddFactor::from_ratio(target_time / t),
        })
        .collect();

    let effective = profile.effective_duration(state.duration_seconds());
    let readouts = ((effective / target_time) + 1e-9).floor() as usize;

    debug!(
        state = state.index,
        state_id = state.state_id,
        clusters = clusters.len(),
        reference = clusters[reference].cluster_id,
        target_time,
        readouts,
        "Planned state"
    );
    if let Some(c) = clusters.iter().find(|c| matches!(c.factor, CoaddFactor::Fractional(_))) {
        warn!(
            state = state.index,
            cluster = c.cluster_id,
            factor = c.factor.value(),
            "Cluster has a fractional co-add factor"
        );
    }

    Ok(StatePlan {
        state_index: state.index,
        state_id: state.state_id,
        category: state.category,
        clusters,
        reference,
        target_time,
        readouts,
    })
}

fn merge(mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.sort_by_key(|r| r.start);
    let mut out: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match out.last_mut() {
            Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
            _ => out.push(r),
        }
    }
    out
}
