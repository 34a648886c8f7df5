//! Wavelength windows and their pixel ranges.
//!
//! A window `[a, b]` on channel `k` selects the pixels `[p0, p1)` of
//! that channel's block of the wavelength grid where `p0` is the last
//! pixel with `G[p0] <= a` and `p1` the first pixel with `G[p1] > b`.
//! Windows without a channel are resolved against every channel they
//! intersect and the per-channel ranges are united.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::codec::layouts::{MAX_CLUSTERS, NUM_PIXELS};
use crate::error::{L1cError, L1cResult};

pub const NUM_CHANNELS: u8 = 8;
pub const PIXELS_PER_CHANNEL: usize = 1024;

/// Nominal wavelength coverage of each channel in nm, used when the
/// product has no solar reference.
const NOMINAL_RANGES: [(f32, f32); NUM_CHANNELS as usize] = [
    (214.0, 334.0),
    (300.0, 412.0),
    (383.0, 628.0),
    (595.0, 812.0),
    (773.0, 1063.0),
    (971.0, 1773.0),
    (1934.0, 2044.0),
    (2259.0, 2386.0),
];

/// Wavelength of every detector pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct WavelengthGrid {
    values: Vec<f32>,
}

impl WavelengthGrid {
    pub fn from_values(values: Vec<f32>) -> L1cResult<Self> {
        if values.len() != NUM_PIXELS {
            return Err(L1cError::TruncatedRecord {
                aggregate: "wavelength grid",
                expected: NUM_PIXELS,
                available: values.len(),
            });
        }
        Ok(Self { values })
    }

    /// Linear grid over the nominal channel ranges.
    pub fn nominal() -> Self {
        let mut values = Vec::with_capacity(NUM_PIXELS);
        for (lo, hi) in NOMINAL_RANGES {
            let step = (hi - lo) / (PIXELS_PER_CHANNEL - 1) as f32;
            values.extend((0..PIXELS_PER_CHANNEL).map(|i| lo + step * i as f32));
        }
        Self { values }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn wavelength(&self, pixel: usize) -> Option<f32> {
        self.values.get(pixel).copied()
    }

    /// Pixels of a channel (1-based).
    pub fn channel_block(&self, channel: u8) -> Option<&[f32]> {
        if channel == 0 || channel > NUM_CHANNELS {
            return None;
        }
        let start = (channel as usize - 1) * PIXELS_PER_CHANNEL;
        Some(&self.values[start..start + PIXELS_PER_CHANNEL])
    }
}

/// Requested wavelength interval in nm, optionally tied to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WavelengthWindow {
    pub lambda_min: f64,
    pub lambda_max: f64,
    #[serde(default)]
    pub channel: Option<u8>,
}

impl WavelengthWindow {
    pub fn new(lambda_min: f64, lambda_max: f64) -> Self {
        Self {
            lambda_min,
            lambda_max,
            channel: None,
        }
    }

    pub fn on_channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    fn out_of_range(&self) -> L1cError {
        L1cError::OutOfRange {
            lambda_min: self.lambda_min,
            lambda_max: self.lambda_max,
            channel: self.channel,
        }
    }
}

/// What the caller asks to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSpec {
    /// Absolute pixel range `[start, end)`.
    Pixels { start: u16, end: u16 },
    /// Ordered, non-overlapping wavelength windows.
    Wavelengths(Vec<WavelengthWindow>),
    /// Whole clusters by id.
    Clusters(Vec<u8>),
}

/// Half-open absolute pixel range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelWindow {
    pub start: usize,
    pub end: usize,
    /// Only clusters of this channel may use the window.
    pub channel: Option<u8>,
}

impl PixelWindow {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Overlap with `[start, end)`, if any.
    pub fn intersect(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let lo = self.start.max(start);
        let hi = self.end.min(end);
        (lo < hi).then_some((lo, hi))
    }
}

/// Validated selection handed to the planner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedWindows {
    /// `None` selects every pixel of the chosen clusters.
    pub windows: Option<Vec<PixelWindow>>,
    /// Explicit cluster restriction.
    pub clusters: Option<Vec<u8>>,
}

/// Maps wavelength windows onto a grid.
#[derive(Debug, Clone, Copy)]
pub struct WindowSelector<'g> {
    grid: &'g WavelengthGrid,
}

impl<'g> WindowSelector<'g> {
    pub fn new(grid: &'g WavelengthGrid) -> Self {
        Self { grid }
    }

    /// Pixel range of one window.
    pub fn select(&self, window: &WavelengthWindow) -> L1cResult<PixelWindow> {
        if !(window.lambda_min <= window.lambda_max) {
            return Err(L1cError::invalid_window(format!(
                "lambda_min {} exceeds lambda_max {}",
                window.lambda_min, window.lambda_max
            )));
        }
        match window.channel {
            Some(ch) => {
                let block = self.grid.channel_block(ch).ok_or_else(|| {
                    L1cError::invalid_window(format!("channel {} is not in 1..={}", ch, NUM_CHANNELS))
                })?;
                let base = (ch as usize - 1) * PIXELS_PER_CHANNEL;
                let (p0, p1) = block_range(block, window.lambda_min, window.lambda_max)
                    .ok_or_else(|| window.out_of_range())?;
                Ok(PixelWindow {
                    start: base + p0,
                    end: base + p1,
                    channel: Some(ch),
                })
            }
            None => {
                let mut united: Option<(usize, usize)> = None;
                for ch in 1..=NUM_CHANNELS {
                    let Some(block) = self.grid.channel_block(ch) else {
                        continue;
                    };
                    let base = (ch as usize - 1) * PIXELS_PER_CHANNEL;
                    if let Some((p0, p1)) = block_range(block, window.lambda_min, window.lambda_max) {
                        let (s, e) = (base + p0, base + p1);
                        united = Some(match united {
                            Some((us, ue)) => (us.min(s), ue.max(e)),
                            None => (s, e),
                        });
                    }
                }
                let (start, end) = united.ok_or_else(|| window.out_of_range())?;
                Ok(PixelWindow {
                    start,
                    end,
                    channel: None,
                })
            }
        }
    }

    /// Validate a request and convert it to pixel windows.
    ///
    /// Wavelength windows that miss the grid are dropped and returned as
    /// soft errors alongside the resolved selection.
    pub fn resolve(&self, spec: &WindowSpec) -> L1cResult<(ResolvedWindows, Vec<L1cError>)> {
        match spec {
            WindowSpec::Pixels { start, end } => {
                let (start, end) = (*start as usize, *end as usize);
                if start >= end || end > NUM_PIXELS {
                    return Err(L1cError::invalid_window(format!(
                        "pixel range [{}, {}) is empty or beyond {}",
                        start, end, NUM_PIXELS
                    )));
                }
                let windows = vec![PixelWindow {
                    start,
                    end,
                    channel: None,
                }];
                Ok((
                    ResolvedWindows {
                        windows: Some(windows),
                        clusters: None,
                    },
                    Vec::new(),
                ))
            }
            WindowSpec::Clusters(ids) => {
                if ids.is_empty() || ids.len() > MAX_CLUSTERS {
                    return Err(L1cError::invalid_window(format!(
                        "cluster list must hold 1..={} ids, got {}",
                        MAX_CLUSTERS,
                        ids.len()
                    )));
                }
                if let Some(bad) = ids.iter().find(|&&id| id as usize >= MAX_CLUSTERS) {
                    return Err(L1cError::invalid_window(format!("cluster id {} out of range", bad)));
                }
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids.dedup();
                Ok((
                    ResolvedWindows {
                        windows: None,
                        clusters: Some(ids),
                    },
                    Vec::new(),
                ))
            }
            WindowSpec::Wavelengths(list) => {
                validate_wavelengths(list)?;
                let mut windows = Vec::with_capacity(list.len());
                let mut rejected = Vec::new();
                for w in list {
                    match self.select(w) {
                        Ok(pw) => windows.push(pw),
                        Err(e) if !e.is_fatal() => {
                            warn!(error = %e, "Dropping wavelength window");
                            rejected.push(e);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok((
                    ResolvedWindows {
                        windows: Some(windows),
                        clusters: None,
                    },
                    rejected,
                ))
            }
        }
    }
}

fn validate_wavelengths(list: &[WavelengthWindow]) -> L1cResult<()> {
    if list.is_empty() {
        return Err(L1cError::invalid_window("no wavelength windows given"));
    }
    if list.len() > MAX_CLUSTERS {
        return Err(L1cError::invalid_window(format!(
            "{} windows exceed the limit of {}",
            list.len(),
            MAX_CLUSTERS
        )));
    }
    for w in list {
        if !w.lambda_min.is_finite() || !w.lambda_max.is_finite() || w.lambda_min > w.lambda_max {
            return Err(L1cError::invalid_window(format!(
                "window [{}, {}] is not an ordered interval",
                w.lambda_min, w.lambda_max
            )));
        }
    }
    for pair in list.windows(2) {
        if pair[1].lambda_min <= pair[0].lambda_max {
            return Err(L1cError::invalid_window(format!(
                "windows [{}, {}] and [{}, {}] are not strictly increasing",
                pair[0].lambda_min, pair[0].lambda_max, pair[1].lambda_min, pair[1].lambda_max
            )));
        }
    }
    Ok(())
}

/// Apply the boundary law within one channel block.
///
/// Descending blocks are handled by resolving against the reversed block.
fn block_range(block: &[f32], a: f64, b: f64) -> Option<(usize, usize)> {
    let n = block.len();
    if n == 0 {
        return None;
    }
    if block[0] as f64 > block[n - 1] as f64 {
        let reversed: Vec<f32> = block.iter().rev().copied().collect();
        let (q0, q1) = ascending_range(&reversed, a, b)?;
        return Some((n - q1, n - q0));
    }
    ascending_range(block, a, b)
}

fn ascending_range(block: &[f32], a: f64, b: f64) -> Option<(usize, usize)> {
    let n = block.len();
    if a > block[n - 1] as f64 {
        return None;
    }
    let p1 = block.partition_point(|&g| g as f64 <= b);
    if p1 == 0 {
        return None;
    }
    let p0 = block.partition_point(|&g| g as f64 <= a).saturating_sub(1);
    (p0 < p1).then_some((p0, p1))
}
