//! PMD records.
//!
//! One record per state holds the PMD samples recorded during the state,
//! seven values per sample, evenly spread over the state duration.

use std::io::{Read, Seek, SeekFrom};

use tracing::trace;

use crate::category::MeasurementCategory;
use crate::codec::layouts::{NUM_PMD, PMD_HEADER};
use crate::codec::{decode_array, read_exact_or_truncated};
use crate::error::{L1cError, L1cResult};
use crate::geolocation::{Geolocation, GeometryKind};
use crate::header::DatasetDescriptor;
use crate::product::TICK_SECONDS;
use crate::time::Mjd;

#[derive(Debug, Clone, PartialEq)]
pub struct PmdRecord {
    pub time: Mjd,
    pub state_id: u16,
    /// State duration in 1/16 s.
    pub duration: u16,
    /// `samples * 7` values, sample-major.
    pub values: Vec<f32>,
    pub geolocation: Vec<Geolocation>,
}

impl PmdRecord {
    pub fn samples(&self) -> usize {
        self.values.len() / NUM_PMD
    }

    /// Values of samples starting in `[start, end)` seconds after the state start.
    pub fn samples_between(&self, start: f64, end: f64) -> Vec<f32> {
        let n = self.samples();
        if n == 0 || self.duration == 0 {
            return Vec::new();
        }
        let step = self.duration as f64 * TICK_SECONDS / n as f64;
        let first = ((start / step) - 1e-9).ceil().max(0.0) as usize;
        let last = (((end / step) - 1e-9).ceil().max(0.0) as usize).min(n);
        if first >= last {
            return Vec::new();
        }
        self.values[first * NUM_PMD..last * NUM_PMD].to_vec()
    }
}

/// Forward-only reader over a category's PMD dataset.
#[derive(Debug, Clone)]
pub struct PmdReader {
    geometry: GeometryKind,
    end: u64,
    cursor: u64,
}

impl PmdReader {
    pub fn new(descriptor: &DatasetDescriptor, category: MeasurementCategory) -> Self {
        Self {
            geometry: category.profile().geometry(),
            end: descriptor.offset + descriptor.size,
            cursor: descriptor.offset,
        }
    }

    /// Record for the state starting at `time`, if the dataset has one.
    pub fn find<R: Read + Seek>(&mut self, file: &mut R, time: Mjd) -> L1cResult<Option<PmdRecord>> {
        while self.cursor + PMD_HEADER.size as u64 <= self.end {
            file.seek(SeekFrom::Start(self.cursor))?;
            let mut raw = read_exact_or_truncated(file, PMD_HEADER.size, PMD_HEADER.name)?;
            let view = PMD_HEADER.decode(&mut raw)?;
            let record_time = view.mjd("mjd");
            let num_pmd = view.u16("num_pmd") as usize;
            let num_geo = view.u16("num_geo") as usize;
            let body_len = num_pmd * 4 + num_geo * self.geometry.record_size();

            if record_time > time {
                return Ok(None);
            }
            let body_start = self.cursor + PMD_HEADER.size as u64;
            self.cursor = body_start + body_len as u64;
            if record_time < time {
                trace!(time = %record_time, "Skipping PMD record");
                continue;
            }
            if self.cursor > self.end {
                return Err(L1cError::TruncatedRecord {
                    aggregate: "PMD record",
                    expected: body_len,
                    available: self.end.saturating_sub(body_start) as usize,
                });
            }
            let mut body = read_exact_or_truncated(file, body_len, "PMD record")?;
            let (values, geo) = body.split_at_mut(num_pmd * 4);
            return Ok(Some(PmdRecord {
                time: record_time,
                state_id: view.u16("state_id"),
                duration: view.u16("duration"),
                values: decode_array(values, num_pmd, "PMD values")?,
                geolocation: self.geometry.decode_many(geo, num_geo)?,
            }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(seconds: u32, samples: usize) -> PmdRecord {
        PmdRecord {
            time: Mjd::new(1500, seconds, 0),
            state_id: 1,
            duration: 16,
            values: (0..samples * NUM_PMD).map(|v| v as f32).collect(),
            geolocation: Vec::new(),
        }
    }

    #[test]
    fn test_samples_between_uses_start_times() {
        // 1 s state with 4 samples at 0, 0.25, 0.5, 0.75 s
        let r = record(0, 4);
        assert_eq!(r.samples(), 4);
        assert_eq!(r.samples_between(0.0, 0.5).len(), 2 * NUM_PMD);
        assert_eq!(r.samples_between(0.5, 1.0)[0], (2 * NUM_PMD) as f32);
        assert_eq!(r.samples_between(0.1, 0.2).len(), 0);
        assert_eq!(r.samples_between(0.9, 5.0).len(), 0);
        assert_eq!(r.samples_between(0.0, 5.0).len(), 4 * NUM_PMD);
    }

    #[test]
    fn test_empty_record() {
        assert!(record(0, 0).samples_between(0.0, 1.0).is_empty());
    }
}
