//! Measurement data set records.
//!
//! A category's measurement dataset is a sequence of variable-length
//! cluster records, state by state, clusters within a state. Each record
//! is a fixed header followed by pixel ids, wavelengths, wavelength
//! errors, `obs x pixels` signals and errors, and one geolocation record
//! per observation.

use std::io::{Read, Seek, SeekFrom};

use tracing::trace;

use crate::category::MeasurementCategory;
use crate::codec::layouts::{MAX_CLUSTERS, MDS_HEADER};
use crate::codec::{decode_array, read_exact_or_truncated};
use crate::error::{L1cError, L1cResult};
use crate::geolocation::{Geolocation, GeometryKind};
use crate::header::DatasetDescriptor;
use crate::time::Mjd;

/// Fixed header of a cluster record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordHeader {
    pub time: Mjd,
    pub quality: i8,
    pub orbit_phase: f32,
    pub category: u16,
    pub state_id: u16,
    pub cluster_id: u16,
    pub num_obs: u16,
    pub num_pixels: u16,
    pub unit_flag: u8,
}

impl RecordHeader {
    pub fn decode(raw: &mut [u8]) -> L1cResult<Self> {
        let view = MDS_HEADER.decode(raw)?;
        Ok(Self {
            time: view.mjd("mjd"),
            quality: view.i8("quality"),
            orbit_phase: view.f32("orbit_phase"),
            category: view.u16("category"),
            state_id: view.u16("state_id"),
            cluster_id: view.u16("cluster_id"),
            num_obs: view.u16("num_obs"),
            num_pixels: view.u16("num_pixels"),
            unit_flag: view.u8("unit_flag"),
        })
    }

    /// Bytes following the header.
    pub fn body_len(&self, geometry: GeometryKind) -> usize {
        let p = self.num_pixels as usize;
        let r = self.num_obs as usize;
        p * (2 + 4 + 4) + 2 * r * p * 4 + r * geometry.record_size()
    }

    /// Total record length including the header.
    pub fn record_len(&self, geometry: GeometryKind) -> usize {
        MDS_HEADER.size + self.body_len(geometry)
    }
}

/// Decoded cluster record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterData {
    pub header: RecordHeader,
    pub pixel_ids: Vec<u16>,
    pub wavelength: Vec<f32>,
    pub wavelength_error: Vec<f32>,
    /// `num_obs * num_pixels` values, observation-major.
    pub signal: Vec<f32>,
    pub signal_error: Vec<f32>,
    pub geolocation: Vec<Geolocation>,
}

impl ClusterData {
    pub fn cluster_id(&self) -> u8 {
        self.header.cluster_id as u8
    }

    pub fn num_obs(&self) -> usize {
        self.header.num_obs as usize
    }

    pub fn num_pixels(&self) -> usize {
        self.header.num_pixels as usize
    }

    /// Decode the record body that follows `header`.
    pub fn decode(header: RecordHeader, body: &mut [u8], geometry: GeometryKind) -> L1cResult<Self> {
        let p = header.num_pixels as usize;
        let r = header.num_obs as usize;
        let mut at = 0;
        let mut take = |len: usize| {
            let start = at;
            at += len;
            start..at
        };
        let ids = take(p * 2);
        let wl = take(p * 4);
        let wl_err = take(p * 4);
        let sig = take(r * p * 4);
        let err = take(r * p * 4);
        let geo = take(r * geometry.record_size());
        if body.len() < geo.end {
            return Err(L1cError::TruncatedRecord {
                aggregate: "cluster record",
                expected: geo.end,
                available: body.len(),
            });
        }
        Ok(Self {
            header,
            pixel_ids: decode_array(&mut body[ids], p, "pixel ids")?,
            wavelength: decode_array(&mut body[wl], p, "wavelength")?,
            wavelength_error: decode_array(&mut body[wl_err], p, "wavelength error")?,
            signal: decode_array(&mut body[sig], r * p, "signal")?,
            signal_error: decode_array(&mut body[err], r * p, "signal error")?,
            geolocation: geometry.decode_many(&mut body[geo], r)?,
        })
    }
}

/// Where the next record for a cluster was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordSeek {
    /// A record for the cluster at exactly the requested time.
    Found { offset: u64, header: RecordHeader },
    /// The cluster's next record belongs to a later time.
    Ahead { time: Mjd },
    /// No more records for the cluster.
    End,
}

/// Reads cluster records of one category, keeping a cursor per cluster.
#[derive(Debug, Clone)]
pub struct RecordReader {
    category: MeasurementCategory,
    geometry: GeometryKind,
    start: u64,
    end: u64,
    cursors: [u64; MAX_CLUSTERS],
}

impl RecordReader {
    pub fn new(descriptor: &DatasetDescriptor, category: MeasurementCategory) -> Self {
        Self {
            category,
            geometry: category.profile().geometry(),
            start: descriptor.offset,
            end: descriptor.offset + descriptor.size,
            cursors: [descriptor.offset; MAX_CLUSTERS],
        }
    }

    pub fn category(&self) -> MeasurementCategory {
        self.category
    }

    /// Rewind every cluster cursor to the dataset start.
    pub fn reset(&mut self) {
        self.cursors = [self.start; MAX_CLUSTERS];
    }

    fn read_header<R: Read + Seek>(&self, file: &mut R, offset: u64) -> L1cResult<RecordHeader> {
        if offset + MDS_HEADER.size as u64 > self.end {
            return Err(L1cError::TruncatedRecord {
                aggregate: MDS_HEADER.name,
                expected: MDS_HEADER.size,
                available: (self.end - offset) as usize,
            });
        }
        file.seek(SeekFrom::Start(offset))?;
        let mut raw = read_exact_or_truncated(file, MDS_HEADER.size, MDS_HEADER.name)?;
        RecordHeader::decode(&mut raw)
    }

    /// Advance the cluster's cursor to its record for `time`.
    ///
    /// Records of other clusters and of earlier times are skipped. The
    /// cursor is left on the first record at or after `time`.
    pub fn seek_cluster<R: Read + Seek>(&mut self, file: &mut R, cluster_id: u8, time: Mjd) -> L1cResult<RecordSeek> {
        let slot = cluster_id as usize;
        if slot >= MAX_CLUSTERS {
            return Err(L1cError::invalid_operation(format!("cluster id {} out of range", cluster_id)));
        }
        let mut offset = self.cursors[slot];
        while offset < self.end {
            let header = self.read_header(file, offset)?;
            let len = header.record_len(self.geometry) as u64;
            if header.time > time {
                if header.cluster_id == cluster_id as u16 {
                    self.cursors[slot] = offset;
                    return Ok(RecordSeek::Ahead { time: header.time });
                }
                // another cluster of a later state: this cluster has no
                // record at `time` unless one follows in the same state
                let next = self.next_for_cluster(file, offset, cluster_id)?;
                self.cursors[slot] = next.map(|(o, _)| o).unwrap_or(self.end);
                return Ok(match next {
                    Some((_, h)) => RecordSeek::Ahead { time: h.time },
                    None => RecordSeek::End,
                });
            }
            if header.time == time && header.cluster_id == cluster_id as u16 {
                self.cursors[slot] = offset;
                return Ok(RecordSeek::Found { offset, header });
            }
            trace!(offset, cluster = header.cluster_id, "Skipping record");
            offset += len;
        }
        self.cursors[slot] = self.end;
        Ok(RecordSeek::End)
    }

    fn next_for_cluster<R: Read + Seek>(
        &self,
        file: &mut R,
        mut offset: u64,
        cluster_id: u8,
    ) -> L1cResult<Option<(u64, RecordHeader)>> {
        while offset < self.end {
            let header = self.read_header(file, offset)?;
            if header.cluster_id == cluster_id as u16 {
                return Ok(Some((offset, header)));
            }
            offset += header.record_len(self.geometry) as u64;
        }
        Ok(None)
    }

    /// Read the record located by [`RecordReader::seek_cluster`] and move
    /// the cluster's cursor past it.
    pub fn read_cluster<R: Read + Seek>(
        &mut self,
        file: &mut R,
        offset: u64,
        header: RecordHeader,
    ) -> L1cResult<ClusterData> {
        let body_len = header.body_len(self.geometry);
        let body_start = offset + MDS_HEADER.size as u64;
        let available = self.end.saturating_sub(body_start) as usize;
        if available < body_len {
            return Err(L1cError::TruncatedRecord {
                aggregate: "cluster record",
                expected: body_len,
                available,
            });
        }
        file.seek(SeekFrom::Start(body_start))?;
        let mut body = read_exact_or_truncated(file, body_len, "cluster record")?;
        let data = ClusterData::decode(header, &mut body, self.geometry)?;
        let slot = data.cluster_id() as usize;
        if slot < MAX_CLUSTERS {
            self.cursors[slot] = body_start + body_len as u64;
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::layouts::GEO_CAL;
    use crate::header::DescriptorKind;
    use std::io::Cursor;

    fn record(day_seconds: u32, cluster: u16, obs: u16, pixels: &[u16]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&1500i32.to_be_bytes());
        out.extend_from_slice(&day_seconds.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.push(0);
        out.extend_from_slice(&0f32.to_be_bytes());
        out.extend_from_slice(&4u16.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
        out.extend_from_slice(&cluster.to_be_bytes());
        out.extend_from_slice(&obs.to_be_bytes());
        out.extend_from_slice(&(pixels.len() as u16).to_be_bytes());
        out.push(0);
        for p in pixels {
            out.extend_from_slice(&p.to_be_bytes());
        }
        for p in pixels {
            out.extend_from_slice(&(*p as f32).to_be_bytes());
        }
        for _ in pixels {
            out.extend_from_slice(&0.01f32.to_be_bytes());
        }
        for o in 0..obs {
            for p in pixels {
                out.extend_from_slice(&((o * 100 + p) as f32).to_be_bytes());
            }
        }
        for _ in 0..obs as usize * pixels.len() {
            out.extend_from_slice(&1.0f32.to_be_bytes());
        }
        for o in 0..obs {
            let mut geo = vec![0u8; GEO_CAL.size];
            geo[8..12].copy_from_slice(&(o as f32).to_be_bytes());
            out.extend_from_slice(&geo);
        }
        out
    }

    fn dataset(records: &[Vec<u8>]) -> (Cursor<Vec<u8>>, DatasetDescriptor) {
        let prefix = 16usize;
        let mut bytes = vec![0u8; prefix];
        for r in records {
            bytes.extend_from_slice(r);
        }
        let desc = DatasetDescriptor {
            name: "MONITORING".into(),
            ds_type: "M".into(),
            filename: String::new(),
            offset: prefix as u64,
            size: (bytes.len() - prefix) as u64,
            num_dsr: records.len(),
            dsr_size: -1,
            kind: DescriptorKind::Primary(MeasurementCategory::Monitoring),
        };
        (Cursor::new(bytes), desc)
    }

    #[test]
    fn test_record_length_matches_layout() {
        let raw = record(10, 0, 3, &[5, 6]);
        let mut head = raw[..28].to_vec();
        let header = RecordHeader::decode(&mut head).unwrap();
        assert_eq!(header.record_len(GeometryKind::Calibration), raw.len());
    }

    #[test]
    fn test_seek_and_read_clusters_of_state() {
        let (mut file, desc) = dataset(&[
            record(10, 0, 2, &[0, 1]),
            record(10, 1, 1, &[40]),
            record(20, 0, 2, &[0, 1]),
            record(20, 1, 1, &[40]),
        ]);
        let mut reader = RecordReader::new(&desc, MeasurementCategory::Monitoring);
        let t10 = Mjd::new(1500, 10, 0);
        let t20 = Mjd::new(1500, 20, 0);

        let RecordSeek::Found { offset, header } = reader.seek_cluster(&mut file, 1, t10).unwrap() else {
            panic!("cluster 1 not found");
        };
        let data = reader.read_cluster(&mut file, offset, header).unwrap();
        assert_eq!(data.pixel_ids, vec![40]);
        assert_eq!(data.signal, vec![40.0]);

        let RecordSeek::Found { offset, header } = reader.seek_cluster(&mut file, 0, t20).unwrap() else {
            panic!("cluster 0 at t20 not found");
        };
        let data = reader.read_cluster(&mut file, offset, header).unwrap();
        assert_eq!(data.num_obs(), 2);
        assert_eq!(data.signal, vec![0.0, 1.0, 100.0, 101.0]);
        match &data.geolocation[1] {
            Geolocation::Calibration(g) => assert_eq!(g.sun_zen, 1.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_seek_reports_later_record() {
        let (mut file, desc) = dataset(&[record(20, 0, 1, &[0]), record(20, 1, 1, &[40])]);
        let mut reader = RecordReader::new(&desc, MeasurementCategory::Monitoring);
        let seek = reader.seek_cluster(&mut file, 1, Mjd::new(1500, 10, 0)).unwrap();
        assert_eq!(seek, RecordSeek::Ahead { time: Mjd::new(1500, 20, 0) });
        // the cursor stays on the later record
        let seek = reader.seek_cluster(&mut file, 1, Mjd::new(1500, 20, 0)).unwrap();
        assert!(matches!(seek, RecordSeek::Found { .. }));
    }

    #[test]
    fn test_seek_past_end() {
        let (mut file, desc) = dataset(&[record(10, 0, 1, &[0])]);
        let mut reader = RecordReader::new(&desc, MeasurementCategory::Monitoring);
        assert_eq!(
            reader.seek_cluster(&mut file, 3, Mjd::new(1500, 10, 0)).unwrap(),
            RecordSeek::End
        );
    }

    #[test]
    fn test_truncated_dataset() {
        let mut raw = record(10, 0, 2, &[0, 1]);
        raw.truncate(raw.len() - 5);
        let (mut file, desc) = dataset(&[raw]);
        let mut reader = RecordReader::new(&desc, MeasurementCategory::Monitoring);
        let RecordSeek::Found { offset, header } = reader.seek_cluster(&mut file, 0, Mjd::new(1500, 10, 0)).unwrap() else {
            panic!("record not found");
        };
        assert!(matches!(
            reader.read_cluster(&mut file, offset, header),
            Err(L1cError::TruncatedRecord { .. })
        ));
    }
}
