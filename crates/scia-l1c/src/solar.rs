//! Solar reference spectra and their cache.

use std::io::{Read, Seek, SeekFrom};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use serde::Serialize;
use tracing::debug;

use crate::codec::layouts::{NUM_PMD, SUN_REFERENCE};
use crate::codec::read_exact_or_truncated;
use crate::error::{L1cError, L1cResult};
use crate::header::DatasetDescriptor;

/// One solar reference spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarReference {
    pub id: String,
    pub wavelength: Vec<f32>,
    pub mean_ref_spec: Vec<f32>,
    pub precision: Vec<f32>,
    pub accuracy: Vec<f32>,
    pub etalon: Vec<f32>,
    pub avg_azi: f32,
    pub avg_ele: f32,
    pub avg_sun_ele: f32,
    pub mean_pmd: [f32; NUM_PMD],
    pub pmd_nd_out: [f32; NUM_PMD],
    pub pmd_nd_in: [f32; NUM_PMD],
    pub doppler: f32,
}

impl SolarReference {
    pub fn decode(raw: &mut [u8]) -> L1cResult<Self> {
        let view = SUN_REFERENCE.decode(raw)?;
        Ok(Self {
            id: view.ascii("id"),
            wavelength: view.f32_vec("wavelength"),
            mean_ref_spec: view.f32_vec("mean_ref_spec"),
            precision: view.f32_vec("precision"),
            accuracy: view.f32_vec("accuracy"),
            etalon: view.f32_vec("etalon"),
            avg_azi: view.f32("avg_azi"),
            avg_ele: view.f32("avg_ele"),
            avg_sun_ele: view.f32("avg_sun_ele"),
            mean_pmd: view.f32_array("mean_pmd"),
            pmd_nd_out: view.f32_array("pmd_nd_out"),
            pmd_nd_in: view.f32_array("pmd_nd_in"),
            doppler: view.f32("doppler"),
        })
    }

    /// Read the `index`-th record of the solar reference dataset.
    pub fn read_at<R: Read + Seek>(
        file: &mut R,
        descriptor: &DatasetDescriptor,
        index: usize,
    ) -> L1cResult<Self> {
        if index >= descriptor.num_dsr {
            return Err(L1cError::MissingDataset(format!(
                "{} record {} (dataset has {})",
                descriptor.name, index, descriptor.num_dsr
            )));
        }
        let at = descriptor.offset + (index * SUN_REFERENCE.size) as u64;
        file.seek(SeekFrom::Start(at))?;
        let mut raw = read_exact_or_truncated(file, SUN_REFERENCE.size, SUN_REFERENCE.name)?;
        Self::decode(&mut raw)
    }

    /// Find a reference by its two-letter id.
    pub fn find<R: Read + Seek>(file: &mut R, descriptor: &DatasetDescriptor, id: &str) -> L1cResult<Self> {
        for index in 0..descriptor.num_dsr {
            let reference = Self::read_at(file, descriptor, index)?;
            if reference.id == id {
                return Ok(reference);
            }
        }
        Err(L1cError::MissingDataset(format!("{} id {:?}", descriptor.name, id)))
    }
}

/// Cache key: product file name and reference id.
pub type SolarKey = (String, String);

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SolarCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// LRU cache of decoded solar references.
pub struct SolarReferenceCache {
    cache: LruCache<SolarKey, Arc<SolarReference>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SolarReferenceCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            cache: LruCache::new(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached reference or load and insert it.
    pub fn get_or_load<F>(&mut self, product: &str, id: &str, load: F) -> L1cResult<Arc<SolarReference>>
    where
        F: FnOnce() -> L1cResult<SolarReference>,
    {
        let key = (product.to_string(), id.to_string());
        if let Some(hit) = self.cache.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(hit));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(product, id, "Loading solar reference");
        let loaded = Arc::new(load()?);
        self.cache.put(key, Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn stats(&self) -> SolarCacheStats {
        SolarCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::layouts::NUM_PIXELS;

    fn reference(id: &str) -> SolarReference {
        SolarReference {
            id: id.to_string(),
            wavelength: vec![0.0; NUM_PIXELS],
            mean_ref_spec: vec![1.0; NUM_PIXELS],
            precision: Vec::new(),
            accuracy: Vec::new(),
            etalon: Vec::new(),
            avg_azi: 0.0,
            avg_ele: 0.0,
            avg_sun_ele: 0.0,
            mean_pmd: [0.0; NUM_PMD],
            pmd_nd_out: [0.0; NUM_PMD],
            pmd_nd_in: [0.0; NUM_PMD],
            doppler: 0.0,
        }
    }

    #[test]
    fn test_cache_hits_and_misses() {
        let mut cache = SolarReferenceCache::new(NonZeroUsize::new(2).unwrap());
        let a = cache.get_or_load("p.N1", "D0", || Ok(reference("D0"))).unwrap();
        let b = cache
            .get_or_load("p.N1", "D0", || panic!("should be cached"))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_cache_evicts_least_recent() {
        let mut cache = SolarReferenceCache::new(NonZeroUsize::new(1).unwrap());
        cache.get_or_load("p.N1", "D0", || Ok(reference("D0"))).unwrap();
        cache.get_or_load("p.N1", "D1", || Ok(reference("D1"))).unwrap();
        assert_eq!(cache.len(), 1);
        let mut reloaded = false;
        cache
            .get_or_load("p.N1", "D0", || {
                reloaded = true;
                Ok(reference("D0"))
            })
            .unwrap();
        assert!(reloaded);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_failure_is_not_cached() {
        let mut cache = SolarReferenceCache::new(NonZeroUsize::new(2).unwrap());
        let err = cache.get_or_load("p.N1", "XX", || Err(L1cError::MissingDataset("SUN_REFERENCE".into())));
        assert!(err.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_decode_record() {
        let mut raw = vec![0u8; SUN_REFERENCE.size];
        raw[0..2].copy_from_slice(b"D0");
        raw[2..6].copy_from_slice(&240.5f32.to_be_bytes());
        raw[163_938..163_942].copy_from_slice(&0.25f32.to_be_bytes());
        let r = SolarReference::decode(&mut raw).unwrap();
        assert_eq!(r.id, "D0");
        assert_eq!(r.wavelength.len(), NUM_PIXELS);
        assert_eq!(r.wavelength[0], 240.5);
        assert_eq!(r.doppler, 0.25);
    }
}
