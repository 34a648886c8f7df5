//! Streaming readout iterator.
//!
//! Lifecycle:
//!
//! ```text
//! open -> Uninitialized --set_window--> Ready --advance--> Streaming
//!                                                             |
//!                     close (from any state) -> Closed    Exhausted
//! ```
//!
//! States are loaded one at a time: the planner fixes the clusters and
//! target integration time, the record reader fetches each used
//! cluster's record, and every call to [`ReadoutIterator::advance`]
//! co-adds the next slice of native readouts into one [`Readout`].
//! Soft errors skip the offending state and are kept in
//! [`ReadoutIterator::warnings`]; any other error ends the stream.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::category::MeasurementCategory;
use crate::coadd::{CoaddEngine, CoaddRule};
use crate::config::ExtractionConfig;
use crate::error::{L1cError, L1cResult};
use crate::header::DescriptorKind;
use crate::pmd::{PmdReader, PmdRecord};
use crate::planner::{plan_state, PlanRequest, StatePlan};
use crate::product::{Product, State};
use crate::readout::{Provenance, Readout};
use crate::record::{ClusterData, RecordReader, RecordSeek};
use crate::solar::{SolarCacheStats, SolarReference, SolarReferenceCache};
use crate::time::Mjd;
use crate::window::{ResolvedWindows, WavelengthGrid, WindowSelector, WindowSpec};

/// Lifecycle state of a [`ReadoutIterator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    Uninitialized,
    Ready,
    Streaming,
    Exhausted,
    Closed,
}

/// A state whose cluster records are in memory.
struct LoadedState {
    plan: StatePlan,
    start: Mjd,
    clusters: Vec<ClusterData>,
    /// Per used cluster, positions of the selected pixels in its record.
    selections: Vec<Vec<usize>>,
    pmd: Option<PmdRecord>,
    next: usize,
    budget: usize,
}

impl LoadedState {
    fn new(plan: StatePlan, state: &State, clusters: Vec<ClusterData>, pmd: Option<PmdRecord>) -> Self {
        let selections = plan
            .clusters
            .iter()
            .zip(&clusters)
            .map(|(cp, data)| {
                let mut picked: Vec<usize> = (0..data.num_pixels())
                    .filter(|&i| cp.contains_pixel(data.pixel_ids[i] as usize))
                    .collect();
                picked.sort_by_key(|&i| data.pixel_ids[i]);
                picked
            })
            .collect();

        let mut budget = plan.readouts;
        for (cp, data) in plan.clusters.iter().zip(&clusters) {
            if let Some(f) = cp.factor.whole() {
                let available = data.num_obs() / f;
                if available < budget {
                    debug!(
                        state = plan.state_index,
                        cluster = cp.cluster_id,
                        available,
                        planned = budget,
                        "Cluster record holds fewer readouts than planned"
                    );
                    budget = available;
                }
            }
        }

        Self {
            plan,
            start: state.start,
            clusters,
            selections,
            pmd,
            next: 0,
            budget,
        }
    }

    fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.next)
    }
}

enum Fetch {
    Loaded(Vec<ClusterData>),
    /// The first used cluster's next record belongs to a later state.
    Absent { time: Mjd, cluster_id: u8 },
    /// No records left for the first used cluster.
    NoRecords,
}

/// Streams windowed, co-added readouts from one product.
pub struct ReadoutIterator {
    product: Option<Product>,
    config: ExtractionConfig,
    windows: Option<ResolvedWindows>,
    status: IteratorState,
    indices: Vec<usize>,
    cursor: usize,
    current: Option<LoadedState>,
    records: Option<RecordReader>,
    pmd: Option<PmdReader>,
    engine: CoaddEngine,
    solar_cache: SolarReferenceCache,
    warnings: Vec<L1cError>,
    provenance: Provenance,
}

impl ReadoutIterator {
    /// Open a product with the default configuration.
    pub fn open(path: impl AsRef<Path>) -> L1cResult<Self> {
        Self::open_with(path, ExtractionConfig::default())
    }

    /// Open a product with `config`; no window is active yet.
    pub fn open_with(path: impl AsRef<Path>, config: ExtractionConfig) -> L1cResult<Self> {
        config.validate()?;
        let product = Product::open(path)?;
        let capacity = NonZeroUsize::new(config.solar_cache_capacity)
            .ok_or_else(|| L1cError::Config("solar_cache_capacity must be > 0".into()))?;
        let provenance = Provenance {
            product: product.mph().product.clone(),
            software_version: product.mph().software_ver.clone(),
            abs_orbit: product.mph().abs_orbit,
            l1b_product: product.calibration_options().l1b_product_name.clone(),
        };
        Ok(Self {
            engine: CoaddEngine::new(config.category),
            product: Some(product),
            config,
            windows: None,
            status: IteratorState::Uninitialized,
            indices: Vec::new(),
            cursor: 0,
            current: None,
            records: None,
            pmd: None,
            solar_cache: SolarReferenceCache::new(capacity),
            warnings: Vec::new(),
            provenance,
        })
    }

    /// Open a product and activate the configured window.
    pub fn from_config(path: impl AsRef<Path>, config: ExtractionConfig) -> L1cResult<Self> {
        let window = config.window.clone();
        let mut iter = Self::open_with(path, config)?;
        iter.set_window(window)?;
        Ok(iter)
    }

    pub fn status(&self) -> IteratorState {
        self.status
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// The open product, until [`ReadoutIterator::close`].
    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    /// Soft errors recorded so far, in order.
    pub fn warnings(&self) -> &[L1cError] {
        &self.warnings
    }

    /// Plan of the state being streamed.
    pub fn current_plan(&self) -> Option<&StatePlan> {
        self.current.as_ref().map(|s| &s.plan)
    }

    fn product_mut(&mut self) -> L1cResult<&mut Product> {
        self.product
            .as_mut()
            .ok_or_else(|| L1cError::invalid_operation("iterator is closed"))
    }

    fn ensure_open(&self) -> L1cResult<()> {
        if self.status == IteratorState::Closed {
            return Err(L1cError::invalid_operation("iterator is closed"));
        }
        Ok(())
    }

    /// Choose the measurement category. Restarts the stream if a window is active.
    pub fn set_category(&mut self, category: MeasurementCategory) -> L1cResult<()> {
        self.ensure_open()?;
        self.config.category = category;
        self.restart_if_ready()
    }

    /// Set the minimum output integration time. Restarts the stream if a window is active.
    pub fn set_min_integration_time(&mut self, seconds: Option<f64>) -> L1cResult<()> {
        self.ensure_open()?;
        if let Some(t) = seconds {
            if !t.is_finite() || t <= 0.0 {
                return Err(L1cError::Config(format!("minimum integration time {} is not positive", t)));
            }
        }
        self.config.min_integration_time = seconds;
        self.restart_if_ready()
    }

    pub fn set_include_pmd(&mut self, include: bool) -> L1cResult<()> {
        self.ensure_open()?;
        self.config.include_pmd = include;
        self.restart_if_ready()
    }

    /// Resolve wavelength windows against `grid` from now on.
    pub fn set_wavelength_grid(&mut self, grid: WavelengthGrid) -> L1cResult<()> {
        self.product_mut()?.set_wavelength_grid(grid);
        Ok(())
    }

    fn restart_if_ready(&mut self) -> L1cResult<()> {
        if self.windows.is_some() {
            self.restart()?;
        }
        Ok(())
    }

    /// Validate and activate a window, restarting the stream at the first
    /// state of the category.
    pub fn set_window(&mut self, spec: WindowSpec) -> L1cResult<()> {
        self.ensure_open()?;
        let product = self.product_mut()?;
        let (resolved, rejected) = WindowSelector::new(product.wavelength_grid()).resolve(&spec)?;
        if let Some(w) = &resolved.windows {
            debug!(windows = w.len(), rejected = rejected.len(), "Resolved wavelength windows");
        }
        self.warnings.extend(rejected);
        self.windows = Some(resolved);
        self.config.window = spec;
        self.restart()
    }

    fn restart(&mut self) -> L1cResult<()> {
        let category = self.config.category;
        let product = self
            .product
            .as_ref()
            .ok_or_else(|| L1cError::invalid_operation("iterator is closed"))?;

        self.current = None;
        self.cursor = 0;
        self.engine = CoaddEngine::new(category);
        self.indices = match product.require_states(category) {
            Ok(indices) => indices.to_vec(),
            Err(e) => {
                warn!(error = %e, "No states to stream");
                self.warnings.push(e);
                Vec::new()
            }
        };

        self.records = match product.descriptor(DescriptorKind::Primary(category)) {
            Some(desc) => Some(RecordReader::new(desc, category)),
            None if self.indices.is_empty() => None,
            None => return Err(L1cError::MissingDataset(category.dataset_name().to_string())),
        };
        self.pmd = product
            .descriptor(DescriptorKind::Pmd(category))
            .map(|desc| PmdReader::new(desc, category));
        if self.config.include_pmd && self.pmd.is_none() {
            debug!(%category, "No PMD dataset; readouts carry no PMD samples");
        }

        info!(%category, states = self.indices.len(), "Stream ready");
        self.status = IteratorState::Ready;
        Ok(())
    }

    /// Produce the next readout, `Ok(None)` once the stream is exhausted.
    pub fn advance(&mut self) -> L1cResult<Option<Readout>> {
        match self.status {
            IteratorState::Uninitialized => {
                return Err(L1cError::invalid_operation("no window set"));
            }
            IteratorState::Closed => return Err(L1cError::invalid_operation("iterator is closed")),
            IteratorState::Exhausted => return Ok(None),
            IteratorState::Ready | IteratorState::Streaming => {}
        }
        self.status = IteratorState::Streaming;

        while self.current.as_ref().map_or(true, |s| s.remaining() == 0) {
            self.current = None;
            match self.load_next_state() {
                Ok(true) => {}
                Ok(false) => {
                    info!(warnings = self.warnings.len(), "Stream exhausted");
                    self.status = IteratorState::Exhausted;
                    return Ok(None);
                }
                Err(e) => return Err(self.terminate(e)),
            }
        }

        match self.assemble() {
            Ok(readout) => Ok(Some(readout)),
            Err(e) => Err(self.terminate(e)),
        }
    }

    /// Drop the rest of the current state.
    pub fn skip(&mut self) -> L1cResult<()> {
        match self.status {
            IteratorState::Uninitialized => Err(L1cError::invalid_operation("no window set")),
            IteratorState::Closed => Err(L1cError::invalid_operation("iterator is closed")),
            _ => {
                if let Some(s) = self.current.take() {
                    debug!(state = s.plan.state_index, skipped = s.remaining(), "Skipping state");
                }
                Ok(())
            }
        }
    }

    /// Release the product and every buffer. Further calls fail.
    pub fn close(&mut self) {
        if self.status == IteratorState::Closed {
            return;
        }
        self.current = None;
        self.records = None;
        self.pmd = None;
        self.windows = None;
        self.indices.clear();
        self.solar_cache.clear();
        self.product = None;
        self.status = IteratorState::Closed;
        debug!("Iterator closed");
    }

    /// Solar reference by id, served from the session cache.
    pub fn solar_reference(&mut self, id: &str) -> L1cResult<Arc<SolarReference>> {
        let Self {
            product,
            solar_cache,
            ..
        } = self;
        let product = product
            .as_mut()
            .ok_or_else(|| L1cError::invalid_operation("iterator is closed"))?;
        let name = product.file_name();
        solar_cache.get_or_load(&name, id, || product.read_solar_reference(id))
    }

    pub fn solar_cache_stats(&self) -> SolarCacheStats {
        self.solar_cache.stats()
    }

    fn terminate(&mut self, e: L1cError) -> L1cError {
        error!(error = %e, "Readout stream terminated");
        self.current = None;
        self.status = IteratorState::Exhausted;
        e
    }

    fn load_next_state(&mut self) -> L1cResult<bool> {
        let Self {
            product,
            config,
            windows,
            indices,
            cursor,
            current,
            records,
            pmd,
            warnings,
            ..
        } = self;
        let product = product
            .as_mut()
            .ok_or_else(|| L1cError::invalid_operation("iterator is closed"))?;
        let windows = windows
            .as_ref()
            .ok_or_else(|| L1cError::invalid_operation("no window set"))?;
        let Some(records) = records.as_mut() else {
            return Ok(false);
        };
        let category = config.category;
        let enabled = product.enabled_clusters(category);

        while *cursor < indices.len() {
            let state = product.states()[indices[*cursor]].clone();
            *cursor += 1;

            let request = PlanRequest {
                enabled: &enabled,
                windows,
                min_integration_time: config.min_integration_time,
            };
            let plan = match plan_state(&state, &request) {
                Ok(plan) => plan,
                Err(e) if !e.is_fatal() => {
                    warn!(state = state.index, error = %e, "Skipping state");
                    warnings.push(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            match fetch_clusters(records, product, &plan, &state)? {
                Fetch::Loaded(clusters) => {
                    let pmd_record = match pmd.as_mut() {
                        Some(reader) if config.include_pmd => reader.find(product.file_mut(), state.start)?,
                        _ => None,
                    };
                    let loaded = LoadedState::new(plan, &state, clusters, pmd_record);
                    if loaded.budget == 0 {
                        debug!(state = state.index, "State yields no readouts");
                        continue;
                    }
                    debug!(
                        state = state.index,
                        state_id = state.state_id,
                        readouts = loaded.budget,
                        pixels = loaded.plan.pixel_count(),
                        "Loaded state"
                    );
                    *current = Some(loaded);
                    return Ok(true);
                }
                Fetch::Absent { time, cluster_id } => {
                    // the next record belongs to a later state; only this
                    // state is missing from the dataset
                    let owned = indices[*cursor..]
                        .iter()
                        .any(|&i| product.states()[i].start == time);
                    if !owned {
                        return Err(L1cError::RecordTimestampInconsistent {
                            cluster_id,
                            state_id: state.state_id,
                            expected: state.start,
                            actual: time,
                        });
                    }
                    warn!(state = state.index, next = %time, "State has no records");
                    warnings.push(L1cError::StateWithoutRecords {
                        state_index: state.index,
                        state_id: state.state_id,
                    });
                }
                Fetch::NoRecords => {
                    warn!(state = state.index, "No records left for state");
                    warnings.push(L1cError::StateWithoutRecords {
                        state_index: state.index,
                        state_id: state.state_id,
                    });
                }
            }
        }
        Ok(false)
    }

    fn assemble(&mut self) -> L1cResult<Readout> {
        let Self {
            current,
            engine,
            config,
            provenance,
            ..
        } = self;
        let loaded = current
            .as_mut()
            .ok_or_else(|| L1cError::invalid_operation("no state loaded"))?;
        let plan = &loaded.plan;
        let index = loaded.next;

        // every rule is checked before any output is produced
        let rules: Vec<&'static CoaddRule> = plan
            .clusters
            .iter()
            .map(|c| engine.rule(c.factor, c.cluster_id, plan.state_id))
            .collect::<L1cResult<_>>()?;

        let pixels = plan.pixel_count();
        let mut readout = Readout {
            category: plan.category,
            state_index: plan.state_index,
            state_id: plan.state_id,
            index,
            time: loaded.start,
            integration_time: plan.target_time,
            pixel_ids: Vec::with_capacity(pixels),
            wavelength: Vec::with_capacity(pixels),
            wavelength_error: Vec::with_capacity(pixels),
            signal: Vec::with_capacity(pixels),
            signal_error: Vec::with_capacity(pixels),
            cluster_ids: Vec::with_capacity(pixels),
            channels: Vec::with_capacity(pixels),
            coadd_factors: Vec::with_capacity(pixels),
            geolocation: loaded.clusters[plan.reference].geolocation[0],
            pmd: None,
            provenance: provenance.clone(),
        };

        for ((cp, data), (selection, rule)) in plan
            .clusters
            .iter()
            .zip(&loaded.clusters)
            .zip(loaded.selections.iter().zip(&rules))
        {
            let first = index * rule.factor as usize;
            engine.combine_pixels(
                rule,
                &data.signal,
                &data.signal_error,
                data.num_pixels(),
                first,
                selection,
                &mut readout.signal,
                &mut readout.signal_error,
            );
            for &p in selection {
                readout.pixel_ids.push(data.pixel_ids[p]);
                readout.wavelength.push(data.wavelength[p]);
                readout.wavelength_error.push(data.wavelength_error[p]);
                readout.cluster_ids.push(cp.cluster_id);
                readout.channels.push(cp.channel);
                readout.coadd_factors.push(rule.factor);
            }
        }

        let rule = rules[plan.reference];
        let factor = rule.factor as usize;
        let reference = &loaded.clusters[plan.reference];
        let first = index * factor;
        readout.geolocation = engine.combine_geolocation(rule, &reference.geolocation[first..first + factor])?;

        let elapsed = plan.reference_cluster().native_time * first as f64;
        let offset = elapsed + plan.category.profile().scan_offset(elapsed);
        readout.time = loaded.start.add_seconds(offset);
        if config.include_pmd {
            readout.pmd = loaded
                .pmd
                .as_ref()
                .map(|p| p.samples_between(offset, offset + plan.target_time));
        }

        loaded.next += 1;
        Ok(readout)
    }
}

fn fetch_clusters(
    records: &mut RecordReader,
    product: &mut Product,
    plan: &StatePlan,
    state: &State,
) -> L1cResult<Fetch> {
    let file = product.file_mut();
    let mut out = Vec::with_capacity(plan.clusters.len());
    for (i, cp) in plan.clusters.iter().enumerate() {
        match records.seek_cluster(file, cp.cluster_id, state.start)? {
            RecordSeek::Found { offset, header } => out.push(records.read_cluster(file, offset, header)?),
            RecordSeek::Ahead { time } if i == 0 => {
                return Ok(Fetch::Absent {
                    time,
                    cluster_id: cp.cluster_id,
                })
            }
            RecordSeek::Ahead { time } => {
                return Err(L1cError::RecordTimestampInconsistent {
                    cluster_id: cp.cluster_id,
                    state_id: state.state_id,
                    expected: state.start,
                    actual: time,
                })
            }
            RecordSeek::End if i == 0 => return Ok(Fetch::NoRecords),
            RecordSeek::End => {
                return Err(L1cError::MissingDataset(format!(
                    "{} record of cluster {} for state {}",
                    plan.category.dataset_name(),
                    cp.cluster_id,
                    state.start
                )))
            }
        }
    }
    Ok(Fetch::Loaded(out))
}

impl Iterator for ReadoutIterator {
    type Item = L1cResult<Readout>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.status, IteratorState::Uninitialized | IteratorState::Closed) {
            return None;
        }
        self.advance().transpose()
    }
}

impl Drop for ReadoutIterator {
    fn drop(&mut self) {
        self.close();
    }
}
