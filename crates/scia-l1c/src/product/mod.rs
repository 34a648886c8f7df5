//! Product index: headers, descriptors, calibration options and states.
//!
//! Opening a product reads the ASCII headers and the state tables up
//! front. Measurement records are read lazily by the readout iterator.

pub mod calibration;
pub mod states;

pub use calibration::{CalibrationOptions, CalibrationSteps};
pub use states::{ClusterDefinition, State, TICK_SECONDS};

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::category::MeasurementCategory;
use crate::codec::layouts::{CAL_OPTIONS, STATE, STATE_GEOLOCATION};
use crate::codec::read_exact_or_truncated;
use crate::error::{L1cError, L1cResult};
use crate::header::{
    parse_descriptor_table, DatasetDescriptor, DescriptorKind, MainProductHeader,
    SpecificProductHeader, MPH_SIZE,
};
use crate::solar::SolarReference;
use crate::window::WavelengthGrid;

/// An open Level-1C product.
pub struct Product {
    path: PathBuf,
    file: BufReader<File>,
    mph: MainProductHeader,
    sph: SpecificProductHeader,
    descriptors: Vec<DatasetDescriptor>,
    calibration: CalibrationOptions,
    states: Vec<State>,
    by_category: [Vec<usize>; 4],
    grid: WavelengthGrid,
}

impl std::fmt::Debug for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Product")
            .field("path", &self.path)
            .field("product", &self.mph.product)
            .field("descriptors", &self.descriptors.len())
            .field("states", &self.states.len())
            .finish()
    }
}

impl Product {
    /// Open a product and load its headers, calibration options and states.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> L1cResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| L1cError::NotOpenable {
            path: path.display().to_string(),
            source,
        })?;
        let mut file = BufReader::new(file);

        let mut head = Vec::with_capacity(MPH_SIZE);
        file.by_ref().take(MPH_SIZE as u64).read_to_end(&mut head)?;
        if !MainProductHeader::has_signature(&head) {
            let shown = head.len().min(32);
            return Err(L1cError::NotThisProductType {
                found: String::from_utf8_lossy(&head[..shown]).into_owned(),
            });
        }
        let mph = MainProductHeader::parse(&head)?;

        let dsd_offset = mph.dsd_offset()?;
        let sph_bytes = read_exact_or_truncated(&mut file, mph.sph_size, "specific product header")?;
        let fixed = dsd_offset - MPH_SIZE;
        let sph = SpecificProductHeader::parse(&sph_bytes[..fixed])?;
        let descriptors = parse_descriptor_table(&sph_bytes[fixed..], mph.num_dsd, mph.dsd_size)?;

        info!(
            product = %mph.product,
            abs_orbit = mph.abs_orbit,
            descriptors = descriptors.len(),
            "Opened Level-1C product"
        );

        let mut product = Self {
            path: path.to_path_buf(),
            file,
            mph,
            sph,
            descriptors,
            calibration: CalibrationOptions::all_enabled(),
            states: Vec::new(),
            by_category: Default::default(),
            grid: WavelengthGrid::nominal(),
        };
        product.load_calibration_options()?;
        product.load_states()?;
        product.load_wavelength_grid()?;
        Ok(product)
    }

    /// Decode the calibration options dataset.
    ///
    /// Products without one are treated as having every cluster enabled.
    pub fn load_calibration_options(&mut self) -> L1cResult<()> {
        let Some(desc) = self.present(DescriptorKind::CalibrationOptions).cloned() else {
            warn!("No calibration options dataset; enabling all clusters");
            self.calibration = CalibrationOptions::all_enabled();
            return Ok(());
        };
        self.file.seek(SeekFrom::Start(desc.offset))?;
        let mut raw = read_exact_or_truncated(&mut self.file, CAL_OPTIONS.size, CAL_OPTIONS.name)?;
        self.calibration = CalibrationOptions::decode(&mut raw)?;
        debug!(
            nadir = self.calibration.enabled_clusters(MeasurementCategory::Nadir).len(),
            limb = self.calibration.enabled_clusters(MeasurementCategory::Limb).len(),
            "Loaded calibration options"
        );
        Ok(())
    }

    /// Decode the state table, join it with the state geolocation, drop
    /// detached states and bucket the rest by category.
    pub fn load_states(&mut self) -> L1cResult<()> {
        let states_desc = self
            .present(DescriptorKind::StateTable)
            .cloned()
            .ok_or_else(|| L1cError::MissingDataset("STATES".into()))?;
        let geo_desc = self
            .present(DescriptorKind::StateGeolocation)
            .cloned()
            .ok_or_else(|| L1cError::MissingDataset("GEOLOCATION".into()))?;
        if states_desc.num_dsr != geo_desc.num_dsr {
            return Err(L1cError::StateTableInconsistent {
                states: states_desc.num_dsr,
                geolocations: geo_desc.num_dsr,
            });
        }
        let count = states_desc.num_dsr;

        self.file.seek(SeekFrom::Start(states_desc.offset))?;
        let mut state_raw = read_exact_or_truncated(&mut self.file, count * STATE.size, STATE.name)?;
        self.file.seek(SeekFrom::Start(geo_desc.offset))?;
        let mut geo_raw = read_exact_or_truncated(
            &mut self.file,
            count * STATE_GEOLOCATION.size,
            STATE_GEOLOCATION.name,
        )?;

        let mut kept = Vec::with_capacity(count);
        let mut detached = 0usize;
        let records = state_raw
            .chunks_exact_mut(STATE.size)
            .zip(geo_raw.chunks_exact_mut(STATE_GEOLOCATION.size));
        for (index, (s, g)) in records.enumerate() {
            let Some(mut state) = states::decode_state(index, s)? else {
                detached += 1;
                continue;
            };
            let geo = states::decode_state_geolocation(g)?;
            if geo.start != state.start {
                warn!(index, state = %state.start, geolocation = %geo.start, "State geolocation time differs");
            }
            state.corners = geo.corners;
            kept.push(state);
        }

        let mut by_category: [Vec<usize>; 4] = Default::default();
        for (i, s) in kept.iter().enumerate() {
            by_category[s.category.index()].push(i);
        }
        info!(
            states = kept.len(),
            detached,
            nadir = by_category[0].len(),
            limb = by_category[1].len(),
            occultation = by_category[2].len(),
            monitoring = by_category[3].len(),
            "Loaded state table"
        );
        self.states = kept;
        self.by_category = by_category;
        Ok(())
    }

    fn load_wavelength_grid(&mut self) -> L1cResult<()> {
        let Some(desc) = self.present(DescriptorKind::SolarReference).cloned() else {
            debug!("No solar reference; using nominal wavelength grid");
            return Ok(());
        };
        let reference = SolarReference::read_at(&mut self.file, &desc, 0)?;
        if reference.wavelength.iter().all(|&w| w == 0.0) {
            warn!(id = %reference.id, "Solar reference has an empty wavelength grid; using nominal grid");
            return Ok(());
        }
        self.grid = WavelengthGrid::from_values(reference.wavelength)?;
        debug!(id = %reference.id, "Wavelength grid from solar reference");
        Ok(())
    }

    fn present(&self, kind: DescriptorKind) -> Option<&DatasetDescriptor> {
        self.descriptors.iter().find(|d| d.kind == kind && d.is_present())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used to key cached solar references.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn mph(&self) -> &MainProductHeader {
        &self.mph
    }

    pub fn sph(&self) -> &SpecificProductHeader {
        &self.sph
    }

    pub fn descriptors(&self) -> &[DatasetDescriptor] {
        &self.descriptors
    }

    /// Descriptor of a dataset that carries data.
    pub fn descriptor(&self, kind: DescriptorKind) -> Option<&DatasetDescriptor> {
        self.present(kind)
    }

    pub fn calibration_options(&self) -> &CalibrationOptions {
        &self.calibration
    }

    pub fn enabled_clusters(&self, category: MeasurementCategory) -> Vec<u8> {
        self.calibration.enabled_clusters(category)
    }

    /// Attached states in file order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    /// Indices into [`Product::states`] of the states of a category.
    pub fn state_indices(&self, category: MeasurementCategory) -> &[usize] {
        &self.by_category[category.index()]
    }

    pub fn states_for(&self, category: MeasurementCategory) -> impl Iterator<Item = &State> {
        self.by_category[category.index()]
            .iter()
            .map(move |&i| &self.states[i])
    }

    /// Like [`Product::state_indices`] but reports an empty category.
    pub fn require_states(&self, category: MeasurementCategory) -> L1cResult<&[usize]> {
        let indices = self.state_indices(category);
        if indices.is_empty() {
            return Err(L1cError::NoStatesForCategory(category));
        }
        Ok(indices)
    }

    pub fn wavelength_grid(&self) -> &WavelengthGrid {
        &self.grid
    }

    /// Replace the grid used to resolve wavelength windows.
    pub fn set_wavelength_grid(&mut self, grid: WavelengthGrid) {
        self.grid = grid;
    }

    /// Look up a solar reference by id, reading the dataset.
    pub fn read_solar_reference(&mut self, id: &str) -> L1cResult<SolarReference> {
        let desc = self
            .present(DescriptorKind::SolarReference)
            .cloned()
            .ok_or_else(|| L1cError::MissingDataset("SUN_REFERENCE".into()))?;
        SolarReference::find(&mut self.file, &desc, id)
    }

    pub(crate) fn file_mut(&mut self) -> &mut BufReader<File> {
        &mut self.file
    }
}
