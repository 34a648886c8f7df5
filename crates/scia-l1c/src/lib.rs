//! Streaming reader for SCIAMACHY Level-1C products.
//!
//! A Level-1C product carries calibrated spectra for every measurement
//! state of an orbit, split into detector clusters that each read out at
//! their own rate. This crate turns a product into a stream of readouts
//! restricted to a pixel, wavelength or cluster window and co-added to a
//! common integration time.
//!
//! # Architecture
//!
//! ```text
//! ReadoutIterator::open(path)
//!      │
//!      ├─► Product::open: MPH, SPH, descriptor table,
//!      │        calibration options, state table
//!      │
//!      ├─► set_window: WindowSelector resolves the window
//!      │        against the wavelength grid
//!      │
//!      └─► advance (per readout)
//!               │
//!               ├─► plan_state: clusters, target time, readouts
//!               │
//!               ├─► RecordReader: cluster records of the state
//!               │
//!               └─► CoaddEngine: pixels and geolocation
//!                        │
//!                        ▼
//!                     Readout
//! ```
//!
//! # Example
//!
//! ```ignore
//! use scia_l1c::{ReadoutIterator, WavelengthWindow, WindowSpec};
//!
//! let mut readouts = ReadoutIterator::open("SCI_NLC_1PNPDE20040102_093921.N1")?;
//! readouts.set_window(WindowSpec::Wavelengths(vec![WavelengthWindow::new(325.0, 335.0)]))?;
//! while let Some(readout) = readouts.advance()? {
//!     println!("{} {} pixels", readout.time, readout.len());
//! }
//! ```

pub mod category;
pub mod coadd;
pub mod codec;
pub mod config;
pub mod error;
pub mod geolocation;
pub mod header;
pub mod iterator;
pub mod planner;
pub mod pmd;
pub mod product;
pub mod readout;
pub mod record;
pub mod solar;
pub mod time;
pub mod window;

// Re-export commonly used types at crate root
pub use category::{CategoryProfile, MeasurementCategory};
pub use coadd::{CoaddEngine, CoaddFactor, CoaddRule, MidPoint};
pub use config::ExtractionConfig;
pub use error::{L1cError, L1cResult};
pub use geolocation::{Coord, GeoCal, GeoLimb, GeoNadir, Geolocation, GeometryKind};
pub use header::{DatasetDescriptor, DescriptorKind, MainProductHeader, SpecificProductHeader};
pub use iterator::{IteratorState, ReadoutIterator};
pub use planner::{plan_state, ClusterPlan, PlanRequest, StatePlan};
pub use pmd::{PmdReader, PmdRecord};
pub use product::{CalibrationOptions, ClusterDefinition, Product, State};
pub use readout::{Provenance, Readout};
pub use record::{ClusterData, RecordHeader, RecordReader, RecordSeek};
pub use solar::{SolarCacheStats, SolarReference, SolarReferenceCache};
pub use time::Mjd;
pub use window::{
    PixelWindow, ResolvedWindows, WavelengthGrid, WavelengthWindow, WindowSelector, WindowSpec,
};
