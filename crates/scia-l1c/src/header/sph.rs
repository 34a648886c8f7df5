//! Specific Product Header.

use super::HeaderBlock;
use crate::error::L1cResult;

const SECTION: &str = "SPH";

/// Decoded Specific Product Header (without its descriptor table).
#[derive(Debug, Clone)]
pub struct SpecificProductHeader {
    pub descriptor: String,
    /// Footprint of the product in degrees.
    pub start_lat: f64,
    pub start_lon: f64,
    pub stop_lat: f64,
    pub stop_lon: f64,
    block: HeaderBlock,
}

impl SpecificProductHeader {
    /// Parse the fixed part of the SPH (everything before the DSD entries).
    pub fn parse(bytes: &[u8]) -> L1cResult<Self> {
        let block = HeaderBlock::parse(bytes, SECTION)?;
        let micro_deg = |key: &str| block.int(key).map(|v| v as f64 * 1e-6).unwrap_or(0.0);
        Ok(Self {
            descriptor: block.text("SPH_DESCRIPTOR").unwrap_or_default(),
            start_lat: micro_deg("START_LAT"),
            start_lon: micro_deg("START_LONG"),
            stop_lat: micro_deg("STOP_LAT"),
            stop_lon: micro_deg("STOP_LONG"),
            block,
        })
    }

    pub fn block(&self) -> &HeaderBlock {
        &self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_footprint() {
        let text = b"SPH_DESCRIPTOR=\"SCI_NLC_1P SPECIFIC HEADER   \"\nSTART_LAT=-0012500000<10-6degN>\nSTART_LONG=+0100250000<10-6degE>\nSTOP_LAT=+0020000000<10-6degN>\nSTOP_LONG=+0095000000<10-6degE>\n";
        let sph = SpecificProductHeader::parse(text).unwrap();
        assert_eq!(sph.descriptor, "SCI_NLC_1P SPECIFIC HEADER");
        assert!((sph.start_lat + 12.5).abs() < 1e-9);
        assert!((sph.start_lon - 100.25).abs() < 1e-9);
        assert!((sph.stop_lat - 20.0).abs() < 1e-9);
        assert!((sph.stop_lon - 95.0).abs() < 1e-9);
    }
}
