//! Main Product Header.

use super::HeaderBlock;
use crate::error::{L1cError, L1cResult};
use crate::time::Mjd;

/// Fixed size of the Main Product Header in bytes.
pub const MPH_SIZE: usize = 1247;

/// Leading bytes identifying a SCIAMACHY Level-1C product.
pub const PRODUCT_SIGNATURE: &[u8] = b"PRODUCT=\"SCI_NLC_1P";

const SECTION: &str = "MPH";

/// Decoded Main Product Header.
#[derive(Debug, Clone)]
pub struct MainProductHeader {
    pub product: String,
    pub proc_stage: String,
    pub proc_center: String,
    pub proc_time: Option<Mjd>,
    pub software_ver: String,
    pub sensing_start: Option<Mjd>,
    pub sensing_stop: Option<Mjd>,
    pub phase: String,
    pub cycle: i64,
    pub rel_orbit: i64,
    pub abs_orbit: i64,
    pub tot_size: u64,
    pub sph_size: usize,
    pub num_dsd: usize,
    pub dsd_size: usize,
    pub num_data_sets: usize,
    block: HeaderBlock,
}

impl MainProductHeader {
    /// Whether `bytes` start with the Level-1C signature.
    pub fn has_signature(bytes: &[u8]) -> bool {
        bytes.starts_with(PRODUCT_SIGNATURE)
    }

    /// Parse the first [`MPH_SIZE`] bytes of a product.
    pub fn parse(bytes: &[u8]) -> L1cResult<Self> {
        if bytes.len() < MPH_SIZE {
            return Err(L1cError::TruncatedRecord {
                aggregate: "main product header",
                expected: MPH_SIZE,
                available: bytes.len(),
            });
        }
        let block = HeaderBlock::parse(&bytes[..MPH_SIZE], SECTION)?;
        Self::from_block(block)
    }

    fn from_block(block: HeaderBlock) -> L1cResult<Self> {
        let text = |key: &str| block.text(key).unwrap_or_default();
        let time = |key: &str| block.text(key).and_then(|t| Mjd::parse_header_time(&t));
        let size = |key: &str| -> L1cResult<usize> {
            let v = block.require_int(key, SECTION)?;
            usize::try_from(v).map_err(|_| L1cError::header(SECTION, format!("{} is negative: {}", key, v)))
        };

        let product = text("PRODUCT");
        if product.is_empty() {
            return Err(L1cError::header(SECTION, "missing PRODUCT field"));
        }

        Ok(Self {
            proc_stage: text("PROC_STAGE"),
            proc_center: text("PROC_CENTER"),
            proc_time: time("PROC_TIME"),
            software_ver: text("SOFTWARE_VER"),
            sensing_start: time("SENSING_START"),
            sensing_stop: time("SENSING_STOP"),
            phase: text("PHASE"),
            cycle: block.int("CYCLE").unwrap_or(0),
            rel_orbit: block.int("REL_ORBIT").unwrap_or(0),
            abs_orbit: block.int("ABS_ORBIT").unwrap_or(0),
            tot_size: block.int("TOT_SIZE").unwrap_or(0).max(0) as u64,
            sph_size: size("SPH_SIZE")?,
            num_dsd: size("NUM_DSD")?,
            dsd_size: size("DSD_SIZE")?,
            num_data_sets: block.int("NUM_DATA_SETS").unwrap_or(0).max(0) as usize,
            product,
            block,
        })
    }

    /// Re-encode to the fixed-width on-disk form.
    pub fn encode(&self) -> Vec<u8> {
        self.block.encode(Some(MPH_SIZE))
    }

    /// Underlying ordered header entries.
    pub fn block(&self) -> &HeaderBlock {
        &self.block
    }

    /// Byte offset of the first Dataset Descriptor.
    pub fn dsd_offset(&self) -> L1cResult<usize> {
        let table = self.num_dsd * self.dsd_size;
        self.sph_size
            .checked_sub(table)
            .map(|fixed| MPH_SIZE + fixed)
            .ok_or_else(|| {
                L1cError::header(
                    SECTION,
                    format!("SPH_SIZE {} smaller than descriptor table {}", self.sph_size, table),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderValue;

    fn sample_block() -> HeaderBlock {
        let mut b = HeaderBlock::default();
        b.push(
            "PRODUCT",
            HeaderValue::Text(format!("{:<62}", "SCI_NLC_1PNPDE20040312_095137_000060152025_00122_10729_0000.N1")),
        );
        b.push("PROC_STAGE", HeaderValue::Raw("N".into()));
        b.push("SOFTWARE_VER", HeaderValue::Text("SCIAL1C 3.2 ".into()));
        b.push("SENSING_START", HeaderValue::Text("12-MAR-2004 09:51:37.000000".into()));
        b.push("ABS_ORBIT", HeaderValue::Number { digits: "+10729".into(), unit: None });
        b.push("SPH_SIZE", HeaderValue::Number { digits: "+0000001520".into(), unit: Some("bytes".into()) });
        b.push("NUM_DSD", HeaderValue::Number { digits: "+0000000004".into(), unit: None });
        b.push("DSD_SIZE", HeaderValue::Number { digits: "+0000000280".into(), unit: Some("bytes".into()) });
        b
    }

    #[test]
    fn test_parse_fields() {
        let bytes = sample_block().encode(Some(MPH_SIZE));
        assert!(MainProductHeader::has_signature(&bytes));
        let mph = MainProductHeader::parse(&bytes).unwrap();
        assert!(mph.product.starts_with("SCI_NLC_1PNPDE2004"));
        assert_eq!(mph.software_ver, "SCIAL1C 3.2");
        assert_eq!(mph.abs_orbit, 10729);
        assert_eq!(mph.num_dsd, 4);
        assert_eq!(mph.dsd_offset().unwrap(), MPH_SIZE + 1520 - 4 * 280);
        assert_eq!(mph.sensing_start.unwrap().to_header_time(), "12-MAR-2004 09:51:37.000000");
    }

    #[test]
    fn test_decode_encode_decode_is_stable() {
        let bytes = sample_block().encode(Some(MPH_SIZE));
        let first = MainProductHeader::parse(&bytes).unwrap();
        let encoded = first.encode();
        assert_eq!(encoded.len(), MPH_SIZE);
        let second = MainProductHeader::parse(&encoded).unwrap();
        assert_eq!(first.block(), second.block());
        assert_eq!(encoded, second.encode());
    }

    #[test]
    fn test_missing_sizes_rejected() {
        let mut b = HeaderBlock::default();
        b.push("PRODUCT", HeaderValue::Text("SCI_NLC_1P".into()));
        let bytes = b.encode(Some(MPH_SIZE));
        assert!(matches!(
            MainProductHeader::parse(&bytes),
            Err(L1cError::HeaderParseError { section: "MPH", .. })
        ));
    }
}
