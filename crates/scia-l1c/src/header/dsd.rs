//! Dataset Descriptor table.

use std::fmt;

use super::HeaderBlock;
use crate::category::MeasurementCategory;
use crate::error::{L1cError, L1cResult};

const SECTION: &str = "DSD";

/// Role of a dataset, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    StateTable,
    StateGeolocation,
    CalibrationOptions,
    SolarReference,
    Primary(MeasurementCategory),
    Pmd(MeasurementCategory),
    FractionalPolarisation(MeasurementCategory),
    Other,
}

impl DescriptorKind {
    /// Classify a trimmed dataset name.
    pub fn classify(name: &str) -> Self {
        use MeasurementCategory::*;
        match name {
            "STATES" => Self::StateTable,
            "GEOLOCATION" => Self::StateGeolocation,
            "CAL_OPTIONS" => Self::CalibrationOptions,
            "SUN_REFERENCE" => Self::SolarReference,
            "NADIR" => Self::Primary(Nadir),
            "LIMB" => Self::Primary(Limb),
            "OCCULTATION" => Self::Primary(Occultation),
            "MONITORING" => Self::Primary(Monitoring),
            "NADIR_PMD" => Self::Pmd(Nadir),
            "LIMB_PMD" => Self::Pmd(Limb),
            "OCCULTATION_PMD" => Self::Pmd(Occultation),
            "NADIR_FRAC_POL" => Self::FractionalPolarisation(Nadir),
            "LIMB_FRAC_POL" => Self::FractionalPolarisation(Limb),
            "OCCULTATION_FRAC_POL" => Self::FractionalPolarisation(Occultation),
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateTable => write!(f, "STATES"),
            Self::StateGeolocation => write!(f, "GEOLOCATION"),
            Self::CalibrationOptions => write!(f, "CAL_OPTIONS"),
            Self::SolarReference => write!(f, "SUN_REFERENCE"),
            Self::Primary(c) => write!(f, "{}", c.dataset_name()),
            Self::Pmd(c) => write!(f, "{}_PMD", c.dataset_name()),
            Self::FractionalPolarisation(c) => write!(f, "{}_FRAC_POL", c.dataset_name()),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// One Dataset Descriptor entry.
#[derive(Debug, Clone)]
pub struct DatasetDescriptor {
    pub name: String,
    pub ds_type: String,
    pub filename: String,
    pub offset: u64,
    pub size: u64,
    pub num_dsr: usize,
    /// Record size, negative for variable-size records.
    pub dsr_size: i64,
    pub kind: DescriptorKind,
}

impl DatasetDescriptor {
    pub fn parse(bytes: &[u8]) -> L1cResult<Self> {
        let block = HeaderBlock::parse(bytes, SECTION)?;
        let name = block
            .text("DS_NAME")
            .ok_or_else(|| L1cError::header(SECTION, "missing DS_NAME"))?;
        let offset = block.require_int("DS_OFFSET", SECTION)?;
        let size = block.require_int("DS_SIZE", SECTION)?;
        let num_dsr = block.require_int("NUM_DSR", SECTION)?;
        if offset < 0 || size < 0 || num_dsr < 0 {
            return Err(L1cError::header(
                SECTION,
                format!("{}: negative offset/size/count", name),
            ));
        }
        Ok(Self {
            kind: DescriptorKind::classify(&name),
            ds_type: block.text("DS_TYPE").unwrap_or_default(),
            filename: block.text("FILENAME").unwrap_or_default(),
            offset: offset as u64,
            size: size as u64,
            num_dsr: num_dsr as usize,
            dsr_size: block.int("DSR_SIZE").unwrap_or(-1),
            name,
        })
    }

    /// Whether the dataset carries data in this product.
    pub fn is_present(&self) -> bool {
        self.offset > 0 && self.size > 0 && self.num_dsr > 0
    }
}

/// Parse the descriptor table.
///
/// The header's descriptor count includes one trailing spare entry, which
/// is always skipped.
pub fn parse_descriptor_table(
    bytes: &[u8],
    num_dsd: usize,
    dsd_size: usize,
) -> L1cResult<Vec<DatasetDescriptor>> {
    if num_dsd == 0 || dsd_size == 0 {
        return Err(L1cError::header(SECTION, "empty descriptor table"));
    }
    let needed = num_dsd * dsd_size;
    if bytes.len() < needed {
        return Err(L1cError::TruncatedRecord {
            aggregate: "descriptor table",
            expected: needed,
            available: bytes.len(),
        });
    }
    bytes[..needed]
        .chunks_exact(dsd_size)
        .take(num_dsd - 1)
        .map(DatasetDescriptor::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, offset: u64, num_dsr: usize) -> Vec<u8> {
        let text = format!(
            "DS_NAME=\"{:<28}\"\nDS_TYPE=M\nFILENAME=\"{:<62}\"\nDS_OFFSET=+{:020}<bytes>\nDS_SIZE=+{:020}<bytes>\nNUM_DSR=+{:010}\nDSR_SIZE=-0000000001<bytes>\n",
            name, "", offset, num_dsr * 100, num_dsr
        );
        let mut bytes = text.into_bytes();
        bytes.resize(279, b' ');
        bytes.push(b'\n');
        bytes
    }

    #[test]
    fn test_classify_names() {
        assert_eq!(DescriptorKind::classify("STATES"), DescriptorKind::StateTable);
        assert_eq!(
            DescriptorKind::classify("LIMB_PMD"),
            DescriptorKind::Pmd(MeasurementCategory::Limb)
        );
        assert_eq!(
            DescriptorKind::classify("NADIR_FRAC_POL"),
            DescriptorKind::FractionalPolarisation(MeasurementCategory::Nadir)
        );
        assert_eq!(DescriptorKind::classify("LEAKAGE_CONSTANT"), DescriptorKind::Other);
    }

    #[test]
    fn test_table_skips_trailing_spare() {
        let mut table = entry("STATES", 5000, 3);
        table.extend(entry("NADIR", 9000, 6));
        table.extend(entry("", 0, 0));
        let dsds = parse_descriptor_table(&table, 3, 280).unwrap();
        assert_eq!(dsds.len(), 2);
        assert_eq!(dsds[0].kind, DescriptorKind::StateTable);
        assert_eq!(dsds[0].offset, 5000);
        assert_eq!(dsds[1].kind, DescriptorKind::Primary(MeasurementCategory::Nadir));
        assert_eq!(dsds[1].num_dsr, 6);
        assert_eq!(dsds[1].dsr_size, -1);
        assert!(dsds[1].is_present());
    }

    #[test]
    fn test_short_table_is_truncated() {
        let table = entry("STATES", 5000, 3);
        assert!(matches!(
            parse_descriptor_table(&table, 2, 280),
            Err(L1cError::TruncatedRecord { .. })
        ));
    }
}
