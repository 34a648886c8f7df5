//! Error types for Level-1C product reading.

use thiserror::Error;

use crate::category::MeasurementCategory;
use crate::time::Mjd;

/// Result type for Level-1C reader operations.
pub type L1cResult<T> = Result<T, L1cError>;

/// Errors raised while opening a product or streaming its readouts.
#[derive(Error, Debug)]
pub enum L1cError {
    /// The product file could not be opened.
    #[error("cannot open product {path}: {source}")]
    NotOpenable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file does not carry the Level-1C product signature.
    #[error("not a SCIAMACHY Level-1C product (found {found:?})")]
    NotThisProductType { found: String },

    /// An ASCII header section could not be parsed.
    #[error("{section} parse error: {reason}")]
    HeaderParseError { section: &'static str, reason: String },

    /// The state table and the state geolocation table disagree.
    #[error("state table has {states} records but geolocation table has {geolocations}")]
    StateTableInconsistent { states: usize, geolocations: usize },

    /// The product holds no states for the requested category.
    #[error("no states for category {0}")]
    NoStatesForCategory(MeasurementCategory),

    /// A wavelength window does not intersect the wavelength grid.
    #[error("window [{lambda_min}, {lambda_max}] nm is outside the grid{}", channel_suffix(.channel))]
    OutOfRange {
        lambda_min: f64,
        lambda_max: f64,
        channel: Option<u8>,
    },

    /// A window request was rejected before any state was planned.
    #[error("invalid window request: {0}")]
    InvalidWindow(String),

    /// No enabled cluster of the state intersects the active windows.
    #[error("state #{state_index} (id {state_id}) has no cluster matching the active windows")]
    ClusterWindowMismatch { state_index: usize, state_id: u16 },

    /// The measurement dataset holds no records for the state.
    #[error("state #{state_index} (id {state_id}) has no measurement records")]
    StateWithoutRecords { state_index: usize, state_id: u16 },

    /// The co-add factor of a cluster has no combination rule.
    #[error("unsupported co-add factor {factor} for cluster {cluster_id} of state {state_id} ({category})")]
    UnsupportedCoaddFactor {
        cluster_id: u8,
        state_id: u16,
        category: MeasurementCategory,
        factor: f64,
    },

    /// A measurement record does not line up with the state table.
    #[error(
        "record timestamp inconsistent for cluster {cluster_id} of state {state_id}: expected {expected}, found {actual}"
    )]
    RecordTimestampInconsistent {
        cluster_id: u8,
        state_id: u16,
        expected: Mjd,
        actual: Mjd,
    },

    /// Fewer bytes were available than the aggregate declares.
    #[error("truncated {aggregate}: expected {expected} bytes, {available} available")]
    TruncatedRecord {
        aggregate: &'static str,
        expected: usize,
        available: usize,
    },

    /// A dataset needed by the operation is not present in the product.
    #[error("dataset {0} is missing from the product")]
    MissingDataset(String),

    /// The call is not valid in the iterator's current lifecycle state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Extraction configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn channel_suffix(channel: &Option<u8>) -> String {
    match channel {
        Some(ch) => format!(" of channel {}", ch),
        None => String::new(),
    }
}

impl L1cError {
    /// Create a HeaderParseError.
    pub fn header(section: &'static str, reason: impl Into<String>) -> Self {
        Self::HeaderParseError {
            section,
            reason: reason.into(),
        }
    }

    /// Create an InvalidWindow error.
    pub fn invalid_window(msg: impl Into<String>) -> Self {
        Self::InvalidWindow(msg.into())
    }

    /// Create an InvalidOperation error.
    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    /// Whether the error ends the operation that raised it.
    ///
    /// Soft errors (no states, window out of range, cluster mismatch, a
    /// state without records) are recorded and skipped; everything else
    /// terminates the open call or the readout stream.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::NoStatesForCategory(_)
                | Self::OutOfRange { .. }
                | Self::ClusterWindowMismatch { .. }
                | Self::StateWithoutRecords { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_errors_are_not_fatal() {
        assert!(!L1cError::NoStatesForCategory(MeasurementCategory::Limb).is_fatal());
        assert!(!L1cError::ClusterWindowMismatch { state_index: 2, state_id: 8 }.is_fatal());
        assert!(!L1cError::StateWithoutRecords { state_index: 1, state_id: 2 }.is_fatal());
        assert!(!L1cError::OutOfRange {
            lambda_min: 100.0,
            lambda_max: 120.0,
            channel: Some(1)
        }
        .is_fatal());
    }

    #[test]
    fn test_hard_errors_are_fatal() {
        assert!(L1cError::StateTableInconsistent { states: 3, geolocations: 2 }.is_fatal());
        assert!(L1cError::UnsupportedCoaddFactor {
            cluster_id: 4,
            state_id: 7,
            category: MeasurementCategory::Nadir,
            factor: 5.0,
        }
        .is_fatal());
    }

    #[test]
    fn test_out_of_range_message_names_channel() {
        let err = L1cError::OutOfRange {
            lambda_min: 100.0,
            lambda_max: 120.0,
            channel: Some(3),
        };
        assert!(err.to_string().contains("of channel 3"));
    }
}
