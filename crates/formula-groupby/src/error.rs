use crate::aggregation::AggregationKind;
use crate::types::DataType;

pub type Result<T> = std::result::Result<T, GroupbyError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GroupbyError {
    #[error("shape mismatch in {context}: expected {expected} rows, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unsupported aggregation {kind:?} for {data_type:?} values")]
    UnsupportedAggregation {
        kind: AggregationKind,
        data_type: DataType,
    },

    #[error("group labels misuse: {0}")]
    HandleMisuse(String),

    #[error("allocation of {bytes} bytes failed: {reason}")]
    AllocationFailure { bytes: usize, reason: String },
}

impl GroupbyError {
    pub(crate) fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }
}
