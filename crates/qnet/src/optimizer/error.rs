use thiserror::Error;

use crate::net::DataType;

/// Failures that abort an optimizer pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    #[error("empty net structure")]
    MissingStructure,
    #[error("blob '{blob}' already exists; refusing to insert a duplicate reformat output")]
    BlobCollision { blob: String },
    #[error("layer '{layer}' already exists; refusing to insert a duplicate reformat layer")]
    LayerCollision { layer: String },
    #[error("model input '{input}' has data type {dtype:?}; only int8 and float inputs can be reformatted")]
    UnsupportedInputType { input: String, dtype: DataType },
    #[error("can not get blob scale '{key}' for blob '{blob}'")]
    MissingScale { blob: String, key: String },
}

impl OptimizeError {
    /// Returns `true` for errors caused by a malformed or absent net structure.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            OptimizeError::MissingStructure
                | OptimizeError::BlobCollision { .. }
                | OptimizeError::LayerCollision { .. }
        )
    }
}

/// Non-fatal findings recorded while a pass runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeWarning {
    /// A float→int8 reformat output was inserted but its scale could not be aliased.
    #[error("can not get blob scale '{key}' for blob '{blob}'; '{reformatted}' has no scale")]
    MissingScale {
        blob: String,
        key: String,
        reformatted: String,
    },
}
