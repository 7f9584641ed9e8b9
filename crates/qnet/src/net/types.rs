use serde::{Deserialize, Serialize};

/// Element types a blob can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Float,
    Half,
    Bfp16,
    Int8,
    Int32,
}

impl DataType {
    /// Maps a quantization status onto the element type used to carry it.
    pub fn for_quantized(quantized: bool) -> Self {
        if quantized {
            DataType::Int8
        } else {
            DataType::Float
        }
    }

    /// Returns the quantization status this type implies, if it takes part in int8 reformatting.
    pub fn quantized_status(self) -> Option<bool> {
        match self {
            DataType::Int8 => Some(true),
            DataType::Float => Some(false),
            DataType::Half | DataType::Bfp16 | DataType::Int32 => None,
        }
    }
}

/// Memory layouts a backend may require for blob storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(clippy::upper_case_acronyms)]
pub enum DataFormat {
    #[default]
    Auto,
    Nchw,
    Nhwc,
    Nhwc4,
    Nc4hw4,
}
