//! In-memory net description consumed and rewritten by the optimizer passes.

mod layer;
mod resource;
mod structure;
mod types;

pub use layer::{
    ConvLayerParam, InnerProductLayerParam, LayerInfo, LayerParam, LayerType, ParamKind,
    PoolType, PoolingLayerParam, ReformatLayerParam,
};
pub use resource::{blob_scale_key, BlobScale, NetResource, ScaleStore, BLOB_SCALE_SUFFIX};
pub use structure::{NetIoError, NetSerdeError, NetStructure};
pub use types::{DataFormat, DataType};
