pub mod device;
mod env;
pub mod net;
pub mod optimizer;

pub use device::{DeviceType, NetworkConfig};
pub use net::{DataType, LayerInfo, NetResource, NetStructure};
pub use optimizer::{
    default_pipeline, NetOptimizer, NetOptimizerManager, OptimizeConfig, OptimizeError,
    PassResult,
};
