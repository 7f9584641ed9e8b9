use crate::device::DeviceCapabilities;
use crate::net::{DataType, LayerInfo, LayerParam, LayerType, ParamKind, ReformatLayerParam};

/// Builds `Reformat` layers converting between int8 and float blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReformatLayerFactory {
    device: Option<DeviceCapabilities>,
}

impl ReformatLayerFactory {
    pub fn new(device: Option<DeviceCapabilities>) -> Self {
        Self { device }
    }

    /// Creates a reformat converting away from `producer_quantized`.
    ///
    /// Inputs and outputs are left empty. Formats are only set when the device
    /// requires a layout change; otherwise layout is decided at layer init.
    pub fn create(&self, name: impl Into<String>, producer_quantized: bool) -> LayerInfo {
        let layout = self.device.and_then(|device| device.int8_layout);
        let param = ReformatLayerParam {
            src_type: DataType::for_quantized(producer_quantized),
            dst_type: DataType::for_quantized(!producer_quantized),
            src_format: layout.map(|layout| layout.format_for(producer_quantized)),
            dst_format: layout.map(|layout| layout.format_for(!producer_quantized)),
        };
        LayerInfo::new(
            name,
            LayerType::Reformat,
            LayerParam {
                quantized: false,
                kind: ParamKind::Reformat(param),
            },
        )
    }
}
