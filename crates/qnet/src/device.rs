use serde::{Deserialize, Serialize};

use crate::net::DataFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Naive,
    X86,
    Arm,
    Cuda,
    OpenCl,
    Metal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Auto,
    Normal,
    High,
    Low,
}

/// Run-time configuration a net is being prepared for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub device_type: DeviceType,
    #[serde(default)]
    pub device_id: u32,
    #[serde(default)]
    pub precision: Precision,
}

impl NetworkConfig {
    pub fn new(device_type: DeviceType) -> Self {
        Self {
            device_type,
            device_id: 0,
            precision: Precision::Auto,
        }
    }
}

/// Blob layouts a device stores int8 and float data in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Int8Layout {
    pub quantized: DataFormat,
    pub float: DataFormat,
}

impl Int8Layout {
    pub fn format_for(&self, quantized: bool) -> DataFormat {
        if quantized {
            self.quantized
        } else {
            self.float
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub device: DeviceType,
    /// Set when crossing the int8 boundary also requires a layout change.
    pub int8_layout: Option<Int8Layout>,
}

impl DeviceCapabilities {
    pub fn for_device(device: DeviceType) -> Self {
        let int8_layout = match device {
            DeviceType::Arm => Some(Int8Layout {
                quantized: DataFormat::Nhwc4,
                float: DataFormat::Nc4hw4,
            }),
            DeviceType::Naive
            | DeviceType::X86
            | DeviceType::Cuda
            | DeviceType::OpenCl
            | DeviceType::Metal => None,
        };
        Self {
            device,
            int8_layout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_arm_requires_int8_layout() {
        let arm = DeviceCapabilities::for_device(DeviceType::Arm);
        let layout = arm.int8_layout.expect("arm packs int8 blobs");
        assert_eq!(layout.format_for(true), DataFormat::Nhwc4);
        assert_eq!(layout.format_for(false), DataFormat::Nc4hw4);

        for device in [DeviceType::Naive, DeviceType::X86, DeviceType::Cuda] {
            assert!(DeviceCapabilities::for_device(device).int8_layout.is_none());
        }
    }
}
