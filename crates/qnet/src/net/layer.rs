use serde::{Deserialize, Serialize};

use super::types::{DataFormat, DataType};

/// Layer kinds understood by the optimizer passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    Convolution,
    Deconvolution,
    Pooling,
    InnerProduct,
    Relu,
    Add,
    Mul,
    Concat,
    Softmax,
    Reshape,
    Reformat,
    /// Any layer the passes only route blobs through.
    Other(String),
}

impl LayerType {
    pub fn is_reformat(&self) -> bool {
        matches!(self, LayerType::Reformat)
    }
}

/// Parameters of an inserted type/layout conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReformatLayerParam {
    pub src_type: DataType,
    pub dst_type: DataType,
    /// Only set for devices that need an explicit layout change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_format: Option<DataFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_format: Option<DataFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvLayerParam {
    pub input_channel: usize,
    pub output_channel: usize,
    pub group: usize,
    pub kernels: [usize; 2],
    pub strides: [usize; 2],
    pub pads: [usize; 4],
    #[serde(default)]
    pub bias: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolingLayerParam {
    pub pool_type: PoolType,
    pub kernels: [usize; 2],
    pub strides: [usize; 2],
    pub pads: [usize; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolType {
    Max,
    Average,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerProductLayerParam {
    pub num_output: usize,
    #[serde(default)]
    pub has_bias: bool,
    #[serde(default = "default_axis")]
    pub axis: i32,
}

fn default_axis() -> i32 {
    1
}

/// Per-type parameter payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    #[default]
    Plain,
    Convolution(ConvLayerParam),
    Pooling(PoolingLayerParam),
    InnerProduct(InnerProductLayerParam),
    Reformat(ReformatLayerParam),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayerParam {
    /// Whether the layer consumes and produces int8 blobs.
    #[serde(default)]
    pub quantized: bool,
    #[serde(default)]
    pub kind: ParamKind,
}

impl LayerParam {
    pub fn plain(quantized: bool) -> Self {
        Self {
            quantized,
            kind: ParamKind::Plain,
        }
    }

    pub fn reformat(&self) -> Option<&ReformatLayerParam> {
        match &self.kind {
            ParamKind::Reformat(param) => Some(param),
            _ => None,
        }
    }
}

/// A single node of a [`NetStructure`](super::NetStructure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub param: LayerParam,
}

impl LayerInfo {
    pub fn new(name: impl Into<String>, layer_type: LayerType, param: LayerParam) -> Self {
        Self {
            name: name.into(),
            layer_type,
            inputs: Vec::new(),
            outputs: Vec::new(),
            param,
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn quantized(&self) -> bool {
        self.param.quantized
    }

    pub fn is_reformat(&self) -> bool {
        self.layer_type.is_reformat()
    }

    pub fn reads(&self, blob: &str) -> bool {
        self.inputs.iter().any(|input| input == blob)
    }
}
