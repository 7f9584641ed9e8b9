use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::Path,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::layer::LayerInfo;
use super::types::DataType;

/// Topologically ordered layer list plus the blob and input declarations of a net.
///
/// Layer order doubles as execution order: every producer precedes its consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetStructure {
    pub layers: Vec<LayerInfo>,
    #[serde(default)]
    pub blobs: BTreeSet<String>,
    #[serde(default)]
    pub inputs_shape_map: BTreeMap<String, Vec<usize>>,
    #[serde(default)]
    pub input_data_type_map: BTreeMap<String, DataType>,
    #[serde(default)]
    pub outputs: BTreeSet<String>,
}

#[derive(Debug, Error)]
pub enum NetSerdeError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum NetIoError {
    #[error(transparent)]
    Serialization(#[from] NetSerdeError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl NetStructure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a model input with its shape and element type.
    pub fn with_input(
        mut self,
        name: impl Into<String>,
        shape: Vec<usize>,
        data_type: DataType,
    ) -> Self {
        let name = name.into();
        self.blobs.insert(name.clone());
        self.inputs_shape_map.insert(name.clone(), shape);
        self.input_data_type_map.insert(name, data_type);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.blobs.insert(name.clone());
        self.outputs.insert(name);
        self
    }

    /// Appends a layer and records every blob it references.
    pub fn push_layer(&mut self, layer: LayerInfo) {
        for blob in layer.inputs.iter().chain(layer.outputs.iter()) {
            self.blobs.insert(blob.clone());
        }
        self.layers.push(layer);
    }

    pub fn with_layer(mut self, layer: LayerInfo) -> Self {
        self.push_layer(layer);
        self
    }

    /// Returns `true` when at least one layer runs on int8 blobs.
    pub fn is_quantized_net(&self) -> bool {
        self.layers.iter().any(LayerInfo::quantized)
    }

    pub fn layer(&self, name: &str) -> Option<&LayerInfo> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    /// Returns the first layer writing `blob`.
    pub fn producer_of(&self, blob: &str) -> Option<&LayerInfo> {
        self.layers
            .iter()
            .find(|layer| layer.outputs.iter().any(|output| output == blob))
    }

    pub fn consumers_of<'a>(&'a self, blob: &'a str) -> impl Iterator<Item = &'a LayerInfo> + 'a {
        self.layers.iter().filter(move |layer| layer.reads(blob))
    }

    fn register_blobs(&mut self) {
        let referenced = self
            .layers
            .iter()
            .flat_map(|layer| layer.inputs.iter().chain(layer.outputs.iter()))
            .chain(self.inputs_shape_map.keys())
            .chain(self.outputs.iter())
            .cloned()
            .collect::<Vec<_>>();
        self.blobs.extend(referenced);
    }

    pub fn to_json_string(&self) -> Result<String, NetSerdeError> {
        serde_json::to_string_pretty(self).map_err(NetSerdeError::from)
    }

    pub fn from_json_str(src: &str) -> Result<Self, NetSerdeError> {
        let mut structure: NetStructure = serde_json::from_str(src)?;
        structure.register_blobs();
        Ok(structure)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), NetIoError> {
        let contents = self.to_json_string()?;
        fs::write(path, contents).map_err(NetIoError::from)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, NetIoError> {
        let contents = fs::read_to_string(path)?;
        NetStructure::from_json_str(&contents).map_err(NetIoError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{
        InnerProductLayerParam, LayerParam, LayerType, ParamKind, PoolType, PoolingLayerParam,
    };

    const TWO_LAYER_NET: &str = r#"
{
  "layers": [
    {
      "name": "conv",
      "type": "Convolution",
      "inputs": ["data"],
      "outputs": ["conv_out"],
      "param": {
        "quantized": true,
        "kind": {
          "type": "convolution",
          "input_channel": 3,
          "output_channel": 8,
          "group": 1,
          "kernels": [3, 3],
          "strides": [1, 1],
          "pads": [1, 1, 1, 1]
        }
      }
    },
    {
      "name": "relu",
      "type": "Relu",
      "inputs": ["conv_out"],
      "outputs": ["relu_out"]
    }
  ],
  "inputs_shape_map": { "data": [1, 3, 32, 32] },
  "input_data_type_map": { "data": "float" },
  "outputs": ["relu_out"]
}
"#;

    #[test]
    fn json_loading_registers_referenced_blobs() {
        let net = NetStructure::from_json_str(TWO_LAYER_NET).expect("parse net");
        let expected: BTreeSet<String> = ["conv_out", "data", "relu_out"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(net.blobs, expected);
        assert!(net.is_quantized_net());
        assert!(matches!(
            net.layers[0].param.kind,
            ParamKind::Convolution(ref conv) if conv.output_channel == 8
        ));
        assert_eq!(net.layers[1].param, LayerParam::plain(false));
        assert_eq!(net.producer_of("conv_out").map(|l| l.name.as_str()), Some("conv"));
        assert_eq!(net.consumers_of("conv_out").count(), 1);
    }

    const PAYLOAD_NET: &str = r#"
{
  "layers": [
    {
      "name": "up",
      "type": "Deconvolution",
      "inputs": ["data"],
      "outputs": ["up_out"],
      "param": {
        "kind": {
          "type": "convolution",
          "input_channel": 4,
          "output_channel": 4,
          "group": 4,
          "kernels": [2, 2],
          "strides": [2, 2],
          "pads": [0, 0, 0, 0],
          "bias": true
        }
      }
    },
    {
      "name": "pool",
      "type": "Pooling",
      "inputs": ["up_out"],
      "outputs": ["pool_out"],
      "param": {
        "quantized": true,
        "kind": {
          "type": "pooling",
          "pool_type": "average",
          "kernels": [2, 2],
          "strides": [2, 2],
          "pads": [0, 0, 0, 0]
        }
      }
    },
    {
      "name": "fc",
      "type": "InnerProduct",
      "inputs": ["pool_out"],
      "outputs": ["fc_out"],
      "param": { "kind": { "type": "inner_product", "num_output": 10 } }
    }
  ],
  "inputs_shape_map": { "data": [1, 4, 8, 8] }
}
"#;

    #[test]
    fn layer_payloads_parse_by_kind_tag() {
        let net = NetStructure::from_json_str(PAYLOAD_NET).expect("parse net");

        let up = net.layer("up").expect("deconvolution layer");
        assert_eq!(up.layer_type, LayerType::Deconvolution);
        assert!(matches!(
            up.param.kind,
            ParamKind::Convolution(ref conv) if conv.group == 4 && conv.bias
        ));

        let pool = net.layer("pool").expect("pooling layer");
        assert!(pool.quantized());
        assert_eq!(
            pool.param.kind,
            ParamKind::Pooling(PoolingLayerParam {
                pool_type: PoolType::Average,
                kernels: [2, 2],
                strides: [2, 2],
                pads: [0, 0, 0, 0],
            })
        );

        let fc = net.layer("fc").expect("inner product layer");
        assert_eq!(
            fc.param.kind,
            ParamKind::InnerProduct(InnerProductLayerParam {
                num_output: 10,
                has_bias: false,
                axis: 1,
            })
        );
        assert!(net.layer("missing").is_none());
        assert!(net.input_data_type_map.is_empty());
    }

    #[test]
    fn json_file_round_trip_preserves_structure() {
        let net = NetStructure::new()
            .with_input("data", vec![1, 4], DataType::Int8)
            .with_layer(
                LayerInfo::new("fc", LayerType::InnerProduct, LayerParam::plain(true))
                    .with_inputs(["data"])
                    .with_outputs(["fc_out"]),
            )
            .with_output("fc_out");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("net.json");
        net.save_json(&path).expect("save");
        let loaded = NetStructure::load_json(&path).expect("load");
        assert_eq!(loaded, net);
    }

    #[test]
    fn malformed_json_reports_serde_error() {
        let err = NetStructure::from_json_str("{ \"layers\": 3 }").unwrap_err();
        assert!(matches!(err, NetSerdeError::Json(_)));
    }
}
