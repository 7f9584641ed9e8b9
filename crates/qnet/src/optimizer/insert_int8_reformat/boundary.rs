use std::collections::HashMap;

use smallvec::SmallVec;

use crate::net::{LayerInfo, NetStructure};
use crate::optimizer::OptimizeError;

/// Maps every blob name to the non-reformat layers reading it, in layer order.
///
/// Each consumer is listed once per blob even when it reads the blob several times.
#[derive(Debug, Clone, Default)]
pub struct ConsumerIndex {
    users: HashMap<String, SmallVec<[usize; 4]>>,
}

impl ConsumerIndex {
    pub fn build(layers: &[LayerInfo]) -> Self {
        let mut users: HashMap<String, SmallVec<[usize; 4]>> = HashMap::new();
        for (position, layer) in layers.iter().enumerate() {
            if layer.is_reformat() {
                continue;
            }
            for input in &layer.inputs {
                let entry = users.entry(input.clone()).or_default();
                if entry.last() != Some(&position) {
                    entry.push(position);
                }
            }
        }
        Self { users }
    }

    pub fn consumers_of(&self, blob: &str) -> &[usize] {
        self.users.get(blob).map(|users| users.as_slice()).unwrap_or(&[])
    }
}

/// A blob whose listed consumers disagree with its source on quantization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Boundary {
    pub blob: String,
    pub consumers: SmallVec<[usize; 4]>,
}

/// A model input read by both int8 and float layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InputBoundary {
    /// Quantization status implied by the declared input type.
    pub source_quantized: bool,
    pub boundary: Boundary,
}

/// Finds model inputs consumed with mixed quantization, in input-name order.
///
/// Fails before reporting anything if a mixed input is declared with a type other
/// than int8 or float. Inputs without a declared type are treated as float.
pub(crate) fn input_boundaries(
    structure: &NetStructure,
    layers: &[LayerInfo],
    index: &ConsumerIndex,
) -> Result<Vec<InputBoundary>, OptimizeError> {
    let mut found = Vec::new();
    for input in structure.inputs_shape_map.keys() {
        tracing::debug!(input = %input, "process model input");
        let consumers = index.consumers_of(input);
        let need_int8 = consumers.iter().filter(|&&c| layers[c].quantized()).count();
        let need_float = consumers.len() - need_int8;
        if need_int8 == 0 || need_float == 0 {
            continue;
        }

        let dtype = structure
            .input_data_type_map
            .get(input)
            .copied()
            .unwrap_or_default();
        let Some(source_quantized) = dtype.quantized_status() else {
            tracing::error!(input = %input, ?dtype, "invalid model input data type");
            return Err(OptimizeError::UnsupportedInputType {
                input: input.clone(),
                dtype,
            });
        };

        let differing = consumers
            .iter()
            .copied()
            .filter(|&c| layers[c].quantized() != source_quantized)
            .collect();
        found.push(InputBoundary {
            source_quantized,
            boundary: Boundary {
                blob: input.clone(),
                consumers: differing,
            },
        });
    }
    Ok(found)
}

/// Returns the outputs of `layers[producer]` that a later layer reads with the
/// opposite quantization, each with those later consumers.
///
/// Reformat layers never produce or consume a boundary.
pub(crate) fn producer_boundaries(
    layers: &[LayerInfo],
    index: &ConsumerIndex,
    producer: usize,
) -> Vec<Boundary> {
    let layer = &layers[producer];
    if layer.is_reformat() {
        return Vec::new();
    }

    let mut found: Vec<Boundary> = Vec::new();
    for output in &layer.outputs {
        if found.iter().any(|boundary| &boundary.blob == output) {
            continue;
        }
        let consumers: SmallVec<[usize; 4]> = index
            .consumers_of(output)
            .iter()
            .copied()
            .filter(|&c| c > producer)
            .filter(|&c| layers[c].quantized() != layer.quantized() && layers[c].reads(output))
            .collect();
        if !consumers.is_empty() {
            found.push(Boundary {
                blob: output.clone(),
                consumers,
            });
        }
    }
    found
}
