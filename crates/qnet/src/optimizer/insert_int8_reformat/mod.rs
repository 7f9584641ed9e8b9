//! Inserts `Reformat` layers wherever an int8 blob feeds a float layer or the
//! other way round.
//!
//! Model inputs read by both kinds of layers get one reformat at the front of the
//! net. Every other producer with mismatching later consumers gets a single
//! reformat right after it, covering all of its affected outputs. Consumers that
//! agree with the producer keep reading the original blob.

mod boundary;
mod factory;
mod rewrite;

use std::slice;

use crate::device::{DeviceCapabilities, DeviceType, NetworkConfig};
use crate::net::{LayerInfo, NetResource, NetStructure};

use self::boundary::{input_boundaries, producer_boundaries};
use self::rewrite::GraphRewriter;
use super::{
    MissingScalePolicy, NetOptimizer, OptimizeError, PassResult,
    NET_OPTIMIZER_INSERT_INT8_REFORMAT,
};

pub use self::boundary::ConsumerIndex;
pub use self::factory::ReformatLayerFactory;

/// Suffix of every reformat layer and reformat output blob.
pub const REFORMAT_NAME_SUFFIX: &str = ".reformat";
/// Extra marker for reformats fed directly by a model input.
pub const FROM_INPUT_MARKER: &str = ".from_input";

#[derive(Debug, Clone, Default)]
pub struct NetOptimizerInsertInt8Reformat {
    factory: ReformatLayerFactory,
    missing_scale: MissingScalePolicy,
}

impl NetOptimizerInsertInt8Reformat {
    pub fn new(missing_scale: MissingScalePolicy) -> Self {
        Self {
            factory: ReformatLayerFactory::default(),
            missing_scale,
        }
    }

    fn rewrite(
        &self,
        structure: &mut NetStructure,
        resource: &mut NetResource,
    ) -> Result<PassResult, OptimizeError> {
        let mut layers = structure.layers.clone();
        let index = ConsumerIndex::build(&layers);
        let from_inputs = input_boundaries(structure, &layers, &index)?;

        let mut rewriter = GraphRewriter::new(
            &layers,
            &structure.blobs,
            &resource.scales,
            self.missing_scale,
        );
        let input_suffix = format!("{REFORMAT_NAME_SUFFIX}{FROM_INPUT_MARKER}");
        let mut leading = Vec::with_capacity(from_inputs.len());
        for found in &from_inputs {
            let name = format!("{}{}", found.boundary.blob, input_suffix);
            let mut reformat = self.factory.create(name, found.source_quantized);
            rewriter.insert(
                &mut layers,
                &mut reformat,
                found.source_quantized,
                slice::from_ref(&found.boundary),
                &input_suffix,
            )?;
            log_inserted(&reformat);
            leading.push(reformat);
        }

        let mut trailing: Vec<Option<LayerInfo>> = vec![None; layers.len()];
        for position in 0..layers.len() {
            let boundaries = producer_boundaries(&layers, &index, position);
            if boundaries.is_empty() {
                continue;
            }
            let producer = &layers[position];
            let source_quantized = producer.quantized();
            let name = format!("{}{}", producer.name, REFORMAT_NAME_SUFFIX);
            let mut reformat = self.factory.create(name, source_quantized);
            rewriter.insert(
                &mut layers,
                &mut reformat,
                source_quantized,
                &boundaries,
                REFORMAT_NAME_SUFFIX,
            )?;
            log_inserted(&reformat);
            trailing[position] = Some(reformat);
        }

        let staged = rewriter.finish();
        let mut fused = leading;
        fused.reserve(layers.len());
        for (layer, reformat) in layers.into_iter().zip(trailing) {
            fused.push(layer);
            fused.extend(reformat);
        }
        structure.layers = fused;
        Ok(staged.commit(&mut structure.blobs, &mut resource.scales))
    }
}

fn log_inserted(reformat: &LayerInfo) {
    tracing::debug!(
        layer = %reformat.name,
        src = ?reformat.inputs,
        dst = ?reformat.outputs,
        "insert int8 reformat layer"
    );
}

impl NetOptimizer for NetOptimizerInsertInt8Reformat {
    fn strategy(&self) -> &'static str {
        NET_OPTIMIZER_INSERT_INT8_REFORMAT
    }

    fn is_supported(&mut self, config: &NetworkConfig) -> bool {
        let device = config.device_type;
        self.factory = ReformatLayerFactory::new(Some(DeviceCapabilities::for_device(device)));
        matches!(device, DeviceType::Arm | DeviceType::Naive | DeviceType::X86)
    }

    fn optimize(
        &self,
        structure: Option<&mut NetStructure>,
        resource: &mut NetResource,
    ) -> Result<PassResult, OptimizeError> {
        let Some(structure) = structure else {
            tracing::error!("empty net structure");
            return Err(OptimizeError::MissingStructure);
        };
        if structure.layers.len() <= 1 {
            return Ok(PassResult::unchanged());
        }
        // only mixed-precision nets need reformatting
        if !structure.is_quantized_net() {
            return Ok(PassResult::unchanged());
        }
        self.rewrite(structure, resource)
    }
}
