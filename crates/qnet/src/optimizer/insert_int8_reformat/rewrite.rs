use std::collections::BTreeSet;

use crate::net::{blob_scale_key, LayerInfo, ScaleStore};
use crate::optimizer::{MissingScalePolicy, OptimizeError, OptimizeWarning, PassResult};

use super::boundary::Boundary;

/// Renames consumer inputs onto reformat outputs and stages the blob and scale
/// entries the rewrite needs.
///
/// Nothing outside the layer list is touched until [`GraphRewriter::finish`] and
/// [`StagedRewrite::commit`], so a failed pass leaves blobs and scales as they were.
pub(crate) struct GraphRewriter<'a> {
    layer_names: BTreeSet<String>,
    blobs: &'a BTreeSet<String>,
    scales: &'a ScaleStore,
    policy: MissingScalePolicy,
    new_blobs: BTreeSet<String>,
    scale_aliases: Vec<(String, String)>,
    warnings: Vec<OptimizeWarning>,
    layers_inserted: usize,
}

impl<'a> GraphRewriter<'a> {
    pub fn new(
        layers: &[LayerInfo],
        blobs: &'a BTreeSet<String>,
        scales: &'a ScaleStore,
        policy: MissingScalePolicy,
    ) -> Self {
        Self {
            layer_names: layers.iter().map(|layer| layer.name.clone()).collect(),
            blobs,
            scales,
            policy,
            new_blobs: BTreeSet::new(),
            scale_aliases: Vec::new(),
            warnings: Vec::new(),
            layers_inserted: 0,
        }
    }

    /// Wires `reformat` between each boundary blob and its differing consumers.
    ///
    /// Every boundary blob `T` becomes an input of `reformat` and `T + suffix` its
    /// matching output; consumers listed in the boundary read the new blob instead.
    pub fn insert(
        &mut self,
        layers: &mut [LayerInfo],
        reformat: &mut LayerInfo,
        source_quantized: bool,
        boundaries: &[Boundary],
        suffix: &str,
    ) -> Result<(), OptimizeError> {
        if !self.layer_names.insert(reformat.name.clone()) {
            return Err(OptimizeError::LayerCollision {
                layer: reformat.name.clone(),
            });
        }
        for boundary in boundaries {
            let new_blob = format!("{}{}", boundary.blob, suffix);
            if self.blobs.contains(&new_blob) || self.new_blobs.contains(&new_blob) {
                return Err(OptimizeError::BlobCollision { blob: new_blob });
            }

            reformat.inputs.push(boundary.blob.clone());
            reformat.outputs.push(new_blob.clone());
            for &consumer in &boundary.consumers {
                for input in layers[consumer]
                    .inputs
                    .iter_mut()
                    .filter(|input| **input == boundary.blob)
                {
                    input.clone_from(&new_blob);
                }
            }

            if !source_quantized {
                self.stage_scale_alias(&boundary.blob, &new_blob)?;
            }
            self.new_blobs.insert(new_blob);
        }
        self.layers_inserted += 1;
        Ok(())
    }

    fn stage_scale_alias(&mut self, blob: &str, new_blob: &str) -> Result<(), OptimizeError> {
        let key = blob_scale_key(blob);
        if self.scales.contains_key(&key) {
            self.scale_aliases
                .push((blob.to_string(), new_blob.to_string()));
            return Ok(());
        }

        match self.policy {
            MissingScalePolicy::Error => {
                tracing::error!(blob, key = %key, "can not get blob scale");
                Err(OptimizeError::MissingScale {
                    blob: blob.to_string(),
                    key,
                })
            }
            MissingScalePolicy::Warn => {
                tracing::warn!(
                    blob,
                    key = %key,
                    reformatted = new_blob,
                    "can not get blob scale, reformat output left without scale"
                );
                self.warnings.push(OptimizeWarning::MissingScale {
                    blob: blob.to_string(),
                    key,
                    reformatted: new_blob.to_string(),
                });
                Ok(())
            }
        }
    }

    pub fn finish(self) -> StagedRewrite {
        StagedRewrite {
            new_blobs: self.new_blobs,
            scale_aliases: self.scale_aliases,
            warnings: self.warnings,
            layers_inserted: self.layers_inserted,
        }
    }
}

/// Blob and scale additions produced by a successful rewrite.
pub(crate) struct StagedRewrite {
    new_blobs: BTreeSet<String>,
    scale_aliases: Vec<(String, String)>,
    warnings: Vec<OptimizeWarning>,
    layers_inserted: usize,
}

impl StagedRewrite {
    pub fn commit(self, blobs: &mut BTreeSet<String>, scales: &mut ScaleStore) -> PassResult {
        let blobs_added = self.new_blobs.len();
        blobs.extend(self.new_blobs);

        let mut scales_aliased = 0usize;
        for (from, to) in &self.scale_aliases {
            if scales.alias_blob(from, to) {
                scales_aliased += 1;
            }
        }

        PassResult {
            changed: self.layers_inserted > 0,
            layers_inserted: self.layers_inserted,
            blobs_added,
            scales_aliased,
            warnings: self.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;
    use crate::net::{BlobScale, LayerParam, LayerType};

    fn consumer(name: &str, quantized: bool, inputs: &[&str]) -> LayerInfo {
        LayerInfo::new(name, LayerType::Other(name.into()), LayerParam::plain(quantized))
            .with_inputs(inputs.iter().copied())
            .with_outputs([format!("{name}_out")])
    }

    #[test]
    fn insert_renames_every_occurrence_in_listed_consumers() {
        let blobs = BTreeSet::from(["x".to_string()]);
        let mut scales = ScaleStore::new();
        scales.set_scale("x", BlobScale::per_tensor(0.1));
        let mut layers = vec![consumer("q", true, &["x", "x"]), consumer("r", false, &["x"])];
        let mut reformat = LayerInfo::new("p.reformat", LayerType::Reformat, LayerParam::default());

        let staged = {
            let mut rewriter =
                GraphRewriter::new(&layers, &blobs, &scales, MissingScalePolicy::Warn);
            let boundary = Boundary {
                blob: "x".into(),
                consumers: smallvec![0],
            };
            rewriter
                .insert(&mut layers, &mut reformat, false, &[boundary], ".reformat")
                .expect("insert");
            rewriter.finish()
        };

        assert_eq!(layers[0].inputs, vec!["x.reformat", "x.reformat"]);
        assert_eq!(layers[1].inputs, vec!["x"]);
        assert_eq!(reformat.inputs, vec!["x"]);
        assert_eq!(reformat.outputs, vec!["x.reformat"]);

        let mut blobs = blobs;
        let result = staged.commit(&mut blobs, &mut scales);
        assert!(blobs.contains("x.reformat"));
        assert_eq!(result.scales_aliased, 1);
        assert_eq!(result.layers_inserted, 1);
        assert!(scales.get("x.reformat.scale").is_some());
    }

    #[test]
    fn existing_blob_name_is_a_collision() {
        let blobs = BTreeSet::from(["x".to_string(), "x.reformat".to_string()]);
        let scales = ScaleStore::new();
        let mut layers = vec![consumer("q", true, &["x"])];
        let mut reformat = LayerInfo::new("p.reformat", LayerType::Reformat, LayerParam::default());
        let mut rewriter = GraphRewriter::new(&layers, &blobs, &scales, MissingScalePolicy::Warn);
        let boundary = Boundary {
            blob: "x".into(),
            consumers: smallvec![0],
        };
        let err = rewriter
            .insert(&mut layers, &mut reformat, true, &[boundary], ".reformat")
            .unwrap_err();
        assert_eq!(
            err,
            OptimizeError::BlobCollision {
                blob: "x.reformat".into()
            }
        );
        assert_eq!(layers[0].inputs, vec!["x"]);
    }

    #[test]
    fn existing_layer_name_is_a_collision() {
        let blobs = BTreeSet::from(["x".to_string()]);
        let scales = ScaleStore::new();
        let mut layers = vec![consumer("q", true, &["x"]), consumer("p.reformat", false, &["x"])];
        let mut reformat = LayerInfo::new("p.reformat", LayerType::Reformat, LayerParam::default());
        let mut rewriter = GraphRewriter::new(&layers, &blobs, &scales, MissingScalePolicy::Warn);
        let boundary = Boundary {
            blob: "x".into(),
            consumers: smallvec![0],
        };
        let err = rewriter
            .insert(&mut layers, &mut reformat, true, &[boundary], ".reformat")
            .unwrap_err();
        assert_eq!(
            err,
            OptimizeError::LayerCollision {
                layer: "p.reformat".into()
            }
        );
        assert!(err.is_structural());
        assert_eq!(layers[0].inputs, vec!["x"]);
        assert!(reformat.inputs.is_empty());
    }

    #[test]
    fn dequantize_boundary_never_needs_scale() {
        let blobs = BTreeSet::new();
        let scales = ScaleStore::new();
        let mut layers = vec![consumer("f", false, &["x"])];
        let mut reformat = LayerInfo::new("p.reformat", LayerType::Reformat, LayerParam::default());
        let mut rewriter = GraphRewriter::new(&layers, &blobs, &scales, MissingScalePolicy::Error);
        let boundary = Boundary {
            blob: "x".into(),
            consumers: smallvec![0],
        };
        rewriter
            .insert(&mut layers, &mut reformat, true, &[boundary], ".reformat")
            .expect("int8 source needs no scale copy");
        assert!(rewriter.finish().warnings.is_empty());
    }
}
