use anyhow::{Context, Result};

use crate::device::NetworkConfig;
use crate::net::{NetResource, NetStructure};

use super::{
    NetOptimizer, NetOptimizerInsertInt8Reformat, OptPriority, OptimizeConfig, PassResult,
};

struct Entry {
    priority: OptPriority,
    pass: Box<dyn NetOptimizer>,
}

/// Runs net optimizers in priority order, stopping at the first failure.
pub struct NetOptimizerManager {
    entries: Vec<Entry>,
    config: OptimizeConfig,
}

impl NetOptimizerManager {
    /// Builds a pipeline from an explicit pass list.
    ///
    /// Passes sharing a priority keep the order they were given in.
    pub fn new(passes: Vec<(OptPriority, Box<dyn NetOptimizer>)>, config: OptimizeConfig) -> Self {
        let mut entries = passes
            .into_iter()
            .map(|(priority, pass)| Entry { priority, pass })
            .collect::<Vec<_>>();
        entries.sort_by_key(|entry| entry.priority);
        Self { entries, config }
    }

    /// Strategies in the order they run.
    pub fn strategies(&self) -> Vec<&'static str> {
        self.entries.iter().map(|entry| entry.pass.strategy()).collect()
    }

    /// Runs every enabled pass that supports `net_config` over the net.
    pub fn optimize(
        &mut self,
        structure: &mut NetStructure,
        resource: &mut NetResource,
        net_config: &NetworkConfig,
    ) -> Result<PassResult> {
        let mut totals = PassResult::default();
        for entry in &mut self.entries {
            let strategy = entry.pass.strategy();
            if self.config.is_disabled(strategy) {
                tracing::debug!(strategy, "optimizer disabled by config");
                continue;
            }
            if !entry.pass.is_supported(net_config) {
                tracing::debug!(
                    strategy,
                    device = ?net_config.device_type,
                    "optimizer not supported"
                );
                continue;
            }

            let _span = tracing::debug_span!("net_optimizer", strategy).entered();
            let stats = entry
                .pass
                .optimize(Some(&mut *structure), resource)
                .with_context(|| format!("optimizer '{strategy}' failed"))?;
            if self.config.log_stats {
                tracing::info!(
                    strategy,
                    changed = stats.changed,
                    layers_inserted = stats.layers_inserted,
                    blobs_added = stats.blobs_added,
                    scales_aliased = stats.scales_aliased,
                    warnings = stats.warnings.len(),
                    layer_count = structure.layers.len(),
                    "optimizer pass stats"
                );
            }
            totals = totals.merge(stats);
        }
        Ok(totals)
    }
}

/// Builds the default pipeline: int8 reformat insertion in the last slot.
pub fn default_pipeline(config: OptimizeConfig) -> NetOptimizerManager {
    let reformat: Box<dyn NetOptimizer> =
        Box::new(NetOptimizerInsertInt8Reformat::new(config.missing_scale));
    NetOptimizerManager::new(vec![(OptPriority::P2, reformat)], config)
}
