//! Net-level optimizer passes and the priority-ordered pipeline that runs them.
//!
//! Passes are plain values handed to [`NetOptimizerManager::new`]; there is no
//! global registry. The default pipeline only carries int8 reformat insertion,
//! which has to run after every fusion pass so layer boundaries are final.

mod error;
mod insert_int8_reformat;
mod manager;

use crate::device::NetworkConfig;
use crate::net::{NetResource, NetStructure};

pub use error::{OptimizeError, OptimizeWarning};
pub use insert_int8_reformat::{
    ConsumerIndex, NetOptimizerInsertInt8Reformat, ReformatLayerFactory, FROM_INPUT_MARKER,
    REFORMAT_NAME_SUFFIX,
};
pub use manager::{default_pipeline, NetOptimizerManager};

/// Strategy name of the int8 reformat insertion pass.
pub const NET_OPTIMIZER_INSERT_INT8_REFORMAT: &str = "net_optimizer_insert_int8_reformat";

/// Pipeline slot of a pass. Lower slots run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptPriority {
    P0,
    P1,
    P2,
}

/// How a float→int8 boundary without a source scale is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingScalePolicy {
    /// Log, record a warning and keep the structural rewrite.
    #[default]
    Warn,
    /// Abort the pass.
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct OptimizeConfig {
    pub missing_scale: MissingScalePolicy,
    /// Emit per-pass statistics through `tracing`.
    pub log_stats: bool,
    /// Strategies the manager skips.
    pub disabled_passes: Vec<String>,
}

impl OptimizeConfig {
    /// Reads `QNET_STRICT_SCALES`, `QNET_PASS_STATS` and `QNET_DISABLED_PASSES`.
    pub fn from_env() -> Self {
        let missing_scale = if crate::env::strict_scales_enabled() {
            MissingScalePolicy::Error
        } else {
            MissingScalePolicy::Warn
        };
        Self {
            missing_scale,
            log_stats: crate::env::pass_stats_enabled(),
            disabled_passes: crate::env::disabled_passes().to_vec(),
        }
    }

    pub fn is_disabled(&self, strategy: &str) -> bool {
        self.disabled_passes.iter().any(|name| name == strategy)
    }
}

/// Result returned by a [`NetOptimizer`] after it runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassResult {
    /// Whether the pass changed the net.
    pub changed: bool,
    pub layers_inserted: usize,
    pub blobs_added: usize,
    pub scales_aliased: usize,
    pub warnings: Vec<OptimizeWarning>,
}

impl PassResult {
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Merges two run results, accumulating statistics.
    pub fn merge(mut self, other: PassResult) -> PassResult {
        self.changed |= other.changed;
        self.layers_inserted += other.layers_inserted;
        self.blobs_added += other.blobs_added;
        self.scales_aliased += other.scales_aliased;
        self.warnings.extend(other.warnings);
        self
    }
}

/// Interface implemented by passes that rewrite a whole net.
pub trait NetOptimizer: Send + Sync {
    /// Stable identity used for ordering, disabling and logging.
    fn strategy(&self) -> &'static str;

    /// Decides whether the pass applies to `config` and binds any device state it needs.
    fn is_supported(&mut self, config: &NetworkConfig) -> bool;

    fn optimize(
        &self,
        structure: Option<&mut NetStructure>,
        resource: &mut NetResource,
    ) -> Result<PassResult, OptimizeError>;
}
