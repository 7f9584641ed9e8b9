use std::{collections::HashMap, fs, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};

use super::structure::{NetIoError, NetSerdeError};

/// Suffix appended to a blob name to form its scale key.
pub const BLOB_SCALE_SUFFIX: &str = ".scale";

/// Returns the scale key for `blob`.
pub fn blob_scale_key(blob: &str) -> String {
    format!("{blob}{BLOB_SCALE_SUFFIX}")
}

/// Per-tensor factors mapping int8 values back to floating-point magnitude.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobScale {
    pub scales: Vec<f32>,
    #[serde(default)]
    pub zero_points: Vec<i8>,
}

impl BlobScale {
    pub fn per_tensor(scale: f32) -> Self {
        Self {
            scales: vec![scale],
            zero_points: vec![0],
        }
    }

    pub fn per_channel(scales: Vec<f32>) -> Self {
        let zero_points = vec![0; scales.len()];
        Self {
            scales,
            zero_points,
        }
    }
}

/// Blob scales keyed by `blob + ".scale"`.
///
/// Entries are shared handles: aliasing a key clones the `Arc`, never the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaleStore {
    entries: HashMap<String, Arc<BlobScale>>,
}

impl ScaleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Arc<BlobScale>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, scale: Arc<BlobScale>) {
        self.entries.insert(key.into(), scale);
    }

    pub fn scale_of(&self, blob: &str) -> Option<&Arc<BlobScale>> {
        self.get(&blob_scale_key(blob))
    }

    pub fn set_scale(&mut self, blob: &str, scale: BlobScale) {
        self.insert(blob_scale_key(blob), Arc::new(scale));
    }

    /// Makes `to` share the scale of `from`. Returns `false` when `from` has none.
    ///
    /// An existing entry for `to` is left untouched.
    pub fn alias_blob(&mut self, from: &str, to: &str) -> bool {
        let Some(scale) = self.scale_of(from).cloned() else {
            return false;
        };
        self.entries.entry(blob_scale_key(to)).or_insert(scale);
        true
    }
}

/// Weights and quantization metadata that accompany a [`NetStructure`](super::NetStructure).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetResource {
    #[serde(default)]
    pub scales: ScaleStore,
}

impl NetResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(mut self, blob: &str, scale: BlobScale) -> Self {
        self.scales.set_scale(blob, scale);
        self
    }

    pub fn to_json_string(&self) -> Result<String, NetSerdeError> {
        serde_json::to_string_pretty(self).map_err(NetSerdeError::from)
    }

    pub fn from_json_str(src: &str) -> Result<Self, NetSerdeError> {
        serde_json::from_str(src).map_err(NetSerdeError::from)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), NetIoError> {
        let contents = self.to_json_string()?;
        fs::write(path, contents).map_err(NetIoError::from)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, NetIoError> {
        let contents = fs::read_to_string(path)?;
        NetResource::from_json_str(&contents).map_err(NetIoError::from)
    }
}
