//! Model serialization and deserialization via bincode.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::cascade::CascadedForest;
use crate::error::RfError;
use crate::forest::RandomForest;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

const FOREST_KIND: &str = "random-forest";
const CASCADE_KIND: &str = "cascaded-forest";

/// Leading fields of every model file, readable without knowing the payload.
#[derive(serde::Deserialize)]
struct ModelHeader {
    format_version: u32,
    kind: String,
}

/// Versioned envelope for a serialized model.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope<T> {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Which model type the payload holds.
    kind: String,
    /// Number of classes.
    n_classes: usize,
    /// The serialized model.
    model: T,
}

fn save_envelope<T: Serialize>(
    path: &Path,
    kind: &str,
    n_classes: usize,
    model: &T,
) -> Result<usize, RfError> {
    let envelope = ModelEnvelope {
        format_version: FORMAT_VERSION,
        kind: kind.to_string(),
        n_classes,
        model,
    };

    let bytes = bincode::serialize(&envelope).map_err(|e| RfError::SerializeModel { source: e })?;

    std::fs::write(path, &bytes).map_err(|e| RfError::WriteModel {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(bytes.len())
}

fn load_envelope<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<T, RfError> {
    let bytes = std::fs::read(path).map_err(|e| RfError::ReadModel {
        path: path.to_path_buf(),
        source: e,
    })?;

    let deserialize_error = |e| RfError::DeserializeModel {
        path: path.to_path_buf(),
        source: e,
    };

    let header: ModelHeader = bincode::deserialize(&bytes).map_err(deserialize_error)?;
    if header.format_version != FORMAT_VERSION || header.kind != kind {
        return Err(RfError::IncompatibleModel {
            expected: format!("{kind} v{FORMAT_VERSION}"),
            found: format!("{} v{}", header.kind, header.format_version),
            path: path.to_path_buf(),
        });
    }

    let envelope: ModelEnvelope<T> = bincode::deserialize(&bytes).map_err(deserialize_error)?;
    debug!(kind, n_classes = envelope.n_classes, "model loaded");
    Ok(envelope.model)
}

impl RandomForest {
    /// Save the forest to a binary file.
    ///
    /// Uses bincode encoding wrapped in a versioned envelope.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let size_bytes = save_envelope(path.as_ref(), FOREST_KIND, self.classes.len(), self)?;
        info!(size_bytes, n_trees = self.trees.len(), "forest saved");
        Ok(())
    }

    /// Load a forest from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModel`] | version mismatch or not a forest file |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        load_envelope(path.as_ref(), FOREST_KIND)
    }
}

impl CascadedForest {
    /// Save the cascade to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let size_bytes = save_envelope(path.as_ref(), CASCADE_KIND, self.classes.len(), self)?;
        info!(size_bytes, n_stages = self.stages.len(), "cascade saved");
        Ok(())
    }

    /// Load a cascade from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModel`] | version mismatch or not a cascade file |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        load_envelope(path.as_ref(), CASCADE_KIND)
    }
}
