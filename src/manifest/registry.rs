//! Indexed, immutable manifest snapshots.
//!
//! # Design Decisions
//! - A registry is never mutated after construction; reload builds a new one
//! - `RegistryHandle` swaps snapshots atomically, so lookups take no lock
//! - In-flight requests keep the snapshot they started with

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::manifest::error::ManifestError;
use crate::manifest::schema::{ActionDefinition, ActionManifest};
use crate::manifest::source::ManifestSource;
use crate::manifest::validation::validate_manifest;

/// A parsed manifest with O(1) lookup by action id.
#[derive(Debug)]
pub struct ManifestRegistry {
    manifest: ActionManifest,
    /// The document as published, including fields the gateway ignores.
    document: serde_json::Value,
    index: HashMap<String, usize>,
}

impl ManifestRegistry {
    /// A registry with zero actions.
    pub fn empty() -> Self {
        Self {
            manifest: ActionManifest::empty(),
            document: serde_json::json!({ "version": "1.0", "actions": [] }),
            index: HashMap::new(),
        }
    }

    /// Parse and check manifest text.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let document: serde_json::Value = serde_json::from_str(text)?;
        let manifest: ActionManifest = serde_json::from_value(document.clone())?;
        Self::build(manifest, document)
    }

    /// Build from an already-typed manifest.
    pub fn from_manifest(manifest: ActionManifest) -> Result<Self, ManifestError> {
        let document = serde_json::to_value(&manifest)?;
        Self::build(manifest, document)
    }

    fn build(manifest: ActionManifest, document: serde_json::Value) -> Result<Self, ManifestError> {
        validate_manifest(&manifest).map_err(ManifestError::Invalid)?;

        let index = manifest
            .actions
            .iter()
            .enumerate()
            .map(|(i, action)| (action.id.clone(), i))
            .collect();

        Ok(Self {
            manifest,
            document,
            index,
        })
    }

    /// Fetch from `source` and parse.
    pub async fn load(source: &dyn ManifestSource) -> Result<Self, ManifestError> {
        let text = source.fetch().await?;
        Self::parse(&text)
    }

    /// Like [`load`](Self::load), but any failure degrades to an empty
    /// registry so the host keeps serving (every gated action is denied).
    pub async fn load_or_empty(source: &dyn ManifestSource) -> Self {
        match Self::load(source).await {
            Ok(registry) => {
                tracing::info!(
                    source = %source.describe(),
                    actions = registry.len(),
                    "Manifest loaded"
                );
                registry
            }
            Err(ManifestError::NotFound(location)) => {
                tracing::warn!(source = %location, "Manifest not found, no actions will be admitted");
                Self::empty()
            }
            Err(e) => {
                tracing::error!(
                    source = %source.describe(),
                    error = %e,
                    "Failed to load manifest, no actions will be admitted"
                );
                Self::empty()
            }
        }
    }

    pub fn lookup(&self, action_id: &str) -> Option<&ActionDefinition> {
        self.index
            .get(action_id)
            .map(|&i| &self.manifest.actions[i])
    }

    pub fn manifest(&self) -> &ActionManifest {
        &self.manifest
    }

    pub fn document(&self) -> &serde_json::Value {
        &self.document
    }

    pub fn actions(&self) -> &[ActionDefinition] {
        &self.manifest.actions
    }

    pub fn len(&self) -> usize {
        self.manifest.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.actions.is_empty()
    }
}

impl Default for ManifestRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Shared reference to the current registry snapshot.
#[derive(Clone)]
pub struct RegistryHandle {
    current: Arc<ArcSwap<ManifestRegistry>>,
}

impl RegistryHandle {
    pub fn new(registry: ManifestRegistry) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(registry)),
        }
    }

    /// The registry as of now. Holding the returned `Arc` pins that
    /// snapshot for the rest of a request.
    pub fn snapshot(&self) -> Arc<ManifestRegistry> {
        self.current.load_full()
    }

    /// Atomically replace the registry, returning the previous snapshot.
    pub fn replace(&self, registry: ManifestRegistry) -> Arc<ManifestRegistry> {
        self.current.swap(Arc::new(registry))
    }
}

impl std::fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("actions", &self.current.load().len())
            .finish()
    }
}
