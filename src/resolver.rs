use crate::alias::AliasRegistry;
use crate::error::{ForecastError, Result};
use crate::taxonomy::TaxonomyIndex;
use log::debug;
use std::sync::Arc;

/// One stage of the resolution pipeline. The order of [`RESOLUTION_PIPELINE`]
/// is the contract: earlier stages always win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    /// Verbatim (case-sensitive, pre-normalization) legacy-code hit.
    LegacyExact,
    /// Normalized hit in the legacy/role alias tables, including the
    /// composite-slug structural fallback.
    AliasNormalized,
    /// Taxonomy hit by canonical id or line code.
    TaxonomyId,
    /// Taxonomy hit by line name.
    TaxonomyLineName,
    /// Taxonomy hit by description.
    TaxonomyDescription,
}

pub const RESOLUTION_PIPELINE: [ResolutionStage; 5] = [
    ResolutionStage::LegacyExact,
    ResolutionStage::AliasNormalized,
    ResolutionStage::TaxonomyId,
    ResolutionStage::TaxonomyLineName,
    ResolutionStage::TaxonomyDescription,
];

/// Resolves any raw rubro reference to one canonical ID by running the stages
/// of [`RESOLUTION_PIPELINE`] in order, short-circuiting on the first hit.
///
/// Deterministic: the same raw string, or two raw strings that normalize
/// identically, always resolve to the same result. The shared tables are
/// immutable after construction, so a resolver can be used from any number of
/// threads without coordination.
#[derive(Debug, Clone)]
pub struct CanonicalResolver {
    registry: Arc<AliasRegistry>,
    index: Arc<TaxonomyIndex>,
}

impl CanonicalResolver {
    pub fn new(registry: Arc<AliasRegistry>, index: Arc<TaxonomyIndex>) -> Self {
        Self { registry, index }
    }

    /// Fail-soft resolution: `None` means "unresolved". Write paths must not
    /// treat the raw input as canonical on a miss; that escalation lives in
    /// [`CanonicalResolver::resolve_or_fail`].
    pub fn resolve(&self, raw: &str) -> Option<String> {
        self.resolve_with_stage(raw).map(|(id, _)| id)
    }

    /// Like [`CanonicalResolver::resolve`], but also reports which stage
    /// produced the hit, so the priority order is a testable artifact.
    pub fn resolve_with_stage(&self, raw: &str) -> Option<(String, ResolutionStage)> {
        if raw.trim().is_empty() {
            return None;
        }
        for stage in RESOLUTION_PIPELINE {
            if let Some(id) = self.apply_stage(stage, raw) {
                debug!("resolved '{}' -> '{}' via {:?}", raw, id, stage);
                return Some((id, stage));
            }
        }
        None
    }

    fn apply_stage(&self, stage: ResolutionStage, raw: &str) -> Option<String> {
        match stage {
            ResolutionStage::LegacyExact => self
                .registry
                .lookup_legacy_exact(raw)
                .map(str::to_string),
            ResolutionStage::AliasNormalized => self
                .registry
                .lookup_normalized(raw)
                .map(str::to_string),
            ResolutionStage::TaxonomyId => self
                .index
                .by_id(raw)
                .or_else(|| self.index.by_line_code(raw))
                .map(|e| e.id.clone()),
            ResolutionStage::TaxonomyLineName => {
                self.index.by_line_name(raw).map(|e| e.id.clone())
            }
            ResolutionStage::TaxonomyDescription => {
                self.index.by_description(raw).map(|e| e.id.clone())
            }
        }
    }

    /// Write-boundary variant: nothing may ever be persisted under a
    /// non-canonical identifier, so a miss is a blocking error naming the
    /// offending raw value.
    pub fn resolve_or_fail(&self, raw: &str) -> Result<String> {
        self.resolve(raw)
            .ok_or_else(|| ForecastError::UnresolvedRubro(raw.to_string()))
    }

    pub fn taxonomy(&self) -> &TaxonomyIndex {
        &self.index
    }
}
