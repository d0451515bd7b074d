//! # Rubro Forecast
//!
//! Canonical identifier resolution and forecast aggregation for project
//! portfolio cost tracking.
//!
//! Heterogeneous feeds reference cost line-items ("rubros") through legacy
//! numeric codes, machine-generated slugs, human role phrases and accented
//! free text. This crate maps all of them onto a single canonical identifier
//! space and rolls per-month financial cells up into category, project and
//! portfolio totals with exact-once accounting under duplicate and malformed
//! input.
//!
//! ## Pipeline
//!
//! Raw records flow one way: [`CellNormalizer`] turns arbitrary JSON-shaped
//! records into canonical [`ForecastCell`]s (resolving identifiers through
//! [`CanonicalResolver`]), and [`AggregationEngine`] deduplicates and rolls
//! them into [`Aggregate`]/[`RubroAggregate`] view models.
//!
//! ## Example
//!
//! ```rust
//! use rubro_forecast::ForecastEngine;
//! use serde_json::json;
//!
//! let engine = ForecastEngine::default();
//!
//! let cells = engine.normalize_cells(&[
//!     json!({"rubroId": "RB0002", "month": 1, "planned": 1000.0, "forecast": 1000.0}),
//!     json!({"rubro": "EQUIPMENT-001", "month": 1, "presupuesto": 1145.83, "pronostico": 1145.83}),
//! ]);
//!
//! let by_category = engine.by_category(&cells, &[]);
//! assert_eq!(by_category.len(), 2);
//! assert_eq!(by_category["Mano de Obra"].overall.planned, 1000.0);
//! ```
//!
//! Every entry point is a deterministic, side-effect-free transformation; the
//! only shared state is the build-once alias/taxonomy tables, which are
//! read-only after construction and safe to share across threads.

pub mod aggregate;
pub mod alias;
pub mod cells;
pub mod error;
pub mod health;
pub mod labor;
pub mod normalize;
pub mod resolver;
pub mod taxonomy;

pub use aggregate::{
    Aggregate, AggregationEngine, LineItem, MonthTotals, OverallTotals, RubroAggregate,
    PORTFOLIO_KEY, UNCATEGORIZED,
};
pub use alias::AliasRegistry;
pub use cells::{CellNormalizer, ForecastCell, RubroKey, MONTH_MAX, MONTH_MIN};
pub use error::{ForecastError, Result};
pub use health::BudgetHealth;
pub use labor::LaborClassifier;
pub use normalize::{normalize_key, COMPOSITE_SEPARATOR};
pub use resolver::{CanonicalResolver, ResolutionStage, RESOLUTION_PIPELINE};
pub use taxonomy::{CostType, ExecutionType, TaxonomyEntry, TaxonomyIndex};

use log::info;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Facade wiring the whole pipeline together once at startup: alias tables and
/// taxonomy index are built a single time, then shared immutably by the
/// resolver, classifier, normalizer and aggregator.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    registry: Arc<AliasRegistry>,
    index: Arc<TaxonomyIndex>,
    resolver: CanonicalResolver,
    classifier: LaborClassifier,
    normalizer: CellNormalizer,
    aggregator: AggregationEngine,
}

impl ForecastEngine {
    pub fn new(entries: Vec<TaxonomyEntry>) -> Self {
        info!("building forecast engine with {} taxonomy entries", entries.len());

        let registry = Arc::new(AliasRegistry::build(&entries));
        let index = Arc::new(TaxonomyIndex::build(entries));
        let resolver = CanonicalResolver::new(Arc::clone(&registry), Arc::clone(&index));
        let classifier = LaborClassifier::new(Arc::clone(&index));
        let normalizer = CellNormalizer::new(resolver.clone());
        let aggregator = AggregationEngine::new(Arc::clone(&index), classifier.clone());

        Self {
            registry,
            index,
            resolver,
            classifier,
            normalizer,
            aggregator,
        }
    }

    pub fn with_builtin_catalog() -> Self {
        Self::new(TaxonomyEntry::builtin_catalog())
    }

    pub fn registry(&self) -> &AliasRegistry {
        &self.registry
    }

    pub fn taxonomy(&self) -> &TaxonomyIndex {
        &self.index
    }

    pub fn resolver(&self) -> &CanonicalResolver {
        &self.resolver
    }

    pub fn classifier(&self) -> &LaborClassifier {
        &self.classifier
    }

    pub fn aggregator(&self) -> &AggregationEngine {
        &self.aggregator
    }

    /// Fail-soft resolution of a raw rubro reference.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        self.resolver.resolve(raw)
    }

    /// Write-boundary resolution: errors on any non-canonical reference.
    pub fn resolve_or_fail(&self, raw: &str) -> Result<String> {
        self.resolver.resolve_or_fail(raw)
    }

    pub fn normalize_cells(&self, raw: &[Value]) -> Vec<ForecastCell> {
        self.normalizer.normalize(raw)
    }

    /// Parses and normalizes a JSON array feed in one step.
    pub fn parse_feed(&self, feed: &str) -> Result<Vec<ForecastCell>> {
        self.normalizer.parse_feed(feed)
    }

    pub fn by_category(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
    ) -> BTreeMap<String, Aggregate> {
        self.aggregator.by_category(cells, line_items)
    }

    pub fn rubros_by_category(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
    ) -> BTreeMap<String, Vec<RubroAggregate>> {
        self.aggregator.rubros_by_category(cells, line_items)
    }

    pub fn by_project(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
    ) -> BTreeMap<String, Aggregate> {
        self.aggregator.by_project(cells, line_items)
    }

    pub fn rubros_by_project(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
    ) -> BTreeMap<String, Vec<RubroAggregate>> {
        self.aggregator.rubros_by_project(cells, line_items)
    }

    pub fn portfolio(&self, cells: &[ForecastCell]) -> Aggregate {
        self.aggregator.portfolio(cells)
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::with_builtin_catalog()
    }
}
