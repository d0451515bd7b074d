use crate::cells::{ForecastCell, RubroKey};
use crate::labor::LaborClassifier;
use crate::taxonomy::TaxonomyIndex;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Bucket for cells whose category cannot be resolved through any fallback.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Grouping key used for the portfolio-wide rollup, which has no natural key.
pub const PORTFOLIO_KEY: &str = "portfolio";

/// External line-item catalog record: category/description overrides per rubro
/// ID, consulted only as a grouping fallback after the cell's own category and
/// the taxonomy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub rubro_id: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthTotals {
    pub planned: f64,
    pub forecast: f64,
    pub actual: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallTotals {
    pub planned: f64,
    pub forecast: f64,
    pub actual: f64,
    /// forecast − planned, computed in the finalize pass.
    pub variance_forecast: f64,
    /// actual − planned, computed in the finalize pass.
    pub variance_actual: f64,
    /// actual / forecast × 100 when forecast > 0, else 0.
    pub percent_consumption: f64,
}

/// Rolled-up financial summary for one group of cells: monthly buckets plus an
/// overall row. `overall.X == Σ by_month[*].X` for every accumulated field.
/// Pass-local: rebuilt from scratch on every aggregation run, never mutated
/// after being returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub key: String,
    pub by_month: BTreeMap<i64, MonthTotals>,
    pub overall: OverallTotals,
}

impl Aggregate {
    fn new(key: String) -> Self {
        Self {
            key,
            by_month: BTreeMap::new(),
            overall: OverallTotals::default(),
        }
    }

    fn accumulate(&mut self, cell: &ForecastCell) {
        let bucket = self.by_month.entry(cell.month).or_default();
        bucket.planned += cell.planned;
        bucket.forecast += cell.forecast;
        bucket.actual += cell.actual;
        self.overall.planned += cell.planned;
        self.overall.forecast += cell.forecast;
        self.overall.actual += cell.actual;
    }

    fn add_month(&mut self, month: i64, totals: &MonthTotals) {
        let bucket = self.by_month.entry(month).or_default();
        bucket.planned += totals.planned;
        bucket.forecast += totals.forecast;
        bucket.actual += totals.actual;
        self.overall.planned += totals.planned;
        self.overall.forecast += totals.forecast;
        self.overall.actual += totals.actual;
    }

    fn finalize(&mut self) {
        finalize_totals(&mut self.overall);
    }
}

/// Per-rubro instance of the aggregate shape, created lazily the first time a
/// cell for that rubro is seen within a grouping pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubroAggregate {
    pub rubro_id: String,
    pub description: String,
    pub category: String,
    pub is_labor: bool,
    pub by_month: BTreeMap<i64, MonthTotals>,
    pub overall: OverallTotals,
}

impl RubroAggregate {
    fn accumulate(&mut self, cell: &ForecastCell) {
        let bucket = self.by_month.entry(cell.month).or_default();
        bucket.planned += cell.planned;
        bucket.forecast += cell.forecast;
        bucket.actual += cell.actual;
        self.overall.planned += cell.planned;
        self.overall.forecast += cell.forecast;
        self.overall.actual += cell.actual;
    }
}

fn finalize_totals(overall: &mut OverallTotals) {
    overall.variance_forecast = overall.forecast - overall.planned;
    overall.variance_actual = overall.actual - overall.planned;
    overall.percent_consumption = if overall.forecast > 0.0 {
        overall.actual / overall.forecast * 100.0
    } else {
        0.0
    };
}

/// Deterministic rollup of normalized cells into category/project/portfolio
/// aggregates. Every entry point is a pure pass over its input: dedup, resolve
/// grouping key, accumulate once per cell, then a separate finalize pass for
/// the derived metrics (consumption needs the fully-summed denominator).
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    index: Arc<TaxonomyIndex>,
    classifier: LaborClassifier,
}

impl AggregationEngine {
    pub fn new(index: Arc<TaxonomyIndex>, classifier: LaborClassifier) -> Self {
        Self { index, classifier }
    }

    pub fn by_category(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
    ) -> BTreeMap<String, Aggregate> {
        self.rollup(cells, line_items, GroupBy::Category).0
    }

    pub fn rubros_by_category(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
    ) -> BTreeMap<String, Vec<RubroAggregate>> {
        self.rollup(cells, line_items, GroupBy::Category).1
    }

    pub fn by_project(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
    ) -> BTreeMap<String, Aggregate> {
        self.rollup(cells, line_items, GroupBy::Project).0
    }

    pub fn rubros_by_project(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
    ) -> BTreeMap<String, Vec<RubroAggregate>> {
        self.rollup(cells, line_items, GroupBy::Project).1
    }

    /// Portfolio-wide rollup across every cell, keyed [`PORTFOLIO_KEY`].
    pub fn portfolio(&self, cells: &[ForecastCell]) -> Aggregate {
        let deduped = dedup_cells(cells);
        let mut aggregate = Aggregate::new(PORTFOLIO_KEY.to_string());
        for cell in &deduped {
            aggregate.accumulate(cell);
        }
        aggregate.finalize();
        aggregate
    }

    /// Recomputes an aggregate from an arbitrary subset of rubro aggregates
    /// (e.g. labor-only). Order-independent and associative: the result equals
    /// rebuilding from the raw cells filtered the same way.
    pub fn recombine(rubros: &[RubroAggregate]) -> Aggregate {
        let mut aggregate = Aggregate::new(PORTFOLIO_KEY.to_string());
        // Month-major accumulation so the result matches a direct rebuild
        // regardless of the subset's ordering.
        let mut months: BTreeMap<i64, MonthTotals> = BTreeMap::new();
        for rubro in rubros {
            for (month, totals) in &rubro.by_month {
                let bucket = months.entry(*month).or_default();
                bucket.planned += totals.planned;
                bucket.forecast += totals.forecast;
                bucket.actual += totals.actual;
            }
        }
        for (month, totals) in &months {
            aggregate.add_month(*month, totals);
        }
        aggregate.finalize();
        aggregate
    }

    fn rollup(
        &self,
        cells: &[ForecastCell],
        line_items: &[LineItem],
        group_by: GroupBy,
    ) -> (BTreeMap<String, Aggregate>, BTreeMap<String, Vec<RubroAggregate>>) {
        let catalog: HashMap<&str, &LineItem> = line_items
            .iter()
            .map(|li| (li.rubro_id.as_str(), li))
            .collect();

        let deduped = dedup_cells(cells);
        info!(
            "rolling up {} cells ({} after dedup) by {:?}",
            cells.len(),
            deduped.len(),
            group_by
        );

        // Accumulation pass: each cell lands in exactly one month bucket of
        // exactly one rubro of exactly one group.
        let mut groups: BTreeMap<String, Aggregate> = BTreeMap::new();
        let mut rubros: BTreeMap<String, BTreeMap<RubroKey, RubroAggregate>> = BTreeMap::new();

        for cell in &deduped {
            let group_key = match group_by {
                GroupBy::Category => self.category_for(cell, &catalog),
                GroupBy::Project => cell
                    .project_id
                    .clone()
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            };

            groups
                .entry(group_key.clone())
                .or_insert_with(|| Aggregate::new(group_key.clone()))
                .accumulate(cell);

            rubros
                .entry(group_key)
                .or_default()
                .entry(cell.rubro.clone())
                .or_insert_with(|| self.seed_rubro(cell, &catalog))
                .accumulate(cell);
        }

        // Finalize pass, only after accumulation completes.
        for aggregate in groups.values_mut() {
            aggregate.finalize();
        }
        let rubro_lists = rubros
            .into_iter()
            .map(|(key, by_rubro)| {
                let list = by_rubro
                    .into_values()
                    .map(|mut r| {
                        finalize_totals(&mut r.overall);
                        r
                    })
                    .collect();
                (key, list)
            })
            .collect();

        (groups, rubro_lists)
    }

    /// Category fallback chain: explicit cell category, taxonomy category for
    /// the canonical id, line-item catalog, then the literal uncategorized
    /// bucket. Never fails, never drops a cell.
    fn category_for(&self, cell: &ForecastCell, catalog: &HashMap<&str, &LineItem>) -> String {
        if let Some(category) = cell.category.as_deref() {
            if !category.trim().is_empty() {
                return category.trim().to_string();
            }
        }
        if let RubroKey::Canonical(id) = &cell.rubro {
            if let Some(entry) = self.index.by_id(id) {
                return entry.category_name.clone();
            }
        }
        if let Some(li) = catalog.get(cell.rubro.as_str()) {
            if let Some(category) = li.category.as_deref() {
                if !category.trim().is_empty() {
                    return category.trim().to_string();
                }
            }
        }
        UNCATEGORIZED.to_string()
    }

    fn seed_rubro(&self, cell: &ForecastCell, catalog: &HashMap<&str, &LineItem>) -> RubroAggregate {
        let rubro_id = cell.rubro.as_str().to_string();
        let entry = match &cell.rubro {
            RubroKey::Canonical(id) => self.index.by_id(id),
            RubroKey::Unresolved(_) => None,
        };

        let description = entry
            .map(|e| e.description.clone())
            .or_else(|| {
                catalog
                    .get(rubro_id.as_str())
                    .and_then(|li| li.description.clone())
            })
            .unwrap_or_default();
        let category = self.category_for(cell, catalog);
        let is_labor = self.classifier.is_labor(
            &rubro_id,
            Some(category.as_str()),
            None,
            Some(description.as_str()),
        );

        RubroAggregate {
            rubro_id,
            description,
            category,
            is_labor,
            by_month: BTreeMap::new(),
            overall: OverallTotals::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupBy {
    Category,
    Project,
}

/// Deduplicates cells by (rubro key, month) before any accumulation, so
/// overlapping source feed generations never double-count. The later-updated
/// record wins; on ties (equal or both-missing timestamps) the first-seen cell
/// is kept, preserving input order. A present timestamp beats a missing one.
/// Cells with out-of-range months are dropped here; preserving them is the
/// normalization layer's job, accounting is this layer's.
fn dedup_cells(cells: &[ForecastCell]) -> Vec<&ForecastCell> {
    let mut kept: Vec<&ForecastCell> = Vec::with_capacity(cells.len());
    let mut by_key: HashMap<(&RubroKey, i64), usize> = HashMap::with_capacity(cells.len());

    for cell in cells {
        if !cell.month_in_range() {
            debug!(
                "dropping cell with out-of-range month {} for rubro '{}'",
                cell.month,
                cell.rubro.as_str()
            );
            continue;
        }
        match by_key.get(&(&cell.rubro, cell.month)).copied() {
            Some(i) => {
                let existing = kept[i];
                let later = match (cell.last_updated, existing.last_updated) {
                    (Some(new), Some(old)) => new > old,
                    (Some(_), None) => true,
                    _ => false,
                };
                if later {
                    debug!(
                        "duplicate ({}, {}): later-updated record wins",
                        cell.rubro.as_str(),
                        cell.month
                    );
                    kept[i] = cell;
                }
            }
            None => {
                by_key.insert((&cell.rubro, cell.month), kept.len());
                kept.push(cell);
            }
        }
    }

    kept
}
