use crate::normalize::normalize_key;
use crate::resolver::CanonicalResolver;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MONTH_MIN: i64 = 1;
/// Multi-year contracts run past a single 12-month cycle; five years of
/// monthly buckets is the supported horizon.
pub const MONTH_MAX: i64 = 60;

/// The identifier a normalized cell carries: either a resolved canonical ID or
/// an explicit unresolved sentinel wrapping the normalized raw reference.
/// Never a raw variant, so downstream accounting keys are stable; unresolved
/// cells stay visible for diagnostics instead of being discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RubroKey {
    Canonical(String),
    Unresolved(String),
}

impl RubroKey {
    pub fn as_str(&self) -> &str {
        match self {
            RubroKey::Canonical(id) | RubroKey::Unresolved(id) => id,
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, RubroKey::Canonical(_))
    }
}

/// One (rubro, month) financial data point in canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastCell {
    pub rubro: RubroKey,
    pub project_id: Option<String>,
    /// Explicit category carried by the raw record, if any. Grouping falls
    /// back to the taxonomy and the line-item catalog when absent.
    pub category: Option<String>,
    /// Month index within the contract, 1..=60 when valid. Out-of-range and
    /// unparseable values are preserved (0 for unparseable) and flagged via
    /// [`ForecastCell::month_in_range`]; dropping them is aggregation policy.
    pub month: i64,
    pub planned: f64,
    pub forecast: f64,
    pub actual: f64,
    pub variance: f64,
    pub last_updated: Option<DateTime<Utc>>,
    pub updated_by: Option<String>,
}

impl ForecastCell {
    pub fn month_in_range(&self) -> bool {
        (MONTH_MIN..=MONTH_MAX).contains(&self.month)
    }

    /// Write-boundary accessor: the month, or a blocking error when it is
    /// outside the supported horizon.
    pub fn canonical_month(&self) -> crate::error::Result<i64> {
        if self.month_in_range() {
            Ok(self.month)
        } else {
            Err(crate::error::ForecastError::MonthOutOfRange(self.month))
        }
    }
}

// Accepted field-name variants per semantic field, one list per field, probed
// in order. These cover every historical feed naming convention still in
// circulation; case differences are tolerated on top of the listed spellings.
const RUBRO_FIELDS: &[&str] = &[
    "rubro_id", "rubroId", "rubro", "line_item_id", "lineItemId", "line_item", "codigo", "code",
    "concepto", "role",
];
const PROJECT_FIELDS: &[&str] = &["project_id", "projectId", "proyecto", "project"];
const CATEGORY_FIELDS: &[&str] = &["category", "categoria", "category_name", "categoryName"];
const MONTH_INDEX_FIELDS: &[&str] = &["month_index", "monthIndex", "mes_index", "mesIndex"];
const MONTH_FIELDS: &[&str] = &["month", "mes", "period", "periodo"];
const PLANNED_FIELDS: &[&str] = &[
    "planned", "planned_amount", "plannedAmount", "plan", "budget", "presupuesto",
];
const FORECAST_FIELDS: &[&str] = &[
    "forecast", "forecast_amount", "forecastAmount", "pronostico", "projected", "projection",
];
const ACTUAL_FIELDS: &[&str] = &[
    "actual", "actual_amount", "actualAmount", "real", "ejecutado", "spent",
];
const VARIANCE_FIELDS: &[&str] = &["variance", "desviacion", "variacion"];
const UPDATED_AT_FIELDS: &[&str] = &[
    "last_updated", "lastUpdated", "updated_at", "updatedAt", "modified_at", "timestamp",
];
const UPDATED_BY_FIELDS: &[&str] = &["updated_by", "updatedBy", "usuario", "user", "modified_by"];

/// Maps arbitrary raw forecast-cell records onto [`ForecastCell`]. Field names
/// vary per historical feed, numeric fields may be strings, months may be
/// indices or "YYYY-MM" strings; none of that ever aborts the batch.
#[derive(Debug, Clone)]
pub struct CellNormalizer {
    resolver: CanonicalResolver,
}

impl CellNormalizer {
    pub fn new(resolver: CanonicalResolver) -> Self {
        Self { resolver }
    }

    /// Normalizes a batch. Malformed individual records degrade to defaults
    /// (zero amounts, month 0, unresolved sentinel); they are never dropped
    /// here so the batch stays inspectable end to end.
    pub fn normalize(&self, raw: &[Value]) -> Vec<ForecastCell> {
        raw.iter().map(|record| self.normalize_one(record)).collect()
    }

    /// Parses a JSON array feed and normalizes it. The only error here is a
    /// syntactically broken feed; individual malformed records still degrade
    /// per-field instead of failing.
    pub fn parse_feed(&self, feed: &str) -> crate::error::Result<Vec<ForecastCell>> {
        let records: Vec<Value> = serde_json::from_str(feed)?;
        Ok(self.normalize(&records))
    }

    pub fn normalize_one(&self, raw: &Value) -> ForecastCell {
        let empty = Map::new();
        let obj = raw.as_object().unwrap_or(&empty);

        let rubro = self.resolve_rubro(obj);
        if !rubro.is_canonical() && !rubro.as_str().is_empty() {
            warn!("unresolved rubro reference kept as sentinel: '{}'", rubro.as_str());
        }

        let month = resolve_month(obj);
        if !(MONTH_MIN..=MONTH_MAX).contains(&month) {
            debug!("month {} outside 1..=60 for rubro '{}'", month, rubro.as_str());
        }

        let planned = field(obj, PLANNED_FIELDS).map_or(0.0, coerce_number);
        let forecast = field(obj, FORECAST_FIELDS).map_or(0.0, coerce_number);
        let actual = field(obj, ACTUAL_FIELDS).map_or(0.0, coerce_number);
        let variance = field(obj, VARIANCE_FIELDS)
            .map(coerce_number)
            .unwrap_or(forecast - planned);

        ForecastCell {
            rubro,
            project_id: field(obj, PROJECT_FIELDS).and_then(coerce_string),
            category: field(obj, CATEGORY_FIELDS).and_then(coerce_string),
            month,
            planned,
            forecast,
            actual,
            variance,
            last_updated: field(obj, UPDATED_AT_FIELDS).and_then(coerce_timestamp),
            updated_by: field(obj, UPDATED_BY_FIELDS).and_then(coerce_string),
        }
    }

    fn resolve_rubro(&self, obj: &Map<String, Value>) -> RubroKey {
        let mut first_candidate: Option<String> = None;
        for name in RUBRO_FIELDS {
            let Some(candidate) = lookup_field(obj, name).and_then(coerce_string) else {
                continue;
            };
            if let Some(id) = self.resolver.resolve(&candidate) {
                return RubroKey::Canonical(id);
            }
            if first_candidate.is_none() {
                first_candidate = Some(candidate);
            }
        }
        RubroKey::Unresolved(first_candidate.as_deref().map(normalize_key).unwrap_or_default())
    }
}

/// Probes the record for the first present variant name, tolerating casing
/// differences on the key.
fn field<'v>(obj: &'v Map<String, Value>, names: &[&str]) -> Option<&'v Value> {
    names.iter().find_map(|name| lookup_field(obj, name))
}

fn lookup_field<'v>(obj: &'v Map<String, Value>, name: &str) -> Option<&'v Value> {
    if let Some(v) = obj.get(name) {
        if !v.is_null() {
            return Some(v);
        }
    }
    obj.iter()
        .find(|(k, v)| k.eq_ignore_ascii_case(name) && !v.is_null())
        .map(|(_, v)| v)
}

/// Best-effort numeric coercion: numbers pass through, numeric strings are
/// parsed ("$" and thousands separators stripped), anything else or non-finite
/// defaults to 0.0.
fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            cleaned.parse::<f64>().unwrap_or(0.0)
        }
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An explicit month index beats a calendar-month field: feeds that carry both
/// use the index to address months past the first contract year.
fn resolve_month(obj: &Map<String, Value>) -> i64 {
    if let Some(idx) = field(obj, MONTH_INDEX_FIELDS).and_then(coerce_month_value) {
        return idx;
    }
    field(obj, MONTH_FIELDS).and_then(coerce_month_value).unwrap_or(0)
}

fn coerce_month_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<i64>() {
                return Some(n);
            }
            // "YYYY-MM": the numeric month component.
            let mut parts = s.splitn(2, '-');
            let (year, month) = (parts.next()?, parts.next()?);
            if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
                month.parse::<i64>().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|ndt| Utc.from_utc_datetime(&ndt))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasRegistry;
    use crate::taxonomy::{TaxonomyEntry, TaxonomyIndex};
    use serde_json::json;
    use std::sync::Arc;

    fn normalizer() -> CellNormalizer {
        let entries = TaxonomyEntry::builtin_catalog();
        let registry = Arc::new(AliasRegistry::build(&entries));
        let index = Arc::new(TaxonomyIndex::build(entries));
        CellNormalizer::new(CanonicalResolver::new(registry, index))
    }

    #[test]
    fn test_field_variants_map_to_canonical_shape() {
        let n = normalizer();
        let cell = n.normalize_one(&json!({
            "rubroId": "RB0002",
            "mes": 3,
            "presupuesto": 1000.0,
            "pronostico": "1,250.50",
            "ejecutado": "$200",
            "updatedBy": "mrodriguez",
            "lastUpdated": "2026-02-10T12:00:00Z"
        }));

        assert_eq!(cell.rubro, RubroKey::Canonical("MOD-LEAD".to_string()));
        assert_eq!(cell.month, 3);
        assert_eq!(cell.planned, 1000.0);
        assert_eq!(cell.forecast, 1250.50);
        assert_eq!(cell.actual, 200.0);
        assert_eq!(cell.variance, 250.50);
        assert_eq!(cell.updated_by.as_deref(), Some("mrodriguez"));
        assert!(cell.last_updated.is_some());
    }

    #[test]
    fn test_variance_defaults_to_forecast_minus_planned() {
        let n = normalizer();
        let cell = n.normalize_one(&json!({
            "rubro": "MOD-PM", "month": 1, "planned": 100.0, "forecast": 80.0
        }));
        assert_eq!(cell.variance, -20.0);

        let explicit = n.normalize_one(&json!({
            "rubro": "MOD-PM", "month": 1, "planned": 100.0, "forecast": 80.0,
            "desviacion": 5.0
        }));
        assert_eq!(explicit.variance, 5.0);
    }

    #[test]
    fn test_month_index_beats_calendar_month() {
        let n = normalizer();
        let cell = n.normalize_one(&json!({
            "rubro": "MOD-LEAD", "month": "2026-01", "month_index": 13
        }));
        assert_eq!(cell.month, 13);
        assert!(cell.month_in_range());
    }

    #[test]
    fn test_month_range_boundaries() {
        let n = normalizer();
        let at_max = n.normalize_one(&json!({"rubro": "MOD-LEAD", "month_index": 60}));
        assert!(at_max.month_in_range());

        let past_max = n.normalize_one(&json!({"rubro": "MOD-LEAD", "month_index": 61}));
        assert_eq!(past_max.month, 61); // preserved for visibility
        assert!(!past_max.month_in_range());

        let unparseable = n.normalize_one(&json!({"rubro": "MOD-LEAD", "month": "next month"}));
        assert_eq!(unparseable.month, 0);
        assert!(!unparseable.month_in_range());
    }

    #[test]
    fn test_yyyy_mm_month_string() {
        let n = normalizer();
        let cell = n.normalize_one(&json!({"rubro": "MOD-LEAD", "mes": "2026-04"}));
        assert_eq!(cell.month, 4);
    }

    #[test]
    fn test_unresolved_rubro_kept_as_normalized_sentinel() {
        let n = normalizer();
        let cell = n.normalize_one(&json!({
            "rubro": "Partida Especial 9999", "month": 1, "forecast": 10.0
        }));
        assert_eq!(
            cell.rubro,
            RubroKey::Unresolved("partida-especial-9999".to_string())
        );
        assert_eq!(cell.forecast, 10.0);
    }

    #[test]
    fn test_malformed_numerics_default_to_zero() {
        let n = normalizer();
        let cell = n.normalize_one(&json!({
            "rubro": "MOD-PM", "month": 1,
            "planned": "n/a", "forecast": {"nested": true}, "actual": null
        }));
        assert_eq!(cell.planned, 0.0);
        assert_eq!(cell.forecast, 0.0);
        assert_eq!(cell.actual, 0.0);
    }

    #[test]
    fn test_non_object_record_degrades_to_defaults() {
        let n = normalizer();
        let cell = n.normalize_one(&json!("not a record"));
        assert_eq!(cell.rubro, RubroKey::Unresolved(String::new()));
        assert_eq!(cell.month, 0);
        assert_eq!(cell.planned, 0.0);
    }

    #[test]
    fn test_canonical_month_write_boundary() {
        let n = normalizer();
        let good = n.normalize_one(&json!({"rubro": "MOD-LEAD", "month_index": 13}));
        assert_eq!(good.canonical_month().unwrap(), 13);

        let bad = n.normalize_one(&json!({"rubro": "MOD-LEAD", "month_index": 61}));
        assert!(bad.canonical_month().is_err());
    }

    #[test]
    fn test_parse_feed() {
        let n = normalizer();
        let cells = n
            .parse_feed(r#"[{"rubroId": "RB0001", "month": 1, "forecast": 42.0}]"#)
            .unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].rubro, RubroKey::Canonical("MOD-PM".to_string()));

        assert!(n.parse_feed("not json").is_err());
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let n = normalizer();
        let cell = n.normalize_one(&json!({
            "rubro": "MOD-PM", "month": 1, "updated_at": 1767225600000i64
        }));
        assert!(cell.last_updated.is_some());
    }

    #[test]
    fn test_role_field_resolves_through_alias_table() {
        let n = normalizer();
        let cell = n.normalize_one(&json!({
            "role": "Gerente de Proyecto", "month": 2, "forecast": 500.0
        }));
        assert_eq!(cell.rubro, RubroKey::Canonical("MOD-PM".to_string()));
    }
}
