use crate::normalize::normalize_key;
use crate::taxonomy::TaxonomyIndex;
use regex::RegexSet;
use std::collections::HashSet;
use std::sync::Arc;

/// Canonical IDs that are labor ("Mano de Obra") regardless of any free text.
const LABOR_CANONICAL_KEYS: &[&str] = &["MOD-PM", "MOD-LEAD", "MOD-ING", "MOD-ARQ", "MOD-SOP"];

/// Keyword patterns matched against *normalized* free text (lowercase,
/// accent-folded, hyphen-separated). Spanish and English terms for labor,
/// workforce, and the common people-role titles seen in historical feeds.
const LABOR_KEYWORD_PATTERNS: &[&str] = &[
    r"mano-de-obra",
    r"\blabor\b",
    r"workforce",
    r"recurso(s)?-humano",
    r"ingenier",
    r"engineer",
    r"arquitecto",
    r"architect",
    r"gerente",
    r"manager",
    r"\blead\b",
    r"lider",
    r"delivery",
    r"soporte",
    r"support",
    r"consultor",
    r"desarrollador",
    r"developer",
    r"analista",
    r"analyst",
    r"tecnico",
];

/// Phrases that mark a *category name* as labor when neither the canonical key
/// set nor the free-text keywords were conclusive.
const LABOR_CATEGORY_MARKERS: &[&str] = &["mano-de-obra", "labor", "personal", "staffing"];

/// Decides labor/non-labor for a resolved identifier. Upstream data populates
/// category vs. free-text role fields inconsistently, so the decision is a
/// three-tier fallback and no single field is required:
/// 1. canonical labor key set (incl. the `MOD-` prefix);
/// 2. labor keywords over any supplied category/role/description text;
/// 3. labor marker in the taxonomy category name for the id;
/// otherwise non-labor. Never fails.
#[derive(Debug, Clone)]
pub struct LaborClassifier {
    labor_keys: HashSet<String>,
    keywords: RegexSet,
    index: Arc<TaxonomyIndex>,
}

impl LaborClassifier {
    pub fn new(index: Arc<TaxonomyIndex>) -> Self {
        let labor_keys = LABOR_CANONICAL_KEYS
            .iter()
            .map(|k| normalize_key(k))
            .collect();
        let keywords =
            RegexSet::new(LABOR_KEYWORD_PATTERNS).expect("labor keyword patterns are valid");
        Self {
            labor_keys,
            keywords,
            index,
        }
    }

    pub fn is_labor(
        &self,
        rubro_id: &str,
        category: Option<&str>,
        role: Option<&str>,
        description: Option<&str>,
    ) -> bool {
        let key = normalize_key(rubro_id);
        if self.labor_keys.contains(&key) || key.starts_with("mod-") {
            return true;
        }

        for text in [category, role, description].into_iter().flatten() {
            let normalized = normalize_key(text);
            if !normalized.is_empty() && self.keywords.is_match(&normalized) {
                return true;
            }
        }

        if let Some(entry) = self.index.by_id(rubro_id) {
            let category_key = normalize_key(&entry.category_name);
            if LABOR_CATEGORY_MARKERS
                .iter()
                .any(|m| category_key.contains(m))
            {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::TaxonomyEntry;

    fn classifier() -> LaborClassifier {
        LaborClassifier::new(Arc::new(TaxonomyIndex::build(
            TaxonomyEntry::builtin_catalog(),
        )))
    }

    #[test]
    fn test_canonical_labor_keys() {
        let c = classifier();
        assert!(c.is_labor("MOD-LEAD", None, None, None));
        assert!(c.is_labor("mod-pm", None, None, None));
        // Any MOD-prefixed canonical id is labor by construction.
        assert!(c.is_labor("MOD-QA", None, None, None));
    }

    #[test]
    fn test_keyword_fallback_over_free_text() {
        let c = classifier();
        assert!(c.is_labor("X-001", Some("Mano de Obra"), None, None));
        assert!(c.is_labor("X-001", None, Some("Ingeniero de Campo"), None));
        assert!(c.is_labor("X-001", None, None, Some("Senior support engineer")));
        assert!(c.is_labor("X-001", None, Some("Técnico de instalación"), None));
    }

    #[test]
    fn test_non_labor_defaults_false() {
        let c = classifier();
        assert!(!c.is_labor("EQUIPMENT-001", None, None, None));
        assert!(!c.is_labor("X-001", Some("Equipos"), None, Some("Cables y conectores")));
        assert!(!c.is_labor("", None, None, None));
    }

    #[test]
    fn test_category_marker_via_taxonomy() {
        let mut entries = TaxonomyEntry::builtin_catalog();
        // A labor line whose id does not carry the MOD prefix, classifiable
        // only through its taxonomy category name.
        let mut extra = entries[0].clone();
        extra.id = "STAFF-001".to_string();
        extra.line_code = "STF-01".to_string();
        extra.line_name = "Bolsa de horas".to_string();
        extra.description = "Bolsa de horas del proyecto".to_string();
        extra.category_name = "Personal Externo".to_string();
        entries.push(extra);

        let c = LaborClassifier::new(Arc::new(TaxonomyIndex::build(entries)));
        assert!(c.is_labor("STAFF-001", None, None, None));
    }
}
