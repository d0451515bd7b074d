use crate::normalize::normalize_key;
use crate::taxonomy::TaxonomyEntry;
use std::collections::HashMap;

/// Legacy sequential codes still present verbatim in persisted feeds.
const LEGACY_CODES: &[(&str, &str)] = &[
    ("RB0001", "MOD-PM"),
    ("RB0002", "MOD-LEAD"),
    ("RB0003", "MOD-ING"),
    ("RB0004", "MOD-ARQ"),
    ("RB0005", "MOD-SOP"),
    ("RB0006", "EQUIPMENT-001"),
    ("RB0007", "EQUIPMENT-002"),
    ("RB0008", "SOFTWARE-001"),
    ("RB0009", "TRAVEL-001"),
    ("RB0010", "SUBCON-001"),
    ("RB0011", "TRAINING-001"),
    ("RB0012", "MAINT-001"),
];

/// Free-text job-title phrases seen in historical exports, in natural casing.
/// Both probe and stored key are normalized before comparison.
const ROLE_ALIASES: &[(&str, &str)] = &[
    ("Gerente de Proyecto", "MOD-PM"),
    ("Project Manager", "MOD-PM"),
    ("PM", "MOD-PM"),
    ("Ingeniero Delivery", "MOD-LEAD"),
    ("Lead Delivery Engineer", "MOD-LEAD"),
    ("Líder Técnico", "MOD-LEAD"),
    ("Ingeniero de Implementación", "MOD-ING"),
    ("Implementation Engineer", "MOD-ING"),
    ("Arquitecto de Soluciones", "MOD-ARQ"),
    ("Solutions Architect", "MOD-ARQ"),
    ("Ingeniero de Soporte", "MOD-SOP"),
    ("Support Engineer", "MOD-SOP"),
    ("Equipos de Red", "EQUIPMENT-001"),
    ("Licencias", "SOFTWARE-001"),
    ("Viáticos", "TRAVEL-001"),
    ("Subcontratación", "SUBCON-001"),
];

#[derive(Debug, Clone)]
struct SlugPattern {
    canonical_id: String,
    /// Normalized canonical id, used as the slug prefix.
    prefix: String,
    /// Normalized display names the slug generator may have appended.
    names: Vec<String>,
}

/// Static alias tables mapping raw textual variants onto canonical IDs:
/// legacy sequential codes, human-role phrases, and a structural fallback for
/// machine-generated composite slugs (`<canonical-id>-<display-name>`).
///
/// Built once at startup and read-only afterwards.
#[derive(Debug)]
pub struct AliasRegistry {
    legacy_exact: HashMap<String, String>,
    legacy_normalized: HashMap<String, String>,
    role_aliases: HashMap<String, String>,
    slug_patterns: Vec<SlugPattern>,
}

impl AliasRegistry {
    /// Builds the registry from the builtin alias tables plus slug patterns
    /// derived from the supplied taxonomy entries.
    pub fn build(entries: &[TaxonomyEntry]) -> Self {
        Self::with_tables(entries, LEGACY_CODES, ROLE_ALIASES)
    }

    /// Same as [`AliasRegistry::build`] but with caller-supplied alias tables,
    /// for deployments that carry their own legacy-code history.
    pub fn with_tables(
        entries: &[TaxonomyEntry],
        legacy_codes: &[(&str, &str)],
        role_aliases: &[(&str, &str)],
    ) -> Self {
        let mut legacy_exact = HashMap::with_capacity(legacy_codes.len());
        let mut legacy_normalized = HashMap::with_capacity(legacy_codes.len());
        for (code, canonical) in legacy_codes {
            legacy_exact.insert((*code).to_string(), (*canonical).to_string());
            legacy_normalized.insert(normalize_key(code), (*canonical).to_string());
        }

        let mut roles = HashMap::with_capacity(role_aliases.len());
        for (phrase, canonical) in role_aliases {
            roles.insert(normalize_key(phrase), (*canonical).to_string());
        }

        let slug_patterns = entries
            .iter()
            .map(|e| SlugPattern {
                canonical_id: e.id.clone(),
                prefix: normalize_key(&e.id),
                names: vec![normalize_key(&e.line_name), normalize_key(&e.category_name)],
            })
            .collect();

        Self {
            legacy_exact,
            legacy_normalized,
            role_aliases: roles,
            slug_patterns,
        }
    }

    /// Case-sensitive, pre-normalization probe. Legacy codes appear verbatim in
    /// persisted data, so this is the resolver's first stage.
    pub fn lookup_legacy_exact(&self, raw: &str) -> Option<&str> {
        self.legacy_exact.get(raw).map(String::as_str)
    }

    /// Normalized probe across the legacy-code and role-alias tables, then the
    /// composite-slug structural fallback.
    pub fn lookup_normalized(&self, raw: &str) -> Option<&str> {
        let key = normalize_key(raw);
        if key.is_empty() {
            return None;
        }
        if let Some(canonical) = self.legacy_normalized.get(&key) {
            return Some(canonical);
        }
        if let Some(canonical) = self.role_aliases.get(&key) {
            return Some(canonical);
        }
        self.lookup_composite_slug(&key)
    }

    /// Composite slugs are not enumerable ahead of time, so they are matched
    /// structurally: strip a known canonical-id prefix and accept the probe
    /// when the remainder equals that entry's normalized line or category name.
    fn lookup_composite_slug(&self, key: &str) -> Option<&str> {
        for pattern in &self.slug_patterns {
            let remainder = match key.strip_prefix(pattern.prefix.as_str()) {
                Some(rest) => rest.strip_prefix('-').unwrap_or(rest),
                None => continue,
            };
            if remainder.is_empty() {
                continue;
            }
            if pattern.names.iter().any(|n| n == remainder) {
                return Some(&pattern.canonical_id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AliasRegistry {
        AliasRegistry::build(&TaxonomyEntry::builtin_catalog())
    }

    #[test]
    fn test_legacy_exact_is_case_sensitive() {
        let reg = registry();
        assert_eq!(reg.lookup_legacy_exact("RB0002"), Some("MOD-LEAD"));
        assert_eq!(reg.lookup_legacy_exact("rb0002"), None);
    }

    #[test]
    fn test_legacy_normalized_accepts_any_casing() {
        let reg = registry();
        assert_eq!(reg.lookup_normalized("rb0002"), Some("MOD-LEAD"));
        assert_eq!(reg.lookup_normalized("RB0006"), Some("EQUIPMENT-001"));
    }

    #[test]
    fn test_role_alias_lookup_normalizes_both_sides() {
        let reg = registry();
        assert_eq!(reg.lookup_normalized("gerente de proyecto"), Some("MOD-PM"));
        assert_eq!(reg.lookup_normalized("GERENTE DE PROYECTO"), Some("MOD-PM"));
        assert_eq!(reg.lookup_normalized("Líder Técnico"), Some("MOD-LEAD"));
        assert_eq!(reg.lookup_normalized("lider tecnico"), Some("MOD-LEAD"));
    }

    #[test]
    fn test_composite_slug_structural_fallback() {
        let reg = registry();
        // canonical id + line name
        assert_eq!(
            reg.lookup_normalized("mod-lead-ingeniero-delivery"),
            Some("MOD-LEAD")
        );
        // canonical id + category name
        assert_eq!(
            reg.lookup_normalized("mod-arq-mano-de-obra"),
            Some("MOD-ARQ")
        );
        // prefix alone is not a slug; remainder must match a display name
        assert_eq!(reg.lookup_normalized("mod-lead-whatever"), None);
    }

    #[test]
    fn test_unknown_probe_misses() {
        let reg = registry();
        assert_eq!(reg.lookup_normalized("totally-unknown-code-9999"), None);
        assert_eq!(reg.lookup_normalized(""), None);
    }
}
