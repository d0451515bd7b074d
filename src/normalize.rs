use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Separator used by composite allocation keys (`<year>#<project>#<rubro>`).
/// Only the trailing segment is the rubro reference.
pub const COMPOSITE_SEPARATOR: char = '#';

/// Collapses an arbitrary raw identifier into a canonical lookup key.
///
/// Steps, in order: take the trailing segment of a composite allocation key,
/// lowercase, NFD-decompose and drop combining marks (so "é"/"ñ" fold to
/// "e"/"n"), replace every run of characters outside `[a-z0-9-]` with a single
/// hyphen, then trim leading/trailing hyphens.
///
/// Total and idempotent: never fails, and `normalize_key(normalize_key(s)) ==
/// normalize_key(s)` for every input. Empty input yields the empty string.
pub fn normalize_key(raw: &str) -> String {
    let tail = match raw.rfind(COMPOSITE_SEPARATOR) {
        Some(idx) => &raw[idx + COMPOSITE_SEPARATOR.len_utf8()..],
        None => raw,
    };

    let lowered = tail.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut pending_hyphen = false;
    for ch in lowered.nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch);
        } else {
            // Covers literal hyphens too, which collapses repeated runs.
            pending_hyphen = true;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_strips_diacritics() {
        assert_eq!(normalize_key("Ingeniería"), "ingenieria");
        assert_eq!(normalize_key("Gestión de Proyectos"), "gestion-de-proyectos");
        assert_eq!(normalize_key("Año Fiscal"), "ano-fiscal");
    }

    #[test]
    fn test_punctuation_collapses_to_single_hyphen() {
        assert_eq!(normalize_key("Viajes / Viáticos"), "viajes-viaticos");
        assert_eq!(normalize_key("soporte  (nivel 2)"), "soporte-nivel-2");
        assert_eq!(normalize_key("--MOD---LEAD--"), "mod-lead");
    }

    #[test]
    fn test_composite_key_keeps_trailing_segment() {
        assert_eq!(normalize_key("2025#PRJ-0042#MOD-LEAD"), "mod-lead");
        assert_eq!(normalize_key("PRJ-0042#Ingeniero Delivery"), "ingeniero-delivery");
    }

    #[test]
    fn test_total_on_degenerate_input() {
        assert_eq!(normalize_key(""), "");
        assert_eq!(normalize_key("   "), "");
        assert_eq!(normalize_key("###"), "");
        assert_eq!(normalize_key("!!!"), "");
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "MOD-LEAD",
            "Gestión   de Proyectos!!",
            "2025#PRJ-1#Señor Árbol",
            "",
            "already-normal-123",
        ];
        for s in samples {
            let once = normalize_key(s);
            assert_eq!(normalize_key(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_equivalent_variants_converge() {
        let variants = ["Ingeniero Delivery", "ingeniero   delivery", "INGENIERO-DELIVERY", "Ingeniero  Delivery."];
        let keys: Vec<String> = variants.iter().map(|v| normalize_key(v)).collect();
        assert!(keys.iter().all(|k| k == "ingeniero-delivery"), "{:?}", keys);
    }
}
