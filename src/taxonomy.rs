use crate::normalize::normalize_key;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a cost line recurs every month of the contract or lands once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    Recurring,
    OneTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    Operating,
    Capital,
}

/// Immutable reference record for one canonical cost line ("rubro").
/// Built once from a static dataset at process start; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub id: String,
    pub line_code: String,
    pub category_code: String,
    pub category_name: String,
    pub line_name: String,
    pub description: String,
    pub execution_type: ExecutionType,
    pub cost_type: CostType,
    pub source_ref: String,
}

impl TaxonomyEntry {
    /// The catalog the engine ships with so it is usable without an external
    /// taxonomy source. Callers with their own dataset build the index from
    /// that instead.
    pub fn builtin_catalog() -> Vec<TaxonomyEntry> {
        fn entry(
            id: &str,
            line_code: &str,
            category_code: &str,
            category_name: &str,
            line_name: &str,
            description: &str,
            execution_type: ExecutionType,
            cost_type: CostType,
        ) -> TaxonomyEntry {
            TaxonomyEntry {
                id: id.to_string(),
                line_code: line_code.to_string(),
                category_code: category_code.to_string(),
                category_name: category_name.to_string(),
                line_name: line_name.to_string(),
                description: description.to_string(),
                execution_type,
                cost_type,
                source_ref: "catalogo-base-v2".to_string(),
            }
        }

        vec![
            entry(
                "MOD-PM",
                "MOD-01",
                "MOD",
                "Mano de Obra",
                "Project Manager",
                "Gerente de proyecto asignado al contrato",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
            entry(
                "MOD-LEAD",
                "MOD-02",
                "MOD",
                "Mano de Obra",
                "Ingeniero Delivery",
                "Ingeniero líder de delivery",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
            entry(
                "MOD-ING",
                "MOD-03",
                "MOD",
                "Mano de Obra",
                "Ingeniero de Implementación",
                "Ingeniero de implementación y despliegue",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
            entry(
                "MOD-ARQ",
                "MOD-04",
                "MOD",
                "Mano de Obra",
                "Arquitecto de Soluciones",
                "Arquitecto de soluciones y diseño técnico",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
            entry(
                "MOD-SOP",
                "MOD-05",
                "MOD",
                "Mano de Obra",
                "Ingeniero de Soporte",
                "Ingeniero de soporte en operación",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
            entry(
                "EQUIPMENT-001",
                "EQP-01",
                "EQP",
                "Equipos",
                "Equipamiento de Red",
                "Equipos de red y comunicaciones",
                ExecutionType::OneTime,
                CostType::Capital,
            ),
            entry(
                "EQUIPMENT-002",
                "EQP-02",
                "EQP",
                "Equipos",
                "Servidores",
                "Servidores y almacenamiento",
                ExecutionType::OneTime,
                CostType::Capital,
            ),
            entry(
                "SOFTWARE-001",
                "LIC-01",
                "LIC",
                "Licenciamiento",
                "Licencias de Software",
                "Licencias y suscripciones de software",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
            entry(
                "TRAVEL-001",
                "VIA-01",
                "VIA",
                "Viáticos",
                "Viajes y Viáticos",
                "Viajes, hospedaje y viáticos del equipo",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
            entry(
                "SUBCON-001",
                "SUB-01",
                "SUB",
                "Subcontratos",
                "Servicios Subcontratados",
                "Servicios de terceros subcontratados",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
            entry(
                "TRAINING-001",
                "CAP-01",
                "CAP",
                "Capacitación",
                "Capacitación y Certificaciones",
                "Capacitación y certificaciones del personal",
                ExecutionType::OneTime,
                CostType::Operating,
            ),
            entry(
                "MAINT-001",
                "MNT-01",
                "MNT",
                "Mantenimiento",
                "Mantenimiento y Garantías",
                "Pólizas de mantenimiento y garantías extendidas",
                ExecutionType::Recurring,
                CostType::Operating,
            ),
        ]
    }
}

/// Multi-key lookup over the taxonomy dataset: four parallel maps keyed by the
/// normalized id, line code, line name and description. Construction is O(n);
/// lookup is O(1) per map, probed in that fixed order.
#[derive(Debug)]
pub struct TaxonomyIndex {
    entries: Vec<TaxonomyEntry>,
    by_id: HashMap<String, usize>,
    by_line_code: HashMap<String, usize>,
    by_line_name: HashMap<String, usize>,
    by_description: HashMap<String, usize>,
}

impl TaxonomyIndex {
    pub fn build(entries: Vec<TaxonomyEntry>) -> Self {
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut by_line_code = HashMap::with_capacity(entries.len());
        let mut by_line_name = HashMap::with_capacity(entries.len());
        let mut by_description = HashMap::with_capacity(entries.len());

        for (i, e) in entries.iter().enumerate() {
            // First entry wins on key collisions so lookup stays deterministic
            // regardless of dataset ordering quirks.
            by_id.entry(normalize_key(&e.id)).or_insert(i);
            by_line_code.entry(normalize_key(&e.line_code)).or_insert(i);
            by_line_name.entry(normalize_key(&e.line_name)).or_insert(i);
            by_description
                .entry(normalize_key(&e.description))
                .or_insert(i);
        }

        Self {
            entries,
            by_id,
            by_line_code,
            by_line_name,
            by_description,
        }
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, map: &HashMap<String, usize>, key: &str) -> Option<&TaxonomyEntry> {
        map.get(key).map(|&i| &self.entries[i])
    }

    pub fn by_id(&self, raw: &str) -> Option<&TaxonomyEntry> {
        self.get(&self.by_id, &normalize_key(raw))
    }

    pub fn by_line_code(&self, raw: &str) -> Option<&TaxonomyEntry> {
        self.get(&self.by_line_code, &normalize_key(raw))
    }

    pub fn by_line_name(&self, raw: &str) -> Option<&TaxonomyEntry> {
        self.get(&self.by_line_name, &normalize_key(raw))
    }

    pub fn by_description(&self, raw: &str) -> Option<&TaxonomyEntry> {
        self.get(&self.by_description, &normalize_key(raw))
    }

    /// Probes id, line code, line name, then description; first hit wins.
    pub fn lookup(&self, raw: &str) -> Option<&TaxonomyEntry> {
        let key = normalize_key(raw);
        self.get(&self.by_id, &key)
            .or_else(|| self.get(&self.by_line_code, &key))
            .or_else(|| self.get(&self.by_line_name, &key))
            .or_else(|| self.get(&self.by_description, &key))
    }
}
