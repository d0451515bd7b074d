use serde::{Deserialize, Serialize};

/// Budget health for a rolled-up group, as shown on the executive status pill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetHealth {
    EnMeta,
    EnRiesgo,
    SobrePresupuesto,
    SinPresupuesto,
}

impl BudgetHealth {
    /// Classification thresholds: no budget configured → SIN PRESUPUESTO;
    /// forecast over budget or consumption past 100% → SOBRE PRESUPUESTO;
    /// consumption past 90% → EN RIESGO; otherwise EN META.
    ///
    /// `percent_consumption` is on the 0–100 scale produced by the
    /// aggregation finalize pass.
    pub fn classify(percent_consumption: f64, forecast: f64, budget: Option<f64>) -> Self {
        let budget = match budget {
            Some(b) if b > 0.0 => b,
            _ => return BudgetHealth::SinPresupuesto,
        };
        if forecast > budget || percent_consumption > 100.0 {
            return BudgetHealth::SobrePresupuesto;
        }
        if percent_consumption > 90.0 {
            return BudgetHealth::EnRiesgo;
        }
        BudgetHealth::EnMeta
    }

    pub fn label(&self) -> &'static str {
        match self {
            BudgetHealth::EnMeta => "EN META",
            BudgetHealth::EnRiesgo => "EN RIESGO",
            BudgetHealth::SobrePresupuesto => "SOBRE PRESUPUESTO",
            BudgetHealth::SinPresupuesto => "SIN PRESUPUESTO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_budget() {
        assert_eq!(
            BudgetHealth::classify(50.0, 1000.0, None),
            BudgetHealth::SinPresupuesto
        );
        assert_eq!(
            BudgetHealth::classify(50.0, 1000.0, Some(0.0)),
            BudgetHealth::SinPresupuesto
        );
    }

    #[test]
    fn test_over_budget_by_forecast_or_consumption() {
        assert_eq!(
            BudgetHealth::classify(10.0, 1100.0, Some(1000.0)),
            BudgetHealth::SobrePresupuesto
        );
        assert_eq!(
            BudgetHealth::classify(101.0, 900.0, Some(1000.0)),
            BudgetHealth::SobrePresupuesto
        );
    }

    #[test]
    fn test_at_risk_band() {
        assert_eq!(
            BudgetHealth::classify(95.0, 900.0, Some(1000.0)),
            BudgetHealth::EnRiesgo
        );
        // boundary: exactly 90 is still on target
        assert_eq!(
            BudgetHealth::classify(90.0, 900.0, Some(1000.0)),
            BudgetHealth::EnMeta
        );
    }

    #[test]
    fn test_on_target() {
        let status = BudgetHealth::classify(45.0, 800.0, Some(1000.0));
        assert_eq!(status, BudgetHealth::EnMeta);
        assert_eq!(status.label(), "EN META");
    }
}
