//! Savings estimation: percentage saved, energy and CO2 figures, running total

use crate::config::AccountingConfig;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// kWh per token used for the running-total report
pub const ENERGY_PER_TOKEN: f64 = 0.000002;

/// kg CO2 per kWh
pub const CO2_PER_KWH: f64 = 0.4;

/// Model used when a model identifier has no energy entry
pub const FALLBACK_MODEL: &str = "gpt-3.5-turbo";

/// Energy-per-token coefficients keyed by model identifier
#[derive(Debug, Clone)]
pub struct ModelEnergyTable {
    coefficients: IndexMap<String, f64>,
    fallback: String,
}

impl ModelEnergyTable {
    pub fn new(coefficients: IndexMap<String, f64>, fallback: impl Into<String>) -> Self {
        Self {
            coefficients,
            fallback: fallback.into(),
        }
    }

    /// kWh per token for `model`, falling back to the default entry
    pub fn energy_per_token(&self, model: &str) -> f64 {
        self.coefficients
            .get(model)
            .or_else(|| self.coefficients.get(&self.fallback))
            .copied()
            .unwrap_or(ENERGY_PER_TOKEN)
    }
}

impl Default for ModelEnergyTable {
    fn default() -> Self {
        let mut coefficients = IndexMap::new();
        coefficients.insert("gpt-3.5-turbo".to_string(), 0.000002);
        coefficients.insert("gpt-4o".to_string(), 0.000003);
        Self::new(coefficients, FALLBACK_MODEL)
    }
}

/// Energy and CO2 attributed to one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyEstimate {
    pub energy_used: f64,
    pub co2_emissions: f64,
}

impl EnergyEstimate {
    pub fn energy_used_display(&self) -> String {
        format!("{:.4}", self.energy_used)
    }

    pub fn co2_emissions_display(&self) -> String {
        format!("{:.4}", self.co2_emissions)
    }
}

/// Body of `GET /api/sustain/co2-savings`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Co2Report {
    pub total_kwh_saved: ReportFigure,
    pub total_co2_saved: ReportFigure,
}

/// A zero total is reported as the number `0`, anything else as a 4-decimal string
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportFigure {
    Zero(u8),
    Value(String),
}

/// Computes per-request savings and owns the process-wide tokens-saved total
#[derive(Debug)]
pub struct SavingsAccountant {
    total_tokens_saved: AtomicI64,
    energy_table: ModelEnergyTable,
    reporting_energy_per_token: f64,
    co2_per_kwh: f64,
}

impl SavingsAccountant {
    pub fn new(energy_table: ModelEnergyTable, reporting_energy_per_token: f64, co2_per_kwh: f64) -> Self {
        Self {
            total_tokens_saved: AtomicI64::new(0),
            energy_table,
            reporting_energy_per_token,
            co2_per_kwh,
        }
    }

    /// Build from configuration; `default_model` is the energy-table fallback
    pub fn from_config(config: &AccountingConfig, default_model: &str) -> Self {
        Self::new(
            ModelEnergyTable::new(config.model_energy_per_token.clone(), default_model),
            config.reporting_energy_per_token,
            config.co2_per_kwh,
        )
    }

    /// `(original - optimized) / original * 100`, rounded to 2 decimals; 0 for empty input
    pub fn estimate_input_savings(original_word_count: usize, optimized_word_count: usize) -> f64 {
        if original_word_count == 0 {
            return 0.0;
        }
        let saved = original_word_count as f64 - optimized_word_count as f64;
        round_to(saved / original_word_count as f64 * 100.0, 2)
    }

    /// Add a (possibly negative) delta to the running total
    pub fn accumulate(&self, tokens_saved: i64) {
        let previous = self.total_tokens_saved.fetch_add(tokens_saved, Ordering::Relaxed);
        debug!("Tokens saved total: {} -> {}", previous, previous.saturating_add(tokens_saved));
    }

    pub fn total_tokens_saved(&self) -> i64 {
        self.total_tokens_saved.load(Ordering::Relaxed)
    }

    pub fn energy_per_token(&self, model: &str) -> f64 {
        self.energy_table.energy_per_token(model)
    }

    /// Energy and CO2 for `tokens_saved` tokens at `energy_per_token` kWh each
    pub fn energy_and_co2(&self, tokens_saved: i64, energy_per_token: f64) -> EnergyEstimate {
        let energy_used = tokens_saved as f64 * energy_per_token;
        EnergyEstimate {
            energy_used,
            co2_emissions: energy_used * self.co2_per_kwh,
        }
    }

    /// Running-total report; zero or negative totals report zeros
    pub fn co2_report(&self) -> Co2Report {
        let total = self.total_tokens_saved();
        if total <= 0 {
            return Co2Report {
                total_kwh_saved: ReportFigure::Zero(0),
                total_co2_saved: ReportFigure::Zero(0),
            };
        }

        let estimate = self.energy_and_co2(total, self.reporting_energy_per_token);
        Co2Report {
            total_kwh_saved: ReportFigure::Value(estimate.energy_used_display()),
            total_co2_saved: ReportFigure::Value(estimate.co2_emissions_display()),
        }
    }
}

impl Default for SavingsAccountant {
    fn default() -> Self {
        Self::new(ModelEnergyTable::default(), ENERGY_PER_TOKEN, CO2_PER_KWH)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_estimate_input_savings() {
        assert_eq!(SavingsAccountant::estimate_input_savings(10, 7), 30.0);
        assert_eq!(SavingsAccountant::estimate_input_savings(3, 2), 33.33);
        assert_eq!(SavingsAccountant::estimate_input_savings(3, 3), 0.0);
        assert_eq!(SavingsAccountant::estimate_input_savings(4, 0), 100.0);
    }

    #[test]
    fn test_estimate_input_savings_zero_words() {
        let pct = SavingsAccountant::estimate_input_savings(0, 0);
        assert_eq!(pct, 0.0);
        assert!(!pct.is_nan());
    }

    #[test]
    fn test_energy_table_fallback() {
        let table = ModelEnergyTable::default();
        assert_eq!(table.energy_per_token("gpt-4o"), 0.000003);
        assert_eq!(table.energy_per_token("gpt-3.5-turbo"), 0.000002);
        assert_eq!(table.energy_per_token("unknown-model"), 0.000002);
    }

    #[test]
    fn test_energy_and_co2() {
        let accountant = SavingsAccountant::default();
        let estimate = accountant.energy_and_co2(50_000, 0.000002);
        assert!((estimate.energy_used - 0.1).abs() < 1e-12);
        assert!((estimate.co2_emissions - 0.04).abs() < 1e-12);
        assert_eq!(estimate.energy_used_display(), "0.1000");
        assert_eq!(estimate.co2_emissions_display(), "0.0400");
    }

    #[test]
    fn test_report_is_zero_until_positive() {
        let accountant = SavingsAccountant::default();
        let zero = Co2Report {
            total_kwh_saved: ReportFigure::Zero(0),
            total_co2_saved: ReportFigure::Zero(0),
        };
        assert_eq!(accountant.co2_report(), zero);

        accountant.accumulate(-5);
        assert_eq!(accountant.total_tokens_saved(), -5);
        assert_eq!(accountant.co2_report(), zero);

        accountant.accumulate(100_005);
        assert_eq!(accountant.total_tokens_saved(), 100_000);
        assert_eq!(
            accountant.co2_report(),
            Co2Report {
                total_kwh_saved: ReportFigure::Value("0.2000".to_string()),
                total_co2_saved: ReportFigure::Value("0.0800".to_string()),
            }
        );
    }

    #[test]
    fn test_report_serialization() {
        let accountant = SavingsAccountant::default();
        let json = serde_json::to_value(accountant.co2_report()).unwrap();
        assert_eq!(json, serde_json::json!({"totalKwhSaved": 0, "totalCo2Saved": 0}));
    }

    #[test]
    fn test_concurrent_accumulation_loses_nothing() {
        let accountant = Arc::new(SavingsAccountant::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let accountant = accountant.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        accountant.accumulate(3);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(accountant.total_tokens_saved(), 24_000);
    }
}
