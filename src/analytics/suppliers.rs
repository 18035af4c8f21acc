//! Weighted supplier scorecard

use serde::Serialize;
use uuid::Uuid;

use super::round_to;
use crate::store::analytics::SupplierPerformanceRow;

const DELIVERY_WEIGHT: f64 = 0.30;
const QUALITY_WEIGHT: f64 = 0.25;
const COST_WEIGHT: f64 = 0.25;
const LEAD_TIME_WEIGHT: f64 = 0.20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SupplierTier {
    Excellent,
    Good,
    Average,
    Poor,
}

impl SupplierTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            SupplierTier::Excellent
        } else if score >= 80.0 {
            SupplierTier::Good
        } else if score >= 70.0 {
            SupplierTier::Average
        } else {
            SupplierTier::Poor
        }
    }
}

/// Scorecard inputs, each on a 0-100 scale except lead time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInputs {
    pub on_time_delivery_rate: f64,
    pub quality_score: f64,
    pub cost_competitiveness: f64,
    pub lead_time_days: f64,
}

impl SupplierInputs {
    /// Map the database report onto the scorecard. Sell-through stands in for
    /// quality and average margin for cost competitiveness.
    pub fn from_report(row: &SupplierPerformanceRow) -> Self {
        Self {
            on_time_delivery_rate: row.on_time_delivery_rate.clamp(0.0, 100.0),
            quality_score: row.sell_through_rate.clamp(0.0, 100.0),
            cost_competitiveness: row.avg_margin.clamp(0.0, 100.0),
            lead_time_days: row.average_lead_time_days.max(0.0),
        }
    }
}

/// 100 for same-day, minus 5 per day, floored at 0
pub fn lead_time_score(days: f64) -> f64 {
    (100.0 - days * 5.0).max(0.0)
}

pub fn performance_score(inputs: &SupplierInputs) -> f64 {
    inputs.on_time_delivery_rate * DELIVERY_WEIGHT
        + inputs.quality_score * QUALITY_WEIGHT
        + inputs.cost_competitiveness * COST_WEIGHT
        + lead_time_score(inputs.lead_time_days) * LEAD_TIME_WEIGHT
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierScore {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub performance_score: f64,
    pub tier: SupplierTier,
    pub inputs: SupplierInputs,
    pub total_completed_orders: i64,
}

/// Score every supplier in the report, best first
pub fn score_suppliers(report: &[SupplierPerformanceRow]) -> Vec<SupplierScore> {
    let mut scores: Vec<SupplierScore> = report
        .iter()
        .map(|row| {
            let inputs = SupplierInputs::from_report(row);
            let score = performance_score(&inputs);
            SupplierScore {
                supplier_id: row.supplier_id,
                supplier_name: row.supplier_name.clone(),
                performance_score: round_to(score, 1),
                tier: SupplierTier::from_score(score),
                inputs,
                total_completed_orders: row.total_completed_orders,
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        b.performance_score
            .total_cmp(&a.performance_score)
            .then_with(|| a.supplier_name.cmp(&b.supplier_name))
    });
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_score() {
        let strong = SupplierInputs {
            on_time_delivery_rate: 95.0,
            quality_score: 88.0,
            cost_competitiveness: 85.0,
            lead_time_days: 2.0,
        };
        let slow = SupplierInputs {
            on_time_delivery_rate: 78.0,
            quality_score: 92.0,
            cost_competitiveness: 90.0,
            lead_time_days: 8.0,
        };

        let strong_score = performance_score(&strong);
        assert!((strong_score - 89.75).abs() < 1e-9);
        assert_eq!(SupplierTier::from_score(strong_score), SupplierTier::Good);

        let slow_score = performance_score(&slow);
        assert!((slow_score - 80.9).abs() < 1e-9);
        assert!(slow_score < strong_score);
    }

    #[test]
    fn lead_time_score_floors_at_zero() {
        assert_eq!(lead_time_score(0.0), 100.0);
        assert_eq!(lead_time_score(30.0), 0.0);
    }

    #[test]
    fn report_rows_are_ranked() {
        let report = vec![
            SupplierPerformanceRow {
                supplier_id: Uuid::new_v4(),
                supplier_name: "Laggard Ltd".to_string(),
                on_time_delivery_rate: 40.0,
                sell_through_rate: 30.0,
                avg_margin: 10.0,
                average_lead_time_days: 25.0,
                ..Default::default()
            },
            SupplierPerformanceRow {
                supplier_id: Uuid::new_v4(),
                supplier_name: "Acme Supply".to_string(),
                on_time_delivery_rate: 100.0,
                sell_through_rate: 95.0,
                avg_margin: 140.0,
                average_lead_time_days: 1.0,
                ..Default::default()
            },
        ];

        let scores = score_suppliers(&report);
        assert_eq!(scores[0].supplier_name, "Acme Supply");
        assert_eq!(scores[0].inputs.cost_competitiveness, 100.0);
        assert_eq!(scores[0].tier, SupplierTier::Excellent);
        assert_eq!(scores[1].tier, SupplierTier::Poor);
    }
}
