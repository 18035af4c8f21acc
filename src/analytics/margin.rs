//! Gross margin per SKU

use serde::Serialize;

use super::{round_to, SkuSales};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginRating {
    Excellent,
    Good,
    Average,
    Poor,
    Critical,
}

impl MarginRating {
    /// Benchmarks: 50% excellent, 30% good, 20% average, 10% poor
    pub fn from_percentage(margin: f64) -> Self {
        if margin >= 50.0 {
            MarginRating::Excellent
        } else if margin >= 30.0 {
            MarginRating::Good
        } else if margin >= 20.0 {
            MarginRating::Average
        } else if margin >= 10.0 {
            MarginRating::Poor
        } else {
            MarginRating::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuMargin {
    pub sku: String,
    pub product_name: Option<String>,
    pub quantity: i64,
    pub revenue: i64,
    pub cost: i64,
    pub profit: i64,
    pub gross_margin_percentage: f64,
    /// Cents
    pub margin_per_unit: f64,
    pub rating: MarginRating,
}

pub fn margin_percentage(revenue: i64, cost: i64) -> f64 {
    if revenue <= 0 {
        return 0.0;
    }
    (revenue - cost) as f64 / revenue as f64 * 100.0
}

/// Margins for each SKU, highest profit first
pub fn gross_margin(sales: &[SkuSales]) -> Vec<SkuMargin> {
    let mut rows: Vec<SkuMargin> = sales
        .iter()
        .map(|s| {
            let profit = s.revenue - s.cost;
            let margin = margin_percentage(s.revenue, s.cost);
            SkuMargin {
                sku: s.sku.clone(),
                product_name: s.product_name.clone(),
                quantity: s.quantity,
                revenue: s.revenue,
                cost: s.cost,
                profit,
                gross_margin_percentage: round_to(margin, 2),
                margin_per_unit: if s.quantity > 0 {
                    round_to(profit as f64 / s.quantity as f64, 2)
                } else {
                    0.0
                },
                rating: MarginRating::from_percentage(margin),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.profit.cmp(&a.profit).then_with(|| a.sku.cmp(&b.sku)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales(sku: &str, revenue: i64, cost: i64, quantity: i64) -> SkuSales {
        SkuSales {
            sku: sku.to_string(),
            product_name: None,
            quantity,
            revenue,
            cost,
        }
    }

    #[test]
    fn margin_per_product() {
        let rows = gross_margin(&[
            sales("PROD-002", 5000, 4000, 50),
            sales("PROD-001", 10000, 6000, 100),
        ]);

        assert_eq!(rows[0].sku, "PROD-001");
        assert_eq!(rows[0].gross_margin_percentage, 40.0);
        assert_eq!(rows[0].profit, 4000);
        assert_eq!(rows[0].margin_per_unit, 40.0);
        assert_eq!(rows[0].rating, MarginRating::Good);

        assert_eq!(rows[1].gross_margin_percentage, 20.0);
        assert_eq!(rows[1].margin_per_unit, 20.0);
        assert_eq!(rows[1].rating, MarginRating::Average);
    }

    #[test]
    fn ratings_follow_benchmarks() {
        assert_eq!(MarginRating::from_percentage(50.0), MarginRating::Excellent);
        assert_eq!(MarginRating::from_percentage(12.0), MarginRating::Poor);
        assert_eq!(MarginRating::from_percentage(-5.0), MarginRating::Critical);
    }

    #[test]
    fn no_revenue_no_margin() {
        let rows = gross_margin(&[sales("FREE", 0, 300, 0)]);
        assert_eq!(rows[0].gross_margin_percentage, 0.0);
        assert_eq!(rows[0].margin_per_unit, 0.0);
        assert_eq!(rows[0].profit, -300);
    }
}
