//! ABC classification by revenue contribution

use serde::Serialize;

use super::{round_to, SkuSales};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AbcCategory {
    A,
    B,
    C,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbcItem {
    pub sku: String,
    pub product_name: Option<String>,
    pub revenue: i64,
    pub revenue_percentage: f64,
    pub cumulative_percentage: f64,
    pub category: AbcCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbcSummary {
    pub a_count: usize,
    pub b_count: usize,
    pub c_count: usize,
    pub total_revenue: i64,
}

/// Rank SKUs by revenue (ties by SKU). Items whose cumulative share is at
/// most 80% are A, at most 95% B, the rest C. Without revenue everything is C.
pub fn classify(sales: &[SkuSales]) -> Vec<AbcItem> {
    let mut ranked: Vec<&SkuSales> = sales.iter().collect();
    ranked.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.sku.cmp(&b.sku)));

    let total: i64 = ranked.iter().map(|s| s.revenue.max(0)).sum();
    let mut cumulative: i64 = 0;

    ranked
        .into_iter()
        .map(|s| {
            let revenue = s.revenue.max(0);
            cumulative += revenue;

            // Integer comparison keeps the 80/95 boundaries exact
            let category = if total == 0 {
                AbcCategory::C
            } else if i128::from(cumulative) * 100 <= i128::from(total) * 80 {
                AbcCategory::A
            } else if i128::from(cumulative) * 100 <= i128::from(total) * 95 {
                AbcCategory::B
            } else {
                AbcCategory::C
            };

            let share = |value: i64| {
                if total == 0 {
                    0.0
                } else {
                    round_to(value as f64 / total as f64 * 100.0, 2)
                }
            };

            AbcItem {
                sku: s.sku.clone(),
                product_name: s.product_name.clone(),
                revenue: s.revenue,
                revenue_percentage: share(revenue),
                cumulative_percentage: share(cumulative),
                category,
            }
        })
        .collect()
}

pub fn summarize(items: &[AbcItem]) -> AbcSummary {
    items.iter().fold(AbcSummary::default(), |mut summary, item| {
        match item.category {
            AbcCategory::A => summary.a_count += 1,
            AbcCategory::B => summary.b_count += 1,
            AbcCategory::C => summary.c_count += 1,
        }
        summary.total_revenue += item.revenue;
        summary
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales(sku: &str, revenue: i64) -> SkuSales {
        SkuSales {
            sku: sku.to_string(),
            product_name: None,
            quantity: 1,
            revenue,
            cost: 0,
        }
    }

    #[test]
    fn pareto_buckets() {
        let items = classify(&[
            sales("C2", 300),
            sales("A1", 10000),
            sales("B1", 3000),
            sales("A2", 8000),
            sales("C1", 500),
            sales("B2", 2000),
        ]);

        let skus: Vec<&str> = items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, ["A1", "A2", "B1", "B2", "C1", "C2"]);
        assert_eq!(items[0].category, AbcCategory::A);
        assert_eq!(items[1].category, AbcCategory::A);
        assert_eq!(items[2].category, AbcCategory::B);
        assert_eq!(items[5].category, AbcCategory::C);
        assert_eq!(items[5].cumulative_percentage, 100.0);

        let summary = summarize(&items);
        assert_eq!(summary.a_count, 2);
        assert_eq!(summary.total_revenue, 23800);
    }

    #[test]
    fn exact_boundaries_are_inclusive() {
        let items = classify(&[sales("X", 80), sales("Y", 15), sales("Z", 5)]);
        assert_eq!(items[0].category, AbcCategory::A);
        assert_eq!(items[1].category, AbcCategory::B);
        assert_eq!(items[2].category, AbcCategory::C);
    }

    #[test]
    fn ties_are_ordered_by_sku() {
        let items = classify(&[sales("ZED", 100), sales("ALPHA", 100)]);
        assert_eq!(items[0].sku, "ALPHA");
    }

    #[test]
    fn no_revenue_means_all_c() {
        let items = classify(&[sales("X", 0), sales("Y", 0)]);
        assert!(items.iter().all(|i| i.category == AbcCategory::C));
        assert!(classify(&[]).is_empty());
    }
}
