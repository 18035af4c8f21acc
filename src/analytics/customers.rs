//! RFM-style customer segmentation

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::round_to;
use crate::store::customers::Customer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CustomerSegment {
    Champions,
    #[serde(rename = "Loyal Customers")]
    LoyalCustomers,
    #[serde(rename = "Potential Loyalists")]
    PotentialLoyalists,
    #[serde(rename = "New Customers")]
    NewCustomers,
}

impl CustomerSegment {
    pub fn from_score(total: f64) -> Self {
        if total >= 12.0 {
            CustomerSegment::Champions
        } else if total >= 9.0 {
            CustomerSegment::LoyalCustomers
        } else if total >= 6.0 {
            CustomerSegment::PotentialLoyalists
        } else {
            CustomerSegment::NewCustomers
        }
    }
}

/// Each component is capped at 5
pub fn rfm_score(orders_per_month: f64, total_orders: i64, total_spent_dollars: f64) -> f64 {
    let recency = orders_per_month.min(5.0);
    let frequency = (total_orders as f64 / 4.0).min(5.0);
    let monetary = (total_spent_dollars / 1000.0).min(5.0);
    recency + frequency + monetary
}

/// Orders per 30 days since the first order, counting at least one month
pub fn orders_per_month(total_orders: i64, first_order: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let months = first_order
        .map(|first| (now - first).num_days() as f64 / 30.0)
        .unwrap_or(0.0)
        .max(1.0);
    total_orders as f64 / months
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInsight {
    pub customer_id: Uuid,
    pub customer_name: Option<String>,
    pub segment: CustomerSegment,
    pub total_score: f64,
    pub total_orders: i64,
    /// Cents
    pub total_spent: i64,
    /// Cents
    pub avg_order_value: i64,
    pub orders_per_month: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentCounts {
    pub champions: usize,
    pub loyal_customers: usize,
    pub potential_loyalists: usize,
    pub new_customers: usize,
}

/// Segment customers, highest score first
pub fn segment_customers(customers: &[Customer], now: DateTime<Utc>) -> Vec<CustomerInsight> {
    let mut insights: Vec<CustomerInsight> = customers
        .iter()
        .map(|c| {
            let per_month = orders_per_month(c.total_orders, c.first_order_date, now);
            let score = rfm_score(per_month, c.total_orders, c.total_spent as f64 / 100.0);
            CustomerInsight {
                customer_id: c.id,
                customer_name: c.customer_name.clone(),
                segment: CustomerSegment::from_score(score),
                total_score: round_to(score, 1),
                total_orders: c.total_orders,
                total_spent: c.total_spent,
                avg_order_value: if c.total_orders > 0 {
                    c.total_spent / c.total_orders
                } else {
                    0
                },
                orders_per_month: round_to(per_month, 2),
            }
        })
        .collect();

    insights.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));
    insights
}

pub fn count_segments(insights: &[CustomerInsight]) -> SegmentCounts {
    insights.iter().fold(SegmentCounts::default(), |mut counts, i| {
        match i.segment {
            CustomerSegment::Champions => counts.champions += 1,
            CustomerSegment::LoyalCustomers => counts.loyal_customers += 1,
            CustomerSegment::PotentialLoyalists => counts.potential_loyalists += 1,
            CustomerSegment::NewCustomers => counts.new_customers += 1,
        }
        counts
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn customer(orders: i64, spent_cents: i64, first_order_days_ago: i64, now: DateTime<Utc>) -> Customer {
        Customer {
            id: Uuid::new_v4(),
            customer_name: Some("Pat".to_string()),
            email: None,
            total_orders: orders,
            total_spent: spent_cents,
            first_order_date: Some(now - Duration::days(first_order_days_ago)),
            last_order_date: None,
            created_at: now,
        }
    }

    #[test]
    fn score_components_are_capped() {
        assert_eq!(rfm_score(2.5, 20, 5000.0), 12.5);
        assert_eq!(rfm_score(50.0, 400, 1e6), 15.0);
        assert!((rfm_score(0.2, 2, 800.0) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn segments_by_total() {
        assert_eq!(CustomerSegment::from_score(12.5), CustomerSegment::Champions);
        assert_eq!(CustomerSegment::from_score(9.0), CustomerSegment::LoyalCustomers);
        assert_eq!(CustomerSegment::from_score(6.5), CustomerSegment::PotentialLoyalists);
        assert_eq!(CustomerSegment::from_score(1.5), CustomerSegment::NewCustomers);
    }

    #[test]
    fn short_histories_count_as_one_month() {
        let now = Utc::now();
        assert_eq!(orders_per_month(3, Some(now - Duration::days(5)), now), 3.0);
        assert_eq!(orders_per_month(3, None, now), 3.0);
        assert_eq!(orders_per_month(12, Some(now - Duration::days(240)), now), 1.5);
    }

    #[test]
    fn segments_customers() {
        let now = Utc::now();
        let customers = vec![
            customer(2, 80_000, 300, now),
            customer(20, 500_000, 240, now),
        ];

        let insights = segment_customers(&customers, now);
        assert_eq!(insights[0].total_orders, 20);
        assert_eq!(insights[0].segment, CustomerSegment::Champions);
        assert_eq!(insights[0].total_score, 12.5);
        assert_eq!(insights[0].avg_order_value, 25_000);
        assert_eq!(insights[1].segment, CustomerSegment::NewCustomers);

        let counts = count_segments(&insights);
        assert_eq!(counts.champions, 1);
        assert_eq!(counts.new_customers, 1);
        assert_eq!(
            serde_json::to_value(insights[1].segment).unwrap(),
            "New Customers"
        );
    }
}
