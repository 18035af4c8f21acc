//! Sales channel fee comparison

use std::collections::BTreeMap;

use serde::Serialize;

use super::round_to;
use crate::store::analytics::ChannelFee;
use crate::store::orders::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeeEfficiency {
    Excellent,
    Good,
    Average,
    Poor,
}

impl FeeEfficiency {
    pub fn from_fee_percentage(fee_percentage: f64) -> Self {
        if fee_percentage <= 5.0 {
            FeeEfficiency::Excellent
        } else if fee_percentage <= 8.0 {
            FeeEfficiency::Good
        } else if fee_percentage <= 12.0 {
            FeeEfficiency::Average
        } else {
            FeeEfficiency::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAnalysis {
    pub channel: String,
    pub order_count: i64,
    /// All amounts in cents
    pub gross_sales: i64,
    pub transaction_fees: i64,
    pub fixed_fees: i64,
    pub total_fees: i64,
    pub net_revenue: i64,
    pub fee_percentage: f64,
    pub profitability_score: f64,
    pub efficiency: FeeEfficiency,
}

/// Fee breakdown for one channel. A channel with fees but no sales is
/// treated as 100% fees.
pub fn channel_economics(
    channel: &str,
    order_count: i64,
    gross_sales: i64,
    transaction_fees: i64,
    fixed_fees: i64,
) -> ChannelAnalysis {
    let total_fees = transaction_fees + fixed_fees;
    let net_revenue = gross_sales - total_fees;
    let (fee_percentage, profitability) = if gross_sales > 0 {
        (
            total_fees as f64 / gross_sales as f64 * 100.0,
            net_revenue as f64 / gross_sales as f64 * 100.0,
        )
    } else if total_fees > 0 {
        (100.0, 0.0)
    } else {
        (0.0, 0.0)
    };

    ChannelAnalysis {
        channel: channel.to_string(),
        order_count,
        gross_sales,
        transaction_fees,
        fixed_fees,
        total_fees,
        net_revenue,
        fee_percentage: round_to(fee_percentage, 2),
        profitability_score: round_to(profitability, 2),
        efficiency: FeeEfficiency::from_fee_percentage(fee_percentage),
    }
}

/// Group orders by source platform and apply each channel's fee schedule.
/// Monthly and other fees are prorated over `days`. Channels without a
/// schedule carry no fees.
pub fn analyze_channels(orders: &[Order], fees: &[ChannelFee], days: u32) -> Vec<ChannelAnalysis> {
    let months = f64::from(days.max(1)) / 30.0;

    let mut by_channel: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for order in orders {
        let channel = order
            .source_platform
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("manual")
            .to_ascii_lowercase();
        let entry = by_channel.entry(channel).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += order.total_amount;
    }

    let mut rows: Vec<ChannelAnalysis> = by_channel
        .into_iter()
        .map(|(channel, (count, gross))| {
            let schedule = fees
                .iter()
                .find(|f| f.channel_name.eq_ignore_ascii_case(&channel));
            let (transaction, fixed) = match schedule {
                Some(fee) => (
                    (gross as f64 * fee.percentage_fee).round() as i64 + fee.fixed_fee * count,
                    ((fee.monthly_fee + fee.other_fees) as f64 * months).round() as i64,
                ),
                None => (0, 0),
            };
            channel_economics(&channel, count, gross, transaction, fixed)
        })
        .collect();

    rows.sort_by(|a, b| b.gross_sales.cmp(&a.gross_sales));
    rows
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn order(platform: &str, total: i64) -> Order {
        Order {
            id: Uuid::new_v4(),
            order_number: "#1".to_string(),
            customer_id: None,
            customer_email: None,
            financial_status: Some("paid".to_string()),
            fulfillment_status: None,
            currency: Some("USD".to_string()),
            subtotal: total,
            total_tax: 0,
            total_shipping: 0,
            total_discounts: 0,
            total_amount: total,
            source_platform: Some(platform.to_string()),
            created_at: Utc::now(),
            line_items: None,
        }
    }

    #[test]
    fn compares_channels() {
        let shopify = channel_economics("Shopify", 1, 1_000_000, 29_000, 2_900 + 5_000);
        let amazon = channel_economics("Amazon FBA", 1, 1_500_000, 105_000, 3_999 + 20_000);
        let woo = channel_economics("WooCommerce", 1, 800_000, 24_000, 10_000);

        assert!(shopify.fee_percentage < amazon.fee_percentage);
        assert!(woo.fee_percentage < amazon.fee_percentage);
        assert_eq!(woo.fee_percentage, 4.25);
        assert_eq!(amazon.efficiency, FeeEfficiency::Average);
        assert_eq!(shopify.efficiency, FeeEfficiency::Excellent);
        assert_eq!(shopify.net_revenue, 963_100);
        assert_eq!(shopify.profitability_score, 96.31);
    }

    #[test]
    fn fees_without_sales() {
        let idle = channel_economics("Etsy", 0, 0, 0, 2_000);
        assert_eq!(idle.fee_percentage, 100.0);
        assert_eq!(idle.efficiency, FeeEfficiency::Poor);

        let empty = channel_economics("Nothing", 0, 0, 0, 0);
        assert_eq!(empty.fee_percentage, 0.0);
    }

    #[test]
    fn applies_fee_schedules_per_platform() {
        let orders = vec![order("shopify", 10_000), order("Shopify", 10_000), order("manual", 5_000)];
        let fees = vec![ChannelFee {
            channel_name: "shopify".to_string(),
            percentage_fee: 0.029,
            fixed_fee: 30,
            monthly_fee: 2_900,
            other_fees: 100,
        }];

        let rows = analyze_channels(&orders, &fees, 30);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].channel, "shopify");
        assert_eq!(rows[0].order_count, 2);
        assert_eq!(rows[0].transaction_fees, 580 + 60);
        assert_eq!(rows[0].fixed_fees, 3_000);
        assert_eq!(rows[1].total_fees, 0);
    }
}
