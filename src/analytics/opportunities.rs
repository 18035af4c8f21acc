//! Hidden revenue opportunities from margin, velocity and stock

use std::collections::HashMap;

use serde::Serialize;

use super::margin::{margin_percentage, SkuMargin};
use super::velocity::SkuVelocity;
use crate::store::inventory::InventoryItem;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityInput {
    pub sku: String,
    pub product_name: Option<String>,
    pub margin_percentage: f64,
    /// Units per week
    pub weekly_velocity: f64,
    pub inventory: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub sku: String,
    pub product_name: Option<String>,
    pub opportunity_score: u32,
    pub recommendations: Vec<&'static str>,
    pub margin_percentage: f64,
    pub weekly_velocity: f64,
    pub inventory: i64,
}

/// Score one product; `None` when no rule applies
pub fn evaluate(input: &OpportunityInput) -> Option<Opportunity> {
    let mut score = 0;
    let mut recommendations = Vec::new();

    if input.margin_percentage > 50.0 && input.weekly_velocity < 5.0 {
        score += 30;
        recommendations.push("Increase marketing for high-margin product");
    }
    if input.weekly_velocity > 15.0 && input.margin_percentage < 20.0 {
        score += 25;
        recommendations.push("Optimize pricing or reduce costs");
    }
    if input.inventory > 60 && (20.0..=50.0).contains(&input.margin_percentage) {
        score += 20;
        recommendations.push("Consider bundling or promotional campaigns");
    }

    (score > 0).then(|| Opportunity {
        sku: input.sku.clone(),
        product_name: input.product_name.clone(),
        opportunity_score: score,
        recommendations,
        margin_percentage: input.margin_percentage,
        weekly_velocity: input.weekly_velocity,
        inventory: input.inventory,
    })
}

/// Join stock with sales figures. Stocked SKUs without sales use their
/// list price and cost for the margin and have zero velocity.
pub fn build_inputs(
    margins: &[SkuMargin],
    velocity: &[SkuVelocity],
    inventory: &[InventoryItem],
) -> Vec<OpportunityInput> {
    let margin_by_sku: HashMap<&str, f64> = margins
        .iter()
        .map(|m| (m.sku.as_str(), m.gross_margin_percentage))
        .collect();
    let velocity_by_sku: HashMap<&str, f64> = velocity
        .iter()
        .map(|v| (v.sku.as_str(), v.velocity_per_day * 7.0))
        .collect();

    inventory
        .iter()
        .map(|item| {
            let margin = margin_by_sku.get(item.sku.as_str()).copied().unwrap_or_else(|| {
                margin_percentage(item.price.unwrap_or(0), item.cost.unwrap_or(0))
            });
            OpportunityInput {
                sku: item.sku.clone(),
                product_name: Some(item.display_name()),
                margin_percentage: margin,
                weekly_velocity: velocity_by_sku.get(item.sku.as_str()).copied().unwrap_or(0.0),
                inventory: item.inventory_quantity,
            }
        })
        .collect()
}

/// Every product with at least one opportunity, best first
pub fn find_opportunities(inputs: &[OpportunityInput]) -> Vec<Opportunity> {
    let mut found: Vec<Opportunity> = inputs.iter().filter_map(evaluate).collect();
    found.sort_by(|a, b| {
        b.opportunity_score
            .cmp(&a.opportunity_score)
            .then_with(|| a.sku.cmp(&b.sku))
    });
    found
}
