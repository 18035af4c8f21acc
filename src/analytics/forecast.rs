//! Trend fitting and demand forecasting

use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::{round_to, Trend};
use crate::store::analytics::HistoricalSale;
use crate::util::time::date_range;

/// Slopes smaller than this (units/day) count as flat
const STABLE_SLOPE: f64 = 0.05;

/// Window of the moving-average cross-check, one week of daily sales
pub const MOVING_AVERAGE_WINDOW: usize = 7;

/// Least-squares fit `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl Regression {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit a line through `points`. `None` for fewer than two points or when
/// every x is the same.
pub fn linear_regression(points: &[(f64, f64)]) -> Option<Regression> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    // A constant series is fitted exactly by a flat line
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };

    Some(Regression {
        slope,
        intercept,
        r_squared,
    })
}

/// Trailing averages over `window` values; empty when the series is shorter
pub fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || series.len() < window {
        return Vec::new();
    }
    series
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Next value extrapolated from the last two moving averages
pub fn forecast_next(series: &[f64], window: usize) -> Option<f64> {
    let averages = moving_average(series, window);
    match averages.as_slice() {
        [] => None,
        [only] => Some(*only),
        [.., previous, last] => Some(last + (last - previous)),
    }
}

pub fn classify_trend(slope: f64) -> Trend {
    if slope >= STABLE_SLOPE {
        Trend::Increasing
    } else if slope <= -STABLE_SLOPE {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandForecast {
    pub history_days: usize,
    pub daily_average: f64,
    pub trend: Trend,
    /// r² of the fitted line, 0 when no line could be fitted
    pub confidence: f64,
    pub total_forecast: f64,
    /// Next-day demand from the weekly moving average, `None` with under a
    /// week of history
    pub moving_average_next: Option<f64>,
    pub forecast: Vec<ForecastPoint>,
}

/// Forecast daily demand for `horizon_days` after `end`.
///
/// The history is expanded to one value per day from the first sale through
/// `end`, with missing days counted as zero, then fitted with a regression
/// line. Predictions never go below zero.
pub fn forecast_demand(history: &[HistoricalSale], end: NaiveDate, horizon_days: u32) -> DemandForecast {
    let Some(start) = history.iter().map(|h| h.sale_date).min() else {
        return DemandForecast {
            history_days: 0,
            daily_average: 0.0,
            trend: Trend::Stable,
            confidence: 0.0,
            total_forecast: 0.0,
            moving_average_next: None,
            forecast: future_days(end, horizon_days)
                .map(|date| ForecastPoint { date, quantity: 0.0 })
                .collect(),
        };
    };

    let mut by_day: HashMap<NaiveDate, f64> = HashMap::new();
    for sale in history {
        *by_day.entry(sale.sale_date).or_default() += sale.total_quantity as f64;
    }

    let end = end.max(start);
    let series: Vec<f64> = date_range(start, end)
        .into_iter()
        .map(|day| by_day.get(&day).copied().unwrap_or(0.0))
        .collect();

    let n = series.len();
    let daily_average = series.iter().sum::<f64>() / n as f64;
    let points: Vec<(f64, f64)> = series
        .iter()
        .enumerate()
        .map(|(i, y)| (i as f64, *y))
        .collect();

    let fit = linear_regression(&points);
    let (trend, confidence) = match fit {
        Some(fit) => (classify_trend(fit.slope), fit.r_squared),
        None => (Trend::Stable, 0.0),
    };

    let forecast: Vec<ForecastPoint> = future_days(end, horizon_days)
        .enumerate()
        .map(|(k, date)| {
            let predicted = match fit {
                Some(fit) => fit.predict((n + k) as f64),
                None => daily_average,
            };
            ForecastPoint {
                date,
                quantity: round_to(predicted.max(0.0), 2),
            }
        })
        .collect();

    DemandForecast {
        history_days: n,
        daily_average: round_to(daily_average, 2),
        trend,
        confidence: round_to(confidence, 3),
        total_forecast: round_to(forecast.iter().map(|p| p.quantity).sum(), 2),
        moving_average_next: forecast_next(&series, MOVING_AVERAGE_WINDOW)
            .map(|next| round_to(next.max(0.0), 2)),
        forecast,
    }
}

fn future_days(end: NaiveDate, horizon_days: u32) -> impl Iterator<Item = NaiveDate> {
    (1..=i64::from(horizon_days)).map(move |d| end + Duration::days(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(date: &str, qty: i64) -> HistoricalSale {
        HistoricalSale {
            sale_date: date.parse().unwrap(),
            total_quantity: qty,
        }
    }

    #[test]
    fn regression_on_perfect_line() {
        let points = [(0.0, 1.0), (1.0, 3.0), (2.0, 5.0), (3.0, 7.0)];
        let fit = linear_regression(&points).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert!((fit.predict(10.0) - 21.0).abs() < 1e-9);
    }

    #[test]
    fn regression_needs_spread() {
        assert!(linear_regression(&[]).is_none());
        assert!(linear_regression(&[(1.0, 2.0)]).is_none());
        assert!(linear_regression(&[(1.0, 2.0), (1.0, 5.0)]).is_none());

        let flat = linear_regression(&[(0.0, 4.0), (1.0, 4.0), (2.0, 4.0)]).unwrap();
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.r_squared, 1.0);
    }

    #[test]
    fn noisy_data_has_partial_fit() {
        let points = [(0.0, 2.0), (1.0, 1.0), (2.0, 4.0), (3.0, 3.0)];
        let fit = linear_regression(&points).unwrap();
        assert!(fit.slope > 0.0);
        assert!(fit.r_squared > 0.0 && fit.r_squared < 1.0);
    }

    #[test]
    fn four_week_moving_average() {
        let weekly = [100.0, 120.0, 110.0, 130.0, 125.0, 140.0, 135.0, 150.0];
        let averages = moving_average(&weekly, 4);
        assert_eq!(averages.len(), 5);
        assert_eq!(averages[0], 115.0);

        let next = forecast_next(&weekly, 4).unwrap();
        assert!(next > 135.0);
    }

    #[test]
    fn moving_average_edge_cases() {
        assert!(moving_average(&[1.0, 2.0], 3).is_empty());
        assert!(moving_average(&[1.0, 2.0], 0).is_empty());
        assert_eq!(forecast_next(&[2.0, 4.0], 2), Some(3.0));
        assert_eq!(forecast_next(&[], 2), None);
    }

    #[test]
    fn forecast_fills_missing_days_with_zero() {
        let history = vec![sale("2024-03-01", 4), sale("2024-03-03", 4)];
        let end: NaiveDate = "2024-03-04".parse().unwrap();
        let forecast = forecast_demand(&history, end, 3);

        assert_eq!(forecast.history_days, 4);
        assert_eq!(forecast.daily_average, 2.0);
        assert_eq!(forecast.moving_average_next, None);
        assert_eq!(forecast.forecast.len(), 3);
        assert_eq!(forecast.forecast[0].date, "2024-03-05".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn growing_sales_trend_upward() {
        let history: Vec<HistoricalSale> = (1..=10)
            .map(|d| sale(&format!("2024-01-{:02}", d), d))
            .collect();
        let end: NaiveDate = "2024-01-10".parse().unwrap();
        let forecast = forecast_demand(&history, end, 2);

        assert_eq!(forecast.trend, Trend::Increasing);
        assert_eq!(forecast.confidence, 1.0);
        assert_eq!(forecast.forecast[0].quantity, 11.0);
        assert_eq!(forecast.total_forecast, 23.0);
        assert_eq!(forecast.moving_average_next, Some(8.0));
    }

    #[test]
    fn declining_forecast_is_clamped_at_zero() {
        let history = vec![
            sale("2024-01-01", 9),
            sale("2024-01-02", 6),
            sale("2024-01-03", 3),
        ];
        let end: NaiveDate = "2024-01-03".parse().unwrap();
        let forecast = forecast_demand(&history, end, 5);

        assert_eq!(forecast.trend, Trend::Decreasing);
        assert!(forecast.forecast.iter().all(|p| p.quantity >= 0.0));
        assert_eq!(forecast.forecast[4].quantity, 0.0);
    }

    #[test]
    fn empty_history_forecasts_zero() {
        let end: NaiveDate = "2024-01-03".parse().unwrap();
        let forecast = forecast_demand(&[], end, 7);
        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.total_forecast, 0.0);
        assert_eq!(forecast.forecast.len(), 7);
    }
}
