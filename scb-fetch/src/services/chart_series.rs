//! Chart series derived from a normalized fetch
//!
//! The chart renders one bar per row: numeric stat value, label, badge, and
//! a tooltip built from the overlay columns.

use serde::Serialize;

use scb_common::NormalizedFetchResult;

const TOOLTIP_SEPARATOR: &str = " • ";

/// Least-squares line through `(row index, value)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Trendline {
    pub slope: f64,
    pub intercept: f64,
}

impl Trendline {
    /// `None` for fewer than two points
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }

        let n = values.len() as f64;
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
        for (i, &y) in values.iter().enumerate() {
            let x = i as f64;
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
        let intercept = (sum_y - slope * sum_x) / n;
        Some(Self { slope, intercept })
    }

    pub fn at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }
}

/// Render-ready series; every vector has the same length
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub tooltips: Vec<String>,
    pub badges: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trendline: Option<Trendline>,
}

impl ChartSeries {
    pub fn from_result(result: &NormalizedFetchResult) -> Self {
        let rows = result
            .overlays
            .iter()
            .map(|o| o.values.len())
            .chain([result.labels.len(), result.stats.len()])
            .max()
            .unwrap_or(0);

        let cell = |column: &[String], i: usize| column.get(i).cloned().unwrap_or_default();

        let values: Vec<f64> = (0..rows)
            .map(|i| result.stats.get(i).map_or(0.0, |s| parse_stat(s)))
            .collect();

        let tooltips = (0..rows)
            .map(|i| {
                result
                    .overlays
                    .iter()
                    .filter_map(|overlay| {
                        let value = overlay.values.get(i)?.trim();
                        if value.is_empty() {
                            None
                        } else if overlay.header.trim().is_empty() {
                            Some(value.to_string())
                        } else {
                            Some(format!("{}: {}", overlay.header.trim(), value))
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(TOOLTIP_SEPARATOR)
            })
            .collect();

        Self {
            labels: (0..rows).map(|i| cell(&result.labels, i)).collect(),
            trendline: Trendline::fit(&values),
            values,
            tooltips,
            badges: (0..rows).map(|i| cell(&result.badges, i)).collect(),
            badge_header: result.badge_header.clone(),
        }
    }
}

/// Numeric value of a stat cell such as `"$1,250.50"` or `"4.5 ★"`; 0 when
/// nothing numeric remains
pub fn parse_stat(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}
