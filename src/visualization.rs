use crate::core::errors::TrackerError;
use crate::core::models::expense::format_usd;
use crate::core::summary::{Breakdown, SpendingSummary};
use log::{debug, error};
use serde_json::{Value, json};

/// One color per charted category, in rank order.
pub const CATEGORY_COLORS: [&str; 8] = [
    "#3B82F6", // Blue
    "#10B981", // Green
    "#F59E0B", // Amber
    "#EF4444", // Red
    "#8B5CF6", // Violet
    "#F97316", // Orange
    "#06B6D4", // Cyan
    "#84CC16", // Lime
];

// Generates Chart.js configuration for the spending breakdown
pub struct Visualization;

impl Visualization {
    /// Generates a Chart.js pie chart configuration for a spending summary.
    ///
    /// # Arguments
    /// * `summary` - The summary computed from the current expense list.
    ///
    /// # Returns
    /// A JSON Value containing the Chart.js configuration, or `NoChartData`
    /// when there is nothing to chart.
    pub fn pie_chart(summary: &SpendingSummary) -> Result<Value, TrackerError> {
        let breakdown = summary.breakdown().ok_or_else(|| {
            error!("No expenses available for the spending chart");
            TrackerError::NoChartData
        })?;
        debug!(
            "Generating spending chart for {} categories out of {} expenses",
            breakdown.categories.len(),
            breakdown.total_count
        );

        let labels: Vec<String> = breakdown
            .categories
            .iter()
            .map(|c| format!("{} ({:.1}%)", c.category, c.percentage))
            .collect();
        let data: Vec<f64> = breakdown.categories.iter().map(|c| c.amount).collect();
        let background_colors: Vec<&str> = CATEGORY_COLORS.iter().take(labels.len()).copied().collect();
        let border_colors: Vec<String> = background_colors.iter().map(|c| format!("{}20", c)).collect();

        let chart_config = json!({
            "type": "pie",
            "data": {
                "labels": labels,
                "datasets": [{
                    "data": data,
                    "backgroundColor": background_colors,
                    "borderColor": border_colors,
                    "borderWidth": 2,
                    "hoverBorderWidth": 3,
                    "hoverOffset": 8
                }]
            },
            "options": {
                "responsive": true,
                "maintainAspectRatio": false,
                "plugins": {
                    "legend": {
                        "position": "bottom",
                        "labels": {
                            "padding": 20,
                            "usePointStyle": true,
                            "pointStyle": "circle"
                        }
                    },
                    "title": {
                        "display": true,
                        "text": format!("Spending Summary: {} total", format_usd(breakdown.total_amount))
                    }
                }
            }
        });

        debug!("Generated Chart.js configuration with {} slices", data.len());
        Ok(chart_config)
    }

    /// Text lines for the "Top Category" card and the per-category legend.
    pub fn breakdown_lines(breakdown: &Breakdown) -> Vec<String> {
        let top = &breakdown.top_category;
        let mut lines = vec![format!(
            "Top Category: {} {} ({:.1}% of total)",
            top.category,
            format_usd(top.amount),
            top.percentage
        )];
        lines.extend(
            breakdown
                .categories
                .iter()
                .map(|c| format!("{}: {} ({:.1}%)", c.category, format_usd(c.amount), c.percentage)),
        );
        lines
    }
}
