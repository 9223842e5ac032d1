//! Headline table shown above each page's panels.

use crate::domain::metrics::MetricsSummary;

fn format_number(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.*}", decimals, value)
    }
}

pub fn render_summary_table(summary: &MetricsSummary) -> String {
    let mut output = String::new();
    output.push_str("#table(\n");
    output.push_str("  columns: 4,\n");
    output.push_str("  stroke: 0.5pt + gray,\n");
    output.push_str(
        "  [*Cumulative Return*], [*Max Drawdown (%)*], [*Rolling Sharpe*], [*Rolling Volatility*],\n",
    );
    output.push_str(&format!(
        "  [{}], [{}], [{}], [{}],\n",
        format_number(summary.final_cumulative, 4),
        format_number(summary.max_drawdown, 2),
        format_number(summary.last_sharpe, 2),
        format_number(summary.last_vol, 4),
    ));
    output.push_str(")\n");
    output
}
