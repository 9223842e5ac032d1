//! Typst report generation.
//!
//! Fills the built-in page template once per instrument and once for the
//! combined portfolio. Every page carries seven stacked SVG panels rendered
//! by `chart_svg` and embedded with `#image.decode`.

pub mod chart_svg;
pub mod default_template;
pub mod tables;

use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::error::RiskplotError;
use crate::domain::metrics::MetricsFrame;
use crate::domain::pipeline::PortfolioRun;
use crate::ports::report_port::ReportPort;

pub const PANEL_LABELS: [&str; 7] = [
    "Cumulative Returns",
    "Drawdown (%)",
    "Rolling Sharpe",
    "Rolling Volatility",
    "Rolling Returns",
    "Weights",
    "Price",
];

/// Series shown on one page.
pub struct PageContext<'a> {
    pub title: &'a str,
    pub metrics: &'a MetricsFrame,
    pub weights: &'a [f64],
    pub prices: &'a [f64],
}

/// Escape `s` for use inside a Typst string literal.
fn typst_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn embed_svg(svg: &str) -> String {
    if svg.is_empty() {
        return "_No data._\n".to_string();
    }
    format!("#image.decode(\n\"{}\",\n  width: 100%,\n)\n", typst_string(svg))
}

fn render_panels(ctx: &PageContext) -> String {
    let m = ctx.metrics;
    let series: [&[f64]; 7] = [
        &m.cumulative,
        &m.drawdown,
        &m.rolling_sharpe,
        &m.rolling_vol,
        &m.rolling_return,
        ctx.weights,
        ctx.prices,
    ];
    series
        .iter()
        .zip(PANEL_LABELS)
        .map(|(values, label)| embed_svg(&chart_svg::line_panel(&m.dates, values, label)))
        .collect()
}

/// Resolve the page template for one series.
pub fn render_page(ctx: &PageContext) -> String {
    default_template::page()
        .replace("{{PAGE_TITLE}}", &typst_string(ctx.title))
        .replace(
            "{{SUMMARY_TABLE}}",
            &tables::render_summary_table(&ctx.metrics.summary()),
        )
        .replace("{{PANELS}}", &render_panels(ctx))
}

/// Full document: instrument pages in run order, then the combined page.
pub fn render_document(run: &PortfolioRun, title: &str) -> String {
    let mut output = default_template::preamble().replace("{{DOCUMENT_TITLE}}", &typst_string(title));

    let mut pages: Vec<String> = run
        .instruments
        .iter()
        .map(|instrument| {
            render_page(&PageContext {
                title: &instrument.name,
                metrics: &instrument.metrics,
                weights: &instrument.weights,
                prices: &instrument.prices,
            })
        })
        .collect();
    pages.push(render_page(&PageContext {
        title,
        metrics: &run.portfolio,
        weights: &run.portfolio_weight,
        prices: &run.portfolio_price,
    }));

    output.push_str(&pages.join(default_template::page_break()));
    output
}

fn date_span(dates: &[NaiveDate]) -> String {
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => format!("{} to {}", first, last),
        _ => "empty".to_string(),
    }
}

pub struct TypstReportAdapter;

impl TypstReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TypstReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for TypstReportAdapter {
    fn write(&self, run: &PortfolioRun, title: &str, output_path: &Path) -> Result<(), RiskplotError> {
        let document = render_document(run, title);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(output_path, document)?;

        tracing::info!(
            path = %output_path.display(),
            pages = run.instruments.len() + 1,
            span = %date_span(&run.portfolio.dates),
            "report written"
        );
        Ok(())
    }
}
