//! SVG line panels for the report.
//!
//! One panel is one series against its date index. Non-finite values break
//! the line into separate polylines; they are never interpolated.

use chrono::{Datelike, NaiveDate};

pub const WIDTH: f64 = 600.0;
pub const HEIGHT: f64 = 110.0;
const PADDING_LEFT: f64 = 56.0;
const PADDING_RIGHT: f64 = 12.0;
const PADDING_Y: f64 = 10.0;
const AXIS_HEIGHT: f64 = 16.0;
const LINE_COLOR: &str = "#1f77b4";

/// Render one labelled line panel. Returns an empty string when there is
/// nothing to draw (no dates).
pub fn line_panel(dates: &[NaiveDate], values: &[f64], label: &str) -> String {
    let len = dates.len().min(values.len());
    if len == 0 {
        return String::new();
    }
    let dates = &dates[..len];
    let values = &values[..len];

    let plot_bottom = HEIGHT - AXIS_HEIGHT - PADDING_Y;
    let xs = x_positions(len);
    let extent = finite_extent(values);

    let mut svg = svg_header();
    svg.push_str(&format!(
        r##"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="none" stroke="#cccccc" stroke-width="0.5" />"##,
        x = PADDING_LEFT,
        y = PADDING_Y,
        w = WIDTH - PADDING_LEFT - PADDING_RIGHT,
        h = plot_bottom - PADDING_Y
    ));
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" transform="rotate(-90 {x:.2} {y:.2})">{label}</text>"#,
        x = 12.0,
        y = (PADDING_Y + plot_bottom) / 2.0,
        label = escape_xml(label)
    ));

    match extent {
        Some((min, max)) => {
            add_value_axis(&mut svg, min, max, plot_bottom);
            if min < 0.0 && max > 0.0 {
                let y = scale_value(0.0, min, max, plot_bottom);
                svg.push_str(&format!(
                    r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#999999" stroke-width="0.5" stroke-dasharray="3,3" />"##,
                    x1 = PADDING_LEFT,
                    x2 = WIDTH - PADDING_RIGHT,
                    y = y
                ));
            }
            for segment in segments(values) {
                let points: Vec<(f64, f64)> = segment
                    .map(|i| (xs[i], scale_value(values[i], min, max, plot_bottom)))
                    .collect();
                svg.push_str(&polyline(&points));
            }
        }
        None => {
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">no data</text>"#,
                x = (PADDING_LEFT + WIDTH - PADDING_RIGHT) / 2.0,
                y = (PADDING_Y + plot_bottom) / 2.0
            ));
        }
    }

    add_time_axis(&mut svg, dates, &xs, plot_bottom);
    svg.push_str("</svg>");
    svg
}

fn svg_header() -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:9px;fill:#444}}</style>"#,
        w = WIDTH,
        h = HEIGHT
    )
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Min and max over finite values; a flat series is widened so it scales.
fn finite_extent(values: &[f64]) -> Option<(f64, f64)> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return None;
    }
    if min == max {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.05 };
        return Some((min - pad, max + pad));
    }
    Some((min, max))
}

fn scale_value(value: f64, min: f64, max: f64, plot_bottom: f64) -> f64 {
    let norm = (value - min) / (max - min);
    plot_bottom - norm * (plot_bottom - PADDING_Y)
}

fn x_positions(len: usize) -> Vec<f64> {
    let inner_width = WIDTH - PADDING_LEFT - PADDING_RIGHT;
    if len == 1 {
        return vec![PADDING_LEFT + inner_width / 2.0];
    }
    (0..len)
        .map(|i| PADDING_LEFT + inner_width * (i as f64 / (len - 1) as f64))
        .collect()
}

/// Index ranges of consecutive finite values.
fn segments(values: &[f64]) -> Vec<std::ops::Range<usize>> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        match (v.is_finite(), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push(s..i);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(s..values.len());
    }
    out
}

fn polyline(points: &[(f64, f64)]) -> String {
    if points.len() == 1 {
        let (x, y) = points[0];
        return format!(
            r#"<circle cx="{x:.2}" cy="{y:.2}" r="1" fill="{LINE_COLOR}" />"#
        );
    }
    let coords = points
        .iter()
        .map(|(x, y)| format!("{:.2},{:.2}", x, y))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        r#"<polyline fill="none" stroke="{LINE_COLOR}" stroke-width="1" points="{coords}" />"#
    )
}

fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1000.0 {
        format!("{:.0}", value)
    } else if magnitude >= 10.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn add_value_axis(svg: &mut String, min: f64, max: f64, plot_bottom: f64) {
    for value in [min, (min + max) / 2.0, max] {
        let y = scale_value(value, min, max, plot_bottom);
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="end">{label}</text>"#,
            x = PADDING_LEFT - 4.0,
            y = y + 3.0,
            label = format_tick(value)
        ));
    }
}

/// Year ticks, or month ticks when the index spans a single year.
fn add_time_axis(svg: &mut String, dates: &[NaiveDate], xs: &[f64], plot_bottom: f64) {
    let single_year = dates.first().map(|d| d.year()) == dates.last().map(|d| d.year());
    let mut last_key: Option<(i32, u32)> = None;

    for (date, &x) in dates.iter().zip(xs) {
        let key = if single_year {
            (date.year(), date.month())
        } else {
            (date.year(), 0)
        };
        if last_key == Some(key) {
            continue;
        }
        last_key = Some(key);

        let label = if single_year {
            date.format("%Y-%m").to_string()
        } else {
            date.year().to_string()
        };
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#eeeeee" stroke-width="0.5" />"##,
            y1 = PADDING_Y,
            y2 = plot_bottom
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            y = plot_bottom + 12.0
        ));
    }
}
