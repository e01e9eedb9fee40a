// SVG line chart renderer - pure function of a chart snapshot
use crate::domain::reading::Reading;
use crate::domain::snapshot::{ChartSnapshot, Dataset};
use plotters::prelude::*;
use thiserror::Error;

pub const CHART_WIDTH: u32 = 600;
pub const CHART_HEIGHT: u32 = 300;

const AXIS_COLOR: RGBColor = RGBColor(160, 160, 160);

#[derive(Debug, Error)]
#[error("chart rendering failed: {0}")]
pub struct RenderError(String);

fn render_error<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError(e.to_string())
}

/// Render the first dataset as one line: x = labels in order, y = values in order
pub fn render_svg(snapshot: &ChartSnapshot) -> Result<String, RenderError> {
    let default_dataset = Dataset::default();
    let dataset = snapshot.datasets.first().unwrap_or(&default_dataset);
    let series = snapshot.series();
    let (y_min, y_max) = value_range(&series);
    let x_max = (series.len() as i32 - 1).max(1);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&dataset.label, ("sans-serif", 14))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(45)
            .build_cartesian_2d(0..x_max, y_min..y_max)
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(series.len() + 1)
            .y_labels(6)
            .x_label_formatter(&|i| {
                usize::try_from(*i)
                    .ok()
                    .and_then(|i| series.get(i))
                    .map(|r| r.label.clone())
                    .unwrap_or_default()
            })
            .y_label_formatter(&|v| format!("{:.2}", v))
            .axis_style(AXIS_COLOR)
            .label_style(("sans-serif", 10))
            .draw()
            .map_err(render_error)?;

        if !snapshot.is_empty() {
            let stroke = parse_color(&dataset.border_color);
            let fill = parse_color(&dataset.background_color);
            let points: Vec<(i32, f64)> = series
                .iter()
                .enumerate()
                .map(|(i, r)| (i as i32, r.darkness))
                .collect();

            if dataset.fill {
                chart
                    .draw_series(AreaSeries::new(points.iter().copied(), y_min, fill.mix(0.2)))
                    .map_err(render_error)?;
            }
            chart
                .draw_series(LineSeries::new(points.iter().copied(), stroke.stroke_width(2)))
                .map_err(render_error)?;
            chart
                .draw_series(points.iter().map(|p| Circle::new(*p, 3, fill.filled())))
                .map_err(render_error)?;
        }

        root.present().map_err(render_error)?;
    } // root is dropped here, releasing the borrow on svg

    Ok(svg)
}

fn value_range(series: &[Reading]) -> (f64, f64) {
    if series.is_empty() {
        return (0.0, 1.0);
    }

    let (lo, hi) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
            (lo.min(r.darkness), hi.max(r.darkness))
        });
    if hi - lo < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        (lo, hi)
    }
}

/// `#rgb`, `#rrggbb` or a basic color name; anything else draws black
pub fn parse_color(color: &str) -> RGBColor {
    let color = color.trim().to_ascii_lowercase();
    if let Some(hex) = color.strip_prefix('#') {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let parsed = match if hex.is_ascii() { hex.len() } else { 0 } {
            6 => (channel(&hex[0..2]), channel(&hex[2..4]), channel(&hex[4..6])),
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                (expand(0), expand(1), expand(2))
            }
            _ => (None, None, None),
        };
        if let (Some(r), Some(g), Some(b)) = parsed {
            return RGBColor(r, g, b);
        }
        return BLACK;
    }

    match color.as_str() {
        "white" => WHITE,
        "red" => RED,
        "green" => GREEN,
        "blue" => BLUE,
        "yellow" => YELLOW,
        "cyan" => CYAN,
        "magenta" => MAGENTA,
        "gray" | "grey" => RGBColor(128, 128, 128),
        _ => BLACK,
    }
}
