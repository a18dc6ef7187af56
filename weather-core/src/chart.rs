//! Bar chart of recent temperatures, rendered to PNG.

use std::{io::Cursor, path::Path, sync::OnceLock};

use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use plotters::style::{FontStyle, FontTransform, register_font};
use tracing::debug;

use crate::error::ChartError;

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;
const BAR_COLOR: RGBColor = RGBColor(135, 206, 235);
const FONT_FAMILY: &str = "sans-serif";

/// Longer city names are cut so rotated labels stay inside the label area.
const MAX_LABEL_CHARS: usize = 20;

static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");
static FONT: OnceLock<Result<(), String>> = OnceLock::new();

/// Text rendering uses a bundled font so charts don't depend on system fonts.
fn ensure_font() -> Result<(), ChartError> {
    FONT.get_or_init(|| {
        register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES)
            .map_err(|_| "embedded font is not a valid TrueType font".to_string())
    })
    .clone()
    .map_err(ChartError::Font)
}

/// Draw one bar per `(city, temperature)` entry, in the given order, write
/// the PNG to `path` (replacing any previous file) and return the same bytes.
pub fn render_bar_chart(entries: &[(String, f64)], title: &str, path: &Path) -> Result<Vec<u8>, ChartError> {
    let png = encode_bar_chart(entries, title)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &png)?;

    debug!(path = %path.display(), bars = entries.len(), bytes = png.len(), "Chart written");
    Ok(png)
}

/// Render the chart in memory and encode it as PNG.
pub fn encode_bar_chart(entries: &[(String, f64)], title: &str) -> Result<Vec<u8>, ChartError> {
    if entries.is_empty() {
        return Err(ChartError::Empty);
    }
    ensure_font()?;

    let mut pixels = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    // The drawing area borrows the pixel buffer only for the duration of
    // `draw`; it is released on success and on error.
    draw(entries, title, &mut pixels).map_err(|e| ChartError::Draw(e.to_string()))?;

    let image = RgbImage::from_raw(WIDTH, HEIGHT, pixels)
        .ok_or_else(|| ChartError::Draw("pixel buffer does not match chart size".to_string()))?;

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

fn draw(entries: &[(String, f64)], title: &str, pixels: &mut [u8]) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::with_buffer(pixels, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = value_range(entries);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT_FAMILY, 28))
        .margin(20)
        .x_label_area_size(150)
        .y_label_area_size(60)
        .build_cartesian_2d((0..entries.len()).into_segmented(), y_min..y_max)?;

    let label = |value: &SegmentValue<usize>| match value {
        SegmentValue::CenterOf(i) => entries.get(*i).map(|(city, _)| axis_label(city)).unwrap_or_default(),
        _ => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(entries.len())
        .x_label_formatter(&label)
        .x_label_style((FONT_FAMILY, 14).into_font().transform(FontTransform::Rotate90))
        .x_desc("City")
        .y_desc("Temperature (°C)")
        .label_style((FONT_FAMILY, 14))
        .axis_desc_style((FONT_FAMILY, 16))
        .draw()?;

    chart.draw_series(entries.iter().enumerate().map(|(i, (_, temperature))| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *temperature)],
            BAR_COLOR.filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;

    root.present()?;
    Ok(())
}

fn axis_label(city: &str) -> String {
    if city.chars().count() > MAX_LABEL_CHARS {
        let head: String = city.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{head}…")
    } else {
        city.to_string()
    }
}

/// Y range that always includes zero, padded by a tenth of the span.
fn value_range(entries: &[(String, f64)]) -> (f64, f64) {
    let (lo, hi) = entries
        .iter()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), (_, t)| (lo.min(*t), hi.max(*t)));

    let span = hi - lo;
    let pad = if span > f64::EPSILON { span * 0.1 } else { 1.0 };
    let lo = if lo < 0.0 { lo - pad } else { lo };
    (lo, hi + pad)
}
