//! Visualization: render tabulated series as a line chart to **SVG** or **PNG**.
//!
//! - One connected line per series (Microsoft Office palette)
//! - Sub-annual periods sit at fractional positions inside their year
//! - Unavailable values break the line instead of dropping to zero
//! - Locale-aware tick labels (`30,000` vs `30.000`)
//!
//! Text needs a TrueType font registered with plotters' `ab_glyph` path. When
//! none can be found the chart is still drawn, without caption, axes labels or legend.

pub mod text;
pub mod util;

use crate::error::{Error, Result};
use crate::models::ResponseEnvelope;
use crate::table::{Table, tabulate_envelope};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use num_format::Locale;
use serde::Deserialize;

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::LineSeries;
use plotters::style::{FontFamily, FontStyle};

use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use text::truncate_to_width;
use util::{choose_axis_scale, compute_left_label_area_px, format_tick, map_locale, office_color};

/// Common install locations, tried after `PlotOptions::font_path`.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

struct FontState {
    preferred: Option<PathBuf>,
    available: bool,
}

static FONTS: OnceLock<FontState> = OnceLock::new();

/// Register a "sans-serif" font once per process. Returns whether text can be drawn.
fn ensure_fonts_registered(preferred: Option<&Path>) -> bool {
    let state = FONTS.get_or_init(|| FontState {
        preferred: preferred.map(Path::to_path_buf),
        available: register_first_font(preferred),
    });
    if let Some(p) = preferred.filter(|p| state.preferred.as_deref() != Some(*p)) {
        log::warn!(
            "font {} ignored: fonts were already set up for this process",
            p.display()
        );
    }
    state.available
}

fn register_first_font(preferred: Option<&Path>) -> bool {
    let candidates = preferred
        .map(Path::to_path_buf)
        .into_iter()
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from));
    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        // ab_glyph keeps a reference for the lifetime of the process.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match plotters::style::register_font("sans-serif", FontStyle::Normal, bytes) {
            Ok(()) => {
                log::debug!("registered font {}", path.display());
                return true;
            }
            Err(_) => log::warn!("{} is not a usable font", path.display()),
        }
    }
    log::warn!("no usable font found; charts are drawn without text");
    false
}

/// Chart size and labelling. Also the `[plot]` section of the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    /// Tick label locale tag, see [`util::map_locale`].
    pub locale: String,
    /// Caption; derived from the series ids when unset.
    pub title: Option<String>,
    /// Y axis title; defaults to "Value" plus the scale word.
    pub y_label: Option<String>,
    /// TrueType font for all text. Fonts are set up by the first chart drawn in
    /// a process; a different path on a later call is ignored with a warning.
    pub font_path: Option<PathBuf>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            locale: "en".into(),
            title: None,
            y_label: None,
            font_path: None,
        }
    }
}

fn render_err<E: Debug>(e: E) -> Error {
    Error::Render(format!("{e:?}"))
}

/// Split a series at unavailable values into connected runs.
fn segments(points: &[(f64, Option<f64>)]) -> Vec<Vec<(f64, f64)>> {
    let mut out: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut cur: Vec<(f64, f64)> = Vec::new();
    for &(x, v) in points {
        match v {
            Some(y) => cur.push((x, y)),
            None if !cur.is_empty() => out.push(std::mem::take(&mut cur)),
            None => {}
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

fn default_title(names: &[&str]) -> String {
    match names {
        [] => "BLS Series".to_string(),
        [one] => one.to_string(),
        few if few.len() <= 3 => few.join(", "),
        [first, rest @ ..] => format!("{first} + {} more", rest.len()),
    }
}

/// Draw one line per `(series id, table)` pair to `out_path`.
///
/// The format follows the extension: `.svg` (any case) writes SVG markup,
/// anything else, including no extension, a PNG image.
///
/// ### Errors
/// - [`Error::InvalidRequest`] when there is nothing numeric to draw
/// - [`Error::IoFailure`] when the output path cannot be written
/// - [`Error::Render`] for other drawing failures
pub fn plot_chart<P: AsRef<Path>>(
    series: &[(String, Table)],
    out_path: P,
    opts: &PlotOptions,
) -> Result<()> {
    let out_path = out_path.as_ref();
    if series.iter().all(|(_, t)| t.is_empty()) {
        return Err(Error::InvalidRequest("no data to plot".into()));
    }

    let runs: Vec<(&str, Vec<Vec<(f64, f64)>>)> = series
        .iter()
        .map(|(id, t)| (id.as_str(), segments(&t.points())))
        .collect();

    let xs = runs.iter().flat_map(|(_, r)| r.iter().flatten().map(|p| p.0));
    let ys: Vec<f64> = runs
        .iter()
        .flat_map(|(_, r)| r.iter().flatten().map(|p| p.1))
        .collect();
    if ys.is_empty() {
        return Err(Error::InvalidRequest("no numeric values to plot".into()));
    }
    let (mut x_min, mut x_max) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
        (lo.min(x), hi.max(x))
    });
    if (x_max - x_min).abs() < f64::EPSILON {
        x_min -= 1.0;
        x_max += 1.0;
    }
    let (mut y_min, mut y_max) = (
        ys.iter().cloned().fold(f64::INFINITY, f64::min),
        ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    );
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    let with_text = ensure_fonts_registered(opts.font_path.as_deref());
    let frame = Frame {
        x: (x_min, x_max),
        y: (y_min, y_max),
        title: opts.title.clone().unwrap_or_else(|| {
            let names: Vec<&str> = runs.iter().map(|(id, _)| *id).collect();
            default_title(&names)
        }),
        y_label: opts.y_label.clone(),
        locale: map_locale(&opts.locale),
        with_text,
    };
    let size = (opts.width.max(64), opts.height.max(64));

    let bytes = if is_svg_path(out_path) {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
            draw_chart(root, &runs, &frame)?;
        }
        svg.into_bytes()
    } else {
        let mut rgb = vec![0u8; size.0 as usize * size.1 as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut rgb, size).into_drawing_area();
            draw_chart(root, &runs, &frame)?;
        }
        encode_png(&rgb, size)?
    };
    // Nothing touches the file until the chart is fully rendered.
    std::fs::write(out_path, bytes).map_err(|e| Error::io(out_path, e))?;
    log::debug!("wrote chart {}", out_path.display());
    Ok(())
}

fn is_svg_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

fn encode_png(rgb: &[u8], (w, h): (u32, u32)) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgb, w, h, ColorType::Rgb8)
        .map_err(render_err)?;
    Ok(out)
}

/// Tabulate every series of an envelope and draw them together.
pub fn plot_envelope<P: AsRef<Path>>(
    envelope: &ResponseEnvelope,
    out_path: P,
    opts: &PlotOptions,
) -> Result<()> {
    let series: Vec<(String, Table)> = tabulate_envelope(envelope).into_iter().collect();
    plot_chart(&series, out_path, opts)
}

struct Frame {
    x: (f64, f64),
    y: (f64, f64),
    title: String,
    y_label: Option<String>,
    locale: (&'static Locale, char),
    with_text: bool,
}

fn draw_chart<DB>(
    root: DrawingArea<DB, Shift>,
    runs: &[(&str, Vec<Vec<(f64, f64)>>)],
    frame: &Frame,
) -> Result<()>
where
    DB: DrawingBackend,
{
    const MARGIN: u32 = 16;
    root.fill(&WHITE).map_err(render_err)?;

    let (x_min, x_max) = frame.x;
    let (num_locale, dec_sep) = frame.locale;
    let max_abs = frame.y.0.abs().max(frame.y.1.abs());
    let (yscale, scale_word) = choose_axis_scale(max_abs);
    let (y_lo, y_hi) = (frame.y.0 / yscale, frame.y.1 / yscale);
    let y_label_count = 10usize;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(MARGIN);
    if frame.with_text {
        let left = compute_left_label_area_px(y_lo, y_hi, y_label_count, 12, num_locale, dec_sep);
        let (w, _) = root.dim_in_pixel();
        let title = truncate_to_width(&frame.title, 24, w.saturating_sub(2 * MARGIN));
        builder
            .caption(title, (FontFamily::SansSerif, 24))
            .set_label_area_size(LabelAreaPosition::Left, left)
            .set_label_area_size(LabelAreaPosition::Bottom, 48);
    }
    let mut chart = builder
        .build_cartesian_2d(x_min..x_max, y_lo..y_hi)
        .map_err(render_err)?;

    if frame.with_text {
        let y_title = match (frame.y_label.as_deref(), scale_word) {
            (Some(l), "") => l.to_string(),
            (Some(l), sw) => format!("{l} ({sw})"),
            (None, "") => "Value".to_string(),
            (None, sw) => format!("Value ({sw})"),
        };
        let x_label_fmt = |x: &f64| format!("{}", x.floor() as i32);
        let y_label_fmt = |v: &f64| format_tick(*v, num_locale, dec_sep);
        let span_years = (x_max.floor() - x_min.floor()) as usize + 1;
        chart
            .configure_mesh()
            .x_desc("Year")
            .y_desc(y_title)
            .x_labels(span_years.min(12))
            .y_labels(y_label_count)
            .x_label_formatter(&x_label_fmt)
            .y_label_formatter(&y_label_fmt)
            .label_style((FontFamily::SansSerif, 12))
            .axis_desc_style((FontFamily::SansSerif, 16))
            .draw()
            .map_err(render_err)?;
    }

    for (idx, (id, segs)) in runs.iter().enumerate() {
        let color = office_color(idx);
        let mut labelled = false;
        for seg in segs {
            let scaled: Vec<(f64, f64)> = seg.iter().map(|&(x, y)| (x, y / yscale)).collect();
            let anno = if scaled.len() == 1 {
                // A lone value between gaps still gets a mark.
                chart.draw_series(std::iter::once(Circle::new(scaled[0], 3, color.filled())))
            } else {
                chart.draw_series(LineSeries::new(scaled, color.stroke_width(2)))
            }
            .map_err(render_err)?;
            if !labelled {
                anno.label(id.to_string()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 24, y)], color.stroke_width(2))
                });
                labelled = true;
            }
        }
    }

    if frame.with_text && runs.len() > 1 {
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.85))
            .label_font((FontFamily::SansSerif, 14))
            .draw()
            .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaps_split_segments() {
        let pts = vec![
            (2010.0, None),
            (2011.0, Some(1.0)),
            (2012.0, Some(2.0)),
            (2013.0, None),
            (2014.0, Some(4.0)),
        ];
        assert_eq!(
            segments(&pts),
            vec![vec![(2011.0, 1.0), (2012.0, 2.0)], vec![(2014.0, 4.0)]]
        );
    }

    #[test]
    fn svg_extension_is_case_insensitive() {
        assert!(is_svg_path(Path::new("out/chart.svg")));
        assert!(is_svg_path(Path::new("chart.SVG")));
        assert!(!is_svg_path(Path::new("chart")));
        assert!(!is_svg_path(Path::new("chart.svg.png")));
        assert!(!is_svg_path(Path::new("svg")));
    }

    #[test]
    fn font_setup_happens_once() {
        let first = ensure_fonts_registered(None);
        let later = ensure_fonts_registered(Some(Path::new("/nonexistent/other.ttf")));
        assert_eq!(first, later);
        assert!(FONTS.get().is_some());
    }

    #[test]
    fn png_encoding_has_signature() {
        let bytes = encode_png(&[255u8; 4 * 3 * 3], (4, 3)).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    }

    #[test]
    fn titles_from_ids() {
        assert_eq!(default_title(&["A"]), "A");
        assert_eq!(default_title(&["A", "B"]), "A, B");
        assert_eq!(default_title(&["A", "B", "C", "D"]), "A + 3 more");
    }
}
