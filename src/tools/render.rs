//! Three-panel comparative figure of one variant.
//!
//! The top panel overlays the ref and alt predicted signal; the two panels
//! below draw the per-base attribution of each allele as stacked bars on a
//! shared y-axis, so the two tracks can be compared by eye. Positions are
//! labelled relative to the variant locus.

use std::fs;
use std::ops::Range;
use std::path::{
    Path,
    PathBuf,
};

use ndarray::ArrayView2;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use crate::data_structs::{
    Allele,
    VariantRecord,
    N_BASES,
};
use crate::error::EnsembleError;
use crate::tools::window::{
    VariantWindow,
    YRange,
    Y_NUDGE,
};
use crate::utils::sanitize_file_stem;
use crate::with_field_fn;

pub const BASES: [&str; N_BASES] = ["A", "C", "G", "T"];
pub const BASE_COLORS: [RGBColor; N_BASES] = [
    RGBColor(0, 128, 0),
    RGBColor(0, 0, 255),
    RGBColor(255, 165, 0),
    RGBColor(255, 0, 0),
];

const MARKER_DASHES: usize = 21;
const BAR_HALF_WIDTH: f64 = 0.45;

type Panel<'a> = DrawingArea<SVGBackend<'a>, Shift>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width:     u32,
    pub height:    u32,
    /// Extension of the written figures.
    pub extension: String,
}

impl RenderConfig {
    with_field_fn!(width, u32);
    with_field_fn!(height, u32);
    with_field_fn!(extension, String);
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width:     2000,
            height:    900,
            extension: "svg".into(),
        }
    }
}

/// Writes one SVG figure per variant.
#[derive(Debug, Clone, Default)]
pub struct VariantRenderer {
    config: RenderConfig,
}

impl VariantRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// `<out_dir>/<variant_id>.<ext>`, with path separators in the id
    /// replaced.
    pub fn output_path(
        &self,
        out_dir: &Path,
        variant_id: &str,
    ) -> PathBuf {
        out_dir.join(format!(
            "{}.{}",
            sanitize_file_stem(variant_id),
            self.config.extension
        ))
    }

    /// Draws the figure of `record` and returns the written path.
    pub fn render(
        &self,
        record: &VariantRecord,
        window: &VariantWindow,
        cluster: &str,
        out_dir: &Path,
    ) -> Result<PathBuf, EnsembleError> {
        if window.is_empty() {
            return Err(EnsembleError::Render {
                variant_id: record.variant_id.clone(),
                reason:     "empty window".into(),
            });
        }
        let fail = |reason: String| EnsembleError::Render {
            variant_id: record.variant_id.clone(),
            reason,
        };
        let svg = self
            .draw_figure(record, window, cluster)
            .map_err(|e| fail(format!("{e:#}")))?;

        // written in one go, so a failed drawing leaves no partial file
        let path = self.output_path(out_dir, &record.variant_id);
        fs::write(&path, svg).map_err(|e| fail(format!("writing {}: {e}", path.display())))?;
        Ok(path)
    }

    /// Draws the figure into an SVG document.
    fn draw_figure(
        &self,
        record: &VariantRecord,
        window: &VariantWindow,
        cluster: &str,
    ) -> anyhow::Result<String> {
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.config.width, self.config.height))
                .into_drawing_area();
            root.fill(&WHITE)?;
            let panels = root.split_evenly((3, 1));

            let title = format!(
                "{} ({}/{}) --- {}",
                record.variant_id, record.ref_allele, record.alt_allele, cluster
            );
            let locus = format!("Position relative to {}:{}", record.chr, record.pos);
            let labels = [
                format!("ref ({})", record.ref_allele),
                format!("alt ({})", record.alt_allele),
            ];
            draw_signal_panel(&panels[0], &title, &locus, &labels, window)?;
            for (panel, allele) in panels[1..].iter().zip(Allele::ALL) {
                draw_attribution_panel(panel, allele, window.attribution(allele), window.y_range)?;
            }

            root.present()?;
        }
        Ok(svg)
    }
}

/// Position of window index `i` relative to the locus.
fn offset(
    i: usize,
    len: usize,
) -> f64 {
    i as f64 - (len / 2) as f64
}

fn x_range(len: usize) -> Range<f64> {
    offset(0, len) - 0.5..offset(len, len) - 0.5
}

/// Dashed vertical line at the locus.
fn locus_marker(
    lo: f64,
    hi: f64,
) -> impl Iterator<Item = PathElement<(f64, f64)>> {
    let step = (hi - lo) / MARKER_DASHES as f64;
    (0..MARKER_DASHES).step_by(2).map(move |k| {
        let y0 = lo + k as f64 * step;
        PathElement::new(vec![(0.0, y0), (0.0, y0 + step)], BLACK.mix(0.6).stroke_width(1))
    })
}

fn signal_bounds(window: &VariantWindow) -> (f64, f64) {
    let (lo, hi) = window
        .ref_signal
        .iter()
        .chain(window.alt_signal.iter())
        .filter(|v| v.is_finite())
        .fold((0.0_f32, 0.0_f32), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let (lo, hi) = (f64::from(lo) * 1.1, f64::from(hi) * 1.1);
    if hi > lo {
        (lo, hi)
    }
    else {
        (lo, lo + f64::from(Y_NUDGE))
    }
}

fn draw_signal_panel(
    area: &Panel,
    title: &str,
    x_desc: &str,
    labels: &[String; 2],
    window: &VariantWindow,
) -> anyhow::Result<()> {
    let len = window.len();
    let (lo, hi) = signal_bounds(window);
    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range(len), lo..hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("Predicted signal")
        .draw()?;

    let baseline = x_range(len);
    chart.draw_series(LineSeries::new(
        [(baseline.start, 0.0), (baseline.end, 0.0)],
        &BLACK.mix(0.4),
    ))?;

    let series = [(Allele::Ref, BLUE), (Allele::Alt, RED)];
    for ((allele, color), label) in series.into_iter().zip(labels) {
        chart
            .draw_series(LineSeries::new(
                window
                    .signal(allele)
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (offset(i, len), f64::from(*v))),
                color.stroke_width(2),
            ))?
            .label(label.as_str())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }
    chart.draw_series(locus_marker(lo, hi))?;

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

/// Per-base bars at each position: positive contributions stacked upward
/// from zero, negative ones downward.
fn stacked_bars(attribution: ArrayView2<f32>) -> Vec<Rectangle<(f64, f64)>> {
    let len = attribution.nrows();
    let mut bars = Vec::with_capacity(attribution.len());
    for (i, row) in attribution.outer_iter().enumerate() {
        let x = offset(i, len);
        let (mut up, mut down) = (0.0_f64, 0.0_f64);
        for (value, color) in row.iter().zip(BASE_COLORS) {
            let value = f64::from(*value);
            if value == 0.0 || !value.is_finite() {
                continue;
            }
            let (y0, y1) = if value > 0.0 {
                let y0 = up;
                up += value;
                (y0, up)
            }
            else {
                let y0 = down;
                down += value;
                (y0, down)
            };
            bars.push(Rectangle::new(
                [(x - BAR_HALF_WIDTH, y0), (x + BAR_HALF_WIDTH, y1)],
                color.filled(),
            ));
        }
    }
    bars
}

fn draw_attribution_panel(
    area: &Panel,
    allele: Allele,
    attribution: ArrayView2<f32>,
    y_range: YRange,
) -> anyhow::Result<()> {
    let len = attribution.nrows();
    let (lo, hi) = (f64::from(y_range.min), f64::from(y_range.max));
    let mut chart = ChartBuilder::on(area)
        .caption(allele.name(), ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range(len), lo..hi)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Attribution")
        .draw()?;

    chart.draw_series(stacked_bars(attribution))?;
    for (base, color) in BASES.into_iter().zip(BASE_COLORS) {
        chart
            .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
            .label(base)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
    chart.draw_series(locus_marker(lo, hi))?;

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use ndarray::{
        Array1,
        Array2,
    };

    use super::*;

    struct Tracks {
        ref_signal:      Array1<f32>,
        alt_signal:      Array1<f32>,
        ref_attribution: Array2<f32>,
        alt_attribution: Array2<f32>,
    }

    impl Tracks {
        fn new(len: usize) -> Self {
            let ref_attribution =
                Array2::from_shape_fn((len, 4), |(p, b)| (p as f32 - 10.0) * 0.01 * (b as f32 + 1.0));
            Self {
                ref_signal: Array1::from_shape_fn(len, |p| p as f32),
                alt_signal: Array1::from_shape_fn(len, |p| (len - p) as f32),
                alt_attribution: -&ref_attribution,
                ref_attribution,
            }
        }

        fn window(&self) -> VariantWindow<'_> {
            VariantWindow {
                ref_signal:      self.ref_signal.view(),
                alt_signal:      self.alt_signal.view(),
                ref_attribution: self.ref_attribution.view(),
                alt_attribution: self.alt_attribution.view(),
                y_range:         YRange::shared(
                    self.ref_attribution.view(),
                    self.alt_attribution.view(),
                ),
            }
        }
    }

    #[test]
    fn writes_figure_named_by_variant() {
        let dir = tempfile::tempdir().unwrap();
        let tracks = Tracks::new(20);
        let record = VariantRecord::new("chr1", 12345, "A", "G", "chr1:12345:A/G");
        let renderer = VariantRenderer::new(RenderConfig::default().with_width(800).with_height(600));

        let path = renderer
            .render(&record, &tracks.window(), "microglia", dir.path())
            .unwrap();
        assert_eq!(path, dir.path().join("chr1:12345:A_G.svg"));

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("microglia"));
        assert!(svg.contains("ref (A)"));
        assert!(svg.contains("alt (G)"));
    }

    #[test]
    fn failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let tracks = Tracks::new(20);
        let record = VariantRecord::new("chr1", 7, "C", "T", "rs7");
        let err = VariantRenderer::new(RenderConfig::default().with_width(400).with_height(300))
            .render(&record, &tracks.window(), "c", &missing)
            .unwrap_err();
        assert!(matches!(err, EnsembleError::Render { .. }));
        assert!(!missing.join("rs7.svg").exists());
    }

    #[test]
    fn bars_stack_by_sign() {
        let attribution = Array2::from_shape_vec((1, 4), vec![0.5, -0.2, 0.25, -0.1]).unwrap();
        let bars = stacked_bars(attribution.view());
        assert_eq!(bars.len(), 4);
    }

    #[test]
    fn empty_window_fails() {
        let dir = tempfile::tempdir().unwrap();
        let tracks = Tracks::new(0);
        let record = VariantRecord::new("chr1", 1, "A", "G", "rs0");
        let err = VariantRenderer::default()
            .render(&record, &tracks.window(), "c", dir.path())
            .unwrap_err();
        assert!(matches!(err, EnsembleError::Render { .. }));
        assert!(!dir.path().join("rs0.svg").exists());
    }
}
