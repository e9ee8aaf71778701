use std::ops::Range;

use ndarray::{
    s,
    ArrayView1,
    ArrayView2,
    Axis,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::data_structs::{
    AggregatedTensors,
    Allele,
};
use crate::error::EnsembleError;
use crate::with_field_fn;

/// Headroom applied to the attribution range.
pub const Y_PADDING: f32 = 1.1;
/// Added to the upper bound when the attribution range is degenerate.
pub const Y_NUDGE: f32 = 0.01;

/// Window geometry. The two tensor families may be produced with different
/// paddings, so each has its own center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    /// Variant locus in signal coordinates.
    pub signal_center:      usize,
    /// Variant locus in attribution coordinates.
    pub attribution_center: usize,
    /// Positions kept on each side of the locus.
    pub half_window:        usize,
}

impl WindowSpec {
    with_field_fn!(signal_center, usize);
    with_field_fn!(attribution_center, usize);
    with_field_fn!(half_window, usize);

    pub fn width(&self) -> usize {
        2 * self.half_window
    }

    /// Positions relative to the locus, `-half_window..half_window`.
    pub fn offsets(&self) -> Range<i64> {
        let half = self.half_window as i64;
        -half..half
    }
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            signal_center:      500,
            attribution_center: 1057,
            half_window:        150,
        }
    }
}

/// Shared y-axis range of the two attribution panels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YRange {
    pub min: f32,
    pub max: f32,
}

impl YRange {
    /// `[min, max] × 1.1` over both tracks, nudging the upper bound when the
    /// range would have zero width.
    pub fn shared(
        a: ArrayView2<f32>,
        b: ArrayView2<f32>,
    ) -> Self {
        let (lo, hi) = a
            .iter()
            .chain(b.iter())
            .filter(|v| !v.is_nan())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            });
        let (lo, hi) = if lo.is_finite() && hi.is_finite() {
            (lo, hi)
        }
        else {
            (0.0, 0.0)
        };

        let min = lo * Y_PADDING;
        let mut max = hi * Y_PADDING;
        if max == min {
            max += Y_NUDGE;
        }
        Self { min, max }
    }
}

/// The four windowed tracks of one variant plus their shared scale.
#[derive(Debug, Clone)]
pub struct VariantWindow<'a> {
    pub ref_signal:      ArrayView1<'a, f32>,
    pub alt_signal:      ArrayView1<'a, f32>,
    pub ref_attribution: ArrayView2<'a, f32>,
    pub alt_attribution: ArrayView2<'a, f32>,
    pub y_range:         YRange,
}

impl VariantWindow<'_> {
    pub fn len(&self) -> usize {
        self.ref_signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ref_signal.is_empty()
    }

    pub fn signal(
        &self,
        allele: Allele,
    ) -> ArrayView1<'_, f32> {
        match allele {
            Allele::Ref => self.ref_signal.view(),
            Allele::Alt => self.alt_signal.view(),
        }
    }

    pub fn attribution(
        &self,
        allele: Allele,
    ) -> ArrayView2<'_, f32> {
        match allele {
            Allele::Ref => self.ref_attribution.view(),
            Allele::Alt => self.alt_attribution.view(),
        }
    }
}

/// Slices `row` of the aggregated tensors symmetrically around the
/// configured centers.
///
/// Bounds are never clipped: a window reaching outside either tensor, or a
/// row past the end, is reported as [`EnsembleError::Window`].
pub fn extract_window<'a>(
    tensors: &'a AggregatedTensors,
    row: usize,
    geometry: &WindowSpec,
    variant_id: &str,
) -> Result<VariantWindow<'a>, EnsembleError> {
    let fail = |reason: String| EnsembleError::Window {
        variant_id: variant_id.to_string(),
        reason,
    };

    if geometry.half_window == 0 {
        return Err(fail("half window is zero".into()));
    }
    if row >= tensors.n_variants() {
        return Err(fail(format!(
            "row {} past the {} aggregated variants",
            row,
            tensors.n_variants()
        )));
    }

    let signal_len = tensors.ref_signal().len_of(Axis(1));
    let attribution_len = tensors.ref_attribution().len_of(Axis(1));
    let signal = window_range(geometry.signal_center, geometry.half_window, signal_len)
        .map_err(|e| fail(format!("signal {e}")))?;
    let attribution =
        window_range(geometry.attribution_center, geometry.half_window, attribution_len)
            .map_err(|e| fail(format!("attribution {e}")))?;

    let ref_attribution = tensors
        .ref_attribution()
        .slice(s![row, attribution.clone(), ..]);
    let alt_attribution = tensors
        .alt_attribution()
        .slice(s![row, attribution, ..]);

    Ok(VariantWindow {
        ref_signal: tensors.ref_signal().slice(s![row, signal.clone()]),
        alt_signal: tensors.alt_signal().slice(s![row, signal]),
        y_range: YRange::shared(ref_attribution, alt_attribution),
        ref_attribution,
        alt_attribution,
    })
}

fn window_range(
    center: usize,
    half: usize,
    len: usize,
) -> Result<Range<usize>, String> {
    let start = center
        .checked_sub(half)
        .ok_or_else(|| format!("window starts before 0 (center {center}, half {half})"))?;
    let end = center + half;
    if end > len {
        return Err(format!(
            "window end {end} exceeds length {len} (center {center}, half {half})"
        ));
    }
    Ok(start..end)
}
