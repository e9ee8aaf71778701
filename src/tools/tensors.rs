//! Cross-fold aggregation of predicted signal and attribution tensors.
//!
//! Folds are reduced one at a time into a running sum, so peak memory stays
//! at one fold plus the accumulators regardless of the number of folds.

use log::{
    debug,
    info,
};
use ndarray::{
    Array2,
    ArrayView1,
    ArrayView2,
    Axis,
    Zip,
};

use crate::data_structs::{
    AggregatedTensors,
    Allele,
    AttributionTensor,
    FoldTensors,
    SignalTensor,
};
use crate::error::EnsembleError;

/// Derived signal: `count × softmax(profile)` along positions, row-wise.
///
/// The per-row maximum is subtracted before exponentiation, so large logits
/// do not overflow. Each output row sums to its count.
pub fn count_scaled_softmax(
    counts: ArrayView1<f32>,
    profiles: ArrayView2<f32>,
) -> Array2<f32> {
    let mut signal = profiles.to_owned();
    Zip::from(signal.rows_mut())
        .and(counts)
        .for_each(|mut row, &count| {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            row.mapv_inplace(|v| (v - max).exp());
            let norm: f32 = row.sum();
            row.mapv_inplace(|v| count * v / norm);
        });
    signal
}

/// Running sum of one tensor family across folds.
#[derive(Debug, Clone)]
struct RunningTensor<A> {
    sum: Option<A>,
}

impl<A> Default for RunningTensor<A> {
    fn default() -> Self {
        Self { sum: None }
    }
}

/// Streaming fold-mean of signal and attribution tensors, per allele.
///
/// A fold whose shapes disagree with the folds already accumulated is
/// rejected as malformed and contributes nothing; a missing fold is simply
/// never added, so it is never treated as zero signal.
#[derive(Debug, Clone, Default)]
pub struct TensorAccumulator {
    ref_signal:      RunningTensor<SignalTensor>,
    alt_signal:      RunningTensor<SignalTensor>,
    ref_attribution: RunningTensor<AttributionTensor>,
    alt_attribution: RunningTensor<AttributionTensor>,
    folds:           Vec<usize>,
}

impl TensorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folds(&self) -> &[usize] {
        &self.folds
    }

    /// Adds one fold.
    ///
    /// The fold is validated first, and every shape is compared with the
    /// running sums before any of them is touched, so a rejected fold leaves
    /// the accumulator unchanged.
    pub fn add_fold(
        &mut self,
        fold: &FoldTensors,
    ) -> Result<(), EnsembleError> {
        fold.validate()?;

        let ref_signal = count_scaled_softmax(
            fold.counts(Allele::Ref).view(),
            fold.profiles(Allele::Ref).view(),
        );
        let alt_signal = count_scaled_softmax(
            fold.counts(Allele::Alt).view(),
            fold.profiles(Allele::Alt).view(),
        );
        let ref_attribution = fold.attributions_for(Allele::Ref);
        let alt_attribution = fold.attributions_for(Allele::Alt);

        let checks = [
            ("Ref signal", shape_of(&self.ref_signal), ref_signal.shape()),
            ("Alt signal", shape_of(&self.alt_signal), alt_signal.shape()),
            ("Ref attribution", shape_of(&self.ref_attribution), ref_attribution.shape()),
            ("Alt attribution", shape_of(&self.alt_attribution), alt_attribution.shape()),
        ];
        for (family, expected, found) in checks {
            check_shape(fold.fold, family, expected, found)?;
        }

        accumulate(&mut self.ref_signal, ref_signal);
        accumulate(&mut self.alt_signal, alt_signal);
        accumulate(&mut self.ref_attribution, ref_attribution);
        accumulate(&mut self.alt_attribution, alt_attribution);
        self.folds.push(fold.fold);

        debug!("Fold {} accumulated ({} folds so far)", fold.fold, self.folds.len());
        Ok(())
    }

    /// Divides the running sums by the number of contributing folds.
    pub fn finish(self) -> Result<AggregatedTensors, EnsembleError> {
        let n_folds = self.folds.len();
        let (
            Some(ref_signal),
            Some(alt_signal),
            Some(ref_attribution),
            Some(alt_attribution),
        ) = (
            self.ref_signal.sum,
            self.alt_signal.sum,
            self.ref_attribution.sum,
            self.alt_attribution.sum,
        )
        else {
            return Err(EnsembleError::NoData { stage: "tensor aggregation" });
        };

        let scale = 1.0 / n_folds as f32;
        info!(
            "Averaged tensors over {} folds: signal {:?}, attribution {:?}",
            n_folds,
            ref_signal.dim(),
            ref_attribution.dim()
        );
        Ok(AggregatedTensors::new(
            ref_signal * scale,
            alt_signal * scale,
            ref_attribution * scale,
            alt_attribution * scale,
            n_folds,
        ))
    }
}

fn check_shape(
    fold: usize,
    family: &str,
    expected: Option<&[usize]>,
    found: &[usize],
) -> Result<(), EnsembleError> {
    match expected {
        Some(expected) if expected != found => Err(EnsembleError::malformed(
            fold,
            format!(
                "{} shape {:?} differs from previous folds {:?}",
                family, found, expected
            ),
        )),
        _ => Ok(()),
    }
}

fn shape_of<D: ndarray::Dimension>(
    acc: &RunningTensor<ndarray::Array<f32, D>>
) -> Option<&[usize]> {
    acc.sum.as_ref().map(|a| a.shape())
}

fn accumulate<D: ndarray::Dimension>(
    acc: &mut RunningTensor<ndarray::Array<f32, D>>,
    value: ndarray::Array<f32, D>,
) {
    match acc.sum.as_mut() {
        Some(sum) => *sum += &value,
        None => acc.sum = Some(value),
    }
}

/// Total of each signal row; equals the predicted count of the row.
pub fn signal_totals(signal: ArrayView2<f32>) -> ndarray::Array1<f32> {
    signal.sum_axis(Axis(1))
}
