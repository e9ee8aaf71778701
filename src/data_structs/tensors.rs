use ndarray::{
    Array1,
    Array2,
    Array3,
    ArrayView2,
    ArrayView3,
    Axis,
};
use log::debug;
use serde::{
    Deserialize,
    Serialize,
};

use crate::error::EnsembleError;
use crate::getter_fn;

/// Predicted signal, `variants × positions`.
pub type SignalTensor = Array2<f32>;
/// Per-base attribution, `variants × positions × bases (A, C, G, T)`.
pub type AttributionTensor = Array3<f32>;

/// Number of nucleotide channels in an attribution track.
pub const N_BASES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Allele {
    Ref,
    Alt,
}

impl Allele {
    pub const ALL: [Allele; 2] = [Allele::Ref, Allele::Alt];

    /// Decodes the allele-assignment label stored next to attribution rows
    /// (0 = reference, 1 = alternate).
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Allele::Ref),
            1 => Some(Allele::Alt),
            _ => None,
        }
    }

    pub fn label(&self) -> i64 {
        match self {
            Allele::Ref => 0,
            Allele::Alt => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Allele::Ref => "Ref",
            Allele::Alt => "Alt",
        }
    }
}

/// Raw arrays of one fold, as read from its prediction and attribution
/// files.
#[derive(Debug, Clone)]
pub struct FoldTensors {
    pub fold:         usize,
    /// Total predicted count per variant.
    pub ref_counts:   Array1<f32>,
    pub alt_counts:   Array1<f32>,
    /// Unnormalised profile logits, `variants × positions`.
    pub ref_profiles: Array2<f32>,
    pub alt_profiles: Array2<f32>,
    /// Allele label of every attribution row.
    pub alleles:      Array1<i64>,
    /// Attribution rows of both alleles, in file order.
    pub attributions: Array3<f32>,
}

impl FoldTensors {
    pub fn n_variants(&self) -> usize {
        self.ref_profiles.nrows()
    }

    pub fn profile_len(&self) -> usize {
        self.ref_profiles.ncols()
    }

    /// Checks that the arrays of this fold agree with each other.
    ///
    /// Attribution rows may cover fewer variants than the predictions, as
    /// long as both alleles have the same number of rows.
    pub fn validate(&self) -> Result<(), EnsembleError> {
        let fold = self.fold;
        let n = self.n_variants();

        if self.alt_profiles.dim() != self.ref_profiles.dim() {
            return Err(EnsembleError::malformed(
                fold,
                format!(
                    "allele profile shapes differ: {:?} vs {:?}",
                    self.ref_profiles.dim(),
                    self.alt_profiles.dim()
                ),
            ));
        }
        if self.ref_counts.len() != n || self.alt_counts.len() != n {
            return Err(EnsembleError::malformed(
                fold,
                format!(
                    "count arrays ({}, {}) do not match {} profile rows",
                    self.ref_counts.len(),
                    self.alt_counts.len(),
                    n
                ),
            ));
        }
        if self.alleles.len() != self.attributions.len_of(Axis(0)) {
            return Err(EnsembleError::malformed(
                fold,
                format!(
                    "{} allele labels for {} attribution rows",
                    self.alleles.len(),
                    self.attributions.len_of(Axis(0))
                ),
            ));
        }
        if self.attributions.len_of(Axis(2)) != N_BASES {
            return Err(EnsembleError::malformed(
                fold,
                format!(
                    "attribution tracks have {} channels, expected {}",
                    self.attributions.len_of(Axis(2)),
                    N_BASES
                ),
            ));
        }
        if let Some(bad) = self.alleles.iter().find(|l| Allele::from_label(**l).is_none()) {
            return Err(EnsembleError::malformed(
                fold,
                format!("unknown allele label {bad}"),
            ));
        }
        let ref_rows = self.attribution_rows(Allele::Ref).len();
        let alt_rows = self.attribution_rows(Allele::Alt).len();
        if ref_rows != alt_rows {
            return Err(EnsembleError::malformed(
                fold,
                format!("{ref_rows} Ref and {alt_rows} Alt attribution rows"),
            ));
        }
        if ref_rows != n {
            // variants past the attribution rows fail at windowing
            debug!(
                "Fold {}: attribution rows cover {} of {} variants",
                fold, ref_rows, n
            );
        }
        Ok(())
    }

    /// Indices of attribution rows labelled with `allele`, in file order.
    pub fn attribution_rows(
        &self,
        allele: Allele,
    ) -> Vec<usize> {
        self.alleles
            .iter()
            .enumerate()
            .filter(|(_, label)| **label == allele.label())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Attribution rows of one allele. Rows are selected by label, so files
    /// with interleaved ref/alt rows are handled.
    pub fn attributions_for(
        &self,
        allele: Allele,
    ) -> Array3<f32> {
        self.attributions
            .select(Axis(0), &self.attribution_rows(allele))
    }

    pub fn counts(
        &self,
        allele: Allele,
    ) -> &Array1<f32> {
        match allele {
            Allele::Ref => &self.ref_counts,
            Allele::Alt => &self.alt_counts,
        }
    }

    pub fn profiles(
        &self,
        allele: Allele,
    ) -> &Array2<f32> {
        match allele {
            Allele::Ref => &self.ref_profiles,
            Allele::Alt => &self.alt_profiles,
        }
    }
}

/// Fold-mean tensors, positionally aligned to the canonical variant list.
#[derive(Debug, Clone)]
pub struct AggregatedTensors {
    ref_signal:      SignalTensor,
    alt_signal:      SignalTensor,
    ref_attribution: AttributionTensor,
    alt_attribution: AttributionTensor,
    n_folds:         usize,
}

impl AggregatedTensors {
    getter_fn!(ref_signal, SignalTensor);
    getter_fn!(alt_signal, SignalTensor);
    getter_fn!(ref_attribution, AttributionTensor);
    getter_fn!(alt_attribution, AttributionTensor);

    pub fn new(
        ref_signal: SignalTensor,
        alt_signal: SignalTensor,
        ref_attribution: AttributionTensor,
        alt_attribution: AttributionTensor,
        n_folds: usize,
    ) -> Self {
        Self {
            ref_signal,
            alt_signal,
            ref_attribution,
            alt_attribution,
            n_folds,
        }
    }

    pub fn signal(
        &self,
        allele: Allele,
    ) -> ArrayView2<'_, f32> {
        match allele {
            Allele::Ref => self.ref_signal.view(),
            Allele::Alt => self.alt_signal.view(),
        }
    }

    pub fn attribution(
        &self,
        allele: Allele,
    ) -> ArrayView3<'_, f32> {
        match allele {
            Allele::Ref => self.ref_attribution.view(),
            Allele::Alt => self.alt_attribution.view(),
        }
    }

    /// Rows available for windowing; the smaller of the two tensor families.
    pub fn n_variants(&self) -> usize {
        self.ref_signal
            .nrows()
            .min(self.ref_attribution.len_of(Axis(0)))
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }
}
