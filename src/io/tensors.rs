use std::path::Path;

use log::debug;

use crate::data_structs::FoldTensors;
use crate::error::EnsembleError;
use crate::io::FoldLayout;

/// Source of one fold's raw tensors.
///
/// Implementations decode the paired prediction and attribution files; the
/// existence checks and validation are done by [`load_fold_tensors`].
pub trait FoldTensorReader: Sync {
    fn read_fold(
        &self,
        fold: usize,
        predictions: &Path,
        attributions: &Path,
    ) -> anyhow::Result<FoldTensors>;
}

/// Loads and validates the tensors of `fold`.
///
/// Both the prediction and the attribution file must exist; partial
/// presence is treated as absence ([`EnsembleError::MissingInput`]). Read or
/// shape errors are reported as [`EnsembleError::MalformedInput`].
pub fn load_fold_tensors<R: FoldTensorReader + ?Sized>(
    reader: &R,
    layout: &FoldLayout,
    base_dir: &Path,
    fold: usize,
) -> Result<FoldTensors, EnsembleError> {
    let predictions = layout.predictions_path(base_dir, fold);
    let attributions = layout.attributions_path(base_dir, fold);

    for path in [&predictions, &attributions] {
        if !path.is_file() {
            return Err(EnsembleError::MissingInput {
                fold,
                path: path.clone(),
            });
        }
    }

    let tensors = reader
        .read_fold(fold, &predictions, &attributions)
        .map_err(|e| EnsembleError::malformed(fold, format!("{e:#}")))?;
    tensors.validate()?;

    debug!(
        "Fold {}: {} variants, profile length {}, attribution shape {:?}",
        fold,
        tensors.n_variants(),
        tensors.profile_len(),
        tensors.attributions.dim()
    );
    Ok(tensors)
}

#[cfg(feature = "hdf5")]
mod h5 {
    use std::path::Path;

    use anyhow::Context;
    use ndarray::{
        Array1,
        Ix3,
    };

    use super::FoldTensorReader;
    use crate::data_structs::FoldTensors;

    /// Reads fold tensors from HDF5 files.
    ///
    /// The prediction file holds an `observed` group with
    /// `allele{1,2}_pred_counts` (`N` or `N × 1`) and
    /// `allele{1,2}_pred_profiles` (`N × L`). The attribution file holds
    /// `alleles` (`2N`) and `projected_shap/seq` (`2N × W × 4`).
    #[derive(Debug, Clone, Default)]
    pub struct Hdf5FoldReader;

    fn read_counts(
        file: &hdf5::File,
        name: &str,
    ) -> anyhow::Result<Array1<f32>> {
        let counts = file
            .dataset(name)
            .with_context(|| format!("dataset {name}"))?
            .read_dyn::<f32>()?;
        if counts.ndim() > 2 || (counts.ndim() == 2 && counts.shape()[1] != 1) {
            anyhow::bail!("dataset {name} has unexpected shape {:?}", counts.shape());
        }
        Ok(counts.iter().copied().collect())
    }

    impl FoldTensorReader for Hdf5FoldReader {
        fn read_fold(
            &self,
            fold: usize,
            predictions: &Path,
            attributions: &Path,
        ) -> anyhow::Result<FoldTensors> {
            let preds = hdf5::File::open(predictions)
                .with_context(|| format!("opening {}", predictions.display()))?;
            let ref_counts = read_counts(&preds, "observed/allele1_pred_counts")?;
            let alt_counts = read_counts(&preds, "observed/allele2_pred_counts")?;
            let ref_profiles = preds
                .dataset("observed/allele1_pred_profiles")?
                .read_2d::<f32>()?;
            let alt_profiles = preds
                .dataset("observed/allele2_pred_profiles")?
                .read_2d::<f32>()?;

            let attr = hdf5::File::open(attributions)
                .with_context(|| format!("opening {}", attributions.display()))?;
            let alleles = attr.dataset("alleles")?.read_1d::<i64>()?;
            let attributions = attr
                .dataset("projected_shap/seq")?
                .read_dyn::<f32>()?
                .into_dimensionality::<Ix3>()
                .context("projected_shap/seq must be three-dimensional")?;

            Ok(FoldTensors {
                fold,
                ref_counts,
                alt_counts,
                ref_profiles,
                alt_profiles,
                alleles,
                attributions,
            })
        }
    }
}

#[cfg(feature = "hdf5")]
pub use h5::Hdf5FoldReader;
