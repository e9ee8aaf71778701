//! File input and output.
//!
//! All per-fold inputs live in one base directory and are named by a
//! [`FoldLayout`] template (`fold_{k}.variant_scores.tsv` and friends). This
//! module provides:
//!
//! - [`table`]: the fold score table loader and TSV writer.
//! - [`tensors`]: the fold tensor loader and the [`FoldTensorReader`] seam,
//!   with an HDF5 implementation behind the `hdf5` feature.
//! - [`variants`]: the headerless variant list reader.

use std::ops::Range;
use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::with_field_fn;

pub mod table;
pub mod tensors;
pub mod variants;

pub use table::{
    load_fold_table,
    write_tsv,
    FoldTable,
};
#[cfg(feature = "hdf5")]
pub use tensors::Hdf5FoldReader;
pub use tensors::{
    load_fold_tensors,
    FoldTensorReader,
};
pub use variants::read_variant_list;

/// Placeholder substituted with the fold index in file name templates.
pub const FOLD_PLACEHOLDER: &str = "{k}";

/// Naming convention of per-fold input files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldLayout {
    pub n_folds:               usize,
    pub scores_template:       String,
    pub predictions_template:  String,
    pub attributions_template: String,
}

impl FoldLayout {
    with_field_fn!(n_folds, usize);
    with_field_fn!(scores_template, String);
    with_field_fn!(predictions_template, String);
    with_field_fn!(attributions_template, String);

    /// Fold indices in processing order.
    pub fn folds(&self) -> Range<usize> {
        0..self.n_folds
    }

    pub fn scores_path(
        &self,
        base_dir: &Path,
        fold: usize,
    ) -> PathBuf {
        expand(&self.scores_template, base_dir, fold)
    }

    pub fn predictions_path(
        &self,
        base_dir: &Path,
        fold: usize,
    ) -> PathBuf {
        expand(&self.predictions_template, base_dir, fold)
    }

    pub fn attributions_path(
        &self,
        base_dir: &Path,
        fold: usize,
    ) -> PathBuf {
        expand(&self.attributions_template, base_dir, fold)
    }
}

impl Default for FoldLayout {
    fn default() -> Self {
        Self {
            n_folds:               5,
            scores_template:       "fold_{k}.variant_scores.tsv".into(),
            predictions_template:  "fold_{k}.variant_predictions.h5".into(),
            attributions_template: "fold_{k}.variant_shap.counts.h5".into(),
        }
    }
}

fn expand(
    template: &str,
    base_dir: &Path,
    fold: usize,
) -> PathBuf {
    base_dir.join(template.replace(FOLD_PLACEHOLDER, &fold.to_string()))
}
