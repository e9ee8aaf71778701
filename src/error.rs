use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds raised while ensembling and rendering.
///
/// Fold-level kinds ([`EnsembleError::MissingInput`],
/// [`EnsembleError::MalformedInput`]) exclude a single fold from a run. Only
/// [`EnsembleError::NoData`] is fatal for a whole run.
#[derive(Error, Debug)]
pub enum EnsembleError {
    #[error("fold {fold}: expected input {} is missing", .path.display())]
    MissingInput { fold: usize, path: PathBuf },

    #[error("fold {fold}: malformed input: {reason}")]
    MalformedInput { fold: usize, reason: String },

    #[error("no usable folds for {stage}")]
    NoData { stage: &'static str },

    #[error("table lacks columns required for filtering: {}", .missing.join(", "))]
    InsufficientSchema { missing: Vec<String> },

    #[error("{variant_id}: window out of bounds: {reason}")]
    Window { variant_id: String, reason: String },

    #[error("{variant_id}: rendering failed: {reason}")]
    Render { variant_id: String, reason: String },
}

impl EnsembleError {
    /// Whether the error only excludes one fold (or one variant) and the run
    /// may continue.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EnsembleError::NoData { .. })
    }

    pub fn malformed(
        fold: usize,
        reason: impl Into<String>,
    ) -> Self {
        EnsembleError::MalformedInput {
            fold,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_no_data_is_fatal() {
        assert!(EnsembleError::malformed(2, "no variant_id").is_recoverable());
        assert!(EnsembleError::MissingInput {
            fold: 0,
            path: PathBuf::from("fold_0.variant_scores.tsv"),
        }
        .is_recoverable());
        assert!(!EnsembleError::NoData { stage: "scores" }.is_recoverable());
    }

    #[test]
    fn messages_name_fold_and_columns() {
        let err = EnsembleError::malformed(3, "missing key column variant_id");
        assert_eq!(
            err.to_string(),
            "fold 3: malformed input: missing key column variant_id"
        );
        let err = EnsembleError::InsufficientSchema {
            missing: vec!["abs_logfc".into(), "abs_logfc_x_jsd.pval".into()],
        };
        assert!(err.to_string().ends_with("abs_logfc, abs_logfc_x_jsd.pval"));
    }
}
