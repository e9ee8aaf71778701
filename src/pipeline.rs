//! End-to-end drivers of the two pipelines.
//!
//! Both drivers walk the configured folds in index order. A fold that is
//! missing or malformed is logged and skipped; only a run with no usable
//! fold at all fails.

use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context;
use hashbrown::HashSet;
use log::{
    info,
    warn,
};

use crate::config::EnsembleConfig;
use crate::data_structs::VariantList;
use crate::error::EnsembleError;
use crate::io::{
    load_fold_table,
    load_fold_tensors,
    write_tsv,
    FoldTensorReader,
};
use crate::tools::batch::{
    BatchReport,
    BatchScheduler,
    TaskResult,
};
use crate::tools::render::VariantRenderer;
use crate::tools::scores::{
    FilterOutcome,
    ScoreAccumulator,
    SignificanceFilter,
};
use crate::tools::tensors::TensorAccumulator;

/// A fold excluded from a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSkip {
    pub fold:   usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterSummary {
    Hits {
        count:      usize,
        percentage: f64,
        path:       PathBuf,
    },
    /// Filtering did not run; no hits file was written.
    Skipped { missing: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct ScoreRunSummary {
    pub folds_loaded:  Vec<usize>,
    pub folds_skipped: Vec<FoldSkip>,
    /// Rows of the ensemble table.
    pub n_rows:        usize,
    pub scores_path:   PathBuf,
    pub filter:        FilterSummary,
}

pub fn ensemble_scores_path(
    out_dir: &Path,
    cluster: &str,
) -> PathBuf {
    out_dir.join(format!("{cluster}_ensemble_scores.tsv"))
}

pub fn sig_hits_path(
    out_dir: &Path,
    cluster: &str,
) -> PathBuf {
    out_dir.join(format!("{cluster}_sig_hits.tsv"))
}

/// Splits a fold-level error into a skip record, or propagates a fatal one.
fn skip_fold(
    skipped: &mut Vec<FoldSkip>,
    fold: usize,
    err: EnsembleError,
) -> Result<(), EnsembleError> {
    if !err.is_recoverable() {
        return Err(err);
    }
    warn!("Skipping fold {}: {}", fold, err);
    skipped.push(FoldSkip {
        fold,
        reason: err.to_string(),
    });
    Ok(())
}

/// Scores pipeline: fold tables, ensemble table, significant hits.
///
/// Writes `<cluster>_ensemble_scores.tsv` and, when the filter columns are
/// present, `<cluster>_sig_hits.tsv` into `out_dir`. Nothing is written when
/// no fold could be loaded.
pub fn run_score_pipeline(
    config: &EnsembleConfig,
    base_dir: &Path,
    cluster: &str,
    out_dir: &Path,
) -> anyhow::Result<ScoreRunSummary> {
    let mut accumulator = ScoreAccumulator::new(config.schema.clone());
    let mut folds_skipped = Vec::new();

    for fold in config.layout.folds() {
        match load_fold_table(&config.layout, base_dir, fold, &config.schema) {
            Ok(table) => accumulator.add_fold(&table)?,
            Err(err) => skip_fold(&mut folds_skipped, fold, err)?,
        }
    }
    let folds_loaded = accumulator.folds().to_vec();
    info!(
        "{}: loaded {} of {} folds ({} skipped)",
        cluster,
        folds_loaded.len(),
        config.layout.n_folds,
        folds_skipped.len()
    );

    let mut ensemble = accumulator.finish()?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let scores_path = ensemble_scores_path(out_dir, cluster);
    write_tsv(&mut ensemble, &scores_path)?;
    info!("Wrote {} variants to {}", ensemble.height(), scores_path.display());

    let filter = SignificanceFilter::new(config.schema.clone(), config.thresholds);
    let filter = match filter.apply(&ensemble)? {
        FilterOutcome::Filtered(mut hits) => {
            let path = sig_hits_path(out_dir, cluster);
            write_tsv(&mut hits.data, &path)?;
            FilterSummary::Hits {
                count: hits.count(),
                percentage: hits.percentage(),
                path,
            }
        },
        FilterOutcome::InsufficientColumns(missing) => FilterSummary::Skipped { missing },
    };

    Ok(ScoreRunSummary {
        folds_loaded,
        folds_skipped,
        n_rows: ensemble.height(),
        scores_path,
        filter,
    })
}

/// Plots pipeline: fold tensors, fold mean, one figure per variant.
///
/// Row `i` of the tensors belongs to `variants[i]`. Per-variant failures are
/// collected in the returned report; `inspect` sees every task result as it
/// finishes.
pub fn run_plot_pipeline<R, F>(
    config: &EnsembleConfig,
    reader: &R,
    variants: &VariantList,
    base_dir: &Path,
    cluster: &str,
    out_dir: &Path,
    inspect: F,
) -> anyhow::Result<BatchReport>
where
    R: FoldTensorReader + ?Sized,
    F: Fn(&TaskResult) + Sync + Send, {
    let mut accumulator = TensorAccumulator::new();
    let mut folds_skipped = Vec::new();

    for fold in config.layout.folds() {
        let added = load_fold_tensors(reader, &config.layout, base_dir, fold)
            .and_then(|tensors| accumulator.add_fold(&tensors));
        if let Err(err) = added {
            skip_fold(&mut folds_skipped, fold, err)?;
        }
    }
    info!(
        "{}: aggregating tensors of {} of {} folds ({} skipped)",
        cluster,
        accumulator.folds().len(),
        config.layout.n_folds,
        folds_skipped.len()
    );
    let tensors = accumulator.finish()?;

    if variants.len() > tensors.n_variants() {
        warn!(
            "Variant list has {} entries but tensors hold {} rows; the extra variants will fail",
            variants.len(),
            tensors.n_variants()
        );
    }
    let mut seen = HashSet::with_capacity(variants.len());
    for record in variants.records() {
        if !seen.insert(record.variant_id.as_str()) {
            warn!(
                "Duplicate variant id {}; its figure is overwritten",
                record.variant_id
            );
        }
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let scheduler = BatchScheduler::new(
        config.workers,
        config.window,
        VariantRenderer::new(config.render.clone()),
    );
    scheduler.run(variants, &tensors, cluster, out_dir, inspect)
}
