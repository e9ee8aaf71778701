//! # varensemble
//!
//! `varensemble` post-processes the per-fold outputs of an ensemble of
//! sequence-to-signal models scored on the same set of genetic variants.
//!
//! Two pipelines share the variant-identity data model:
//!
//! * **Scores** (pipeline A): per-fold variant score tables are combined into
//!   one ensemble table (column-wise mean over the folds that report each
//!   variant, plus the standard deviation of the primary effect column) and
//!   then filtered by a dual effect-size / p-value threshold. See
//!   [`tools::scores`].
//! * **Plots** (pipeline B): per-fold predicted profiles and per-base
//!   attribution tracks are averaged across folds, windowed around each
//!   variant locus and rendered as a three-panel comparative figure, one file
//!   per variant, on a bounded worker pool. See [`tools::tensors`],
//!   [`tools::window`], [`tools::render`] and [`tools::batch`].
//!
//! Folds may be missing or malformed; they are logged and skipped. Only the
//! absence of any usable fold aborts a run.
//!
//! Number of threads used by polars can be capped with the
//! `VARENS_NUM_THREADS` environment variable.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use varensemble::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = EnsembleConfig::default();
//!     let summary = run_score_pipeline(
//!         &config,
//!         Path::new("scores/"),
//!         "microglia",
//!         Path::new("out/"),
//!     )?;
//!     println!("{} variants ensembled", summary.n_rows);
//!     Ok(())
//! }
//! ```

#[ctor::ctor]
fn init() {
    if let Ok(n) = std::env::var("VARENS_NUM_THREADS") {
        std::env::set_var("POLARS_MAX_THREADS", n)
    }
}

pub mod config;
pub mod data_structs;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod prelude;
pub mod tools;
pub mod utils;
