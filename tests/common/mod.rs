#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use ndarray::{
    Array1,
    Array2,
    Array3,
};
use polars::prelude::*;
use varensemble::prelude::*;

pub const SCORE_HEADER: &str = "variant_id\tchr\tpos\tallele1\tallele2\tlogfc\tabs_logfc\tabs_logfc_x_jsd\tabs_logfc_x_jsd.pval";

/// One row of a fold score table.
pub struct ScoreRow {
    pub id:    &'static str,
    pub logfc: f64,
    pub rank:  f64,
    pub pval:  f64,
}

impl ScoreRow {
    pub fn new(
        id: &'static str,
        logfc: f64,
        rank: f64,
        pval: f64,
    ) -> Self {
        Self {
            id,
            logfc,
            rank,
            pval,
        }
    }
}

pub fn write_score_fold(
    dir: &Path,
    fold: usize,
    rows: &[ScoreRow],
) -> anyhow::Result<()> {
    let mut body = String::from(SCORE_HEADER);
    body.push('\n');
    for (i, row) in rows.iter().enumerate() {
        body.push_str(&format!(
            "{}\tchr1\t{}\tA\tG\t{}\t{}\t{}\t{}\n",
            row.id,
            100 + i,
            row.logfc,
            row.logfc.abs(),
            row.rank,
            row.pval
        ));
    }
    write_raw(&FoldLayout::default().scores_path(dir, fold), &body)
}

pub fn write_raw(
    path: &Path,
    body: &str,
) -> anyhow::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(body.as_bytes())?;
    Ok(())
}

pub fn ids(df: &DataFrame) -> Vec<String> {
    let column = df
        .column("variant_id")
        .unwrap()
        .cast(&DataType::String)
        .unwrap();
    column
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap().to_string())
        .collect()
}

pub fn f64_for(
    df: &DataFrame,
    column: &str,
    id: &str,
) -> Option<f64> {
    let row = ids(df).iter().position(|v| v == id).unwrap();
    let values = df
        .column(column)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap();
    let value = values.as_materialized_series().f64().unwrap().get(row);
    value
}

/// Serves fold tensors from memory. The fold files only need to exist on
/// disk; their contents are ignored.
#[derive(Default)]
pub struct MemoryReader {
    folds: HashMap<usize, FoldTensors>,
}

impl MemoryReader {
    /// Registers `tensors` and creates the two placeholder files.
    pub fn insert(
        &mut self,
        dir: &Path,
        tensors: FoldTensors,
    ) -> anyhow::Result<()> {
        let layout = FoldLayout::default();
        write_raw(&layout.predictions_path(dir, tensors.fold), "")?;
        write_raw(&layout.attributions_path(dir, tensors.fold), "")?;
        self.folds.insert(tensors.fold, tensors);
        Ok(())
    }
}

impl FoldTensorReader for MemoryReader {
    fn read_fold(
        &self,
        fold: usize,
        _predictions: &Path,
        _attributions: &Path,
    ) -> anyhow::Result<FoldTensors> {
        self.folds
            .get(&fold)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no tensors registered for fold {fold}"))
    }
}

/// Fold with flat profiles, so each signal row is `count / profile_len`
/// everywhere. Attribution rows are interleaved ref/alt; ref rows hold
/// `value`, alt rows `-value`.
pub fn flat_fold(
    fold: usize,
    n_variants: usize,
    profile_len: usize,
    attribution_len: usize,
    count: f32,
    value: f32,
) -> FoldTensors {
    let alleles = (0..2 * n_variants)
        .map(|i| (i % 2) as i64)
        .collect::<Array1<i64>>();
    let attributions = Array3::from_shape_fn((2 * n_variants, attribution_len, 4), |(r, _, _)| {
        if r % 2 == 0 {
            value
        }
        else {
            -value
        }
    });
    FoldTensors {
        fold,
        ref_counts: Array1::from_elem(n_variants, count),
        alt_counts: Array1::from_elem(n_variants, 2.0 * count),
        ref_profiles: Array2::zeros((n_variants, profile_len)),
        alt_profiles: Array2::zeros((n_variants, profile_len)),
        alleles,
        attributions,
    }
}

pub fn variants(n: usize) -> VariantList {
    (0..n)
        .map(|i| VariantRecord::new("chr3", 5000 + i as u64, "G", "A", format!("chr3:{}:G/A", 5000 + i)))
        .collect()
}
