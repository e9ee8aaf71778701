use indexmap::{
    IndexMap,
    IndexSet,
};
use itertools::Itertools;
use log::{
    debug,
    info,
    warn,
};
use polars::prelude::*;

use crate::error::EnsembleError;
use crate::io::FoldTable;
use crate::tools::scores::ScoreSchema;
use crate::utils::{
    RunningMean,
    RunningStats,
};

#[derive(Debug, Clone, Default)]
struct VariantEntry {
    /// Fold the metadata row was taken from.
    metadata_fold: Option<usize>,
    metadata:      Vec<Option<String>>,
    means:         Vec<RunningMean>,
    effect:        RunningStats,
}

impl VariantEntry {
    fn mean_slot(
        &mut self,
        idx: usize,
    ) -> &mut RunningMean {
        if self.means.len() <= idx {
            self.means.resize(idx + 1, RunningMean::new());
        }
        &mut self.means[idx]
    }

    /// Whether `fold` should replace the current metadata row.
    fn takes_metadata_from(
        &self,
        fold: usize,
    ) -> bool {
        self.metadata_fold.map_or(true, |source| fold < source)
    }
}

/// Streaming cross-fold aggregator of variant score tables.
///
/// For every variant and numeric column a running sum and count is kept, so
/// a mean only ever covers the folds that reported both the variant and the
/// column. The primary effect column additionally feeds a Welford
/// accumulator for its sample standard deviation.
///
/// Metadata policy: the whole metadata row of a variant is taken from the
/// lowest-indexed fold containing it, independent of the order folds are
/// added in. Values absent from that fold stay null.
#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    schema:        ScoreSchema,
    metadata_cols: IndexSet<String>,
    numeric_cols:  IndexSet<String>,
    /// Seen so far only as all-null text columns.
    pending_cols:  IndexSet<String>,
    variants:      IndexMap<String, VariantEntry>,
    folds:         Vec<usize>,
}

impl ScoreAccumulator {
    pub fn new(schema: ScoreSchema) -> Self {
        Self {
            schema,
            metadata_cols: IndexSet::new(),
            numeric_cols: IndexSet::new(),
            pending_cols: IndexSet::new(),
            variants: IndexMap::new(),
            folds: Vec::new(),
        }
    }

    /// Folds added so far, in the order they were added.
    pub fn folds(&self) -> &[usize] {
        &self.folds
    }

    pub fn n_variants(&self) -> usize {
        self.variants.len()
    }

    /// Adds one fold's rows.
    ///
    /// A column keeps the role (metadata or numeric) it had in the first fold
    /// where it held a value; later folds are cast accordingly, with
    /// unparsable numeric values counted as missing.
    pub fn add_fold(
        &mut self,
        table: &FoldTable,
    ) -> anyhow::Result<()> {
        let fold = table.fold();
        let data = table.data();

        for name in table.metadata_columns(&self.schema) {
            if !self.numeric_cols.contains(&name) {
                self.pending_cols.shift_remove(&name);
                self.metadata_cols.insert(name);
            }
        }
        for name in table.numeric_columns(&self.schema) {
            if !self.metadata_cols.contains(&name) {
                self.pending_cols.shift_remove(&name);
                self.numeric_cols.insert(name);
            }
        }
        for name in table.undecided_columns(&self.schema) {
            if !self.metadata_cols.contains(&name) && !self.numeric_cols.contains(&name) {
                self.pending_cols.insert(name);
            }
        }

        let keys = data
            .column(&self.schema.id_col)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let keys = keys.str()?;

        let metadata = self
            .metadata_cols
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| data.column(name).ok().map(|c| (idx, c)))
            .map(|(idx, c)| {
                c.as_materialized_series()
                    .cast(&DataType::String)
                    .map(|s| (idx, s))
            })
            .collect::<PolarsResult<Vec<_>>>()?;
        let numeric = self
            .numeric_cols
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| data.column(name).ok().map(|c| (idx, c)))
            .map(|(idx, c)| {
                c.as_materialized_series()
                    .cast(&DataType::Float64)
                    .map(|s| (idx, s))
            })
            .collect::<PolarsResult<Vec<_>>>()?;
        let effect_idx = self.numeric_cols.get_index_of(&self.schema.effect_col);

        let metadata = metadata
            .iter()
            .map(|(idx, s)| s.str().map(|ca| (*idx, ca)))
            .collect::<PolarsResult<Vec<_>>>()?;
        let numeric = numeric
            .iter()
            .map(|(idx, s)| s.f64().map(|ca| (*idx, ca)))
            .collect::<PolarsResult<Vec<_>>>()?;

        let n_metadata = self.metadata_cols.len();
        let mut n_missing_key = 0usize;
        for (row, key) in keys.into_iter().enumerate() {
            let Some(key) = key else {
                n_missing_key += 1;
                continue;
            };
            let entry = self.variants.entry(key.to_string()).or_default();

            if entry.takes_metadata_from(fold) {
                entry.metadata_fold = Some(fold);
                entry.metadata = vec![None; n_metadata];
                for (idx, ca) in metadata.iter() {
                    entry.metadata[*idx] = ca.get(row).map(str::to_string);
                }
            }
            for (idx, ca) in numeric.iter() {
                if let Some(value) = ca.get(row) {
                    entry.mean_slot(*idx).push(value);
                    if Some(*idx) == effect_idx {
                        entry.effect.push(value);
                    }
                }
            }
        }

        if n_missing_key > 0 {
            warn!("Fold {}: skipped {} rows without a variant id", fold, n_missing_key);
        }
        debug!(
            "Fold {} added: {} rows, {} variants so far",
            fold,
            data.height(),
            self.variants.len()
        );
        self.folds.push(fold);
        Ok(())
    }

    /// Builds the ensemble table, sorted descending by the ranking column.
    ///
    /// Columns: key, metadata, numeric means, then the sample std of the
    /// primary effect column. The std is null for variants reported by a
    /// single fold.
    /// Fails with [`EnsembleError::NoData`] when no fold was added.
    pub fn finish(mut self) -> anyhow::Result<DataFrame> {
        if self.folds.is_empty() {
            return Err(EnsembleError::NoData { stage: "score aggregation" }.into());
        }
        // never held a value in any fold; carried as empty metadata
        let pending = std::mem::take(&mut self.pending_cols);
        self.metadata_cols.extend(pending);
        Ok(self.build_frame()?)
    }

    fn build_frame(&self) -> PolarsResult<DataFrame> {
        let schema = &self.schema;
        let mut columns: Vec<Column> = Vec::new();

        let ids = self.variants.keys().map(String::as_str).collect_vec();
        columns.push(Series::new(schema.id_col.as_str().into(), ids).into());

        for (idx, name) in self.metadata_cols.iter().enumerate() {
            let values = self
                .variants
                .values()
                .map(|e| {
                    e.metadata
                        .get(idx)
                        .and_then(|v| v.as_deref())
                })
                .collect_vec();
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        for (idx, name) in self.numeric_cols.iter().enumerate() {
            let values = self
                .variants
                .values()
                .map(|e| e.means.get(idx).and_then(RunningMean::mean))
                .collect_vec();
            columns.push(Series::new(name.as_str().into(), values).into());
        }

        if self.numeric_cols.contains(&schema.effect_col) {
            let values = self
                .variants
                .values()
                .map(|e| e.effect.sample_std())
                .collect_vec();
            columns.push(Series::new(schema.effect_std_col.as_str().into(), values).into());
        }
        else {
            warn!(
                "Primary effect column '{}' absent from all folds, no '{}' column",
                schema.effect_col, schema.effect_std_col
            );
        }

        let df = DataFrame::new(columns)?;
        info!(
            "Ensembled {} variants over {} folds ({} numeric columns)",
            df.height(),
            self.folds.len(),
            self.numeric_cols.len()
        );
        sort_by_rank(df, &schema.rank_col)
    }
}

/// Sorts descending by `rank_col`, nulls last, ties in current order. A
/// frame without the column is returned unchanged.
pub(crate) fn sort_by_rank(
    df: DataFrame,
    rank_col: &str,
) -> PolarsResult<DataFrame> {
    if df.column(rank_col).is_err() {
        warn!("Ranking column '{}' absent, output left unsorted", rank_col);
        return Ok(df);
    }
    df.sort(
        [rank_col],
        SortMultipleOptions::default()
            .with_order_descending(true)
            .with_nulls_last(true)
            .with_maintain_order(true),
    )
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    fn table(
        fold: usize,
        ids: &[&str],
        logfc: &[Option<f64>],
        rank: &[f64],
        chr: &[&str],
    ) -> FoldTable {
        let df = df!(
            "variant_id" => ids,
            "chr" => chr,
            "logfc" => logfc,
            "abs_logfc_x_jsd" => rank,
        )
        .unwrap();
        FoldTable::try_new(fold, df, &ScoreSchema::default()).unwrap()
    }

    fn f64_at(
        df: &DataFrame,
        col: &str,
        id: &str,
    ) -> Option<f64> {
        let ids = df.column("variant_id").unwrap().as_materialized_series().str().unwrap().clone();
        let row = ids.into_iter().position(|v| v == Some(id)).unwrap();
        df.column(col).unwrap().as_materialized_series().f64().unwrap().get(row)
    }

    #[test]
    fn zero_folds_is_no_data() {
        let acc = ScoreAccumulator::new(ScoreSchema::default());
        let err = acc.finish().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EnsembleError>(),
            Some(EnsembleError::NoData { .. })
        ));
    }

    #[test]
    fn mean_covers_only_reporting_folds() -> anyhow::Result<()> {
        let mut acc = ScoreAccumulator::new(ScoreSchema::default());
        acc.add_fold(&table(
            0,
            &["a", "b"],
            &[Some(1.0), Some(2.0)],
            &[0.1, 0.2],
            &["chr1", "chr1"],
        ))?;
        acc.add_fold(&table(
            1,
            &["a", "c"],
            &[Some(3.0), Some(5.0)],
            &[0.3, 0.4],
            &["chr1", "chr2"],
        ))?;
        acc.add_fold(&table(2, &["a", "b"], &[Some(5.0), None], &[0.2, 0.2], &["chr1", "chr1"]))?;
        let df = acc.finish()?;

        assert_eq!(df.height(), 3);
        assert_approx_eq!(f64_at(&df, "logfc", "a").unwrap(), 3.0);
        // b's second value is null, so only fold 0 contributes
        assert_approx_eq!(f64_at(&df, "logfc", "b").unwrap(), 2.0);
        assert_approx_eq!(f64_at(&df, "logfc", "c").unwrap(), 5.0);
        assert_approx_eq!(f64_at(&df, "logfc_std", "a").unwrap(), 2.0);
        assert_eq!(f64_at(&df, "logfc_std", "b"), None);
        assert_eq!(f64_at(&df, "logfc_std", "c"), None);
        Ok(())
    }

    #[test]
    fn metadata_from_lowest_fold_regardless_of_order() -> anyhow::Result<()> {
        let mut acc = ScoreAccumulator::new(ScoreSchema::default());
        acc.add_fold(&table(3, &["a"], &[Some(1.0)], &[0.1], &["chrX"]))?;
        acc.add_fold(&table(1, &["a"], &[Some(1.0)], &[0.1], &["chr7"]))?;
        acc.add_fold(&table(2, &["a"], &[Some(1.0)], &[0.1], &["chr9"]))?;
        let df = acc.finish()?;

        let chr = df.column("chr")?.as_materialized_series().str()?.get(0).map(str::to_string);
        assert_eq!(chr.as_deref(), Some("chr7"));
        Ok(())
    }

    #[test]
    fn output_sorted_by_rank_descending() -> anyhow::Result<()> {
        let mut acc = ScoreAccumulator::new(ScoreSchema::default());
        acc.add_fold(&table(
            0,
            &["low", "high", "mid"],
            &[Some(0.1), Some(0.2), Some(0.3)],
            &[0.1, 0.9, 0.5],
            &["chr1", "chr1", "chr1"],
        ))?;
        let df = acc.finish()?;
        let ids = df
            .column("variant_id")?
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect_vec();
        assert_eq!(ids, vec!["high", "mid", "low"]);
        Ok(())
    }

    fn frame_table(
        fold: usize,
        df: DataFrame,
    ) -> FoldTable {
        FoldTable::try_new(fold, df, &ScoreSchema::default()).unwrap()
    }

    #[test]
    fn metadata_row_comes_from_a_single_fold() -> anyhow::Result<()> {
        let mut acc = ScoreAccumulator::new(ScoreSchema::default());
        acc.add_fold(&frame_table(
            2,
            df!(
                "variant_id" => ["a"],
                "chr" => [Some("chr2")],
                "allele1" => [Some("T")],
                "logfc" => [1.0],
            )?,
        ))?;
        acc.add_fold(&frame_table(
            0,
            df!(
                "variant_id" => ["a"],
                "chr" => [None::<&str>],
                "allele1" => [Some("C")],
                "logfc" => [3.0],
            )?,
        ))?;
        let df = acc.finish()?;

        let chr = df.column("chr")?.as_materialized_series().str()?.get(0);
        let allele = df.column("allele1")?.as_materialized_series().str()?.get(0);
        assert_eq!(chr, None);
        assert_eq!(allele, Some("C"));
        Ok(())
    }

    #[test]
    fn empty_text_column_takes_role_from_later_fold() -> anyhow::Result<()> {
        let mut acc = ScoreAccumulator::new(ScoreSchema::default());
        acc.add_fold(&frame_table(
            0,
            df!(
                "variant_id" => ["a", "b"],
                "jsd" => [None::<&str>, None],
                "note" => [None::<&str>, None],
            )?,
        ))?;
        acc.add_fold(&frame_table(
            1,
            df!(
                "variant_id" => ["a", "b"],
                "jsd" => [0.2, 0.4],
                "note" => [None::<&str>, None],
            )?,
        ))?;
        let df = acc.finish()?;

        assert_eq!(df.column("jsd")?.dtype(), &DataType::Float64);
        assert_approx_eq!(f64_at(&df, "jsd", "a").unwrap(), 0.2);
        assert_approx_eq!(f64_at(&df, "jsd", "b").unwrap(), 0.4);
        // never held a value anywhere, still carried through
        assert_eq!(df.column("note")?.null_count(), 2);
        Ok(())
    }
}
