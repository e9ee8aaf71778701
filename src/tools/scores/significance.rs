use log::{
    info,
    warn,
};
use polars::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};

use super::accumulator::sort_by_rank;
use crate::error::EnsembleError;
use crate::tools::scores::ScoreSchema;
use crate::utils::is_numeric_dtype;
use crate::with_field_fn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceThresholds {
    /// Rows need an absolute effect strictly above this value.
    pub min_effect: f64,
    /// Rows need a combined p-value strictly below this value.
    pub max_pvalue: f64,
}

impl SignificanceThresholds {
    with_field_fn!(min_effect, f64);
    with_field_fn!(max_pvalue, f64);
}

impl Default for SignificanceThresholds {
    fn default() -> Self {
        Self {
            min_effect: 0.25,
            max_pvalue: 0.05,
        }
    }
}

/// Rows of an ensemble table that passed both thresholds.
#[derive(Debug, Clone)]
pub struct SignificantHits {
    pub data:  DataFrame,
    /// Height of the table the hits were selected from.
    pub total: usize,
}

impl SignificantHits {
    pub fn count(&self) -> usize {
        self.data.height()
    }

    /// Share of rows retained, in percent. Zero for an empty input table.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        }
        else {
            100.0 * self.count() as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone)]
pub enum FilterOutcome {
    Filtered(SignificantHits),
    /// Required columns are absent or not numeric; no filtering happened. This is distinct
    /// from a filter that ran and found no hits.
    InsufficientColumns(Vec<String>),
}

impl FilterOutcome {
    pub fn hits(&self) -> Option<&SignificantHits> {
        match self {
            FilterOutcome::Filtered(hits) => Some(hits),
            FilterOutcome::InsufficientColumns(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<EnsembleError> {
        match self {
            FilterOutcome::Filtered(_) => None,
            FilterOutcome::InsufficientColumns(missing) => {
                Some(EnsembleError::InsufficientSchema {
                    missing: missing.clone(),
                })
            },
        }
    }
}

/// Dual-threshold filter over an ensemble table:
/// `abs_effect > min_effect AND pvalue < max_pvalue`.
#[derive(Debug, Clone)]
pub struct SignificanceFilter {
    schema:     ScoreSchema,
    thresholds: SignificanceThresholds,
}

impl SignificanceFilter {
    pub fn new(
        schema: ScoreSchema,
        thresholds: SignificanceThresholds,
    ) -> Self {
        Self { schema, thresholds }
    }

    pub fn thresholds(&self) -> &SignificanceThresholds {
        &self.thresholds
    }

    /// Selects the significant rows, re-sorted by the ranking column.
    ///
    /// Rows with a null effect or p-value never pass.
    pub fn apply(
        &self,
        table: &DataFrame,
    ) -> anyhow::Result<FilterOutcome> {
        let missing = [&self.schema.abs_effect_col, &self.schema.pvalue_col]
            .into_iter()
            .filter(|name| {
                table
                    .column(name)
                    .map_or(true, |c| !is_numeric_dtype(c.dtype()))
            })
            .cloned()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            warn!(
                "Significance filtering skipped, missing or non-numeric columns: {}",
                missing.join(", ")
            );
            return Ok(FilterOutcome::InsufficientColumns(missing));
        }

        let predicate = col(self.schema.abs_effect_col.as_str())
            .gt(lit(self.thresholds.min_effect))
            .and(col(self.schema.pvalue_col.as_str()).lt(lit(self.thresholds.max_pvalue)));
        let data = table.clone().lazy().filter(predicate).collect()?;
        let data = sort_by_rank(data, &self.schema.rank_col)?;

        let hits = SignificantHits {
            data,
            total: table.height(),
        };
        info!(
            "Significant hits ({} > {}, {} < {}): {} of {} ({:.2}%)",
            self.schema.abs_effect_col,
            self.thresholds.min_effect,
            self.schema.pvalue_col,
            self.thresholds.max_pvalue,
            hits.count(),
            hits.total,
            hits.percentage()
        );
        Ok(FilterOutcome::Filtered(hits))
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rstest::*;

    use super::*;

    #[fixture]
    fn table() -> DataFrame {
        df!(
            "variant_id" => ["a", "b", "c", "d", "e"],
            "abs_logfc" => [Some(0.9), Some(0.3), Some(0.1), Some(0.5), None],
            "abs_logfc_x_jsd.pval" => [Some(0.01), Some(0.04), Some(0.001), Some(0.2), Some(0.0)],
            "abs_logfc_x_jsd" => [0.2, 0.8, 0.9, 0.5, 1.0],
        )
        .unwrap()
    }

    fn ids(df: &DataFrame) -> Vec<String> {
        df.column("variant_id")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect_vec()
    }

    #[rstest]
    fn selects_rows_passing_both(table: DataFrame) -> anyhow::Result<()> {
        let filter =
            SignificanceFilter::new(ScoreSchema::default(), SignificanceThresholds::default());
        let outcome = filter.apply(&table)?;
        let hits = outcome.hits().unwrap();

        // b ranks above a on abs_logfc_x_jsd
        assert_eq!(ids(&hits.data), vec!["b", "a"]);
        assert_eq!(hits.total, 5);
        assert!((hits.percentage() - 40.0).abs() < 1e-9);
        Ok(())
    }

    #[rstest]
    #[case::zero_pvalue(SignificanceThresholds::default().with_max_pvalue(0.0))]
    #[case::effect_above_max(SignificanceThresholds::default().with_min_effect(0.9))]
    fn extreme_thresholds_select_nothing(
        table: DataFrame,
        #[case] thresholds: SignificanceThresholds,
    ) -> anyhow::Result<()> {
        let filter = SignificanceFilter::new(ScoreSchema::default(), thresholds);
        let outcome = filter.apply(&table)?;
        let hits = outcome.hits().unwrap();
        assert_eq!(hits.count(), 0);
        assert_eq!(hits.percentage(), 0.0);
        Ok(())
    }

    #[rstest]
    fn missing_columns_skip_filtering(table: DataFrame) -> anyhow::Result<()> {
        let table = table.drop("abs_logfc_x_jsd.pval")?;
        let filter =
            SignificanceFilter::new(ScoreSchema::default(), SignificanceThresholds::default());
        let outcome = filter.apply(&table)?;

        assert!(outcome.hits().is_none());
        match outcome.as_error() {
            Some(EnsembleError::InsufficientSchema { missing }) => {
                assert_eq!(missing, vec!["abs_logfc_x_jsd.pval".to_string()])
            },
            other => panic!("unexpected outcome {other:?}"),
        }
        Ok(())
    }

    #[rstest]
    fn text_pvalue_column_skips_filtering(table: DataFrame) -> anyhow::Result<()> {
        let mut table = table;
        table.with_column(Column::new(
            "abs_logfc_x_jsd.pval".into(),
            [None::<&str>, None, None, None, None],
        ))?;
        let filter =
            SignificanceFilter::new(ScoreSchema::default(), SignificanceThresholds::default());

        match filter.apply(&table)? {
            FilterOutcome::InsufficientColumns(missing) => {
                assert_eq!(missing, vec!["abs_logfc_x_jsd.pval".to_string()])
            },
            FilterOutcome::Filtered(_) => panic!("text p-values must not be filtered"),
        }
        Ok(())
    }
}
