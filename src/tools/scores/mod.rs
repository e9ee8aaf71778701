//! Cross-fold aggregation of variant score tables.
//!
//! Fold tables are streamed into a [`ScoreAccumulator`], which keeps a
//! running sum and count per variant and numeric column (and a Welford
//! accumulator for the primary effect column). The finished ensemble table
//! is passed to a [`SignificanceFilter`].

mod accumulator;
mod significance;

pub use accumulator::ScoreAccumulator;
use serde::{
    Deserialize,
    Serialize,
};
pub use significance::{
    FilterOutcome,
    SignificanceFilter,
    SignificanceThresholds,
    SignificantHits,
};

use crate::with_field_fn;

/// Column names of the fold score tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreSchema {
    /// Variant identity, the join key across folds.
    pub id_col:         String,
    /// Primary effect column; the only one that also gets a std column.
    pub effect_col:     String,
    pub abs_effect_col: String,
    /// Ranking key of both output tables, sorted descending.
    pub rank_col:       String,
    /// Combined p-value used for significance filtering.
    pub pvalue_col:     String,
    /// Name of the output column holding the std of `effect_col`.
    pub effect_std_col: String,
    /// Columns never averaged even when numeric.
    pub metadata_cols:  Vec<String>,
}

impl ScoreSchema {
    with_field_fn!(id_col, String);
    with_field_fn!(effect_col, String);
    with_field_fn!(abs_effect_col, String);
    with_field_fn!(rank_col, String);
    with_field_fn!(pvalue_col, String);
    with_field_fn!(effect_std_col, String);
    with_field_fn!(metadata_cols, Vec<String>);

    pub fn is_metadata(
        &self,
        name: &str,
    ) -> bool {
        self.metadata_cols.iter().any(|c| c == name)
    }

    /// Columns always read as `Float64`.
    pub fn metric_cols(&self) -> [&str; 4] {
        [
            self.effect_col.as_str(),
            self.abs_effect_col.as_str(),
            self.rank_col.as_str(),
            self.pvalue_col.as_str(),
        ]
    }

    /// Key, declared metadata or the generated std column.
    pub fn is_reserved(
        &self,
        name: &str,
    ) -> bool {
        name == self.id_col || name == self.effect_std_col || self.is_metadata(name)
    }
}

impl Default for ScoreSchema {
    fn default() -> Self {
        Self {
            id_col:         "variant_id".into(),
            effect_col:     "logfc".into(),
            abs_effect_col: "abs_logfc".into(),
            rank_col:       "abs_logfc_x_jsd".into(),
            pvalue_col:     "abs_logfc_x_jsd.pval".into(),
            effect_std_col: "logfc_std".into(),
            metadata_cols:  ["chr", "pos", "allele1", "allele2"]
                .map(String::from)
                .to_vec(),
        }
    }
}
