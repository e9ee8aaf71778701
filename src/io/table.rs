use std::fs::File;
use std::path::Path;

use anyhow::Context;
use log::{
    debug,
    warn,
};
use polars::prelude::*;

use crate::error::EnsembleError;
use crate::io::FoldLayout;
use crate::tools::scores::ScoreSchema;
use crate::utils::is_numeric_dtype;

/// One fold's variant score table.
///
/// The key column is guaranteed to exist and to be of string type.
#[derive(Debug, Clone)]
pub struct FoldTable {
    fold: usize,
    data: DataFrame,
}

impl FoldTable {
    /// Wraps a frame, validating and normalising its key column.
    ///
    /// Declared metric columns are cast to `Float64`; values that do not
    /// parse become null. A metric column left empty in one fold is then
    /// still numeric, rather than inferred as text.
    pub fn try_new(
        fold: usize,
        data: DataFrame,
        schema: &ScoreSchema,
    ) -> Result<Self, EnsembleError> {
        let key = data.column(&schema.id_col).map_err(|_| {
            EnsembleError::malformed(
                fold,
                format!("missing key column '{}'", schema.id_col),
            )
        })?;

        let mut casts = Vec::new();
        if key.dtype() != &DataType::String {
            casts.push((schema.id_col.as_str(), DataType::String));
        }
        for name in schema.metric_cols() {
            match data.column(name) {
                Ok(c) if c.dtype() != &DataType::Float64 => {
                    casts.push((name, DataType::Float64))
                },
                _ => {},
            }
        }

        let mut data = data;
        for (name, dtype) in casts {
            let cast = data
                .column(name)
                .and_then(|c| c.cast(&dtype))
                .map_err(|e| EnsembleError::malformed(fold, e.to_string()))?;
            data.with_column(cast)
                .map_err(|e| EnsembleError::malformed(fold, e.to_string()))?;
        }
        Ok(Self { fold, data })
    }

    pub fn fold(&self) -> usize {
        self.fold
    }

    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    /// Columns averaged across folds: numeric, neither the key nor a declared
    /// metadata column.
    pub fn numeric_columns(
        &self,
        schema: &ScoreSchema,
    ) -> Vec<String> {
        self.data
            .get_columns()
            .iter()
            .filter(|c| {
                is_numeric_dtype(c.dtype()) && !schema.is_reserved(c.name().as_str())
            })
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Columns carried through unchanged: declared metadata plus every
    /// non-numeric column except the key, excluding undecided columns.
    pub fn metadata_columns(
        &self,
        schema: &ScoreSchema,
    ) -> Vec<String> {
        self.data
            .get_columns()
            .iter()
            .filter(|c| {
                let name = c.name().as_str();
                name != schema.id_col
                    && (schema.is_metadata(name)
                        || (!is_numeric_dtype(c.dtype()) && !is_all_null(c)))
            })
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Non-numeric, undeclared columns holding no value at all. Their dtype
    /// says nothing about their role, which is left to later folds.
    pub fn undecided_columns(
        &self,
        schema: &ScoreSchema,
    ) -> Vec<String> {
        self.data
            .get_columns()
            .iter()
            .filter(|c| {
                !is_numeric_dtype(c.dtype())
                    && is_all_null(c)
                    && !schema.is_reserved(c.name().as_str())
            })
            .map(|c| c.name().to_string())
            .collect()
    }
}

fn is_all_null(column: &Column) -> bool {
    column.null_count() == column.len()
}

/// Reads the score table of `fold`.
///
/// A missing file yields [`EnsembleError::MissingInput`]; an unreadable file
/// or one without the key column yields [`EnsembleError::MalformedInput`].
/// Both are recoverable and only exclude this fold.
pub fn load_fold_table(
    layout: &FoldLayout,
    base_dir: &Path,
    fold: usize,
    schema: &ScoreSchema,
) -> Result<FoldTable, EnsembleError> {
    let path = layout.scores_path(base_dir, fold);
    if !path.is_file() {
        return Err(EnsembleError::MissingInput { fold, path });
    }

    let data = read_tsv(&path).map_err(|e| EnsembleError::malformed(fold, e.to_string()))?;
    debug!(
        "Read fold {} table {}: {} rows, {} columns",
        fold,
        path.display(),
        data.height(),
        data.width()
    );

    let table = FoldTable::try_new(fold, data, schema)?;
    if table.height() == 0 {
        warn!("Fold {} table {} has no rows", fold, path.display());
    }
    Ok(table)
}

/// Reads a tab-separated table with a header line.
pub fn read_tsv(path: &Path) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .map_parse_options(|opts| opts.with_separator(b'\t'))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
}

/// Writes a frame as a tab-separated table with a header line.
pub fn write_tsv(
    df: &mut DataFrame,
    path: &Path,
) -> anyhow::Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("creating output table {}", path.display()))?;
    CsvWriter::new(&mut file)
        .with_separator(b'\t')
        .include_header(true)
        .finish(df)
        .with_context(|| format!("writing output table {}", path.display()))?;
    Ok(())
}
