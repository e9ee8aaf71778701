//! This module contains utility functions and helper macros used throughout
//! the varensemble crate.
//!
//! Key functionalities include:
//!
//! - Running (streaming) statistics: [`RunningMean`] for plain sum/count
//!   means and [`RunningStats`] for Welford mean/variance, both used to
//!   reduce across folds without materialising all fold values.
//! - Macros for common struct operations (getter functions, builder-style
//!   `with_*` methods).
//! - Classification of polars data types into aggregatable (numeric) and
//!   metadata columns.

mod stats;

use polars::prelude::DataType;
pub use stats::*;

#[macro_export]
macro_rules! getter_fn {
    ($field_name: ident, $field_type: ty) => {
        pub fn $field_name(&self) -> &$field_type {
            &self.$field_name
        }
    };
}
pub use getter_fn;

#[macro_export]
macro_rules! with_field_fn {
    ($field_name: ident, $field_type: ty) => {
        paste::paste! {
            pub fn [<with_$field_name>](mut self, value: $field_type) -> Self {
                self.$field_name = value;
                self
            }
        }
    };
}
pub use with_field_fn;

/// Whether a column of this dtype takes part in cross-fold averaging.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Replaces path separators so a variant identifier can serve as a file
/// stem.
pub fn sanitize_file_stem(id: &str) -> String {
    id.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_dtypes() {
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn file_stem() {
        assert_eq!(sanitize_file_stem("chr1:100:A/G"), "chr1:100:A_G");
        assert_eq!(sanitize_file_stem("rs123"), "rs123");
    }
}
