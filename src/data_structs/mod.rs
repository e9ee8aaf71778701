//! Core data structures shared by both pipelines.
//!
//! - [`VariantRecord`] / [`VariantList`]: the canonical, positionally ordered
//!   variant list that tensor rows are aligned to.
//! - [`Allele`]: reference/alternate tag used to partition tensors.
//! - [`FoldTensors`]: the raw arrays read for one fold.
//! - [`AggregatedTensors`]: fold-mean signal and attribution per allele.

mod tensors;
mod variant;

pub use tensors::{
    AggregatedTensors,
    Allele,
    AttributionTensor,
    FoldTensors,
    SignalTensor,
    N_BASES,
};
pub use variant::{
    VariantList,
    VariantRecord,
};
