pub use crate::config::EnsembleConfig;
pub use crate::data_structs::{
    AggregatedTensors,
    Allele,
    FoldTensors,
    VariantList,
    VariantRecord,
};
pub use crate::error::EnsembleError;
#[cfg(feature = "hdf5")]
pub use crate::io::Hdf5FoldReader;
pub use crate::io::{
    load_fold_table,
    load_fold_tensors,
    read_variant_list,
    write_tsv,
    FoldLayout,
    FoldTable,
    FoldTensorReader,
};
pub use crate::pipeline::{
    run_plot_pipeline,
    run_score_pipeline,
    FilterSummary,
    FoldSkip,
    ScoreRunSummary,
};
pub use crate::tools::batch::{
    BatchReport,
    BatchScheduler,
    RenderFailure,
    TaskResult,
    DEFAULT_RENDER_WORKERS,
};
pub use crate::tools::render::{
    RenderConfig,
    VariantRenderer,
};
pub use crate::tools::scores::{
    FilterOutcome,
    ScoreAccumulator,
    ScoreSchema,
    SignificanceFilter,
    SignificanceThresholds,
    SignificantHits,
};
pub use crate::tools::tensors::{
    count_scaled_softmax,
    TensorAccumulator,
};
pub use crate::tools::window::{
    extract_window,
    VariantWindow,
    WindowSpec,
    YRange,
};
