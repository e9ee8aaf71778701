//! Analytical tools of both pipelines.
//!
//! - [`scores`]: cross-fold score aggregation and significance filtering.
//! - [`tensors`]: cross-fold aggregation of predicted signal and attribution
//!   tensors.
//! - [`window`]: per-variant windowing and shared y-axis scaling.
//! - [`render`]: three-panel comparative figure for one variant.
//! - [`batch`]: bounded, failure-isolated rendering of many variants.

pub mod batch;
pub mod render;
pub mod scores;
pub mod tensors;
pub mod window;
