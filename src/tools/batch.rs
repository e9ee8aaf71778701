//! Fan-out of the renderer over a variant list.
//!
//! Every variant is an independent task on a bounded rayon pool. Tasks only
//! read the aggregated tensors; each returns its own result, so a failing
//! variant (out-of-bounds window, drawing error, even a panic) is recorded
//! and the rest of the batch carries on.

use std::any::Any;
use std::panic::{
    catch_unwind,
    AssertUnwindSafe,
};
use std::path::{
    Path,
    PathBuf,
};

use log::{
    debug,
    error,
    info,
};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::data_structs::{
    AggregatedTensors,
    VariantList,
    VariantRecord,
};
use crate::error::EnsembleError;
use crate::tools::render::VariantRenderer;
use crate::tools::window::{
    extract_window,
    WindowSpec,
};

/// Default width of the render pool.
pub const DEFAULT_RENDER_WORKERS: usize = 20;

#[derive(Debug)]
pub struct RenderFailure {
    pub variant_id: String,
    pub error:      EnsembleError,
}

pub type TaskResult = Result<PathBuf, RenderFailure>;

/// Outcome of a batch. Artifacts are keyed by variant id, so the order of
/// `rendered` carries no meaning.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rendered: Vec<PathBuf>,
    pub failed:   Vec<RenderFailure>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.rendered.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl FromIterator<TaskResult> for BatchReport {
    fn from_iter<T: IntoIterator<Item = TaskResult>>(iter: T) -> Self {
        let mut report = BatchReport::default();
        for result in iter {
            match result {
                Ok(path) => report.rendered.push(path),
                Err(failure) => report.failed.push(failure),
            }
        }
        report
    }
}

#[derive(Debug, Clone)]
pub struct BatchScheduler {
    workers:  usize,
    window:   WindowSpec,
    renderer: VariantRenderer,
}

impl BatchScheduler {
    pub fn new(
        workers: usize,
        window: WindowSpec,
        renderer: VariantRenderer,
    ) -> Self {
        Self {
            workers: workers.max(1),
            window,
            renderer,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Renders row `i` of `tensors` for `variants[i]`, for every variant.
    ///
    /// `inspect` is called once per finished task, from the worker thread
    /// that ran it.
    pub fn run<F>(
        &self,
        variants: &VariantList,
        tensors: &AggregatedTensors,
        cluster: &str,
        out_dir: &Path,
        inspect: F,
    ) -> anyhow::Result<BatchReport>
    where
        F: Fn(&TaskResult) + Sync + Send, {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("render-{i}"))
            .build()?;
        debug!(
            "Rendering {} variants on {} workers",
            variants.len(),
            self.workers
        );

        let report: BatchReport = pool.install(|| {
            variants
                .records()
                .par_iter()
                .enumerate()
                .map(|(row, record)| {
                    let result = self.render_one(row, record, tensors, cluster, out_dir);
                    if let Err(failure) = &result {
                        error!("{}", failure.error);
                    }
                    inspect(&result);
                    result
                })
                .collect::<Vec<_>>()
                .into_iter()
                .collect()
        });

        info!(
            "Rendered {} of {} variants ({} failed)",
            report.rendered.len(),
            report.total(),
            report.failed.len()
        );
        Ok(report)
    }

    fn render_one(
        &self,
        row: usize,
        record: &VariantRecord,
        tensors: &AggregatedTensors,
        cluster: &str,
        out_dir: &Path,
    ) -> TaskResult {
        let task = || -> Result<PathBuf, EnsembleError> {
            let window = extract_window(tensors, row, &self.window, &record.variant_id)?;
            self.renderer.render(record, &window, cluster, out_dir)
        };

        catch_unwind(AssertUnwindSafe(task))
            .unwrap_or_else(|payload| {
                Err(EnsembleError::Render {
                    variant_id: record.variant_id.clone(),
                    reason:     format!("panicked: {}", panic_message(&*payload)),
                })
            })
            .map_err(|error| RenderFailure {
                variant_id: record.variant_id.clone(),
                error,
            })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    }
    else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    }
    else {
        "unknown cause"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{
        AtomicUsize,
        Ordering,
    };

    use ndarray::{
        Array2,
        Array3,
    };

    use super::*;
    use crate::tools::render::RenderConfig;

    fn tensors(n: usize) -> AggregatedTensors {
        let signal = Array2::from_shape_fn((n, 60), |(r, p)| (r + p) as f32);
        let attribution = Array3::from_shape_fn((n, 60, 4), |(r, p, b)| {
            ((r + p + b) % 7) as f32 * 0.01 - 0.03
        });
        AggregatedTensors::new(signal.clone(), signal, attribution.clone(), attribution, 2)
    }

    fn scheduler(half_window: usize) -> BatchScheduler {
        let window = WindowSpec::default()
            .with_signal_center(30)
            .with_attribution_center(30)
            .with_half_window(half_window);
        let renderer =
            VariantRenderer::new(RenderConfig::default().with_width(400).with_height(300));
        BatchScheduler::new(3, window, renderer)
    }

    fn variants(n: usize) -> VariantList {
        (0..n)
            .map(|i| VariantRecord::new("chr2", 1000 + i as u64, "C", "T", format!("rs{i}")))
            .collect()
    }

    #[test]
    fn rows_past_tensors_fail_individually() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let seen = AtomicUsize::new(0);
        let report = scheduler(10).run(&variants(6), &tensors(4), "astro", dir.path(), |_| {
            seen.fetch_add(1, Ordering::Relaxed);
        })?;

        assert_eq!(report.rendered.len(), 4);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(seen.load(Ordering::Relaxed), 6);
        let mut failed = report
            .failed
            .iter()
            .map(|f| f.variant_id.as_str())
            .collect::<Vec<_>>();
        failed.sort();
        assert_eq!(failed, vec!["rs4", "rs5"]);
        assert!(report
            .failed
            .iter()
            .all(|f| matches!(f.error, EnsembleError::Window { .. })));
        assert!(dir.path().join("rs3.svg").is_file());
        assert!(!dir.path().join("rs4.svg").exists());
        Ok(())
    }

    #[test]
    fn window_out_of_bounds_fails_every_task() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let report = scheduler(40).run(&variants(3), &tensors(3), "astro", dir.path(), |_| {})?;
        assert!(report.rendered.is_empty());
        assert_eq!(report.failed.len(), 3);
        assert!(!report.is_complete());
        Ok(())
    }

    #[test]
    fn zero_workers_is_clamped() {
        assert_eq!(scheduler(10).workers(), 3);
        let s = BatchScheduler::new(0, WindowSpec::default(), VariantRenderer::default());
        assert_eq!(s.workers(), 1);
    }
}
