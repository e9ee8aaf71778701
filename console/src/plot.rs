use std::path::PathBuf;

use clap::Args;
use console::style;
use indicatif::ProgressBar;
use varensemble::config::EnsembleConfig;
use varensemble::io::{read_variant_list, FoldTensorReader};
use varensemble::pipeline::run_plot_pipeline;

use crate::utils::{init_pbar, UtilsArgs};

#[derive(Args, Debug, Clone)]
pub(crate) struct PlotArgs {
    #[arg(short, long = "snp-file", help = "Headerless TSV: chr, pos, ref, alt, variant id.")]
    snp_file:           PathBuf,
    #[arg(short = 'd', long = "base-dir", help = "Directory holding the fold prediction and attribution files.")]
    base_dir:           PathBuf,
    #[arg(short, long, help = "Run label shown in figure titles.")]
    cluster:            String,
    #[arg(short, long = "output-dir", help = "Directory for the figures.")]
    output_dir:         PathBuf,
    #[arg(long, help = "Render workers. [default: 20]")]
    threads:            Option<usize>,
    #[arg(long, help = "Positions shown on each side of the variant. [default: 150]")]
    half_window:        Option<usize>,
    #[arg(long, help = "Variant position in the predicted profiles. [default: 500]")]
    signal_center:      Option<usize>,
    #[arg(long, help = "Variant position in the attribution tracks. [default: 1057]")]
    attribution_center: Option<usize>,
    #[arg(long, help = "Number of folds to look for. [default: 5]")]
    folds:              Option<usize>,
}

#[cfg(feature = "hdf5")]
fn tensor_reader() -> anyhow::Result<Box<dyn FoldTensorReader>> {
    Ok(Box::new(varensemble::io::Hdf5FoldReader))
}

#[cfg(not(feature = "hdf5"))]
fn tensor_reader() -> anyhow::Result<Box<dyn FoldTensorReader>> {
    anyhow::bail!("reading fold tensors needs HDF5 support; rebuild with `--features hdf5`")
}

impl PlotArgs {
    fn apply(
        &self,
        mut config: EnsembleConfig,
    ) -> EnsembleConfig {
        if let Some(value) = self.threads {
            config.workers = value;
        }
        if let Some(value) = self.half_window {
            config.window.half_window = value;
        }
        if let Some(value) = self.signal_center {
            config.window.signal_center = value;
        }
        if let Some(value) = self.attribution_center {
            config.window.attribution_center = value;
        }
        if let Some(value) = self.folds {
            config.layout.n_folds = value;
        }
        config
    }

    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let config = self.apply(utils.load_config()?);
        let reader = tensor_reader()?;
        let variants = read_variant_list(&self.snp_file)?;

        let progress_bar = if utils.progress() {
            init_pbar(variants.len())?
        }
        else {
            ProgressBar::hidden()
        };

        let report = run_plot_pipeline(
            &config,
            reader.as_ref(),
            &variants,
            &self.base_dir,
            &self.cluster,
            &self.output_dir,
            |_| progress_bar.inc(1),
        )?;
        progress_bar.finish_and_clear();

        println!(
            "[{}] Rendered {} of {} variants into {}",
            style("V").green(),
            style(report.rendered.len()).green(),
            variants.len(),
            self.output_dir.display()
        );
        for failure in report.failed.iter() {
            eprintln!(
                "[{}] {}: {}",
                style("X").red(),
                style(&failure.variant_id).red(),
                failure.error
            );
        }
        Ok(())
    }
}
