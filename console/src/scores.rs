use std::path::PathBuf;

use clap::Args;
use console::style;
use varensemble::config::EnsembleConfig;
use varensemble::pipeline::{run_score_pipeline, FilterSummary};

use crate::utils::UtilsArgs;

#[derive(Args, Debug, Clone)]
pub(crate) struct ScoresArgs {
    #[arg(short = 'd', long = "base-dir", help = "Directory holding fold_{k}.variant_scores.tsv files.")]
    base_dir:   PathBuf,
    #[arg(short, long, help = "Run label, prefixed to the output file names.")]
    cluster:    String,
    #[arg(short, long = "output-dir", help = "Directory for the output tables.")]
    output_dir: PathBuf,
    #[arg(long, help = "Minimum absolute effect (exclusive). [default: 0.25]")]
    min_effect: Option<f64>,
    #[arg(long, help = "Maximum combined p-value (exclusive). [default: 0.05]")]
    max_pvalue: Option<f64>,
    #[arg(long, help = "Number of folds to look for. [default: 5]")]
    folds:      Option<usize>,
}

impl ScoresArgs {
    fn apply(
        &self,
        mut config: EnsembleConfig,
    ) -> EnsembleConfig {
        if let Some(value) = self.min_effect {
            config.thresholds.min_effect = value;
        }
        if let Some(value) = self.max_pvalue {
            config.thresholds.max_pvalue = value;
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
        let summary = run_score_pipeline(&config, &self.base_dir, &self.cluster, &self.output_dir)?;

        println!(
            "[{}] Loaded {} of {} folds",
            style("V").green(),
            style(summary.folds_loaded.len()).green(),
            config.layout.n_folds
        );
        for skip in summary.folds_skipped.iter() {
            eprintln!("[{}] {}", style("!").yellow(), skip.reason);
        }
        println!(
            "[{}] {} variants written to {}",
            style("V").green(),
            style(summary.n_rows).green(),
            summary.scores_path.display()
        );
        match &summary.filter {
            FilterSummary::Hits {
                count,
                percentage,
                path,
            } => {
                println!(
                    "[{}] {} significant hits ({:.2}%) written to {}",
                    style("V").green(),
                    style(count).green(),
                    percentage,
                    path.display()
                );
            },
            FilterSummary::Skipped { missing } => {
                eprintln!(
                    "[{}] Significance filtering skipped, missing columns: {}",
                    style("!").yellow(),
                    style(missing.join(", ")).red()
                );
            },
        }
        Ok(())
    }
}
