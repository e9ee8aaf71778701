use std::path::PathBuf;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use varensemble::config::EnsembleConfig;

#[derive(Args, Debug, Clone)]
pub(crate) struct UtilsArgs {
    #[arg(
        long,
        help = "JSON configuration file. Explicit flags override its values."
    )]
    pub config: Option<PathBuf>,
    #[arg(short, long, default_value_t = false, help = "Verbose output.")]
    pub verbose: bool,
    #[arg(
        long = "no-progress",
        default_value_t = false,
        help = "Do not display the progress bar."
    )]
    pub no_progress: bool,
}

impl UtilsArgs {
    /// Initialises logging. `RUST_LOG`, when set, overrides the level chosen
    /// by `--verbose`.
    pub fn setup(&self) -> anyhow::Result<()> {
        let level = if self.verbose {
            LevelFilter::Debug
        }
        else {
            LevelFilter::Info
        };
        let mut builder = pretty_env_logger::formatted_builder();
        builder.filter_level(level);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
        builder.try_init()?;
        Ok(())
    }

    pub fn progress(&self) -> bool {
        !self.no_progress
    }

    pub fn load_config(&self) -> anyhow::Result<EnsembleConfig> {
        match &self.config {
            Some(path) => EnsembleConfig::from_json_file(path),
            None => Ok(EnsembleConfig::default()),
        }
    }
}

pub fn init_pbar(total: usize) -> anyhow::Result<ProgressBar> {
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}, ETA: {eta}] [{bar:40.cyan/blue}] {pos:>5.green}/{len:5} {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Rendering...");
    Ok(progress_bar)
}
