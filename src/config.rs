use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::{
    Deserialize,
    Serialize,
};

use crate::io::FoldLayout;
use crate::tools::batch::DEFAULT_RENDER_WORKERS;
use crate::tools::render::RenderConfig;
use crate::tools::scores::{
    ScoreSchema,
    SignificanceThresholds,
};
use crate::tools::window::WindowSpec;
use crate::with_field_fn;

/// All tunables of both pipelines.
///
/// Deserialisation accepts partial documents; absent fields keep their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub layout:     FoldLayout,
    pub schema:     ScoreSchema,
    pub thresholds: SignificanceThresholds,
    pub window:     WindowSpec,
    pub render:     RenderConfig,
    pub workers:    usize,
}

impl EnsembleConfig {
    with_field_fn!(layout, FoldLayout);
    with_field_fn!(schema, ScoreSchema);
    with_field_fn!(thresholds, SignificanceThresholds);
    with_field_fn!(window, WindowSpec);
    with_field_fn!(render, RenderConfig);
    with_field_fn!(workers, usize);

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("opening config {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            layout:     FoldLayout::default(),
            schema:     ScoreSchema::default(),
            thresholds: SignificanceThresholds::default(),
            window:     WindowSpec::default(),
            render:     RenderConfig::default(),
            workers:    DEFAULT_RENDER_WORKERS,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_json_keeps_defaults() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"thresholds": {{"min_effect": 0.5}}, "window": {{"half_window": 64}}, "workers": 4}}"#
        )?;

        let config = EnsembleConfig::from_json_file(file.path())?;
        assert_eq!(config.thresholds.min_effect, 0.5);
        assert_eq!(config.thresholds.max_pvalue, 0.05);
        assert_eq!(config.window.half_window, 64);
        assert_eq!(config.window.signal_center, 500);
        assert_eq!(config.workers, 4);
        assert_eq!(config.layout.n_folds, 5);
        assert_eq!(config.schema.id_col, "variant_id");
        Ok(())
    }

    #[test]
    fn rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(EnsembleConfig::from_json_file(file.path()).is_err());
    }
}
