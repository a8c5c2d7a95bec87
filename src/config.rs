//! Analyzer configuration.
//!
//! Loaded from a TOML file; every field has a default so a missing file or a
//! partial file still yields a runnable configuration. CLI flags override
//! whatever the file provides.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub date_range: DateRangeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the partitioned tick store.
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,

    /// Where summary reports are written.
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("./data/market_data")
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./summary_stats")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            output_directory: default_output_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Neutral-zone half-width in percent: |deviation| below this counts as
    /// "closeable at break-even".
    #[serde(default = "default_zero_threshold")]
    pub zero_threshold: f64,

    /// Profitability thresholds in percent, scanned independently.
    #[serde(default = "default_thresholds")]
    pub thresholds: [f64; 3],
}

fn default_zero_threshold() -> f64 {
    0.05
}

fn default_thresholds() -> [f64; 3] {
    [0.3, 0.5, 0.4]
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            zero_threshold: default_zero_threshold(),
            thresholds: default_thresholds(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Compute-pool size. `None` derives it from the CPU count at runtime.
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Restrict the run to these exchanges. `None` analyzes everything.
    #[serde(default)]
    pub exchanges: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRangeConfig {
    /// Inclusive start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,

    /// Inclusive end date, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
}

impl AnalyzerConfig {
    /// Load from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path, or fall back to defaults when the default
    /// config file is absent.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let default_path = Path::new("ratioscan.toml");
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    tracing::debug!("no config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.analysis.zero_threshold > 0.0,
            "zero_threshold must be positive, got {}",
            self.analysis.zero_threshold
        );
        for &t in &self.analysis.thresholds {
            ensure!(t > 0.0, "thresholds must be positive, got {}", t);
            ensure!(
                t > self.analysis.zero_threshold,
                "threshold {} must exceed the neutral zone {}",
                t,
                self.analysis.zero_threshold
            );
        }
        if let Some(workers) = self.performance.workers {
            ensure!(workers > 0, "workers must be positive");
        }
        Ok(())
    }
}
