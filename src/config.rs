//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration. `CARBON_POLICY_DATA_DIR` overrides `paths.data_dir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analytics::correlation::{lag_profile, YearSeries};
use crate::analytics::forecast::{forecast_policy_impact, Forecast, ForecastInput, DEFAULT_BASE_YEAR};
use crate::analytics::trend::{pre_post_comparison, rolling_series, PrePostComparison};
use crate::analytics::{StatOutcome, MIN_CORRELATION_PAIRS, MIN_TTEST_SAMPLES};
use crate::error::Result;
use crate::estimator::{Estimator, DEFAULT_DECIMALS};
use crate::instrument::InstrumentKeywords;
use crate::node::{NodeSizeBounds, SectorLookup};

pub const DATA_DIR_ENV: &str = "CARBON_POLICY_DATA_DIR";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub estimator: EstimatorConfig,
    pub nodes: NodesConfig,
    pub analytics: AnalyticsConfig,
    pub sectors: SectorLookup,
    pub instruments: InstrumentKeywords,
    pub logging: LoggingConfig,
}

/// File locations. Relative file names resolve against `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub activity_table: PathBuf,
    pub country_factors: PathBuf,
    pub node_store: PathBuf,
    pub policy_metadata: PathBuf,
    pub policy_vectors: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            activity_table: PathBuf::from("activity_emission_factor.csv"),
            country_factors: PathBuf::from("country_composite_factor.csv"),
            node_store: PathBuf::from("policy_nodes.json"),
            policy_metadata: PathBuf::from("gen_info.csv"),
            policy_vectors: PathBuf::from("policy_vectors.csv"),
        }
    }
}

impl PathsConfig {
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    pub fn activity_table(&self) -> PathBuf {
        self.resolve(&self.activity_table)
    }

    pub fn country_factors(&self) -> PathBuf {
        self.resolve(&self.country_factors)
    }

    pub fn node_store(&self) -> PathBuf {
        self.resolve(&self.node_store)
    }

    pub fn policy_metadata(&self) -> PathBuf {
        self.resolve(&self.policy_metadata)
    }

    pub fn policy_vectors(&self) -> PathBuf {
        self.resolve(&self.policy_vectors)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Decimal places of the impact estimate.
    pub decimals: u32,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            decimals: DEFAULT_DECIMALS,
        }
    }
}

impl EstimatorConfig {
    pub fn estimator(&self) -> Estimator {
        Estimator::new(self.decimals)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodesConfig {
    pub size: NodeSizeBounds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub min_correlation_pairs: usize,
    pub min_ttest_samples: usize,
    pub max_lag_years: i64,
    pub rolling_window: usize,
    pub forecast_base_year: i32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            min_correlation_pairs: MIN_CORRELATION_PAIRS,
            min_ttest_samples: MIN_TTEST_SAMPLES,
            max_lag_years: 10,
            rolling_window: 5,
            forecast_base_year: DEFAULT_BASE_YEAR,
        }
    }
}

impl AnalyticsConfig {
    /// Pre/post adoption comparison with the configured t-test minimum.
    pub fn pre_post(&self, series: &YearSeries, adoption_year: i64) -> StatOutcome<PrePostComparison> {
        pre_post_comparison(series, adoption_year, self.min_ttest_samples)
    }

    pub fn rolling(&self, series: &YearSeries) -> YearSeries {
        rolling_series(series, self.rolling_window)
    }

    /// Correlation at every lag up to `max_lag_years`.
    pub fn lag_profile(&self, first: &YearSeries, second: &YearSeries) -> Vec<(i64, StatOutcome<f64>)> {
        lag_profile(first, second, self.max_lag_years, self.min_correlation_pairs)
    }

    /// Forecast starting at `forecast_base_year`.
    pub fn forecast(&self, input: &ForecastInput) -> Forecast {
        forecast_policy_impact(input, self.forecast_base_year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `"pretty"` or `"json"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load `path` if it exists, otherwise start from defaults. The data
    /// directory environment override is applied either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let contents = std::fs::read_to_string(p)?;
                let config = Self::from_toml_str(&contents)?;
                tracing::debug!(path = %p.display(), "Loaded configuration");
                config
            }
            Some(p) => {
                tracing::debug!(path = %p.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env_overrides(std::env::var(DATA_DIR_ENV).ok().as_deref());
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, data_dir: Option<&str>) {
        if let Some(dir) = data_dir.map(str::trim).filter(|d| !d.is_empty()) {
            self.paths.data_dir = PathBuf::from(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [estimator]
            decimals = 0

            [nodes.size]
            max = 250.0

            [sectors.departments]
            Transport = "Department for Transport"

            [instruments]
            ets = ["cap-and-trade"]
            "#,
        )
        .unwrap();

        assert_eq!(config.estimator.decimals, 0);
        assert_eq!(config.nodes.size, NodeSizeBounds { min: 10.0, max: 250.0 });
        assert_eq!(config.sectors.department("Transport"), "Department for Transport");
        // A configured table replaces the built-in one.
        assert_eq!(config.sectors.department("Cement"), "General");
        assert_eq!(config.sectors.beneficiary("Cement"), "Cement Companies");
        assert_eq!(config.instruments.ets, vec!["cap-and-trade"]);
        assert_eq!(config.instruments.tax, vec!["tax"]);
        assert_eq!(config.analytics.min_correlation_pairs, 5);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::from_toml_str("[estimator\ndecimals = 2").unwrap_err();
        assert!(matches!(err, crate::error::PolicyError::Config(_)));
    }

    #[test]
    fn data_dir_override_moves_relative_paths() {
        let mut config = Config::default();
        config.apply_env_overrides(Some("/srv/climate"));
        assert_eq!(
            config.paths.node_store(),
            PathBuf::from("/srv/climate/policy_nodes.json")
        );
        config.apply_env_overrides(Some("  "));
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/climate"));
    }

    fn turning_series() -> YearSeries {
        [10.0, 11.0, 12.0, 13.0, 12.0, 11.0, 10.0, 9.0]
            .iter()
            .enumerate()
            .map(|(i, v)| (2000 + i as i64, *v))
            .collect()
    }

    #[test]
    fn ttest_minimum_comes_from_config() {
        let series = turning_series();
        let defaults = AnalyticsConfig::default();
        assert!(defaults.pre_post(&series, 2004).value().unwrap().t_test.is_value());

        let strict = Config::from_toml_str("[analytics]\nmin_ttest_samples = 5").unwrap();
        let cmp = strict.analytics.pre_post(&series, 2004).value().unwrap();
        assert_eq!(
            cmp.t_test,
            StatOutcome::InsufficientData { required: 5, available: 4 }
        );
    }

    #[test]
    fn rolling_window_comes_from_config() {
        let series = turning_series();
        // The default window of 5 at 2004 averages 2000..=2004.
        assert_eq!(AnalyticsConfig::default().rolling(&series).get(&2004), Some(&11.6));

        let narrow = Config::from_toml_str("[analytics]\nrolling_window = 2").unwrap();
        assert_eq!(narrow.analytics.rolling(&series).get(&2004), Some(&12.5));
    }

    #[test]
    fn forecast_and_lag_settings_come_from_config() {
        let config = Config::from_toml_str(
            "[analytics]\nforecast_base_year = 2030\nmax_lag_years = 2",
        )
        .unwrap();
        let input = ForecastInput {
            initial_emissions: 10.0,
            instrument: crate::instrument::PolicyInstrument::Tax,
            price_signal: 100.0,
            coverage_pct: 100.0,
            duration_years: 1,
            sectors_covered: 5,
        };
        let forecast = config.analytics.forecast(&input);
        assert_eq!(forecast.trajectory[0].0, 2030);
        assert_eq!(forecast.trajectory[1].0, 2031);
        assert_eq!(
            AnalyticsConfig::default().forecast(&input).trajectory[0].0,
            DEFAULT_BASE_YEAR
        );

        let series = turning_series();
        assert_eq!(config.analytics.lag_profile(&series, &series).len(), 3);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config.estimator, EstimatorConfig::default());
    }
}
