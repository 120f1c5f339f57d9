use crate::error::AppError;
use crate::pricing::PricingSchedule;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SERVICE_NAME: &str = "pricing-estimator";
pub const HOME_ENV: &str = "PRICING_ESTIMATOR_HOME";
/// Environment overrides look like `PRICING_ESTIMATOR__PRICING__CONSTANTS__MINIMUM_MONTHLY_FEE`.
pub const ENV_PREFIX: &str = "PRICING_ESTIMATOR";
const DEFAULT_LOG_LEVEL: &str = "warn";

fn app_home_dir() -> Result<PathBuf, AppError> {
    if let Ok(custom) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(custom));
    }

    if let Some(dirs) = ProjectDirs::from("com", "metricworks", SERVICE_NAME) {
        let candidate = dirs.data_local_dir().to_path_buf();
        if fs::create_dir_all(&candidate).is_ok() {
            return Ok(candidate);
        }
    }

    let cwd = std::env::current_dir()?;
    Ok(cwd.join(".pricing-estimator"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub pricing: PricingSchedule,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.into(),
            pricing: PricingSchedule::default(),
        }
    }
}

pub fn config_dir() -> Result<PathBuf, AppError> {
    Ok(app_home_dir()?.join("config"))
}

pub fn config_path() -> Result<PathBuf, AppError> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn ensure_dirs() -> Result<(), AppError> {
    fs::create_dir_all(config_dir()?)?;
    Ok(())
}

fn normalize_config(config: &mut AppConfig) -> bool {
    let normalized = config.log_level.trim().to_ascii_lowercase();
    let normalized = if normalized.is_empty() {
        DEFAULT_LOG_LEVEL.to_string()
    } else {
        normalized
    };
    let changed = normalized != config.log_level;
    config.log_level = normalized;
    changed
}

pub fn load_config() -> Result<AppConfig, AppError> {
    load_config_from(&config_path()?)
}

/// Layers the TOML file (if present) and environment overrides over the
/// built-in defaults, then validates the pricing schedule.
pub fn load_config_from(path: &Path) -> Result<AppConfig, AppError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path).format(config::FileFormat::Toml).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut parsed: AppConfig = settings.try_deserialize()?;
    if normalize_config(&mut parsed) {
        tracing::debug!(log_level = %parsed.log_level, "normalized configured log level");
    }
    parsed.pricing.validate()?;

    tracing::debug!(
        path = %path.display(),
        tiers = parsed.pricing.tiers.bands().len(),
        "pricing configuration loaded"
    );
    Ok(parsed)
}

pub fn save_config(config: &AppConfig) -> Result<(), AppError> {
    ensure_dirs()?;
    let path = config_path()?;
    let raw = toml::to_string_pretty(config)?;
    fs::write(path, raw)?;
    Ok(())
}

pub fn ensure_initialized() -> Result<(), AppError> {
    ensure_dirs()?;
    let cfg_path = config_path()?;
    if !Path::new(&cfg_path).exists() {
        save_config(&AppConfig::default())?;
        tracing::info!(path = %cfg_path.display(), "wrote default configuration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, raw: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, raw).expect("write config");
        path
    }

    #[test]
    fn missing_file_yields_built_in_schedule() {
        let dir = TempDir::new().expect("temp dir");
        let cfg = load_config_from(&dir.path().join("absent.toml")).expect("load defaults");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let dir = TempDir::new().expect("temp dir");
        let raw = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let path = write_config(&dir, &raw);
        let cfg = load_config_from(&path).expect("load written config");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
            log_level = " DEBUG "

            [pricing.constants]
            consulting_fee_per_hour = 300.0
            "#,
        );
        let cfg = load_config_from(&path).expect("load partial config");
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.pricing.constants.consulting_fee_per_hour, 300.0);
        assert_eq!(cfg.pricing.constants.minimum_monthly_fee, 2_500.0);
        assert_eq!(cfg.pricing.tiers.bands().len(), 4);
    }

    #[test]
    fn replacement_tier_table_is_loaded_in_order() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
            [pricing.tiers]
            default_unit_price = 500.0

            [[pricing.tiers.bands]]
            threshold_annual_units = 200
            unit_price = 250.0

            [[pricing.tiers.bands]]
            threshold_annual_units = 50
            unit_price = 400.0
            "#,
        );
        let cfg = load_config_from(&path).expect("load tier table");
        let tiers = &cfg.pricing.tiers;
        assert_eq!(tiers.bands().len(), 2);
        assert_eq!(tiers.unit_price_for(49), 500.0);
        assert_eq!(tiers.unit_price_for(50), 400.0);
        assert_eq!(tiers.unit_price_for(250), 250.0);
    }

    #[test]
    fn out_of_order_tiers_fail_at_load_time() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
            [[pricing.tiers.bands]]
            threshold_annual_units = 50
            unit_price = 400.0

            [[pricing.tiers.bands]]
            threshold_annual_units = 200
            unit_price = 250.0
            "#,
        );
        let err = load_config_from(&path).expect_err("reject ascending tiers");
        assert!(err.to_string().contains("strictly descending"));
    }

    #[test]
    fn negative_constants_fail_at_load_time() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
            [pricing.constants]
            onboarding_fee_per_product = -1.0
            "#,
        );
        let err = load_config_from(&path).expect_err("reject negative fee");
        assert!(err.to_string().contains("onboarding_fee_per_product"));
    }

    #[test]
    fn normalize_config_defaults_blank_log_level() {
        let mut cfg = AppConfig {
            log_level: "   ".into(),
            ..AppConfig::default()
        };
        assert!(normalize_config(&mut cfg));
        assert_eq!(cfg.log_level, "warn");
        assert!(!normalize_config(&mut cfg));
    }
}
