use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How often a product produces a billable model.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CadencePreset {
    #[serde(rename = "daily")]
    Daily,
    #[serde(rename = "15pm")]
    FifteenPerMonth,
    #[serde(rename = "2pw")]
    TwiceWeekly,
    #[serde(rename = "1pw")]
    #[default]
    WeeklyOnce,
    #[serde(rename = "1pm")]
    MonthlyOnce,
    #[serde(rename = "custom")]
    Custom,
}

impl CadencePreset {
    pub const ALL: [CadencePreset; 6] = [
        CadencePreset::Daily,
        CadencePreset::FifteenPerMonth,
        CadencePreset::TwiceWeekly,
        CadencePreset::WeeklyOnce,
        CadencePreset::MonthlyOnce,
        CadencePreset::Custom,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CadencePreset::Daily => "daily",
            CadencePreset::FifteenPerMonth => "15pm",
            CadencePreset::TwiceWeekly => "2pw",
            CadencePreset::WeeklyOnce => "1pw",
            CadencePreset::MonthlyOnce => "1pm",
            CadencePreset::Custom => "custom",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CadencePreset::Daily => "Daily",
            CadencePreset::FifteenPerMonth => "15 per month",
            CadencePreset::TwiceWeekly => "2 per week",
            CadencePreset::WeeklyOnce => "1 per week",
            CadencePreset::MonthlyOnce => "Monthly (1 per month)",
            CadencePreset::Custom => "Custom (per year)",
        }
    }

    /// Fixed annual units for the preset, `None` for [`CadencePreset::Custom`].
    pub fn annual_units(self) -> Option<u64> {
        match self {
            CadencePreset::Daily => Some(365),
            CadencePreset::FifteenPerMonth => Some(15 * 12),
            CadencePreset::TwiceWeekly => Some(2 * 52),
            CadencePreset::WeeklyOnce => Some(52),
            CadencePreset::MonthlyOnce => Some(12),
            CadencePreset::Custom => None,
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for CadencePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CadencePreset {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(CadencePreset::Daily),
            "15pm" => Ok(CadencePreset::FifteenPerMonth),
            "2pw" => Ok(CadencePreset::TwiceWeekly),
            "1pw" | "weekly" => Ok(CadencePreset::WeeklyOnce),
            "1pm" | "monthly" => Ok(CadencePreset::MonthlyOnce),
            "custom" => Ok(CadencePreset::Custom),
            other => Err(AppError::validation(
                "cadence",
                format!("unknown preset '{other}'. Use daily, 15pm, 2pw, 1pw, 1pm, or custom."),
            )),
        }
    }
}

/// Floors a raw custom usage figure and clamps it to zero.
pub fn sanitize_custom_units(raw: f64) -> u64 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    raw.floor() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductUsage {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cadence: CadencePreset,
    /// Only read when `cadence` is [`CadencePreset::Custom`].
    #[serde(default)]
    pub custom_annual_units: f64,
}

impl ProductUsage {
    pub fn preset(id: u64, cadence: CadencePreset) -> Self {
        Self {
            id,
            name: String::new(),
            cadence,
            custom_annual_units: 0.0,
        }
    }

    pub fn custom(id: u64, custom_annual_units: f64) -> Self {
        Self {
            id,
            name: String::new(),
            cadence: CadencePreset::Custom,
            custom_annual_units,
        }
    }

    pub fn annual_units(&self) -> u64 {
        self.cadence
            .annual_units()
            .unwrap_or_else(|| sanitize_custom_units(self.custom_annual_units))
    }

    /// Parses `[NAME@]CADENCE[=UNITS]`, e.g. `1pw`, `Office@daily`, `Game@custom=120`.
    pub fn parse_spec(id: u64, spec: &str) -> Result<Self, AppError> {
        let invalid = |reason: String| AppError::InvalidProduct {
            spec: spec.to_string(),
            reason,
        };

        let (name, rest) = match spec.rsplit_once('@') {
            Some((name, rest)) => (name.trim().to_string(), rest),
            None => (String::new(), spec),
        };
        let (cadence_raw, units_raw) = match rest.split_once('=') {
            Some((cadence, units)) => (cadence, Some(units.trim())),
            None => (rest, None),
        };

        let cadence: CadencePreset = cadence_raw.parse().map_err(|e| invalid(format!("{e}")))?;
        let mut product = match (cadence, units_raw) {
            (CadencePreset::Custom, Some(raw)) => {
                let units = raw
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("'{raw}' is not a number")))?;
                Self::custom(id, units)
            }
            (CadencePreset::Custom, None) => {
                return Err(invalid("custom cadence needs units, e.g. custom=120".into()));
            }
            (_, Some(_)) => {
                return Err(invalid(format!(
                    "units are only accepted for the custom cadence, not '{}'",
                    cadence.key()
                )));
            }
            (preset, None) => Self::preset(id, preset),
        };
        product.name = name;
        Ok(product)
    }
}

/// A set of products plus consulting hours, as read from a scenario file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub consulting_hours: f64,
    #[serde(default)]
    pub products: Vec<ProductUsage>,
}

impl Scenario {
    /// Assigns sequential ids starting at `first_id`; returns the next free id.
    pub fn renumber(&mut self, first_id: u64) -> u64 {
        let mut next = first_id;
        for product in &mut self.products {
            product.id = next;
            next += 1;
        }
        next
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductLine {
    pub id: u64,
    pub name: String,
    pub cadence: CadencePreset,
    pub annual_units: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateResult {
    pub products: Vec<ProductLine>,
    pub product_count: usize,
    pub total_annual_units: u64,
    pub units_per_month: f64,
    pub selected_unit_price: f64,
    pub annual_usage_cost: f64,
    pub avg_monthly_usage_cost: f64,
    pub monthly_support: f64,
    pub baseline_platform_monthly: f64,
    pub minimum_applied: bool,
    pub excess_units_per_month: f64,
    pub platform_monthly: f64,
    pub consulting_monthly: f64,
    pub monthly_all_in: f64,
    pub onboarding_one_time: f64,
    pub year1_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_map_to_fixed_annual_units() {
        assert_eq!(CadencePreset::Daily.annual_units(), Some(365));
        assert_eq!(CadencePreset::FifteenPerMonth.annual_units(), Some(180));
        assert_eq!(CadencePreset::TwiceWeekly.annual_units(), Some(104));
        assert_eq!(CadencePreset::WeeklyOnce.annual_units(), Some(52));
        assert_eq!(CadencePreset::MonthlyOnce.annual_units(), Some(12));
        assert_eq!(CadencePreset::Custom.annual_units(), None);
    }

    #[test]
    fn custom_units_are_floored_and_clamped() {
        assert_eq!(ProductUsage::custom(1, 10.9).annual_units(), 10);
        assert_eq!(ProductUsage::custom(1, -4.0).annual_units(), 0);
        assert_eq!(ProductUsage::custom(1, f64::NAN).annual_units(), 0);
        assert_eq!(ProductUsage::custom(1, f64::INFINITY).annual_units(), 0);
    }

    #[test]
    fn custom_units_are_ignored_for_presets() {
        let product = ProductUsage {
            custom_annual_units: 999.0,
            ..ProductUsage::preset(1, CadencePreset::Daily)
        };
        assert_eq!(product.annual_units(), 365);
    }

    #[test]
    fn cadence_cycles_through_all_presets() {
        let mut cadence = CadencePreset::Daily;
        for _ in 0..CadencePreset::ALL.len() {
            cadence = cadence.next();
        }
        assert_eq!(cadence, CadencePreset::Daily);
        assert_eq!(CadencePreset::Daily.previous(), CadencePreset::Custom);
    }

    #[test]
    fn cadence_parses_keys_and_aliases() {
        assert_eq!("2PW".parse::<CadencePreset>().unwrap(), CadencePreset::TwiceWeekly);
        assert_eq!("weekly".parse::<CadencePreset>().unwrap(), CadencePreset::WeeklyOnce);
        let err = "hourly".parse::<CadencePreset>().expect_err("unknown preset");
        assert!(err.to_string().contains("unknown preset 'hourly'"));
    }

    #[test]
    fn parse_spec_reads_name_cadence_and_units() {
        let plain = ProductUsage::parse_spec(1, "1pw").unwrap();
        assert_eq!(plain.cadence, CadencePreset::WeeklyOnce);
        assert!(plain.name.is_empty());

        let named = ProductUsage::parse_spec(2, "Candy Crush@custom=120").unwrap();
        assert_eq!(named.id, 2);
        assert_eq!(named.name, "Candy Crush");
        assert_eq!(named.annual_units(), 120);
    }

    #[test]
    fn parse_spec_rejects_units_outside_custom() {
        let err = ProductUsage::parse_spec(1, "daily=5").expect_err("units on preset");
        assert!(err.to_string().contains("only accepted for the custom cadence"));

        let err = ProductUsage::parse_spec(1, "custom").expect_err("missing units");
        assert!(err.to_string().contains("custom cadence needs units"));

        let err = ProductUsage::parse_spec(1, "custom=lots").expect_err("bad number");
        assert!(err.to_string().contains("'lots' is not a number"));
    }

    #[test]
    fn scenario_deserializes_with_defaults_and_renumbers() {
        let mut scenario: Scenario = toml::from_str(
            r#"
            consulting_hours = 4

            [[products]]
            name = "Office"
            cadence = "daily"

            [[products]]
            cadence = "custom"
            custom_annual_units = 30
            "#,
        )
        .expect("parse scenario");

        let next = scenario.renumber(10);
        assert_eq!(next, 12);
        assert_eq!(scenario.consulting_hours, 4.0);
        assert_eq!(scenario.products[0].id, 10);
        assert_eq!(scenario.products[1].id, 11);
        assert_eq!(scenario.products[1].annual_units(), 30);
    }
}
