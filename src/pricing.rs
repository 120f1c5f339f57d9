use crate::error::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingTier {
    pub threshold_annual_units: u64,
    pub unit_price: f64,
    #[serde(default)]
    pub label: String,
}

impl PricingTier {
    pub fn new(threshold_annual_units: u64, unit_price: f64, label: &str) -> Self {
        Self {
            threshold_annual_units,
            unit_price,
            label: label.to_string(),
        }
    }

    pub fn display_label(&self) -> String {
        if self.label.is_empty() {
            format!("≥{}/yr", self.threshold_annual_units)
        } else {
            self.label.clone()
        }
    }
}

/// On-disk shape of the tier table, validated into [`PricingTierTable`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTableSpec {
    pub default_unit_price: f64,
    pub bands: Vec<PricingTier>,
}

impl Default for TierTableSpec {
    fn default() -> Self {
        PricingTierTable::built_in().into()
    }
}

/// Tiers in strictly descending threshold order, with prices that never rise
/// as volume grows, plus a fallback price for volumes below every threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "TierTableSpec", into = "TierTableSpec")]
pub struct PricingTierTable {
    bands: Vec<PricingTier>,
    default_unit_price: f64,
}

impl PricingTierTable {
    pub fn new(bands: Vec<PricingTier>, default_unit_price: f64) -> Result<Self, AppError> {
        ensure_amount("default_unit_price", default_unit_price)?;
        for band in &bands {
            ensure_amount(
                &format!("unit_price for threshold {}", band.threshold_annual_units),
                band.unit_price,
            )?;
        }

        for pair in bands.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            if upper.threshold_annual_units <= lower.threshold_annual_units {
                return Err(AppError::Config(format!(
                    "pricing tiers must be in strictly descending threshold order: {} is listed before {}",
                    upper.threshold_annual_units, lower.threshold_annual_units
                )));
            }
            if upper.unit_price > lower.unit_price {
                return Err(AppError::Config(format!(
                    "tier price must not rise with volume: {} at threshold {} exceeds {} at threshold {}",
                    upper.unit_price,
                    upper.threshold_annual_units,
                    lower.unit_price,
                    lower.threshold_annual_units
                )));
            }
        }

        if let Some(lowest) = bands.last() {
            if lowest.unit_price > default_unit_price {
                return Err(AppError::Config(format!(
                    "default unit price {} is below the lowest tier price {}",
                    default_unit_price, lowest.unit_price
                )));
            }
        }

        Ok(Self {
            bands,
            default_unit_price,
        })
    }

    pub fn built_in() -> Self {
        Self {
            bands: vec![
                PricingTier::new(365, 200.0, "Daily (≥365/yr)"),
                PricingTier::new(180, 300.0, "15 per month (≥180/yr)"),
                PricingTier::new(104, 350.0, "2 per week (≥104/yr)"),
                PricingTier::new(52, 450.0, "1 per week (≥52/yr)"),
            ],
            default_unit_price: 450.0,
        }
    }

    pub fn bands(&self) -> &[PricingTier] {
        &self.bands
    }

    pub fn default_unit_price(&self) -> f64 {
        self.default_unit_price
    }

    /// The first tier whose threshold the volume reaches, if any.
    pub fn tier_for(&self, total_annual_units: u64) -> Option<&PricingTier> {
        self.bands
            .iter()
            .find(|band| total_annual_units >= band.threshold_annual_units)
    }

    pub fn unit_price_for(&self, total_annual_units: u64) -> f64 {
        self.tier_for(total_annual_units)
            .map(|band| band.unit_price)
            .unwrap_or(self.default_unit_price)
    }
}

impl TryFrom<TierTableSpec> for PricingTierTable {
    type Error = AppError;

    fn try_from(spec: TierTableSpec) -> Result<Self, Self::Error> {
        PricingTierTable::new(spec.bands, spec.default_unit_price)
    }
}

impl From<PricingTierTable> for TierTableSpec {
    fn from(table: PricingTierTable) -> Self {
        Self {
            default_unit_price: table.default_unit_price,
            bands: table.bands,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingConstants {
    pub onboarding_fee_per_product: f64,
    pub support_fee_per_product_per_month: f64,
    pub consulting_fee_per_hour: f64,
    pub minimum_monthly_fee: f64,
    pub included_units_per_month: f64,
    pub overage_unit_price: f64,
}

impl Default for PricingConstants {
    fn default() -> Self {
        Self {
            onboarding_fee_per_product: 15_000.0,
            support_fee_per_product_per_month: 750.0,
            consulting_fee_per_hour: 250.0,
            minimum_monthly_fee: 2_500.0,
            included_units_per_month: 3.0,
            overage_unit_price: 450.0,
        }
    }
}

impl PricingConstants {
    pub fn validate(&self) -> Result<(), AppError> {
        ensure_amount("onboarding_fee_per_product", self.onboarding_fee_per_product)?;
        ensure_amount(
            "support_fee_per_product_per_month",
            self.support_fee_per_product_per_month,
        )?;
        ensure_amount("consulting_fee_per_hour", self.consulting_fee_per_hour)?;
        ensure_amount("minimum_monthly_fee", self.minimum_monthly_fee)?;
        ensure_amount("included_units_per_month", self.included_units_per_month)?;
        ensure_amount("overage_unit_price", self.overage_unit_price)?;
        Ok(())
    }
}

/// Everything the estimator needs besides the customer's inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricingSchedule {
    pub constants: PricingConstants,
    pub tiers: PricingTierTable,
}

impl PricingSchedule {
    pub fn validate(&self) -> Result<(), AppError> {
        self.constants.validate()
    }
}

impl Default for PricingTierTable {
    fn default() -> Self {
        Self::built_in()
    }
}

fn ensure_amount(field: &str, value: f64) -> Result<(), AppError> {
    if !value.is_finite() || value < 0.0 {
        return Err(AppError::Config(format!(
            "{field} must be a finite, non-negative amount (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_table_selects_first_reached_threshold() {
        let table = PricingTierTable::built_in();
        assert_eq!(table.unit_price_for(104), 350.0);
        assert_eq!(table.unit_price_for(103), 450.0);
        assert_eq!(table.unit_price_for(365), 200.0);
        assert_eq!(table.unit_price_for(366), 200.0);
        assert_eq!(table.unit_price_for(180), 300.0);
        assert_eq!(table.unit_price_for(52), 450.0);
    }

    #[test]
    fn volumes_below_every_threshold_use_default_price() {
        let table = PricingTierTable::new(vec![PricingTier::new(52, 400.0, "")], 500.0)
            .expect("valid table");
        assert_eq!(table.unit_price_for(0), 500.0);
        assert_eq!(table.unit_price_for(51), 500.0);
        assert!(table.tier_for(51).is_none());
        assert_eq!(table.unit_price_for(52), 400.0);
    }

    #[test]
    fn empty_table_always_uses_default_price() {
        let table = PricingTierTable::new(vec![], 99.0).expect("valid table");
        assert_eq!(table.unit_price_for(0), 99.0);
        assert_eq!(table.unit_price_for(10_000), 99.0);
    }

    #[test]
    fn selected_price_never_rises_with_volume() {
        let table = PricingTierTable::built_in();
        let mut previous = table.unit_price_for(0);
        for units in 1..=1_000 {
            let price = table.unit_price_for(units);
            assert!(price <= previous, "price rose at {units} units");
            previous = price;
        }
    }

    #[test]
    fn ascending_thresholds_are_rejected() {
        let err = PricingTierTable::new(
            vec![
                PricingTier::new(52, 450.0, ""),
                PricingTier::new(365, 450.0, ""),
            ],
            450.0,
        )
        .expect_err("ascending thresholds");
        assert!(err.to_string().contains("strictly descending threshold order"));
    }

    #[test]
    fn duplicate_thresholds_are_rejected() {
        let err = PricingTierTable::new(
            vec![
                PricingTier::new(52, 400.0, ""),
                PricingTier::new(52, 450.0, ""),
            ],
            450.0,
        )
        .expect_err("duplicate thresholds");
        assert!(err.to_string().contains("52 is listed before 52"));
    }

    #[test]
    fn prices_rising_with_volume_are_rejected() {
        let err = PricingTierTable::new(
            vec![
                PricingTier::new(365, 500.0, ""),
                PricingTier::new(52, 450.0, ""),
            ],
            450.0,
        )
        .expect_err("price inversion");
        assert!(err.to_string().contains("must not rise with volume"));

        let err = PricingTierTable::new(vec![PricingTier::new(52, 450.0, "")], 300.0)
            .expect_err("default below tier");
        assert!(err.to_string().contains("default unit price"));
    }

    #[test]
    fn negative_or_non_finite_amounts_are_rejected() {
        let err = PricingTierTable::new(vec![PricingTier::new(52, -1.0, "")], 450.0)
            .expect_err("negative price");
        assert!(err.to_string().contains("unit_price for threshold 52"));

        let constants = PricingConstants {
            minimum_monthly_fee: f64::NAN,
            ..PricingConstants::default()
        };
        let err = constants.validate().expect_err("nan minimum");
        assert!(err.to_string().contains("minimum_monthly_fee"));
    }

    #[test]
    fn tier_table_deserialization_enforces_ordering() {
        let parsed: Result<PricingTierTable, _> = toml::from_str(
            r#"
            default_unit_price = 450.0

            [[bands]]
            threshold_annual_units = 52
            unit_price = 450.0

            [[bands]]
            threshold_annual_units = 104
            unit_price = 350.0
            "#,
        );
        let err = parsed.expect_err("out of order bands");
        assert!(err.to_string().contains("strictly descending"));
    }

    #[test]
    fn display_label_falls_back_to_threshold() {
        assert_eq!(PricingTier::new(52, 1.0, "").display_label(), "≥52/yr");
        assert_eq!(
            PricingTier::new(52, 1.0, "1 per week").display_label(),
            "1 per week"
        );
    }
}
