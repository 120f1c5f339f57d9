//! The estimate pipeline: annual usage, tiered unit price, minimum-fee floor,
//! consulting and onboarding, rolled up into a year-one figure.

use crate::error::AppError;
use crate::models::{EstimateResult, ProductLine, ProductUsage};
use crate::pricing::PricingSchedule;

pub const MONTHS_PER_YEAR: f64 = 12.0;
/// Months 1-3 are onboarding only; platform fees start in month 4.
pub const BILLED_MONTHS_IN_YEAR_ONE: f64 = 9.0;

/// Negative and non-finite hours count as zero.
pub fn sanitize_consulting_hours(raw: f64) -> f64 {
    if raw.is_finite() && raw > 0.0 {
        raw
    } else {
        0.0
    }
}

/// Rejects inputs that [`estimate`] would otherwise silently clamp.
pub fn validate_inputs(products: &[ProductUsage], consulting_hours: f64) -> Result<(), AppError> {
    if !consulting_hours.is_finite() {
        return Err(AppError::validation(
            "consulting_hours",
            "must be a finite number",
        ));
    }
    if consulting_hours < 0.0 {
        return Err(AppError::validation(
            "consulting_hours",
            format!("must not be negative (got {consulting_hours})"),
        ));
    }

    for product in products {
        if product.cadence.annual_units().is_some() {
            continue;
        }
        let raw = product.custom_annual_units;
        let field = format!("custom_annual_units for product {}", product.id);
        if !raw.is_finite() {
            return Err(AppError::validation(field, "must be a finite number"));
        }
        if raw < 0.0 {
            return Err(AppError::validation(
                field,
                format!("must not be negative (got {raw})"),
            ));
        }
    }

    Ok(())
}

pub fn estimate(
    schedule: &PricingSchedule,
    products: &[ProductUsage],
    consulting_hours: f64,
) -> EstimateResult {
    let fees = &schedule.constants;

    let lines: Vec<ProductLine> = products
        .iter()
        .map(|p| ProductLine {
            id: p.id,
            name: p.name.clone(),
            cadence: p.cadence,
            annual_units: p.annual_units(),
        })
        .collect();

    let product_count = lines.len();
    // Saturates rather than wrapping when huge custom figures are combined.
    let total_annual_units = lines
        .iter()
        .map(|l| l.annual_units)
        .fold(0u64, u64::saturating_add);

    // One blended rate for the whole company, applied to the aggregate.
    let selected_unit_price = schedule.tiers.unit_price_for(total_annual_units);
    let annual_usage_cost = total_annual_units as f64 * selected_unit_price;
    let avg_monthly_usage_cost = annual_usage_cost / MONTHS_PER_YEAR;

    let monthly_support = product_count as f64 * fees.support_fee_per_product_per_month;
    let baseline_platform_monthly = monthly_support + avg_monthly_usage_cost;
    let units_per_month = total_annual_units as f64 / MONTHS_PER_YEAR;

    let minimum_applied = baseline_platform_monthly < fees.minimum_monthly_fee;
    let (excess_units_per_month, platform_monthly) = if minimum_applied {
        let excess = (units_per_month - fees.included_units_per_month).max(0.0);
        (
            excess,
            fees.minimum_monthly_fee + excess * fees.overage_unit_price,
        )
    } else {
        (0.0, baseline_platform_monthly)
    };

    let consulting_monthly =
        sanitize_consulting_hours(consulting_hours) * fees.consulting_fee_per_hour;
    let monthly_all_in = platform_monthly + consulting_monthly;
    let onboarding_one_time = product_count as f64 * fees.onboarding_fee_per_product;
    let year1_total = onboarding_one_time + monthly_all_in * BILLED_MONTHS_IN_YEAR_ONE;

    EstimateResult {
        products: lines,
        product_count,
        total_annual_units,
        units_per_month,
        selected_unit_price,
        annual_usage_cost,
        avg_monthly_usage_cost,
        monthly_support,
        baseline_platform_monthly,
        minimum_applied,
        excess_units_per_month,
        platform_monthly,
        consulting_monthly,
        monthly_all_in,
        onboarding_one_time,
        year1_total,
    }
}
