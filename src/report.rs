use crate::models::EstimateResult;
use crate::pricing::PricingSchedule;
use std::fmt::Write;

/// Whole-dollar USD with thousands separators, e.g. `$39,300`.
pub fn format_usd(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

pub fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

pub fn summary_fields(result: &EstimateResult) -> Vec<(&'static str, String)> {
    vec![
        ("product_count", result.product_count.to_string()),
        ("total_annual_units", result.total_annual_units.to_string()),
        ("units_per_month", format!("{:.4}", result.units_per_month)),
        ("selected_unit_price", format!("{:.2}", result.selected_unit_price)),
        ("annual_usage_cost", format!("{:.2}", result.annual_usage_cost)),
        ("avg_monthly_usage_cost", format!("{:.2}", result.avg_monthly_usage_cost)),
        ("monthly_support", format!("{:.2}", result.monthly_support)),
        (
            "baseline_platform_monthly",
            format!("{:.2}", result.baseline_platform_monthly),
        ),
        ("minimum_applied", result.minimum_applied.to_string()),
        (
            "excess_units_per_month",
            format!("{:.4}", result.excess_units_per_month),
        ),
        ("platform_monthly", format!("{:.2}", result.platform_monthly)),
        ("consulting_monthly", format!("{:.2}", result.consulting_monthly)),
        ("monthly_all_in", format!("{:.2}", result.monthly_all_in)),
        ("onboarding_one_time", format!("{:.2}", result.onboarding_one_time)),
        ("year1_total", format!("{:.2}", result.year1_total)),
    ]
}

pub fn render_csv(result: &EstimateResult) -> String {
    let mut out = String::from("id,name,cadence,annual_units\n");
    for line in &result.products {
        let _ = writeln!(
            out,
            "{},{},{},{}",
            line.id,
            csv_field(&line.name),
            line.cadence.key(),
            line.annual_units
        );
    }
    out.push('\n');
    out.push_str("field,value\n");
    for (field, value) in summary_fields(result) {
        let _ = writeln!(out, "{field},{value}");
    }
    out
}

pub fn render_text(result: &EstimateResult, schedule: &PricingSchedule) -> String {
    let fees = &schedule.constants;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Per-model price (based on your annual commitment): {}",
        format_usd(result.selected_unit_price)
    );
    out.push('\n');

    out.push_str("Products\n");
    if result.products.is_empty() {
        out.push_str("  (none)\n");
    }
    for (idx, line) in result.products.iter().enumerate() {
        let name = if line.name.is_empty() {
            format!("Product {}", idx + 1)
        } else {
            line.name.clone()
        };
        let _ = writeln!(
            out,
            "  {name}: {} -> {} models/yr",
            line.cadence.label(),
            line.annual_units
        );
    }
    out.push('\n');

    out.push_str("Your commitment\n");
    let _ = writeln!(out, "  Total products: {}", result.product_count);
    let _ = writeln!(
        out,
        "  Total annual models: {} (~{:.1}/mo)",
        result.total_annual_units, result.units_per_month
    );
    let _ = writeln!(out, "  Support: {}/mo", format_usd(result.monthly_support));
    out.push('\n');

    out.push_str("Costs after month 3\n");
    let _ = writeln!(
        out,
        "  Avg model cost: {}/mo",
        format_usd(result.avg_monthly_usage_cost)
    );
    let _ = writeln!(
        out,
        "  Platform monthly{}: {}",
        if result.minimum_applied {
            " (minimum applied)"
        } else {
            ""
        },
        format_usd(result.platform_monthly)
    );
    if result.minimum_applied {
        let _ = writeln!(
            out,
            "  Includes up to {}/mo; est. overage at {}/model for ~{:.1} extra models/mo.",
            fees.included_units_per_month,
            format_usd(fees.overage_unit_price),
            result.excess_units_per_month
        );
    }
    let _ = writeln!(
        out,
        "  Consulting: {}/mo",
        format_usd(result.consulting_monthly)
    );
    let _ = writeln!(
        out,
        "  All-in monthly after handoff: {}",
        format_usd(result.monthly_all_in)
    );
    out.push('\n');

    out.push_str("One-time & Year 1\n");
    let _ = writeln!(
        out,
        "  Onboarding (months 1-3): {} one-time",
        format_usd(result.onboarding_one_time)
    );
    let _ = writeln!(
        out,
        "  Estimated Year-1 total: {}",
        format_usd(result.year1_total)
    );
    out
}

pub fn render_schedule(schedule: &PricingSchedule) -> String {
    let fees = &schedule.constants;
    let mut out = String::new();

    out.push_str("Ongoing models (company tiered)\n");
    for band in schedule.tiers.bands() {
        let _ = writeln!(
            out,
            "  {}: {}/model",
            band.display_label(),
            format_usd(band.unit_price)
        );
    }
    let lowest = schedule
        .tiers
        .bands()
        .last()
        .map(|band| band.threshold_annual_units);
    match lowest {
        Some(threshold) => {
            let _ = writeln!(
                out,
                "  Below {threshold}/year defaults to {}/model",
                format_usd(schedule.tiers.default_unit_price())
            );
        }
        None => {
            let _ = writeln!(
                out,
                "  Flat {}/model",
                format_usd(schedule.tiers.default_unit_price())
            );
        }
    }
    out.push('\n');

    out.push_str("Fees\n");
    let _ = writeln!(
        out,
        "  Onboarding: {} per product (one-time for months 1-3)",
        format_usd(fees.onboarding_fee_per_product)
    );
    let _ = writeln!(
        out,
        "  Support: {}/month per product",
        format_usd(fees.support_fee_per_product_per_month)
    );
    let _ = writeln!(
        out,
        "  Minimum platform fee: {}/month (includes support + up to {} models/mo; overage {}/model)",
        format_usd(fees.minimum_monthly_fee),
        fees.included_units_per_month,
        format_usd(fees.overage_unit_price)
    );
    let _ = writeln!(
        out,
        "  Consulting: {}/hour",
        format_usd(fees.consulting_fee_per_hour)
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::estimate;
    use crate::models::{CadencePreset, ProductUsage};

    #[test]
    fn format_usd_groups_thousands_and_rounds() {
        assert_eq!(format_usd(0.0), "$0");
        assert_eq!(format_usd(450.0), "$450");
        assert_eq!(format_usd(2_700.4), "$2,700");
        assert_eq!(format_usd(39_300.0), "$39,300");
        assert_eq!(format_usd(1_234_567.5), "$1,234,568");
        assert_eq!(format_usd(-1_500.0), "-$1,500");
    }

    #[test]
    fn csv_field_escapes_special_characters() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("a\"b"), "\"a\"\"b\"");
        assert_eq!(csv_field("a\nb"), "\"a\nb\"");
    }

    #[test]
    fn text_report_flags_minimum_and_overage_allowance() {
        let schedule = PricingSchedule::default();
        let result = estimate(&schedule, &[ProductUsage::custom(1, 10.0)], 2.0);
        let text = render_text(&result, &schedule);
        assert!(text.contains("Platform monthly (minimum applied): $2,500"));
        assert!(text.contains("Includes up to 3/mo; est. overage at $450/model"));
        assert!(text.contains("Consulting: $500/mo"));
        assert!(text.contains("Estimated Year-1 total: $42,000"));
    }

    #[test]
    fn text_report_names_unnamed_products_by_position() {
        let schedule = PricingSchedule::default();
        let mut named = ProductUsage::preset(2, CadencePreset::Daily);
        named.name = "Office".into();
        let result = estimate(
            &schedule,
            &[ProductUsage::preset(1, CadencePreset::WeeklyOnce), named],
            0.0,
        );
        let text = render_text(&result, &schedule);
        assert!(text.contains("Product 1: 1 per week -> 52 models/yr"));
        assert!(text.contains("Office: Daily -> 365 models/yr"));
        assert!(!text.contains("minimum applied"));
    }

    #[test]
    fn csv_report_lists_products_then_summary() {
        let schedule = PricingSchedule::default();
        let mut product = ProductUsage::preset(1, CadencePreset::WeeklyOnce);
        product.name = "Office, Suite".into();
        let csv = render_csv(&estimate(&schedule, &[product], 0.0));
        assert!(csv.starts_with("id,name,cadence,annual_units\n1,\"Office, Suite\",1pw,52\n"));
        assert!(csv.contains("field,value\n"));
        assert!(csv.contains("minimum_applied,false\n"));
        assert!(csv.contains("year1_total,39300.00\n"));
    }

    #[test]
    fn schedule_report_lists_tiers_and_fees() {
        let text = render_schedule(&PricingSchedule::default());
        assert!(text.contains("Daily (≥365/yr): $200/model"));
        assert!(text.contains("Below 52/year defaults to $450/model"));
        assert!(text.contains("Minimum platform fee: $2,500/month"));
        assert!(text.contains("Consulting: $250/hour"));
    }
}
