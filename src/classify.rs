use crate::config::ClassificationConfig;
use crate::types::DemographicRecord;

/// Percentage of the population in the "over 65" age bucket, or `None`
/// when the record has no age data at all. Callers must render `None`
/// as an explicit no-data state rather than a zero.
pub fn percent_over_65(record: &DemographicRecord, tables: &ClassificationConfig) -> Option<f64> {
    let total = record.age_total();
    if total == 0 {
        return None;
    }
    let over = record
        .age
        .get(&tables.over_65_bucket)
        .copied()
        .unwrap_or(0);
    Some(100.0 * f64::from(over) / total as f64)
}

/// Estimates the median household income as the first bin (in the
/// configured ascending order) where the cumulative count reaches half
/// the total. This is a weighted median over bins, not a true median:
/// the answer is always a bin label, never an interpolated dollar
/// figure. `None` when every bin is zero.
pub fn median_income_bin<'a>(
    record: &DemographicRecord,
    tables: &'a ClassificationConfig,
) -> Option<&'a str> {
    let total: u64 = tables
        .income_bins
        .iter()
        .map(|bin| u64::from(record.income.get(&bin.label).copied().unwrap_or(0)))
        .sum();
    if total == 0 {
        return None;
    }

    let mut cumulative: u64 = 0;
    for bin in &tables.income_bins {
        cumulative += u64::from(record.income.get(&bin.label).copied().unwrap_or(0));
        // Integer comparison so cumulative >= total/2 matches at the
        // exact midpoint (2 * cumulative avoids the truncating divide).
        if 2 * cumulative >= total {
            return Some(bin.label.as_str());
        }
    }
    None
}

/// Descending threshold scan with strict greater-than: a percentage
/// exactly at a step's bound falls through to the next band. At or
/// below the lowest threshold gets the fallback color.
pub fn color_for_age<'a>(percent: f64, tables: &'a ClassificationConfig) -> &'a str {
    for step in &tables.age_steps {
        if percent > step.min_percent {
            return &step.color;
        }
    }
    &tables.age_fallback_color
}

/// Looks up the fill for an income bin label; unknown labels get the
/// no-data color.
pub fn color_for_income<'a>(label: &str, tables: &'a ClassificationConfig) -> &'a str {
    tables
        .income_bins
        .iter()
        .find(|bin| bin.label == label)
        .map(|bin| bin.color.as_str())
        .unwrap_or(&tables.no_data_color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tables() -> ClassificationConfig {
        ClassificationConfig::default()
    }

    fn age_record(buckets: &[(&str, u32)]) -> DemographicRecord {
        DemographicRecord {
            age: buckets.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            income: HashMap::new(),
        }
    }

    fn income_record(buckets: &[(&str, u32)]) -> DemographicRecord {
        DemographicRecord {
            age: HashMap::new(),
            income: buckets.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    #[test]
    fn percent_over_65_is_a_share_of_the_age_total() {
        let r = age_record(&[("Over 65", 30), ("35 to 64", 70)]);
        let pct = percent_over_65(&r, &tables()).unwrap();
        assert!((pct - 30.0).abs() < 1e-9);
    }

    #[test]
    fn zero_age_total_yields_no_data_not_a_zero_percentage() {
        let r = age_record(&[("Over 65", 0), ("Under 5", 0)]);
        assert_eq!(percent_over_65(&r, &tables()), None);
        assert_eq!(percent_over_65(&DemographicRecord::default(), &tables()), None);
    }

    #[test]
    fn exact_threshold_falls_to_the_lower_band() {
        // 30% is not strictly greater than 30, so it lands in the >20
        // band; this boundary is load-bearing for the legend.
        let t = tables();
        assert_eq!(color_for_age(30.0, &t), "#2171b5");
        assert_eq!(color_for_age(30.01, &t), "#08306b");
        assert_eq!(color_for_age(2.0, &t), "#d9ecff");
        assert_eq!(color_for_age(0.0, &t), "#d9ecff");
    }

    #[test]
    fn age_colors_are_monotone_in_the_percentage() {
        let t = tables();
        let rank = |pct: f64| -> usize {
            let color = color_for_age(pct, &t);
            t.age_steps
                .iter()
                .position(|s| s.color == color)
                .unwrap_or(t.age_steps.len())
        };
        // Lower rank index = darker bucket; rank must never increase
        // as the percentage grows.
        let samples = [0.0, 1.9, 2.1, 5.5, 10.5, 15.5, 20.5, 30.5, 99.0];
        for pair in samples.windows(2) {
            assert!(rank(pair[1]) <= rank(pair[0]));
        }
    }

    #[test]
    fn median_bin_with_all_mass_in_one_bin_is_that_bin() {
        let r = income_record(&[("$75,000 to $99,999", 42)]);
        assert_eq!(
            median_income_bin(&r, &tables()),
            Some("$75,000 to $99,999")
        );
    }

    #[test]
    fn median_bin_crosses_at_half_the_total() {
        // 10 + 10 + 20: cumulative hits 20 of 40 at the second bin.
        let r = income_record(&[
            ("Less than $50,000", 10),
            ("$50,000 to $74,999", 10),
            ("$75,000 to $99,999", 20),
        ]);
        assert_eq!(
            median_income_bin(&r, &tables()),
            Some("$50,000 to $74,999")
        );
    }

    #[test]
    fn all_zero_income_yields_no_data_not_the_first_bin() {
        let r = income_record(&[("Less than $50,000", 0), ("$200,000 or more", 0)]);
        assert_eq!(median_income_bin(&r, &tables()), None);
        assert_eq!(median_income_bin(&DemographicRecord::default(), &tables()), None);
    }

    #[test]
    fn unknown_income_label_gets_the_no_data_color() {
        let t = tables();
        assert_eq!(color_for_income("$200,000 or more", &t), "#b05e00");
        assert_eq!(color_for_income("not a bin", &t), "#f2efe7");
    }
}
