//! Experience duration arithmetic.
//!
//! Each span contributes (end − start) in days ÷ 365.25. Overlapping spans are summed,
//! not merged. The total is rounded to the nearest 0.5.

use chrono::NaiveDate;
use tracing::warn;

use crate::analysis::experience::EmploymentSpan;

pub const DAYS_PER_YEAR: f64 = 365.25;
const PRESENT_TOKEN: &str = "PRESENT";

/// Parses `MM/YYYY` into the first day of that month.
pub fn parse_month_year(raw: &str) -> Option<NaiveDate> {
    let (month, year) = raw.trim().split_once('/')?;
    let month: u32 = month.trim().parse().ok()?;
    let year: i32 = year.trim().parse().ok()?;
    if !(1000..=9999).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Years covered by one span, or `None` when its dates are unusable.
pub fn span_years(span: &EmploymentSpan, today: NaiveDate) -> Option<f64> {
    let start = parse_month_year(&span.start)?;
    let end = if span.end.trim().eq_ignore_ascii_case(PRESENT_TOKEN) {
        today
    } else {
        parse_month_year(&span.end)?
    };

    let days = (end - start).num_days();
    if days < 0 {
        return None;
    }
    Some(days as f64 / DAYS_PER_YEAR)
}

/// Unrounded sum over all valid spans.
pub fn raw_total_years(spans: &[EmploymentSpan], today: NaiveDate) -> f64 {
    spans
        .iter()
        .filter_map(|span| {
            let years = span_years(span, today);
            if years.is_none() {
                warn!(
                    organization = %span.organization,
                    "Skipping span with unusable dates '{}' - '{}'",
                    span.start,
                    span.end
                );
            }
            years
        })
        .sum()
}

/// Total years across valid spans, rounded to the nearest 0.5. Always ≥ 0.0.
pub fn total_years(spans: &[EmploymentSpan], today: NaiveDate) -> f64 {
    round_to_half(raw_total_years(spans, today)).max(0.0)
}

/// Multiply by 2, round half away from zero, divide by 2.
pub fn round_to_half(years: f64) -> f64 {
    (years * 2.0).round() / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(org: &str, start: &str, end: &str) -> EmploymentSpan {
        EmploymentSpan {
            organization: org.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_month_year() {
        assert_eq!(parse_month_year("01/2018"), Some(date(2018, 1, 1)));
        assert_eq!(parse_month_year(" 7/2020 "), Some(date(2020, 7, 1)));
        assert_eq!(parse_month_year("13/2020"), None);
        assert_eq!(parse_month_year("00/2020"), None);
        assert_eq!(parse_month_year("2020"), None);
        assert_eq!(parse_month_year("Jan 2020"), None);
        assert_eq!(parse_month_year("01/20"), None);
    }

    #[test]
    fn test_sequential_spans_with_present_at_fixed_clock() {
        let spans = vec![
            span("Initech", "01/2018", "12/2019"),
            span("Globex", "01/2020", "PRESENT"),
        ];
        let today = date(2023, 6, 15);
        // 699 days + 1261 days
        let raw = raw_total_years(&spans, today);
        assert!((raw - 1960.0 / 365.25).abs() < 1e-9, "raw was {raw}");
        assert_eq!(total_years(&spans, today), 5.5);
    }

    #[test]
    fn test_single_span_rounds_to_six() {
        let spans = vec![span("Acme Corp", "01/2015", "12/2020")];
        assert_eq!(total_years(&spans, date(2024, 1, 1)), 6.0);
    }

    #[test]
    fn test_overlapping_spans_are_summed() {
        let spans = vec![
            span("Day Job", "01/2020", "01/2022"),
            span("Consulting", "01/2020", "01/2022"),
        ];
        // 731 days each
        assert_eq!(total_years(&spans, date(2024, 1, 1)), 4.0);
    }

    #[test]
    fn test_unparsable_and_inverted_spans_are_skipped() {
        let spans = vec![
            span("Acme Corp", "01/2015", "12/2020"),
            span("Bad Dates", "sometime", "later"),
            span("Inverted", "01/2020", "01/2019"),
        ];
        assert_eq!(total_years(&spans, date(2024, 1, 1)), 6.0);
    }

    #[test]
    fn test_present_is_case_insensitive() {
        let spans = vec![span("Now Inc", "01/2022", "present")];
        assert_eq!(total_years(&spans, date(2024, 1, 1)), 2.0);
    }

    #[test]
    fn test_no_spans_is_zero() {
        assert_eq!(total_years(&[], date(2024, 1, 1)), 0.0);
    }

    #[test]
    fn test_round_to_half() {
        assert_eq!(round_to_half(5.3), 5.5);
        assert_eq!(round_to_half(5.24), 5.0);
        assert_eq!(round_to_half(5.25), 5.5);
        assert_eq!(round_to_half(5.74), 5.5);
        assert_eq!(round_to_half(5.76), 6.0);
        assert_eq!(round_to_half(0.2), 0.0);
    }
}
