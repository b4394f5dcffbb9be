use regex::Regex;
use std::sync::OnceLock;

/// Working hours per year used to annualise hourly rates.
pub const HOURS_PER_YEAR: i64 = 2080;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalaryRange {
    pub min: i64,
    pub max: i64,
}

impl SalaryRange {
    pub fn display(&self) -> String {
        if self.min == self.max {
            format!("${}k", self.min / 1000)
        } else {
            format!("${}k-${}k", self.min / 1000, self.max / 1000)
        }
    }
}

fn amount_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\$\s*(\d[\d,]*(?:\.\d+)?)\s*(k\b)?").ok())
        .as_ref()
}

fn is_hourly(lower: &str) -> bool {
    ["/hr", "/hour", "per hour", "hourly", "an hour"]
        .iter()
        .any(|marker| lower.contains(marker))
}

/// Parses salary text such as `"$80,000 - $100,000"`, `"$150k-$200k"` or `"$40/hr"`.
/// Hourly rates are annualised. Returns `None` when no dollar amount is present.
pub fn parse_salary(text: Option<&str>) -> Option<SalaryRange> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }

    let hourly = is_hourly(&text.to_lowercase());
    let mut amounts = amount_pattern()?.captures_iter(text).filter_map(|caps| {
        let digits: String = caps[1].chars().filter(|c| *c != ',').collect();
        let mut value: f64 = digits.parse().ok()?;
        if caps.get(2).is_some() {
            value *= 1000.0;
        }
        if hourly {
            value *= HOURS_PER_YEAR as f64;
        }
        Some(value.round() as i64)
    });

    let first = amounts.next()?;
    let second = amounts.next().unwrap_or(first);
    Some(SalaryRange {
        min: first.min(second),
        max: first.max(second),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_annual_range() {
        assert_eq!(
            parse_salary(Some("$80,000 - $100,000")),
            Some(SalaryRange { min: 80_000, max: 100_000 })
        );
    }

    #[test]
    fn annualises_hourly() {
        assert_eq!(
            parse_salary(Some("$40/hr")),
            Some(SalaryRange { min: 83_200, max: 83_200 })
        );
        assert_eq!(
            parse_salary(Some("$25.50 - $30 per hour")),
            Some(SalaryRange { min: 53_040, max: 62_400 })
        );
    }

    #[test]
    fn handles_k_suffix_and_reversed_order() {
        assert_eq!(
            parse_salary(Some("$200K - $150k")),
            Some(SalaryRange { min: 150_000, max: 200_000 })
        );
    }

    #[test]
    fn empty_or_missing_is_none() {
        assert_eq!(parse_salary(Some("")), None);
        assert_eq!(parse_salary(None), None);
        assert_eq!(parse_salary(Some("Competitive")), None);
    }

    #[test]
    fn display_in_thousands() {
        assert_eq!(SalaryRange { min: 80_000, max: 100_000 }.display(), "$80k-$100k");
        assert_eq!(SalaryRange { min: 83_200, max: 83_200 }.display(), "$83k");
    }
}
