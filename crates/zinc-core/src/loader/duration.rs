//! ISO-8601 durations (`PnYnMnWnDTnHnMnS`)

use serde::{Deserialize, Serialize};

const MILLIS_PER_SECOND: f64 = 1000.0;
const MILLIS_PER_MINUTE: f64 = 60.0 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: f64 = 60.0 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: f64 = 24.0 * MILLIS_PER_HOUR;

/// Components of a parsed duration, each unset unless present in the string
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsoDuration {
    pub years: Option<u64>,
    pub months: Option<u64>,
    pub weeks: Option<u64>,
    pub days: Option<u64>,
    pub hours: Option<u64>,
    pub minutes: Option<u64>,
    pub seconds: Option<u64>,
}

impl IsoDuration {
    /// Parse a duration string
    ///
    /// Anything that does not match the pattern yields a duration with every
    /// component unset.
    pub fn parse(value: &str) -> Self {
        Self::try_parse(value).unwrap_or_default()
    }

    fn try_parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix('P')?;
        let (date, time) = match rest.split_once('T') {
            Some((date, time)) => (date, time),
            None => (rest, ""),
        };
        let [years, months, weeks, days] = components(date, ['Y', 'M', 'W', 'D'])?;
        let [hours, minutes, seconds] = components(time, ['H', 'M', 'S'])?;
        Some(Self {
            years,
            months,
            weeks,
            days,
            hours,
            minutes,
            seconds,
        })
    }

    /// True when no component was present
    pub fn is_unset(&self) -> bool {
        *self == Self::default()
    }

    /// Length in milliseconds, counting 365-day years and 30-day months
    ///
    /// `None` when no component was present.
    pub fn to_millis(&self) -> Option<f64> {
        if self.is_unset() {
            return None;
        }
        let part = |value: Option<u64>, scale: f64| value.unwrap_or(0) as f64 * scale;
        Some(
            part(self.years, 365.0 * MILLIS_PER_DAY)
                + part(self.months, 30.0 * MILLIS_PER_DAY)
                + part(self.weeks, 7.0 * MILLIS_PER_DAY)
                + part(self.days, MILLIS_PER_DAY)
                + part(self.hours, MILLIS_PER_HOUR)
                + part(self.minutes, MILLIS_PER_MINUTE)
                + part(self.seconds, MILLIS_PER_SECOND),
        )
    }
}

/// Split `part` into numbers tagged by `designators`, which must appear in
/// the given order
fn components<const N: usize>(part: &str, designators: [char; N]) -> Option<[Option<u64>; N]> {
    let mut values = [None; N];
    let mut next = 0;
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let slot = designators[next..].iter().position(|d| *d == c)? + next;
        if digits.is_empty() {
            return None;
        }
        values[slot] = Some(digits.parse().ok()?);
        digits.clear();
        next = slot + 1;
    }
    digits.is_empty().then_some(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds() {
        let duration = IsoDuration::parse("PT2S");
        assert_eq!(duration.seconds, Some(2));
        assert_eq!(duration.minutes, None);
        assert_eq!(duration.to_millis(), Some(2000.0));
    }

    #[test]
    fn test_full_pattern() {
        let duration = IsoDuration::parse("P1Y2M3W4DT5H6M7S");
        assert_eq!(duration.years, Some(1));
        assert_eq!(duration.months, Some(2));
        assert_eq!(duration.weeks, Some(3));
        assert_eq!(duration.days, Some(4));
        assert_eq!(duration.hours, Some(5));
        assert_eq!(duration.minutes, Some(6));
        assert_eq!(duration.seconds, Some(7));
    }

    #[test]
    fn test_month_and_minute_share_designator() {
        let duration = IsoDuration::parse("P3MT3M");
        assert_eq!(duration.months, Some(3));
        assert_eq!(duration.minutes, Some(3));
        assert_eq!(
            duration.to_millis(),
            Some(3.0 * 30.0 * MILLIS_PER_DAY + 3.0 * MILLIS_PER_MINUTE)
        );
    }

    #[test]
    fn test_invalid_is_unset() {
        for input in ["", "2S", "PT", "P2", "PS", "PT2S3M", "P1D2Y", "soon"] {
            let duration = IsoDuration::parse(input);
            assert!(duration.is_unset(), "{input}");
            assert_eq!(duration.to_millis(), None);
        }
    }
}
