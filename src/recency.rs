use anyhow::{Context, Result};
use time::format_description::{self, OwnedFormatItem};
use time::OffsetDateTime;

pub const DEFAULT_DATE_FORMAT: &str = "[day]/[month]/[year]";

const HOURS_PER_DAY: i64 = 24;
const RELATIVE_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct RecencyFormatter {
    date_format: OwnedFormatItem,
}

impl RecencyFormatter {
    pub fn new(date_format: &str) -> Result<Self> {
        let date_format = format_description::parse_owned::<1>(date_format)
            .with_context(|| format!("parsing date format {date_format:?}"))?;
        Ok(Self { date_format })
    }

    /// Relative age of `created_at` as seen at `now`. Reports older than a week
    /// get their calendar date instead.
    pub fn format(&self, created_at: OffsetDateTime, now: OffsetDateTime) -> String {
        let hours = (now - created_at).whole_hours();
        let days = hours / HOURS_PER_DAY;
        if hours < 1 {
            "less than one hour ago".to_string()
        } else if hours < HOURS_PER_DAY {
            format!("{hours} {} ago", plural(hours, "hour", "hours"))
        } else if days < RELATIVE_DAYS {
            format!("{days} {} ago", plural(days, "day", "days"))
        } else {
            created_at
                .format(&self.date_format)
                .unwrap_or_else(|_| created_at.date().to_string())
        }
    }
}

impl Default for RecencyFormatter {
    fn default() -> Self {
        let date_format = format_description::parse_owned::<1>(DEFAULT_DATE_FORMAT)
            .unwrap_or_else(|_| OwnedFormatItem::Compound(Box::new([])));
        Self { date_format }
    }
}

fn plural<'a>(count: i64, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    const NOW: OffsetDateTime = datetime!(2025-11-20 12:00 UTC);

    fn ago(elapsed: Duration) -> String {
        RecencyFormatter::default().format(NOW - elapsed, NOW)
    }

    #[test]
    fn under_an_hour_is_not_counted() {
        assert_eq!(ago(Duration::minutes(59)), "less than one hour ago");
        assert_eq!(ago(Duration::ZERO), "less than one hour ago");
    }

    #[test]
    fn hours_are_pluralised() {
        assert_eq!(ago(Duration::hours(1)), "1 hour ago");
        assert_eq!(ago(Duration::minutes(150)), "2 hours ago");
        assert_eq!(ago(Duration::hours(23)), "23 hours ago");
    }

    #[test]
    fn days_are_pluralised() {
        assert_eq!(ago(Duration::hours(24)), "1 day ago");
        assert_eq!(ago(Duration::hours(25)), "1 day ago");
        assert_eq!(ago(Duration::days(6)), "6 days ago");
    }

    #[test]
    fn a_week_or_more_shows_the_calendar_date() {
        assert_eq!(ago(Duration::days(7)), "13/11/2025");
        assert_eq!(ago(Duration::days(8)), "12/11/2025");
    }

    #[test]
    fn future_timestamps_read_as_recent() {
        assert_eq!(ago(Duration::hours(-3)), "less than one hour ago");
    }

    #[test]
    fn custom_date_format_is_used_for_old_reports() -> Result<()> {
        let formatter = RecencyFormatter::new("[year]-[month]-[day]")?;
        assert_eq!(formatter.format(NOW - Duration::days(30), NOW), "2025-10-21");
        Ok(())
    }

    #[test]
    fn rejects_malformed_date_format() {
        assert!(RecencyFormatter::new("[day").is_err());
    }
}
