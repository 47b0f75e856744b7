//! Trading-calendar resolution: most recent valid session for a reference
//! date, skipping weekends and a fixed holiday set.

use std::collections::BTreeSet;

use time::{Date, Weekday};

use crate::domain::TradingDate;

/// Immutable session calendar for a single exchange.
///
/// Holiday membership is a plain date set; the resolver walks backward one
/// day at a time and always terminates as long as the set does not cover an
/// entire week.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    holidays: BTreeSet<Date>,
}

impl TradingCalendar {
    pub fn new(holidays: impl IntoIterator<Item = Date>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// US equity market holidays for 2025.
    pub fn us_2025() -> Self {
        const HOLIDAYS: [(u8, u8); 10] = [
            (1, 1),
            (1, 20),
            (2, 17),
            (4, 18),
            (5, 26),
            (6, 19),
            (7, 4),
            (9, 1),
            (11, 27),
            (12, 25),
        ];

        Self::new(HOLIDAYS.iter().map(|&(month, day)| {
            Date::from_calendar_date(
                2025,
                time::Month::try_from(month).expect("holiday month is valid"),
                day,
            )
            .expect("holiday date is valid")
        }))
    }

    pub fn is_session(&self, date: Date) -> bool {
        !is_weekend(date) && !self.holidays.contains(&date)
    }

    /// Closest session strictly before `reference`.
    pub fn latest_session(&self, reference: Date) -> TradingDate {
        let mut current = previous_day(reference);
        while !self.is_session(current) {
            current = previous_day(current);
        }
        TradingDate::new(current)
    }

    /// Last `n` sessions strictly before `reference`, oldest first.
    pub fn last_n_sessions(&self, reference: Date, n: usize) -> Vec<TradingDate> {
        let mut sessions = Vec::with_capacity(n);
        let mut current = previous_day(reference);
        while sessions.len() < n {
            if self.is_session(current) {
                sessions.push(TradingDate::new(current));
            }
            current = previous_day(current);
        }
        sessions.reverse();
        sessions
    }
}

fn is_weekend(date: Date) -> bool {
    matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

fn previous_day(date: Date) -> Date {
    date.previous_day().expect("calendar walk stays in range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn date(year: i32, month: u8, day: u8) -> Date {
        Date::from_calendar_date(year, Month::try_from(month).expect("month"), day)
            .expect("date")
    }

    #[test]
    fn resolves_friday_from_a_monday_reference() {
        let calendar = TradingCalendar::us_2025();
        // 2025-06-02 is a Monday; the prior session is Friday 2025-05-30.
        let session = calendar.latest_session(date(2025, 6, 2));
        assert_eq!(session.to_string(), "2025-05-30");
    }

    #[test]
    fn skips_holiday_runs() {
        let calendar = TradingCalendar::us_2025();
        // 2025-06-20 is the Friday after Juneteenth (Thursday 06-19).
        let session = calendar.latest_session(date(2025, 6, 20));
        assert_eq!(session.to_string(), "2025-06-18");
    }

    #[test]
    fn never_returns_weekend_or_holiday() {
        let calendar = TradingCalendar::us_2025();
        let mut reference = date(2025, 1, 1);
        for _ in 0..365 {
            let session = calendar.latest_session(reference);
            assert!(calendar.is_session(session.as_date()), "{session}");
            assert!(session.as_date() < reference);
            reference = reference.next_day().expect("in range");
        }
    }

    #[test]
    fn last_n_sessions_is_oldest_first() {
        let calendar = TradingCalendar::us_2025();
        let sessions = calendar.last_n_sessions(date(2025, 6, 2), 3);
        let rendered: Vec<String> = sessions.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["2025-05-28", "2025-05-29", "2025-05-30"]);
    }
}
