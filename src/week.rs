use time::{Date, Duration};

pub(crate) const DAYS_IN_WEEK: usize = 7;

/// A Monday-through-Sunday week
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
// Invariant: The first element is a Monday, and each element is the day after
// the element before it.
pub(crate) struct Week([Date; DAYS_IN_WEEK]);

impl Week {
    /// Returns the week containing the given date, which can be at any day of
    /// the week.
    ///
    /// Returns `None` if some day of the week lies outside the range of
    /// [`Date`].
    pub(crate) fn containing(date: Date) -> Option<Week> {
        let since_monday = date.weekday().number_days_from_monday();
        let monday = date.checked_sub(Duration::days(i64::from(since_monday)))?;
        let mut days = [monday; DAYS_IN_WEEK];
        let mut current = monday;
        for slot in days.iter_mut().skip(1) {
            current = current.next_day()?;
            *slot = current;
        }
        Some(Week(days))
    }

    /// The Monday
    pub(crate) fn start(&self) -> Date {
        self.0[0]
    }

    /// The Sunday
    pub(crate) fn end(&self) -> Date {
        self.0[DAYS_IN_WEEK - 1]
    }

    pub(crate) fn days(&self) -> impl Iterator<Item = Date> {
        self.0.into_iter()
    }

    /// Returns the zero-based column (Monday = 0) at which `date` appears in
    /// the week, if it appears at all
    pub(crate) fn position(&self, date: Date) -> Option<usize> {
        self.0.iter().position(|&d| d == date)
    }

    pub(crate) fn contains(&self, date: Date) -> bool {
        (self.start()..=self.end()).contains(&date)
    }
}
