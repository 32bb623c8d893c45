//! The year or month a dashboard summarises.

use std::ops::RangeInclusive;

use time::{Date, Month};

use crate::Error;

/// A calendar year, or a single month of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    year: i32,
    /// 1 to 12, or 0 for the whole year.
    month: u8,
}

impl Period {
    /// # Errors
    ///
    /// Returns [Error::InvalidPeriod] if `month` is greater than 12 or the
    /// year cannot be represented as a date.
    pub fn new(year: i32, month: u8) -> Result<Self, Error> {
        let period = Self { year, month };

        if month > 12 {
            return Err(period.invalid());
        }

        period.bounds()?;

        Ok(period)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The selected month, or `None` for the whole year.
    pub fn month(&self) -> Option<Month> {
        match self.month {
            0 => None,
            month => Month::try_from(month).ok(),
        }
    }

    /// The first and last day of the period, inclusive.
    pub fn bounds(&self) -> Result<RangeInclusive<Date>, Error> {
        match self.month() {
            None => {
                let start = Date::from_calendar_date(self.year, Month::January, 1)
                    .map_err(|_| self.invalid())?;
                let end = Date::from_calendar_date(self.year, Month::December, 31)
                    .map_err(|_| self.invalid())?;

                Ok(start..=end)
            }
            Some(month) => month_bounds(self.year, month).ok_or_else(|| self.invalid()),
        }
    }

    /// The first and last day of the whole year the period falls in.
    pub fn year_bounds(&self) -> Result<RangeInclusive<Date>, Error> {
        Period {
            year: self.year,
            month: 0,
        }
        .bounds()
    }

    fn invalid(&self) -> Error {
        Error::InvalidPeriod {
            year: self.year,
            month: self.month,
        }
    }
}

fn month_bounds(year: i32, month: Month) -> Option<RangeInclusive<Date>> {
    let start = Date::from_calendar_date(year, month, 1).ok()?;
    let end = start.replace_day(month.length(year)).ok()?;

    Some(start..=end)
}
