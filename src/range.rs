//! `day_count` is `(end - start)` in whole days, exclusive of `end`. The
//! upstream's newest point is the previous day, so a lookback of `day_count`
//! days covers `start ..= end - 1`, which is what `ResolvedRange::contains` keeps.

use chrono::NaiveDate;

use crate::domain::{DateRangeSelection, ResolvedRange};
use crate::error::CovidError;

pub const DATASET_EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(2020, 1, 22) {
    Some(date) => date,
    None => panic!("invalid dataset epoch"),
};

pub const DEFAULT_SUPPORTED_YEARS: [i32; 3] = [2020, 2021, 2022];

#[derive(Debug, Clone)]
pub struct RangeResolver {
    supported_years: Vec<i32>,
}

impl Default for RangeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPORTED_YEARS.to_vec())
    }
}

impl RangeResolver {
    pub fn new(mut supported_years: Vec<i32>) -> Self {
        supported_years.sort_unstable();
        supported_years.dedup();
        Self { supported_years }
    }

    pub fn supported_years(&self) -> &[i32] {
        &self.supported_years
    }

    pub fn resolve(
        &self,
        selection: DateRangeSelection,
        today: NaiveDate,
    ) -> Result<ResolvedRange, CovidError> {
        let start = match selection {
            DateRangeSelection::Default => DATASET_EPOCH,
            DateRangeSelection::ExplicitDate(date) => date,
            DateRangeSelection::ExplicitYear(year) => self.year_start(year)?,
        };
        resolve_between(start, today)
    }

    fn year_start(&self, year: i32) -> Result<NaiveDate, CovidError> {
        if !self.supported_years.contains(&year) {
            return Err(CovidError::UnsupportedYear {
                year,
                supported: self
                    .supported_years
                    .iter()
                    .map(|year| year.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        NaiveDate::from_ymd_opt(year, 1, 1).ok_or(CovidError::UnsupportedYear {
            year,
            supported: String::new(),
        })
    }
}

pub fn resolve_between(start: NaiveDate, end: NaiveDate) -> Result<ResolvedRange, CovidError> {
    if start >= end {
        return Err(CovidError::InvalidRange { start, end });
    }
    let day_count = days_between(start, end);
    Ok(ResolvedRange {
        start,
        end,
        day_count: u32::try_from(day_count).map_err(|_| CovidError::InvalidRange { start, end })?,
    })
}

pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().max(0)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_starts_at_epoch() {
        let range = RangeResolver::default()
            .resolve(DateRangeSelection::Default, date(2020, 1, 25))
            .unwrap();
        assert_eq!(range.start, DATASET_EPOCH);
        assert_eq!(range.day_count, 3);
    }

    #[test]
    fn same_day_is_rejected() {
        let today = date(2021, 3, 1);
        let err = RangeResolver::default()
            .resolve(DateRangeSelection::ExplicitDate(today), today)
            .unwrap_err();
        assert_matches!(err, CovidError::InvalidRange { .. });
    }

    #[test]
    fn supported_years_are_normalized() {
        let resolver = RangeResolver::new(vec![2022, 2020, 2022]);
        assert_eq!(resolver.supported_years(), &[2020, 2022]);
    }
}
