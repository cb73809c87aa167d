use super::error::CalculationError;
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// UK Tax Year (runs 6 April to 5 April)
/// The year value represents the end year (e.g., 2025 = 2024-25 tax year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxYear(pub i32);

impl TaxYear {
    /// Create a tax year from a date
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        // 6 April or later belongs to the tax year ending next April
        if (date.month(), date.day()) >= (4, 6) {
            TaxYear(year + 1)
        } else {
            TaxYear(year)
        }
    }

    /// Tax year containing today's local date
    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Start date of the tax year (6 April of previous year)
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0 - 1, 4, 6)
    }

    /// End date of the tax year (5 April)
    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0, 4, 5)
    }

    /// Label in "2024-25" format
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.0 - 1, self.0.rem_euclid(100))
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Accepts "2024-25", "2024/25" or the end year on its own ("2025").
impl FromStr for TaxYear {
    type Err = CalculationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || CalculationError::UnknownTaxYear(s.to_string());
        let trimmed = s.trim();

        match trimmed.split_once(['-', '/']) {
            Some((start, end)) => {
                let start: i32 = start.parse().map_err(|_| unknown())?;
                let end: i32 = end.parse().map_err(|_| unknown())?;
                if end != (start + 1).rem_euclid(100) || end >= 100 {
                    return Err(unknown());
                }
                Ok(TaxYear(start + 1))
            }
            None => {
                let end_year: i32 = trimmed.parse().map_err(|_| unknown())?;
                if !(1000..=9999).contains(&end_year) {
                    return Err(unknown());
                }
                Ok(TaxYear(end_year))
            }
        }
    }
}

impl TryFrom<String> for TaxYear {
    type Error = CalculationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaxYear> for String {
    fn from(year: TaxYear) -> Self {
        year.label()
    }
}
