//! Per-year tax constants and the registry they are looked up from

use super::bands::{Band, BandError, Bands};
use super::error::CalculationError;
use super::student_loan::StudentLoanPlan;
use super::uk::TaxYear;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{year} {schedule}: {source}")]
    Bands {
        year: TaxYear,
        schedule: &'static str,
        source: BandError,
    },
    #[error("{year}: personal allowance taper rate {rate} is outside 0..=1")]
    TaperRate { year: TaxYear, rate: Decimal },
    #[error("{year}: {field} must not be negative")]
    Negative { year: TaxYear, field: &'static str },
    #[error("{year}: qualifying earnings lower limit {lower} exceeds upper limit {upper}")]
    QualifyingEarnings {
        year: TaxYear,
        lower: Decimal,
        upper: Decimal,
    },
    #[error("{year}: student loan {plan} has invalid terms (threshold {threshold}, rate {rate})")]
    StudentLoanTerms {
        year: TaxYear,
        plan: StudentLoanPlan,
        threshold: Decimal,
        rate: Decimal,
    },
}

/// Tax-free personal allowance and its high-income taper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PersonalAllowance {
    #[schemars(with = "f64")]
    pub amount: Decimal,
    /// Income above which the allowance is withdrawn
    #[schemars(with = "f64")]
    pub taper_threshold: Decimal,
    /// Allowance lost per pound above the threshold (0.5 = £1 for every £2)
    #[schemars(with = "f64")]
    pub taper_rate: Decimal,
}

/// Auto-enrolment qualifying earnings band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QualifyingEarnings {
    #[schemars(with = "f64")]
    pub lower: Decimal,
    #[serde(default)]
    #[schemars(with = "Option<f64>")]
    pub upper: Option<Decimal>,
}

impl QualifyingEarnings {
    /// Part of `salary` that pension contributions are calculated on
    pub fn of(&self, salary: Decimal) -> Decimal {
        let above_lower = (salary - self.lower).max(Decimal::ZERO);
        match self.upper {
            Some(upper) => above_lower.min((upper - self.lower).max(Decimal::ZERO)),
            None => above_lower,
        }
    }
}

/// Repayment terms for one student loan plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlanTerms {
    #[schemars(with = "f64")]
    pub threshold: Decimal,
    #[schemars(with = "f64")]
    pub rate: Decimal,
    pub label: String,
}

impl PlanTerms {
    fn new(threshold: Decimal, rate: Decimal, label: &str) -> Self {
        PlanTerms {
            threshold,
            rate,
            label: label.to_string(),
        }
    }
}

/// Student loan plans configured for a tax year. An absent plan repays nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StudentLoanTable {
    #[serde(default)]
    pub plan1: Option<PlanTerms>,
    #[serde(default)]
    pub plan2: Option<PlanTerms>,
    #[serde(default)]
    pub plan4: Option<PlanTerms>,
    #[serde(default)]
    pub plan5: Option<PlanTerms>,
    #[serde(default)]
    pub postgraduate: Option<PlanTerms>,
}

impl StudentLoanTable {
    pub fn terms(&self, plan: StudentLoanPlan) -> Option<&PlanTerms> {
        match plan {
            StudentLoanPlan::Plan1 => self.plan1.as_ref(),
            StudentLoanPlan::Plan2 => self.plan2.as_ref(),
            StudentLoanPlan::Plan4 => self.plan4.as_ref(),
            StudentLoanPlan::Plan5 => self.plan5.as_ref(),
            StudentLoanPlan::Postgraduate => self.postgraduate.as_ref(),
        }
    }
}

/// Immutable constants for one tax year
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaxYearConfig {
    #[schemars(with = "String")]
    pub tax_year: TaxYear,
    pub personal_allowance: PersonalAllowance,
    /// Income tax on income above the personal allowance
    pub income_tax: Bands,
    /// Class 1 primary (employee) National Insurance
    pub employee_ni: Bands,
    /// Class 1 secondary (employer) National Insurance
    pub employer_ni: Bands,
    /// Class 4 National Insurance on self-employed profits
    pub self_employed_ni: Bands,
    #[schemars(with = "f64")]
    pub apprenticeship_levy_rate: Decimal,
    pub pension: QualifyingEarnings,
    pub student_loans: StudentLoanTable,
    pub corporation_tax: Bands,
    /// Dividend tax on taxable income, stacked above other income
    pub dividend_tax: Bands,
    #[schemars(with = "f64")]
    pub dividend_allowance: Decimal,
}

impl TaxYearConfig {
    /// Cross-field checks; band tables validate themselves on construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let year = self.tax_year;
        let pa = &self.personal_allowance;
        if pa.taper_rate < Decimal::ZERO || pa.taper_rate > Decimal::ONE {
            return Err(ConfigError::TaperRate {
                year,
                rate: pa.taper_rate,
            });
        }
        let non_negative = [
            ("personal_allowance.amount", pa.amount),
            ("personal_allowance.taper_threshold", pa.taper_threshold),
            ("apprenticeship_levy_rate", self.apprenticeship_levy_rate),
            ("pension.lower", self.pension.lower),
            ("dividend_allowance", self.dividend_allowance),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(ConfigError::Negative { year, field });
            }
        }
        if let Some(upper) = self.pension.upper {
            if upper < self.pension.lower {
                return Err(ConfigError::QualifyingEarnings {
                    year,
                    lower: self.pension.lower,
                    upper,
                });
            }
        }
        for plan in StudentLoanPlan::ALL {
            if let Some(terms) = self.student_loans.terms(plan) {
                let rate_ok = terms.rate >= Decimal::ZERO && terms.rate <= Decimal::ONE;
                if !rate_ok || terms.threshold < Decimal::ZERO {
                    return Err(ConfigError::StudentLoanTerms {
                        year,
                        plan,
                        threshold: terms.threshold,
                        rate: terms.rate,
                    });
                }
            }
        }
        Ok(())
    }
}

/// All configured tax years, validated once when built
#[derive(Debug, Clone, Default)]
pub struct TaxYearRegistry {
    years: BTreeMap<TaxYear, TaxYearConfig>,
}

impl TaxYearRegistry {
    /// Registry with the tax years compiled into the binary
    pub fn builtin() -> Result<Self, ConfigError> {
        let mut registry = TaxYearRegistry::default();
        registry.insert(tax_year_2024_25()?)?;
        registry.insert(tax_year_2025_26()?)?;
        Ok(registry)
    }

    /// Add or replace a tax year
    pub fn insert(&mut self, config: TaxYearConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if self.years.contains_key(&config.tax_year) {
            log::info!("Replacing configuration for tax year {}", config.tax_year);
        }
        self.years.insert(config.tax_year, config);
        Ok(())
    }

    /// Read a JSON array of tax-year records and add them to the registry.
    ///
    /// Every record is validated first; if any fails, the registry is left unchanged.
    pub fn load_json<R: Read>(&mut self, reader: R) -> anyhow::Result<usize> {
        let configs: Vec<TaxYearConfig> = serde_json::from_reader(reader)?;
        for config in &configs {
            config.validate()?;
        }
        let count = configs.len();
        for config in configs {
            self.insert(config)?;
        }
        log::info!("Loaded {} tax year configuration record(s)", count);
        Ok(count)
    }

    pub fn get(&self, year: TaxYear) -> Result<&TaxYearConfig, CalculationError> {
        self.years
            .get(&year)
            .ok_or_else(|| CalculationError::UnknownTaxYear(year.label()))
    }

    pub fn years(&self) -> impl Iterator<Item = TaxYear> + '_ {
        self.years.keys().copied()
    }

    pub fn latest(&self) -> Option<TaxYear> {
        self.years.keys().next_back().copied()
    }

    /// The tax year containing today, or the latest configured year if that is missing
    pub fn default_year(&self) -> Result<TaxYear, CalculationError> {
        let current = TaxYear::current();
        if self.years.contains_key(&current) {
            return Ok(current);
        }
        let latest = self
            .latest()
            .ok_or_else(|| CalculationError::UnknownTaxYear(current.label()))?;
        log::warn!(
            "Tax year {} is not configured, falling back to {}",
            current,
            latest
        );
        Ok(latest)
    }
}

fn bands(
    year: TaxYear,
    schedule: &'static str,
    bands: &[(Decimal, Decimal)],
) -> Result<Bands, ConfigError> {
    let bands = bands
        .iter()
        .map(|&(threshold, rate)| Band::new(threshold, rate))
        .collect();
    Bands::new(bands).map_err(|source| ConfigError::Bands {
        year,
        schedule,
        source,
    })
}

/// Schedules unchanged between 2024-25 and 2025-26
fn common_config(
    year: TaxYear,
    employer_ni: Bands,
    student_loans: StudentLoanTable,
) -> Result<TaxYearConfig, ConfigError> {
    Ok(TaxYearConfig {
        tax_year: year,
        personal_allowance: PersonalAllowance {
            amount: dec!(12570),
            taper_threshold: dec!(100000),
            taper_rate: dec!(0.5),
        },
        income_tax: bands(
            year,
            "income_tax",
            &[
                (dec!(0), dec!(0.20)),
                (dec!(37700), dec!(0.40)),
                (dec!(125140), dec!(0.45)),
            ],
        )?,
        employee_ni: bands(
            year,
            "employee_ni",
            &[
                (dec!(0), dec!(0)),
                (dec!(12570), dec!(0.08)),
                (dec!(50270), dec!(0.02)),
            ],
        )?,
        employer_ni,
        self_employed_ni: bands(
            year,
            "self_employed_ni",
            &[
                (dec!(0), dec!(0)),
                (dec!(12570), dec!(0.06)),
                (dec!(50270), dec!(0.02)),
            ],
        )?,
        apprenticeship_levy_rate: dec!(0.005),
        pension: QualifyingEarnings {
            lower: dec!(6240),
            upper: Some(dec!(50270)),
        },
        student_loans,
        // Marginal relief between the small profits and main rate limits
        corporation_tax: bands(
            year,
            "corporation_tax",
            &[
                (dec!(0), dec!(0.19)),
                (dec!(50000), dec!(0.265)),
                (dec!(250000), dec!(0.25)),
            ],
        )?,
        dividend_tax: bands(
            year,
            "dividend_tax",
            &[
                (dec!(0), dec!(0.0875)),
                (dec!(37700), dec!(0.3375)),
                (dec!(125140), dec!(0.3935)),
            ],
        )?,
        dividend_allowance: dec!(500),
    })
}

fn tax_year_2024_25() -> Result<TaxYearConfig, ConfigError> {
    let year = TaxYear(2025);
    let employer_ni = bands(
        year,
        "employer_ni",
        &[(dec!(0), dec!(0)), (dec!(9100), dec!(0.138))],
    )?;
    let student_loans = StudentLoanTable {
        plan1: Some(PlanTerms::new(dec!(24990), dec!(0.09), "Plan 1")),
        plan2: Some(PlanTerms::new(dec!(27295), dec!(0.09), "Plan 2")),
        plan4: Some(PlanTerms::new(dec!(31395), dec!(0.09), "Plan 4")),
        plan5: Some(PlanTerms::new(dec!(25000), dec!(0.09), "Plan 5")),
        postgraduate: Some(PlanTerms::new(dec!(21000), dec!(0.06), "Postgraduate")),
    };
    common_config(year, employer_ni, student_loans)
}

fn tax_year_2025_26() -> Result<TaxYearConfig, ConfigError> {
    let year = TaxYear(2026);
    let employer_ni = bands(
        year,
        "employer_ni",
        &[(dec!(0), dec!(0)), (dec!(5000), dec!(0.15))],
    )?;
    let student_loans = StudentLoanTable {
        plan1: Some(PlanTerms::new(dec!(26065), dec!(0.09), "Plan 1")),
        plan2: Some(PlanTerms::new(dec!(28470), dec!(0.09), "Plan 2")),
        plan4: Some(PlanTerms::new(dec!(32745), dec!(0.09), "Plan 4")),
        plan5: Some(PlanTerms::new(dec!(25000), dec!(0.09), "Plan 5")),
        postgraduate: Some(PlanTerms::new(dec!(21000), dec!(0.06), "Postgraduate")),
    };
    common_config(year, employer_ni, student_loans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_years_load() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let years: Vec<_> = registry.years().collect();
        assert_eq!(years, vec![TaxYear(2025), TaxYear(2026)]);
        assert_eq!(registry.latest(), Some(TaxYear(2026)));
    }

    #[test]
    fn visible_2024_25_constants() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let config = registry.get(TaxYear(2025)).unwrap();
        assert_eq!(config.personal_allowance.amount, dec!(12570));
        assert_eq!(config.employee_ni.marginal_rate(dec!(30000)), dec!(0.08));
        let loans = &config.student_loans;
        assert_eq!(loans.terms(StudentLoanPlan::Plan1).unwrap().threshold, dec!(24990));
        assert_eq!(loans.terms(StudentLoanPlan::Plan2).unwrap().threshold, dec!(27295));
        assert_eq!(loans.terms(StudentLoanPlan::Plan4).unwrap().threshold, dec!(31395));
        assert_eq!(loans.terms(StudentLoanPlan::Plan5).unwrap().threshold, dec!(25000));
    }

    #[test]
    fn unknown_year_is_an_error() {
        let registry = TaxYearRegistry::builtin().unwrap();
        assert_eq!(
            registry.get(TaxYear(2019)).unwrap_err(),
            CalculationError::UnknownTaxYear("2018-19".to_string())
        );
    }

    #[test]
    fn qualifying_earnings_band() {
        let band = QualifyingEarnings {
            lower: dec!(6240),
            upper: Some(dec!(50270)),
        };
        assert_eq!(band.of(dec!(5000)), dec!(0));
        assert_eq!(band.of(dec!(40000)), dec!(33760));
        assert_eq!(band.of(dec!(90000)), dec!(44030));

        let uncapped = QualifyingEarnings {
            lower: dec!(6240),
            upper: None,
        };
        assert_eq!(uncapped.of(dec!(90000)), dec!(83760));
    }

    #[test]
    fn insert_rejects_invalid_records() {
        let mut registry = TaxYearRegistry::builtin().unwrap();
        let mut config = registry.get(TaxYear(2026)).unwrap().clone();
        config.personal_allowance.taper_rate = dec!(2);
        assert_eq!(
            registry.insert(config.clone()),
            Err(ConfigError::TaperRate {
                year: TaxYear(2026),
                rate: dec!(2)
            })
        );

        config.personal_allowance.taper_rate = dec!(0.5);
        config.pension.upper = Some(dec!(1000));
        assert!(matches!(
            registry.insert(config),
            Err(ConfigError::QualifyingEarnings { .. })
        ));
    }

    #[test]
    fn config_round_trips_through_json() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let config = registry.get(TaxYear(2025)).unwrap().clone();
        let mut next = config.clone();
        next.tax_year = TaxYear(2027);
        next.student_loans.plan5 = None;

        let json = serde_json::to_string(&vec![next]).unwrap();
        let mut loaded = TaxYearRegistry::builtin().unwrap();
        assert_eq!(loaded.load_json(json.as_bytes()).unwrap(), 1);
        let added = loaded.get(TaxYear(2027)).unwrap();
        assert_eq!(added.tax_year.label(), "2026-27");
        assert!(added.student_loans.terms(StudentLoanPlan::Plan5).is_none());
        assert_eq!(added.income_tax, config.income_tax);
    }

    #[test]
    fn loading_malformed_bands_fails() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let config = registry.get(TaxYear(2025)).unwrap();
        let mut value = serde_json::to_value(vec![config]).unwrap();
        value[0]["income_tax"][1]["threshold"] = serde_json::json!("0");

        let mut loaded = TaxYearRegistry::default();
        let err = loaded.load_json(value.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("strictly ascending"), "{err}");
    }

    #[test]
    fn failed_load_leaves_registry_unchanged() {
        let registry = TaxYearRegistry::builtin().unwrap();
        let mut good = registry.get(TaxYear(2026)).unwrap().clone();
        good.tax_year = TaxYear(2027);
        let mut bad = good.clone();
        bad.tax_year = TaxYear(2028);
        bad.personal_allowance.taper_rate = dec!(3);

        let json = serde_json::to_string(&vec![good, bad]).unwrap();
        let mut loaded = TaxYearRegistry::builtin().unwrap();
        let err = loaded.load_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("taper rate"), "{err}");
        assert_eq!(loaded.years().collect::<Vec<_>>(), vec![TaxYear(2025), TaxYear(2026)]);
    }
}
