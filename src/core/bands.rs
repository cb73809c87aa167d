//! Progressive rate bands shared by income tax, NI, corporation tax and dividend tax

use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One step of a progressive schedule: `rate` applies from `threshold` up to the next band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Band {
    #[schemars(with = "f64")]
    pub threshold: Decimal,
    #[schemars(with = "f64")]
    pub rate: Decimal,
}

impl Band {
    pub const fn new(threshold: Decimal, rate: Decimal) -> Self {
        Band { threshold, rate }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum BandError {
    #[error("band table is empty")]
    Empty,
    #[error("band threshold {0} is negative")]
    NegativeThreshold(Decimal),
    #[error("band thresholds must be strictly ascending: {next} follows {previous}")]
    Unsorted { previous: Decimal, next: Decimal },
    #[error("band rate {0} is outside 0..=1")]
    RateOutOfRange(Decimal),
}

/// A validated band table: non-empty, thresholds non-negative and strictly ascending,
/// rates within 0..=1. Rates may fall between bands (NI above the upper earnings limit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "Vec<Band>", into = "Vec<Band>")]
pub struct Bands(Vec<Band>);

impl Bands {
    pub fn new(bands: Vec<Band>) -> Result<Self, BandError> {
        if bands.is_empty() {
            return Err(BandError::Empty);
        }
        for band in &bands {
            if band.threshold < Decimal::ZERO {
                return Err(BandError::NegativeThreshold(band.threshold));
            }
            if band.rate < Decimal::ZERO || band.rate > Decimal::ONE {
                return Err(BandError::RateOutOfRange(band.rate));
            }
        }
        for pair in bands.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(BandError::Unsorted {
                    previous: pair[0].threshold,
                    next: pair[1].threshold,
                });
            }
        }
        Ok(Bands(bands))
    }

    pub fn as_slice(&self) -> &[Band] {
        &self.0
    }

    /// Banded amount due on `base`
    pub fn amount(&self, base: Decimal) -> Decimal {
        compute_banded_amount(base, &self.0)
    }

    /// Rate applying to the last pound of `base`
    pub fn marginal_rate(&self, base: Decimal) -> Decimal {
        self.0
            .iter()
            .take_while(|band| band.threshold <= base)
            .last()
            .map_or(Decimal::ZERO, |band| band.rate)
    }

    /// The same schedule with `offset` of band space already consumed by other income.
    ///
    /// `shifted(o).amount(x) == amount(o + x) - amount(o)`
    pub fn shifted(&self, offset: Decimal) -> Bands {
        if offset <= Decimal::ZERO {
            return self.clone();
        }
        let mut shifted = Vec::with_capacity(self.0.len());
        for (i, band) in self.0.iter().enumerate() {
            let upper = self.0.get(i + 1).map(|next| next.threshold);
            if upper.is_some_and(|upper| upper <= offset) {
                continue;
            }
            let threshold = (band.threshold - offset).max(Decimal::ZERO);
            shifted.push(Band::new(threshold, band.rate));
        }
        Bands(shifted)
    }
}

impl TryFrom<Vec<Band>> for Bands {
    type Error = BandError;

    fn try_from(bands: Vec<Band>) -> Result<Self, Self::Error> {
        Bands::new(bands)
    }
}

impl From<Bands> for Vec<Band> {
    fn from(bands: Bands) -> Self {
        bands.0
    }
}

/// Sum of `rate × slice` over every band, where a band's slice is the part of `base`
/// between its threshold and the next band's threshold. The last band is uncapped.
pub fn compute_banded_amount(base: Decimal, bands: &[Band]) -> Decimal {
    let mut total = Decimal::ZERO;
    for (i, band) in bands.iter().enumerate() {
        if base <= band.threshold {
            break;
        }
        let top = match bands.get(i + 1) {
            Some(next) => base.min(next.threshold),
            None => base,
        };
        let slice = (top - band.threshold).max(Decimal::ZERO);
        if !slice.is_zero() {
            log::trace!(
                "band {} @ {}: slice {} -> {}",
                band.threshold,
                band.rate,
                slice,
                slice * band.rate
            );
        }
        total += slice * band.rate;
    }
    total
}

/// Personal allowance after taper: reduced by `taper_rate` for every pound above
/// `taper_threshold`, never below zero.
pub fn compute_allowance(
    gross_annual: Decimal,
    base_allowance: Decimal,
    taper_threshold: Decimal,
    taper_rate: Decimal,
) -> Decimal {
    if gross_annual <= taper_threshold {
        return base_allowance.max(Decimal::ZERO);
    }
    let reduction = (gross_annual - taper_threshold) * taper_rate;
    (base_allowance - reduction).max(Decimal::ZERO)
}

/// Inverse of `base + flat_rate × base + bands.amount(base)`.
///
/// Finds the base whose inclusive cost equals `total`. Used to split an employer's budget
/// into salary plus the charges levied on that salary.
pub fn base_for_inclusive_total(total: Decimal, bands: &Bands, flat_rate: Decimal) -> Decimal {
    if total <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let mut start = Decimal::ZERO;
    let mut start_total = Decimal::ZERO;
    let mut rate = Decimal::ZERO;

    for band in bands.as_slice() {
        if band.threshold > start {
            let slope = Decimal::ONE + flat_rate + rate;
            let end_total = start_total + (band.threshold - start) * slope;
            if total <= end_total {
                return start + (total - start_total) / slope;
            }
            start = band.threshold;
            start_total = end_total;
        }
        rate = band.rate;
    }

    start + (total - start_total) / (Decimal::ONE + flat_rate + rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
    use rust_decimal_macros::dec;

    fn income_tax() -> Bands {
        Bands::new(vec![
            Band::new(dec!(0), dec!(0.20)),
            Band::new(dec!(37700), dec!(0.40)),
            Band::new(dec!(125140), dec!(0.45)),
        ])
        .unwrap()
    }

    fn employee_ni() -> Bands {
        Bands::new(vec![
            Band::new(dec!(0), dec!(0)),
            Band::new(dec!(12570), dec!(0.08)),
            Band::new(dec!(50270), dec!(0.02)),
        ])
        .unwrap()
    }

    fn employer_ni() -> Bands {
        Bands::new(vec![
            Band::new(dec!(0), dec!(0)),
            Band::new(dec!(9100), dec!(0.138)),
        ])
        .unwrap()
    }

    #[test]
    fn below_first_threshold_is_zero() {
        assert_eq!(employee_ni().amount(dec!(12000)), dec!(0));
        assert_eq!(employee_ni().amount(dec!(12570)), dec!(0));
    }

    #[test]
    fn first_threshold_above_zero_leaves_gap_untaxed() {
        let bands = [Band::new(dec!(1000), dec!(0.1))];
        assert_eq!(compute_banded_amount(dec!(500), &bands), dec!(0));
        assert_eq!(compute_banded_amount(dec!(1500), &bands), dec!(50));
    }

    #[test]
    fn income_tax_slices() {
        assert_eq!(income_tax().amount(dec!(27430)), dec!(5486));
        // 37700 @ 20% + 87440 @ 40% + 4860 @ 45%
        assert_eq!(income_tax().amount(dec!(130000)), dec!(44703));
    }

    #[test]
    fn top_band_is_uncapped() {
        let bands = income_tax();
        let at_top = bands.amount(dec!(125140));
        assert_eq!(
            bands.amount(dec!(1125140)) - at_top,
            dec!(1000000) * dec!(0.45)
        );
    }

    #[test]
    fn regressive_top_rate_is_allowed() {
        // 37700 @ 8% + 9730 @ 2%
        assert_eq!(employee_ni().amount(dec!(60000)), dec!(3210.60));
    }

    #[test]
    fn rejects_unsorted_thresholds() {
        let result = Bands::new(vec![
            Band::new(dec!(0), dec!(0.2)),
            Band::new(dec!(50000), dec!(0.4)),
            Band::new(dec!(40000), dec!(0.45)),
        ]);
        assert_eq!(
            result,
            Err(BandError::Unsorted {
                previous: dec!(50000),
                next: dec!(40000)
            })
        );
    }

    #[test]
    fn rejects_duplicate_negative_and_empty() {
        assert_eq!(Bands::new(vec![]), Err(BandError::Empty));
        assert_eq!(
            Bands::new(vec![Band::new(dec!(-1), dec!(0.2))]),
            Err(BandError::NegativeThreshold(dec!(-1)))
        );
        assert!(matches!(
            Bands::new(vec![
                Band::new(dec!(0), dec!(0.2)),
                Band::new(dec!(0), dec!(0.4))
            ]),
            Err(BandError::Unsorted { .. })
        ));
        assert_eq!(
            Bands::new(vec![Band::new(dec!(0), dec!(1.5))]),
            Err(BandError::RateOutOfRange(dec!(1.5)))
        );
    }

    #[test]
    fn deserialization_validates() {
        let ok: Bands =
            serde_json::from_str(r#"[{"threshold": 0, "rate": 0.2}, {"threshold": "37700", "rate": "0.4"}]"#)
                .unwrap();
        assert_eq!(ok.as_slice().len(), 2);

        let err = serde_json::from_str::<Bands>(
            r#"[{"threshold": 100, "rate": 0.2}, {"threshold": 50, "rate": 0.4}]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("strictly ascending"));
    }

    #[test]
    fn marginal_rate_follows_band() {
        let bands = income_tax();
        assert_eq!(bands.marginal_rate(dec!(10000)), dec!(0.20));
        assert_eq!(bands.marginal_rate(dec!(37700)), dec!(0.40));
        assert_eq!(bands.marginal_rate(dec!(200000)), dec!(0.45));
        assert_eq!(employer_ni().marginal_rate(dec!(5000)), dec!(0));
    }

    #[test]
    fn shifted_matches_stacked_difference() {
        let bands = income_tax();
        let offset = dec!(30000);
        let shifted = bands.shifted(offset);
        assert_eq!(shifted.as_slice()[0], Band::new(dec!(0), dec!(0.20)));
        assert_eq!(shifted.as_slice()[1], Band::new(dec!(7700), dec!(0.40)));
        for x in [dec!(0), dec!(5000), dec!(7700), dec!(50000), dec!(200000)] {
            assert_eq!(
                shifted.amount(x),
                bands.amount(offset + x) - bands.amount(offset)
            );
        }
    }

    #[test]
    fn shifted_past_band_boundary_drops_consumed_bands() {
        let shifted = income_tax().shifted(dec!(40000));
        assert_eq!(
            shifted.as_slice(),
            &[
                Band::new(dec!(0), dec!(0.40)),
                Band::new(dec!(85140), dec!(0.45))
            ]
        );
    }

    #[test]
    fn allowance_unchanged_at_or_below_threshold() {
        let allowance = compute_allowance(dec!(100000), dec!(12570), dec!(100000), dec!(0.5));
        assert_eq!(allowance, dec!(12570));
    }

    #[test]
    fn allowance_tapers_and_floors() {
        assert_eq!(
            compute_allowance(dec!(110000), dec!(12570), dec!(100000), dec!(0.5)),
            dec!(7570)
        );
        assert_eq!(
            compute_allowance(dec!(125140), dec!(12570), dec!(100000), dec!(0.5)),
            dec!(0)
        );
        assert_eq!(
            compute_allowance(dec!(500000), dec!(12570), dec!(100000), dec!(0.5)),
            dec!(0)
        );
    }

    #[test]
    fn allowance_taper_rate_is_a_parameter() {
        assert_eq!(
            compute_allowance(dec!(101000), dec!(12570), dec!(100000), dec!(1)),
            dec!(11570)
        );
    }

    #[test]
    fn inclusive_total_inverts_employer_charges() {
        let bands = employer_ni();
        let levy = dec!(0.005);
        for total in [dec!(5000), dec!(9145.5), dec!(58700), dec!(250000)] {
            let base = base_for_inclusive_total(total, &bands, levy);
            let rebuilt = base + base * levy + bands.amount(base);
            assert!((rebuilt - total).abs() < dec!(0.000001), "{total}: {rebuilt}");
        }
    }

    #[test]
    fn inclusive_total_below_threshold_only_pays_flat_rate() {
        let base = base_for_inclusive_total(dec!(1005), &employer_ni(), dec!(0.005));
        assert_eq!(base, dec!(1000));
        assert_eq!(
            base_for_inclusive_total(dec!(-5), &employer_ni(), dec!(0.005)),
            dec!(0)
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_banded_amount_is_monotone(a in 0u64..2_000_000, b in 0u64..2_000_000) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            for bands in [income_tax(), employee_ni(), employer_ni()] {
                prop_assert!(bands.amount(Decimal::from(high)) >= bands.amount(Decimal::from(low)));
            }
        }

        #[test]
        fn prop_zero_base_is_zero(t1 in 0u64..100_000, gap in 1u64..100_000, r1 in 0u32..100, r2 in 0u32..100) {
            let bands = Bands::new(vec![
                Band::new(Decimal::from(t1), Decimal::new(r1.into(), 2)),
                Band::new(Decimal::from(t1 + gap), Decimal::new(r2.into(), 2)),
            ]).unwrap();
            prop_assert_eq!(bands.amount(Decimal::ZERO), Decimal::ZERO);
        }

        #[test]
        fn prop_allowance_never_negative(gross in 0u64..1_000_000, taper_pct in 0u32..=100) {
            let allowance = compute_allowance(
                Decimal::from(gross),
                dec!(12570),
                dec!(100000),
                Decimal::new(taper_pct.into(), 2),
            );
            prop_assert!(allowance >= Decimal::ZERO);
            prop_assert!(allowance <= dec!(12570));
            if gross <= 100_000 {
                prop_assert_eq!(allowance, dec!(12570));
            }
        }
    }
}
