//! Where an income sits in the UK income distribution

use super::error::CalculationError;
use serde::Serialize;

/// Income known to sit at a given population percentile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileAnchor {
    pub income: f64,
    pub percentile: f64,
}

const fn anchor(income: f64, percentile: f64) -> PercentileAnchor {
    PercentileAnchor { income, percentile }
}

/// Strictly increasing in both income and percentile
pub const PERCENTILE_ANCHORS: [PercentileAnchor; 10] = [
    anchor(12_000.0, 10.0),
    anchor(20_000.0, 25.0),
    anchor(26_000.0, 40.0),
    anchor(31_000.0, 50.0),
    anchor(38_000.0, 62.0),
    anchor(48_000.0, 75.0),
    anchor(60_000.0, 85.0),
    anchor(80_000.0, 92.0),
    anchor(100_000.0, 95.0),
    anchor(150_000.0, 98.0),
];

pub const MAX_PERCENTILE: f64 = 99.9;

/// Percentile (0 to 99.9) for an annual income.
///
/// Linear between anchors. Above the top anchor the percentile grows with
/// `log10(income / top + 1)` towards 100, capped at 99.9.
pub fn estimate_percentile_from_income(income: f64) -> f64 {
    percentile_from_anchors(income, &PERCENTILE_ANCHORS)
}

/// Approximate income at a percentile.
///
/// Linear between anchors. Above the top anchor income grows geometrically by 8% per
/// percentile point, which is not the inverse of the extrapolation used by
/// [`estimate_percentile_from_income`].
pub fn get_income_for_percentile(target_percentile: f64) -> f64 {
    income_from_anchors(target_percentile, &PERCENTILE_ANCHORS)
}

fn percentile_from_anchors(income: f64, anchors: &[PercentileAnchor]) -> f64 {
    if !income.is_finite() || income <= 0.0 {
        return 0.0;
    }
    let (Some(first), Some(last)) = (anchors.first(), anchors.last()) else {
        return 0.0;
    };
    if income <= first.income {
        return first.percentile;
    }
    if income > last.income {
        let growth = (income / last.income + 1.0).log10() * 0.5 * (100.0 - last.percentile);
        return (last.percentile + growth).min(MAX_PERCENTILE);
    }

    for pair in anchors.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if income <= upper.income {
            let position = (income - lower.income) / (upper.income - lower.income);
            return lower.percentile + position * (upper.percentile - lower.percentile);
        }
    }
    last.percentile
}

fn income_from_anchors(target: f64, anchors: &[PercentileAnchor]) -> f64 {
    if !target.is_finite() || target <= 0.0 {
        return 0.0;
    }
    let (Some(first), Some(last)) = (anchors.first(), anchors.last()) else {
        return 0.0;
    };
    let target = target.min(MAX_PERCENTILE);
    if target <= first.percentile {
        return first.income;
    }
    if target > last.percentile {
        return last.income * 1.08_f64.powf(target - last.percentile);
    }

    for pair in anchors.windows(2) {
        let (lower, upper) = (pair[0], pair[1]);
        if target <= upper.percentile {
            let position = (target - lower.percentile) / (upper.percentile - lower.percentile);
            return lower.income + position * (upper.income - lower.income);
        }
    }
    last.income
}

pub const CURVE_MEAN: f64 = 60.0;
pub const CURVE_SIGMA: f64 = 18.0;
/// Finest sampling accepted: 10,001 points
pub const MIN_CURVE_STEP: f64 = 0.01;

/// One point of the illustrative distribution curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityPoint {
    pub percentile: f64,
    pub density: f64,
}

/// Gaussian bell (mean 60, sigma 18) sampled every `step` percentiles from 0 to 100.
///
/// For charts only; it is not fitted to [`PERCENTILE_ANCHORS`]. Steps finer than
/// [`MIN_CURVE_STEP`] are rejected.
pub fn build_wealth_curve_data(step: f64) -> Result<Vec<DensityPoint>, CalculationError> {
    if !step.is_finite() || step < MIN_CURVE_STEP {
        return Err(CalculationError::InvalidStep(step));
    }

    let norm = 1.0 / (CURVE_SIGMA * (2.0 * std::f64::consts::PI).sqrt());
    let samples = (100.0 / step + 1e-9).floor() as usize;
    let points = (0..=samples)
        .map(|i| {
            let percentile = i as f64 * step;
            let z = (percentile - CURVE_MEAN) / CURVE_SIGMA;
            DensityPoint {
                percentile,
                density: norm * (-0.5 * z * z).exp(),
            }
        })
        .collect();
    Ok(points)
}
