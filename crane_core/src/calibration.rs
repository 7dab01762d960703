//! Linear ADC -> mass calibration.

use crate::error::CalibrationError;

/// Factory table recorded against reference coils: `(raw ADC, tonnes)`.
pub const DEFAULT_TABLE: [(i64, f64); 8] = [
    (657, 0.0),
    (1282, 1.488),
    (1639, 2.466),
    (1884, 2.97),
    (2077, 3.168),
    (2229, 3.568),
    (2370, 3.762),
    (3808, 6.9),
];

/// `mass = slope * adc + intercept`, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationModel {
    slope: f64,
    intercept: f64,
}

impl CalibrationModel {
    /// Ordinary least-squares fit over `(adc, mass)` points.
    pub fn fit(points: &[(i64, f64)]) -> Result<Self, CalibrationError> {
        if points.is_empty() {
            return Err(CalibrationError::Empty);
        }
        if let Some(idx) = points.iter().position(|(_, m)| !m.is_finite()) {
            return Err(CalibrationError::NonFinite(idx));
        }
        let mut xs: Vec<i64> = points.iter().map(|p| p.0).collect();
        xs.sort_unstable();
        xs.dedup();
        if xs.len() < 2 {
            return Err(CalibrationError::NotEnoughDistinct(xs.len()));
        }

        // Centered sums in f64 for numerical stability
        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0 as f64).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
        let mut sxx = 0.0f64;
        let mut sxy = 0.0f64;
        for (adc, mass) in points {
            let dx = *adc as f64 - mean_x;
            sxx += dx * dx;
            sxy += dx * (mass - mean_y);
        }
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        Self::from_coefficients(slope, intercept)
    }

    /// Use a previously fitted line.
    pub fn from_coefficients(slope: f64, intercept: f64) -> Result<Self, CalibrationError> {
        if !(slope.is_finite() && intercept.is_finite()) {
            return Err(CalibrationError::Degenerate);
        }
        Ok(Self { slope, intercept })
    }

    /// Fit of [`DEFAULT_TABLE`].
    pub fn factory() -> Result<Self, CalibrationError> {
        Self::fit(&DEFAULT_TABLE)
    }

    #[inline]
    pub fn predict(&self, adc: i64) -> f64 {
        self.slope * adc as f64 + self.intercept
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}
