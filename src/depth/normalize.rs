use ndarray::{Array, ArrayBase, Data, Dimension};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Raw depth substituted for sensor "no return" samples (value 0).
pub const INVALID_DEPTH_SENTINEL: f64 = 100_000.0;
/// Added before inversion so a zero distance never divides by zero.
pub const DIVISION_EPSILON: f64 = 1e-20;
/// Share of the brightest diopter samples treated as outliers.
pub const OUTLIER_FRACTION: f64 = 0.008;
/// Diopter value the robust near-maximum sample is mapped to.
pub const REFERENCE_DIOPTER: f64 = 0.61;

// ---------------------------------------------------------------------------
// NormalizerConfig
// ---------------------------------------------------------------------------

/// Tunable constants of the depth → diopter conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub invalid_sentinel: f64,
    pub epsilon: f64,
    pub outlier_fraction: f64,
    pub reference_diopter: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            invalid_sentinel: INVALID_DEPTH_SENTINEL,
            epsilon: DIVISION_EPSILON,
            outlier_fraction: OUTLIER_FRACTION,
            reference_diopter: REFERENCE_DIOPTER,
        }
    }
}

impl NormalizerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.invalid_sentinel.is_finite() && self.invalid_sentinel > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "invalid_sentinel must be positive, got {}",
                self.invalid_sentinel
            )));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "epsilon must be non-negative, got {}",
                self.epsilon
            )));
        }
        if !(self.outlier_fraction > 0.0 && self.outlier_fraction < 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "outlier_fraction must lie in (0, 1), got {}",
                self.outlier_fraction
            )));
        }
        if !(self.reference_diopter.is_finite() && self.reference_diopter > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "reference_diopter must be positive, got {}",
                self.reference_diopter
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DepthNormalizer
// ---------------------------------------------------------------------------

/// Converts raw sensor depth into calibrated diopters.
///
/// Steps, applied to the whole buffer at once:
/// 1. samples equal to 0 become `invalid_sentinel` ("very far"),
/// 2. `d' = 1 / (d + epsilon)` in `f64`,
/// 3. the sample at sorted index `floor(-outlier_fraction * N)` (counted from
///    the end) is the robust peak,
/// 4. everything is divided by `peak / reference_diopter`, so the robust peak
///    lands on `reference_diopter`.
#[derive(Debug, Clone, Default)]
pub struct DepthNormalizer {
    config: NormalizerConfig,
}

impl DepthNormalizer {
    pub fn new(config: NormalizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a 2-D `[h, w]` or batched `[batch, h, w]` depth buffer.
    /// Any real sample type is promoted to `f64`.
    pub fn normalize<S, D>(&self, raw: &ArrayBase<S, D>) -> Result<Array<f64, D>>
    where
        S: Data,
        S::Elem: Copy + Into<f64>,
        D: Dimension,
    {
        if raw.is_empty() {
            return Err(Error::InvalidInput(
                "cannot normalize an empty depth buffer".to_string(),
            ));
        }

        let NormalizerConfig {
            invalid_sentinel,
            epsilon,
            reference_diopter,
            ..
        } = self.config;

        let diopters = raw.mapv(|d| {
            let d: f64 = d.into();
            let d = if d == 0.0 { invalid_sentinel } else { d };
            1.0 / (d + epsilon)
        });

        let peak = self.robust_peak(diopters.iter().copied());
        let scale = peak / reference_diopter;
        log::debug!(
            "normalizing {} depth samples: robust peak {peak:.6e} D, scale {scale:.6e}",
            diopters.len()
        );

        Ok(diopters.mapv_into(|v| v / scale))
    }

    /// Value at the robust-peak position of the ascending sort.
    fn robust_peak(&self, samples: impl Iterator<Item = f64>) -> f64 {
        let mut values: Vec<f64> = samples.collect();
        let idx = robust_peak_index(values.len(), self.config.outlier_fraction);
        let (_, peak, _) = values.select_nth_unstable_by(idx, f64::total_cmp);
        *peak
    }
}

/// Index of `floor(-fraction * len)` as a from-the-end index into an
/// ascending sort of `len` samples. `len > 0` and `0 < fraction < 1`.
pub(crate) fn robust_peak_index(len: usize, fraction: f64) -> usize {
    // -floor(-x) == ceil(x)
    let from_end = (fraction * len as f64).ceil() as usize;
    len - from_end.clamp(1, len)
}
