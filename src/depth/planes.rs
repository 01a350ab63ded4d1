use std::fmt;

use ndarray::{Array3, Array4, ArrayBase, ArrayView3, Axis, Data, Dimension, Ix2, Ix3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default virtual depth planes in diopters, nearest plane first.
pub const VIRTUAL_DEPTH_PLANES: [f64; 8] = [
    0.0,
    0.08417508417508479,
    0.14124293785310726,
    0.24299599771297942,
    0.3171856978085348,
    0.4155730533683304,
    0.5319148936170226,
    0.6112104949314254,
];

// ---------------------------------------------------------------------------
// VirtualDepthPlanes
// ---------------------------------------------------------------------------

/// An ordered, strictly increasing set of at least two plane positions
/// (diopters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct VirtualDepthPlanes(Vec<f64>);

impl VirtualDepthPlanes {
    pub fn new(planes: Vec<f64>) -> Result<Self> {
        if planes.len() < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "need at least 2 depth planes, got {}",
                planes.len()
            )));
        }
        if let Some(bad) = planes.iter().find(|p| !p.is_finite()) {
            return Err(Error::InvalidConfiguration(format!(
                "depth plane {bad} is not finite"
            )));
        }
        if let Some(pair) = planes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::InvalidConfiguration(format!(
                "depth planes must be strictly increasing: {} >= {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self(planes))
    }

    /// Keep every `step`-th plane starting from the nearest one,
    /// e.g. `step = 2` turns the 8 default planes into 4.
    pub fn every_nth(&self, step: usize) -> Result<Self> {
        if step == 0 {
            return Err(Error::InvalidConfiguration(
                "plane step must be at least 1".to_string(),
            ));
        }
        Self::new(self.0.iter().copied().step_by(step).collect())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn nearest(&self) -> f64 {
        self.0[0]
    }

    pub fn farthest(&self) -> f64 {
        self.0[self.0.len() - 1]
    }
}

impl Default for VirtualDepthPlanes {
    fn default() -> Self {
        Self(VIRTUAL_DEPTH_PLANES.to_vec())
    }
}

impl TryFrom<Vec<f64>> for VirtualDepthPlanes {
    type Error = Error;

    fn try_from(planes: Vec<f64>) -> Result<Self> {
        Self::new(planes)
    }
}

impl From<VirtualDepthPlanes> for Vec<f64> {
    fn from(planes: VirtualDepthPlanes) -> Self {
        planes.0
    }
}

impl fmt::Display for VirtualDepthPlanes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| format!("{p:.4}")).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

// ---------------------------------------------------------------------------
// MaskStack
// ---------------------------------------------------------------------------

/// One-hot plane assignment, shape `[batch, planes, height, width]`,
/// values in {0.0, 1.0}.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskStack {
    masks: Array4<f32>,
}

impl MaskStack {
    pub fn as_array(&self) -> &Array4<f32> {
        &self.masks
    }

    pub fn into_array(self) -> Array4<f32> {
        self.masks
    }

    pub fn batch(&self) -> usize {
        self.masks.len_of(Axis(0))
    }

    pub fn num_planes(&self) -> usize {
        self.masks.len_of(Axis(1))
    }

    /// `(height, width)`
    pub fn resolution(&self) -> (usize, usize) {
        let (_, _, h, w) = self.masks.dim();
        (h, w)
    }

    /// Drop the batch axis. Only valid when the batch has exactly one entry.
    pub fn squeeze_batch(self) -> Result<Array3<f32>> {
        if self.batch() != 1 {
            return Err(Error::InvalidInput(format!(
                "cannot squeeze a mask stack with batch size {}",
                self.batch()
            )));
        }
        Ok(self.masks.index_axis_move(Axis(0), 0))
    }

    /// Plane index of every pixel, shape `[batch, height, width]`.
    pub fn plane_indices(&self) -> Array3<usize> {
        let (b, _, h, w) = self.masks.dim();
        Array3::from_shape_fn((b, h, w), |(bi, y, x)| {
            self.masks
                .slice(ndarray::s![bi, .., y, x])
                .iter()
                .position(|&m| m > 0.5)
                .unwrap_or(0)
        })
    }

    /// Fraction of all pixels (over the whole batch) assigned to each plane.
    pub fn plane_occupancy(&self) -> Vec<f64> {
        let (b, _, h, w) = self.masks.dim();
        let pixels = (b * h * w).max(1) as f64;
        self.masks
            .axis_iter(Axis(1))
            .map(|plane| plane.iter().filter(|&&m| m > 0.5).count() as f64 / pixels)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PlaneMaskDecomposer
// ---------------------------------------------------------------------------

/// Quantizes normalized depth (diopters) onto a fixed set of planes.
///
/// A value inside `[planes[k], planes[k+1])` goes to whichever boundary is
/// closer; an exact midpoint goes to `k + 1`. Values at or beyond the last
/// plane go to the last plane, values below the first go to the first.
#[derive(Debug, Clone, Default)]
pub struct PlaneMaskDecomposer {
    planes: VirtualDepthPlanes,
}

impl PlaneMaskDecomposer {
    pub fn new(planes: VirtualDepthPlanes) -> Self {
        Self { planes }
    }

    pub fn planes(&self) -> &VirtualDepthPlanes {
        &self.planes
    }

    /// Decompose a non-empty `[h, w]` or `[batch, h, w]` diopter buffer.
    ///
    /// The result is checked to be a partition of the pixels; a failed check
    /// surfaces as [`Error::InvariantViolation`] and no mask is returned.
    pub fn decompose<S, D>(&self, depth: &ArrayBase<S, D>) -> Result<MaskStack>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        let view = depth.view().into_dyn();
        let batched: ArrayView3<f64> = match view.ndim() {
            2 => view
                .into_dimensionality::<Ix2>()
                .map(|v| v.insert_axis(Axis(0)))
                .map_err(|e| Error::InvalidInput(e.to_string()))?,
            3 => view
                .into_dimensionality::<Ix3>()
                .map_err(|e| Error::InvalidInput(e.to_string()))?,
            n => {
                return Err(Error::InvalidInput(format!(
                    "depth buffer must be 2-D or 3-D, got {n}-D"
                )))
            }
        };
        if batched.is_empty() {
            return Err(Error::InvalidInput(format!(
                "cannot decompose an empty depth buffer of shape {:?}",
                batched.dim()
            )));
        }

        let masks = self.accumulate(batched);
        check_partition(&masks)?;

        log::debug!(
            "decomposed {:?} depth buffer onto {} planes",
            batched.dim(),
            self.planes.len()
        );
        Ok(MaskStack { masks })
    }

    /// Sweep every boundary pair plus the two open ends, adding one vote
    /// per matching case. A correct sweep votes exactly once per pixel.
    fn accumulate(&self, depth: ArrayView3<f64>) -> Array4<f32> {
        let planes = self.planes.as_slice();
        let num_planes = planes.len();
        let (b, h, w) = depth.dim();
        let mut masks = Array4::<f32>::zeros((b, num_planes, h, w));

        for ((bi, y, x), &v) in depth.indexed_iter() {
            for (k, pair) in planes.windows(2).enumerate() {
                let (low, high) = (pair[0], pair[1]);
                if low <= v && v < high {
                    let plane = if (high - v) > (v - low) { k } else { k + 1 };
                    masks[[bi, plane, y, x]] += 1.0;
                }
            }
            if v >= self.planes.farthest() {
                masks[[bi, num_planes - 1, y, x]] += 1.0;
            }
            if v < self.planes.nearest() {
                masks[[bi, 0, y, x]] += 1.0;
            }
        }

        masks
    }
}

/// `sum(masks) == numel(masks) / planes`
fn check_partition(masks: &Array4<f32>) -> Result<()> {
    let num_planes = masks.len_of(Axis(1)).max(1);
    let expected = (masks.len() / num_planes) as u64;
    let assigned: u64 = masks.iter().map(|&m| m as u64).sum();
    if assigned != expected {
        return Err(Error::InvariantViolation { assigned, expected });
    }
    Ok(())
}
