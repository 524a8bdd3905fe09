//! 2D fields, slice markers and slice groups.
//!
//! A marker placed on a 2D field computes a 1D series:
//!
//! - single-point slice — nearest-index lookup on the sliced axis;
//! - averaged/region slice — mean of z over the half-open index range
//!   `[argmin(a), argmin(b))`, widened by one index when it degenerates;
//! - arbitrary-angle segment — endpoints mapped to nearest per-axis
//!   indices, `round(hypot(Δi_x, Δi_y))` index pairs linearly
//!   interpolated, z sampled nearest-neighbor at each pair.
//!
//! The widening and the nearest-neighbor (non-interpolated) sampling are
//! deliberate parity choices carried over from the original application;
//! do not "improve" them. Precision-sensitive callers should resample
//! their fields instead.
//!
//! All markers sharing an orientation feed curves into one shared derived
//! window; the group record tracks the marker↔curve links.

use crate::error::{PlotLinkError, Result};
use crate::selection::nearest_index;
use crate::types::{CurveId, PlotRef, SliceOrientation};

/// The 2D data of a primary window: z sampled on an (x, y) grid,
/// column-major (`z[xi][yi]`).
#[derive(Debug, Clone)]
pub struct Field2d {
    /// Identity of the field within its window, used as the source curve
    /// of slice edges.
    pub id: CurveId,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<Vec<f64>>,
    pub label: String,
    pub unit: String,
}

impl Field2d {
    pub fn new(
        id: CurveId,
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<Vec<f64>>,
        label: impl Into<String>,
        unit: impl Into<String>,
    ) -> Result<Self> {
        if z.len() != x.len() || z.iter().any(|col| col.len() != y.len()) {
            return Err(PlotLinkError::DataShape(format!(
                "field '{id}': z must be {}x{} (len(x) columns of len(y))",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() || y.is_empty() {
            return Err(PlotLinkError::DataShape(format!("field '{id}' has an empty axis")));
        }
        Ok(Self {
            id,
            x,
            y,
            z,
            label: label.into(),
            unit: unit.into(),
        })
    }

    /// Single-point slice at `position` on the sliced axis.
    pub fn point_slice(&self, orientation: AxisOrientation, position: f64) -> (Vec<f64>, Vec<f64>) {
        match orientation {
            AxisOrientation::Vertical => {
                let xi = nearest_index(&self.x, position);
                (self.y.clone(), self.z[xi].clone())
            }
            AxisOrientation::Horizontal => {
                let yi = nearest_index(&self.y, position);
                (self.x.clone(), self.z.iter().map(|col| col[yi]).collect())
            }
        }
    }

    /// Averaged slice over the half-open index range
    /// `[argmin(a), argmin(b))` on the sliced axis. A degenerate
    /// one-index range is widened by one in the available direction.
    pub fn region_slice(&self, orientation: AxisOrientation, a: f64, b: f64) -> (Vec<f64>, Vec<f64>) {
        let axis = match orientation {
            AxisOrientation::Vertical => &self.x,
            AxisOrientation::Horizontal => &self.y,
        };
        let ia = nearest_index(axis, a);
        let ib = nearest_index(axis, b);
        let (mut lo, mut hi) = if ia <= ib { (ia, ib) } else { (ib, ia) };
        if lo == hi {
            if hi + 1 < axis.len() {
                hi += 1;
            } else if lo > 0 {
                lo -= 1;
            } else {
                // Single-sample axis: no direction available, take it whole.
                hi += 1;
            }
        }
        let count = (hi - lo) as f64;
        match orientation {
            AxisOrientation::Vertical => {
                let mut acc = vec![0.0; self.y.len()];
                for col in &self.z[lo..hi] {
                    for (dst, &v) in acc.iter_mut().zip(col) {
                        *dst += v;
                    }
                }
                for v in acc.iter_mut() {
                    *v /= count;
                }
                (self.y.clone(), acc)
            }
            AxisOrientation::Horizontal => {
                let series = self
                    .z
                    .iter()
                    .map(|col| col[lo..hi].iter().sum::<f64>() / count)
                    .collect();
                (self.x.clone(), series)
            }
        }
    }

    /// Arbitrary-angle segment slice between two (x, y) data positions.
    /// Output x is the distance along the segment in data units.
    pub fn segment_slice(&self, start: (f64, f64), end: (f64, f64)) -> (Vec<f64>, Vec<f64>) {
        let i0 = nearest_index(&self.x, start.0) as f64;
        let j0 = nearest_index(&self.y, start.1) as f64;
        let i1 = nearest_index(&self.x, end.0) as f64;
        let j1 = nearest_index(&self.y, end.1) as f64;

        let n = ((i1 - i0).hypot(j1 - j0)).round().max(1.0) as usize;
        let total_len = (self.x[i1 as usize] - self.x[i0 as usize])
            .hypot(self.y[j1 as usize] - self.y[j0 as usize]);

        let mut xs = Vec::with_capacity(n);
        let mut zs = Vec::with_capacity(n);
        for k in 0..n {
            let t = if n > 1 { k as f64 / (n - 1) as f64 } else { 0.0 };
            let fi = (i0 + t * (i1 - i0)).round() as usize;
            let fj = (j0 + t * (j1 - j0)).round() as usize;
            xs.push(t * total_len);
            zs.push(self.z[fi][fj]);
        }
        (xs, zs)
    }
}

/// Axis a point/region marker slices across. A vertical marker fixes an
/// x position and produces a series over y; horizontal the converse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    Vertical,
    Horizontal,
}

impl From<AxisOrientation> for SliceOrientation {
    fn from(a: AxisOrientation) -> Self {
        match a {
            AxisOrientation::Vertical => SliceOrientation::Vertical,
            AxisOrientation::Horizontal => SliceOrientation::Horizontal,
        }
    }
}

/// Identifier of one marker on a 2D window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(pub u32);

/// Geometry of a marker.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerSpec {
    Point {
        orientation: AxisOrientation,
        position: f64,
    },
    Region {
        orientation: AxisOrientation,
        a: f64,
        b: f64,
    },
    Segment {
        start: (f64, f64),
        end: (f64, f64),
    },
}

impl MarkerSpec {
    /// The slice group this marker belongs to.
    pub fn orientation(&self) -> SliceOrientation {
        match self {
            MarkerSpec::Point { orientation, .. } | MarkerSpec::Region { orientation, .. } => {
                (*orientation).into()
            }
            MarkerSpec::Segment { .. } => SliceOrientation::Arbitrary,
        }
    }

    /// Compute the marker's 1D series from the field.
    pub fn compute(&self, field: &Field2d) -> (Vec<f64>, Vec<f64>, String) {
        match self {
            MarkerSpec::Point { orientation, position } => {
                let (x, y) = field.point_slice(*orientation, *position);
                (x, y, format!("{} @ {position:.4}", SliceOrientation::from(*orientation)))
            }
            MarkerSpec::Region { orientation, a, b } => {
                let (x, y) = field.region_slice(*orientation, *a, *b);
                (x, y, format!("{} mean [{a:.4}, {b:.4})", SliceOrientation::from(*orientation)))
            }
            MarkerSpec::Segment { start, end } => {
                let (x, y) = field.segment_slice(*start, *end);
                (
                    x,
                    y,
                    format!(
                        "segment ({:.3}, {:.3}) -> ({:.3}, {:.3})",
                        start.0, start.1, end.0, end.1
                    ),
                )
            }
        }
    }
}

/// One marker feeding one curve of a shared slice window.
#[derive(Debug, Clone)]
pub struct SliceMarker {
    pub id: MarkerId,
    pub spec: MarkerSpec,
    /// The curve this marker feeds in the group's derived window.
    pub curve: CurveId,
}

/// The shared derived window of all markers of one orientation.
#[derive(Debug, Clone)]
pub struct SliceGroup {
    pub orientation: SliceOrientation,
    pub derived: PlotRef,
    pub markers: Vec<SliceMarker>,
}
