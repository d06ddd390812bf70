//! Piecewise transfer functions mapping scalar values to color and opacity.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::timestamp::TimeStamp;

/// A control point of a color transfer function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPoint {
    pub x: f64,
    pub rgb: Vec3,
}

/// A control point of a piecewise (opacity) function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpacityPoint {
    pub x: f64,
    pub y: f64,
}

/// Inserts `point` keeping the list sorted by `x`; a point at an equal `x`
/// is replaced.
fn insert_sorted<P: Copy>(points: &mut Vec<P>, point: P, x: impl Fn(&P) -> f64) -> usize {
    let key = x(&point);
    match points.binary_search_by(|p| x(p).total_cmp(&key)) {
        Ok(index) => {
            points[index] = point;
            index
        }
        Err(index) => {
            points.insert(index, point);
            index
        }
    }
}

/// Locates `value` among sorted points: returns the bracketing pair and the
/// interpolation weight, clamping outside the covered range.
fn bracket<P>(points: &[P], value: f64, x: impl Fn(&P) -> f64) -> Option<(usize, usize, f64)> {
    let first = points.first()?;
    let last = points.last()?;
    if value <= x(first) {
        return Some((0, 0, 0.0));
    }
    if value >= x(last) {
        let end = points.len() - 1;
        return Some((end, end, 0.0));
    }
    let upper = points.partition_point(|p| x(p) <= value);
    let lower = upper - 1;
    let span = x(&points[upper]) - x(&points[lower]);
    let t = if span > 0.0 {
        (value - x(&points[lower])) / span
    } else {
        0.0
    };
    Some((lower, upper, t))
}

/// Maps a scalar value to an RGB color.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorTransferFunction {
    points: Vec<ColorPoint>,
    #[serde(skip)]
    mtime: TimeStamp,
}

impl ColorTransferFunction {
    /// Creates an empty function.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a control point and returns its index.
    pub fn add_rgb_point(&mut self, x: f64, r: f32, g: f32, b: f32) -> usize {
        let index = insert_sorted(
            &mut self.points,
            ColorPoint {
                x,
                rgb: Vec3::new(r, g, b),
            },
            |p| p.x,
        );
        self.mtime.modified();
        index
    }

    /// Removes all control points.
    pub fn remove_all_points(&mut self) {
        self.points.clear();
        self.mtime.modified();
    }

    /// Returns the number of control points.
    #[must_use]
    pub fn size(&self) -> usize {
        self.points.len()
    }

    /// Returns the control points, sorted by `x`.
    #[must_use]
    pub fn points(&self) -> &[ColorPoint] {
        &self.points
    }

    /// Returns the `[first, last]` x of the control points.
    #[must_use]
    pub fn range(&self) -> Option<[f64; 2]> {
        Some([self.points.first()?.x, self.points.last()?.x])
    }

    /// Evaluates the color at `value`. An empty function is black.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn evaluate(&self, value: f64) -> Vec3 {
        match bracket(&self.points, value, |p| p.x) {
            Some((lo, hi, t)) => self.points[lo].rgb.lerp(self.points[hi].rgb, t as f32),
            None => Vec3::ZERO,
        }
    }

    /// Returns the last modification stamp.
    #[must_use]
    pub fn mtime(&self) -> TimeStamp {
        self.mtime
    }
}

/// Maps a scalar value to a single value, used for scalar opacity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PiecewiseFunction {
    points: Vec<OpacityPoint>,
    #[serde(skip)]
    mtime: TimeStamp,
}

impl PiecewiseFunction {
    /// Creates an empty function.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a control point and returns its index.
    pub fn add_point(&mut self, x: f64, y: f64) -> usize {
        let index = insert_sorted(&mut self.points, OpacityPoint { x, y }, |p| p.x);
        self.mtime.modified();
        index
    }

    /// Removes all control points.
    pub fn remove_all_points(&mut self) {
        self.points.clear();
        self.mtime.modified();
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn points(&self) -> &[OpacityPoint] {
        &self.points
    }

    /// Returns the `[first, last]` x of the control points.
    #[must_use]
    pub fn range(&self) -> Option<[f64; 2]> {
        Some([self.points.first()?.x, self.points.last()?.x])
    }

    /// Evaluates the function at `value`. An empty function is zero.
    #[must_use]
    pub fn evaluate(&self, value: f64) -> f64 {
        match bracket(&self.points, value, |p| p.x) {
            Some((lo, hi, t)) => {
                let (a, b) = (self.points[lo].y, self.points[hi].y);
                a + (b - a) * t
            }
            None => 0.0,
        }
    }

    #[must_use]
    pub fn mtime(&self) -> TimeStamp {
        self.mtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_points_stay_sorted_and_replace() {
        let mut tf = PiecewiseFunction::new();
        tf.add_point(10.0, 1.0);
        tf.add_point(0.0, 0.0);
        tf.add_point(5.0, 0.2);
        assert_eq!(tf.add_point(5.0, 0.4), 1);
        assert_eq!(tf.size(), 3);
        let xs: Vec<f64> = tf.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 5.0, 10.0]);
        assert!((tf.evaluate(5.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_interpolates_and_clamps() {
        let mut tf = ColorTransferFunction::new();
        tf.add_rgb_point(0.0, 0.0, 0.0, 0.0);
        tf.add_rgb_point(10.0, 1.0, 0.5, 0.0);
        assert!(tf.evaluate(5.0).abs_diff_eq(Vec3::new(0.5, 0.25, 0.0), 1e-6));
        assert_eq!(tf.evaluate(-3.0), Vec3::ZERO);
        assert_eq!(tf.evaluate(42.0), Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(tf.range(), Some([0.0, 10.0]));
    }

    #[test]
    fn test_edits_advance_mtime() {
        let mut tf = PiecewiseFunction::new();
        let before = tf.mtime();
        tf.add_point(0.0, 0.0);
        let after_add = tf.mtime();
        assert!(after_add > before);
        tf.remove_all_points();
        assert!(tf.mtime() > after_add);
        assert_eq!(tf.evaluate(1.0), 0.0);
    }
}
