use ndarray::{Array2, s};
use serde::{Deserialize, Serialize};

use crate::*;

/// One circular erasure in surface (backing pixel) coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

impl Stroke {
    pub const fn new(x: f64, y: f64, radius: f64) -> Self {
        Self { x, y, radius }
    }

    fn is_effective(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.radius.is_finite() && self.radius > 0.0
    }
}

/// Anything that can have holes cut into an opaque cover layer.
pub trait CoverSurface {
    fn erase(&mut self, stroke: Stroke);

    /// Remove the whole cover.
    fn clear_all(&mut self);

    /// Paint the full cover back on.
    fn restore(&mut self);
}

/// Authoritative model of how much of the cover has been erased.
///
/// Every pixel of the backing surface is tracked individually, so overlapping strokes are never counted twice and
/// the percentage is always recomputed from the mask itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoverageTracker {
    erased: Array2<bool>,
    recompute_requested: bool,
}

impl CoverageTracker {
    pub fn new((width, height): SurfaceSize) -> Self {
        Self {
            erased: Array2::default([width as usize, height as usize]),
            recompute_requested: false,
        }
    }

    pub fn size(&self) -> SurfaceSize {
        let (width, height) = self.erased.dim();
        (width as u32, height as u32)
    }

    pub fn total_area(&self) -> PixelCount {
        self.erased.len() as PixelCount
    }

    pub fn is_zero_area(&self) -> bool {
        self.erased.is_empty()
    }

    pub fn erased_area(&self) -> PixelCount {
        self.erased.iter().filter(|&&erased| erased).count() as PixelCount
    }

    pub fn is_erased(&self, (x, y): (u32, u32)) -> bool {
        self.erased
            .get([x as usize, y as usize])
            .copied()
            .unwrap_or(false)
    }

    /// Erase every pixel whose centre lies within `radius` of `(x, y)`, returns whether anything changed.
    pub fn erase(&mut self, x: f64, y: f64, radius: f64) -> bool {
        self.apply(Stroke::new(x, y, radius))
    }

    pub fn apply(&mut self, stroke: Stroke) -> bool {
        if !stroke.is_effective() || self.is_zero_area() {
            return false;
        }

        let (width, height) = self.size();
        let Some(xs) = pixel_span(stroke.x, stroke.radius, width) else {
            return false;
        };
        let Some(ys) = pixel_span(stroke.y, stroke.radius, height) else {
            return false;
        };

        let radius_sq = stroke.radius * stroke.radius;
        let mut changed = false;
        for px in xs.0..xs.1 {
            let dx = px as f64 + 0.5 - stroke.x;
            for py in ys.0..ys.1 {
                let dy = py as f64 + 0.5 - stroke.y;
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let pixel = &mut self.erased[[px as usize, py as usize]];
                if !*pixel {
                    *pixel = true;
                    changed = true;
                }
            }
        }

        if changed {
            self.recompute_requested = true;
        }
        changed
    }

    /// Percentage of the surface erased, rescanned from the mask.
    pub fn coverage_percent(&self) -> f64 {
        let total = self.total_area();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.erased_area()) * 100.0 / f64::from(total)
    }

    pub fn is_threshold_crossed(&self, threshold: f64) -> bool {
        !self.is_zero_area() && self.coverage_percent() >= threshold
    }

    pub fn clear_all(&mut self) {
        self.erased.fill(true);
        self.recompute_requested = true;
    }

    pub fn reset(&mut self) {
        self.erased.fill(false);
        self.recompute_requested = false;
    }

    /// Switch to a new backing size, keeping the erased regions where they were relative to the surface.
    ///
    /// A target pixel is erased when any source pixel it overlaps is erased, so the erased fraction never drops.
    pub fn resize(&mut self, (width, height): SurfaceSize) {
        if self.size() == (width, height) {
            return;
        }

        let (old_width, old_height) = self.size();
        let previous = &self.erased;
        let erased = if self.is_zero_area() {
            Array2::default([width as usize, height as usize])
        } else {
            Array2::from_shape_fn([width as usize, height as usize], |(x, y)| {
                let (x0, x1) = source_footprint(x, old_width, width);
                let (y0, y1) = source_footprint(y, old_height, height);
                previous.slice(s![x0..x1, y0..y1]).iter().any(|&erased| erased)
            })
        };
        log::debug!(
            "coverage surface resized from {:?} to {:?}",
            (old_width, old_height),
            (width, height)
        );
        self.erased = erased;
        self.recompute_requested = true;
    }

    pub fn recompute_requested(&self) -> bool {
        self.recompute_requested
    }

    /// Drain the pending recompute request.
    pub fn take_recompute_request(&mut self) -> bool {
        core::mem::take(&mut self.recompute_requested)
    }
}

impl CoverSurface for CoverageTracker {
    fn erase(&mut self, stroke: Stroke) {
        self.apply(stroke);
    }

    fn clear_all(&mut self) {
        CoverageTracker::clear_all(self);
    }

    fn restore(&mut self) {
        self.reset();
    }
}

/// Half-open range of source pixels overlapped by target pixel `index` along one axis, never empty.
fn source_footprint(index: usize, old_len: u32, new_len: u32) -> (usize, usize) {
    let (index, old_len, new_len) = (index as u64, u64::from(old_len), u64::from(new_len));
    let start = index * old_len / new_len;
    let end = ((index + 1) * old_len).div_ceil(new_len);
    (start as usize, end.max(start + 1) as usize)
}

/// Half-open range of pixel indices along one axis that a stroke can touch.
fn pixel_span(center: f64, radius: f64, len: u32) -> Option<(u32, u32)> {
    let low = center - radius - 1.0;
    let high = center + radius + 1.0;
    if high < 0.0 || low >= f64::from(len) {
        return None;
    }

    let start = if low <= 0.0 { 0 } else { low as u32 };
    let end = if high >= f64::from(len) {
        len
    } else {
        (high as u32 + 1).min(len)
    };
    Some((start, end))
}
