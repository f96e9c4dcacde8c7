//! Axis-aligned bounding box primitive.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in image pixel coordinates.
///
/// Stored as corner coordinates. A box is valid iff `xmax > xmin` and
/// `ymax > ymin`; degenerate and negative boxes are representable but
/// rejected by every type that consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingBox {
    /// Create a box from corner coordinates.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax }
    }

    /// Create a box from a centroid and width/height.
    pub fn from_centroid(xcentroid: f64, ycentroid: f64, width: f64, height: f64) -> Self {
        Self {
            xmin: xcentroid - width / 2.0,
            ymin: ycentroid - height / 2.0,
            xmax: xcentroid + width / 2.0,
            ymax: ycentroid + height / 2.0,
        }
    }

    /// Create a box from top-left corner and width/height.
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            xmin: x,
            ymin: y,
            xmax: x + width,
            ymax: y + height,
        }
    }

    /// True iff the box has strictly positive extent and finite coordinates.
    pub fn is_valid(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
            && self.xmax > self.xmin
            && self.ymax > self.ymin
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Centroid as (x, y).
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    /// (xmin, ymin, width, height) — the parameterization interpolation
    /// operates on.
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (self.xmin, self.ymin, self.width(), self.height())
    }

    /// Scale all coordinates uniformly about the image origin.
    pub fn rescale(&self, scale: f64) -> Self {
        Self::new(
            self.xmin * scale,
            self.ymin * scale,
            self.xmax * scale,
            self.ymax * scale,
        )
    }

    /// Scale x coordinates only.
    pub fn scale_x(&self, scale: f64) -> Self {
        Self::new(self.xmin * scale, self.ymin, self.xmax * scale, self.ymax)
    }

    /// Scale y coordinates only.
    pub fn scale_y(&self, scale: f64) -> Self {
        Self::new(self.xmin, self.ymin * scale, self.xmax, self.ymax * scale)
    }

    /// Translate by (dx, dy).
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.xmin + dx, self.ymin + dy, self.xmax + dx, self.ymax + dy)
    }

    /// Expand (or shrink) about the centroid, preserving the centroid.
    pub fn dilate(&self, scale: f64) -> Self {
        let (xc, yc) = self.centroid();
        Self::from_centroid(xc, yc, self.width() * scale, self.height() * scale)
    }

    /// Box coordinates after rotating the image 90 degrees clockwise.
    ///
    /// `height` and `width` are the dimensions of the image the box lives in
    /// before rotation.
    pub fn rot90cw(&self, height: f64, _width: f64) -> Self {
        Self::new(height - self.ymax, self.xmin, height - self.ymin, self.xmax)
    }

    /// Box coordinates after rotating the image 90 degrees counter-clockwise.
    pub fn rot90ccw(&self, _height: f64, width: f64) -> Self {
        Self::new(self.ymin, width - self.xmax, self.ymax, width - self.xmin)
    }

    /// Intersection-over-union with another box. Zero for disjoint boxes.
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let x1 = self.xmin.max(other.xmin);
        let y1 = self.ymin.max(other.ymin);
        let x2 = self.xmax.min(other.xmax);
        let y2 = self.ymax.min(other.ymax);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        intersection / union
    }
}
