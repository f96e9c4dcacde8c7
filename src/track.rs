//! Track: the trajectory of one instance as sparse bounding box keyframes.

use crate::geometry::BoundingBox;
use crate::internal::numpy::interp;
use crate::Detection;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Interpolation mode between keyframes.
///
/// This is a closed enumeration: linear is the only supported mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
}

impl FromStr for Interpolation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Interpolation::Linear),
            other => Err(Error::UnknownInterpolation(other.to_string())),
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolation::Linear => write!(f, "linear"),
        }
    }
}

/// Boundary policy: how interpolation queries outside the observed frame
/// span are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Boundary {
    /// Clamp to the nearest keyframe; queries always produce a detection.
    #[default]
    Extend,
    /// Queries outside `[startframe, endframe)` produce no detection.
    Strict,
}

impl FromStr for Boundary {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "extend" => Ok(Boundary::Extend),
            "strict" => Ok(Boundary::Strict),
            other => Err(Error::UnknownBoundary(other.to_string())),
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Extend => write!(f, "extend"),
            Boundary::Strict => write!(f, "strict"),
        }
    }
}

/// Configuration for [`Track::with_config`].
///
/// `category` and `label` are mutually exclusive aliases (`label` is the
/// legacy spelling); supplying both is a configuration error.
#[derive(Debug, Clone, Default)]
pub struct TrackConfig {
    pub category: Option<String>,
    pub label: Option<String>,
    pub shortlabel: Option<String>,
    /// Source frame rate in frames/second, required for retargeting.
    pub framerate: Option<f64>,
    pub interpolation: Interpolation,
    pub boundary: Boundary,
}

impl TrackConfig {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    /// Resolve the category/label alias pair to a single canonical category.
    fn resolve_category(&self) -> Result<String> {
        match (&self.category, &self.label) {
            (Some(_), Some(_)) => Err(Error::InvalidConfig(
                "category and label are mutually exclusive aliases, supply only one".to_string(),
            )),
            (Some(c), None) | (None, Some(c)) if !c.is_empty() => Ok(c.clone()),
            _ => Err(Error::Validation(
                "track requires a category or label".to_string(),
            )),
        }
    }
}

/// The trajectory of one instance over time, stored as a sparse,
/// strictly-increasing-by-frame set of (frame, box) keyframe pairs.
///
/// A track answers "where was this instance at frame k?" for arbitrary k via
/// per-parameter linear interpolation over its keyframes, and supports lazy
/// frame-ordered iteration over its observed span.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "TrackRepr")]
pub struct Track {
    id: Uuid,
    category: String,
    shortlabel: Option<String>,

    /// Keyframe frame indices, strictly increasing. Parallel to `boxes`.
    keyframes: Vec<i64>,
    boxes: Vec<BoundingBox>,

    framerate: Option<f64>,
    interpolation: Interpolation,
    boundary: Boundary,
}

impl Track {
    /// Create a track from an initial set of observations with default
    /// policies (linear interpolation, extend boundary).
    pub fn new(
        category: impl Into<String>,
        keyframes: Vec<i64>,
        boxes: Vec<BoundingBox>,
    ) -> Result<Self> {
        Self::with_config(keyframes, boxes, TrackConfig::new(category))
    }

    /// Create a track from observations and a full configuration.
    ///
    /// Observations may be supplied in any order; they are sorted by frame.
    /// Fails if the observation set is empty, lengths mismatch, any box is
    /// invalid, a frame appears twice, or the configuration is ambiguous.
    pub fn with_config(
        keyframes: Vec<i64>,
        boxes: Vec<BoundingBox>,
        config: TrackConfig,
    ) -> Result<Self> {
        let category = config.resolve_category()?;

        if keyframes.is_empty() {
            return Err(Error::Validation(
                "track requires at least one observation".to_string(),
            ));
        }
        if keyframes.len() != boxes.len() {
            return Err(Error::Validation(format!(
                "keyframes and boxes must have equal length, got {} and {}",
                keyframes.len(),
                boxes.len()
            )));
        }
        for bb in &boxes {
            if !bb.is_valid() {
                return Err(Error::Validation(format!(
                    "invalid bounding box {:?} for category \"{}\"",
                    bb, category
                )));
            }
        }
        if let Some(fps) = config.framerate {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(Error::Validation(format!(
                    "framerate must be positive and finite, got {}",
                    fps
                )));
            }
        }

        let mut pairs: Vec<(i64, BoundingBox)> = keyframes.into_iter().zip(boxes).collect();
        pairs.sort_by_key(|(frame, _)| *frame);
        for window in pairs.windows(2) {
            if window[0].0 == window[1].0 {
                return Err(Error::Validation(format!(
                    "duplicate keyframe {} in track observations",
                    window[0].0
                )));
            }
        }
        let (keyframes, boxes) = pairs.into_iter().unzip();

        Ok(Self {
            id: Uuid::new_v4(),
            category,
            shortlabel: config.shortlabel,
            keyframes,
            boxes,
            framerate: config.framerate,
            interpolation: config.interpolation,
            boundary: config.boundary,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    /// Display label: the short label if one was provided, else the category.
    pub fn shortlabel(&self) -> &str {
        self.shortlabel.as_deref().unwrap_or(&self.category)
    }

    pub fn set_shortlabel(&mut self, shortlabel: impl Into<String>) {
        self.shortlabel = Some(shortlabel.into());
    }

    /// Source frame rate in frames/second, if known.
    pub fn framerate(&self) -> Option<f64> {
        self.framerate
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Keyframe frame indices in strictly increasing order.
    pub fn keyframes(&self) -> &[i64] {
        &self.keyframes
    }

    /// Observed boxes, parallel to [`keyframes`](Self::keyframes).
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn num_keyframes(&self) -> usize {
        self.keyframes.len()
    }

    /// First observed frame. Keyframes are sorted, so this is the minimum.
    pub fn startframe(&self) -> i64 {
        self.keyframes[0]
    }

    /// Last observed frame.
    pub fn endframe(&self) -> i64 {
        self.keyframes[self.keyframes.len() - 1]
    }

    /// True iff `startframe <= frame < endframe` (half-open: the endframe
    /// itself is excluded even though it is an observed keyframe).
    pub fn during(&self, frame: i64) -> bool {
        frame >= self.startframe() && frame < self.endframe()
    }

    /// Interpolated detection at an arbitrary frame.
    ///
    /// Each of xmin, ymin, width, height is interpolated independently as a
    /// piecewise-linear function of frame index with clamped endpoints. The
    /// result carries the track's category and is stamped with this track's
    /// id as its `source_track_id`.
    ///
    /// Under [`Boundary::Extend`] this always produces a detection; under
    /// [`Boundary::Strict`] frames outside the observed span produce `None`
    /// (absence, not an error).
    pub fn interpolate(&self, frame: i64) -> Option<Detection> {
        match self.boundary {
            Boundary::Extend => Some(self.interpolate_clamped(frame)),
            Boundary::Strict => {
                if self.during(frame) {
                    Some(self.interpolate_clamped(frame))
                } else {
                    None
                }
            }
        }
    }

    fn interpolate_clamped(&self, frame: i64) -> Detection {
        let frames: Vec<f64> = self.keyframes.iter().map(|&f| f as f64).collect();
        let (mut xs, mut ys, mut ws, mut hs) = (
            Vec::with_capacity(self.boxes.len()),
            Vec::with_capacity(self.boxes.len()),
            Vec::with_capacity(self.boxes.len()),
            Vec::with_capacity(self.boxes.len()),
        );
        for bb in &self.boxes {
            let (x, y, w, h) = bb.to_xywh();
            xs.push(x);
            ys.push(y);
            ws.push(w);
            hs.push(h);
        }

        let k = frame as f64;
        let bbox = BoundingBox::from_xywh(
            interp(k, &frames, &xs),
            interp(k, &frames, &ys),
            interp(k, &frames, &ws),
            interp(k, &frames, &hs),
        );
        Detection::derived(self.id, self.category.clone(), self.shortlabel.clone(), bbox)
    }

    /// Lazy iterator of interpolated detections for every integer frame in
    /// `[startframe, endframe)`, in increasing order.
    ///
    /// Iteration is defined over the track's own observed span and is
    /// independent of the boundary policy.
    pub fn iter(&self) -> TrackIter<'_> {
        TrackIter {
            track: self,
            frame: self.startframe(),
            end: self.endframe(),
        }
    }

    /// Insert a new observation, keeping keyframes sorted.
    ///
    /// Fails if the box is invalid. Adding at an already-observed frame
    /// replaces that keyframe's box.
    pub fn add(&mut self, frame: i64, bbox: BoundingBox) -> Result<()> {
        if !bbox.is_valid() {
            return Err(Error::Validation(format!(
                "invalid bounding box {:?} for category \"{}\"",
                bbox, self.category
            )));
        }
        match self.keyframes.binary_search(&frame) {
            Ok(i) => self.boxes[i] = bbox,
            Err(i) => {
                self.keyframes.insert(i, frame);
                self.boxes.insert(i, bbox);
            }
        }
        Ok(())
    }

    /// Retarget the track to a new frame rate.
    ///
    /// Every keyframe index is rescaled by `fps / framerate` and rounded to
    /// the nearest integer. Requires the source rate to have been supplied at
    /// construction. Keyframes that collide after rounding keep the later
    /// observation. Returns a new track with the same id (identity names the
    /// instance, not the sampling).
    pub fn at_framerate(&self, fps: f64) -> Result<Track> {
        let source = self.framerate.ok_or(Error::MissingFramerate)?;
        if !fps.is_finite() || fps <= 0.0 {
            return Err(Error::Validation(format!(
                "framerate must be positive and finite, got {}",
                fps
            )));
        }

        let scale = fps / source;
        let mut keyframes: Vec<i64> = Vec::with_capacity(self.keyframes.len());
        let mut boxes: Vec<BoundingBox> = Vec::with_capacity(self.boxes.len());
        for (&frame, &bbox) in self.keyframes.iter().zip(self.boxes.iter()) {
            let rescaled = (frame as f64 * scale).round() as i64;
            if keyframes.last() == Some(&rescaled) {
                *boxes.last_mut().unwrap() = bbox;
            } else {
                keyframes.push(rescaled);
                boxes.push(bbox);
            }
        }

        Ok(Track {
            id: self.id,
            category: self.category.clone(),
            shortlabel: self.shortlabel.clone(),
            keyframes,
            boxes,
            framerate: Some(fps),
            interpolation: self.interpolation,
            boundary: self.boundary,
        })
    }

    /// Scale every keyframe box uniformly about the image origin.
    pub fn rescale(&mut self, scale: f64) {
        for bb in &mut self.boxes {
            *bb = bb.rescale(scale);
        }
    }

    /// Scale every keyframe box along x only.
    pub fn scale_x(&mut self, scale: f64) {
        for bb in &mut self.boxes {
            *bb = bb.scale_x(scale);
        }
    }

    /// Scale every keyframe box along y only.
    pub fn scale_y(&mut self, scale: f64) {
        for bb in &mut self.boxes {
            *bb = bb.scale_y(scale);
        }
    }

    /// Dilate every keyframe box about its own centroid.
    pub fn dilate(&mut self, scale: f64) {
        for bb in &mut self.boxes {
            *bb = bb.dilate(scale);
        }
    }

    /// Rotate every keyframe box for a 90-degree clockwise image rotation.
    pub fn rot90cw(&mut self, height: f64, width: f64) {
        for bb in &mut self.boxes {
            *bb = bb.rot90cw(height, width);
        }
    }

    /// Rotate every keyframe box for a 90-degree counter-clockwise rotation.
    pub fn rot90ccw(&mut self, height: f64, width: f64) {
        for bb in &mut self.boxes {
            *bb = bb.rot90ccw(height, width);
        }
    }

    /// Shift the track by `dt` frames in time and (dx, dy) pixels in space.
    pub fn offset(&mut self, dt: i64, dx: f64, dy: f64) {
        for frame in &mut self.keyframes {
            *frame += dt;
        }
        for bb in &mut self.boxes {
            *bb = bb.translate(dx, dy);
        }
    }
}

/// Serde mirror of [`Track`]. Deserialized documents pass through the same
/// validation as [`Track::with_config`], so empty, mismatched, or invalid
/// observations are rejected and out-of-order keyframes are re-sorted instead
/// of silently corrupting interpolation.
#[derive(Deserialize)]
struct TrackRepr {
    id: Uuid,
    category: String,
    #[serde(default)]
    shortlabel: Option<String>,
    keyframes: Vec<i64>,
    boxes: Vec<BoundingBox>,
    #[serde(default)]
    framerate: Option<f64>,
    #[serde(default)]
    interpolation: Interpolation,
    #[serde(default)]
    boundary: Boundary,
}

impl TryFrom<TrackRepr> for Track {
    type Error = Error;

    fn try_from(repr: TrackRepr) -> Result<Self> {
        let config = TrackConfig {
            category: Some(repr.category),
            label: None,
            shortlabel: repr.shortlabel,
            framerate: repr.framerate,
            interpolation: repr.interpolation,
            boundary: repr.boundary,
        };
        let mut track = Track::with_config(repr.keyframes, repr.boxes, config)?;
        track.id = repr.id;
        Ok(track)
    }
}

/// Lazy, restartable iterator over a track's observed span.
#[derive(Debug, Clone)]
pub struct TrackIter<'a> {
    track: &'a Track,
    frame: i64,
    end: i64,
}

impl Iterator for TrackIter<'_> {
    type Item = Detection;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame >= self.end {
            return None;
        }
        let det = self.track.interpolate_clamped(self.frame);
        self.frame += 1;
        Some(det)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.frame).max(0) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TrackIter<'_> {}

impl<'a> IntoIterator for &'a Track {
    type Item = Detection;
    type IntoIter = TrackIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
