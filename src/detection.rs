//! Detection struct: one labeled bounding box observation.

use crate::geometry::BoundingBox;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single labeled, optionally scored bounding box at one instant.
///
/// Detections are either constructed directly from an observation, or
/// synthesized on demand by [`Track::interpolate`](crate::Track::interpolate).
/// Synthesized detections carry the originating track's id in
/// `source_track_id` so they stay correlatable with their parent; their own
/// `id` is always fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DetectionRepr")]
pub struct Detection {
    id: Uuid,

    /// Id of the track this detection was interpolated from, if any.
    source_track_id: Option<Uuid>,

    category: String,

    /// Abbreviated display label. `None` means "display the category".
    shortlabel: Option<String>,

    confidence: Option<f64>,

    bbox: BoundingBox,
}

impl Detection {
    /// Create a new detection.
    ///
    /// Fails if the box is invalid or the category is empty.
    pub fn new(category: impl Into<String>, bbox: BoundingBox) -> Result<Self> {
        Self::with_config(category, bbox, None, None)
    }

    /// Create a detection with optional confidence and short label.
    pub fn with_config(
        category: impl Into<String>,
        bbox: BoundingBox,
        confidence: Option<f64>,
        shortlabel: Option<String>,
    ) -> Result<Self> {
        let category = category.into();
        if category.is_empty() {
            return Err(Error::Validation("detection requires a category".to_string()));
        }
        if !bbox.is_valid() {
            return Err(Error::Validation(format!(
                "invalid bounding box {:?} for category \"{}\"",
                bbox, category
            )));
        }
        if let Some(c) = confidence {
            if !c.is_finite() {
                return Err(Error::Validation(format!(
                    "confidence must be finite, got {}",
                    c
                )));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            source_track_id: None,
            category,
            shortlabel,
            confidence,
            bbox,
        })
    }

    /// Build a transient detection derived from a track's interpolation query.
    ///
    /// Interpolating between valid boxes always yields a valid box, so this
    /// skips re-validation.
    pub(crate) fn derived(
        source_track_id: Uuid,
        category: String,
        shortlabel: Option<String>,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_track_id: Some(source_track_id),
            category,
            shortlabel,
            confidence: None,
            bbox,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The track this detection was interpolated from, if any.
    pub fn source_track_id(&self) -> Option<Uuid> {
        self.source_track_id
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Replace the category.
    ///
    /// An explicitly provided short label survives; otherwise the display
    /// label follows the new category.
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

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

/// Serde mirror of [`Detection`]. Deserialization runs the
/// [`Detection::with_config`] checks so documents carrying degenerate boxes,
/// empty categories, or non-finite confidences are rejected.
#[derive(Deserialize)]
struct DetectionRepr {
    id: Uuid,
    #[serde(default)]
    source_track_id: Option<Uuid>,
    category: String,
    #[serde(default)]
    shortlabel: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    bbox: BoundingBox,
}

impl TryFrom<DetectionRepr> for Detection {
    type Error = Error;

    fn try_from(repr: DetectionRepr) -> Result<Self> {
        let mut det =
            Detection::with_config(repr.category, repr.bbox, repr.confidence, repr.shortlabel)?;
        det.id = repr.id;
        det.source_track_id = repr.source_track_id;
        Ok(det)
    }
}

/// Exact equality on box geometry (in xywh form) and category.
///
/// No epsilon is applied, so equality is brittle under floating-point noise;
/// use [`BoundingBox::iou`] for tolerant geometric comparison.
impl PartialEq for Detection {
    fn eq(&self, other: &Self) -> bool {
        self.bbox.to_xywh() == other.bbox.to_xywh() && self.category == other.category
    }
}
