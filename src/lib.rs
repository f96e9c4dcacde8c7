//! # Annotrack - Video Annotation Core
//!
//! Rust port of a Python video-annotation toolkit's object layer.
//!
//! Annotrack represents video annotations as sparse, interpolatable data:
//! bounding boxes, labeled detections, keyframed object tracks, and activity
//! intervals over those tracks.
//!
//! ## Features
//!
//! - Tracks as sparse keyframe sets with linear interpolation to any frame
//! - Extend/strict boundary policies for out-of-span queries
//! - Frame-rate retargeting of keyframed tracks
//! - Activity intervals with identity-based track membership
//! - MEVA KPF (Kwiver Packet Format) dataset ingestion
//! - Order-preserving parallel batch map with explicit worker counts
//!
//! ## Example
//!
//! ```rust
//! use annotrack::{BoundingBox, Track};
//!
//! let track = Track::new(
//!     "person",
//!     vec![0, 10],
//!     vec![
//!         BoundingBox::from_xywh(0.0, 0.0, 10.0, 10.0),
//!         BoundingBox::from_xywh(100.0, 0.0, 10.0, 10.0),
//!     ],
//! ).unwrap();
//!
//! // Interpolated position halfway through the observed span.
//! let det = track.interpolate(5).unwrap();
//! assert_eq!(det.bbox().xmin, 50.0);
//! ```

// Internal modules (ports of numpy interpolation)
pub(crate) mod internal;

// Public modules
pub mod activity;
pub mod batch;
pub mod dataset;
pub mod detection;
pub mod geometry;
pub mod track;

// Re-exports for convenience
pub use activity::{Activity, ActivityConfig, TrackIdentity};
pub use batch::batch_map;
pub use detection::Detection;
pub use geometry::BoundingBox;
pub use track::{Boundary, Interpolation, Track, TrackConfig, TrackIter};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    /// Errors that can occur in the annotrack library.
    ///
    /// All validation failures are raised eagerly at construction or
    /// mutation; interpolation queries on a valid track never error. A
    /// strict-boundary query outside the observed span signals absence with
    /// `None`, not an error.
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Validation error: {0}")]
        Validation(String),

        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Unknown boundary policy: {0}")]
        UnknownBoundary(String),

        #[error("Unknown interpolation mode: {0}")]
        UnknownInterpolation(String),

        #[error("Frame rate retargeting requires a known source rate")]
        MissingFramerate,

        #[error("Dataset error: {0}")]
        Dataset(String),

        #[error("YAML error: {0}")]
        Yaml(#[from] serde_yaml::Error),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    /// Result type for annotrack operations.
    pub type Result<T> = std::result::Result<T, Error>;
}
