//! Dataset ingestion: external annotation formats parsed into tracks and
//! activities.
//!
//! - `meva` - MEVA KPF (Kwiver Packet Format) YAML triples

pub mod meva;

pub use meva::{discover_clips, parse_clip, parse_clips, ClipPaths, MevaClip, MevaOptions};
