//! Activity: a labeled temporal interval over participating tracks.

use crate::{Detection, Error, Result, Track};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Anything that can be matched against an activity's participants by track
/// identity: a [`Track`] itself, or a [`Detection`] interpolated from one.
pub trait TrackIdentity {
    /// The track id this value identifies with, if any.
    fn track_id(&self) -> Option<Uuid>;
}

impl TrackIdentity for Track {
    fn track_id(&self) -> Option<Uuid> {
        Some(self.id())
    }
}

impl TrackIdentity for Detection {
    fn track_id(&self) -> Option<Uuid> {
        self.source_track_id()
    }
}

/// Configuration for [`Activity::with_config`].
///
/// `category` and `label` are mutually exclusive aliases, as for
/// [`TrackConfig`](crate::TrackConfig).
#[derive(Debug, Clone, Default)]
pub struct ActivityConfig {
    pub category: Option<String>,
    pub label: Option<String>,
    pub shortlabel: Option<String>,
}

impl ActivityConfig {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    fn resolve_category(&self) -> Result<String> {
        match (&self.category, &self.label) {
            (Some(_), Some(_)) => Err(Error::InvalidConfig(
                "category and label are mutually exclusive aliases, supply only one".to_string(),
            )),
            (Some(c), None) | (None, Some(c)) if !c.is_empty() => Ok(c.clone()),
            _ => Err(Error::Validation(
                "activity requires a category or label".to_string(),
            )),
        }
    }
}

/// A labeled time interval attributed to one primary ("subject") track and
/// zero or more secondary ("object") tracks.
///
/// Activities hold non-owning references to their participants by track id;
/// membership is identity-based, never structural. The temporal interval is
/// closed on both ends, unlike [`Track::during`] which is half-open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ActivityRepr")]
pub struct Activity {
    id: Uuid,
    category: String,
    shortlabel: Option<String>,
    startframe: i64,
    endframe: i64,
    subject: Option<Uuid>,
    objects: Vec<Uuid>,

    /// Free-form provenance, embedded verbatim in serialization.
    attributes: HashMap<String, Value>,
}

impl Activity {
    /// Create an activity with no participants.
    pub fn new(category: impl Into<String>, startframe: i64, endframe: i64) -> Result<Self> {
        Self::with_config(startframe, endframe, None, &[], ActivityConfig::new(category))
    }

    /// Create an activity with participants and a full configuration.
    ///
    /// Participants are supplied as track references; only their identities
    /// are retained. Fails if `endframe < startframe` or the configuration is
    /// ambiguous.
    pub fn with_config(
        startframe: i64,
        endframe: i64,
        subject: Option<&Track>,
        objects: &[&Track],
        config: ActivityConfig,
    ) -> Result<Self> {
        let category = config.resolve_category()?;
        if endframe < startframe {
            return Err(Error::Validation(format!(
                "activity endframe {} precedes startframe {}",
                endframe, startframe
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            category,
            shortlabel: config.shortlabel,
            startframe,
            endframe,
            subject: subject.map(Track::id),
            objects: objects.iter().map(|t| t.id()).collect(),
            attributes: HashMap::new(),
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

    pub fn startframe(&self) -> i64 {
        self.startframe
    }

    pub fn endframe(&self) -> i64 {
        self.endframe
    }

    /// Subject track id, if a subject was supplied.
    pub fn subject(&self) -> Option<Uuid> {
        self.subject
    }

    /// Object track ids.
    pub fn objects(&self) -> &[Uuid] {
        &self.objects
    }

    /// True iff `startframe <= frame <= endframe`.
    ///
    /// Closed on both ends, unlike the half-open [`Track::during`]; the
    /// asymmetry is part of the interval contract.
    pub fn during(&self, frame: i64) -> bool {
        frame >= self.startframe && frame <= self.endframe
    }

    /// Identity-based membership: true iff `x` carries a track id equal to
    /// the subject's or any object's.
    ///
    /// Accepts a [`Track`] or a track-derived [`Detection`], so a per-frame
    /// interpolated detection can be tested without re-walking its parent.
    pub fn has_track(&self, x: &impl TrackIdentity) -> bool {
        match x.track_id() {
            Some(id) => self.subject == Some(id) || self.objects.contains(&id),
            None => false,
        }
    }

    /// Shift the interval uniformly by `dt` frames.
    pub fn offset(&mut self, dt: i64) {
        self.startframe += dt;
        self.endframe += dt;
    }

    /// Attach a provenance attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes.insert(key.into(), value);
    }

    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }
}

/// Serde mirror of [`Activity`]. Deserialization applies the same interval
/// and category checks as [`Activity::with_config`].
#[derive(Deserialize)]
struct ActivityRepr {
    id: Uuid,
    category: String,
    #[serde(default)]
    shortlabel: Option<String>,
    startframe: i64,
    endframe: i64,
    #[serde(default)]
    subject: Option<Uuid>,
    #[serde(default)]
    objects: Vec<Uuid>,
    #[serde(default)]
    attributes: HashMap<String, Value>,
}

impl TryFrom<ActivityRepr> for Activity {
    type Error = Error;

    fn try_from(repr: ActivityRepr) -> Result<Self> {
        if repr.category.is_empty() {
            return Err(Error::Validation(
                "activity requires a category or label".to_string(),
            ));
        }
        if repr.endframe < repr.startframe {
            return Err(Error::Validation(format!(
                "activity endframe {} precedes startframe {}",
                repr.endframe, repr.startframe
            )));
        }

        Ok(Self {
            id: repr.id,
            category: repr.category,
            shortlabel: repr.shortlabel,
            startframe: repr.startframe,
            endframe: repr.endframe,
            subject: repr.subject,
            objects: repr.objects,
            attributes: repr.attributes,
        })
    }
}
