//! MEVA KPF (Kwiver Packet Format) annotation parser.
//!
//! Each MEVA clip is annotated by a triple of YAML files: `types.yml`
//! (track id to category), `geom.yml` (per-frame bounding box packets),
//! and `activities.yml` (labeled activity intervals referencing actor ids).
//! Every file is a flat list of single-key packets; packets this parser does
//! not understand are skipped.
//!
//! Ingestion is tolerant: invalid boxes, unknown actor ids, and malformed
//! packets are logged and dropped rather than failing the whole clip.

use crate::batch::batch_map;
use crate::geometry::BoundingBox;
use crate::track::{Boundary, Track, TrackConfig};
use crate::{Activity, ActivityConfig, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// All MEVA clips are 30Hz.
const MEVA_FRAMERATE: f64 = 30.0;

/// The YAML triple describing one annotated clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipPaths {
    pub types: PathBuf,
    pub geom: PathBuf,
    pub activities: PathBuf,
}

/// Parsing options. The worker count is explicit; there is no process-wide
/// parallelism setting.
#[derive(Debug, Clone)]
pub struct MevaOptions {
    /// Temporal stride for importing geometry packets. With `stride > 1`
    /// only every stride-th packet per track is kept (plus the first and the
    /// trailing packets), relying on track interpolation to fill the gaps.
    pub stride: usize,
    /// Worker threads for [`parse_clips`].
    pub workers: usize,
}

impl Default for MevaOptions {
    fn default() -> Self {
        Self { stride: 1, workers: 1 }
    }
}

/// One parsed clip: its tracks keyed by id, and its activities.
///
/// Serializing a clip emits tracks and activities side by side, so the
/// track ids referenced by each activity resolve within the same document.
#[derive(Debug, Serialize)]
pub struct MevaClip {
    /// Video name from the annotation metadata (extension stripped).
    pub name: String,
    pub framerate: f64,
    pub tracks: HashMap<Uuid, Track>,
    pub activities: Vec<Activity>,
}

// ---------------------------------------------------------------------------
// KPF packet schema
// ---------------------------------------------------------------------------

/// One KPF packet. Files are flat lists of these; exactly one field is
/// populated per packet and unrecognized packet kinds deserialize to all-None.
#[derive(Debug, Deserialize)]
struct Packet {
    #[serde(default)]
    meta: Option<serde_yaml::Value>,
    #[serde(default)]
    types: Option<TypesPacket>,
    #[serde(default)]
    geom: Option<GeomPacket>,
    #[serde(default)]
    act: Option<ActPacket>,
}

#[derive(Debug, Deserialize)]
struct TypesPacket {
    id1: i64,
    cset3: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct GeomPacket {
    id1: i64,
    ts0: i64,
    /// Box corners as "xmin ymin xmax ymax".
    g0: String,
}

// Act packets also serialize: each imported activity embeds its source
// packet as a provenance attribute.
#[derive(Debug, Deserialize, Serialize)]
struct ActPacket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    act2: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    act3: Option<BTreeMap<String, f64>>,
    timespan: Vec<TimespanPacket>,
    actors: Vec<ActorPacket>,
}

#[derive(Debug, Deserialize, Serialize)]
struct TimespanPacket {
    tsr0: Vec<i64>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ActorPacket {
    id1: i64,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one clip from its KPF YAML triple.
pub fn parse_clip(paths: &ClipPaths, options: &MevaOptions) -> Result<MevaClip> {
    if options.stride == 0 {
        return Err(Error::InvalidConfig("stride must be at least 1".to_string()));
    }

    debug!(activities = %paths.activities.display(), "parsing KPF clip");
    let types_packets = read_packets(&paths.types)?;
    let geom_packets = read_packets(&paths.geom)?;
    let act_packets = read_packets(&paths.activities)?;

    // The three files annotate the same video; their metadata must agree.
    let name = video_name(&types_packets, &paths.types)?;
    for (packets, path) in [(&geom_packets, &paths.geom), (&act_packets, &paths.activities)] {
        let other = video_name(packets, path)?;
        if other != name {
            return Err(Error::Dataset(format!(
                "mismatched video names \"{}\" and \"{}\" across KPF triple",
                name, other
            )));
        }
    }

    // id1 -> category.
    let mut categories: HashMap<i64, String> = HashMap::new();
    for packet in &types_packets {
        if let Some(t) = &packet.types {
            if let Some(category) = top_category(&t.cset3) {
                categories.insert(t.id1, category.to_string());
            }
        }
    }

    // Group geometry packets per actor, in increasing frame order.
    let mut geoms: HashMap<i64, Vec<&GeomPacket>> = HashMap::new();
    for packet in &geom_packets {
        if let Some(g) = &packet.geom {
            geoms.entry(g.id1).or_default().push(g);
        }
    }
    for group in geoms.values_mut() {
        group.sort_by_key(|g| g.ts0);
    }

    // Build one strict-boundary track per actor id.
    let mut actor_tracks: HashMap<i64, Track> = HashMap::new();
    for (id1, group) in &geoms {
        let Some(category) = categories.get(id1) else {
            warn!(id1, clip = %name, "geometry for actor with no type packet, skipping track");
            continue;
        };

        let n = group.len();
        for (k, g) in group.iter().enumerate() {
            // Stride decimation: keep the first packet, every stride-th, and
            // the trailing packets, so interpolation can reconstruct the rest.
            if options.stride > 1 && k > 0 && k + options.stride < n && k % options.stride != 0 {
                continue;
            }

            let Some(bbox) = parse_g0(&g.g0) else {
                warn!(id1, frame = g.ts0, g0 = %g.g0, clip = %name, "malformed geometry packet, skipping");
                continue;
            };
            if !bbox.is_valid() {
                warn!(id1, frame = g.ts0, clip = %name, "invalid bounding box, skipping");
                continue;
            }

            match actor_tracks.get_mut(id1) {
                Some(track) => track.add(g.ts0, bbox)?,
                None => {
                    let config = TrackConfig {
                        category: Some(category.clone()),
                        framerate: Some(MEVA_FRAMERATE),
                        boundary: Boundary::Strict,
                        ..Default::default()
                    };
                    let track = Track::with_config(vec![g.ts0], vec![bbox], config)?;
                    actor_tracks.insert(*id1, track);
                }
            }
        }
    }

    // Parse activities, joining actor ids against the tracks built above.
    let shortlabels = category_to_shortlabel();
    let mut activities = Vec::new();
    for packet in &act_packets {
        let Some(act) = &packet.act else { continue };

        let Some(category) = act
            .act2
            .as_ref()
            .or(act.act3.as_ref())
            .and_then(|cset| top_category(cset))
        else {
            warn!(clip = %name, "activity packet without act2/act3 category, skipping");
            continue;
        };

        // Multi-span activities are not part of the corpus.
        let Some(span) = act.timespan.first().filter(|_| act.timespan.len() == 1) else {
            warn!(category, clip = %name, "activity without a single timespan, skipping");
            continue;
        };
        let &[startframe, endframe] = span.tsr0.as_slice() else {
            warn!(category, clip = %name, "malformed tsr0 timespan, skipping");
            continue;
        };

        let mut participants: Vec<&Track> = Vec::new();
        for actor in &act.actors {
            match actor_tracks.get(&actor.id1) {
                Some(track) => participants.push(track),
                None => warn!(
                    id1 = actor.id1,
                    category,
                    clip = %name,
                    "actor referenced in activity has no geometry, skipping actor"
                ),
            }
        }
        if participants.is_empty() {
            warn!(category, clip = %name, "activity with no resolvable actors, skipping");
            continue;
        }

        // The first listed actor performs the activity; the rest participate.
        let config = ActivityConfig {
            category: Some(category.to_string()),
            shortlabel: shortlabels.get(category).map(|s| s.to_string()),
            ..Default::default()
        };
        let mut activity = match Activity::with_config(
            startframe,
            endframe,
            Some(participants[0]),
            &participants[1..],
            config,
        ) {
            Ok(a) => a,
            Err(e) => {
                warn!(category, clip = %name, error = %e, "activity import error, skipping");
                continue;
            }
        };
        // Provenance: the originating packet body plus the source file paths.
        activity.set_attribute("act", serde_json::to_value(act).unwrap_or_default());
        activity.set_attribute("act_yaml", json!(paths.activities.display().to_string()));
        activity.set_attribute("geom_yaml", json!(paths.geom.display().to_string()));
        activities.push(activity);
    }

    let tracks: HashMap<Uuid, Track> = actor_tracks
        .into_values()
        .map(|t| (t.id(), t))
        .collect();

    info!(
        clip = %name,
        tracks = tracks.len(),
        activities = activities.len(),
        "parsed KPF clip"
    );

    Ok(MevaClip {
        name,
        framerate: MEVA_FRAMERATE,
        tracks,
        activities,
    })
}

/// Parse many clips, fanning out over `options.workers` threads.
///
/// Per-clip failures are returned in place so one bad triple does not sink
/// the batch.
pub fn parse_clips(clips: &[ClipPaths], options: &MevaOptions) -> Result<Vec<Result<MevaClip>>> {
    info!(clips = clips.len(), workers = options.workers, "parsing KPF clips");
    if options.workers <= 1 {
        return Ok(clips.iter().map(|c| parse_clip(c, options)).collect());
    }
    batch_map(clips.to_vec(), options.workers, |c| parse_clip(&c, options))
}

/// Discover KPF triples under a directory tree.
///
/// Files are grouped by stem: `X.types.yml`, `X.geom.yml`,
/// `X.activities.yml`. Incomplete triples are logged and dropped. Results
/// are sorted by stem for deterministic ordering.
pub fn discover_clips(dir: &Path) -> Result<Vec<ClipPaths>> {
    let mut types = BTreeMap::new();
    let mut geoms = BTreeMap::new();
    let mut acts = BTreeMap::new();
    collect_yaml(dir, &mut types, &mut geoms, &mut acts)?;

    let mut clips = Vec::new();
    for (stem, types_path) in types {
        match (geoms.remove(&stem), acts.remove(&stem)) {
            (Some(geom), Some(activities)) => clips.push(ClipPaths {
                types: types_path,
                geom,
                activities,
            }),
            _ => warn!(stem = %stem, "incomplete KPF triple, skipping"),
        }
    }
    for stem in geoms.keys().chain(acts.keys()) {
        warn!(stem = %stem, "incomplete KPF triple, skipping");
    }
    Ok(clips)
}

fn collect_yaml(
    dir: &Path,
    types: &mut BTreeMap<String, PathBuf>,
    geoms: &mut BTreeMap<String, PathBuf>,
    acts: &mut BTreeMap<String, PathBuf>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_yaml(&path, types, geoms, acts)?;
            continue;
        }
        let Some(filename) = path.file_name().and_then(|f| f.to_str()) else {
            continue;
        };
        for (suffix, map) in [
            (".types.yml", &mut *types),
            (".geom.yml", &mut *geoms),
            (".activities.yml", &mut *acts),
        ] {
            if let Some(stem) = filename.strip_suffix(suffix) {
                map.insert(stem.to_string(), path.clone());
            }
        }
    }
    Ok(())
}

/// Read one KPF file as a list of packets.
///
/// Decoding is per-packet: a structurally malformed entry (say a geom
/// missing its `ts0`) is logged and dropped without failing the rest of the
/// file. A file that is not well-formed YAML is still a hard error.
fn read_packets(path: &Path) -> Result<Vec<Packet>> {
    let contents = fs::read_to_string(path)?;
    let entries: Vec<serde_yaml::Value> = serde_yaml::from_str(&contents)?;

    let mut packets = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        match serde_yaml::from_value(entry) {
            Ok(packet) => packets.push(packet),
            Err(e) => warn!(
                index,
                file = %path.display(),
                error = %e,
                "malformed packet, skipping"
            ),
        }
    }
    Ok(packets)
}

/// The video name from a file's leading meta packet, extension stripped.
fn video_name(packets: &[Packet], path: &Path) -> Result<String> {
    let meta = packets
        .iter()
        .find_map(|p| p.meta.as_ref())
        .and_then(|m| m.as_str())
        .ok_or_else(|| {
            Error::Dataset(format!(
                "no meta packet with video name in {}",
                path.display()
            ))
        })?;
    Ok(meta.trim().trim_end_matches(".avi").to_string())
}

/// Highest-confidence category from a cset map.
fn top_category(cset: &BTreeMap<String, f64>) -> Option<&str> {
    cset.iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(category, _)| category.as_str())
}

/// Parse a g0 packet value: four space-separated corner coordinates.
fn parse_g0(g0: &str) -> Option<BoundingBox> {
    let mut coords = g0.split_whitespace().map(|x| x.parse::<f64>());
    let xmin = coords.next()?.ok()?;
    let ymin = coords.next()?.ok()?;
    let xmax = coords.next()?.ok()?;
    let ymax = coords.next()?.ok()?;
    if coords.next().is_some() {
        return None;
    }
    Some(BoundingBox::new(xmin, ymin, xmax, ymax))
}

/// Standard MEVA activity vocabulary to abbreviated display labels.
///
/// Activities are displayed as "Noun Verbing" next to their participating
/// tracks; the shortlabel supplies the verbing part.
fn category_to_shortlabel() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("person_abandons_package", "abandoning"),
        ("person_closes_facility_door", "closing"),
        ("person_closes_trunk", "closing trunk"),
        ("person_closes_vehicle_door", "closing door"),
        ("person_embraces_person", "hugging"),
        ("person_enters_scene_through_structure", "entering"),
        ("person_enters_vehicle", "entering"),
        ("person_exits_scene_through_structure", "exiting"),
        ("person_exits_vehicle", "exiting"),
        ("hand_interacts_with_person", "using hand"),
        ("person_carries_heavy_object", "carrying"),
        ("person_interacts_with_laptop", "using laptop"),
        ("person_loads_vehicle", "loading"),
        ("person_transfers_object", "transferring"),
        ("person_opens_facility_door", "opening door"),
        ("person_opens_trunk", "opening trunk"),
        ("person_opens_vehicle_door", "opening door"),
        ("person_talks_to_person", "talking"),
        ("person_picks_up_object", "picking up"),
        ("person_purchases", "purchasing"),
        ("person_reads_document", "reading"),
        ("person_rides_bicycle", "riding"),
        ("person_puts_down_object", "putting down"),
        ("person_sits_down", "sitting"),
        ("person_stands_up", "standing"),
        ("person_talks_on_phone", "talking"),
        ("person_texts_on_phone", "texting"),
        ("person_steals_object", "stealing"),
        ("person_unloads_vehicle", "unloading"),
        ("vehicle_drops_off_person", "dropping off"),
        ("vehicle_picks_up_person", "picking up"),
        ("vehicle_reverses", "reversing"),
        ("vehicle_starts", "starting"),
        ("vehicle_stops", "stopping"),
        ("vehicle_turns_left", "turning left"),
        ("vehicle_turns_right", "turning right"),
        ("vehicle_makes_u_turn", "turning around"),
    ])
}
