//! End-to-end tests for MEVA KPF ingestion.
//!
//! Fixture YAML triples are written to a tempdir and parsed back through the
//! public dataset API.

use annotrack::dataset::{discover_clips, parse_clip, parse_clips, ClipPaths, MevaOptions};
use annotrack::Boundary;
use approx::assert_relative_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_clip(dir: &Path, stem: &str, types: &str, geom: &str, activities: &str) -> ClipPaths {
    let paths = ClipPaths {
        types: dir.join(format!("{}.types.yml", stem)),
        geom: dir.join(format!("{}.geom.yml", stem)),
        activities: dir.join(format!("{}.activities.yml", stem)),
    };
    fs::write(&paths.types, types).unwrap();
    fs::write(&paths.geom, geom).unwrap();
    fs::write(&paths.activities, activities).unwrap();
    paths
}

fn fixture_clip(dir: &Path, stem: &str) -> ClipPaths {
    let types = format!(
        r#"
- {{ meta: "{stem}.avi" }}
- {{ types: {{ id1: 1, cset3: {{ person: 1.0 }} }} }}
- {{ types: {{ id1: 2, cset3: {{ vehicle: 1.0 }} }} }}
"#
    );
    // Person moves x 0 -> 100 over frames 0..10 (one packet out of order);
    // vehicle is static. One geometry packet carries a degenerate box.
    let geom = format!(
        r#"
- {{ meta: "{stem}.avi" }}
- {{ geom: {{ id0: 0, id1: 1, ts0: 0, g0: "0 0 10 10" }} }}
- {{ geom: {{ id0: 1, id1: 1, ts0: 10, g0: "100 0 110 10" }} }}
- {{ geom: {{ id0: 2, id1: 1, ts0: 5, g0: "50 0 60 10" }} }}
- {{ geom: {{ id0: 3, id1: 2, ts0: 0, g0: "200 0 280 40" }} }}
- {{ geom: {{ id0: 4, id1: 2, ts0: 20, g0: "200 0 280 40" }} }}
- {{ geom: {{ id0: 5, id1: 2, ts0: 25, g0: "5 5 5 5" }} }}
"#
    );
    let activities = format!(
        r#"
- {{ meta: "{stem}.avi" }}
- {{ act: {{ act2: {{ person_enters_vehicle: 1.0 }}, id2: 1, timespan: [ {{ tsr0: [0, 20] }} ], actors: [ {{ id1: 1 }}, {{ id1: 2 }} ] }} }}
- {{ act: {{ act2: {{ person_sits_down: 1.0 }}, id2: 2, timespan: [ {{ tsr0: [0, 5] }} ], actors: [ {{ id1: 99 }} ] }} }}
"#
    );
    write_clip(dir, stem, &types, &geom, &activities)
}

#[test]
fn test_parse_clip_builds_tracks_and_activities() {
    let dir = TempDir::new().unwrap();
    let paths = fixture_clip(dir.path(), "clip01");

    let clip = parse_clip(&paths, &MevaOptions::default()).unwrap();

    assert_eq!(clip.name, "clip01");
    assert_relative_eq!(clip.framerate, 30.0);
    assert_eq!(clip.tracks.len(), 2);

    let person = clip
        .tracks
        .values()
        .find(|t| t.category() == "person")
        .expect("person track");
    let vehicle = clip
        .tracks
        .values()
        .find(|t| t.category() == "vehicle")
        .expect("vehicle track");

    // Out-of-order packets were sorted; tracks import with strict boundary
    // and the corpus frame rate.
    assert_eq!(person.keyframes(), &[0, 5, 10]);
    assert_eq!(person.boundary(), Boundary::Strict);
    assert_eq!(person.framerate(), Some(30.0));

    // The degenerate vehicle box at frame 25 was dropped.
    assert_eq!(vehicle.keyframes(), &[0, 20]);

    // The actor-less activity was dropped; the real one joined its actors.
    assert_eq!(clip.activities.len(), 1);
    let activity = &clip.activities[0];
    assert_eq!(activity.category(), "person_enters_vehicle");
    assert_eq!(activity.shortlabel(), "entering");
    assert_eq!(activity.startframe(), 0);
    assert_eq!(activity.endframe(), 20);
    assert_eq!(activity.subject(), Some(person.id()));
    assert_eq!(activity.objects(), &[vehicle.id()]);
    assert!(activity.attributes().contains_key("act_yaml"));

    // The source packet body rides along as provenance.
    let act = &activity.attributes()["act"];
    assert_eq!(act["act2"]["person_enters_vehicle"], serde_json::json!(1.0));
    assert_eq!(act["timespan"][0]["tsr0"], serde_json::json!([0, 20]));
    assert_eq!(act["actors"].as_array().unwrap().len(), 2);

    // Derived detections from a participant are members.
    let det = person.interpolate(5).unwrap();
    assert!(activity.has_track(&det));
}

#[test]
fn test_parse_clip_rejects_mismatched_video_names() {
    let dir = TempDir::new().unwrap();
    let paths = write_clip(
        dir.path(),
        "clip02",
        "- { meta: \"clip02.avi\" }\n",
        "- { meta: \"otherclip.avi\" }\n",
        "- { meta: \"clip02.avi\" }\n",
    );

    let err = parse_clip(&paths, &MevaOptions::default()).unwrap_err();
    assert!(err.to_string().contains("mismatched video names"));
}

#[test]
fn test_stride_decimation_reconstructs_by_interpolation() {
    let dir = TempDir::new().unwrap();

    // Eleven densely annotated frames of linear motion, x = 10 * frame.
    let mut geom = String::from("- { meta: \"dense.avi\" }\n");
    for frame in 0..=10 {
        geom.push_str(&format!(
            "- {{ geom: {{ id0: {frame}, id1: 1, ts0: {frame}, g0: \"{} 0 {} 10\" }} }}\n",
            frame * 10,
            frame * 10 + 10,
        ));
    }
    let paths = write_clip(
        dir.path(),
        "dense",
        "- { meta: \"dense.avi\" }\n- { types: { id1: 1, cset3: { person: 1.0 } } }\n",
        &geom,
        "- { meta: \"dense.avi\" }\n",
    );

    let dense = parse_clip(&paths, &MevaOptions::default()).unwrap();
    let strided = parse_clip(
        &paths,
        &MevaOptions {
            stride: 5,
            ..Default::default()
        },
    )
    .unwrap();

    let dense_track = dense.tracks.values().next().unwrap();
    let strided_track = strided.tracks.values().next().unwrap();

    assert_eq!(dense_track.num_keyframes(), 11);
    assert!(strided_track.num_keyframes() < 11);
    assert_eq!(strided_track.startframe(), 0);
    assert_eq!(strided_track.endframe(), 10);

    // Linear motion survives decimation exactly.
    for frame in 0..10 {
        let full = dense_track.interpolate(frame).unwrap();
        let reconstructed = strided_track.interpolate(frame).unwrap();
        assert_relative_eq!(full.bbox().xmin, reconstructed.bbox().xmin);
        assert_relative_eq!(full.bbox().width(), reconstructed.bbox().width());
    }
}

#[test]
fn test_malformed_packets_are_skipped() {
    let dir = TempDir::new().unwrap();
    // The middle geometry packet is missing its ts0 field; only that packet
    // should be dropped.
    let geom = "\
- { meta: \"sparse.avi\" }
- { geom: { id0: 0, id1: 1, ts0: 0, g0: \"0 0 10 10\" } }
- { geom: { id0: 1, id1: 1, g0: \"50 0 60 10\" } }
- { geom: { id0: 2, id1: 1, ts0: 10, g0: \"100 0 110 10\" } }
";
    let paths = write_clip(
        dir.path(),
        "sparse",
        "- { meta: \"sparse.avi\" }\n- { types: { id1: 1, cset3: { person: 1.0 } } }\n",
        geom,
        "- { meta: \"sparse.avi\" }\n",
    );

    let clip = parse_clip(&paths, &MevaOptions::default()).unwrap();
    let person = clip.tracks.values().next().expect("person track");
    assert_eq!(person.keyframes(), &[0, 10]);
}

#[test]
fn test_discover_clips_pairs_triples() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("drop-01");
    fs::create_dir(&nested).unwrap();

    fixture_clip(&nested, "clip01");
    fixture_clip(dir.path(), "clip02");
    // Incomplete triple: types file only.
    fs::write(dir.path().join("broken.types.yml"), "- { meta: \"broken.avi\" }\n").unwrap();

    let clips = discover_clips(dir.path()).unwrap();
    assert_eq!(clips.len(), 2);

    let stems: Vec<String> = clips
        .iter()
        .map(|c| {
            c.types
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .strip_suffix(".types.yml")
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(stems, vec!["clip01", "clip02"]);
}

#[test]
fn test_parse_clips_parallel_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let clips = vec![
        fixture_clip(dir.path(), "clip01"),
        fixture_clip(dir.path(), "clip02"),
        fixture_clip(dir.path(), "clip03"),
    ];

    let sequential = parse_clips(&clips, &MevaOptions::default()).unwrap();
    let parallel = parse_clips(
        &clips,
        &MevaOptions {
            workers: 2,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(sequential.len(), 3);
    assert_eq!(parallel.len(), 3);
    for (s, p) in sequential.iter().zip(parallel.iter()) {
        let s = s.as_ref().unwrap();
        let p = p.as_ref().unwrap();
        // Order is preserved and content agrees.
        assert_eq!(s.name, p.name);
        assert_eq!(s.tracks.len(), p.tracks.len());
        assert_eq!(s.activities.len(), p.activities.len());
    }
}
