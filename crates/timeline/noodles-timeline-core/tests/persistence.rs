use noodles_timeline_core::{
    config::TimelineConfig,
    data::{ControlOffset, HandlerType, Keyframe, TangentHandling},
    error::LoadIssue,
    persist::{load_timeline, load_timeline_json, save_timeline, save_timeline_json, TreeNode},
    timeline::Timeline,
    uniform::{GlslType, UniformInfo},
};

fn approx(a: f32, b: f32, eps: f32) {
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

#[test]
fn fade_fixture_loads_and_evaluates() {
    let json = noodles_test_fixtures::timelines::json("fade").expect("load fade fixture");
    let (mut tl, issues) =
        load_timeline_json(&json, &TimelineConfig::default()).expect("parse fade");
    assert!(issues.is_empty(), "{issues:?}");
    assert_eq!(tl.frame_range().end, 100);
    assert_eq!(tl.transport().frame_rate_ms, 33);

    let track = tl.track("uAlpha").expect("uAlpha track");
    assert_eq!(track.glsl_type, GlslType::Float);
    assert_eq!(track.widget, "slider");
    // loaded tracks wait for the shader to declare them
    assert!(!track.active);
    assert!(tl.animated_channels().is_empty());
    approx(tl.evaluate("uAlpha", 0, 25).unwrap(), 0.25, 1e-6);

    tl.sync_uniforms(&[UniformInfo::new("uAlpha", GlslType::Float)]);
    assert_eq!(tl.animated_channels().len(), 1);
}

#[test]
fn bounce_fixture_keeps_handles() {
    let root: TreeNode =
        noodles_test_fixtures::timelines::load("bounce").expect("load bounce fixture");
    let (tl, issues) = load_timeline(&root, &TimelineConfig::default());
    assert!(issues.is_empty(), "{issues:?}");
    assert_eq!(tl.frame_range().end, 60);
    assert_eq!(tl.transport().frame_rate_ms, 16);

    let top = tl.key("uOffset", 1, 30).expect("key at 30");
    assert_eq!(top.tangent, TangentHandling::Both);
    assert_eq!(top.handler, HandlerType::AlignedSymmetric);
    assert_eq!(top.control_in, ControlOffset::new(-5.0, 0.0));
    assert_eq!(top.control_out, ControlOffset::new(5.0, 0.0));

    let start = tl.key("uOffset", 1, 0).expect("key at 0");
    assert_eq!(start.outgoing(), Some(ControlOffset::new(10.0, 1.0)));
    assert_eq!(start.incoming(), None);
}

#[test]
fn damaged_fixture_skips_bad_entries_and_keeps_the_rest() {
    let root: TreeNode =
        noodles_test_fixtures::timelines::load("damaged").expect("load damaged fixture");
    let (tl, issues) = load_timeline(&root, &TimelineConfig::default());

    assert_eq!(tl.uniform_names(), vec!["uGain".to_string()]);
    let frames: Vec<i32> = tl.list_frames("uGain", 0).collect();
    // frame 80 is clamped into 0..=50; its bogus handler falls back to Free
    assert_eq!(frames, vec![0, 50]);
    assert_eq!(tl.key("uGain", 0, 50).map(|k| k.handler), Some(HandlerType::Free));
    assert_eq!(tl.key("uGain", 0, 0).map(|k| k.value), Some(0.5));

    assert!(issues.contains(&LoadIssue::MissingAttribute {
        element: "uniform".into(),
        attribute: "name".into()
    }));
    assert!(issues.contains(&LoadIssue::MissingAttribute {
        element: "key".into(),
        attribute: "value".into()
    }));
    assert!(issues.contains(&LoadIssue::InvalidAttribute {
        element: "key".into(),
        attribute: "frame".into(),
        value: "twenty".into()
    }));
    assert!(issues.contains(&LoadIssue::InvalidAttribute {
        element: "channel".into(),
        attribute: "index".into(),
        value: "9".into()
    }));
    assert!(issues.contains(&LoadIssue::UnexpectedElement {
        parent: "timeline".into(),
        found: "camera".into()
    }));
    assert_eq!(issues.len(), 7, "{issues:?}");
}

#[test]
fn save_then_load_reproduces_the_timeline() {
    let mut tl = Timeline::with_range(TimelineConfig::default(), 0, 240);
    tl.set_frame_rate_ms(20);
    let info = UniformInfo::new("uTint", GlslType::Vec3);
    tl.ensure_track(&info);
    tl.add_key("uTint", 0, 0, 0.1);
    tl.add_key_with(
        "uTint",
        2,
        120,
        Keyframe::new(0.75)
            .with_in(ControlOffset::new(-8.5, 0.125))
            .with_out(ControlOffset::new(4.0, -0.5))
            .with_handler(HandlerType::Aligned),
    );
    tl.add_key("uTint", 2, 240, 1.0 / 3.0);

    let text = save_timeline_json(&tl).expect("serialize");
    let (mut back, issues) = load_timeline_json(&text, &TimelineConfig::default()).expect("reload");
    assert!(issues.is_empty(), "{issues:?}");
    assert_eq!(back.frame_range(), tl.frame_range());
    assert_eq!(back.transport().frame_rate_ms, 20);
    assert_eq!(back.track("uTint").map(|t| t.glsl_type), Some(GlslType::Vec3));
    for channel in 0..4 {
        let a: Vec<_> = tl.keys("uTint", channel).map(|(f, k)| (f, *k)).collect();
        let b: Vec<_> = back.keys("uTint", channel).map(|(f, k)| (f, *k)).collect();
        assert_eq!(a, b, "channel {channel}");
    }
    for frame in [0, 60, 119, 120, 121, 200, 240] {
        assert_eq!(back.evaluate("uTint", 2, frame), tl.evaluate("uTint", 2, frame));
    }
}

#[test]
fn disabled_handle_offsets_are_not_written() {
    let mut tl = Timeline::new(TimelineConfig::default());
    let mut key = Keyframe::new(1.0).with_out(ControlOffset::new(3.0, 1.0));
    key.control_in = ControlOffset::new(-7.0, 2.0);
    tl.add_key_with("u", 0, 10, key);

    let root = save_timeline(&tl);
    assert_eq!(root.attr("frameRange"), Some("0;100"));
    let key_node = &root.children[0].children[0].children[0];
    assert_eq!(key_node.attr("tangentHandling"), Some("right"));
    assert_eq!(key_node.attr("controlOutFrameOffset"), Some("3"));
    assert!(key_node.attr("controlInFrameOffset").is_none());
}

#[test]
fn empty_tracks_are_not_saved() {
    let mut tl = Timeline::new(TimelineConfig::default());
    tl.ensure_track(&UniformInfo::new("uIdle", GlslType::Float));
    tl.add_key("uBusy", 0, 0, 1.0);
    let root = save_timeline(&tl);
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].attr("name"), Some("uBusy"));
}

#[test]
fn malformed_text_is_a_document_error() {
    assert!(load_timeline_json("{ not json", &TimelineConfig::default()).is_err());
}

#[test]
fn channels_past_the_arity_are_not_saved() {
    let mut tl = Timeline::new(TimelineConfig::default());
    tl.add_key("uLevel", 0, 0, 1.0);
    tl.add_key("uLevel", 2, 0, 3.0);
    tl.sync_uniforms(&[UniformInfo::new("uLevel", GlslType::Float)]);

    let text = save_timeline_json(&tl).expect("save");
    let (loaded, issues) = load_timeline_json(&text, &TimelineConfig::default()).expect("parse");
    assert!(issues.is_empty(), "{issues:?}");
    let track = loaded.track("uLevel").expect("uLevel track");
    assert_eq!(track.key_count(), 1);
    assert!(loaded.key("uLevel", 0, 0).is_some());
}
