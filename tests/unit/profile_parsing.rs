//! Unit tests for the motion profile wire format.

use slider_motion::error::{Error, ProfileError};
use slider_motion::motion::{EasingSpec, MotionProfile, DEFAULT_MAX_ACCEL_MM_S2, DEFAULT_MAX_SPEED_MM_S};

/// Test parsing a profile with every field present.
#[test]
fn test_parse_full_profile() {
    let json = r#"{
        "length_mm": 1200,
        "keyframes": [
            {"t": 0, "pos_mm": 0, "ease": {"type": "linear"}},
            {"t": 4, "pos_mm": 400, "ease": {"type": "cubic-bezier", "p": [0.25, 0.1, 0.25, 1.0]}}
        ],
        "max_speed_mm_s": 80,
        "max_accel_mm_s2": 150
    }"#;

    let profile = MotionProfile::from_json(json).expect("Profile should parse");
    assert_eq!(profile.length_mm, 1200.0);
    assert_eq!(profile.keyframes.len(), 2);
    assert_eq!(profile.keyframes[0].ease, EasingSpec::Linear);
    assert_eq!(
        profile.keyframes[1].ease,
        EasingSpec::cubic_bezier(0.25, 0.1, 0.25, 1.0)
    );
    assert_eq!(profile.max_speed_mm_s, 80.0);
    assert_eq!(profile.max_accel_mm_s2, 150.0);
}

/// Test that optional fields take their defaults.
#[test]
fn test_parse_minimal_profile() {
    let json = r#"{"length_mm": 500, "keyframes": [{"t": 0, "pos_mm": 10}, {"t": 2, "pos_mm": 90}]}"#;

    let profile = MotionProfile::from_json(json).expect("Profile should parse");
    assert_eq!(profile.keyframes[1].ease, EasingSpec::Linear);
    assert_eq!(profile.max_speed_mm_s, DEFAULT_MAX_SPEED_MM_S);
    assert_eq!(profile.max_accel_mm_s2, DEFAULT_MAX_ACCEL_MM_S2);
    assert_eq!(profile.duration(), 2.0);
    assert_eq!(profile.start_position(), Some(10.0));
}

/// Test that keyframes are sorted by time on parse.
#[test]
fn test_keyframes_sorted() {
    let json = r#"{"length_mm": 500, "keyframes": [
        {"t": 3, "pos_mm": 300}, {"t": 0, "pos_mm": 0}, {"t": 1, "pos_mm": 100}
    ]}"#;

    let profile = MotionProfile::from_json(json).unwrap();
    let times: Vec<f32> = profile.keyframes.iter().map(|k| k.t).collect();
    assert_eq!(times, vec![0.0, 1.0, 3.0]);
}

/// Test that unknown easing types are parse errors, not silently linear.
#[test]
fn test_unknown_easing_rejected() {
    let json = r#"{"length_mm": 500, "keyframes": [
        {"t": 0, "pos_mm": 0}, {"t": 1, "pos_mm": 100, "ease": {"type": "bounce"}}
    ]}"#;

    assert!(matches!(
        MotionProfile::from_json(json),
        Err(Error::Profile(ProfileError::ParseError(_)))
    ));
}

/// Test that bezier control points must be exactly four numbers.
#[test]
fn test_bezier_arity_enforced() {
    let json = r#"{"length_mm": 500, "keyframes": [
        {"t": 0, "pos_mm": 0}, {"t": 1, "pos_mm": 100, "ease": {"type": "cubic-bezier", "p": [0.1, 0.2, 0.3]}}
    ]}"#;

    let err = MotionProfile::from_json(json).unwrap_err();
    assert!(err.is_invalid_profile());
}

/// Test the structural rejections.
#[test]
fn test_invalid_profiles_rejected() {
    let cases = [
        r#"{"length_mm": 500, "keyframes": [{"t": 0, "pos_mm": 0}]}"#,
        r#"{"length_mm": 500, "keyframes": [{"t": 0, "pos_mm": 0}, {"t": 0, "pos_mm": 50}]}"#,
        r#"{"length_mm": 500, "keyframes": [{"t": -1, "pos_mm": 0}, {"t": 1, "pos_mm": 50}]}"#,
        r#"{"length_mm": 500, "keyframes": [{"t": 0, "pos_mm": 0}, {"t": 1, "pos_mm": 501}]}"#,
        r#"{"length_mm": 0, "keyframes": [{"t": 0, "pos_mm": 0}, {"t": 1, "pos_mm": 0}]}"#,
        r#"{"length_mm": 500, "keyframes": [{"t": 0, "pos_mm": 0}, {"t": 1, "pos_mm": 50}], "max_speed_mm_s": 0}"#,
        r#"{"keyframes": [{"t": 0, "pos_mm": 0}, {"t": 1, "pos_mm": 50}]}"#,
    ];

    for json in cases {
        let result = MotionProfile::from_json(json);
        assert!(
            result.as_ref().is_err_and(Error::is_invalid_profile),
            "{} should be rejected, got {:?}",
            json,
            result
        );
    }
}

/// Test that encoding keeps the wire field names.
#[test]
fn test_encode_wire_names() {
    let json = r#"{"length_mm": 500, "keyframes": [{"t": 0, "pos_mm": 0}, {"t": 1, "pos_mm": 50, "ease": {"type": "cubic-bezier", "p": [0.4, 0.0, 0.2, 1.0]}}]}"#;
    let encoded = MotionProfile::from_json(json).unwrap().to_json().unwrap();

    assert!(encoded.contains(r#""length_mm":500"#));
    assert!(encoded.contains(r#""pos_mm":50"#));
    assert!(encoded.contains(r#""type":"cubic-bezier""#));
    assert!(encoded.contains(r#""max_speed_mm_s":120"#));
}
