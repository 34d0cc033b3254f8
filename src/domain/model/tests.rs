// Unit tests for domain models

use super::*;
use crate::domain::errors::*;

#[test]
fn test_time_spec_parse_seconds() {
    let time = TimeSpec::parse("123.456").unwrap();
    assert_eq!(time.seconds, 123.456);
}

#[test]
fn test_time_spec_parse_mm_ss() {
    let time = TimeSpec::parse("01:30.5").unwrap();
    assert_eq!(time.seconds, 90.5);
}

#[test]
fn test_time_spec_parse_hh_mm_ss() {
    let time = TimeSpec::parse("01:02:03.5").unwrap();
    assert_eq!(time.seconds, 3723.5);
}

#[test]
fn test_time_spec_parse_invalid() {
    assert!(TimeSpec::parse("invalid").is_err());
    assert!(TimeSpec::parse("00:60").is_err());
    assert!(TimeSpec::parse("01:75:00").is_err());
    assert!(TimeSpec::parse("-10").is_err());
    assert!(TimeSpec::parse("inf").is_err());
    assert!(matches!(
        TimeSpec::parse("1:2:3:4"),
        Err(DomainError::InvalidInput(_))
    ));
}

#[test]
fn test_time_spec_display() {
    assert_eq!(TimeSpec::from_seconds(3723.456).to_string(), "01:02:03.456");
    assert_eq!(TimeSpec::from_seconds(123.456).to_string(), "02:03.456");
}

#[test]
fn test_media_info_rejects_unusable_duration() {
    assert!(matches!(
        MediaInfo::new(0.0, None, vec![]),
        Err(DomainError::ProbeFailed(_))
    ));
    assert!(MediaInfo::new(f64::NAN, None, vec![]).is_err());
    assert!(MediaInfo::new(12.5, Some("mov,mp4".to_string()), vec![]).is_ok());
}

#[test]
fn test_media_info_stream_lookup() {
    let info = MediaInfo::new(
        10.0,
        None,
        vec![
            StreamInfo {
                index: 0,
                codec_type: "audio".to_string(),
                codec_name: Some("aac".to_string()),
                width: None,
                height: None,
            },
            StreamInfo {
                index: 1,
                codec_type: "video".to_string(),
                codec_name: Some("h264".to_string()),
                width: Some(1280),
                height: Some(720),
            },
        ],
    )
    .unwrap();

    assert_eq!(info.primary_video_stream().unwrap().index, 1);
    assert!(info.has_audio());
}

#[test]
fn test_recipe_uses_millisecond_precision() {
    let a = Recipe::trim(&TimeRange::new(0.0, 3.0004));
    let b = Recipe::trim(&TimeRange::new(0.0, 3.0));
    assert_eq!(a, b);
    assert_ne!(Recipe::frame(1.0, 320), Recipe::frame(1.0, 640));
}

#[test]
fn test_source_asset_extension() {
    let asset = SourceAsset::new("abc.mov", "/tmp/uploads/abc.mov");
    assert_eq!(asset.extension(), ".mov");
    assert_eq!(asset.cached_duration(), None);

    let bare = SourceAsset::new("abc", "/tmp/uploads/abc");
    assert_eq!(bare.extension(), "");
}

#[test]
fn test_validate_identifier() {
    assert!(validate_identifier("1718000000000_42.mp4").is_ok());
    for bad in ["", ".", "..", "../etc/passwd", "a/b", "a\\b", ".pending-x"] {
        assert!(
            matches!(validate_identifier(bad), Err(DomainError::InvalidInput(_))),
            "{:?} should be rejected",
            bad
        );
    }
}
