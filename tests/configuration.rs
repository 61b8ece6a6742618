//! ExtractOptions and thread-count validation tests.

use std::time::Duration;

use framesnap::{ExtractOptions, FramesnapError, thread_count_from_arg};

#[test]
fn config_defaults() {
    let options = ExtractOptions::new();
    assert_eq!(options.threads(), 4);
    assert_eq!(options.quality(), 95);
    assert!(options.validate().is_ok());

    let debug = format!("{options:?}");
    assert!(debug.contains("ExtractOptions"));
    assert!(debug.contains("threads: 4"));
    assert!(debug.contains("quality: 95"));
}

#[test]
fn config_builder_overrides() {
    let options = ExtractOptions::new()
        .with_threads(12)
        .with_quality(70)
        .with_report_interval(Duration::from_millis(250));
    assert_eq!(options.threads(), 12);
    assert_eq!(options.quality(), 70);
    assert!(format!("{options:?}").contains("250ms"));
}

#[test]
fn zero_threads_is_rejected() {
    let error = ExtractOptions::new().with_threads(0).validate().unwrap_err();
    assert!(matches!(error, FramesnapError::InvalidThreadCount { threads: 0 }));
    assert!(error.is_config_error());
}

#[test]
fn quality_out_of_range_is_rejected() {
    for quality in [0, 101, 255] {
        let error = ExtractOptions::new()
            .with_quality(quality)
            .validate()
            .unwrap_err();
        assert!(
            matches!(error, FramesnapError::InvalidQuality { .. }),
            "quality {quality}: {error}"
        );
    }

    assert!(ExtractOptions::new().with_quality(1).validate().is_ok());
    assert!(ExtractOptions::new().with_quality(100).validate().is_ok());
}

#[test]
fn thread_count_argument_conversion() {
    assert_eq!(thread_count_from_arg(1).unwrap(), 1);
    assert_eq!(thread_count_from_arg(64).unwrap(), 64);

    let error = thread_count_from_arg(-1).unwrap_err();
    assert!(matches!(error, FramesnapError::InvalidThreadCount { threads: -1 }));
    assert!(error.to_string().contains("thread count"));

    assert!(thread_count_from_arg(0).is_err());
    assert!(thread_count_from_arg(i64::MIN).is_err());
}

#[test]
fn non_config_errors_are_not_config_errors() {
    assert!(!FramesnapError::NoVideoStream.is_config_error());
}
