#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn defaults_match_documented_values() {
    let config = Config::try_parse_from(["pipedview"]).expect("defaults parse");
    assert_eq!(config.wire, Wire::Json);
    assert_eq!(config.dpi(), (DEFAULT_DPI, DEFAULT_DPI));
    assert_eq!(config.font, None);
    assert!(!config.hidden);
    let options = config.pump_options();
    assert_eq!(options.time_slice, Duration::from_millis(DEFAULT_TIME_SLICE_MS));
    assert_eq!(options.poll_interval, Duration::from_millis(DEFAULT_POLL_INTERVAL_MS));
}

#[test]
fn flags_override_defaults() {
    let config = Config::try_parse_from([
        "pipedview",
        "--wire",
        "proto",
        "--dpi-x",
        "110",
        "--dpi-y",
        "120.5",
        "--font",
        "/tmp/font.ttf",
        "--time-slice-ms",
        "20",
        "--hidden",
    ])
    .expect("flags parse");
    assert_eq!(config.wire, Wire::Proto);
    assert_eq!(config.dpi(), (110.0, 120.5));
    assert_eq!(config.font, Some(PathBuf::from("/tmp/font.ttf")));
    assert_eq!(config.pump_options().time_slice, Duration::from_millis(20));
    assert!(config.hidden);
}

#[test]
fn non_positive_dpi_is_rejected() {
    assert!(Config::try_parse_from(["pipedview", "--dpi-x", "0"]).is_err());
    assert!(Config::try_parse_from(["pipedview", "--dpi-y", "-3"]).is_err());
    assert!(Config::try_parse_from(["pipedview", "--dpi-y", "wide"]).is_err());
}

#[test]
fn zero_poll_interval_is_rejected() {
    assert!(Config::try_parse_from(["pipedview", "--poll-interval-ms", "0"]).is_err());
}

#[test]
fn unknown_wire_is_rejected() {
    assert!(Config::try_parse_from(["pipedview", "--wire", "xml"]).is_err());
}
