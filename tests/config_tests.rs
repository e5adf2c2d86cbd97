// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use pyramid_denoise::{DenoiseConfig, DenoiseError, DenoiseParameters, NoiseLevelFunction};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_config_default() {
    let config = DenoiseConfig::default();
    assert_eq!(config.levels, 5, "Default pyramid depth should be 5");
    assert_eq!(config.parameters.len(), config.levels);
    assert!(config.nlf.is_empty(), "Default NLF should be derived");
    assert!(config.debug_dump_dir.is_none());
}

#[test]
fn test_load_partial_config() {
    let file = write_config(
        r#"{
            "levels": 3,
            "parameters": [{ "luma": 2.0 }, {}, { "sharpening": 1.5 }]
        }"#,
    );
    let config = DenoiseConfig::load(file.path()).unwrap();
    assert_eq!(config.levels, 3);
    assert_eq!(config.parameters[0].luma, 2.0);
    assert_eq!(config.parameters[1], DenoiseParameters::default());
    assert_eq!(config.parameters[2].sharpening, 1.5);
    assert_eq!(config.level_nlf().len(), 3);
}

#[test]
fn test_load_rejects_mismatched_parameters() {
    let file = write_config(r#"{ "levels": 3, "parameters": [{}] }"#);
    let err = DenoiseConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, DenoiseError::Config(ref msg) if msg.contains("3 levels")));
}

#[test]
fn test_load_rejects_malformed_json() {
    let file = write_config("{ levels: ");
    assert!(matches!(
        DenoiseConfig::load(file.path()),
        Err(DenoiseError::Config(_))
    ));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let missing = std::env::temp_dir().join("pyramid_denoise_no_such_config.json");
    assert!(matches!(
        DenoiseConfig::load(&missing),
        Err(DenoiseError::Io(_))
    ));
}

#[test]
fn test_explicit_nlf_is_used_verbatim() {
    let nlf = vec![
        NoiseLevelFunction::new([0.1, 0.2, 0.3], [0.4, 0.5, 0.6]),
        NoiseLevelFunction::ZERO,
    ];
    let mut config = DenoiseConfig {
        nlf: nlf.clone(),
        ..Default::default()
    };
    config.set_levels(2);
    assert_eq!(config.level_nlf(), nlf);
}

#[test]
fn test_zero_levels_is_invalid() {
    let mut config = DenoiseConfig::default();
    config.set_levels(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_config_round_trips_through_json() {
    let mut config = DenoiseConfig::default();
    config.set_levels(2);
    config.parameters[1].chroma_boost = 3.0;
    let json = serde_json::to_string(&config).unwrap();
    let back: DenoiseConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
