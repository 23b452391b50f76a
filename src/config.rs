use crate::colorizer::DEFAULT_NUM_COLORS;
use crate::decoder::LoadOptions;
use crate::features::AnalysisSettings;
use ::config::{Config, ConfigError, File};
use serde_derive::Deserialize;

/// Optional overrides read from the configuration file
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Settings {
    pub colors: Option<usize>,
    #[serde(rename = "max-duration")]
    pub max_duration: Option<f64>,
    #[serde(rename = "sample-rate")]
    pub sample_rate: Option<u32>,
    #[serde(rename = "frame-size")]
    pub frame_size: Option<usize>,
    #[serde(rename = "hop-size")]
    pub hop_size: Option<usize>,
    #[serde(rename = "rolloff-percent")]
    pub rolloff_percent: Option<f64>,
    /// Preferred capture devices, by name
    pub devices: Option<Vec<String>>,
}

/// Reads `name` with any supported extension; a missing file yields defaults
pub fn get_config(name: &str) -> Result<Settings, ConfigError> {
    let settings = Config::builder()
        .add_source(File::with_name(name).required(false))
        .build()?;

    settings.try_deserialize::<Settings>()
}

impl Settings {
    pub fn num_colors(&self) -> usize {
        self.colors.unwrap_or(DEFAULT_NUM_COLORS)
    }

    pub fn load_options(&self) -> LoadOptions {
        let defaults = LoadOptions::default();

        LoadOptions {
            max_duration_secs: self.max_duration.unwrap_or(defaults.max_duration_secs),
            target_sample_rate: self.sample_rate.or(defaults.target_sample_rate),
        }
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        let defaults = AnalysisSettings::default();

        AnalysisSettings {
            frame_size: self.frame_size.unwrap_or(defaults.frame_size),
            hop_size: self.hop_size.unwrap_or(defaults.hop_size),
            rolloff_percent: self.rolloff_percent.unwrap_or(defaults.rolloff_percent),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("absent");

        let settings = get_config(name.to_str().unwrap()).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.num_colors(), 5);
        assert_eq!(settings.load_options(), LoadOptions::default());
        assert_eq!(settings.analysis_settings(), AnalysisSettings::default());
    }

    #[test]
    fn reads_kebab_case_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palette.json");
        fs::write(
            &path,
            r#"{
                "colors": 8,
                "max-duration": 12.5,
                "sample-rate": 44100,
                "hop-size": 256,
                "devices": ["Loopback"]
            }"#,
        )
        .unwrap();

        let name = dir.path().join("palette");
        let settings = get_config(name.to_str().unwrap()).unwrap();

        assert_eq!(settings.num_colors(), 8);
        assert_eq!(settings.load_options().max_duration_secs, 12.5);
        assert_eq!(settings.load_options().target_sample_rate, Some(44100));
        assert_eq!(settings.analysis_settings().hop_size, 256);
        assert_eq!(settings.analysis_settings().frame_size, 2048);
        assert_eq!(settings.devices, Some(vec!["Loopback".to_string()]));
    }
}
