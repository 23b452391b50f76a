//! Feature extraction and normalization
//!
//! Five time-averaged descriptors are computed from a short-time spectrogram:
//!
//! | Feature    | Raw value                       | Normalized            |
//! |------------|---------------------------------|-----------------------|
//! | tempo      | beats per minute                | raw / 200, [0.1, 0.9] |
//! | energy     | mean frame RMS                  | raw × 10, [0.2, 0.9]  |
//! | brightness | mean spectral centroid (Hz)     | raw / 5000, [0.1, 0.8]|
//! | harmony    | mean spectral roll-off (Hz)     | raw / 8000, [0.1, 0.7]|
//! | complexity | mean spectral bandwidth (Hz)    | raw / 6000, [0.1, 0.6]|
//!
//! Clipping keeps every normalized value inside its range for any input,
//! silence included.

use crate::audio::AudioSignal;
use crate::error::{Error, Result};
use crate::spectral;
use crate::spectrum::get_spectrogram;
use crate::tempo::{onset_envelope, TempoEstimator};
use serde_derive::{Deserialize, Serialize};

/// Affine map followed by a clip into `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    pub multiplier: f64,
    pub divisor: f64,
    pub min: f64,
    pub max: f64,
}

impl Normalization {
    pub fn apply(&self, raw: f64) -> f64 {
        (raw * self.multiplier / self.divisor).clamp(self.min, self.max)
    }
}

pub const TEMPO: Normalization = Normalization {
    multiplier: 1.0,
    divisor: 200.0,
    min: 0.1,
    max: 0.9,
};

pub const ENERGY: Normalization = Normalization {
    multiplier: 10.0,
    divisor: 1.0,
    min: 0.2,
    max: 0.9,
};

pub const BRIGHTNESS: Normalization = Normalization {
    multiplier: 1.0,
    divisor: 5000.0,
    min: 0.1,
    max: 0.8,
};

pub const HARMONY: Normalization = Normalization {
    multiplier: 1.0,
    divisor: 8000.0,
    min: 0.1,
    max: 0.7,
};

pub const COMPLEXITY: Normalization = Normalization {
    multiplier: 1.0,
    divisor: 6000.0,
    min: 0.1,
    max: 0.6,
};

/// Raw descriptors and their normalized counterparts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Beats per minute
    pub tempo: f64,
    /// Mean RMS amplitude
    pub energy: f64,
    /// Mean spectral centroid in Hz
    pub brightness: f64,
    /// Mean spectral roll-off in Hz
    pub harmony: f64,
    /// Mean spectral bandwidth in Hz
    pub complexity: f64,

    pub tempo_norm: f64,
    pub energy_norm: f64,
    pub brightness_norm: f64,
    pub harmony_norm: f64,
    pub complexity_norm: f64,
}

fn check_raw(tempo: f64, energy: f64, brightness: f64, harmony: f64, complexity: f64) -> Result<()> {
    let raw = [
        ("tempo", tempo),
        ("energy", energy),
        ("brightness", brightness),
        ("harmony", harmony),
        ("complexity", complexity),
    ];

    for (name, value) in raw {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "{} must be a finite non-negative number, got {}",
                name, value
            )));
        }
    }

    if tempo <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "tempo must be positive, got {}",
            tempo
        )));
    }

    Ok(())
}

impl FeatureSet {
    pub fn new(
        tempo: f64,
        energy: f64,
        brightness: f64,
        harmony: f64,
        complexity: f64,
    ) -> Result<FeatureSet> {
        check_raw(tempo, energy, brightness, harmony, complexity)?;

        Ok(FeatureSet {
            tempo,
            energy,
            brightness,
            harmony,
            complexity,
            tempo_norm: TEMPO.apply(tempo),
            energy_norm: ENERGY.apply(energy),
            brightness_norm: BRIGHTNESS.apply(brightness),
            harmony_norm: HARMONY.apply(harmony),
            complexity_norm: COMPLEXITY.apply(complexity),
        })
    }

    /// Checks a set built by hand or deserialized: raw values must be finite
    /// and non-negative with a positive tempo, and every normalized value must
    /// lie in its range.
    pub fn validate(&self) -> Result<()> {
        check_raw(
            self.tempo,
            self.energy,
            self.brightness,
            self.harmony,
            self.complexity,
        )?;

        let normalized = [
            ("tempo_norm", self.tempo_norm, TEMPO),
            ("energy_norm", self.energy_norm, ENERGY),
            ("brightness_norm", self.brightness_norm, BRIGHTNESS),
            ("harmony_norm", self.harmony_norm, HARMONY),
            ("complexity_norm", self.complexity_norm, COMPLEXITY),
        ];

        for (name, value, range) in normalized {
            if !(value >= range.min && value <= range.max) {
                return Err(Error::InvalidArgument(format!(
                    "{} must be within [{}, {}], got {}",
                    name, range.min, range.max, value
                )));
            }
        }

        Ok(())
    }
}

/// Framing and tempo search parameters
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// Samples per analysis frame (default: 2048)
    pub frame_size: usize,
    /// Samples between frame starts (default: 512)
    pub hop_size: usize,
    /// Magnitude fraction defining the roll-off frequency (default: 0.85)
    pub rolloff_percent: f64,
    /// Slowest tempo considered (default: 30 BPM)
    pub min_bpm: f64,
    /// Fastest tempo considered (default: 300 BPM)
    pub max_bpm: f64,
    /// Center of the tempo prior (default: 120 BPM)
    pub start_bpm: f64,
    /// Width of the tempo prior in octaves (default: 1.0)
    pub bpm_spread_octaves: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            frame_size: 2048,
            hop_size: 512,
            rolloff_percent: 0.85,
            min_bpm: 30.0,
            max_bpm: 300.0,
            start_bpm: 120.0,
            bpm_spread_octaves: 1.0,
        }
    }
}

impl AnalysisSettings {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidArgument(msg));

        if self.frame_size < 2 {
            return invalid(format!("frame size must be at least 2, got {}", self.frame_size));
        }

        if self.hop_size == 0 {
            return invalid("hop size must be positive".to_string());
        }

        if !(self.rolloff_percent > 0.0 && self.rolloff_percent < 1.0) {
            return invalid(format!(
                "roll-off percent must lie in (0, 1), got {}",
                self.rolloff_percent
            ));
        }

        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm && self.max_bpm.is_finite()) {
            return invalid(format!(
                "invalid tempo range [{}, {}]",
                self.min_bpm, self.max_bpm
            ));
        }

        if !(self.start_bpm > 0.0 && self.start_bpm.is_finite()) {
            return invalid(format!("start tempo must be positive, got {}", self.start_bpm));
        }

        if !(self.bpm_spread_octaves > 0.0 && self.bpm_spread_octaves.is_finite()) {
            return invalid(format!(
                "tempo spread must be positive, got {}",
                self.bpm_spread_octaves
            ));
        }

        Ok(())
    }
}

pub struct FeatureExtractor {
    settings: AnalysisSettings,
}

impl FeatureExtractor {
    pub fn new(settings: AnalysisSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn extract(&self, signal: &AudioSignal) -> Result<FeatureSet> {
        let AnalysisSettings {
            frame_size,
            hop_size,
            rolloff_percent,
            ..
        } = self.settings;

        let spectrogram = get_spectrogram(
            signal.samples(),
            signal.sample_rate(),
            frame_size,
            hop_size,
        );
        let frames = spectrogram.len() as f64;
        let freqs = &spectrogram.frequencies;

        let energy = spectrogram.rms.iter().map(|&r| r as f64).sum::<f64>() / frames;

        let mut brightness = 0.0;
        let mut harmony = 0.0;
        let mut complexity = 0.0;

        for frame in &spectrogram.frames {
            let centroid = spectral::centroid(frame, freqs);

            brightness += centroid;
            harmony += spectral::rolloff(frame, freqs, rolloff_percent);
            complexity += spectral::bandwidth(frame, freqs, centroid);
        }

        let estimator = TempoEstimator {
            sample_rate: signal.sample_rate(),
            hop_size,
            min_bpm: self.settings.min_bpm,
            max_bpm: self.settings.max_bpm,
            start_bpm: self.settings.start_bpm,
            spread_octaves: self.settings.bpm_spread_octaves,
        };
        let tempo = estimator.estimate(&onset_envelope(&spectrogram));

        let features = FeatureSet::new(
            tempo,
            energy,
            brightness / frames,
            harmony / frames,
            complexity / frames,
        )?;

        tracing::debug!(
            frames = spectrogram.len(),
            tempo = features.tempo,
            energy = features.energy,
            brightness = features.brightness,
            harmony = features.harmony,
            complexity = features.complexity,
            "features extracted"
        );

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(frequency: f32, amplitude: f32, sample_rate: u32, secs: f32) -> AudioSignal {
        let len = (sample_rate as f32 * secs) as usize;
        let samples = (0..len)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioSignal::new(samples, sample_rate).unwrap()
    }

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(AnalysisSettings::default()).unwrap()
    }

    #[test]
    fn normalization_clips_both_ends() {
        assert_eq!(TEMPO.apply(0.0), 0.1);
        assert_eq!(TEMPO.apply(100.0), 0.5);
        assert_eq!(TEMPO.apply(1e9), 0.9);
        assert_eq!(ENERGY.apply(0.05), 0.5);
        assert_eq!(ENERGY.apply(0.0), 0.2);
        assert_eq!(BRIGHTNESS.apply(2500.0), 0.5);
        assert_eq!(HARMONY.apply(1e6), 0.7);
        assert_eq!(COMPLEXITY.apply(3000.0), 0.5);
        assert_eq!(COMPLEXITY.apply(0.0), 0.1);
    }

    #[test]
    fn feature_set_rejects_invalid_raw_values() {
        assert!(FeatureSet::new(0.0, 0.1, 1.0, 1.0, 1.0).is_err());
        assert!(FeatureSet::new(120.0, -0.1, 1.0, 1.0, 1.0).is_err());
        assert!(FeatureSet::new(120.0, 0.1, f64::NAN, 1.0, 1.0).is_err());
        assert!(FeatureSet::new(120.0, 0.1, 1.0, f64::INFINITY, 1.0).is_err());
        assert!(FeatureSet::new(120.0, 0.0, 0.0, 0.0, 0.0).is_ok());
    }

    #[test]
    fn invalid_settings_fail_fast() {
        let zero_hop = AnalysisSettings {
            hop_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            FeatureExtractor::new(zero_hop),
            Err(Error::InvalidArgument(_))
        ));

        let bad_rolloff = AnalysisSettings {
            rolloff_percent: 1.5,
            ..Default::default()
        };
        assert!(FeatureExtractor::new(bad_rolloff).is_err());

        let inverted_range = AnalysisSettings {
            min_bpm: 200.0,
            max_bpm: 100.0,
            ..Default::default()
        };
        assert!(FeatureExtractor::new(inverted_range).is_err());
    }

    #[test]
    fn quiet_sine_sits_near_lower_bounds() {
        let signal = sine(440.0, 0.02, 22050, 1.0);
        let features = extractor().extract(&signal).unwrap();

        assert!(
            features.brightness > 300.0 && features.brightness < 1000.0,
            "centroid {} Hz",
            features.brightness
        );
        assert!(features.brightness_norm >= 0.1 && features.brightness_norm <= 0.2);
        assert_eq!(features.energy_norm, 0.2);
        assert_eq!(features.tempo_norm, 0.1);
    }

    #[test]
    fn silence_degrades_to_lower_bounds() {
        let signal = AudioSignal::new(vec![0.0; 22050], 22050).unwrap();
        let features = extractor().extract(&signal).unwrap();

        assert_eq!(features.energy, 0.0);
        assert_eq!(features.brightness, 0.0);
        assert_eq!(features.tempo_norm, TEMPO.min);
        assert_eq!(features.energy_norm, ENERGY.min);
        assert_eq!(features.brightness_norm, BRIGHTNESS.min);
        assert_eq!(features.harmony_norm, HARMONY.min);
        assert_eq!(features.complexity_norm, COMPLEXITY.min);
    }

    #[test]
    fn higher_tone_is_brighter() {
        let low = extractor().extract(&sine(200.0, 0.5, 22050, 1.0)).unwrap();
        let high = extractor().extract(&sine(4000.0, 0.5, 22050, 1.0)).unwrap();

        assert!(high.brightness > low.brightness);
        assert!(high.harmony > low.harmony);
    }

    #[test]
    fn loud_signal_saturates_energy() {
        let features = extractor().extract(&sine(440.0, 1.0, 22050, 1.0)).unwrap();

        assert!((features.energy - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
        assert_eq!(features.energy_norm, 0.9);
    }

    #[test]
    fn single_sample_signal_is_accepted() {
        let signal = AudioSignal::new(vec![0.3], 8000).unwrap();
        let features = extractor().extract(&signal).unwrap();

        assert!(features.tempo > 0.0);
        assert!(features.energy_norm >= 0.2 && features.energy_norm <= 0.9);
    }

    #[test]
    fn extraction_is_deterministic() {
        let signal = sine(330.0, 0.3, 16000, 0.5);
        let a = extractor().extract(&signal).unwrap();
        let b = extractor().extract(&signal).unwrap();

        assert_eq!(a, b);
    }
}
