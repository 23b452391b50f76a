//! # Music Palette
//!
//! Maps a short audio recording to a deterministic color palette.
//!
//! Five descriptors are extracted from the leading window of the signal
//! (tempo, RMS energy, spectral centroid, roll-off and bandwidth), clipped into
//! fixed ranges, and turned into colors: tempo picks the hue, energy the
//! saturation and the centroid the value of the main color, while roll-off and
//! bandwidth spread the variants around it.
//!
//! ```no_run
//! use music_palette::{analyze, FileSource, LoadOptions, SignalSource};
//!
//! let signal = FileSource::new("waltz.mp3", LoadOptions::default()).load()?;
//! let (palette, features) = analyze(&signal, 5)?;
//!
//! println!("{:.1} BPM", features.tempo);
//! for color in &palette {
//!     println!("{}", color.hex());
//! }
//! # Ok::<(), music_palette::Error>(())
//! ```

pub mod audio;
#[cfg(feature = "capture")]
pub mod capture;
pub mod colorizer;
pub mod colors;
pub mod config;
pub mod decoder;
pub mod error;
pub mod features;
pub mod resample;
pub mod spectral;
pub mod spectrum;
pub mod tempo;

pub use audio::AudioSignal;
#[cfg(feature = "capture")]
pub use capture::CaptureSource;
pub use colorizer::DEFAULT_NUM_COLORS;
pub use colors::{Color, Palette, TextColor};
pub use decoder::{BytesSource, FileSource, LoadOptions, SignalSource};
pub use error::{DecodeError, Error, ParseColorError};
pub use features::{AnalysisSettings, FeatureExtractor, FeatureSet};

/// Analyze `signal` with default settings and derive `num_colors` colors
pub fn analyze(signal: &AudioSignal, num_colors: usize) -> Result<(Palette, FeatureSet), Error> {
    analyze_with(signal, num_colors, &AnalysisSettings::default())
}

pub fn analyze_with(
    signal: &AudioSignal,
    num_colors: usize,
    settings: &AnalysisSettings,
) -> Result<(Palette, FeatureSet), Error> {
    if num_colors < 1 {
        return Err(Error::InvalidArgument(format!(
            "number of colors must be at least 1, got {}",
            num_colors
        )));
    }

    tracing::debug!(
        samples = signal.samples().len(),
        sample_rate = signal.sample_rate(),
        num_colors,
        "analyzing signal"
    );

    let extractor = FeatureExtractor::new(settings.clone())?;
    let features = extractor.extract(signal)?;
    let palette = colorizer::features_to_palette(&features, num_colors)?;

    Ok((palette, features))
}
