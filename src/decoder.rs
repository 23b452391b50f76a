//! Audio decoding using Symphonia
//!
//! Sources turn an input into an `AudioSignal`: decode the default track, mix
//! it to mono, keep only the leading analysis window and bring it to a common
//! sample rate.

use crate::audio::AudioSignal;
use crate::error::{DecodeError, Error, Result};
use crate::resample::resample;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Longest leading window a source will keep, in seconds
pub const MAX_ANALYSIS_SECS: f64 = 30.0;

/// Anything that can produce an `AudioSignal`
pub trait SignalSource {
    fn load(&self) -> Result<AudioSignal>;
}

/// How much of the input to keep and at which rate
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Length of the leading analysis window, at most `MAX_ANALYSIS_SECS` (default: 30 s)
    pub max_duration_secs: f64,
    /// Rate the signal is resampled to, `None` keeps the native rate (default: 22050 Hz)
    pub target_sample_rate: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_duration_secs: MAX_ANALYSIS_SECS,
            target_sample_rate: Some(22050),
        }
    }
}

impl LoadOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_duration_secs > 0.0 && self.max_duration_secs <= MAX_ANALYSIS_SECS) {
            return Err(Error::InvalidArgument(format!(
                "analysis window must be within (0, {}] seconds, got {}",
                MAX_ANALYSIS_SECS, self.max_duration_secs
            )));
        }

        if self.target_sample_rate == Some(0) {
            return Err(Error::InvalidArgument(
                "target sample rate must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn max_frames(&self, sample_rate: u32) -> usize {
        (self.max_duration_secs * sample_rate as f64).floor() as usize
    }
}

/// Decodes an audio file from disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    options: LoadOptions,
}

impl FileSource {
    pub fn new<P: AsRef<Path>>(path: P, options: LoadOptions) -> FileSource {
        FileSource {
            path: path.as_ref().to_path_buf(),
            options,
        }
    }
}

impl SignalSource for FileSource {
    fn load(&self) -> Result<AudioSignal> {
        self.options.validate()?;

        tracing::debug!(path = %self.path.display(), "decoding audio file");

        let file = File::open(&self.path).map_err(|source| DecodeError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut hint = Hint::new();
        if let Some(ext) = self.path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        decode(Box::new(file), hint, &self.options)
    }
}

/// Decodes an in-memory encoded file, such as an upload
#[derive(Debug, Clone)]
pub struct BytesSource {
    bytes: Arc<[u8]>,
    extension: Option<String>,
    options: LoadOptions,
}

impl BytesSource {
    pub fn new(
        bytes: impl Into<Arc<[u8]>>,
        extension: Option<&str>,
        options: LoadOptions,
    ) -> BytesSource {
        BytesSource {
            bytes: bytes.into(),
            extension: extension.map(str::to_string),
            options,
        }
    }
}

impl SignalSource for BytesSource {
    fn load(&self) -> Result<AudioSignal> {
        self.options.validate()?;

        let mut hint = Hint::new();
        if let Some(ext) = &self.extension {
            hint.with_extension(ext);
        }

        decode(Box::new(Cursor::new(Arc::clone(&self.bytes))), hint, &self.options)
    }
}

/// Average interleaved channels into one
pub fn downmix(interleaved: &[f32], channels: usize, mono: &mut Vec<f32>) {
    if channels <= 1 {
        mono.extend_from_slice(interleaved);
        return;
    }

    mono.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Bring native-rate mono samples to the requested rate and window
pub(crate) fn finish_signal(
    mut samples: Vec<f32>,
    native_rate: u32,
    options: &LoadOptions,
) -> Result<AudioSignal> {
    if samples.is_empty() {
        return Err(DecodeError::Empty.into());
    }

    samples.truncate(options.max_frames(native_rate).max(1));

    let sample_rate = options.target_sample_rate.unwrap_or(native_rate);
    let mut samples = resample(samples, native_rate, sample_rate)?;
    samples.truncate(options.max_frames(sample_rate).max(1));

    if samples.is_empty() {
        return Err(DecodeError::Empty.into());
    }

    tracing::debug!(
        sample_rate,
        samples = samples.len(),
        "audio signal ready"
    );

    AudioSignal::new(samples, sample_rate)
        .map_err(|e| DecodeError::Corrupt(e.to_string()).into())
}

fn decode(source: Box<dyn MediaSource>, hint: Hint, options: &LoadOptions) -> Result<AudioSignal> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format.default_track().ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let native_rate = codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnsupportedFormat("unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::UnsupportedFormat(e.to_string()))?;

    let max_frames = options.max_frames(native_rate).max(1);
    let expected = codec_params
        .n_frames
        .map_or(max_frames, |n| usize::try_from(n).unwrap_or(max_frames));
    let mut mono = Vec::with_capacity(expected.min(max_frames));
    let mut buffer: Option<SampleBuffer<f32>> = None;

    while mono.len() < max_frames {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Corrupt(e.to_string()).into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = e, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(DecodeError::Corrupt(e.to_string()).into()),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();

        let samples = buffer.get_or_insert_with(|| {
            SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
        });

        if samples.capacity() < decoded.capacity() * channels {
            *samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        }

        samples.copy_interleaved_ref(decoded);
        downmix(samples.samples(), channels, &mut mono);
    }

    finish_signal(mono, native_rate, options)
}
