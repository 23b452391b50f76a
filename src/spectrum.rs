use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Short-time magnitude spectrogram with per-frame RMS.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// One magnitude spectrum per frame, bins `0..=frame_size / 2`
    pub frames: Vec<Vec<f32>>,
    /// RMS of the un-windowed samples of each frame
    pub rms: Vec<f32>,
    /// Center frequency of every bin in Hz
    pub frequencies: Vec<f64>,
}

impl Spectrogram {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn bins(&self) -> usize {
        self.frequencies.len()
    }
}

/// Number of analysis frames for a signal of `len` samples.
///
/// Frames are not centered; a signal shorter than one frame still gets one
/// zero-padded frame and a trailing partial frame is dropped.
pub fn frame_count(len: usize, frame_size: usize, hop_size: usize) -> usize {
    if len <= frame_size {
        1
    } else {
        1 + (len - frame_size) / hop_size
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

pub fn get_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
) -> Spectrogram {
    let bins = frame_size / 2 + 1;
    let bin_width = sample_rate as f64 / frame_size as f64;
    let frequencies = (0..bins).map(|k| k as f64 * bin_width).collect();

    let count = frame_count(samples.len(), frame_size, hop_size);
    let window = hann_window(frame_size);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(frame_size);

    let mut frames = Vec::with_capacity(count);
    let mut rms = Vec::with_capacity(count);
    let mut buffer = vec![Complex::new(0f32, 0f32); frame_size];

    for index in 0..count {
        let start = index * hop_size;
        let end = (start + frame_size).min(samples.len());
        let frame = &samples[start..end];

        let energy: f32 = frame.iter().map(|s| s * s).sum();
        rms.push((energy / frame_size as f32).sqrt());

        if frame.iter().all(|&s| s == 0.0) {
            frames.push(vec![0f32; bins]);
            continue;
        }

        for (i, slot) in buffer.iter_mut().enumerate() {
            let sample = frame.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }

        fft.process(&mut buffer);

        frames.push(buffer[..bins].iter().map(|c| c.norm()).collect());
    }

    Spectrogram {
        frames,
        rms,
        frequencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn counts_frames() {
        assert_eq!(frame_count(100, 2048, 512), 1);
        assert_eq!(frame_count(2048, 2048, 512), 1);
        assert_eq!(frame_count(2560, 2048, 512), 2);
        assert_eq!(frame_count(3000, 2048, 512), 2);
        assert_eq!(frame_count(22050, 2048, 512), 40);
    }

    #[test]
    fn short_signal_gets_padded_frame() {
        let spectrogram = get_spectrogram(&[0.5; 100], 8000, 256, 64);

        assert_eq!(spectrogram.len(), 1);
        assert_eq!(spectrogram.bins(), 129);
        assert_eq!(spectrogram.frames[0].len(), 129);
    }

    #[test]
    fn silence_has_zero_spectrum() {
        let spectrogram = get_spectrogram(&[0.0; 4096], 22050, 1024, 256);

        assert!(spectrogram
            .frames
            .iter()
            .all(|frame| frame.iter().all(|&m| m == 0.0)));
        assert!(spectrogram.rms.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn peak_bin_matches_tone() {
        let sample_rate = 22050;
        let samples = sine(1000.0, sample_rate, 8192);
        let spectrogram = get_spectrogram(&samples, sample_rate, 2048, 512);

        let frame = &spectrogram.frames[0];
        let (peak, _) = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();

        let peak_frequency = spectrogram.frequencies[peak];
        assert!(
            (peak_frequency - 1000.0).abs() < 15.0,
            "peak at {} Hz",
            peak_frequency
        );
    }

    #[test]
    fn rms_of_full_scale_sine() {
        let sample_rate = 22050;
        let samples = sine(441.0, sample_rate, 2048);
        let spectrogram = get_spectrogram(&samples, sample_rate, 2048, 512);

        assert!((spectrogram.rms[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01);
    }
}
