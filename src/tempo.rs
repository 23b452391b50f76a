//! Tempo estimation from an onset-strength envelope
//!
//! The envelope is the mean rectified rise of log power between consecutive
//! frames. Its autocorrelation peaks at the beat period; a log-normal prior
//! around a preferred tempo resolves octave ambiguity (60 vs 120 vs 240 BPM).

use crate::spectrum::Spectrogram;

/// Tempo reported when the envelope has no usable periodicity
pub const FALLBACK_TEMPO_BPM: f64 = 20.0;

const AMPLITUDE_FLOOR: f64 = 1e-10;
const TOP_DB: f64 = 80.0;
const MIN_ONSET_STRENGTH_DB: f64 = 1.0;

/// Onset strength per frame in dB.
///
/// Power is expressed relative to the loudest bin of the whole spectrogram and
/// floored `TOP_DB` below it, so the envelope does not depend on gain.
pub fn onset_envelope(spectrogram: &Spectrogram) -> Vec<f64> {
    if spectrogram.is_empty() {
        return Vec::new();
    }

    let to_db = |power: f64| 10.0 * power.max(AMPLITUDE_FLOOR).log10();

    let peak_power = spectrogram
        .frames
        .iter()
        .flatten()
        .map(|&m| m as f64 * m as f64)
        .fold(0.0, f64::max);
    let reference = to_db(peak_power);

    let log_power: Vec<Vec<f64>> = spectrogram
        .frames
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|&m| (to_db(m as f64 * m as f64) - reference).max(-TOP_DB))
                .collect()
        })
        .collect();

    let mut envelope = Vec::with_capacity(log_power.len());
    envelope.push(0.0);

    for pair in log_power.windows(2) {
        let rise: f64 = pair[1]
            .iter()
            .zip(&pair[0])
            .map(|(curr, prev)| (curr - prev).max(0.0))
            .sum();
        envelope.push(rise / pair[1].len() as f64);
    }

    envelope
}

#[derive(Debug, Clone)]
pub struct TempoEstimator {
    pub sample_rate: u32,
    pub hop_size: usize,
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub start_bpm: f64,
    pub spread_octaves: f64,
}

impl TempoEstimator {
    fn frames_per_minute(&self) -> f64 {
        60.0 * self.sample_rate as f64 / self.hop_size as f64
    }

    pub fn lag_to_bpm(&self, lag: usize) -> f64 {
        self.frames_per_minute() / lag as f64
    }

    fn prior(&self, bpm: f64) -> f64 {
        let octaves = (bpm / self.start_bpm).log2() / self.spread_octaves;
        (-0.5 * octaves * octaves).exp()
    }

    /// Estimated tempo in BPM, `FALLBACK_TEMPO_BPM` when no beat is found
    pub fn estimate(&self, envelope: &[f64]) -> f64 {
        match self.best_lag(envelope) {
            Some(lag) => {
                let bpm = self.lag_to_bpm(lag);
                tracing::debug!(lag, bpm, "tempo estimated");
                bpm
            }
            None => {
                tracing::warn!(
                    frames = envelope.len(),
                    "no periodic onsets, using fallback tempo"
                );
                FALLBACK_TEMPO_BPM
            }
        }
    }

    fn best_lag(&self, envelope: &[f64]) -> Option<usize> {
        let n = envelope.len();

        if n < 3 {
            return None;
        }

        let strongest = envelope.iter().copied().fold(0.0, f64::max);
        if strongest < MIN_ONSET_STRENGTH_DB {
            return None;
        }

        let min_lag = ((self.frames_per_minute() / self.max_bpm).ceil() as usize).max(1);
        let max_lag = ((self.frames_per_minute() / self.min_bpm).floor() as usize).min(n - 1);

        if min_lag > max_lag {
            return None;
        }

        let mean = envelope.iter().sum::<f64>() / n as f64;
        let centered: Vec<f64> = envelope.iter().map(|v| v - mean).collect();

        let mut best: Option<(usize, f64)> = None;

        for lag in min_lag..=max_lag {
            let overlap = n - lag;
            let correlation: f64 = centered[..overlap]
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / overlap as f64;

            let score = correlation * self.prior(self.lag_to_bpm(lag));

            if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((lag, score));
            }
        }

        best.map(|(lag, _)| lag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::get_spectrogram;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn estimator() -> TempoEstimator {
        TempoEstimator {
            sample_rate: 22050,
            hop_size: 512,
            min_bpm: 30.0,
            max_bpm: 300.0,
            start_bpm: 120.0,
            spread_octaves: 1.0,
        }
    }

    fn pulse_envelope(len: usize, period: usize) -> Vec<f64> {
        (0..len)
            .map(|i| if i % period == 3 { 10.0 } else { 0.0 })
            .collect()
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn fallback_is_logged_as_warning() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let bpm = tracing::subscriber::with_default(subscriber, || {
            estimator().estimate(&[0.0; 64])
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(bpm, FALLBACK_TEMPO_BPM);
        assert!(output.contains("WARN"), "{}", output);
        assert!(output.contains("fallback tempo"), "{}", output);
    }

    #[test]
    fn prior_peaks_at_start_bpm() {
        let e = estimator();
        assert_eq!(e.prior(120.0), 1.0);
        assert!(e.prior(60.0) < e.prior(100.0));
        assert!((e.prior(240.0) - e.prior(60.0)).abs() < 1e-12);
    }

    #[test]
    fn finds_period_of_pulse_train() {
        let e = estimator();
        let envelope = pulse_envelope(400, 22);

        let bpm = e.estimate(&envelope);
        assert!((bpm - e.lag_to_bpm(22)).abs() < 1e-9, "got {}", bpm);
    }

    #[test]
    fn octave_ambiguity_resolves_toward_start_bpm() {
        let e = estimator();
        // Lags 11 (~235 BPM), 22 (~117 BPM) and 33 (~78 BPM) all fit this train
        let envelope = pulse_envelope(400, 11);

        let bpm = e.estimate(&envelope);
        assert!((bpm - e.lag_to_bpm(22)).abs() < 1e-9, "got {}", bpm);
    }

    #[test]
    fn flat_envelope_falls_back() {
        let e = estimator();
        assert_eq!(e.estimate(&[0.0; 200]), FALLBACK_TEMPO_BPM);
        assert_eq!(e.estimate(&[0.2; 200]), FALLBACK_TEMPO_BPM);
        assert_eq!(e.estimate(&[5.0, 0.0]), FALLBACK_TEMPO_BPM);
    }

    #[test]
    fn silence_envelope_is_zero() {
        let spectrogram = get_spectrogram(&[0.0; 8192], 22050, 2048, 512);
        let envelope = onset_envelope(&spectrogram);

        assert_eq!(envelope.len(), spectrogram.len());
        assert!(envelope.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn clicks_produce_onsets() {
        let mut samples = vec![0f32; 22050];
        samples[8000] = 1.0;

        let spectrogram = get_spectrogram(&samples, 22050, 2048, 512);
        let envelope = onset_envelope(&spectrogram);

        let strongest = envelope.iter().copied().fold(0.0, f64::max);
        assert!(strongest > 10.0, "strongest onset {}", strongest);
    }
}
