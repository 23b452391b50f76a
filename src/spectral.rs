//! Per-frame spectral descriptors computed from magnitude spectra.
//!
//! Every function returns 0.0 for an all-zero frame so silent passages average
//! in as zeros instead of dividing by zero.

const EPSILON: f64 = 1e-10;

fn magnitude_sum(spectrum: &[f32]) -> f64 {
    spectrum.iter().map(|&m| m as f64).sum()
}

/// Spectral centroid: `Σ f·|X| / Σ |X|` in Hz
pub fn centroid(spectrum: &[f32], frequencies: &[f64]) -> f64 {
    let total = magnitude_sum(spectrum);

    if total < EPSILON {
        return 0.0;
    }

    let weighted: f64 = spectrum
        .iter()
        .zip(frequencies)
        .map(|(&m, &f)| m as f64 * f)
        .sum();

    weighted / total
}

/// Lowest frequency below which `percent` of the spectral magnitude lies
pub fn rolloff(spectrum: &[f32], frequencies: &[f64], percent: f64) -> f64 {
    let total = magnitude_sum(spectrum);

    if total < EPSILON {
        return 0.0;
    }

    let threshold = percent * total;
    let mut cumulative = 0.0;

    for (&m, &f) in spectrum.iter().zip(frequencies) {
        cumulative += m as f64;

        if cumulative >= threshold {
            return f;
        }
    }

    frequencies.last().copied().unwrap_or(0.0)
}

/// Second-order spectral bandwidth around `centroid`, in Hz
pub fn bandwidth(spectrum: &[f32], frequencies: &[f64], centroid: f64) -> f64 {
    let total = magnitude_sum(spectrum);

    if total < EPSILON {
        return 0.0;
    }

    let spread: f64 = spectrum
        .iter()
        .zip(frequencies)
        .map(|(&m, &f)| (m as f64 / total) * (f - centroid).powi(2))
        .sum();

    spread.sqrt()
}
