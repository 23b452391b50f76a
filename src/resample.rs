//! Mono sample-rate conversion using rubato

use crate::error::DecodeError;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Resample mono `samples` from `input_rate` to `output_rate`.
///
/// Returns the input unchanged when the rates already match.
pub fn resample(
    samples: Vec<f32>,
    input_rate: u32,
    output_rate: u32,
) -> Result<Vec<f32>, DecodeError> {
    if input_rate == output_rate || samples.is_empty() {
        return Ok(samples);
    }

    tracing::debug!(
        input_rate,
        output_rate,
        frames = samples.len(),
        "resampling"
    );

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        samples.len(),
        1,
    )
    .map_err(|e| DecodeError::Resample(e.to_string()))?;

    let mut output = resampler
        .process(&[samples], None)
        .map_err(|e| DecodeError::Resample(e.to_string()))?;

    Ok(output.pop().unwrap_or_default())
}
