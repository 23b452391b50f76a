use crate::error::{Error, Result};

/// Mono sample sequence at a fixed sample rate.
///
/// Always holds at least one finite sample and a positive sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<AudioSignal> {
        if samples.is_empty() {
            return Err(Error::InvalidArgument("audio signal has no samples".to_string()));
        }

        if sample_rate == 0 {
            return Err(Error::InvalidArgument("sample rate must be positive".to_string()));
        }

        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "sample {} is not a finite number",
                index
            )));
        }

        Ok(AudioSignal {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
