//! Recording an analysis window from an input device

use crate::audio::AudioSignal;
use crate::decoder::{downmix, finish_signal, LoadOptions, SignalSource};
use crate::error::{DecodeError, Result};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STARTUP_GRACE: Duration = Duration::from_secs(5);

/// Records from the default input device, or the first device whose name is
/// listed in `devices`
#[derive(Debug, Clone, Default)]
pub struct CaptureSource {
    devices: Option<Vec<String>>,
    options: LoadOptions,
}

impl CaptureSource {
    pub fn new(devices: Option<Vec<String>>, options: LoadOptions) -> CaptureSource {
        CaptureSource { devices, options }
    }
}

fn get_device(host: &Host, devices: &Option<Vec<String>>) -> Option<Device> {
    let Some(names) = devices else {
        return host.default_input_device();
    };

    host.input_devices().ok()?.find(|device| {
        device
            .name()
            .map(|name| names.iter().any(|wanted| *wanted == name))
            .unwrap_or(false)
    })
}

fn capture_error<E: std::fmt::Display>(error: E) -> DecodeError {
    DecodeError::Capture(error.to_string())
}

impl SignalSource for CaptureSource {
    fn load(&self) -> Result<AudioSignal> {
        self.options.validate()?;

        let host = cpal::default_host();
        let device = get_device(&host, &self.devices)
            .ok_or_else(|| DecodeError::Capture("no input device available".to_string()))?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let config = device
            .default_input_config()
            .map_err(capture_error)?
            .config();

        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;
        let wanted = self.options.max_frames(sample_rate).max(1);

        tracing::info!(
            device = %device_name,
            sample_rate,
            channels,
            seconds = self.options.max_duration_secs,
            "recording from input device"
        );

        let recorded = Arc::new(Mutex::new(Vec::with_capacity(wanted)));
        let failed = Arc::new(AtomicBool::new(false));

        let writer = Arc::clone(&recorded);
        let failed_writer = Arc::clone(&failed);

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _| {
                    if let Ok(mut samples) = writer.lock() {
                        downmix(data, channels, &mut samples);
                    }
                },
                move |error| {
                    tracing::warn!(%error, "input stream error");
                    failed_writer.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(capture_error)?;

        stream.play().map_err(capture_error)?;

        let deadline =
            Instant::now() + Duration::from_secs_f64(self.options.max_duration_secs) + STARTUP_GRACE;

        loop {
            thread::sleep(POLL_INTERVAL);

            if failed.load(Ordering::SeqCst) {
                return Err(DecodeError::Capture(format!(
                    "input device {} stopped delivering audio",
                    device_name
                ))
                .into());
            }

            let len = recorded.lock().map(|samples| samples.len()).unwrap_or(0);
            if len >= wanted {
                break;
            }

            if Instant::now() > deadline {
                tracing::warn!(recorded = len, wanted, "recording timed out, using partial window");
                break;
            }
        }

        drop(stream);

        let samples = recorded
            .lock()
            .map(|mut samples| std::mem::take(&mut *samples))
            .map_err(|_| DecodeError::Capture("recording buffer poisoned".to_string()))?;

        finish_signal(samples, sample_rate, &self.options)
    }
}
