//! Microphone capture using cpal

use crate::error::DeviceError;
use crate::resampling::{self, StreamResampler};
use crate::source::{AudioInput, AudioSource};
use crate::SAMPLE_RATE;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use voxid_types::AudioDevice;

/// Opens live capture sources on a selected input device.
pub struct MicInput {
    device_index: Option<usize>,
}

impl MicInput {
    /// `device_index` of `None` selects the system default device.
    pub fn new(device_index: Option<usize>) -> Self {
        Self { device_index }
    }
}

impl AudioInput for MicInput {
    fn open(&self, frame_length: usize) -> Result<Box<dyn AudioSource>, DeviceError> {
        let source = MicSource::open(self.device_index, frame_length)?;
        Ok(Box::new(source))
    }
}

#[derive(Default)]
struct CaptureState {
    /// Mono samples at the device rate, drained by the reader.
    samples: Vec<f32>,
    error: Option<String>,
}

/// Live microphone source serving exact frames at 16kHz.
pub struct MicSource {
    device: cpal::Device,
    config: cpal::StreamConfig,
    stream: Option<cpal::Stream>,
    shared: Arc<(Mutex<CaptureState>, Condvar)>,
    /// Carries filter state across callback blocks; `None` when the
    /// device already runs at 16kHz.
    resampler: Option<StreamResampler>,
    /// Resampled i16 samples awaiting frame assembly.
    pending: Vec<i16>,
    frame_length: usize,
}

impl MicSource {
    fn open(device_index: Option<usize>, frame_length: usize) -> Result<Self, DeviceError> {
        let host = cpal::default_host();

        let device = match device_index {
            Some(index) => host
                .input_devices()?
                .nth(index)
                .ok_or(DeviceError::DeviceNotFound(index))?,
            None => host.default_input_device().ok_or(DeviceError::NoDevice)?,
        };

        let config = device.default_input_config()?;
        let device_rate = config.sample_rate().0;

        tracing::info!(
            "Audio input: {} @ {}Hz, {} channels",
            device.name().unwrap_or_default(),
            device_rate,
            config.channels()
        );

        let resampler = if device_rate != SAMPLE_RATE {
            Some(StreamResampler::new(device_rate, SAMPLE_RATE)?)
        } else {
            None
        };

        Ok(Self {
            device,
            config: config.into(),
            stream: None,
            shared: Arc::new((Mutex::new(CaptureState::default()), Condvar::new())),
            resampler,
            pending: Vec::new(),
            frame_length,
        })
    }

    /// Block until the stream callback has delivered samples, then drain them.
    fn wait_for_samples(&self) -> Result<Vec<f32>, DeviceError> {
        let (state_lock, ready) = &*self.shared;
        let mut state = state_lock.lock();
        loop {
            if let Some(message) = state.error.take() {
                return Err(DeviceError::Stream(message));
            }
            if !state.samples.is_empty() {
                return Ok(std::mem::take(&mut state.samples));
            }
            ready.wait(&mut state);
        }
    }
}

impl AudioSource for MicSource {
    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let shared = self.shared.clone();
        let channels = self.config.channels as usize;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                // Convert to mono by averaging channels
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
                    .collect();

                let (state_lock, ready) = &*shared;
                let mut state = state_lock.lock();
                state.samples.extend_from_slice(&mono);
                ready.notify_one();
            },
            {
                let shared = self.shared.clone();
                move |err| {
                    tracing::error!("Audio stream error: {}", err);
                    let (state_lock, ready) = &*shared;
                    let mut state = state_lock.lock();
                    state.error = Some(err.to_string());
                    ready.notify_one();
                }
            },
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);

        tracing::debug!("Audio stream started");
        Ok(())
    }

    fn read(&mut self) -> Result<Vec<i16>, DeviceError> {
        if self.stream.is_none() {
            return Err(DeviceError::NotStarted);
        }

        while self.pending.len() < self.frame_length {
            let block = self.wait_for_samples()?;
            let resampled = match self.resampler.as_mut() {
                Some(resampler) => resampler.push(&block)?,
                None => block,
            };
            self.pending.extend(resampling::to_i16_samples(&resampled));
        }

        Ok(self.pending.drain(..self.frame_length).collect())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Audio stream stopped");
        }
    }
}

/// List available input devices.
pub fn list_input_devices() -> Result<Vec<AudioDevice>, DeviceError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices: Vec<AudioDevice> = host
        .input_devices()?
        .enumerate()
        .filter_map(|(index, device)| {
            let name = device.name().ok()?;
            Some(AudioDevice {
                index,
                name: name.clone(),
                is_default: default_name.as_ref() == Some(&name),
            })
        })
        .collect();

    Ok(devices)
}
