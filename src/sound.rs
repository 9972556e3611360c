use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use log::error;

const TONE_HZ: f32 = 440.0;
const BEEP_MS: u32 = 100;

/// Plays a short sine burst whenever [`Sound::beep`] is called. The output
/// stream runs for the whole session and stays silent between beeps.
pub struct Sound {
    _stream: cpal::Stream,
    remaining: Arc<AtomicU32>,
    beep_samples: u32,
}

impl Sound {
    pub fn new() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no output device available"))?;
        let supported_config = device
            .default_output_config()
            .context("error while querying configs")?;
        let sample_format = supported_config.sample_format();
        let config: cpal::StreamConfig = supported_config.into();
        let remaining = Arc::new(AtomicU32::new(0));

        let stream = match sample_format {
            cpal::SampleFormat::I8 => Self::run::<i8>(&device, &config, remaining.clone()),
            cpal::SampleFormat::I16 => Self::run::<i16>(&device, &config, remaining.clone()),
            cpal::SampleFormat::I32 => Self::run::<i32>(&device, &config, remaining.clone()),
            cpal::SampleFormat::I64 => Self::run::<i64>(&device, &config, remaining.clone()),
            cpal::SampleFormat::U8 => Self::run::<u8>(&device, &config, remaining.clone()),
            cpal::SampleFormat::U16 => Self::run::<u16>(&device, &config, remaining.clone()),
            cpal::SampleFormat::U32 => Self::run::<u32>(&device, &config, remaining.clone()),
            cpal::SampleFormat::U64 => Self::run::<u64>(&device, &config, remaining.clone()),
            cpal::SampleFormat::F32 => Self::run::<f32>(&device, &config, remaining.clone()),
            cpal::SampleFormat::F64 => Self::run::<f64>(&device, &config, remaining.clone()),
            sample_format => Err(anyhow!("unsupported sample format '{sample_format}'")),
        }?;

        Ok(Self {
            _stream: stream,
            remaining,
            beep_samples: config.sample_rate.0 * BEEP_MS / 1000,
        })
    }

    pub fn beep(&self) {
        self.remaining.store(self.beep_samples, Ordering::Relaxed);
    }

    fn run<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        remaining: Arc<AtomicU32>,
    ) -> anyhow::Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let sample_rate = config.sample_rate.0 as f32;
        let channels = config.channels as usize;

        let mut sample_clock = 0f32;
        let mut next_value = move || {
            // silence once the burst is used up
            let left = remaining.load(Ordering::Relaxed);
            if left == 0 {
                return 0.0;
            }
            remaining.store(left - 1, Ordering::Relaxed);
            sample_clock = (sample_clock + 1.0) % sample_rate;
            (sample_clock * TONE_HZ * 2.0 * std::f32::consts::PI / sample_rate).sin() * 0.25
        };

        let err_fn = |err| error!("an error occurred on stream: {err}");

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                // same sample on every channel of a frame
                for frame in data.chunks_mut(channels) {
                    frame.fill(T::from_sample(next_value()));
                }
            },
            err_fn,
            None,
        )?;
        stream.play()?;
        Ok(stream)
    }
}
