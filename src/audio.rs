use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use fundsp::prelude::*;
use rodio::buffer::SamplesBuffer;
use rodio::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rodio::cpal::{self, SampleFormat};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, warn};

use crate::collab::{AudioCapture, Effects, Mute};
use crate::error::{Error, Result};
use crate::loudness::{RmsWindow, from_i16, from_u8, from_u16};
use crate::session::EndReason;

const SAMPLE_RATE: u32 = 44100;

// ── Microphone ──────────────────────────────────────────────────────────────

/// Latest loudness, shared between the device callback and the game thread.
#[derive(Debug, Default)]
struct Level {
    bits: AtomicU32,
    ready: AtomicBool,
}

impl Level {
    fn publish(&self, rms: f32) {
        self.bits.store(rms.to_bits(), Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
    }

    fn read(&self) -> Option<f32> {
        if self.ready.load(Ordering::Acquire) {
            Some(f32::from_bits(self.bits.load(Ordering::Relaxed)))
        } else {
            None
        }
    }
}

/// Runs on the audio thread: downmix, window, publish.
struct Analyser {
    window: RmsWindow,
    channels: usize,
    level: Arc<Level>,
}

impl Analyser {
    fn feed<T: Copy>(&mut self, data: &[T], to_f32: impl Fn(T) -> f32) {
        self.window.push_frames(data, self.channels, to_f32);
        self.level.publish(self.window.rms());
    }
}

/// Default input device, sampled into a rolling RMS window.
pub struct MicCapture {
    window_len: usize,
    stream: Option<cpal::Stream>,
    level: Arc<Level>,
}

impl MicCapture {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len,
            stream: None,
            level: Arc::new(Level::default()),
        }
    }

    fn open(&self) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(Error::NoInputDevice)?;
        let supported = device.default_input_config()?;
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.config();
        debug!(
            device = %device.name().unwrap_or_default(),
            channels = config.channels,
            rate = config.sample_rate.0,
            ?format,
            "opening microphone"
        );

        let mut analyser = Analyser {
            window: RmsWindow::new(self.window_len),
            channels: Ord::max(config.channels as usize, 1),
            level: Arc::clone(&self.level),
        };
        let on_error = |err: cpal::StreamError| warn!(%err, "microphone stream error");

        let stream = match format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| analyser.feed(data, |s| s),
                on_error,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    analyser.feed(data, from_i16)
                },
                on_error,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    analyser.feed(data, from_u16)
                },
                on_error,
                None,
            )?,
            SampleFormat::U8 => device.build_input_stream(
                &config,
                move |data: &[u8], _: &cpal::InputCallbackInfo| {
                    analyser.feed(data, from_u8)
                },
                on_error,
                None,
            )?,
            other => return Err(Error::SampleFormat(other.to_string())),
        };
        stream.play()?;
        Ok(stream)
    }
}

impl AudioCapture for MicCapture {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        self.level = Arc::new(Level::default());
        self.stream = Some(self.open()?);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the stream closes the device.
        self.stream = None;
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    fn latest(&mut self) -> Option<f32> {
        self.stream.as_ref()?;
        self.level.read()
    }
}

// ── Sounds ──────────────────────────────────────────────────────────────────

fn render(mut sound: An<impl AudioNode<Inputs = U0, Outputs = U1>>, secs: f64) -> Vec<f32> {
    sound.set_sample_rate(SAMPLE_RATE as f64);
    let n = (SAMPLE_RATE as f64 * secs) as usize;
    (0..n).map(|_| sound.get_mono() as f32).collect()
}

/// Rising chirp; louder screams chirp higher.
fn jump_samples(strength: f64) -> Vec<f32> {
    let top = 300.0 + 600.0 * strength.clamp(0.0, 1.0);
    let freq = lfo(move |t: f64| lerp(300.0, top, (t / 0.12).min(1.0)));
    let gain = lfo(|t: f64| lerp(0.12, 0.0, (t / 0.15).min(1.0)));
    render((freq >> square()) * gain, 0.15)
}

/// Falling sawtooth sweep, 400Hz to 80Hz.
fn crash_samples() -> Vec<f32> {
    let freq = lfo(|t: f64| lerp(400.0, 80.0, (t / 0.4).min(1.0)));
    let gain = lfo(|t: f64| lerp(0.15, 0.0, (t / 0.5).min(1.0)));
    render((freq >> saw()) * gain, 0.5)
}

pub struct SoundFx {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl SoundFx {
    pub fn open() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    fn play(&self, samples: Vec<f32>) {
        match Sink::try_new(&self.handle) {
            Ok(sink) => {
                sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));
                sink.detach(); // Play in background
            }
            Err(err) => warn!(%err, "dropping sound effect"),
        }
    }
}

impl Effects for SoundFx {
    fn jump(&mut self, strength: f64) {
        self.play(jump_samples(strength));
    }

    fn crash(&mut self, _reason: EndReason) {
        self.play(crash_samples());
    }
}

/// Speakers if there are any, silence otherwise.
pub fn open_effects() -> Box<dyn Effects> {
    match SoundFx::open() {
        Ok(fx) => Box::new(fx),
        Err(err) => {
            warn!(%err, "no audio output, playing silently");
            Box::new(Mute)
        }
    }
}
