//! Speaker playback via cpal.
//!
//! # Design constraints
//!
//! The cpal output callback runs on an OS audio thread at elevated priority.
//! It **must not** allocate, block on a mutex, or perform I/O. The callback
//! only pops from an SPSC ring buffer consumer (`pop_slice` is lock-free)
//! and fills the remainder with silence when the buffer runs dry.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). A dedicated playback thread therefore owns the stream for its
//! whole lifetime: it opens the device, confirms over a sync channel, then
//! feeds reply buffers from a crossbeam channel through the resampler into
//! the ring producer. Dropping `AudioOutput` closes the channel and the
//! thread tears the stream down on its own.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, SampleRate, StreamConfig,
};
use crossbeam_channel::{Receiver, Sender};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use tracing::{error, info, warn};

use crate::error::{CondoVoiceError, Result};
use crate::playback::{resample::RateConverter, ReplySink, TTS_SAMPLE_RATE};

/// Ring capacity: 2^19 = 524 288 f32 samples ≈ 10.9 s at 48 kHz, ample for
/// one spoken reply.
const RING_CAPACITY: usize = 1 << 19;

/// Rubato input chunk size used on the feeder side.
const RESAMPLE_CHUNK: usize = 960;

/// Handle to the playback thread. Implements [`ReplySink`]; each `play`
/// queues one reply's samples for the device.
pub struct AudioOutput {
    replies: Sender<Vec<f32>>,
    running: Arc<AtomicBool>,
}

impl AudioOutput {
    /// Open the system default output device.
    ///
    /// Blocks until the playback thread confirms the stream is live, so a
    /// missing device fails here rather than on the first reply.
    ///
    /// # Errors
    /// `CondoVoiceError::NoDefaultOutputDevice` when no speaker is available,
    /// `CondoVoiceError::AudioOutput` if cpal fails to build the stream.
    pub fn open_default() -> Result<Self> {
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded::<Vec<f32>>();
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        // Sync confirmation channel: the playback thread reports whether the
        // stream opened before `open_default` returns.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<u32>>();

        std::thread::Builder::new()
            .name("condovoice-playback".into())
            .spawn(move || playback_thread(reply_rx, thread_running, open_tx))
            .map_err(|e| CondoVoiceError::AudioOutput(format!("spawn failed: {e}")))?;

        let device_rate = open_rx
            .recv()
            .map_err(|_| CondoVoiceError::AudioOutput("playback thread died".into()))??;

        info!(device_rate, "audio output ready");
        Ok(Self {
            replies: reply_tx,
            running,
        })
    }
}

impl ReplySink for AudioOutput {
    fn play(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.replies
            .send(samples.to_vec())
            .map_err(|_| CondoVoiceError::AudioOutput("playback thread gone".into()))
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        // Channel closes when `replies` drops; the thread exits its loop.
    }
}

/// Body of the dedicated playback thread. Owns the `!Send` stream.
fn playback_thread(
    replies: Receiver<Vec<f32>>,
    running: Arc<AtomicBool>,
    open_tx: std::sync::mpsc::Sender<Result<u32>>,
) {
    let (device_rate, _stream, mut producer) = match open_stream() {
        Ok(parts) => {
            let rate = parts.0;
            if open_tx.send(Ok(rate)).is_err() {
                return;
            }
            parts
        }
        Err(e) => {
            let _ = open_tx.send(Err(e));
            return;
        }
    };

    let mut converter = match RateConverter::new(TTS_SAMPLE_RATE, device_rate, RESAMPLE_CHUNK) {
        Ok(c) => c,
        Err(e) => {
            error!("resampler init failed, playback disabled: {e}");
            return;
        }
    };

    while let Ok(reply) = replies.recv() {
        if !running.load(Ordering::Acquire) {
            break;
        }
        let mut resampled = converter.process(&reply);
        resampled.extend(converter.flush());
        feed_ring(&mut producer, &resampled, &running);
    }
}

type RingProducer = ringbuf::HeapProd<f32>;
type RingConsumer = ringbuf::HeapCons<f32>;

/// Push samples into the ring, waiting for the callback to drain it when
/// full. The wait is bounded by `running` so shutdown is prompt.
fn feed_ring(producer: &mut RingProducer, samples: &[f32], running: &AtomicBool) {
    let mut offset = 0;
    while offset < samples.len() {
        if !running.load(Ordering::Acquire) {
            return;
        }
        let written = producer.push_slice(&samples[offset..]);
        offset += written;
        if written == 0 {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

fn open_stream() -> Result<(u32, cpal::Stream, RingProducer)> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(CondoVoiceError::NoDefaultOutputDevice)?;

    info!(
        device = device.name().unwrap_or_default().as_str(),
        "opening output device"
    );

    let supported = device
        .default_output_config()
        .map_err(|e| CondoVoiceError::AudioOutput(e.to_string()))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();

    info!(sample_rate, channels, "output config selected");

    let config = StreamConfig {
        channels,
        sample_rate: SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let (producer, mut consumer): (RingProducer, RingConsumer) =
        HeapRb::<f32>::new(RING_CAPACITY).split();

    let ch = channels as usize;
    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _info| {
                for frame in data.chunks_mut(ch) {
                    // Mono source duplicated across all output channels.
                    let sample = consumer.try_pop().unwrap_or(0.0);
                    for out in frame {
                        *out = sample;
                    }
                }
            },
            |err| error!("audio output stream error: {err}"),
            None,
        ),
        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _info| {
                for frame in data.chunks_mut(ch) {
                    let sample = consumer.try_pop().unwrap_or(0.0);
                    let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    for out in frame {
                        *out = value;
                    }
                }
            },
            |err| error!("audio output stream error: {err}"),
            None,
        ),
        fmt => {
            return Err(CondoVoiceError::AudioOutput(format!(
                "unsupported output sample format: {fmt:?}"
            )))
        }
    }
    .map_err(|e| CondoVoiceError::AudioOutput(e.to_string()))?;

    stream
        .play()
        .map_err(|e| CondoVoiceError::AudioOutput(e.to_string()))?;

    if sample_rate != TTS_SAMPLE_RATE {
        warn!(
            sample_rate,
            tts_rate = TTS_SAMPLE_RATE,
            "device rate differs from synthesis rate, resampling"
        );
    }

    Ok((sample_rate, stream, producer))
}
