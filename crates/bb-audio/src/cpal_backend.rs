//! CPAL-based output sink.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};
use log::{info, warn};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::traits::{AudioError, OutputSink, SinkConfig, SinkOpener, VolumeControl};

/// How long a write may wait without the device consuming anything.
const STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Output gain applied inside the stream callback.
///
/// CPAL exposes no system mixer, so this stands in for the hardware volume
/// control: it scales every sample on its way to the device.
#[derive(Clone, Debug)]
pub struct SoftwareVolume {
    percent: Arc<AtomicU8>,
}

impl SoftwareVolume {
    pub fn new(percent: u8) -> Self {
        Self {
            percent: Arc::new(AtomicU8::new(percent.min(100))),
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::Relaxed)
    }
}

impl VolumeControl for SoftwareVolume {
    fn set_hardware_volume(&self, percent: u8) -> Result<(), AudioError> {
        self.percent.store(percent.min(100), Ordering::Relaxed);
        Ok(())
    }
}

/// Mono 16-bit sink on the default CPAL output device.
///
/// Must be written, drained and recovered from the thread that opened it:
/// the stream callback unparks that thread whenever it frees room.
pub struct CpalSink {
    device: Device,
    config: StreamConfig,
    block_size: usize,
    buffer_len: usize,
    stream: Option<Stream>,
    producer: HeapProd<i16>,
    failed: Arc<AtomicBool>,
    volume: SoftwareVolume,
}

impl CpalSink {
    /// Open the default output device at the requested rate and start it.
    pub fn open(sink_config: SinkConfig, volume: SoftwareVolume) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;

        let default = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?;

        let mut config: StreamConfig = default.into();
        config.sample_rate = SampleRate(sink_config.sample_rate);

        let buffer_len = sink_config.buffer_len();
        let (producer, consumer) = HeapRb::<i16>::new(buffer_len).split();

        let mut sink = Self {
            device,
            config,
            block_size: sink_config.block_size_hint(),
            buffer_len,
            stream: None,
            producer,
            failed: Arc::new(AtomicBool::new(false)),
            volume,
        };
        sink.build_stream(consumer)?;
        info!(
            "audio output open: {} Hz, {} device channel(s), block {} samples",
            sink.config.sample_rate.0, sink.config.channels, sink.block_size
        );
        Ok(sink)
    }

    /// Defer [`CpalSink::open`] to the thread that will drive the sink.
    pub fn opener(sink_config: SinkConfig, volume: SoftwareVolume) -> SinkOpener {
        Box::new(move || {
            let sink = CpalSink::open(sink_config, volume)?;
            Ok(Box::new(sink) as Box<dyn OutputSink>)
        })
    }

    /// Build and start the stream, reading mono samples from `consumer`.
    fn build_stream(&mut self, mut consumer: HeapCons<i16>) -> Result<(), AudioError> {
        let channels = self.config.channels as usize;
        let volume = self.volume.clone();
        let failed = self.failed.clone();
        let writer = thread::current();
        let error_writer = writer.clone();

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let gain = volume.percent() as f32 / 100.0;
                    // Same mono sample on every device channel; silence on underrun.
                    for chunk in data.chunks_mut(channels) {
                        let value = consumer
                            .try_pop()
                            .map_or(0.0, |s| s as f32 / 32768.0 * gain);
                        chunk.fill(value);
                    }
                    writer.unpark();
                },
                move |err| {
                    warn!("audio stream error: {}", err);
                    failed.store(true, Ordering::Release);
                    error_writer.unpark();
                },
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }
}

impl OutputSink for CpalSink {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn write(&mut self, block: &[i16]) -> Result<usize, AudioError> {
        if self.stream.is_none() {
            return Err(AudioError::Closed);
        }

        let mut written = 0;
        while written < block.len() {
            if self.failed.load(Ordering::Acquire) {
                return Err(AudioError::Write("stream reported an error".into()));
            }
            written += self.producer.push_slice(&block[written..]);
            if written == block.len() {
                break;
            }
            let producer = &self.producer;
            let failed = &self.failed;
            let room = park_until(Instant::now() + STALL_TIMEOUT, || {
                producer.vacant_len() > 0 || failed.load(Ordering::Acquire)
            });
            if !room {
                if written > 0 {
                    return Ok(written);
                }
                return Err(AudioError::Write("device stopped consuming samples".into()));
            }
        }
        Ok(written)
    }

    fn recover(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
        }
        self.failed.store(false, Ordering::Release);

        let (producer, consumer) = HeapRb::<i16>::new(self.buffer_len).split();
        self.producer = producer;
        self.build_stream(consumer)
            .map_err(|e| AudioError::Recover(e.to_string()))?;
        info!("audio output recovered");
        Ok(())
    }

    fn drain(&mut self) -> Result<(), AudioError> {
        if self.stream.is_none() {
            return Err(AudioError::Closed);
        }
        let producer = &self.producer;
        let failed = &self.failed;
        let drained = park_until(Instant::now() + STALL_TIMEOUT, || {
            producer.is_empty() || failed.load(Ordering::Acquire)
        });
        if !drained || self.failed.load(Ordering::Acquire) {
            return Err(AudioError::Playback("drain did not complete".into()));
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
            info!("audio output closed");
        }
    }
}

/// Park the current thread until `ready` holds or `deadline` passes.
/// Returns whether `ready` held. Spurious wakeups just recheck.
fn park_until(deadline: Instant, mut ready: impl FnMut() -> bool) -> bool {
    loop {
        if ready() {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::park_timeout(deadline - now);
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.close();
    }
}
