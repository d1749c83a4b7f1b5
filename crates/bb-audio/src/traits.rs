//! Output sink traits and error types.

use thiserror::Error;

/// Error type for audio operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("no audio device available")]
    NoDevice,
    #[error("device init error: {0}")]
    DeviceInit(String),
    #[error("stream create error: {0}")]
    StreamCreate(String),
    #[error("playback error: {0}")]
    Playback(String),
    #[error("write error: {0}")]
    Write(String),
    #[error("recovery failed: {0}")]
    Recover(String),
    #[error("output sink is closed")]
    Closed,
}

/// Parameters used when opening a sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Samples per second.
    pub sample_rate: u32,
    /// Target device buffering, in milliseconds.
    pub latency_ms: u32,
}

impl SinkConfig {
    /// Block size the sink should ask for: a quarter of the buffered latency.
    pub fn block_size_hint(&self) -> usize {
        let buffered = self.sample_rate as u64 * self.latency_ms as u64 / 1000;
        ((buffered / 4) as usize).max(1)
    }

    /// Total buffered samples for the configured latency.
    pub fn buffer_len(&self) -> usize {
        ((self.sample_rate as u64 * self.latency_ms as u64 / 1000) as usize).max(1)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            latency_ms: 50,
        }
    }
}

/// A device accepting mono 16-bit blocks at a fixed sample rate.
///
/// `write` blocks until the device has room, which paces the caller to
/// real time.
pub trait OutputSink {
    /// Get the sample rate.
    fn sample_rate(&self) -> u32;

    /// Block length the device prefers per write.
    fn block_size(&self) -> usize;

    /// Write one block, returning how many samples the device accepted.
    fn write(&mut self, block: &[i16]) -> Result<usize, AudioError>;

    /// Try once to bring the device back after a failed write.
    fn recover(&mut self) -> Result<(), AudioError>;

    /// Wait for buffered samples to finish playing.
    fn drain(&mut self) -> Result<(), AudioError>;

    /// Release the device. Further writes fail with [`AudioError::Closed`].
    fn close(&mut self);
}

/// System-level volume, separate from the sample path.
pub trait VolumeControl: Send + Sync {
    fn set_hardware_volume(&self, percent: u8) -> Result<(), AudioError>;
}

/// Opens a sink on the thread that will drive it.
///
/// Device streams are not always `Send`, so the driver thread calls the
/// opener itself rather than receiving a ready-made sink.
pub type SinkOpener = Box<dyn FnOnce() -> Result<Box<dyn OutputSink>, AudioError> + Send>;
