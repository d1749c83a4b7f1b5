//! Error types for the mixing core.

use thiserror::Error;

/// Rejections from the mixer. None of these are fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MixerError {
    #[error("volume {0} is outside 0..=100")]
    VolumeOutOfRange(i32),
    #[error("no free voice slot, sound dropped")]
    PoolFull,
    #[error("sound has no samples")]
    EmptySound,
}

/// Rejections from the beat sequencer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BeatError {
    #[error("tempo {0} bpm is outside 40..=300")]
    TempoOutOfRange(i32),
    #[error("unknown beat mode {0}")]
    InvalidMode(u8),
}
