//! Real-time mixing core for the beatbox drum machine.
//!
//! Sums concurrently triggered sound assets into fixed-size 16-bit mono
//! blocks, and provides the beat patterns and tempo math that drive them.
//! Nothing in here spawns threads or touches a device.

mod beat;
mod error;
mod mixer;
mod pcm;
mod sound;
mod timing;
mod voice;
mod voice_pool;

pub use beat::{
    half_beat, half_beat_samples, validate_tempo, BeatMode, BeatState, DrumSound, DEFAULT_BPM,
    MAX_BPM, MIN_BPM, STEPS_PER_BAR,
};
pub use error::{BeatError, MixerError};
pub use mixer::{step_volume, validate_volume, Mixer, DEFAULT_VOLUME, MAX_VOLUME};
pub use pcm::{clip16, mix_into};
pub use sound::SoundAsset;
pub use timing::{PeriodStats, PeriodTimer};
pub use voice::Voice;
pub use voice_pool::{VoiceId, VoicePool, MAX_VOICES};
